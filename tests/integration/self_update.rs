//! The self-update sequence end to end against a fake release feed.

use crate::common::{RELEASE_FEED_PATH, context, file_names};
use paper_launcher::upgrade::{NoUpdateReason, SelfUpdater, UpdateOutcome, UpdateState};
use serde_json::json;
use std::path::PathBuf;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ASSET: &str = "paper-launcher-linux-amd64";
const NEW_BINARY: &[u8] = b"\x7fELF new launcher build";

async fn mount_release(server: &MockServer, tag: &str, asset_name: &str) {
    Mock::given(method("GET"))
        .and(path(RELEASE_FEED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tag_name": tag,
            "name": tag,
            "body": "Bug fixes",
            "assets": [{
                "id": 42,
                "url": format!("{}/api/assets/42", server.uri()),
                "name": asset_name,
                "browser_download_url": format!("{}/download/{asset_name}", server.uri()),
                "size": NEW_BINARY.len()
            }]
        })))
        .mount(server)
        .await;
}

fn launcher_in(temp: &TempDir) -> PathBuf {
    let exe = temp.path().join("paper-launcher");
    std::fs::write(&exe, b"old launcher build").unwrap();
    exe
}

#[tokio::test]
async fn installs_newer_release() {
    let server = MockServer::start().await;
    mount_release(&server, "v2.0.0", ASSET).await;
    Mock::given(method("GET"))
        .and(path(format!("/download/{ASSET}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(NEW_BINARY))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let exe = launcher_in(&temp);
    let ctx = context(&server, "1.0.0", None);
    let mut updater = SelfUpdater::for_executable(&ctx, &exe).auto_install(true);

    let outcome = updater.run(|_| -> std::future::Ready<bool> { panic!("auto-install must not prompt") }).await.unwrap();

    assert!(matches!(&outcome, UpdateOutcome::Installed { version } if version == "2.0.0"), "got {outcome:?}");
    assert_eq!(updater.state(), UpdateState::Done);
    assert_eq!(std::fs::read(&exe).unwrap(), NEW_BINARY);
    assert_eq!(std::fs::read(temp.path().join("paper-launcher.old")).unwrap(), b"old launcher build");
    assert_eq!(file_names(temp.path()), vec!["paper-launcher", "paper-launcher.old"]);
}

#[tokio::test]
async fn private_feed_downloads_through_asset_api() {
    let server = MockServer::start().await;
    mount_release(&server, "v2.0.0", ASSET).await;
    Mock::given(method("GET"))
        .and(path("/api/assets/42"))
        .and(header("accept", "application/octet-stream"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(NEW_BINARY))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/download/{ASSET}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"wrong".as_slice()))
        .expect(0)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let exe = launcher_in(&temp);
    let ctx = context(&server, "1.0.0", Some("secret-token"));
    let mut updater = SelfUpdater::for_executable(&ctx, &exe).auto_install(true);

    let outcome = updater.run(|_| std::future::ready(false)).await.unwrap();
    assert!(matches!(outcome, UpdateOutcome::Installed { .. }));
    assert_eq!(std::fs::read(&exe).unwrap(), NEW_BINARY);
}

#[tokio::test]
async fn declined_update_downloads_nothing() {
    let server = MockServer::start().await;
    mount_release(&server, "v2.0.0", ASSET).await;
    Mock::given(method("GET"))
        .and(path(format!("/download/{ASSET}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(NEW_BINARY))
        .expect(0)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let exe = launcher_in(&temp);
    let ctx = context(&server, "1.0.0", None);
    let mut updater = SelfUpdater::for_executable(&ctx, &exe);

    let mut asked = None;
    let outcome = updater
        .run(|update| {
            asked = Some(update.release.tag.clone());
            std::future::ready(false)
        })
        .await
        .unwrap();

    assert!(matches!(&outcome, UpdateOutcome::Declined { version } if version == "2.0.0"));
    assert_eq!(asked.as_deref(), Some("v2.0.0"));
    assert_eq!(std::fs::read(&exe).unwrap(), b"old launcher build");
    assert_eq!(file_names(temp.path()), vec!["paper-launcher"]);
}

#[tokio::test]
async fn cancellation_while_prompting_ends_run() {
    let server = MockServer::start().await;
    mount_release(&server, "v2.0.0", ASSET).await;
    Mock::given(method("GET"))
        .and(path(format!("/download/{ASSET}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(NEW_BINARY))
        .expect(0)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let exe = launcher_in(&temp);
    let ctx = context(&server, "1.0.0", None);
    let mut updater = SelfUpdater::for_executable(&ctx, &exe);

    let cancel = ctx.cancel.clone();
    let err = updater
        .run(move |_| async move {
            cancel.cancel();
            std::future::pending::<bool>().await
        })
        .await
        .unwrap_err();

    assert!(err.is_cancelled(), "got {err:?}");
    assert_eq!(std::fs::read(&exe).unwrap(), b"old launcher build");
    assert_eq!(file_names(temp.path()), vec!["paper-launcher"]);
}

#[tokio::test]
async fn same_version_is_up_to_date() {
    let server = MockServer::start().await;
    mount_release(&server, "v1.4.0", ASSET).await;

    let temp = TempDir::new().unwrap();
    let exe = launcher_in(&temp);
    let ctx = context(&server, "1.4.0", None);
    let mut updater = SelfUpdater::for_executable(&ctx, &exe).auto_install(true);

    let outcome = updater.run(|_| std::future::ready(true)).await.unwrap();
    assert!(matches!(
        outcome,
        UpdateOutcome::NoUpdate(NoUpdateReason::UpToDate { ref latest }) if latest == "1.4.0"
    ));
    assert_eq!(updater.state(), UpdateState::NoUpdate);
}

#[tokio::test]
async fn missing_platform_asset_is_no_update() {
    let server = MockServer::start().await;
    mount_release(&server, "v2.0.0", "paper-launcher-windows-amd64.exe").await;

    let temp = TempDir::new().unwrap();
    let exe = launcher_in(&temp);
    let ctx = context(&server, "1.0.0", None);
    let mut updater = SelfUpdater::for_executable(&ctx, &exe).auto_install(true);

    let outcome = updater.run(|_| std::future::ready(true)).await.unwrap();
    assert!(matches!(outcome, UpdateOutcome::NoUpdate(NoUpdateReason::NoPlatformAsset { .. })));
    assert_eq!(std::fs::read(&exe).unwrap(), b"old launcher build");
}

#[tokio::test]
async fn unreachable_feed_does_not_block_launch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RELEASE_FEED_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let exe = launcher_in(&temp);
    let ctx = context(&server, "1.0.0", None);
    let mut updater = SelfUpdater::for_executable(&ctx, &exe).auto_install(true);

    let outcome = updater.run(|_| std::future::ready(true)).await.unwrap();
    assert!(matches!(outcome, UpdateOutcome::NoUpdate(NoUpdateReason::CheckFailed { .. })));
    assert_eq!(updater.state(), UpdateState::Failed);
}

#[tokio::test]
async fn failed_download_keeps_running_executable() {
    let server = MockServer::start().await;
    mount_release(&server, "v2.0.0", ASSET).await;
    Mock::given(method("GET"))
        .and(path(format!("/download/{ASSET}")))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let exe = launcher_in(&temp);
    let ctx = context(&server, "1.0.0", None);
    let mut updater = SelfUpdater::for_executable(&ctx, &exe).auto_install(true);

    let outcome = updater.run(|_| std::future::ready(true)).await.unwrap();
    assert!(matches!(outcome, UpdateOutcome::Failed { .. }), "got {outcome:?}");
    assert_eq!(updater.state(), UpdateState::Failed);
    assert_eq!(std::fs::read(&exe).unwrap(), b"old launcher build");
    assert_eq!(file_names(temp.path()), vec!["paper-launcher"]);
}

#[tokio::test]
async fn empty_asset_fails_validation() {
    let server = MockServer::start().await;
    mount_release(&server, "v2.0.0", ASSET).await;
    Mock::given(method("GET"))
        .and(path(format!("/download/{ASSET}")))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let exe = launcher_in(&temp);
    let ctx = context(&server, "1.0.0", None);
    let mut updater = SelfUpdater::for_executable(&ctx, &exe).auto_install(true);

    let outcome = updater.run(|_| std::future::ready(true)).await.unwrap();
    let UpdateOutcome::Failed {
        error,
    } = outcome
    else {
        panic!("expected a failed update");
    };
    assert!(matches!(error, paper_launcher::core::LauncherError::StagedUpdateInvalid { .. }));
    assert_eq!(std::fs::read(&exe).unwrap(), b"old launcher build");
    assert_eq!(file_names(temp.path()), vec!["paper-launcher"]);
}
