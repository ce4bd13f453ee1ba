//! Server JAR download, reuse, verification, and update.

use crate::common::{BUILD_FEED_PATH, context, file_names};
use paper_launcher::checksum::ChecksumStore;
use paper_launcher::core::LauncherError;
use paper_launcher::server::{check_update, download_jar, find_jar_file, update_jar};
use paper_launcher::test_utils::server_jar_bytes;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mounts a build feed whose newest build of 1.21.4 is `latest`.
async fn mount_feed(server: &MockServer, latest: u32) {
    let name = format!("paper-1.21.4-{latest}.jar");
    Mock::given(method("GET"))
        .and(path(BUILD_FEED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"versions": ["1.21.3", "1.21.4"]})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{BUILD_FEED_PATH}/versions/1.21.4/builds")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "builds": [{"build": 100}, {"build": latest}]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{BUILD_FEED_PATH}/versions/1.21.4/builds/{latest}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "downloads": {"application": {"name": name}}
        })))
        .mount(server)
        .await;
}

fn download_path(build: u32) -> String {
    format!("{BUILD_FEED_PATH}/versions/1.21.4/builds/{build}/downloads/paper-1.21.4-{build}.jar")
}

#[tokio::test]
async fn downloads_validates_and_records_checksum() {
    let server = MockServer::start().await;
    mount_feed(&server, 120).await;
    let body = server_jar_bytes("build-120");
    Mock::given(method("GET"))
        .and(path(download_path(120)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let ctx = context(&server, "1.0.0", None);
    let jar = download_jar(&ctx, temp.path(), "latest").await.unwrap();

    assert_eq!(jar, temp.path().join("paper-1.21.4-120.jar"));
    assert_eq!(std::fs::read(&jar).unwrap(), body);
    let recorded = ChecksumStore::load(&ChecksumStore::sidecar_path(&jar)).unwrap().unwrap();
    assert_eq!(recorded, ChecksumStore::compute(&jar).unwrap());
    assert_eq!(file_names(temp.path()), vec!["paper-1.21.4-120.jar", "paper-1.21.4-120.jar.sha256"]);
    assert_eq!(find_jar_file(temp.path()).unwrap(), Some(jar));
}

#[tokio::test]
async fn reuses_verified_jar() {
    let server = MockServer::start().await;
    mount_feed(&server, 120).await;
    Mock::given(method("GET"))
        .and(path(download_path(120)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(server_jar_bytes("build-120")))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let ctx = context(&server, "1.0.0", None);
    let first = download_jar(&ctx, temp.path(), "1.21.4").await.unwrap();
    let second = download_jar(&ctx, temp.path(), "1.21.4").await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn redownloads_jar_with_mismatched_checksum() {
    let server = MockServer::start().await;
    mount_feed(&server, 120).await;
    let body = server_jar_bytes("build-120");
    Mock::given(method("GET"))
        .and(path(download_path(120)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let jar = temp.path().join("paper-1.21.4-120.jar");
    std::fs::write(&jar, server_jar_bytes("tampered")).unwrap();
    ChecksumStore::save(&ChecksumStore::sidecar_path(&jar), &"0".repeat(64)).unwrap();

    let ctx = context(&server, "1.0.0", None);
    download_jar(&ctx, temp.path(), "1.21.4").await.unwrap();

    assert_eq!(std::fs::read(&jar).unwrap(), body);
    ChecksumStore::verify(&jar, &ChecksumStore::load(&ChecksumStore::sidecar_path(&jar)).unwrap().unwrap()).unwrap();
}

#[tokio::test]
async fn rejects_download_that_is_not_an_archive() {
    let server = MockServer::start().await;
    mount_feed(&server, 120).await;
    Mock::given(method("GET"))
        .and(path(download_path(120)))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not a jar</html>"))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let ctx = context(&server, "1.0.0", None);
    let err = download_jar(&ctx, temp.path(), "1.21.4").await.unwrap_err();

    assert!(matches!(err, LauncherError::Structure { .. }), "got {err:?}");
    assert!(file_names(temp.path()).is_empty());
}

#[tokio::test]
async fn invalid_download_keeps_existing_jar() {
    let server = MockServer::start().await;
    mount_feed(&server, 120).await;
    Mock::given(method("GET"))
        .and(path(download_path(120)))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>captive portal page</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let jar = temp.path().join("paper-1.21.4-120.jar");
    let original = server_jar_bytes("local-build");
    std::fs::write(&jar, &original).unwrap();

    let ctx = context(&server, "1.0.0", None);
    let err = download_jar(&ctx, temp.path(), "1.21.4").await.unwrap_err();

    assert!(matches!(err, LauncherError::Structure { .. }), "got {err:?}");
    assert_eq!(std::fs::read(&jar).unwrap(), original);
    assert_eq!(file_names(temp.path()), vec!["paper-1.21.4-120.jar"]);
}

#[tokio::test]
async fn updates_to_newer_build() {
    let server = MockServer::start().await;
    mount_feed(&server, 130).await;
    let body = server_jar_bytes("build-130");
    Mock::given(method("GET"))
        .and(path(download_path(130)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let old = temp.path().join("paper-1.21.4-100.jar");
    std::fs::write(&old, server_jar_bytes("build-100")).unwrap();
    ChecksumStore::save(&ChecksumStore::sidecar_path(&old), &ChecksumStore::compute(&old).unwrap()).unwrap();

    let ctx = context(&server, "1.0.0", None);
    let build = check_update(&ctx, &old).await.unwrap().expect("a newer build");
    assert_eq!(build.build, 130);

    let updated = update_jar(&ctx, &old, &build).await.unwrap();
    assert_eq!(updated, temp.path().join("paper-1.21.4-130.jar"));
    assert_eq!(std::fs::read(&updated).unwrap(), body);
    assert_eq!(file_names(temp.path()), vec!["paper-1.21.4-130.jar", "paper-1.21.4-130.jar.sha256"]);
}

#[tokio::test]
async fn up_to_date_jar_has_no_update() {
    let server = MockServer::start().await;
    mount_feed(&server, 120).await;

    let temp = TempDir::new().unwrap();
    let jar = temp.path().join("paper-1.21.4-120.jar");
    std::fs::write(&jar, server_jar_bytes("build-120")).unwrap();

    let ctx = context(&server, "1.0.0", None);
    assert!(check_update(&ctx, &jar).await.unwrap().is_none());
}

#[tokio::test]
async fn unrecognized_jar_name_cannot_be_updated() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let jar = temp.path().join("server.jar");

    let ctx = context(&server, "1.0.0", None);
    let err = check_update(&ctx, &jar).await.unwrap_err();
    assert!(matches!(err, LauncherError::UnrecognizedJarName { .. }));
}

#[tokio::test]
async fn failed_update_restores_previous_jar() {
    let server = MockServer::start().await;
    mount_feed(&server, 130).await;
    Mock::given(method("GET"))
        .and(path(download_path(130)))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let old = temp.path().join("paper-1.21.4-100.jar");
    std::fs::write(&old, server_jar_bytes("build-100")).unwrap();

    let ctx = context(&server, "1.0.0", None);
    let build = check_update(&ctx, &old).await.unwrap().unwrap();
    let err = update_jar(&ctx, &old, &build).await.unwrap_err();

    assert!(matches!(err, LauncherError::FetchFailed { .. }));
    assert_eq!(std::fs::read(&old).unwrap(), server_jar_bytes("build-100"));
    assert_eq!(file_names(temp.path()), vec!["paper-1.21.4-100.jar"]);
}
