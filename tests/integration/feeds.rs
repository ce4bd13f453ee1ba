//! Build feed resolution and release feed status handling.

use crate::common::{BUILD_FEED_PATH, RELEASE_FEED_PATH, context, fetcher};
use paper_launcher::core::{ErrorCategory, LauncherError};
use paper_launcher::upstream::BuildFeed;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_build_feed(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(BUILD_FEED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "project_id": "paper",
            "versions": ["1.20.6", "1.21.3", "1.21.4"]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{BUILD_FEED_PATH}/versions/1.21.4/builds")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "builds": [{"build": 100}, {"build": 120}, {"build": 110}]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{BUILD_FEED_PATH}/versions/1.21.4/builds/120")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "build": 120,
            "downloads": {"application": {"name": "paper-1.21.4-120.jar", "sha256": "ignored"}}
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn resolves_latest_version_and_build() {
    let server = MockServer::start().await;
    mount_build_feed(&server).await;

    let feed = BuildFeed::new(fetcher(&server), format!("{}{BUILD_FEED_PATH}/", server.uri()));
    let build = feed.resolve("latest", &CancellationToken::new()).await.unwrap();

    assert_eq!(build.version, "1.21.4");
    assert_eq!(build.build, 120);
    assert_eq!(build.file_name, "paper-1.21.4-120.jar");
    assert_eq!(
        build.url,
        format!("{}{BUILD_FEED_PATH}/versions/1.21.4/builds/120/downloads/paper-1.21.4-120.jar", server.uri())
    );
}

#[tokio::test]
async fn explicit_version_skips_version_list() {
    let server = MockServer::start().await;
    mount_build_feed(&server).await;

    let feed = BuildFeed::new(fetcher(&server), format!("{}{BUILD_FEED_PATH}", server.uri()));
    let build = feed.resolve("1.21.4", &CancellationToken::new()).await.unwrap();
    assert_eq!(build.build, 120);

    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.url.path() != BUILD_FEED_PATH));
}

#[tokio::test]
async fn malformed_feed_is_upstream_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(BUILD_FEED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let feed = BuildFeed::new(fetcher(&server), format!("{}{BUILD_FEED_PATH}", server.uri()));
    let err = feed.latest_version(&CancellationToken::new()).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::UpstreamUnavailable);
}

#[tokio::test]
async fn empty_build_list_is_upstream_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{BUILD_FEED_PATH}/versions/9.9/builds")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"builds": []})))
        .mount(&server)
        .await;

    let feed = BuildFeed::new(fetcher(&server), format!("{}{BUILD_FEED_PATH}", server.uri()));
    let err = feed.latest_build("9.9", &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, LauncherError::UpstreamUnavailable { .. }));
}

#[tokio::test]
async fn release_feed_404_without_token_asks_for_credential() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RELEASE_FEED_PATH))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = context(&server, "1.0.0", None);
    let err = ctx.release_feed().latest(&ctx.cancel).await.unwrap_err();
    assert!(matches!(err, LauncherError::ReleaseFeedNeedsCredential { .. }), "got {err:?}");
}

#[tokio::test]
async fn release_feed_404_with_token_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RELEASE_FEED_PATH))
        .and(header("authorization", "Bearer secret-token"))
        .and(header("accept", "application/vnd.github.v3+json"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = context(&server, "1.0.0", Some("secret-token"));
    let err = ctx.release_feed().latest(&ctx.cancel).await.unwrap_err();
    assert!(matches!(err, LauncherError::ReleaseFeedNotFound { .. }), "got {err:?}");
}

#[tokio::test]
async fn release_feed_server_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RELEASE_FEED_PATH))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = context(&server, "1.0.0", None);
    let err = ctx.release_feed().latest(&ctx.cancel).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::UpstreamUnavailable);
    assert!(err.to_string().contains("bad gateway"));
}

#[tokio::test]
async fn release_feed_parses_descriptor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RELEASE_FEED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tag_name": "v2.3.0",
            "name": "2.3.0",
            "body": "\nFaster downloads\nMore details",
            "assets": [{
                "id": 7,
                "url": "https://api.example.com/assets/7",
                "name": "paper-launcher-linux-amd64",
                "browser_download_url": "https://example.com/paper-launcher-linux-amd64",
                "size": 1024
            }]
        })))
        .mount(&server)
        .await;

    let ctx = context(&server, "1.0.0", None);
    let release = ctx.release_feed().latest(&ctx.cancel).await.unwrap();
    assert_eq!(release.tag, "v2.3.0");
    assert_eq!(release.normalized_version, "2.3.0");
    assert_eq!(release.headline(), Some("Faster downloads"));
    assert_eq!(release.assets.len(), 1);
    assert_eq!(release.assets[0].id, 7);
}
