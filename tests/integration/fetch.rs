//! Resilient fetcher behavior against a flaky HTTP server.

use crate::common::{fast_network, fetcher, file_names};
use paper_launcher::core::LauncherError;
use paper_launcher::fetch::Fetcher;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BODY: &[u8] = b"the quick brown fox jumps over the lazy dog";

/// Writes `response` verbatim on every connection to a local listener.
///
/// With `hold_open` the socket stays open afterwards, so a body shorter than
/// its `Content-Length` looks like a stalled transfer instead of a truncated one.
async fn raw_server(response: Vec<u8>, hold_open: bool) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&connections);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            let response = response.clone();
            tokio::spawn(async move {
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;
                let _ = socket.write_all(&response).await;
                let _ = socket.flush().await;
                if hold_open {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                }
            });
        }
    });

    (format!("http://{addr}/file.bin"), connections)
}

fn http_response(content_length: usize, body: &[u8]) -> Vec<u8> {
    let mut response = format!(
        "HTTP/1.1 200 OK\r\nContent-Length: {content_length}\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n\r\n"
    )
    .into_bytes();
    response.extend_from_slice(body);
    response
}

#[tokio::test]
async fn recovers_after_two_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/file.bin"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/file.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(BODY))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("file.bin");
    let written = fetcher(&server)
        .fetch(&format!("{}/file.bin", server.uri()), &dest, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(written, BODY.len() as u64);
    assert_eq!(std::fs::read(&dest).unwrap(), BODY);
    assert_eq!(file_names(temp.path()), vec!["file.bin"]);
}

#[tokio::test]
async fn gives_up_after_max_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/file.bin"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("file.bin");
    let err = fetcher(&server)
        .fetch(&format!("{}/file.bin", server.uri()), &dest, &CancellationToken::new())
        .await
        .unwrap_err();

    let LauncherError::FetchFailed {
        attempts,
        last_cause,
        ..
    } = &err
    else {
        panic!("expected FetchFailed, got {err:?}");
    };
    assert_eq!(*attempts, 3);
    assert!(last_cause.contains("503"), "cause was {last_cause}");
    assert!(file_names(temp.path()).is_empty());
}

#[tokio::test]
async fn client_errors_are_retried_too() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.bin"))
        .respond_with(ResponseTemplate::new(404))
        .expect(3)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let err = fetcher(&server)
        .fetch(&format!("{}/missing.bin", server.uri()), &temp.path().join("missing.bin"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LauncherError::FetchFailed { attempts: 3, .. }));
}

#[tokio::test]
async fn replaces_existing_file_only_on_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/file.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(BODY))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("file.bin");
    std::fs::write(&dest, b"previous").unwrap();
    std::fs::write(temp.path().join("file.bin.part"), b"stale partial").unwrap();

    fetcher(&server)
        .fetch(&format!("{}/file.bin", server.uri()), &dest, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(std::fs::read(&dest).unwrap(), BODY);
    assert_eq!(file_names(temp.path()), vec!["file.bin"]);
}

#[tokio::test]
async fn cancellation_leaves_destination_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(BODY).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("slow.bin");
    std::fs::write(&dest, b"previous").unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = fetcher(&server).fetch(&format!("{}/slow.bin", server.uri()), &dest, &cancel).await.unwrap_err();

    assert!(err.is_cancelled(), "expected Cancelled, got {err:?}");
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(std::fs::read(&dest).unwrap(), b"previous");
    assert_eq!(file_names(temp.path()), vec!["slow.bin"]);
}

#[tokio::test]
async fn cancellation_interrupts_backoff() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/file.bin"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let network = paper_launcher::config::NetworkConfig {
        base_delay_ms: 60_000,
        ..fast_network(&server)
    };
    let fetcher = Fetcher::new(&network).unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    let temp = TempDir::new().unwrap();
    let started = Instant::now();
    let err = fetcher
        .fetch(&format!("{}/file.bin", server.uri()), &temp.path().join("file.bin"), &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn stalled_response_times_out_and_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stall.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(BODY).set_delay(Duration::from_secs(3)))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/stall.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(BODY))
        .expect(1)
        .mount(&server)
        .await;

    let network = paper_launcher::config::NetworkConfig {
        request_timeout_secs: 1,
        ..fast_network(&server)
    };
    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("stall.bin");
    Fetcher::new(&network)
        .unwrap()
        .fetch(&format!("{}/stall.bin", server.uri()), &dest, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(std::fs::read(&dest).unwrap(), BODY);
}

#[tokio::test]
async fn sends_configured_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/file.bin"))
        .and(wiremock::matchers::header("user-agent", "launcher-test/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(BODY))
        .expect(1)
        .mount(&server)
        .await;

    let network = paper_launcher::config::NetworkConfig {
        user_agent: "launcher-test/1.0".to_string(),
        ..fast_network(&server)
    };
    let temp = TempDir::new().unwrap();
    Fetcher::new(&network)
        .unwrap()
        .fetch(&format!("{}/file.bin", server.uri()), &temp.path().join("file.bin"), &CancellationToken::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn body_matching_content_length_succeeds_first_time() {
    let server = MockServer::start().await;
    let (url, connections) = raw_server(http_response(BODY.len(), BODY), false).await;

    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("file.bin");
    let written = fetcher(&server).fetch(&url, &dest, &CancellationToken::new()).await.unwrap();

    assert_eq!(written, BODY.len() as u64);
    assert_eq!(std::fs::read(&dest).unwrap(), BODY);
    assert_eq!(connections.load(Ordering::SeqCst), 1);
    assert_eq!(file_names(temp.path()), vec!["file.bin"]);
}

#[tokio::test]
async fn truncated_body_is_retried_and_never_promoted() {
    let server = MockServer::start().await;
    let (url, connections) = raw_server(http_response(1000, &BODY[..10]), false).await;

    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("file.bin");
    std::fs::write(&dest, b"previous").unwrap();
    let err = fetcher(&server).fetch(&url, &dest, &CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, LauncherError::FetchFailed { attempts: 3, .. }), "got {err:?}");
    assert_eq!(connections.load(Ordering::SeqCst), 3);
    assert_eq!(std::fs::read(&dest).unwrap(), b"previous");
    assert_eq!(file_names(temp.path()), vec!["file.bin"]);
}

#[tokio::test]
async fn cancellation_mid_body_removes_partial_file() {
    let server = MockServer::start().await;
    let (url, _) = raw_server(http_response(1000, &[b'x'; 100]), true).await;

    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("file.bin");
    let part = temp.path().join("file.bin.part");
    std::fs::write(&dest, b"previous").unwrap();

    let cancel = CancellationToken::new();
    let fetcher = fetcher(&server);
    let watch = async {
        let deadline = Instant::now() + Duration::from_secs(4);
        while !part.exists() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let saw_part = part.exists();
        cancel.cancel();
        saw_part
    };

    let (result, saw_part) = tokio::join!(fetcher.fetch(&url, &dest, &cancel), watch);

    assert!(saw_part, "download never reached the body");
    let err = result.unwrap_err();
    assert!(err.is_cancelled(), "expected Cancelled, got {err:?}");
    assert!(!part.exists());
    assert_eq!(std::fs::read(&dest).unwrap(), b"previous");
    assert_eq!(file_names(temp.path()), vec!["file.bin"]);
}
