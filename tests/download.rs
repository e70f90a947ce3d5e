use std::io::Cursor;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use artifact_range::config::{AppState, Config};
use artifact_range::http::{
    ArtifactMetadata, DownloadRequest, NoProgress, ResponseFramer, Transfer, TransferProgress,
};
use artifact_range::server::{create_reusable_listener, run_server_loop};
use hyper::{Method, StatusCode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

static GET: Method = Method::GET;

fn artifact(size: usize) -> (Vec<u8>, ArtifactMetadata) {
    let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
    let metadata = ArtifactMetadata {
        size: size as u64,
        content_hash: "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08".to_string(),
        last_modified: Some(UNIX_EPOCH + Duration::from_secs(1_600_000_000)),
    };
    (data, metadata)
}

fn ranged(range: &str) -> DownloadRequest<'_> {
    DownloadRequest {
        method: &GET,
        range: Some(range),
        if_range: None,
    }
}

#[test]
fn malformed_spec_in_list_is_unsatisfiable() {
    let (_, metadata) = artifact(5120);
    let framed = ResponseFramer::new("fw.bin", &metadata).frame(&ranged("bytes=1-10,hdsfjksdh"));
    assert_eq!(framed.head().status, StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(framed.head().headers["content-range"], "bytes */5120");
}

#[test]
fn reversed_range_is_unsatisfiable() {
    let (_, metadata) = artifact(5120);
    let framed = ResponseFramer::new("fw.bin", &metadata).frame(&ranged("bytes=100-10"));
    assert_eq!(framed.head().status, StatusCode::RANGE_NOT_SATISFIABLE);
}

#[test]
fn range_past_end_is_unsatisfiable() {
    let (_, metadata) = artifact(51200);
    let framed = ResponseFramer::new("fw.bin", &metadata).frame(&ranged("bytes=51200-"));
    assert_eq!(framed.head().status, StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(framed.head().headers["content-range"], "bytes */51200");
}

#[test]
fn suffix_range_serves_tail() {
    let (data, metadata) = artifact(51200);
    let (head, body) = ResponseFramer::new("fw.bin", &metadata)
        .frame(&ranged("bytes=-1000"))
        .into_parts();
    assert_eq!(head.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(head.headers["content-range"], "bytes 50200-51199/51200");
    assert_eq!(head.headers["content-length"], "1000");

    let mut sink = Vec::new();
    let mut progress = TransferProgress::new(body.requested_bytes());
    let written = body
        .write_to(Cursor::new(&data), &mut sink, &mut progress)
        .unwrap();
    assert_eq!(written, 1000);
    assert_eq!(sink, &data[50200..]);
    assert!(progress.is_complete());
}

#[test]
fn two_ranges_become_multipart_body() {
    let (data, metadata) = artifact(51200);
    let (head, body) = ResponseFramer::new("fw.bin", &metadata)
        .frame(&ranged("bytes=0-9,10-19"))
        .into_parts();
    assert_eq!(head.status, StatusCode::PARTIAL_CONTENT);
    assert!(matches!(body.transfer(), Transfer::Multipart(ranges) if ranges.len() == 2));

    let mut sink = Vec::new();
    body.write_to(Cursor::new(&data), &mut sink, &mut NoProgress)
        .unwrap();

    let mut expected = Vec::new();
    expected.extend_from_slice(
        b"--THIS_STRING_SEPARATES_MULTIPART\r\n\
          Content-Type: application/octet-stream\r\n\
          Content-Range: bytes 0-9/51200\r\n\r\n",
    );
    expected.extend_from_slice(&data[0..10]);
    expected.extend_from_slice(
        b"\r\n--THIS_STRING_SEPARATES_MULTIPART\r\n\
          Content-Type: application/octet-stream\r\n\
          Content-Range: bytes 10-19/51200\r\n\r\n",
    );
    expected.extend_from_slice(&data[10..20]);
    expected.extend_from_slice(b"\r\n--THIS_STRING_SEPARATES_MULTIPART--");
    assert_eq!(sink, expected);
}

/// Send one raw HTTP/1.1 request and read the whole response
async fn roundtrip(addr: std::net::SocketAddr, request: &str) -> String {
    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8(response).unwrap()
}

#[tokio::test]
async fn server_serves_ranges_over_tcp() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("fw.bin"), b"0123456789abcdef").unwrap();

    let mut config = Config::load_from(dir.path().join("none").to_str().unwrap()).unwrap();
    config.artifacts.root = dir.path().to_str().unwrap().to_string();
    config.logging.access_log = false;
    config.performance.write_timeout = 5;
    let state = Arc::new(AppState::new(&config));
    let shutdown = Arc::clone(&state.shutdown_signal);

    let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap()).unwrap();
    let addr = listener.local_addr().unwrap();

    let local = tokio::task::LocalSet::new();
    local
        .run_until(async move {
            let server = tokio::task::spawn_local(run_server_loop(
                listener,
                state,
                Arc::new(AtomicUsize::new(0)),
            ));

            let response = roundtrip(
                addr,
                "GET /artifacts/fw.bin HTTP/1.1\r\nHost: test\r\nRange: bytes=4-7\r\nConnection: close\r\n\r\n",
            )
            .await;
            assert!(response.starts_with("HTTP/1.1 206 Partial Content\r\n"), "{response}");
            assert!(response.to_ascii_lowercase().contains("content-range: bytes 4-7/16\r\n"));
            assert!(response.ends_with("\r\n\r\n4567"), "{response}");

            let response = roundtrip(
                addr,
                "HEAD /artifacts/fw.bin HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n",
            )
            .await;
            assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
            assert!(response.to_ascii_lowercase().contains("content-length: 16\r\n"));
            assert!(response.ends_with("\r\n\r\n"));

            let response = roundtrip(
                addr,
                "GET /artifacts/missing.bin HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n",
            )
            .await;
            assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"), "{response}");

            shutdown.notify_one();
            server.await.unwrap().unwrap();
        })
        .await;
}
