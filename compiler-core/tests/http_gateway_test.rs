//! HttpGateway against a canned-response server on a loopback socket.

use std::time::Duration;

use compiler_core::{
    CompileGateway, CompileRequest, HttpGateway, ParserMode, TextKind, TextPlace, TransportError,
    DEFAULT_ENDPOINT_PATH,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Accept one connection, answer it with `status_line` and `body`, and hand
/// back the raw request that was received.
async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        request
    });

    (format!("http://{addr}"), server)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[tokio::test]
async fn test_posts_json_and_decodes_report() {
    let body = r#"{
        "diagnostics": [
            {"message": "undeclared var", "span": {"start": 0, "length": 3},
             "place": "Semantic", "kind": "Error"}
        ],
        "symbol_table": [{"id": "b", "value": "5"}, {"id": "a", "value": "1"}],
        "seconds": 0.2
    }"#;
    let (base_url, server) = serve_once("200 OK", body).await;

    let gateway = HttpGateway::new(&base_url, DEFAULT_ENDPOINT_PATH, None).unwrap();
    let report = gateway
        .submit(CompileRequest::new("x = 1;", ParserMode::Lr))
        .await
        .unwrap();

    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].kind, TextKind::Error);
    assert_eq!(report.diagnostics[0].place, TextPlace::Semantic);
    assert_eq!(report.diagnostics[0].span.end(), 3);
    // the gateway returns the wire order untouched
    assert_eq!(report.symbol_table[0].id, "b");
    assert_eq!(report.elapsed_seconds, 0.2);

    let raw_request = server.await.unwrap();
    assert!(raw_request.starts_with("POST /compiler/generate HTTP/1.1"));
    assert!(raw_request
        .to_ascii_lowercase()
        .contains("content-type: application/json"));
    let json_start = raw_request.find("\r\n\r\n").unwrap() + 4;
    let sent: serde_json::Value = serde_json::from_str(&raw_request[json_start..]).unwrap();
    assert_eq!(sent, serde_json::json!({ "code": "x = 1;", "parser": "Lr" }));
}

#[tokio::test]
async fn test_non_success_status_is_transport_error() {
    let (base_url, server) = serve_once("500 Internal Server Error", r#"{"error":"boom"}"#).await;

    let gateway = HttpGateway::new(&base_url, DEFAULT_ENDPOINT_PATH, None).unwrap();
    let err = gateway
        .submit(CompileRequest::new("", ParserMode::Recursive))
        .await
        .unwrap_err();

    match err {
        TransportError::Status { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("boom"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn test_schema_mismatch_fails_closed() {
    let body = r#"{"diagnostics": [{"message": "m"}], "symbol_table": [], "seconds": 0.1}"#;
    let (base_url, server) = serve_once("200 OK", body).await;

    let gateway = HttpGateway::new(&base_url, DEFAULT_ENDPOINT_PATH, None).unwrap();
    let err = gateway
        .submit(CompileRequest::new("", ParserMode::Glr))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Decode(_)));
    server.await.unwrap();
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    // bind then drop to get a port nothing listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let gateway = HttpGateway::new(
        &format!("http://{addr}"),
        DEFAULT_ENDPOINT_PATH,
        Some(Duration::from_secs(5)),
    )
    .unwrap();
    let err = gateway
        .submit(CompileRequest::new("", ParserMode::Recursive))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Network(_)));
}
