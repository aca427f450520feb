//! Integration tests for the HTTP booking relay.
//!
//! Each test serves one canned response from a local TCP listener.
//!
//! Run with: cargo test --test relay_http

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use ubudchat::chatbot::{HttpRelay, Relay, RelayError};

/// Serve a single request with the given status line, returning the raw request.
async fn serve_once(status: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let response = format!("HTTP/1.1 {status}\r\ncontent-length: 2\r\nconnection: close\r\n\r\n{{}}");
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        request
    });

    (format!("http://{addr}/submit"), handle)
}

/// Read headers plus a `content-length` body.
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
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
                .find_map(|l| {
                    let (name, value) = l.split_once(':')?;
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
    String::from_utf8(buf).unwrap()
}

/// Local requests must not go through an environment proxy.
fn relay(url: String) -> HttpRelay {
    let http = reqwest::Client::builder().no_proxy().build().unwrap();
    HttpRelay::with_client(url, http)
}

fn fields() -> Vec<(String, String)> {
    vec![
        ("Full Name".to_string(), "Ayu".to_string()),
        ("chat_history".to_string(), "[10:00] USER: Hi\n".to_string()),
        ("access_key".to_string(), "key".to_string()),
    ]
}

#[tokio::test]
async fn test_success_status() {
    let (url, server) = serve_once("200 OK").await;
    let relay = relay(url);

    relay.submit(&fields()).await.expect("2xx should succeed");

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /submit HTTP/1.1"));
    assert!(request.to_lowercase().contains("content-type: application/x-www-form-urlencoded"));
    assert!(request.ends_with("Full%20Name=Ayu&chat_history=%5B10%3A00%5D%20USER%3A%20Hi%0A&access_key=key"));
}

#[tokio::test]
async fn test_failure_status() {
    let (url, server) = serve_once("500 Internal Server Error").await;
    let relay = relay(url);

    let err = relay.submit(&fields()).await.unwrap_err();
    assert_eq!(err, RelayError::Status(500));
    server.await.unwrap();
}

#[tokio::test]
async fn test_client_error_status() {
    let (url, server) = serve_once("403 Forbidden").await;
    let relay = relay(url);

    assert_eq!(relay.submit(&fields()).await, Err(RelayError::Status(403)));
    server.await.unwrap();
}

#[tokio::test]
async fn test_unreachable_endpoint() {
    // Bind then drop to get a port nothing listens on
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let relay = relay(format!("http://{addr}/submit"));

    let err = relay.submit(&fields()).await.unwrap_err();
    assert!(matches!(err, RelayError::Network(_)));
}
