//! A canned HTTP/1.1 server for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Requests seen by a test server, raw, in arrival order.
pub type Seen = Arc<Mutex<Vec<String>>>;

/// Read one request (head plus Content-Length body) from `socket`.
pub async fn read_request(socket: &mut TcpStream) -> String {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = socket.read(&mut buf).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&data[..pos]).to_lowercase();
            let body_len = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if data.len() >= pos + 4 + body_len {
                break;
            }
        }
    }
    String::from_utf8_lossy(&data).into_owned()
}

/// Serve every connection with `respond(request)`, closing after one exchange.
/// Returns the base URL (`http://127.0.0.1:port`) and the request log.
pub async fn spawn_server<F>(respond: F) -> (String, Seen)
where
    F: Fn(&str) -> Vec<u8> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let respond = Arc::new(respond);

    let log = Arc::clone(&seen);
    tokio::spawn(async move {
        loop {
            if let Ok((mut socket, _)) = listener.accept().await {
                let respond = Arc::clone(&respond);
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    let request = read_request(&mut socket).await;
                    let response = respond(&request);
                    log.lock().unwrap().push(request);
                    let _ = socket.write_all(&response).await;
                    let _ = socket.shutdown().await;
                });
            }
        }
    });

    (format!("http://{}", addr), seen)
}

/// A complete response with a Content-Length body.
pub fn http_response(status: &str, headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
    let mut out = format!("HTTP/1.1 {}\r\n", status);
    for (name, value) in headers {
        out.push_str(&format!("{}: {}\r\n", name, value));
    }
    out.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    ));
    let mut bytes = out.into_bytes();
    bytes.extend_from_slice(body);
    bytes
}

/// The request line of a raw request.
pub fn request_line(request: &str) -> &str {
    request.lines().next().unwrap_or_default()
}

/// Case-insensitive header lookup in a raw request.
pub fn request_header(request: &str, name: &str) -> Option<String> {
    let prefix = format!("{}:", name.to_lowercase());
    request
        .split("\r\n\r\n")
        .next()
        .unwrap_or_default()
        .lines()
        .find(|l| l.to_lowercase().starts_with(&prefix))
        .map(|l| l[prefix.len()..].trim().to_string())
}

/// The body of a raw request.
pub fn request_body(request: &str) -> &str {
    request.split_once("\r\n\r\n").map(|(_, b)| b).unwrap_or_default()
}
