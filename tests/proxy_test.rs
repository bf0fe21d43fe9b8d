//! Proxy Tests
//!
//! Covers:
//! - `ProxySettings` construction and Basic credentials
//! - Plain http through a proxy (absolute-form requests)
//! - https through a proxy (CONNECT tunnel)

mod common;

use common::{http_response, read_request, request_header, request_line, spawn_server};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use useragent::{ProxyConfig, ProxySettings, RequestStatus, UserAgent};

#[test]
fn test_proxy_settings_http() {
    let proxy = ProxySettings::http("proxy.example.com", 8080)
        .unwrap()
        .with_auth("user", "pass");

    assert!(proxy.requires_auth());
    assert_eq!(proxy.get_auth_header().unwrap(), "Basic dXNlcjpwYXNz"); // user:pass base64

    let (host, port) = proxy.host_port().unwrap();
    assert_eq!(host, "proxy.example.com");
    assert_eq!(port, 8080);
}

#[test]
fn test_proxy_config_resolves_settings() {
    assert!(ProxyConfig::None.settings().unwrap().is_none());

    let anonymous = ProxyConfig::Anonymous {
        host: "10.1.1.1".to_string(),
        port: 3128,
    }
    .settings()
    .unwrap()
    .unwrap();
    assert!(!anonymous.requires_auth());
}

#[tokio::test]
async fn test_plain_http_uses_absolute_form() {
    let (proxy_base, seen) =
        spawn_server(|_| http_response("200 OK", &[], b"PROXIED")).await;
    let proxy_port: u16 = proxy_base.rsplit(':').next().unwrap().parse().unwrap();

    let mut agent = UserAgent::new();
    agent.set_proxy_anonymous("127.0.0.1", proxy_port);
    // The target name is never resolved locally; only the proxy is dialed
    let response = agent.do_get("http://target.invalid/path?x=1").await;

    assert_eq!(response.status(), RequestStatus::NoError);
    assert_eq!(response.content(), b"PROXIED");

    let requests = seen.lock().unwrap();
    assert_eq!(
        request_line(&requests[0]),
        "GET http://target.invalid/path?x=1 HTTP/1.1"
    );
    assert_eq!(request_header(&requests[0], "host").as_deref(), Some("target.invalid"));
    assert_eq!(request_header(&requests[0], "proxy-authorization"), None);
}

#[tokio::test]
async fn test_authenticated_proxy_sends_credentials() {
    let (proxy_base, seen) = spawn_server(|_| http_response("200 OK", &[], b"")).await;
    let proxy_port: u16 = proxy_base.rsplit(':').next().unwrap().parse().unwrap();

    let mut agent = UserAgent::new();
    agent.set_proxy_authentication("127.0.0.1", proxy_port, "user", "pass");
    agent.do_get("http://target.invalid/").await;

    let requests = seen.lock().unwrap();
    assert_eq!(
        request_header(&requests[0], "proxy-authorization").as_deref(),
        Some("Basic dXNlcjpwYXNz")
    );
}

#[tokio::test]
async fn test_https_tunnel_rejected_by_proxy() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let proxy_port = listener.local_addr().unwrap().port();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let request = read_request(&mut socket).await;
            log.lock().unwrap().push(request);
            let _ = socket
                .write_all(b"HTTP/1.1 407 Proxy Authentication Required\r\nContent-Length: 0\r\n\r\n")
                .await;
        }
    });

    let mut agent = UserAgent::new();
    agent.set_proxy_authentication("127.0.0.1", proxy_port, "user", "wrong");
    let response = agent.do_get("https://secure.invalid/account").await;

    assert_eq!(response.status(), RequestStatus::ErrorIo);
    assert_eq!(response.code(), 0);

    let requests = seen.lock().unwrap();
    assert_eq!(
        request_line(&requests[0]),
        "CONNECT secure.invalid:443 HTTP/1.1"
    );
    assert!(request_header(&requests[0], "proxy-authorization").is_some());
}

#[tokio::test]
async fn test_unreachable_proxy_is_io_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut agent = UserAgent::new();
    agent.set_proxy_anonymous("127.0.0.1", port);
    let response = agent.do_get("http://target.invalid/").await;
    assert_eq!(response.status(), RequestStatus::ErrorIo);
}

#[tokio::test]
async fn test_empty_proxy_host_is_bad_url() {
    let mut agent = UserAgent::new();
    agent.set_proxy_anonymous("", 8080);
    let response = agent.do_get("http://target.invalid/").await;
    assert_eq!(response.status(), RequestStatus::ErrorBadUrl);
}
