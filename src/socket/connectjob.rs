use crate::base::neterror::NetError;
use crate::socket::client::SocketType;
use crate::socket::proxy::ProxySettings;
use boring::ssl::{SslConnector, SslMethod};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use url::Url;

/// Upper bound on the size of a proxy's CONNECT response head.
const MAX_TUNNEL_RESPONSE: usize = 8192;

/// Manages the connection process: DNS -> TCP -> (tunnel) -> SSL.
/// Roughly equivalent to net::ConnectJob.
pub struct ConnectJob;

impl ConnectJob {
    /// Connect to `url` (or to `proxy`), bounded as a whole by `timeout`.
    pub async fn connect(
        url: &Url,
        proxy: Option<&ProxySettings>,
        timeout: Option<Duration>,
    ) -> Result<SocketType, NetError> {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, Self::do_connect(url, proxy))
                .await
                .map_err(|_| {
                    tracing::debug!(url = %url, ?limit, "connect timed out");
                    NetError::ConnectionTimedOut
                })?,
            None => Self::do_connect(url, proxy).await,
        }
    }

    async fn do_connect(url: &Url, proxy: Option<&ProxySettings>) -> Result<SocketType, NetError> {
        let target_host = url.host_str().ok_or(NetError::InvalidUrl)?;
        let target_port = url.port_or_known_default().ok_or(NetError::InvalidUrl)?;

        let (host, port) = match proxy {
            // If proxy, we connect to PROXY host/port first
            Some(p) => p.host_port().ok_or(NetError::AddressInvalid)?,
            None => (target_host, target_port),
        };

        // 1. DNS Resolution
        let addr_str = format!("{}:{}", host, port);
        let addrs = tokio::net::lookup_host(&addr_str).await.map_err(|e| {
            tracing::debug!(host = %host, error = %e, "DNS resolution failed");
            NetError::NameNotResolved
        })?;

        // 2. TCP Connect (to proxy or destination)
        let mut last_err = NetError::NameNotResolved;
        let mut stream = None;
        for addr in addrs {
            match TcpStream::connect(addr).await {
                Ok(s) => {
                    tracing::debug!(%addr, "tcp connected");
                    stream = Some(s);
                    break;
                }
                Err(e) => {
                    tracing::debug!(%addr, error = %e, "tcp connect failed");
                    last_err = NetError::from_io(&e);
                }
            }
        }
        let mut stream = match stream {
            Some(s) => s,
            None if proxy.is_some() => return Err(NetError::ProxyConnectionFailed),
            None => return Err(last_err),
        };

        let secure = url.scheme() == "https";

        // 2b. Plain http goes through the proxy as absolute-form requests;
        // https needs a CONNECT tunnel first.
        if let (Some(p), true) = (proxy, secure) {
            Self::establish_tunnel(&mut stream, target_host, target_port, p).await?;
        }

        // 3. SSL Handshake (if https) - always happens *after* any tunnel is established
        if secure {
            Self::ssl_handshake(stream, target_host).await
        } else {
            Ok(SocketType::Tcp(stream))
        }
    }

    async fn establish_tunnel(
        stream: &mut TcpStream,
        target_host: &str,
        target_port: u16,
        proxy: &ProxySettings,
    ) -> Result<(), NetError> {
        let target = format!("{}:{}", target_host, target_port);
        let mut connect_req = format!("CONNECT {} HTTP/1.1\r\nHost: {}\r\n", target, target);
        if let Some(auth) = proxy.get_auth_header() {
            connect_req.push_str(&format!("Proxy-Authorization: {}\r\n", auth));
        }
        connect_req.push_str("\r\n");

        stream
            .write_all(connect_req.as_bytes())
            .await
            .map_err(|_| NetError::TunnelConnectionFailed)?;

        // Read the response head; the tunnel carries nothing else until we speak.
        let mut head = Vec::with_capacity(512);
        let mut buf = [0u8; 512];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream
                .read(&mut buf)
                .await
                .map_err(|_| NetError::TunnelConnectionFailed)?;
            if n == 0 || head.len() + n > MAX_TUNNEL_RESPONSE {
                return Err(NetError::TunnelConnectionFailed);
            }
            head.extend_from_slice(&buf[..n]);
        }

        let status_line = String::from_utf8_lossy(&head);
        let status_line = status_line.lines().next().unwrap_or_default();
        let code = status_line.split_whitespace().nth(1);
        match code {
            Some("200") => Ok(()),
            Some("407") => Err(NetError::ProxyAuthRequested),
            _ => {
                tracing::warn!(status = %status_line, target = %target, "proxy tunnel refused");
                Err(NetError::TunnelConnectionFailed)
            }
        }
    }

    async fn ssl_handshake(stream: TcpStream, host: &str) -> Result<SocketType, NetError> {
        let mut builder =
            SslConnector::builder(SslMethod::tls()).map_err(|_| NetError::SslProtocolError)?;
        // Only HTTP/1.1 is spoken on the resulting stream
        builder
            .set_alpn_protos(b"\x08http/1.1")
            .map_err(|_| NetError::SslProtocolError)?;

        let connector = builder.build();
        let mut config = connector.configure().map_err(|_| NetError::SslProtocolError)?;

        // Per RFC 6066, SNI MUST NOT be set for raw IP addresses.
        let bare_host = host.trim_start_matches('[').trim_end_matches(']');
        if bare_host.parse::<std::net::IpAddr>().is_ok() {
            config.set_use_server_name_indication(false);
        }

        let tls_stream = tokio_boring::connect(config, bare_host, stream)
            .await
            .map_err(|e| {
                tracing::debug!(host = %host, error = ?e, "SSL handshake failed");
                NetError::SslProtocolError
            })?;

        Ok(SocketType::Ssl(tls_stream))
    }
}
