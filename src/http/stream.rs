use crate::base::neterror::NetError;
use crate::http::responsebody::map_hyper_error;
use crate::socket::connectjob::ConnectJob;
use crate::socket::proxy::ProxySettings;
use bytes::Bytes;
use http::{Request, Response};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use std::time::Duration;
use tokio::task::JoinHandle;
use url::Url;

/// An HTTP/1.1 stream over one freshly connected socket.
/// Equivalent to net::HttpStream.
///
/// The connection driver task is aborted when the stream is dropped, which
/// closes the socket.
pub struct HttpStream {
    sender: http1::SendRequest<Full<Bytes>>,
    driver: JoinHandle<()>,
}

impl HttpStream {
    /// Connect to `url` (through `proxy` when set) and perform the HTTP/1.1
    /// handshake.
    pub async fn connect(
        url: &Url,
        proxy: Option<&ProxySettings>,
        timeout: Option<Duration>,
    ) -> Result<Self, NetError> {
        let socket = ConnectJob::connect(url, proxy, timeout).await?;
        let io = TokioIo::new(socket);

        let (sender, conn) = http1::handshake(io)
            .await
            .map_err(|_| NetError::ConnectionFailed)?;

        let driver = tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!(error = %e, "connection driver finished with error");
            }
        });

        Ok(Self { sender, driver })
    }

    pub async fn send_request(
        &mut self,
        req: Request<Full<Bytes>>,
    ) -> Result<Response<Incoming>, NetError> {
        self.sender.send_request(req).await.map_err(|e| {
            tracing::debug!(error = %e, "request failed");
            map_hyper_error(e)
        })
    }
}

impl Drop for HttpStream {
    fn drop(&mut self) {
        self.driver.abort();
    }
}
