//! Response body streaming.
//! Mirrors Chromium's HttpStream::ReadResponseBody.

use crate::base::neterror::NetError;
use bytes::Bytes;
use http_body::Body;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full};
use std::convert::Infallible;
use std::time::Duration;

/// A response body read chunk by chunk.
///
/// Each read is bounded by the optional read timeout.
pub struct ResponseBody {
    inner: UnsyncBoxBody<Bytes, NetError>,
    read_timeout: Option<Duration>,
}

impl ResponseBody {
    /// Wrap any body whose errors convert to [`NetError`].
    pub fn new<B>(body: B) -> Self
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<NetError>,
    {
        Self {
            inner: body.map_err(Into::into).boxed_unsync(),
            read_timeout: None,
        }
    }

    /// Wrap a hyper body, mapping transport errors.
    pub fn from_incoming(body: hyper::body::Incoming) -> Self {
        Self {
            inner: body.map_err(map_hyper_error).boxed_unsync(),
            read_timeout: None,
        }
    }

    /// A body with fixed contents.
    pub fn full(data: impl Into<Bytes>) -> Self {
        Self {
            inner: Full::new(data.into())
                .map_err(|never: Infallible| -> NetError { match never {} })
                .boxed_unsync(),
            read_timeout: None,
        }
    }

    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Next chunk of data, `None` at end of body. Trailers are skipped.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>, NetError> {
        loop {
            let frame = match self.read_timeout {
                Some(limit) => tokio::time::timeout(limit, self.inner.frame())
                    .await
                    .map_err(|_| NetError::TimedOut)?,
                None => self.inner.frame().await,
            };

            match frame {
                None => return Ok(None),
                Some(Err(e)) => return Err(e),
                Some(Ok(frame)) => {
                    if let Ok(data) = frame.into_data() {
                        return Ok(Some(data));
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseBody")
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}

/// Map a hyper error onto the closest network error.
pub(crate) fn map_hyper_error(err: hyper::Error) -> NetError {
    use std::error::Error as _;

    if err.is_timeout() {
        return NetError::TimedOut;
    }
    if err.is_incomplete_message() {
        return NetError::ConnectionClosed;
    }
    if err.is_parse() {
        return NetError::InvalidHttpResponse;
    }
    if let Some(io) = err.source().and_then(|s| s.downcast_ref::<std::io::Error>()) {
        return NetError::from_io(io);
    }
    NetError::HttpBodyError
}
