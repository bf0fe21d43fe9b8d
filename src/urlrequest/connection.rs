//! The seam between the user agent and the network.
//!
//! A [`Transport`] opens one [`Connection`] per request. The default
//! [`HttpTransport`] hands out [`URLRequestHttpJob`]s; tests and embedders can
//! plug in their own.

use crate::base::neterror::NetError;
use crate::cookies::monster::CookieMonster;
use crate::http::requestbody::RequestBody;
use crate::http::responsebody::ResponseBody;
use crate::socket::proxy::ProxySettings;
use crate::urlrequest::job::URLRequestHttpJob;
use futures::future::BoxFuture;
use http::{HeaderMap, Method};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Opens connections to a URL, optionally through a proxy.
pub trait Transport: Send + Sync {
    fn open(
        &self,
        url: &Url,
        proxy: Option<&ProxySettings>,
    ) -> Result<Box<dyn Connection>, NetError>;
}

/// One request/response exchange, configured before `connect`.
pub trait Connection: Send {
    /// Connect and read timeout; `None` waits forever.
    fn set_timeout(&mut self, timeout: Option<Duration>);

    fn set_request_property(&mut self, key: &str, value: &str) -> Result<(), NetError>;

    fn set_follow_redirects(&mut self, follow: bool);

    fn set_method(&mut self, method: Method);

    fn set_body(&mut self, body: RequestBody);

    /// Send the request and wait for the response headers.
    fn connect(&mut self) -> BoxFuture<'_, Result<(), NetError>>;

    /// `None` until a response has been received.
    fn response_code(&self) -> Option<u16>;

    fn response_message(&self) -> Option<String>;

    fn header_fields(&self) -> Option<HeaderMap>;

    /// The response body. Fails with [`NetError::HttpResponseCodeFailure`] when
    /// the status is 400 or above; the body is then on the error stream.
    fn input_stream(&mut self) -> Result<ResponseBody, NetError>;

    /// The error page body, available only for statuses of 400 and above.
    fn error_stream(&mut self) -> Option<ResponseBody>;

    /// Release the connection. Safe to call more than once.
    fn disconnect(&mut self);
}

/// The default hyper-backed transport. Cookies flow through the shared jar.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    cookie_store: Arc<CookieMonster>,
}

impl HttpTransport {
    pub fn new(cookie_store: Arc<CookieMonster>) -> Self {
        Self { cookie_store }
    }

    pub fn cookie_store(&self) -> &Arc<CookieMonster> {
        &self.cookie_store
    }
}

impl Transport for HttpTransport {
    fn open(
        &self,
        url: &Url,
        proxy: Option<&ProxySettings>,
    ) -> Result<Box<dyn Connection>, NetError> {
        validate_url(url)?;
        let mut job = URLRequestHttpJob::new(url.clone(), Arc::clone(&self.cookie_store));
        job.set_proxy(proxy.cloned());
        Ok(Box::new(job))
    }
}

/// Only absolute http(s) URLs with a host can be fetched.
pub(crate) fn validate_url(url: &Url) -> Result<(), NetError> {
    match url.scheme() {
        "http" | "https" => {}
        _ => return Err(NetError::UnknownUrlScheme),
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(NetError::AddressInvalid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> HttpTransport {
        HttpTransport::new(Arc::new(CookieMonster::new()))
    }

    #[test]
    fn test_open_rejects_unknown_scheme() {
        let url = Url::parse("ftp://example.com/file").unwrap();
        assert_eq!(
            transport().open(&url, None).err(),
            Some(NetError::UnknownUrlScheme)
        );
    }

    #[test]
    fn test_validate_url() {
        let url = Url::parse("mailto:someone@example.com").unwrap();
        assert_eq!(
            transport().open(&url, None).err(),
            Some(NetError::UnknownUrlScheme)
        );
        assert_eq!(
            validate_url(&Url::parse("http://example.com/").unwrap()),
            Ok(())
        );
    }

    #[test]
    fn test_open_returns_unconnected_job() {
        let url = Url::parse("http://example.com/").unwrap();
        let conn = transport().open(&url, None).unwrap();
        assert_eq!(conn.response_code(), None);
        assert!(conn.header_fields().is_none());
    }
}
