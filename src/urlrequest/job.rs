use crate::base::neterror::NetError;
use crate::cookies::monster::CookieMonster;
use crate::http::orderedheaders::OrderedHeaderMap;
use crate::http::requestbody::RequestBody;
use crate::http::responsebody::ResponseBody;
use crate::http::transaction::HttpNetworkTransaction;
use crate::socket::proxy::ProxySettings;
use crate::urlrequest::connection::{validate_url, Connection};
use futures::future::BoxFuture;
use http::response::Parts;
use http::{HeaderMap, Method, StatusCode};
use hyper::body::Incoming;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Chromium's default redirect limit.
const MAX_REDIRECTS: u8 = 20;

/// The default [`Connection`]: runs one transaction per hop and follows
/// redirects when asked to.
pub struct URLRequestHttpJob {
    url: Url,
    cookie_store: Arc<CookieMonster>,
    proxy: Option<ProxySettings>,
    method: Method,
    body: RequestBody,
    headers: OrderedHeaderMap,
    timeout: Option<Duration>,
    follow_redirects: bool,
    redirect_limit: u8,
    // Holds the connection open while the body is read.
    transaction: Option<HttpNetworkTransaction>,
    parts: Option<Parts>,
    body_stream: Option<Incoming>,
}

impl URLRequestHttpJob {
    pub fn new(url: Url, cookie_store: Arc<CookieMonster>) -> Self {
        Self {
            url,
            cookie_store,
            proxy: None,
            method: Method::GET,
            body: RequestBody::Empty,
            headers: OrderedHeaderMap::new(),
            timeout: None,
            follow_redirects: false,
            redirect_limit: MAX_REDIRECTS,
            transaction: None,
            parts: None,
            body_stream: None,
        }
    }

    pub fn set_proxy(&mut self, proxy: Option<ProxySettings>) {
        self.proxy = proxy;
    }

    pub async fn start(&mut self) -> Result<(), NetError> {
        loop {
            let mut transaction =
                HttpNetworkTransaction::new(self.url.clone(), Arc::clone(&self.cookie_store));
            transaction.set_method(self.method.clone());
            transaction.set_body(self.body.clone());
            transaction.set_headers(self.headers.clone());
            transaction.set_proxy(self.proxy.clone());
            transaction.set_timeout(self.timeout);

            transaction.start().await?;
            let response = transaction
                .take_response()
                .ok_or(NetError::EmptyResponse)?;

            let redirect = if self.follow_redirects {
                self.redirect_target(response.status(), response.headers())?
            } else {
                None
            };

            match redirect {
                Some(new_url) => {
                    if self.redirect_limit == 0 {
                        return Err(NetError::TooManyRedirects);
                    }
                    self.redirect_limit -= 1;
                    tracing::debug!(from = %self.url, to = %new_url, status = response.status().as_u16(), "following redirect");

                    self.rewrite_method(response.status());
                    self.url = new_url;
                    // Dropping the transaction closes the previous hop
                }
                None => {
                    let (parts, body) = response.into_parts();
                    self.parts = Some(parts);
                    self.body_stream = Some(body);
                    self.transaction = Some(transaction);
                    return Ok(());
                }
            }
        }
    }

    fn redirect_target(
        &self,
        status: StatusCode,
        headers: &HeaderMap,
    ) -> Result<Option<Url>, NetError> {
        if !matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308) {
            return Ok(None);
        }
        let Some(location) = headers.get(http::header::LOCATION) else {
            return Ok(None);
        };
        let location = location.to_str().map_err(|_| NetError::InvalidRedirect)?;
        let target = self
            .url
            .join(location)
            .map_err(|_| NetError::InvalidRedirect)?;
        validate_url(&target).map_err(|_| NetError::InvalidRedirect)?;
        Ok(Some(target))
    }

    /// 303 always becomes GET; 301 and 302 turn a POST into a GET.
    fn rewrite_method(&mut self, status: StatusCode) {
        let to_get = match status.as_u16() {
            303 => self.method != Method::HEAD,
            301 | 302 => self.method == Method::POST,
            _ => false,
        };
        if to_get {
            self.method = Method::GET;
            self.body = RequestBody::Empty;
            self.headers.remove("Content-Type");
            self.headers.remove("Content-Length");
        }
    }

    fn status_code(&self) -> Option<u16> {
        self.parts.as_ref().map(|p| p.status.as_u16())
    }
}

impl Connection for URLRequestHttpJob {
    fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    fn set_request_property(&mut self, key: &str, value: &str) -> Result<(), NetError> {
        self.headers.insert(key, value)
    }

    fn set_follow_redirects(&mut self, follow: bool) {
        self.follow_redirects = follow;
    }

    fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    fn set_body(&mut self, body: RequestBody) {
        self.body = body;
    }

    fn connect(&mut self) -> BoxFuture<'_, Result<(), NetError>> {
        Box::pin(async move {
            if self.parts.is_some() {
                return Err(NetError::AlreadyConnected);
            }
            self.start().await
        })
    }

    fn response_code(&self) -> Option<u16> {
        self.status_code()
    }

    fn response_message(&self) -> Option<String> {
        let parts = self.parts.as_ref()?;
        let message = match parts.extensions.get::<hyper::ext::ReasonPhrase>() {
            Some(reason) => String::from_utf8_lossy(reason.as_bytes()).into_owned(),
            None => parts.status.canonical_reason().unwrap_or_default().to_string(),
        };
        Some(message)
    }

    fn header_fields(&self) -> Option<HeaderMap> {
        self.parts.as_ref().map(|p| p.headers.clone())
    }

    fn input_stream(&mut self) -> Result<ResponseBody, NetError> {
        match self.status_code() {
            None => Err(NetError::ConnectionClosed),
            Some(code) if code >= 400 => Err(NetError::HttpResponseCodeFailure),
            Some(_) => self
                .body_stream
                .take()
                .map(|b| ResponseBody::from_incoming(b).with_read_timeout(self.timeout))
                .ok_or(NetError::ConnectionClosed),
        }
    }

    fn error_stream(&mut self) -> Option<ResponseBody> {
        match self.status_code() {
            Some(code) if code >= 400 => self
                .body_stream
                .take()
                .map(|b| ResponseBody::from_incoming(b).with_read_timeout(self.timeout)),
            _ => None,
        }
    }

    fn disconnect(&mut self) {
        self.body_stream = None;
        if let Some(mut transaction) = self.transaction.take() {
            transaction.close();
        }
    }
}
