use crate::base::neterror::NetError;
use crate::cookies::monster::CookieMonster;
use crate::http::orderedheaders::OrderedHeaderMap;
use crate::http::requestbody::RequestBody;
use crate::http::stream::HttpStream;
use crate::socket::proxy::ProxySettings;
use http::{Method, Request, Response, Version};
use hyper::body::Incoming;
use std::sync::Arc;
use std::time::Duration;
use url::{Position, Url};

/// Internal state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    CreateStream,
    SendRequest,
    ReadHeaders,
    Done,
}

/// One request/response exchange over a fresh connection.
/// Equivalent to net::HttpNetworkTransaction, minus pooling and retries.
pub struct HttpNetworkTransaction {
    url: Url,
    method: Method,
    body: RequestBody,
    state: State,
    stream: Option<HttpStream>,
    response: Option<Response<Incoming>>,
    request_headers: OrderedHeaderMap,
    cookie_store: Arc<CookieMonster>,
    proxy_settings: Option<ProxySettings>,
    timeout: Option<Duration>,
}

impl HttpNetworkTransaction {
    pub fn new(url: Url, cookie_store: Arc<CookieMonster>) -> Self {
        Self {
            url,
            method: Method::GET,
            body: RequestBody::Empty,
            state: State::Idle,
            stream: None,
            response: None,
            request_headers: OrderedHeaderMap::default(),
            cookie_store,
            proxy_settings: None,
            timeout: None,
        }
    }

    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    pub fn set_body(&mut self, body: RequestBody) {
        self.body = body;
    }

    pub fn set_proxy(&mut self, proxy: Option<ProxySettings>) {
        self.proxy_settings = proxy;
    }

    /// Bounds the connect and the wait for response headers separately.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    pub fn set_headers(&mut self, headers: OrderedHeaderMap) {
        self.request_headers = headers;
    }

    pub async fn start(&mut self) -> Result<(), NetError> {
        self.state = State::CreateStream;
        self.do_loop().await
    }

    async fn do_loop(&mut self) -> Result<(), NetError> {
        loop {
            match self.state {
                State::Idle | State::Done => return Ok(()),
                State::CreateStream => {
                    let stream =
                        HttpStream::connect(&self.url, self.proxy_settings.as_ref(), self.timeout)
                            .await?;
                    self.stream = Some(stream);
                    self.state = State::SendRequest;
                }
                State::SendRequest => {
                    let req = self.build_request()?;
                    let stream = self.stream.as_mut().ok_or(NetError::ConnectionClosed)?;

                    tracing::debug!(method = %self.method, url = %self.url, "sending request");
                    let resp = match self.timeout {
                        Some(limit) => tokio::time::timeout(limit, stream.send_request(req))
                            .await
                            .map_err(|_| NetError::TimedOut)??,
                        None => stream.send_request(req).await?,
                    };

                    self.response = Some(resp);
                    self.state = State::ReadHeaders;
                }
                State::ReadHeaders => {
                    if let Some(resp) = self.response.as_ref() {
                        tracing::debug!(status = resp.status().as_u16(), url = %self.url, "response headers received");
                        for val in resp.headers().get_all(http::header::SET_COOKIE) {
                            if let Ok(s) = val.to_str() {
                                self.cookie_store.parse_and_save_cookie(&self.url, s);
                            }
                        }
                    }
                    self.state = State::Done;
                }
            }
        }
    }

    fn build_request(&self) -> Result<Request<http_body_util::Full<bytes::Bytes>>, NetError> {
        let mut headers = self.request_headers.clone();

        if !headers.contains("Host") {
            let host = self.url.host_str().ok_or(NetError::InvalidUrl)?;
            let host = match self.url.port() {
                Some(port) => format!("{}:{}", host, port),
                None => host.to_string(),
            };
            headers.insert("Host", &host)?;
        }

        if let Some(cookie_value) = self.cookie_store.cookie_header_for_url(&self.url) {
            headers.insert("Cookie", &cookie_value)?;
        }

        // Plain http through a proxy: absolute-form target plus credentials.
        // https has already been tunneled and speaks origin-form.
        let via_proxy = self
            .proxy_settings
            .as_ref()
            .filter(|_| self.url.scheme() == "http");
        let target = match via_proxy {
            Some(proxy) => {
                if let Some(auth) = proxy.get_auth_header() {
                    headers.insert("Proxy-Authorization", &auth)?;
                }
                self.url[..Position::AfterQuery].to_string()
            }
            None => self.url[Position::BeforePath..Position::AfterQuery].to_string(),
        };

        let mut req = Request::builder()
            .method(self.method.clone())
            .uri(target)
            .version(Version::HTTP_11)
            .body(self.body.clone().into_full())
            .map_err(|_| NetError::InvalidUrl)?;

        *req.headers_mut() = headers.to_header_map();
        Ok(req)
    }

    /// Take ownership of the response. The stream stays with the transaction
    /// and must outlive reading the body.
    pub fn take_response(&mut self) -> Option<Response<Incoming>> {
        self.response.take()
    }

    /// Drop the connection.
    pub fn close(&mut self) {
        self.response = None;
        self.stream = None;
        self.state = State::Idle;
    }
}
