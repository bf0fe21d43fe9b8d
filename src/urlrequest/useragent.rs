//! The request executor.
//!
//! A [`UserAgent`] owns its configuration and cookie jar and turns each
//! `do_get*` / `do_post*` call into a fully buffered [`HttpResponse`].
//! Failures never surface as `Err`; they are classified into the record's
//! [`RequestStatus`].
//!
//! ```rust,no_run
//! use useragent::{UserAgent, USER_AGENT_MOZILLA_LINUX};
//!
//! # async fn run() {
//! let mut agent = UserAgent::new();
//! agent.set_request_property("User-Agent", USER_AGENT_MOZILLA_LINUX);
//! let response = agent.do_get_with_params("http://example.com/search", [("q", "rust")]).await;
//! if response.is_success() {
//!     println!("{}", response.text().unwrap_or_default());
//! }
//! # }
//! ```

use crate::base::neterror::NetError;
use crate::base::status::RequestStatus;
use crate::cookies::monster::CookieMonster;
use crate::cookies::policy::CookiePolicy;
use crate::http::requestbody::RequestBody;
use crate::http::response::HttpResponse;
use crate::http::responsebody::ResponseBody;
use crate::socket::proxy::ProxyConfig;
use crate::urlrequest::config::UserAgentConfig;
use crate::urlrequest::connection::{Connection, HttpTransport, Transport};
use crate::urlrequest::params::{append_query, encode_params, pairs_to_params};
use http::Method;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Configurable HTTP client issuing one request at a time.
pub struct UserAgent {
    config: UserAgentConfig,
    cookie_store: Arc<CookieMonster>,
    transport: Box<dyn Transport>,
}

impl Default for UserAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for UserAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserAgent")
            .field("config", &self.config)
            .field("cookie_store", &self.cookie_store)
            .finish_non_exhaustive()
    }
}

impl UserAgent {
    pub fn new() -> Self {
        Self::with_config(UserAgentConfig::default())
    }

    pub fn with_config(config: UserAgentConfig) -> Self {
        let cookie_store = Arc::new(CookieMonster::with_policy(policy_for(&config)));
        let transport = Box::new(HttpTransport::new(Arc::clone(&cookie_store)));
        Self {
            config,
            cookie_store,
            transport,
        }
    }

    /// Use a custom transport. The agent's own cookie jar is only consulted
    /// by transports that were handed [`UserAgent::cookie_store`].
    pub fn with_transport(config: UserAgentConfig, transport: Box<dyn Transport>) -> Self {
        let cookie_store = Arc::new(CookieMonster::with_policy(policy_for(&config)));
        Self {
            config,
            cookie_store,
            transport,
        }
    }

    pub fn config(&self) -> &UserAgentConfig {
        &self.config
    }

    pub fn cookie_store(&self) -> &Arc<CookieMonster> {
        &self.cookie_store
    }

    // ---- request properties ----

    /// Returns the previous value for `key`, if any.
    pub fn set_request_property(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        self.config.headers.insert(key.into(), value.into())
    }

    pub fn request_property(&self, key: &str) -> Option<&str> {
        self.config.headers.get(key).map(String::as_str)
    }

    pub fn remove_request_property(&mut self, key: &str) -> Option<String> {
        self.config.headers.remove(key)
    }

    pub fn clear_all_request_properties(&mut self) {
        self.config.headers.clear();
    }

    // ---- limits ----

    /// `Duration::ZERO` disables the timeout.
    pub fn set_connect_timeout(&mut self, timeout: Duration) {
        self.config.set_timeout(timeout);
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.config.timeout()
    }

    pub fn set_response_size_max(&mut self, max: usize) {
        self.config.max_response_size = max;
    }

    pub fn response_size_max(&self) -> usize {
        self.config.max_response_size
    }

    // ---- proxy ----

    pub fn set_proxy_none(&mut self) {
        self.config.proxy = ProxyConfig::None;
    }

    pub fn set_proxy_anonymous(&mut self, host: impl Into<String>, port: u16) {
        self.config.proxy = ProxyConfig::Anonymous {
            host: host.into(),
            port,
        };
    }

    pub fn set_proxy_authentication(
        &mut self,
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
    ) {
        self.config.proxy = ProxyConfig::Authenticated {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
        };
    }

    pub fn proxy(&self) -> &ProxyConfig {
        &self.config.proxy
    }

    // ---- redirects ----

    pub fn set_auto_redirect(&mut self, follow: bool) {
        self.config.auto_redirect = follow;
    }

    pub fn auto_redirect(&self) -> bool {
        self.config.auto_redirect
    }

    // ---- cookies ----

    pub fn enable_cookies(&mut self) {
        self.config.cookies_enabled = true;
        self.cookie_store.set_policy(CookiePolicy::AcceptOriginalServer);
    }

    /// Clears the jar and stops accepting new cookies.
    pub fn disable_cookies(&mut self) {
        self.config.cookies_enabled = false;
        self.cookie_store.clear();
        self.cookie_store.set_policy(CookiePolicy::AcceptNone);
    }

    pub fn delete_cookies(&mut self) {
        self.cookie_store.clear();
    }

    pub fn cookies_enabled(&self) -> bool {
        self.config.cookies_enabled
    }

    // ---- referer ----

    pub fn enable_referer_autoset(&mut self) {
        self.config.referer_autoset = true;
    }

    pub fn disable_referer_autoset(&mut self) {
        self.config.referer_autoset = false;
    }

    pub fn referer_autoset(&self) -> bool {
        self.config.referer_autoset
    }

    // ---- GET ----

    pub async fn do_get(&mut self, url: &str) -> HttpResponse {
        self.execute(url.to_string(), Method::GET, RequestBody::Empty)
            .await
    }

    /// GET with `params` appended as a query string.
    pub async fn do_get_with_params<I, K, V>(&mut self, url: &str, params: I) -> HttpResponse
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let full_url = append_query(url, &encode_params(params));
        self.execute(full_url, Method::GET, RequestBody::Empty).await
    }

    /// GET with positional `[k0, v0, k1, v1, ...]` parameters.
    ///
    /// Pairs are strided, not overlapping: `["a", "1", "b", "2"]` sends
    /// `a=1&b=2`. A trailing odd element is dropped.
    pub async fn do_get_with_pairs<S: AsRef<str>>(&mut self, url: &str, pairs: &[S]) -> HttpResponse {
        let query = encode_params(pairs_to_params(pairs));
        self.execute(append_query(url, &query), Method::GET, RequestBody::Empty)
            .await
    }

    // ---- POST ----

    /// POST `body` verbatim.
    pub async fn do_post(&mut self, url: &str, body: &str) -> HttpResponse {
        self.execute(url.to_string(), Method::POST, RequestBody::from(body))
            .await
    }

    /// POST `params` form-encoded.
    pub async fn do_post_with_params<I, K, V>(&mut self, url: &str, params: I) -> HttpResponse
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let body = encode_params(params);
        self.execute(url.to_string(), Method::POST, RequestBody::from(body))
            .await
    }

    /// POST with a form body built from strided `[k0, v0, k1, v1, ...]` pairs.
    pub async fn do_post_with_pairs<S: AsRef<str>>(&mut self, url: &str, pairs: &[S]) -> HttpResponse {
        let body = encode_params(pairs_to_params(pairs));
        self.execute(url.to_string(), Method::POST, RequestBody::from(body))
            .await
    }

    // ---- execution ----

    async fn execute(&mut self, url_str: String, method: Method, body: RequestBody) -> HttpResponse {
        let mut response = HttpResponse::new(url_str.as_str());

        let url = match Url::parse(&url_str) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!(url = %url_str, error = %e, "malformed url");
                response.set_status(RequestStatus::ErrorMalformedUrl);
                return response;
            }
        };

        match self.exchange(&url, method, body, &mut response).await {
            Ok(()) => {
                if self.config.referer_autoset {
                    self.config
                        .headers
                        .insert("Referer".to_string(), url_str);
                }
            }
            Err(e) => {
                let status = RequestStatus::from(&e);
                tracing::debug!(url = %url, error = %e, code = e.as_i32(), %status, "request failed");
                response.set_status(status);
            }
        }

        response
    }

    async fn exchange(
        &self,
        url: &Url,
        method: Method,
        body: RequestBody,
        response: &mut HttpResponse,
    ) -> Result<(), NetError> {
        let proxy = self.config.proxy.settings()?;
        let mut conn = ConnectionGuard::new(self.transport.open(url, proxy.as_ref())?);

        conn.set_timeout(self.config.timeout());
        for (key, value) in &self.config.headers {
            conn.set_request_property(key, value)?;
        }
        conn.set_follow_redirects(self.config.auto_redirect);

        let is_post = method == Method::POST;
        conn.set_method(method);
        if is_post {
            if !self.has_header("Content-Type") {
                conn.set_request_property("Content-Type", FORM_CONTENT_TYPE)?;
            }
            conn.set_body(body);
        }

        conn.connect().await?;

        let code = conn.response_code().ok_or(NetError::EmptyResponse)?;
        response.set_code(code);
        if let Some(headers) = conn.header_fields() {
            response.set_headers(headers);
        }
        if let Some(message) = conn.response_message() {
            response.set_message(message);
        }
        tracing::debug!(url = %url, code, status = %response.status(), "response received");

        let max = self.config.max_response_size;
        match conn.input_stream() {
            Ok(mut stream) => read_capped(&mut stream, response, max).await,
            Err(e) => match conn.error_stream() {
                Some(mut stream) => {
                    tracing::debug!(url = %url, code, "reading error stream");
                    read_capped(&mut stream, response, max).await
                }
                None => {
                    tracing::warn!(url = %url, error = %e, "no input or error stream");
                    Err(e)
                }
            },
        }
    }

    fn has_header(&self, name: &str) -> bool {
        self.config
            .headers
            .keys()
            .any(|k| k.eq_ignore_ascii_case(name))
    }
}

fn policy_for(config: &UserAgentConfig) -> CookiePolicy {
    if config.cookies_enabled {
        CookiePolicy::AcceptOriginalServer
    } else {
        CookiePolicy::AcceptNone
    }
}

/// Stream `body` into the response, stopping silently at `max` bytes.
async fn read_capped(
    body: &mut ResponseBody,
    response: &mut HttpResponse,
    max: usize,
) -> Result<(), NetError> {
    while let Some(chunk) = body.chunk().await? {
        let remaining = max.saturating_sub(response.content_length());
        if chunk.len() >= remaining {
            response.write_content(&chunk, remaining);
            if chunk.len() > remaining {
                tracing::debug!(max, "response truncated at size limit");
            }
            break;
        }
        response.write_content(&chunk, chunk.len());
    }
    Ok(())
}

/// Disconnects on every exit path.
struct ConnectionGuard {
    conn: Box<dyn Connection>,
}

impl ConnectionGuard {
    fn new(conn: Box<dyn Connection>) -> Self {
        Self { conn }
    }
}

impl Deref for ConnectionGuard {
    type Target = dyn Connection;

    fn deref(&self) -> &Self::Target {
        self.conn.as_ref()
    }
}

impl DerefMut for ConnectionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_mut()
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.conn.disconnect();
    }
}
