//! User agent configuration.
//!
//! Everything a [`UserAgent`](super::useragent::UserAgent) applies to each
//! request. Loadable from JSON; every field is optional there.

use crate::base::neterror::NetError;
use crate::socket::proxy::ProxyConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Firefox 36 on Windows 8.1.
pub const USER_AGENT_MOZILLA_WINDOWS: &str =
    "Mozilla/5.0 (Windows NT 6.3; rv:36.0) Gecko/20100101 Firefox/36.0";

/// Firefox 36 on 32-bit Linux.
pub const USER_AGENT_MOZILLA_LINUX: &str =
    "Mozilla/5.0 (X11; Linux i586; rv:36.0) Gecko/20100101 Firefox/36.0";

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_MAX_RESPONSE_SIZE: usize = 1_048_576;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Request properties sent with every request, keyed as supplied.
    pub headers: BTreeMap<String, String>,

    /// Connect and read timeout in milliseconds. `0` disables it.
    pub timeout_ms: u64,

    /// Response bodies are silently truncated at this many bytes.
    pub max_response_size: usize,

    pub auto_redirect: bool,

    pub cookies_enabled: bool,

    /// Send the previous request's URL as `Referer`.
    pub referer_autoset: bool,

    pub proxy: ProxyConfig,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            headers: BTreeMap::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
            auto_redirect: false,
            cookies_enabled: true,
            referer_autoset: true,
            proxy: ProxyConfig::None,
        }
    }
}

impl std::fmt::Debug for UserAgentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserAgentConfig")
            .field("headers", &self.headers)
            .field("timeout_ms", &self.timeout_ms)
            .field("max_response_size", &self.max_response_size)
            .field("auto_redirect", &self.auto_redirect)
            .field("cookies_enabled", &self.cookies_enabled)
            .field("referer_autoset", &self.referer_autoset)
            // ProxyConfig's Debug redacts the password
            .field("proxy", &self.proxy)
            .finish()
    }
}

impl UserAgentConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// `None` when the timeout is disabled.
    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    }

    /// Reject configurations whose proxy cannot be used.
    pub fn validate(&self) -> Result<(), NetError> {
        self.proxy.settings().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = UserAgentConfig::default();
        assert_eq!(config.timeout(), Some(Duration::from_millis(10_000)));
        assert_eq!(config.max_response_size, 1_048_576);
        assert!(!config.auto_redirect);
        assert!(config.cookies_enabled);
        assert!(config.referer_autoset);
        assert!(config.headers.is_empty());
        assert_eq!(config.proxy, ProxyConfig::None);
    }

    #[test]
    fn test_zero_timeout_disables() {
        let mut config = UserAgentConfig::default();
        config.set_timeout(Duration::ZERO);
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_from_json_partial() {
        let config = UserAgentConfig::from_json(
            r#"{
                "timeout_ms": 2500,
                "headers": {"User-Agent": "fetcher/1.0"},
                "proxy": {"type": "anonymous", "host": "10.0.0.1", "port": 3128}
            }"#,
        )
        .unwrap();
        assert_eq!(config.timeout(), Some(Duration::from_millis(2500)));
        assert_eq!(config.headers["User-Agent"], "fetcher/1.0");
        assert_eq!(config.max_response_size, DEFAULT_MAX_RESPONSE_SIZE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_roundtrip() {
        let mut config = UserAgentConfig::default();
        config.auto_redirect = true;
        config
            .headers
            .insert("Accept".to_string(), "text/html".to_string());
        let json = config.to_json().unwrap();
        assert_eq!(UserAgentConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_debug_hides_password() {
        let config = UserAgentConfig {
            proxy: ProxyConfig::Authenticated {
                host: "proxy".to_string(),
                port: 8080,
                user: "bob".to_string(),
                password: "hunter2".to_string(),
            },
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("bob"));
    }
}
