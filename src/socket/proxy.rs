use crate::base::neterror::NetError;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use url::Url;
use zeroize::Zeroizing;

/// Proxy choice as it appears in configuration.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProxyConfig {
    /// Connect directly.
    #[default]
    None,
    /// HTTP proxy without credentials.
    Anonymous { host: String, port: u16 },
    /// HTTP proxy with Basic credentials.
    Authenticated {
        host: String,
        port: u16,
        user: String,
        password: String,
    },
}

impl ProxyConfig {
    /// Resolve into connection-level settings, `None` for direct connections.
    pub fn settings(&self) -> Result<Option<ProxySettings>, NetError> {
        match self {
            ProxyConfig::None => Ok(None),
            ProxyConfig::Anonymous { host, port } => ProxySettings::http(host, *port).map(Some),
            ProxyConfig::Authenticated {
                host,
                port,
                user,
                password,
            } => Ok(Some(ProxySettings::http(host, *port)?.with_auth(user, password))),
        }
    }
}

impl std::fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProxyConfig::None => f.write_str("None"),
            ProxyConfig::Anonymous { host, port } => f
                .debug_struct("Anonymous")
                .field("host", host)
                .field("port", port)
                .finish(),
            ProxyConfig::Authenticated {
                host, port, user, ..
            } => f
                .debug_struct("Authenticated")
                .field("host", host)
                .field("port", port)
                .field("user", user)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

/// HTTP proxy used for one connection attempt.
///
/// Credentials travel with the settings into every connection; nothing is
/// registered process-wide.
#[derive(Debug, Clone)]
pub struct ProxySettings {
    /// Proxy URL (e.g., `http://proxy.com:8080`)
    pub url: Url,
    /// Proxy username for authentication
    pub username: Option<String>,
    /// Proxy password (zeroized on drop)
    pub password: Option<Zeroizing<String>>,
}

impl ProxySettings {
    /// Create proxy settings from URL string.
    pub fn new(url_str: &str) -> Option<Self> {
        let url = Url::parse(url_str).ok()?;
        Some(Self {
            url,
            username: None,
            password: None,
        })
    }

    /// HTTP proxy at `host:port`.
    pub fn http(host: &str, port: u16) -> Result<Self, NetError> {
        let host = host.trim();
        if host.is_empty() {
            return Err(NetError::AddressInvalid);
        }
        let authority = if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]")
        } else {
            host.to_string()
        };
        Self::new(&format!("http://{authority}:{port}")).ok_or(NetError::AddressInvalid)
    }

    /// Add authentication credentials.
    pub fn with_auth(mut self, user: &str, pass: &str) -> Self {
        self.username = Some(user.to_string());
        self.password = Some(Zeroizing::new(pass.to_string()));
        self
    }

    /// Get `Proxy-Authorization` header value.
    pub fn get_auth_header(&self) -> Option<String> {
        if let (Some(u), Some(p)) = (&self.username, &self.password) {
            let creds = Zeroizing::new(format!("{}:{}", u, p.as_str()));
            let encoded = general_purpose::STANDARD.encode(creds.as_bytes());
            Some(format!("Basic {}", encoded))
        } else {
            None
        }
    }

    /// Check if this proxy requires authentication.
    pub fn requires_auth(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// Get proxy host and port.
    pub fn host_port(&self) -> Option<(&str, u16)> {
        let host = self.url.host_str()?;
        let port = self.url.port_or_known_default().unwrap_or(80);
        Some((host, port))
    }
}
