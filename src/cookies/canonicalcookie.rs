use time::OffsetDateTime;

/// Represents a cookie.
/// Modeled after Chromium's `net::CanonicalCookie`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub creation_time: OffsetDateTime,
    pub expiration_time: Option<OffsetDateTime>,
    pub last_access_time: OffsetDateTime,
    pub secure: bool,
    pub http_only: bool,
    pub host_only: bool,
    pub same_site: SameSite,
    pub priority: CookiePriority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Unspecified,
    NoRestriction,
    Lax,
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CookiePriority {
    Low,
    Medium,
    High,
}

impl CanonicalCookie {
    /// A host-only session cookie; callers adjust the public fields as needed.
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
        path: impl Into<String>,
        creation_time: OffsetDateTime,
        expiration_time: Option<OffsetDateTime>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: path.into(),
            creation_time,
            expiration_time,
            last_access_time: creation_time,
            secure: false,
            http_only: false,
            host_only: true,
            same_site: SameSite::Unspecified,
            priority: CookiePriority::Medium,
        }
    }

    pub fn is_expired(&self, current_time: OffsetDateTime) -> bool {
        match self.expiration_time {
            Some(expiry) => expiry <= current_time,
            None => false,
        }
    }

    /// Seconds until expiry, clamped at zero; `-1` for session cookies.
    pub fn max_age(&self, current_time: OffsetDateTime) -> i64 {
        match self.expiration_time {
            Some(expiry) => (expiry - current_time).whole_seconds().max(0),
            None => -1,
        }
    }

    /// Session cookies are discarded when the store goes away.
    pub fn is_discard(&self) -> bool {
        self.expiration_time.is_none()
    }
}
