//! Cookie acceptance policy.
//!
//! Domain checks use Mozilla's Public Suffix List via the `psl` crate, so a
//! server cannot plant a cookie on `.com` or `.co.uk`.

use psl::{List, Psl};
use serde::{Deserialize, Serialize};

/// Which `Set-Cookie` headers a store accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CookiePolicy {
    /// Accept cookies whose domain matches the server that sent them.
    #[default]
    AcceptOriginalServer,
    /// Accept nothing. Cookies already stored are still sent.
    AcceptNone,
}

impl CookiePolicy {
    /// Whether a cookie sent by `origin_host` may be stored. `cookie_domain` is
    /// the `Domain` attribute; without one the cookie is host-only.
    pub fn should_accept(self, cookie_domain: Option<&str>, origin_host: &str) -> bool {
        match (self, cookie_domain) {
            (CookiePolicy::AcceptNone, _) => false,
            (CookiePolicy::AcceptOriginalServer, None) => !origin_host.is_empty(),
            (CookiePolicy::AcceptOriginalServer, Some(domain)) => {
                is_valid_cookie_domain(domain, origin_host)
            }
        }
    }
}

/// Check if a domain is a public suffix (e.g., "com", "co.uk").
pub fn is_public_suffix(domain: &str) -> bool {
    let domain_lower = domain.to_lowercase();
    let domain_bytes = domain_lower.as_bytes();

    // Unlisted TLDs such as "localhost" are not public suffixes.
    match List.suffix(domain_bytes) {
        Some(suffix) => suffix.is_known() && suffix.as_bytes() == domain_bytes,
        None => false,
    }
}

/// The cookie domain must equal the origin host or be a parent of it, and
/// must not be a public suffix. A leading dot on the cookie domain is ignored.
pub fn is_valid_cookie_domain(cookie_domain: &str, origin_host: &str) -> bool {
    let cookie_domain = cookie_domain
        .strip_prefix('.')
        .unwrap_or(cookie_domain)
        .to_lowercase();
    let origin_host = origin_host.to_lowercase();

    if cookie_domain.is_empty() || is_public_suffix(&cookie_domain) {
        return false;
    }

    origin_host == cookie_domain || origin_host.ends_with(&format!(".{}", cookie_domain))
}
