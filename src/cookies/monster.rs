use crate::cookies::canonicalcookie::{CanonicalCookie, CookiePriority, SameSite};
use crate::cookies::policy::CookiePolicy;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use time::{OffsetDateTime, PrimitiveDateTime};
use url::Url;

/// Maximum cookies per domain (Chromium default).
const MAX_COOKIES_PER_DOMAIN: usize = 50;

/// Maximum total cookies.
/// Chromium uses 3300, but we use a slightly lower limit to keep memory usage predictable.
const MAX_COOKIES_TOTAL: usize = 3000;

/// In-memory cookie jar owned by one user agent.
/// Modeled after Chromium's `net::CookieMonster`.
pub struct CookieMonster {
    // Map<Domain, List<Cookie>>
    store: DashMap<String, Vec<CanonicalCookie>>,
    accept_none: AtomicBool,
}

impl Default for CookieMonster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CookieMonster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieMonster")
            .field("cookies", &self.total_cookie_count())
            .field("policy", &self.policy())
            .finish()
    }
}

impl CookieMonster {
    pub fn new() -> Self {
        Self::with_policy(CookiePolicy::default())
    }

    pub fn with_policy(policy: CookiePolicy) -> Self {
        Self {
            store: DashMap::new(),
            accept_none: AtomicBool::new(policy == CookiePolicy::AcceptNone),
        }
    }

    pub fn policy(&self) -> CookiePolicy {
        if self.accept_none.load(Ordering::Acquire) {
            CookiePolicy::AcceptNone
        } else {
            CookiePolicy::AcceptOriginalServer
        }
    }

    /// Changing the policy never touches cookies already stored.
    pub fn set_policy(&self, policy: CookiePolicy) {
        self.accept_none
            .store(policy == CookiePolicy::AcceptNone, Ordering::Release);
    }

    /// Store a cookie directly, bypassing the policy.
    pub fn set_canonical_cookie(&self, cookie: CanonicalCookie) {
        let mut entry = self.store.entry(cookie.domain.clone()).or_default();

        // Same name and path replaces the existing cookie
        entry.retain(|c| c.name != cookie.name || c.path != cookie.path);

        while entry.len() >= MAX_COOKIES_PER_DOMAIN {
            let oldest_idx = entry
                .iter()
                .enumerate()
                .min_by_key(|(_, c)| c.creation_time)
                .map(|(i, _)| i);
            match oldest_idx {
                Some(idx) => {
                    entry.remove(idx);
                }
                None => break,
            }
        }

        entry.push(cookie);
        drop(entry); // Release the shard lock before scanning all domains

        self.enforce_global_limit();
    }

    /// Evict oldest cookies until the global limit holds.
    fn enforce_global_limit(&self) {
        while self.total_cookie_count() > MAX_COOKIES_TOTAL {
            let mut oldest: Option<(String, usize, OffsetDateTime)> = None;

            for entry in self.store.iter() {
                for (idx, cookie) in entry.value().iter().enumerate() {
                    let older = oldest
                        .as_ref()
                        .map_or(true, |(_, _, t)| cookie.creation_time < *t);
                    if older {
                        oldest = Some((entry.key().clone(), idx, cookie.creation_time));
                    }
                }
            }

            let Some((domain, idx, _)) = oldest else {
                break;
            };
            if let Some(mut entry) = self.store.get_mut(&domain) {
                if idx < entry.len() {
                    entry.remove(idx);
                }
            }
        }
    }

    /// Cookies to send to `url`, longest path first then oldest first.
    pub fn get_cookies_for_url(&self, url: &Url) -> Vec<CanonicalCookie> {
        let mut result = Vec::new();
        let host = url.host_str().unwrap_or("").to_lowercase();
        let now = OffsetDateTime::now_utc();

        for domain in Self::get_matching_domains(&host) {
            if let Some(entry) = self.store.get(&domain) {
                for cookie in entry.iter() {
                    if !Self::domain_matches(&cookie.domain, &host, cookie.host_only) {
                        continue;
                    }
                    if !Self::path_matches(&cookie.path, url.path()) {
                        continue;
                    }
                    if cookie.secure && url.scheme() != "https" {
                        continue;
                    }
                    if cookie.is_expired(now) {
                        continue;
                    }
                    result.push(cookie.clone());
                }
            }
        }

        result.sort_by(|a, b| {
            b.path
                .len()
                .cmp(&a.path.len())
                .then_with(|| a.creation_time.cmp(&b.creation_time))
        });

        result
    }

    /// The `Cookie` request header value for `url`, if any cookie applies.
    pub fn cookie_header_for_url(&self, url: &Url) -> Option<String> {
        let cookies = self.get_cookies_for_url(url);
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// RFC 6265 domain matching.
    fn domain_matches(cookie_domain: &str, request_host: &str, host_only: bool) -> bool {
        if host_only {
            return cookie_domain.eq_ignore_ascii_case(request_host);
        }

        let cookie_domain = cookie_domain.trim_start_matches('.');
        if request_host.eq_ignore_ascii_case(cookie_domain) {
            return true;
        }

        request_host.len() > cookie_domain.len()
            && request_host.is_char_boundary(request_host.len() - cookie_domain.len())
            && request_host[request_host.len() - cookie_domain.len()..]
                .eq_ignore_ascii_case(cookie_domain)
            && request_host.as_bytes()[request_host.len() - cookie_domain.len() - 1] == b'.'
    }

    /// RFC 6265 path matching.
    fn path_matches(cookie_path: &str, request_path: &str) -> bool {
        if request_path == cookie_path {
            return true;
        }

        if let Some(rest) = request_path.strip_prefix(cookie_path) {
            return cookie_path.ends_with('/') || rest.starts_with('/');
        }

        false
    }

    /// The host itself and all parent domains.
    fn get_matching_domains(host: &str) -> Vec<String> {
        let mut domains = vec![host.to_string()];

        let parts: Vec<&str> = host.split('.').collect();
        for i in 1..parts.len().saturating_sub(1) {
            domains.push(parts[i..].join("."));
        }

        domains
    }

    /// Parse one `Set-Cookie` header received from `url` and store it if the
    /// policy allows. Returns whether the cookie was stored.
    pub fn parse_and_save_cookie(&self, url: &Url, cookie_line: &str) -> bool {
        let parsed = match cookie::Cookie::parse(cookie_line) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "ignoring unparseable Set-Cookie");
                return false;
            }
        };

        let origin_host = url.host_str().unwrap_or("").to_lowercase();
        let domain_attr = parsed.domain().map(|d| d.trim_start_matches('.').to_lowercase());

        if !self.policy().should_accept(domain_attr.as_deref(), &origin_host) {
            tracing::debug!(url = %url, name = parsed.name(), "cookie rejected by policy");
            return false;
        }

        let (domain, host_only) = match domain_attr {
            Some(d) => (d, false),
            None => (origin_host, true),
        };

        let path = match parsed.path() {
            Some(p) if p.starts_with('/') => p.to_string(),
            _ => default_path(url),
        };

        let now = OffsetDateTime::now_utc();

        // Max-Age takes precedence over Expires; huge values clamp to the far future
        let expiration_time = match parsed.max_age() {
            Some(age) => Some(now.checked_add(age).unwrap_or_else(|| {
                if age.is_negative() {
                    now
                } else {
                    PrimitiveDateTime::MAX.assume_utc()
                }
            })),
            None => parsed.expires().and_then(|e| e.datetime()),
        };

        let same_site = match parsed.same_site() {
            Some(cookie::SameSite::Lax) => SameSite::Lax,
            Some(cookie::SameSite::Strict) => SameSite::Strict,
            Some(cookie::SameSite::None) => SameSite::NoRestriction,
            None => SameSite::Unspecified,
        };

        let c = CanonicalCookie {
            name: parsed.name().to_string(),
            value: parsed.value().to_string(),
            domain,
            path,
            creation_time: now,
            expiration_time,
            last_access_time: now,
            secure: parsed.secure().unwrap_or(false),
            http_only: parsed.http_only().unwrap_or(false),
            host_only,
            same_site,
            priority: CookiePriority::Medium,
        };

        self.set_canonical_cookie(c);
        true
    }

    /// Snapshot of every stored cookie that has not expired.
    pub fn cookies(&self) -> Vec<CanonicalCookie> {
        let now = OffsetDateTime::now_utc();
        self.store
            .iter()
            .flat_map(|entry| entry.value().clone())
            .filter(|c| !c.is_expired(now))
            .collect()
    }

    pub fn total_cookie_count(&self) -> usize {
        self.store.iter().map(|e| e.value().len()).sum()
    }

    pub fn clear(&self) {
        self.store.clear();
    }
}

/// RFC 6265 default-path: the request path up to its last '/'.
fn default_path(url: &Url) -> String {
    let path = url.path();
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn make_test_cookie(name: &str, domain: &str) -> CanonicalCookie {
        let mut c = CanonicalCookie::new(
            name,
            "test_value",
            domain,
            "/",
            OffsetDateTime::now_utc(),
            Some(OffsetDateTime::now_utc() + time::Duration::days(30)),
        );
        c.host_only = false;
        c
    }

    #[test]
    fn test_save_and_send_host_cookie() {
        let jar = CookieMonster::new();
        assert!(jar.parse_and_save_cookie(&url("http://localhost:8080/login"), "sid=abc; Path=/"));

        let header = jar.cookie_header_for_url(&url("http://localhost:8080/home"));
        assert_eq!(header.as_deref(), Some("sid=abc"));
        assert!(jar
            .cookie_header_for_url(&url("http://otherhost/home"))
            .is_none());
    }

    #[test]
    fn test_domain_cookie_sent_to_subdomain() {
        let jar = CookieMonster::new();
        jar.parse_and_save_cookie(&url("http://www.example.com/"), "a=1; Domain=.example.com");

        let cookies = jar.get_cookies_for_url(&url("http://api.example.com/x"));
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].domain, "example.com");
        assert!(!cookies[0].host_only);
    }

    #[test]
    fn test_public_suffix_domain_rejected() {
        let jar = CookieMonster::new();
        assert!(!jar.parse_and_save_cookie(&url("http://www.example.com/"), "a=1; Domain=com"));
        assert!(!jar.parse_and_save_cookie(&url("http://www.example.com/"), "a=1; Domain=other.org"));
        assert_eq!(jar.total_cookie_count(), 0);
    }

    #[test]
    fn test_accept_none_still_sends_stored_cookies() {
        let jar = CookieMonster::new();
        let u = url("http://example.com/");
        jar.parse_and_save_cookie(&u, "kept=1");

        jar.set_policy(CookiePolicy::AcceptNone);
        assert!(!jar.parse_and_save_cookie(&u, "dropped=1"));
        assert_eq!(jar.cookie_header_for_url(&u).as_deref(), Some("kept=1"));
        assert_eq!(jar.policy(), CookiePolicy::AcceptNone);
    }

    #[test]
    fn test_secure_cookie_not_sent_over_http() {
        let jar = CookieMonster::new();
        jar.parse_and_save_cookie(&url("https://example.com/"), "s=1; Secure");
        assert!(jar.get_cookies_for_url(&url("http://example.com/")).is_empty());
        assert_eq!(jar.get_cookies_for_url(&url("https://example.com/")).len(), 1);
    }

    #[test]
    fn test_path_matching_and_order() {
        let jar = CookieMonster::new();
        let u = url("http://example.com/docs/page");
        jar.parse_and_save_cookie(&u, "root=1; Path=/");
        jar.parse_and_save_cookie(&u, "docs=1; Path=/docs");

        let names: Vec<_> = jar
            .get_cookies_for_url(&url("http://example.com/docs/a"))
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["docs", "root"]);

        assert_eq!(jar.get_cookies_for_url(&url("http://example.com/docsx")).len(), 1);
    }

    #[test]
    fn test_default_path_from_request() {
        let jar = CookieMonster::new();
        jar.parse_and_save_cookie(&url("http://example.com/app/login"), "a=1");
        assert_eq!(jar.cookies()[0].path, "/app");
    }

    #[test]
    fn test_max_age_zero_expires_cookie() {
        let jar = CookieMonster::new();
        let u = url("http://example.com/");
        jar.parse_and_save_cookie(&u, "a=1");
        jar.parse_and_save_cookie(&u, "a=gone; Max-Age=0");
        assert!(jar.get_cookies_for_url(&u).is_empty());
        assert!(jar.cookies().is_empty());
    }

    #[test]
    fn test_huge_max_age_clamps_to_far_future() {
        let jar = CookieMonster::new();
        let u = url("http://example.com/");
        assert!(jar.parse_and_save_cookie(&u, "a=1; Max-Age=999999999999"));
        assert!(jar.parse_and_save_cookie(&u, "b=2; Max-Age=99999999999999999999"));

        let now = OffsetDateTime::now_utc();
        let cookies = jar.get_cookies_for_url(&u);
        assert_eq!(cookies.len(), 2);
        for c in cookies {
            assert!(!c.is_discard());
            assert!(c.max_age(now) > 0);
        }
    }

    #[test]
    fn test_replace_same_name_and_path() {
        let jar = CookieMonster::new();
        let u = url("http://example.com/");
        jar.parse_and_save_cookie(&u, "a=1");
        jar.parse_and_save_cookie(&u, "a=2");
        assert_eq!(jar.total_cookie_count(), 1);
        assert_eq!(jar.cookies()[0].value, "2");
    }

    #[test]
    fn test_unparseable_cookie_ignored() {
        let jar = CookieMonster::new();
        assert!(!jar.parse_and_save_cookie(&url("http://example.com/"), "=novalue"));
        assert_eq!(jar.total_cookie_count(), 0);
    }

    #[test]
    fn test_per_domain_limit() {
        let jar = CookieMonster::new();
        for i in 0..(MAX_COOKIES_PER_DOMAIN + 5) {
            jar.set_canonical_cookie(make_test_cookie(&format!("c{i}"), "example.com"));
        }
        assert_eq!(jar.total_cookie_count(), MAX_COOKIES_PER_DOMAIN);
    }

    #[test]
    fn test_clear() {
        let jar = CookieMonster::new();
        jar.set_canonical_cookie(make_test_cookie("a", "example.com"));
        jar.set_canonical_cookie(make_test_cookie("b", "test.org"));
        assert_eq!(jar.total_cookie_count(), 2);
        jar.clear();
        assert_eq!(jar.total_cookie_count(), 0);
    }
}
