//! Cookie management.
//!
//! Each [`UserAgent`](crate::urlrequest::useragent::UserAgent) owns one jar;
//! its connections share it through an `Arc` for the duration of a request.
//!
//! | Chromium (C++) | useragent (Rust) | Responsibility |
//! |----------------|------------------|----------------|
//! | `net::CookieMonster` | [`CookieMonster`](monster::CookieMonster) | Cookie jar with oldest-first eviction |
//! | `net::CanonicalCookie` | [`CanonicalCookie`](canonicalcookie::CanonicalCookie) | Single cookie representation |
//! | `net::CookieAccessDelegate` | [`CookiePolicy`](policy::CookiePolicy) | Which cookies may be stored |

pub mod canonicalcookie;
pub mod monster;
pub mod policy;
