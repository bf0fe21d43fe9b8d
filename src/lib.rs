//! # useragent
//!
//! A configurable HTTP user agent for Rust, built on Chromium-style network
//! layering over hyper and BoringSSL.
//!
//! A [`UserAgent`] issues GET and POST requests one at a time, keeps its own
//! cookie jar, optionally goes through an HTTP proxy and follows redirects,
//! and buffers each response body (up to a size cap) into an
//! [`HttpResponse`] whose text can be decoded with charset and gzip awareness.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use useragent::{RequestStatus, UserAgent};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut agent = UserAgent::new();
//!     agent.set_auto_redirect(true);
//!
//!     let response = agent.do_post_with_params("http://example.com/login", [("user", "me")]).await;
//!     match response.status() {
//!         RequestStatus::NoError => println!("{}", response.text().unwrap_or_default()),
//!         status => eprintln!("{} ({})", status, response.code()),
//!     }
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error codes and request status classification
//! - [`cookies`] - Per-agent cookie jar and acceptance policy
//! - [`http`] - HTTP/1.1 exchange, response record and text decoding
//! - [`socket`] - Connection setup, proxy tunnels and TLS sockets
//! - [`urlrequest`] - The user agent, its configuration and transport seam

pub mod base;
pub mod cookies;
pub mod http;
pub mod socket;
pub mod urlrequest;

pub use base::neterror::NetError;
pub use base::status::RequestStatus;
pub use cookies::monster::CookieMonster;
pub use cookies::policy::CookiePolicy;
pub use http::{ContentBuffer, DecodeError, HttpResponse, RequestBody, ResponseBody};
pub use socket::proxy::{ProxyConfig, ProxySettings};
pub use urlrequest::config::{UserAgentConfig, USER_AGENT_MOZILLA_LINUX, USER_AGENT_MOZILLA_WINDOWS};
pub use urlrequest::connection::{Connection, HttpTransport, Transport};
pub use urlrequest::useragent::UserAgent;
