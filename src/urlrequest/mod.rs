//! High-level request API.
//!
//! - [`useragent`]: the [`UserAgent`](useragent::UserAgent) request executor
//! - [`config`]: per-agent settings and the stock User-Agent strings
//! - [`connection`]: the `Transport` / `Connection` seam and the default transport
//! - [`job`]: redirect-following HTTP job, the default connection
//! - [`params`]: form encoding for queries and POST bodies

pub mod config;
pub mod connection;
pub mod job;
pub mod params;
pub mod useragent;
