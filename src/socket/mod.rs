//! Socket and connection management.
//!
//! Opens the connections behind each request, mirroring Chromium's `net/socket/`:
//! - [`connectjob`]: DNS → TCP → (proxy tunnel) → TLS connection flow
//! - [`client`]: The connected socket type
//! - [`proxy`]: HTTP proxy descriptors with per-connection credentials

pub mod client;
pub mod connectjob;
pub mod proxy;
