//! Base types and error handling.
//!
//! Provides foundational types:
//! - [`NetError`](neterror::NetError): Network error codes matching Chromium's `net_error_list.h`
//! - [`RequestStatus`](status::RequestStatus): The classified outcome stored on every response

pub mod neterror;
pub mod status;
