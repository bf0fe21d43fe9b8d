//! HTTP exchange and response handling.
//!
//! - [`stream`] / [`transaction`]: one HTTP/1.1 request/response over a fresh socket
//! - [`response`]: the [`HttpResponse`] record handed back to callers
//! - [`content`] / [`decode`]: the response byte buffer and its text decoding

pub mod content;
pub mod decode;
pub mod orderedheaders;
pub mod requestbody;
pub mod response;
pub mod responsebody;
pub mod stream;
pub mod transaction;

pub use content::ContentBuffer;
pub use decode::DecodeError;
pub use requestbody::RequestBody;
pub use response::HttpResponse;
pub use responsebody::ResponseBody;
