//! Classified request outcome.

use crate::base::neterror::NetError;
use std::fmt;

/// Coarse outcome of a request, derived from the transport result and the
/// HTTP status code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestStatus {
    /// 2xx or 3xx.
    NoError,
    /// 4xx.
    Error4xx,
    /// 5xx.
    Error5xx,
    /// The URL parsed but cannot be used (scheme, host, illegal argument).
    ErrorBadUrl,
    /// Any other transport failure.
    ErrorIo,
    /// Connect or read exceeded the configured timeout.
    ErrorTimeout,
    /// The URL failed structural parsing.
    ErrorMalformedUrl,
}

impl RequestStatus {
    /// Classify a numeric HTTP status code.
    ///
    /// Codes outside 200..=599 are not a usable final response and count as
    /// a transport failure.
    pub fn from_code(code: u16) -> Self {
        match code / 100 {
            2 | 3 => RequestStatus::NoError,
            4 => RequestStatus::Error4xx,
            5 => RequestStatus::Error5xx,
            _ => RequestStatus::ErrorIo,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RequestStatus::NoError)
    }
}

impl From<&NetError> for RequestStatus {
    fn from(err: &NetError) -> Self {
        match err {
            NetError::TimedOut | NetError::ConnectionTimedOut => RequestStatus::ErrorTimeout,
            NetError::InvalidUrl => RequestStatus::ErrorMalformedUrl,
            NetError::UnknownUrlScheme
            | NetError::DisallowedUrlScheme
            | NetError::AddressInvalid
            | NetError::InvalidArgument
            | NetError::InvalidHeader => RequestStatus::ErrorBadUrl,
            _ => RequestStatus::ErrorIo,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestStatus::NoError => "NO_ERROR",
            RequestStatus::Error4xx => "ERROR_4xx",
            RequestStatus::Error5xx => "ERROR_5xx",
            RequestStatus::ErrorBadUrl => "ERROR_BAD_URL",
            RequestStatus::ErrorIo => "ERROR_IO",
            RequestStatus::ErrorTimeout => "ERROR_TIMEOUT",
            RequestStatus::ErrorMalformedUrl => "ERROR_MALFORMED_URL",
        };
        write!(f, "{name}")
    }
}
