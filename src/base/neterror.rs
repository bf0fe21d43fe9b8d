use thiserror::Error;

/// Transport-level failure, numbered after Chromium's `net_error_list.h`.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum NetError {
    // Generic Errors
    #[error("Generic failure")]
    Failed,
    #[error("Invalid argument")]
    InvalidArgument,
    #[error("Operation timed out")]
    TimedOut,

    // Connection Errors
    #[error("Connection closed (TCP FIN)")]
    ConnectionClosed,
    #[error("Connection reset (TCP RST)")]
    ConnectionReset,
    #[error("Connection refused")]
    ConnectionRefused,
    #[error("Connection aborted")]
    ConnectionAborted,
    #[error("Connection failed")]
    ConnectionFailed,
    #[error("Name not resolved")]
    NameNotResolved,
    #[error("SSL protocol error")]
    SslProtocolError,
    #[error("Address invalid")]
    AddressInvalid,
    #[error("Address unreachable")]
    AddressUnreachable,
    #[error("Tunnel connection failed")]
    TunnelConnectionFailed,
    #[error("Connection timed out")]
    ConnectionTimedOut,
    #[error("Proxy auth requested")]
    ProxyAuthRequested,
    #[error("Proxy connection failed")]
    ProxyConnectionFailed,

    // HTTP Errors
    #[error("Invalid URL")]
    InvalidUrl,
    #[error("Disallowed URL scheme")]
    DisallowedUrlScheme,
    #[error("Unknown URL scheme")]
    UnknownUrlScheme,
    #[error("Invalid redirect")]
    InvalidRedirect,
    #[error("Too many redirects")]
    TooManyRedirects,
    #[error("Invalid response")]
    InvalidResponse,
    #[error("Empty response")]
    EmptyResponse,
    #[error("Content decoding failed")]
    ContentDecodingFailed,
    #[error("Invalid HTTP response")]
    InvalidHttpResponse,
    #[error("Server returned an error status code")]
    HttpResponseCodeFailure,

    // Crate-specific (custom codes starting at -900)
    #[error("Invalid header name or value")]
    InvalidHeader,
    #[error("Response body read failed")]
    HttpBodyError,
    #[error("Connection already started")]
    AlreadyConnected,

    #[error("Unknown error: {0}")]
    Unknown(i32),
}

impl NetError {
    pub fn as_i32(&self) -> i32 {
        match self {
            NetError::Failed => -2,
            NetError::InvalidArgument => -4,
            NetError::TimedOut => -7,

            NetError::ConnectionClosed => -100,
            NetError::ConnectionReset => -101,
            NetError::ConnectionRefused => -102,
            NetError::ConnectionAborted => -103,
            NetError::ConnectionFailed => -104,
            NetError::NameNotResolved => -105,
            NetError::SslProtocolError => -107,
            NetError::AddressInvalid => -108,
            NetError::AddressUnreachable => -109,
            NetError::TunnelConnectionFailed => -111,
            NetError::ConnectionTimedOut => -118,
            NetError::ProxyAuthRequested => -127,
            NetError::ProxyConnectionFailed => -130,

            NetError::InvalidUrl => -300,
            NetError::DisallowedUrlScheme => -301,
            NetError::UnknownUrlScheme => -302,
            NetError::InvalidRedirect => -303,
            NetError::TooManyRedirects => -310,
            NetError::InvalidResponse => -320,
            NetError::EmptyResponse => -324,
            NetError::ContentDecodingFailed => -330,
            NetError::InvalidHttpResponse => -370,
            NetError::HttpResponseCodeFailure => -379,

            NetError::InvalidHeader => -900,
            NetError::HttpBodyError => -901,
            NetError::AlreadyConnected => -902,
            NetError::Unknown(code) => *code,
        }
    }

    /// True for failures caused by an exhausted connect or read timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, NetError::TimedOut | NetError::ConnectionTimedOut)
    }

    /// Map a socket-level I/O error onto the closest network error.
    pub fn from_io(err: &std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::TimedOut => NetError::ConnectionTimedOut,
            ErrorKind::ConnectionRefused => NetError::ConnectionRefused,
            ErrorKind::ConnectionReset => NetError::ConnectionReset,
            ErrorKind::ConnectionAborted => NetError::ConnectionAborted,
            ErrorKind::NotConnected | ErrorKind::BrokenPipe => NetError::ConnectionClosed,
            ErrorKind::AddrNotAvailable => NetError::AddressUnreachable,
            ErrorKind::InvalidInput => NetError::AddressInvalid,
            ErrorKind::UnexpectedEof => NetError::EmptyResponse,
            _ => NetError::ConnectionFailed,
        }
    }
}

impl From<i32> for NetError {
    fn from(code: i32) -> Self {
        match code {
            -2 => NetError::Failed,
            -4 => NetError::InvalidArgument,
            -7 => NetError::TimedOut,

            -100 => NetError::ConnectionClosed,
            -101 => NetError::ConnectionReset,
            -102 => NetError::ConnectionRefused,
            -103 => NetError::ConnectionAborted,
            -104 => NetError::ConnectionFailed,
            -105 => NetError::NameNotResolved,
            -107 => NetError::SslProtocolError,
            -108 => NetError::AddressInvalid,
            -109 => NetError::AddressUnreachable,
            -111 => NetError::TunnelConnectionFailed,
            -118 => NetError::ConnectionTimedOut,
            -127 => NetError::ProxyAuthRequested,
            -130 => NetError::ProxyConnectionFailed,

            -300 => NetError::InvalidUrl,
            -301 => NetError::DisallowedUrlScheme,
            -302 => NetError::UnknownUrlScheme,
            -303 => NetError::InvalidRedirect,
            -310 => NetError::TooManyRedirects,
            -320 => NetError::InvalidResponse,
            -324 => NetError::EmptyResponse,
            -330 => NetError::ContentDecodingFailed,
            -370 => NetError::InvalidHttpResponse,
            -379 => NetError::HttpResponseCodeFailure,

            -900 => NetError::InvalidHeader,
            -901 => NetError::HttpBodyError,
            -902 => NetError::AlreadyConnected,
            _ => NetError::Unknown(code),
        }
    }
}
