#![deny(unsafe_code)]
#![deny(warnings)]
//! Network error types

use calendar_core::HttpError;
use defmt::Format;

/// Network operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum NetworkError {
    /// DNS resolution failed
    DnsError,
    /// Socket bind/connect/read/write error
    SocketError,
    /// Request timeout
    Timeout,
    /// Invalid response from server
    InvalidResponse,
    /// Server error (e.g., invalid stratum for NTP, non-200 HTTP status)
    ServerError,
    /// All configured servers failed
    AllServersFailed,
    /// URL is not `https://host[:port]/path`
    InvalidUrl,
    /// Body ended before the advertised length
    Truncated,
    /// TLS handshake failed
    TlsHandshakeFailed,
    /// TLS connection closed unexpectedly
    TlsConnectionClosed,
    /// Ethernet hardware or TLS buffers could not be set up at boot
    Unavailable,
}

impl core::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::DnsError => write!(f, "DNS resolution failed"),
            Self::SocketError => write!(f, "Socket error"),
            Self::Timeout => write!(f, "Request timeout"),
            Self::InvalidResponse => write!(f, "Invalid response"),
            Self::ServerError => write!(f, "Server error"),
            Self::AllServersFailed => write!(f, "All servers failed"),
            Self::InvalidUrl => write!(f, "Invalid URL"),
            Self::Truncated => write!(f, "Response truncated"),
            Self::TlsHandshakeFailed => write!(f, "TLS handshake failed"),
            Self::TlsConnectionClosed => write!(f, "TLS connection closed"),
            Self::Unavailable => write!(f, "Network unavailable"),
        }
    }
}

impl From<HttpError> for NetworkError {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::InvalidUrl => Self::InvalidUrl,
            HttpError::Status(_) => Self::ServerError,
            HttpError::Truncated => Self::Truncated,
            HttpError::MalformedResponse | HttpError::UnsupportedEncoding => {
                Self::InvalidResponse
            }
        }
    }
}

// Implement core::error::Error for no_std compatibility
impl core::error::Error for NetworkError {}

impl embedded_io_async::Error for NetworkError {
    fn kind(&self) -> embedded_io_async::ErrorKind {
        match self {
            Self::SocketError | Self::TlsConnectionClosed => {
                embedded_io_async::ErrorKind::BrokenPipe
            }
            Self::Timeout => embedded_io_async::ErrorKind::TimedOut,
            Self::InvalidResponse | Self::Truncated => embedded_io_async::ErrorKind::InvalidData,
            _ => embedded_io_async::ErrorKind::Other,
        }
    }
}
