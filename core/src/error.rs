//! Error types
//!
//! Parsing-level errors ([`ParseError`], [`CapacityExceeded`]) are handled
//! where they occur and never stop a fetch. Cycle-level errors
//! ([`CycleError`]) route the wake cycle to its `Error` state.

use core::fmt;

use embedded_hal::i2c::ErrorKind;

/// DTSTART value did not match any accepted shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Not `YYYYMMDD`, `YYYYMMDDThhmmss` or `YYYYMMDDThhmmssZ`
    Malformed,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed date-time"),
        }
    }
}

impl core::error::Error for ParseError {}

/// The event store is full; the offered event was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CapacityExceeded;

impl fmt::Display for CapacityExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event store capacity exceeded")
    }
}

impl core::error::Error for CapacityExceeded {}

/// DS3231 driver errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RtcError {
    /// I2C transfer failed (timeout, NACK, arbitration loss, ...)
    Bus(ErrorKind),
    /// Registers decoded to an impossible date or time
    InvalidData,
    /// Value cannot be represented by the chip's registers
    OutOfRange,
}

impl fmt::Display for RtcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(kind) => write!(f, "RTC bus error: {}", kind),
            Self::InvalidData => write!(f, "RTC returned invalid data"),
            Self::OutOfRange => write!(f, "value out of RTC range"),
        }
    }
}

impl core::error::Error for RtcError {}

/// Network join or calendar fetch failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// The network-join collaborator reported failure
    JoinFailed,
    /// The network did not come up in time
    JoinTimeout,
    /// The transport reported failure
    FetchFailed,
    /// The fetch did not complete in time
    FetchTimeout,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::JoinFailed => write!(f, "network join failed"),
            Self::JoinTimeout => write!(f, "network join timed out"),
            Self::FetchFailed => write!(f, "calendar fetch failed"),
            Self::FetchTimeout => write!(f, "calendar fetch timed out"),
        }
    }
}

impl core::error::Error for TransportError {}

/// Time synchronization failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SyncError {
    /// No synchronized time was published before the deadline
    Timeout,
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "time sync timed out"),
        }
    }
}

impl core::error::Error for SyncError {}

/// HTTP URL or response framing failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HttpError {
    /// URL is not `https://host[:port]/path`
    InvalidUrl,
    /// Status line or headers could not be parsed
    MalformedResponse,
    /// Server answered with a status other than `200`
    Status(u16),
    /// Transfer encoding other than `identity`
    UnsupportedEncoding,
    /// Body ended before the advertised Content-Length
    Truncated,
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl => write!(f, "invalid URL"),
            Self::MalformedResponse => write!(f, "malformed HTTP response"),
            Self::Status(code) => write!(f, "HTTP status {}", code),
            Self::UnsupportedEncoding => write!(f, "unsupported transfer encoding"),
            Self::Truncated => write!(f, "HTTP body truncated"),
        }
    }
}

impl core::error::Error for HttpError {}

/// Failure that ends the current pass through the wake cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CycleError {
    /// Network join or fetch failed
    Transport(TransportError),
    /// Time sync failed
    Sync(SyncError),
    /// RTC access failed; no alarm may be armed on this data
    Bus(RtcError),
}

impl CycleError {
    /// Number of blinks in the error pattern shown by the status indicator
    pub const fn blink_code(&self) -> u8 {
        match self {
            Self::Transport(_) => 2,
            Self::Sync(_) => 3,
            Self::Bus(_) => 4,
        }
    }

    /// Whether retrying can succeed without outside intervention
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Bus(_))
    }
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "{}", e),
            Self::Sync(e) => write!(f, "{}", e),
            Self::Bus(e) => write!(f, "{}", e),
        }
    }
}

impl core::error::Error for CycleError {}

impl From<TransportError> for CycleError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<SyncError> for CycleError {
    fn from(e: SyncError) -> Self {
        Self::Sync(e)
    }
}

impl From<RtcError> for CycleError {
    fn from(e: RtcError) -> Self {
        Self::Bus(e)
    }
}
