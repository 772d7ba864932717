#![deny(unsafe_code)]
#![deny(warnings)]
//! TLS record buffers in main SRAM
//!
//! **Read buffer (18 KB)**: maximum TLS 1.3 plaintext (16384 bytes) plus
//! the 5-byte record header, the 16-byte AES-128-GCM tag and padding.
//!
//! **Write buffer (4 KB)**: we only ever send one short GET request, so the
//! write side does not need a full record.
//!
//! The buffers are handed out exactly once, to the HTTPS transport, which
//! reuses them for every fetch.

use static_cell::ConstStaticCell;

const TLS_READ_BUF_SIZE: usize = 18 * 1024;
const TLS_WRITE_BUF_SIZE: usize = 4 * 1024;

/// Record buffers for one TLS connection at a time
pub struct TlsBuffers {
    pub read: [u8; TLS_READ_BUF_SIZE],
    pub write: [u8; TLS_WRITE_BUF_SIZE],
}

static TLS_BUFFERS: ConstStaticCell<TlsBuffers> = ConstStaticCell::new(TlsBuffers {
    read: [0; TLS_READ_BUF_SIZE],
    write: [0; TLS_WRITE_BUF_SIZE],
});

/// Take the buffers; `None` once they have been handed out
pub fn take() -> Option<&'static mut TlsBuffers> {
    TLS_BUFFERS.try_take()
}
