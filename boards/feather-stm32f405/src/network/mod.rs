#![deny(warnings)]
//! Network collaborators for the wake cycle
//!
//! - **`link`**: DHCP link bring-up (`NetworkJoin`)
//! - **`sntp`**: SNTP client and its background worker (`TimeSync`)
//! - **`https`**: calendar download over TLS 1.3 (`CalendarTransport`)
//! - **`socket`**: embedded-io-async TCP socket for embedded-tls
//! - **`config`** / **`error`**: settings and the shared error enum
//!
//! The W5500 and embassy-net runners are polled by the network task; the
//! types here only borrow the `Stack` handle.

pub mod config;
pub mod error;
pub mod https;
pub mod link;
pub mod sntp;
pub mod socket;

pub use config::{HttpsConfig, NetworkConfig, SntpConfig};
pub use error::NetworkError;
pub use https::HttpsTransport;
pub use link::EthernetLink;
pub use sntp::{SignalTimeSync, SntpClient};
