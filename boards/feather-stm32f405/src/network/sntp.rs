#![deny(unsafe_code)]
#![deny(warnings)]
//! SNTP time sync as a background one-shot worker
//!
//! The wake cycle owns a [`SignalTimeSync`] handle. `start` wakes
//! [`run_worker`], which queries the configured servers and publishes the
//! result once; `stop` cancels an attempt still in flight.

use defmt::{error, info, warn, Debug2Format};
use embassy_futures::select::{select, Either};
use embassy_net::dns::DnsQueryType;
use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::{IpEndpoint, Stack};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Timer};
use hal_abstractions::{TimeSync, UtcInstant};

use crate::time::Timestamp;

use super::config::SntpConfig;
use super::error::NetworkError;

const SNTP_PORT: u16 = 123;

static START: Signal<CriticalSectionRawMutex, ()> = Signal::new();
static STOP: Signal<CriticalSectionRawMutex, ()> = Signal::new();
static SYNCED: Signal<CriticalSectionRawMutex, UtcInstant> = Signal::new();

/// SNTP client for time synchronization
pub struct SntpClient {
    config: SntpConfig,
}

impl SntpClient {
    pub fn new(config: SntpConfig) -> Self {
        Self { config }
    }

    /// Try every server `retry_count` times until one answers
    pub async fn sync(&self, stack: Stack<'static>) -> Result<Timestamp, NetworkError> {
        info!("Starting SNTP synchronization");
        for server in self.config.servers {
            for attempt in 0..self.config.retry_count {
                info!(
                    "Attempting SNTP sync with {} (attempt {})",
                    server,
                    attempt + 1
                );
                match self.sntp_request(stack, server).await {
                    Ok(timestamp) => {
                        info!(
                            "SNTP sync successful: {}.{:06} UTC",
                            timestamp.unix_secs, timestamp.micros
                        );
                        return Ok(timestamp);
                    }
                    Err(e) => {
                        warn!("SNTP sync failed: {:?}, retrying...", e);
                        Timer::after_millis(self.config.retry_backoff_ms).await;
                    }
                }
            }
        }
        error!("All SNTP sync attempts failed");
        Err(NetworkError::AllServersFailed)
    }

    async fn sntp_request(
        &self,
        stack: Stack<'static>,
        server: &str,
    ) -> Result<Timestamp, NetworkError> {
        let server_ip = stack
            .dns_query(server, DnsQueryType::A)
            .await
            .map_err(|_| NetworkError::DnsError)?
            .first()
            .copied()
            .ok_or(NetworkError::DnsError)?;

        let server_endpoint = IpEndpoint::new(server_ip, SNTP_PORT);
        info!("Resolved {} to {}", server, Debug2Format(&server_endpoint));

        let mut rx_meta = [PacketMetadata::EMPTY; 2];
        let mut rx_buffer = [0u8; 64];
        let mut tx_meta = [PacketMetadata::EMPTY; 2];
        let mut tx_buffer = [0u8; 64];
        let mut socket = UdpSocket::new(
            stack,
            &mut rx_meta,
            &mut rx_buffer,
            &mut tx_meta,
            &mut tx_buffer,
        );
        socket.bind(0).map_err(|_| NetworkError::SocketError)?;

        // LI=0, VN=3, Mode=3 (client)
        let mut request = [0u8; 48];
        request[0] = 0x1B;
        let transmit_time = Instant::now();
        socket
            .send_to(&request, server_endpoint)
            .await
            .map_err(|_| NetworkError::SocketError)?;

        let mut response = [0u8; 48];
        let timeout = Timer::after(Duration::from_millis(self.config.timeout_ms));
        let (recv_len, from) = match select(timeout, socket.recv_from(&mut response)).await {
            Either::First(()) => return Err(NetworkError::Timeout),
            Either::Second(result) => result.map_err(|_| NetworkError::SocketError)?,
        };
        let rtt = Instant::now().duration_since(transmit_time);

        if recv_len < 48 || from.endpoint.addr != server_ip {
            return Err(NetworkError::InvalidResponse);
        }

        let stratum = response[1];
        if stratum == 0 || stratum > self.config.max_stratum {
            warn!(
                "Invalid stratum {} (max {})",
                stratum, self.config.max_stratum
            );
            return Err(NetworkError::ServerError);
        }

        let tx_secs =
            u32::from_be_bytes([response[40], response[41], response[42], response[43]]) as u64;
        let tx_frac = u32::from_be_bytes([response[44], response[45], response[46], response[47]]);

        let correction = rtt.as_micros() / 2;
        let timestamp = Timestamp::from_ntp(tx_secs, tx_frac).add_micros(correction);
        info!(
            "NTP timestamp: {}.{:06} UTC (stratum {}, RTT correction: {} µs)",
            timestamp.unix_secs, timestamp.micros, stratum, correction
        );
        Ok(timestamp)
    }
}

/// [`TimeSync`] handle driving [`run_worker`] through static signals
pub struct SignalTimeSync {
    _private: (),
}

impl SignalTimeSync {
    pub const fn new() -> Self {
        Self { _private: () }
    }
}

impl TimeSync for SignalTimeSync {
    fn start(&mut self) {
        SYNCED.reset();
        STOP.reset();
        START.signal(());
    }

    fn poll_synced(&mut self) -> Option<UtcInstant> {
        SYNCED.try_take()
    }

    fn stop(&mut self) {
        START.reset();
        STOP.signal(());
        SYNCED.reset();
    }
}

/// Background SNTP worker; one sync per `start`
pub async fn run_worker(stack: Stack<'static>, client: SntpClient) -> ! {
    loop {
        START.wait().await;
        match select(client.sync(stack), STOP.wait()).await {
            Either::First(Ok(timestamp)) => SYNCED.signal(timestamp.to_instant()),
            Either::First(Err(e)) => warn!("SNTP worker gave up: {:?}", e),
            Either::Second(()) => info!("SNTP attempt cancelled"),
        }
    }
}
