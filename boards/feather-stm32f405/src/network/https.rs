#![deny(unsafe_code)]
#![deny(warnings)]
//! Calendar transport: HTTPS `GET` over TLS 1.3 (embedded-tls)
//!
//! Certificate verification is not implemented; the server name is still
//! sent for SNI. One connection per fetch, `Connection: close`.

use core::fmt::Write as _;

use calendar_core::http::{ResponseReader, Url};
use defmt::{debug, error, info, warn, Debug2Format};
use embassy_net::dns::DnsQueryType;
use embassy_net::{IpEndpoint, Stack};
use embassy_time::Duration;
use embedded_io_async::Write;
use embedded_tls::{
    Aes128GcmSha256, CryptoProvider, NoVerify, TlsConfig, TlsConnection, TlsContext, TlsVerifier,
};
use hal_abstractions::{CalendarTransport, ChunkSink};
use heapless::String;

use crate::tls_buffers::TlsBuffers;

use super::config::HttpsConfig;
use super::error::NetworkError;
use super::socket::AsyncTcpSocket;

const TCP_BUF_SIZE: usize = 4096;
const READ_CHUNK_SIZE: usize = 1024;

/// Crypto provider wrapping the hardware RNG
struct SimpleCryptoProvider<RNG> {
    rng: RNG,
    verifier: NoVerify,
}

impl<RNG> SimpleCryptoProvider<RNG> {
    fn new(rng: RNG) -> Self {
        Self {
            rng,
            verifier: NoVerify,
        }
    }
}

impl<RNG> CryptoProvider for SimpleCryptoProvider<RNG>
where
    RNG: rand_core::CryptoRngCore,
{
    type CipherSuite = Aes128GcmSha256;
    type Signature = &'static [u8];

    fn rng(&mut self) -> impl rand_core::CryptoRngCore {
        &mut self.rng
    }

    fn verifier(
        &mut self,
    ) -> Result<&mut impl TlsVerifier<Self::CipherSuite>, embedded_tls::TlsError> {
        Ok(&mut self.verifier)
    }
}

/// HTTPS calendar transport
///
/// Either half may be missing when boot could not provide it; fetches then
/// fail with [`NetworkError::Unavailable`].
pub struct HttpsTransport<RNG> {
    stack: Option<Stack<'static>>,
    rng: RNG,
    buffers: Option<&'static mut TlsBuffers>,
    config: HttpsConfig,
}

impl<RNG> HttpsTransport<RNG>
where
    RNG: rand_core::RngCore + rand_core::CryptoRng,
{
    pub fn new(
        stack: Option<Stack<'static>>,
        rng: RNG,
        buffers: Option<&'static mut TlsBuffers>,
        config: HttpsConfig,
    ) -> Self {
        Self {
            stack,
            rng,
            buffers,
            config,
        }
    }

    async fn get<S: ChunkSink>(&mut self, url: Url<'_>, sink: &mut S) -> Result<(), NetworkError> {
        let (Some(stack), Some(buffers)) = (self.stack, self.buffers.as_deref_mut()) else {
            warn!("HTTPS transport has no stack or TLS buffers");
            return Err(NetworkError::Unavailable);
        };

        let endpoint = resolve(stack, url.host, url.port).await?;
        info!("Resolved {} to {}", url.host, Debug2Format(&endpoint));

        let mut rx_buffer = [0u8; TCP_BUF_SIZE];
        let mut tx_buffer = [0u8; TCP_BUF_SIZE];
        let mut socket = AsyncTcpSocket::new(stack, &mut rx_buffer, &mut tx_buffer);
        socket.set_timeout(Duration::from_millis(self.config.read_timeout_ms));
        socket.connect(endpoint).await?;
        debug!("TCP connected to {}", Debug2Format(&endpoint));

        let TlsBuffers { read, write } = buffers;
        let mut tls = TlsConnection::<AsyncTcpSocket, Aes128GcmSha256>::new(
            socket,
            read.as_mut_slice(),
            write.as_mut_slice(),
        );
        let tls_config = TlsConfig::new().with_server_name(url.host);
        tls.open(TlsContext::new(
            &tls_config,
            SimpleCryptoProvider::new(&mut self.rng),
        ))
        .await
        .map_err(|e| {
            error!("TLS handshake failed: {:?}", Debug2Format(&e));
            NetworkError::TlsHandshakeFailed
        })?;
        debug!("TLS 1.3 session established");

        let mut request: String<512> = String::new();
        write!(
            request,
            "GET {} HTTP/1.0\r\nHost: {}\r\nUser-Agent: {}\r\nAccept: text/calendar\r\nConnection: close\r\n\r\n",
            url.path, url.host, self.config.user_agent
        )
        .map_err(|_| NetworkError::InvalidUrl)?;
        tls.write_all(request.as_bytes())
            .await
            .map_err(|_| NetworkError::TlsConnectionClosed)?;
        tls.flush()
            .await
            .map_err(|_| NetworkError::TlsConnectionClosed)?;

        let mut reader = ResponseReader::new();
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let mut total = 0usize;
        while !reader.is_complete() {
            match tls.read(&mut chunk).await {
                Ok(0) | Err(embedded_tls::TlsError::ConnectionClosed) => break,
                Ok(n) => {
                    total += n;
                    reader.push(&chunk[..n], sink).map_err(|e| {
                        warn!("HTTP response rejected: {}", e);
                        NetworkError::from(e)
                    })?;
                }
                Err(e) => {
                    warn!("TLS read failed: {:?}", Debug2Format(&e));
                    return Err(NetworkError::SocketError);
                }
            }
        }
        info!("Received {} bytes", total);

        if let Err((_socket, e)) = tls.close().await {
            debug!("TLS close returned error: {:?}", Debug2Format(&e));
        }
        reader.finish().map_err(NetworkError::from)
    }
}

async fn resolve(
    stack: Stack<'static>,
    host: &str,
    port: u16,
) -> Result<IpEndpoint, NetworkError> {
    let addr = stack
        .dns_query(host, DnsQueryType::A)
        .await
        .map_err(|e| {
            error!("DNS query failed: {:?}", Debug2Format(&e));
            NetworkError::DnsError
        })?
        .first()
        .copied()
        .ok_or_else(|| {
            error!("DNS returned no results for {}", host);
            NetworkError::DnsError
        })?;
    Ok(IpEndpoint::new(addr, port))
}

impl<RNG> CalendarTransport for HttpsTransport<RNG>
where
    RNG: rand_core::RngCore + rand_core::CryptoRng,
{
    type Error = NetworkError;

    async fn fetch<S: ChunkSink>(&mut self, url: &str, sink: &mut S) -> Result<(), NetworkError> {
        let url = Url::parse(url)?;
        self.get(url, sink).await
    }
}
