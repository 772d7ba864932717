//! Network join and calendar transport contracts

use core::future::Future;

/// Network link management (DHCP lease, Wi-Fi association, ...)
pub trait NetworkJoin {
    /// Error reported when the link cannot be brought up
    type Error;

    /// Bring the link up; resolves once the device has a usable address
    fn connect(&mut self) -> impl Future<Output = Result<(), Self::Error>>;

    /// Release the link before the device powers down
    fn disconnect(&mut self) -> impl Future<Output = ()>;
}

/// Receiver of body chunks streamed by a [`CalendarTransport`]
///
/// Chunks may split lines (or UTF-8 sequences) at arbitrary positions.
pub trait ChunkSink {
    /// Consume the next chunk of the response body
    fn on_chunk(&mut self, chunk: &[u8]);
}

/// Secure transport that retrieves the calendar resource
///
/// Implementations are responsible for TLS and certificate handling. The
/// sink is invoked zero or more times before the returned future resolves
/// with the terminal status.
pub trait CalendarTransport {
    /// Error reported when the fetch fails at any point
    type Error;

    /// Fetch `url`, streaming the response body into `sink`
    fn fetch<S: ChunkSink>(
        &mut self,
        url: &str,
        sink: &mut S,
    ) -> impl Future<Output = Result<(), Self::Error>>;
}
