//! Bounded wait on the time-sync collaborator

use embedded_hal_async::delay::DelayNs;
use hal_abstractions::{TimeSync, UtcInstant};

use crate::error::SyncError;

/// Start a sync attempt and poll its notification until it fires or
/// `timeout_ms` elapses
///
/// The attempt is stopped in both cases, so the background worker and its
/// notification never outlive the call.
pub async fn wait_for_sync<S: TimeSync, D: DelayNs>(
    sync: &mut S,
    delay: &mut D,
    timeout_ms: u32,
    poll_interval_ms: u32,
) -> Result<UtcInstant, SyncError> {
    let poll_interval_ms = poll_interval_ms.max(1);

    sync.start();
    let mut waited_ms: u32 = 0;
    let result = loop {
        if let Some(now) = sync.poll_synced() {
            debug!("Time synced after {} ms", waited_ms);
            break Ok(now);
        }
        if waited_ms >= timeout_ms {
            break Err(SyncError::Timeout);
        }
        let step = poll_interval_ms.min(timeout_ms - waited_ms);
        delay.delay_ms(step).await;
        waited_ms += step;
    };
    sync.stop();

    result
}
