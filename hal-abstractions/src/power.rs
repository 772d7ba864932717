//! Wake cause reporting and low-power control

use core::future::Future;

/// Why execution (re)started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeCause {
    /// Power-on or reset; the RTC contents are not trusted
    ColdBoot,
    /// Woken from deep sleep by the external RTC alarm
    RtcAlarm,
}

/// Board power management
///
/// The core calls these in a fixed order before sleeping:
/// `quiesce_peripherals`, `release_buses`, `enter_deep_sleep`.
pub trait PowerControl {
    /// Reason for the current boot
    fn wake_cause(&self) -> WakeCause;

    /// Put display and storage peripherals into their lowest-power state
    fn quiesce_peripherals(&mut self) -> impl Future<Output = ()>;

    /// Release shared buses (I2C, SPI) and park their pins
    fn release_buses(&mut self);

    /// Enter deep sleep
    ///
    /// On hardware this never resolves: the next wake restarts the firmware.
    /// Simulated platforms may resolve, which the core treats as a wake.
    fn enter_deep_sleep(&mut self) -> impl Future<Output = ()>;
}
