#![deny(unsafe_code)]
#![deny(warnings)]
//! STM32F4 standby mode
//!
//! The DS3231 INT/SQW output (active low) is inverted onto the WKUP pin
//! (PA0). Standby powers down everything but the backup domain, so a wake
//! is a reset: `PWR_CSR.SBF` tells it apart from a cold boot.
//!
//! SLEEPDEEP may only be set once nothing else needs the clocks, so the
//! wake cycle just raises a request and the idle task performs the final
//! `WFI` (see [`standby_requested`]).

use core::sync::atomic::{AtomicBool, Ordering};

use defmt::{debug, info};
use hal_abstractions::{PowerControl, WakeCause};
use stm32_metapac::{PWR, RCC};

/// PWR_CR bits
const CR_PDDS: u32 = 1 << 1;
const CR_CWUF: u32 = 1 << 2;
const CR_CSBF: u32 = 1 << 3;

/// PWR_CSR bits
const CSR_SBF: u32 = 1 << 1;
const CSR_EWUP: u32 = 1 << 8;

static STANDBY_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Read and clear the standby flags left by the previous power state
pub fn take_wake_cause() -> WakeCause {
    RCC.apb1enr().modify(|w| w.set_pwren(true));

    let woke_from_standby = PWR.csr1().read().0 & CSR_SBF != 0;
    PWR.cr1().modify(|w| w.0 |= CR_CSBF | CR_CWUF);

    if woke_from_standby {
        WakeCause::RtcAlarm
    } else {
        WakeCause::ColdBoot
    }
}

/// Whether the next idle `WFI` should enter standby
pub fn standby_requested() -> bool {
    STANDBY_REQUESTED.load(Ordering::Acquire)
}

/// [`PowerControl`] entering standby with WKUP as the only wake source
pub struct StandbyPower {
    cause: WakeCause,
}

impl StandbyPower {
    pub fn new(cause: WakeCause) -> Self {
        Self { cause }
    }
}

impl PowerControl for StandbyPower {
    fn wake_cause(&self) -> WakeCause {
        self.cause
    }

    async fn quiesce_peripherals(&mut self) {
        // No display or storage on this board
        debug!("Nothing to quiesce");
    }

    fn release_buses(&mut self) {
        // GPIOs go high-impedance in standby; the DS3231 keeps its own pull-ups
        debug!("Buses released");
    }

    async fn enter_deep_sleep(&mut self) {
        info!("Entering standby");
        PWR.csr1().modify(|w| w.0 |= CSR_EWUP);
        PWR.cr1().modify(|w| w.0 |= CR_PDDS | CR_CWUF);
        STANDBY_REQUESTED.store(true, Ordering::Release);
        core::future::pending::<()>().await;
    }
}
