//! Wake-cycle state machine
//!
//! One pass runs `Init → JoinNetwork → SyncTime → Fetch → ScheduleAlarm →
//! Sleep`. Any cycle-level failure routes to `Error`, which blinks the
//! failure code for at least the configured backoff before retrying from
//! `Init`. After too many consecutive failures the cycle either sleeps on
//! the fallback alarm (network and sync failures) or halts without arming
//! the RTC (bus failures).

use embassy_futures::select::{select, Either};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use hal_abstractions::{
    CalendarTransport, NetworkJoin, PowerControl, StatusIndicator, TimeSync, UtcClock, UtcInstant,
    WakeCause,
};

use crate::alarm::{next_wake, AlarmSpec};
use crate::config::WakeConfig;
use crate::datetime::WallClock;
use crate::error::{CycleError, TransportError};
use crate::event::CalendarEvent;
use crate::ics::CalendarIngest;
use crate::rtc::Ds3231;
use crate::store::EventStore;
use crate::sync::wait_for_sync;

const BLINK_ON_MS: u32 = 150;
const BLINK_OFF_MS: u32 = 150;
const BLINK_PAUSE_MS: u32 = 1_000;

/// Longest time spent blinking in `Error`, whatever the configured backoff
const MAX_ERROR_BACKOFF_MS: u32 = 600_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeCycleState {
    Init,
    JoinNetwork,
    SyncTime,
    Fetch,
    ScheduleAlarm,
    Sleep,
    Error,
}

/// How a pass through the cycle ended
///
/// On hardware neither is ever observed: deep sleep restarts the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CycleOutcome {
    /// Slept with the RTC alarm armed for `wake_at`
    Slept { wake_at: UtcInstant },
    /// Slept without an alarm after an unrecoverable failure
    Halted(CycleError),
}

/// Hardware and services the cycle drives
pub struct Collaborators<I2C, N, S, T, P, L, D, C> {
    /// Bus the DS3231 sits on
    pub rtc_bus: I2C,
    pub network: N,
    pub time_sync: S,
    pub transport: T,
    pub power: P,
    pub indicator: L,
    pub delay: D,
    pub clock: C,
}

/// Wake-cycle orchestrator
///
/// Owns the RTC driver, the calendar ingest state and every collaborator;
/// nothing else touches them while the cycle runs.
pub struct WakeCycle<I2C, N, S, T, P, L, D, C> {
    config: WakeConfig,
    rtc: Ds3231<I2C>,
    network: N,
    time_sync: S,
    transport: T,
    power: P,
    indicator: L,
    delay: D,
    clock: C,
    ingest: CalendarIngest,
    state: WakeCycleState,
    last_error: Option<CycleError>,
    failures: u8,
    rtc_seeded: bool,
    wake_at: Option<UtcInstant>,
}

impl<I2C, N, S, T, P, L, D, C> WakeCycle<I2C, N, S, T, P, L, D, C>
where
    I2C: I2c,
    N: NetworkJoin,
    S: TimeSync,
    T: CalendarTransport,
    P: PowerControl,
    L: StatusIndicator,
    D: DelayNs,
    C: UtcClock,
{
    pub fn new(config: WakeConfig, parts: Collaborators<I2C, N, S, T, P, L, D, C>) -> Self {
        let ingest = CalendarIngest::new(config.local_offset);
        Self {
            config,
            rtc: Ds3231::new(parts.rtc_bus),
            network: parts.network,
            time_sync: parts.time_sync,
            transport: parts.transport,
            power: parts.power,
            indicator: parts.indicator,
            delay: parts.delay,
            clock: parts.clock,
            ingest,
            state: WakeCycleState::Init,
            last_error: None,
            failures: 0,
            rtc_seeded: false,
            wake_at: None,
        }
    }

    pub fn state(&self) -> WakeCycleState {
        self.state
    }

    /// Events from the most recent fetch
    pub fn store(&self) -> &EventStore {
        self.ingest.store()
    }

    /// Failure that sent the cycle to `Error` most recently
    pub fn last_error(&self) -> Option<CycleError> {
        self.last_error
    }

    /// Failed passes since the last sleep
    pub fn consecutive_failures(&self) -> u8 {
        self.failures
    }

    /// Instant the RTC alarm was last armed for
    pub fn wake_at(&self) -> Option<UtcInstant> {
        self.wake_at
    }

    /// Run forever; each simulated wake starts a new pass at `Init`
    pub async fn run(&mut self) -> ! {
        loop {
            match self.run_cycle().await {
                CycleOutcome::Slept { wake_at } => {
                    info!("Woke from sleep (alarm was {})", wake_at.unix_secs());
                }
                CycleOutcome::Halted(e) => {
                    warn!("Woke from halt ({}), restarting", e);
                }
            }
        }
    }

    /// Step until the device sleeps
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        loop {
            if let Some(outcome) = self.step().await {
                return outcome;
            }
        }
    }

    /// Execute the current state and move to the next one
    ///
    /// Returns the outcome once the device has slept, `None` otherwise.
    pub async fn step(&mut self) -> Option<CycleOutcome> {
        let state = self.state;
        debug!("Entering {}", state);

        let result = match state {
            WakeCycleState::Init => self.init().await.map(|()| WakeCycleState::JoinNetwork),
            WakeCycleState::JoinNetwork => {
                self.join_network().await.map(|()| WakeCycleState::SyncTime)
            }
            WakeCycleState::SyncTime => self.sync_time().await.map(|()| WakeCycleState::Fetch),
            WakeCycleState::Fetch => self.fetch().await.map(|()| WakeCycleState::ScheduleAlarm),
            WakeCycleState::ScheduleAlarm => {
                self.schedule_alarm().await.map(|()| WakeCycleState::Sleep)
            }
            WakeCycleState::Sleep => return self.sleep().await,
            WakeCycleState::Error => return self.recover().await,
        };

        match result {
            Ok(next) => self.state = next,
            Err(e) => {
                error!("{} failed: {}", state, e);
                self.last_error = Some(e);
                self.state = WakeCycleState::Error;
            }
        }
        None
    }

    async fn init(&mut self) -> Result<(), CycleError> {
        match self.power.wake_cause() {
            WakeCause::RtcAlarm => {
                info!("Woken by RTC alarm");
                self.rtc.clear_alarm_flag().await?;
            }
            WakeCause::ColdBoot if !self.rtc_seeded => {
                let seed = self.config.cold_boot_time;
                info!("Cold boot, seeding RTC with {}", seed.unix_secs());
                self.rtc.write_time(&WallClock::from_instant(seed)).await?;
                self.clock.set(seed);
                self.rtc_seeded = true;
            }
            WakeCause::ColdBoot => {}
        }
        Ok(())
    }

    async fn join_network(&mut self) -> Result<(), CycleError> {
        let timeout = self.delay.delay_ms(self.config.join_timeout_ms);
        match select(self.network.connect(), timeout).await {
            Either::First(Ok(())) => {
                info!("Network up");
                Ok(())
            }
            Either::First(Err(_)) => Err(TransportError::JoinFailed.into()),
            Either::Second(()) => Err(TransportError::JoinTimeout.into()),
        }
    }

    async fn sync_time(&mut self) -> Result<(), CycleError> {
        let now = wait_for_sync(
            &mut self.time_sync,
            &mut self.delay,
            self.config.sync_timeout_ms,
            self.config.sync_poll_interval_ms,
        )
        .await?;

        self.clock.set(now);
        self.rtc.write_time(&WallClock::from_instant(now)).await?;
        info!("Time synced: {}", now.unix_secs());
        Ok(())
    }

    async fn fetch(&mut self) -> Result<(), CycleError> {
        self.ingest.begin_fetch();
        info!("Fetching calendar from {}", self.config.calendar_url);

        let result = {
            let mut sink = self.ingest.sink(&self.clock);
            let fetch = self.transport.fetch(self.config.calendar_url, &mut sink);
            let timeout = self.delay.delay_ms(self.config.fetch_timeout_ms);
            match select(fetch, timeout).await {
                Either::First(Ok(())) => Ok(()),
                Either::First(Err(_)) => Err(TransportError::FetchFailed),
                Either::Second(()) => Err(TransportError::FetchTimeout),
            }
        };
        // On failure the partial store is left as is; the next fetch clears it
        result?;

        self.ingest.finish(self.clock.now());
        self.log_upcoming();
        Ok(())
    }

    fn log_upcoming(&self) {
        let events = self.ingest.store().snapshot();
        if events.is_empty() {
            info!("No upcoming events");
            return;
        }
        info!("{} upcoming events:", events.len());
        for event in events.iter().take(self.config.upcoming_log_count) {
            let t = WallClock::from_instant(event.start());
            info!(
                "  {}-{:02}-{:02} {:02}:{:02} UTC  {}",
                t.year,
                t.month,
                t.day,
                t.hour,
                t.minute,
                event.summary()
            );
        }
    }

    async fn schedule_alarm(&mut self) -> Result<(), CycleError> {
        let now = self.rtc.read_time().await?.to_instant();
        let upcoming = self.ingest.store().next_after(now).map(CalendarEvent::start);
        let wake_at = next_wake(
            now,
            self.config.fallback_interval_secs,
            self.config.min_alarm_lead_secs,
            upcoming,
        );

        // A stale flag would hold INT asserted and the alarm could never fire
        self.rtc.clear_alarm_flag().await?;
        self.rtc.arm_alarm(AlarmSpec::at(wake_at)).await?;
        self.wake_at = Some(wake_at);

        info!(
            "Alarm armed for {} ({} s from now)",
            wake_at.unix_secs(),
            now.secs_until(wake_at)
        );
        Ok(())
    }

    async fn sleep(&mut self) -> Option<CycleOutcome> {
        let Some(wake_at) = self.wake_at else {
            // Only reachable through ScheduleAlarm, which sets the alarm
            self.state = WakeCycleState::ScheduleAlarm;
            return None;
        };

        info!("Entering deep sleep");
        self.power_down().await;

        self.failures = 0;
        self.state = WakeCycleState::Init;
        Some(CycleOutcome::Slept { wake_at })
    }

    async fn recover(&mut self) -> Option<CycleOutcome> {
        let Some(error) = self.last_error else {
            self.state = WakeCycleState::Init;
            return None;
        };

        self.failures = self.failures.saturating_add(1);
        warn!(
            "Failure {}/{}: {}, backing off {} ms",
            self.failures,
            self.config.max_consecutive_failures,
            error,
            self.config.error_backoff_ms
        );
        self.signal_error(error.blink_code()).await;

        if self.failures < self.config.max_consecutive_failures.max(1) {
            self.state = WakeCycleState::Init;
            return None;
        }

        if error.is_recoverable() {
            warn!("Giving up until the next wake, scheduling fallback alarm");
            self.state = WakeCycleState::ScheduleAlarm;
            return None;
        }

        error!("Unrecoverable RTC failure, halting until reset");
        self.wake_at = None;
        self.power_down().await;

        self.failures = 0;
        self.state = WakeCycleState::Init;
        Some(CycleOutcome::Halted(error))
    }

    /// Repeat the blink pattern for `code` until the backoff has elapsed
    async fn signal_error(&mut self, code: u8) {
        let backoff_ms = self.config.error_backoff_ms.min(MAX_ERROR_BACKOFF_MS);
        let pattern_ms = (code as u32)
            .saturating_mul(BLINK_ON_MS + BLINK_OFF_MS)
            .saturating_add(BLINK_PAUSE_MS);
        let mut elapsed_ms: u32 = 0;
        loop {
            for _ in 0..code {
                self.indicator.set_lit(true);
                self.delay.delay_ms(BLINK_ON_MS).await;
                self.indicator.set_lit(false);
                self.delay.delay_ms(BLINK_OFF_MS).await;
            }
            self.delay.delay_ms(BLINK_PAUSE_MS).await;
            elapsed_ms = elapsed_ms.saturating_add(pattern_ms);

            if elapsed_ms >= backoff_ms {
                break;
            }
        }
    }

    async fn power_down(&mut self) {
        self.network.disconnect().await;
        self.indicator.set_lit(false);
        self.power.quiesce_peripherals().await;
        self.power.release_buses();
        self.power.enter_deep_sleep().await;
    }
}

#[cfg(test)]
mod tests {
    use embassy_futures::block_on;
    use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};

    use super::*;
    use crate::error::{RtcError, SyncError};
    use crate::rtc::registers;
    use crate::testing::{
        FakeClock, FakeDelay, FakeDs3231, FakeIndicator, FakeNetwork, FakePower, FakeTimeSync,
        FakeTransport, Fetch, Journal, Outcome,
    };

    type TestCycle = WakeCycle<
        FakeDs3231,
        FakeNetwork,
        FakeTimeSync,
        FakeTransport,
        FakePower,
        FakeIndicator,
        FakeDelay,
        FakeClock,
    >;

    // 2029-12-31 23:59:30 UTC
    const SYNCED: UtcInstant = UtcInstant::from_unix_secs(1_893_455_970);

    // 2025-07-05 12:00:00 UTC
    const COLD_BOOT_SECS: i64 = 1_751_716_800;

    const CALENDAR: &[u8] = b"BEGIN:VCALENDAR\r\n\
BEGIN:VEVENT\r\n\
SUMMARY:Meeting\r\n\
DTSTART:20300101T090000Z\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
SUMMARY:Fireworks\r\n\
DTSTART:20300101T000020Z\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    struct Setup {
        cause: WakeCause,
        network: Outcome,
        /// Empty polls before sync succeeds; `None` never syncs
        sync: Option<u32>,
        fetches: std::vec::Vec<Fetch>,
    }

    impl Default for Setup {
        fn default() -> Self {
            Self {
                cause: WakeCause::ColdBoot,
                network: Outcome::Succeed,
                sync: Some(2),
                fetches: vec![Fetch::body(CALENDAR)],
            }
        }
    }

    struct Rig {
        journal: Journal,
        chip: FakeDs3231,
        delay: FakeDelay,
        clock: FakeClock,
    }

    fn build(setup: Setup) -> (TestCycle, Rig) {
        let journal = Journal::default();
        let chip = FakeDs3231::new();
        let delay = FakeDelay::default();
        let clock = FakeClock::at(UtcInstant::UNIX_EPOCH);

        let time_sync = match setup.sync {
            Some(polls) => FakeTimeSync::ready_after(polls, SYNCED, journal.clone()),
            None => FakeTimeSync::never(journal.clone()),
        };
        let cycle = WakeCycle::new(
            WakeConfig::with_url("https://calendar.example.com/basic.ics"),
            Collaborators {
                rtc_bus: chip.clone(),
                network: FakeNetwork::new(setup.network, journal.clone()),
                time_sync,
                transport: FakeTransport::new(setup.fetches, journal.clone()),
                power: FakePower::new(setup.cause, journal.clone()),
                indicator: FakeIndicator::new(journal.clone()),
                delay: delay.clone(),
                clock: clock.clone(),
            },
        );

        (
            cycle,
            Rig {
                journal,
                chip,
                delay,
                clock,
            },
        )
    }

    fn step(cycle: &mut TestCycle) -> Option<CycleOutcome> {
        block_on(cycle.step())
    }

    #[test]
    fn test_full_pass_arms_earliest_event() {
        let (mut cycle, rig) = build(Setup::default());

        for state in [
            WakeCycleState::Init,
            WakeCycleState::JoinNetwork,
            WakeCycleState::SyncTime,
            WakeCycleState::Fetch,
            WakeCycleState::ScheduleAlarm,
        ] {
            assert_eq!(cycle.state(), state);
            assert_eq!(step(&mut cycle), None);
        }
        assert_eq!(cycle.state(), WakeCycleState::Sleep);

        // 2030-01-01 00:00:20 is sooner than the 60 s fallback
        let wake_at = UtcInstant::from_unix_secs(1_893_456_020);
        assert_eq!(step(&mut cycle), Some(CycleOutcome::Slept { wake_at }));
        assert_eq!(cycle.state(), WakeCycleState::Init);
        assert_eq!(cycle.wake_at(), Some(wake_at));

        let events = cycle.store().snapshot();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].summary(), "Fireworks");
        assert_eq!(events[1].summary(), "Meeting");

        let regs = rig.chip.registers();
        // Synced time, Monday 2029-12-31 23:59:30
        assert_eq!(regs[0x00..0x07], [0x30, 0x59, 0x23, 0x02, 0x31, 0x12, 0x29]);
        assert_eq!(regs[0x07..0x0B], [0x20, 0x00, 0x00, 0x01]);
        assert_eq!(regs[registers::CONTROL as usize], 0x05);
        assert_eq!(rig.clock.now(), SYNCED);
    }

    #[test]
    fn test_sleep_quiesces_in_order() {
        let (mut cycle, rig) = build(Setup::default());
        block_on(cycle.run_cycle());
        assert_eq!(
            rig.journal.entries(),
            [
                "net:connect",
                "sync:start",
                "sync:stop",
                "fetch",
                "net:disconnect",
                "led:off",
                "power:quiesce",
                "power:release",
                "power:sleep",
            ]
        );
    }

    #[test]
    fn test_cold_boot_seeds_rtc_once() {
        let (mut cycle, rig) = build(Setup {
            network: Outcome::Fail,
            ..Setup::default()
        });

        step(&mut cycle);
        assert_eq!(
            rig.chip.registers()[0x00..0x07],
            [0x00, 0x00, 0x12, 0x07, 0x05, 0x07, 0x25]
        );
        assert_eq!(rig.clock.now().unix_secs(), COLD_BOOT_SECS);

        // The clock has moved on by the time the retry reaches Init
        rig.chip.load(registers::TIME, &[0x10]);
        step(&mut cycle);
        assert_eq!(cycle.state(), WakeCycleState::Error);
        step(&mut cycle);
        assert_eq!(cycle.state(), WakeCycleState::Init);
        step(&mut cycle);
        assert_eq!(cycle.state(), WakeCycleState::JoinNetwork);
        assert_eq!(rig.chip.registers()[0x00], 0x10);
    }

    #[test]
    fn test_alarm_wake_clears_flag_and_keeps_clock() {
        let (mut cycle, rig) = build(Setup {
            cause: WakeCause::RtcAlarm,
            ..Setup::default()
        });
        let time = [0x00, 0x30, 0x08, 0x03, 0x01, 0x01, 0x30];
        rig.chip.load(registers::TIME, &time);
        rig.chip.load(registers::STATUS, &[0x01]);

        step(&mut cycle);
        assert_eq!(cycle.state(), WakeCycleState::JoinNetwork);
        assert_eq!(rig.chip.registers()[0x00..0x07], time);
        assert_eq!(rig.chip.registers()[registers::STATUS as usize], 0x00);
    }

    #[test]
    fn test_join_failures() {
        let cases = [
            (Outcome::Fail, TransportError::JoinFailed, 0),
            (Outcome::Hang, TransportError::JoinTimeout, 30_000),
        ];
        for (network, expected, waited_ms) in cases {
            let (mut cycle, rig) = build(Setup {
                network,
                ..Setup::default()
            });
            step(&mut cycle);
            step(&mut cycle);
            assert_eq!(cycle.state(), WakeCycleState::Error);
            assert_eq!(cycle.last_error(), Some(CycleError::Transport(expected)));
            assert_eq!(rig.delay.elapsed_ms(), waited_ms);
        }
    }

    #[test]
    fn test_sync_timeout_routes_to_error() {
        let (mut cycle, rig) = build(Setup {
            sync: None,
            ..Setup::default()
        });
        for _ in 0..3 {
            step(&mut cycle);
        }
        assert_eq!(cycle.state(), WakeCycleState::Error);
        assert_eq!(cycle.last_error(), Some(CycleError::Sync(SyncError::Timeout)));
        assert_eq!(rig.delay.elapsed_ms(), 30_000);
        assert_eq!(rig.journal.count("sync:stop"), 1);
    }

    #[test]
    fn test_fetch_failure_keeps_partial_store_until_next_fetch() {
        const TWO_EVENTS: &[u8] = b"BEGIN:VEVENT\n\
SUMMARY:One\n\
DTSTART:20300101T090000Z\n\
END:VEVENT\n\
BEGIN:VEVENT\n\
SUMMARY:Two\n\
DTSTART:20300102T090000Z\n\
END:VEVENT\n\
BEGIN:VEV";
        let (mut cycle, _rig) = build(Setup {
            fetches: vec![
                Fetch {
                    chunks: vec![TWO_EVENTS],
                    outcome: Outcome::Fail,
                },
                Fetch::body(b"BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n"),
            ],
            ..Setup::default()
        });

        for _ in 0..4 {
            step(&mut cycle);
        }
        assert_eq!(cycle.state(), WakeCycleState::Error);
        assert_eq!(
            cycle.last_error(),
            Some(CycleError::Transport(TransportError::FetchFailed))
        );
        assert_eq!(cycle.store().len(), 2);

        // Backoff, then Init, JoinNetwork and SyncTime again
        for _ in 0..4 {
            step(&mut cycle);
        }
        assert_eq!(cycle.state(), WakeCycleState::Fetch);
        assert_eq!(cycle.store().len(), 2);

        step(&mut cycle);
        assert_eq!(cycle.state(), WakeCycleState::ScheduleAlarm);
        assert!(cycle.store().is_empty());
    }

    #[test]
    fn test_fetch_timeout() {
        let (mut cycle, _rig) = build(Setup {
            fetches: vec![Fetch {
                chunks: vec![],
                outcome: Outcome::Hang,
            }],
            ..Setup::default()
        });
        for _ in 0..4 {
            step(&mut cycle);
        }
        assert_eq!(
            cycle.last_error(),
            Some(CycleError::Transport(TransportError::FetchTimeout))
        );
    }

    #[test]
    fn test_error_backoff_elapses_before_retry() {
        let (mut cycle, rig) = build(Setup {
            network: Outcome::Fail,
            ..Setup::default()
        });
        step(&mut cycle);
        step(&mut cycle);
        assert_eq!(cycle.state(), WakeCycleState::Error);

        let before_ms = rig.delay.elapsed_ms();
        assert_eq!(step(&mut cycle), None);
        assert_eq!(cycle.state(), WakeCycleState::Init);
        assert_eq!(cycle.consecutive_failures(), 1);

        // Seven 1.6 s patterns of two blinks cover the 10 s backoff
        assert_eq!(rig.delay.elapsed_ms() - before_ms, 11_200);
        assert_eq!(rig.journal.count("led:on"), 14);
        assert_eq!(rig.journal.count("led:off"), 14);
    }

    #[test]
    fn test_oversized_backoff_is_capped() {
        let (mut cycle, rig) = build(Setup {
            network: Outcome::Fail,
            ..Setup::default()
        });
        cycle.config.error_backoff_ms = u32::MAX;
        step(&mut cycle);
        step(&mut cycle);
        assert_eq!(cycle.state(), WakeCycleState::Error);

        let before_ms = rig.delay.elapsed_ms();
        assert_eq!(step(&mut cycle), None);
        assert_eq!(cycle.state(), WakeCycleState::Init);

        // 375 patterns of 1.6 s reach the ten minute cap exactly
        assert_eq!(rig.delay.elapsed_ms() - before_ms, 600_000);
        assert_eq!(rig.journal.count("led:on"), 750);
    }

    #[test]
    fn test_exhausted_transport_failures_sleep_on_fallback() {
        let (mut cycle, rig) = build(Setup {
            network: Outcome::Fail,
            ..Setup::default()
        });

        let outcome = block_on(cycle.run_cycle());
        let wake_at = UtcInstant::from_unix_secs(COLD_BOOT_SECS + 60);
        assert_eq!(outcome, CycleOutcome::Slept { wake_at });
        assert_eq!(rig.journal.count("net:connect"), 3);
        assert_eq!(rig.journal.count("power:sleep"), 1);
        assert_eq!(cycle.consecutive_failures(), 0);

        // 2025-07-05 12:01:00
        assert_eq!(rig.chip.registers()[0x07..0x0B], [0x00, 0x01, 0x12, 0x05]);
    }

    #[test]
    fn test_missing_network_never_fetches_but_sleeps() {
        let (mut cycle, rig) = build(Setup {
            network: Outcome::Fail,
            sync: None,
            fetches: vec![],
            ..Setup::default()
        });

        let outcome = block_on(cycle.run_cycle());
        let wake_at = UtcInstant::from_unix_secs(COLD_BOOT_SECS + 60);
        assert_eq!(outcome, CycleOutcome::Slept { wake_at });
        assert_eq!(rig.journal.count("fetch"), 0);
        assert_eq!(rig.journal.count("sync:start"), 0);
        assert_eq!(rig.journal.entries().last(), Some(&"power:sleep"));

        // Alarm 1 armed for 12:01:00 on the 5th
        assert_eq!(rig.chip.registers()[0x07..0x0B], [0x00, 0x01, 0x12, 0x05]);
    }

    #[test]
    fn test_bus_failure_halts_without_alarm() {
        let (mut cycle, rig) = build(Setup::default());
        rig.chip.set_failing(true);

        let outcome = block_on(cycle.run_cycle());
        let bus = RtcError::Bus(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        assert_eq!(outcome, CycleOutcome::Halted(CycleError::Bus(bus)));
        assert_eq!(rig.journal.count("net:connect"), 0);
        // Five 2.2 s patterns of four blinks per failure
        assert_eq!(rig.journal.count("led:on"), 3 * 5 * 4);
        assert_eq!(rig.journal.count("power:sleep"), 1);
        assert_eq!(cycle.wake_at(), None);
        assert_eq!(rig.chip.registers()[registers::CONTROL as usize], 0x00);
    }
}
