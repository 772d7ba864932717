//! Host fakes for the collaborator traits
//!
//! Fakes that need to be inspected after being moved into the code under
//! test share their state through `Rc`, so a clone kept by the test sees
//! every change made through the moved value.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{ErrorType, I2c, Operation};
use hal_abstractions::{
    CalendarTransport, ChunkSink, NetworkJoin, PowerControl, StatusIndicator, TimeSync, UtcClock,
    UtcInstant, WakeCause,
};

/// Ordered record of collaborator calls
#[derive(Debug, Default, Clone)]
pub struct Journal(Rc<RefCell<Vec<&'static str>>>);

impl Journal {
    pub fn record(&self, entry: &'static str) {
        self.0.borrow_mut().push(entry);
    }

    pub fn entries(&self) -> Vec<&'static str> {
        self.0.borrow().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.borrow().iter().filter(|e| **e == entry).count()
    }
}

const DS3231_REGISTERS: usize = 0x13;

#[derive(Debug, Default)]
struct ChipState {
    registers: [u8; DS3231_REGISTERS],
    pointer: usize,
    failing: bool,
    last_address: Option<u8>,
}

/// In-memory DS3231 register file behind the async I2C trait
#[derive(Debug, Default, Clone)]
pub struct FakeDs3231(Rc<RefCell<ChipState>>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeBusError;

impl embedded_hal::i2c::Error for FakeBusError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
    }
}

impl FakeDs3231 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registers(&self) -> [u8; DS3231_REGISTERS] {
        self.0.borrow().registers
    }

    /// Overwrite registers starting at `register`
    pub fn load(&self, register: u8, values: &[u8]) {
        let mut state = self.0.borrow_mut();
        let start = register as usize;
        state.registers[start..start + values.len()].copy_from_slice(values);
    }

    /// Make every following transfer fail with a NACK
    pub fn set_failing(&self, failing: bool) {
        self.0.borrow_mut().failing = failing;
    }

    pub fn last_address(&self) -> Option<u8> {
        self.0.borrow().last_address
    }
}

impl ErrorType for FakeDs3231 {
    type Error = FakeBusError;
}

impl I2c for FakeDs3231 {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut state = self.0.borrow_mut();
        state.last_address = Some(address);
        if state.failing {
            return Err(FakeBusError);
        }

        for operation in operations {
            match operation {
                Operation::Write(bytes) => {
                    let Some((&register, data)) = bytes.split_first() else {
                        continue;
                    };
                    state.pointer = register as usize % DS3231_REGISTERS;
                    for &byte in data {
                        let pointer = state.pointer;
                        state.registers[pointer] = byte;
                        state.pointer = (pointer + 1) % DS3231_REGISTERS;
                    }
                }
                Operation::Read(buf) => {
                    for byte in buf.iter_mut() {
                        *byte = state.registers[state.pointer];
                        state.pointer = (state.pointer + 1) % DS3231_REGISTERS;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Delay that completes immediately and accumulates virtual time
#[derive(Debug, Default, Clone)]
pub struct FakeDelay(Rc<Cell<u64>>);

impl FakeDelay {
    pub fn elapsed_ms(&self) -> u64 {
        self.0.get() / 1_000_000
    }
}

impl DelayNs for FakeDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.0.set(self.0.get() + ns as u64);
    }

    async fn delay_us(&mut self, us: u32) {
        self.0.set(self.0.get() + us as u64 * 1_000);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.0.set(self.0.get() + ms as u64 * 1_000_000);
    }
}

/// Settable clock that does not advance on its own
#[derive(Debug, Clone)]
pub struct FakeClock(Rc<Cell<UtcInstant>>);

impl FakeClock {
    pub fn at(now: UtcInstant) -> Self {
        Self(Rc::new(Cell::new(now)))
    }
}

impl UtcClock for FakeClock {
    fn now(&self) -> UtcInstant {
        self.0.get()
    }

    fn set(&mut self, now: UtcInstant) {
        self.0.set(now);
    }
}

/// Time sync whose notification fires after a fixed number of empty polls
#[derive(Debug)]
pub struct FakeTimeSync {
    empty_polls: Option<u32>,
    polls: u32,
    fired: bool,
    at: UtcInstant,
    journal: Journal,
}

impl FakeTimeSync {
    pub fn ready_after(empty_polls: u32, at: UtcInstant, journal: Journal) -> Self {
        Self {
            empty_polls: Some(empty_polls),
            polls: 0,
            fired: false,
            at,
            journal,
        }
    }

    pub fn never(journal: Journal) -> Self {
        Self {
            empty_polls: None,
            polls: 0,
            fired: false,
            at: UtcInstant::UNIX_EPOCH,
            journal,
        }
    }
}

impl TimeSync for FakeTimeSync {
    fn start(&mut self) {
        self.polls = 0;
        self.fired = false;
        self.journal.record("sync:start");
    }

    fn poll_synced(&mut self) -> Option<UtcInstant> {
        let ready = self.empty_polls.is_some_and(|n| self.polls >= n);
        self.polls += 1;
        if ready && !self.fired {
            self.fired = true;
            Some(self.at)
        } else {
            None
        }
    }

    fn stop(&mut self) {
        self.journal.record("sync:stop");
    }
}

/// Scripted result of a network or transport call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeed,
    Fail,
    /// Never resolves; only a timeout ends the call
    Hang,
}

impl Outcome {
    async fn resolve(self) -> Result<(), ()> {
        match self {
            Self::Succeed => Ok(()),
            Self::Fail => Err(()),
            Self::Hang => core::future::pending().await,
        }
    }
}

#[derive(Debug)]
pub struct FakeNetwork {
    outcome: Outcome,
    journal: Journal,
}

impl FakeNetwork {
    pub fn new(outcome: Outcome, journal: Journal) -> Self {
        Self { outcome, journal }
    }
}

impl NetworkJoin for FakeNetwork {
    type Error = ();

    async fn connect(&mut self) -> Result<(), Self::Error> {
        self.journal.record("net:connect");
        self.outcome.resolve().await
    }

    async fn disconnect(&mut self) {
        self.journal.record("net:disconnect");
    }
}

/// One scripted fetch: body chunks, then a terminal outcome
#[derive(Debug, Clone)]
pub struct Fetch {
    pub chunks: Vec<&'static [u8]>,
    pub outcome: Outcome,
}

impl Fetch {
    pub fn body(body: &'static [u8]) -> Self {
        Self {
            chunks: std::vec![body],
            outcome: Outcome::Succeed,
        }
    }
}

/// Transport replaying scripted fetches; the last one repeats
#[derive(Debug)]
pub struct FakeTransport {
    script: Vec<Fetch>,
    calls: usize,
    journal: Journal,
}

impl FakeTransport {
    pub fn new(script: Vec<Fetch>, journal: Journal) -> Self {
        Self {
            script,
            calls: 0,
            journal,
        }
    }
}

impl CalendarTransport for FakeTransport {
    type Error = ();

    async fn fetch<S: ChunkSink>(&mut self, _url: &str, sink: &mut S) -> Result<(), Self::Error> {
        self.journal.record("fetch");
        let index = self.calls.min(self.script.len().saturating_sub(1));
        self.calls += 1;
        let Some(fetch) = self.script.get(index).cloned() else {
            return Err(());
        };
        for chunk in fetch.chunks {
            sink.on_chunk(chunk);
        }
        fetch.outcome.resolve().await
    }
}

#[derive(Debug)]
pub struct FakePower {
    cause: WakeCause,
    journal: Journal,
}

impl FakePower {
    pub fn new(cause: WakeCause, journal: Journal) -> Self {
        Self { cause, journal }
    }
}

impl PowerControl for FakePower {
    fn wake_cause(&self) -> WakeCause {
        self.cause
    }

    async fn quiesce_peripherals(&mut self) {
        self.journal.record("power:quiesce");
    }

    fn release_buses(&mut self) {
        self.journal.record("power:release");
    }

    async fn enter_deep_sleep(&mut self) {
        self.journal.record("power:sleep");
    }
}

#[derive(Debug)]
pub struct FakeIndicator(Journal);

impl FakeIndicator {
    pub fn new(journal: Journal) -> Self {
        Self(journal)
    }
}

impl StatusIndicator for FakeIndicator {
    fn set_lit(&mut self, lit: bool) {
        self.0.record(if lit { "led:on" } else { "led:off" });
    }
}
