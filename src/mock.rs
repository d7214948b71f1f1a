//! Test doubles for the hardware capabilities
//!
//! Available in test builds and behind the `mock` feature. Doubles that take an
//! [`EventLog`] append to it, so a test can check the order in which the cycle
//! touched different pieces of hardware.

use core::cell::{Cell, RefCell};
use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};
use heapless::{Deque, Vec};

use crate::error::{NodeError, Result};
use crate::hal::{
    AnalogChannel, AnalogInput, ConverterControl, PowerDown, Reference, Uptime, WakeTimer,
};
use crate::scheduler::{WakeInterval, WakeSignal};
use crate::sensors::ClimateSensor;
use crate::transport::Transport;

const LOG_CAPACITY: usize = 512;

/// Hardware interaction recorded by the doubles
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    ConverterOn,
    ConverterOff,
    Sleep,
    Read(AnalogChannel),
    Climate,
    ClimateRestore,
    Send,
    PinHigh,
    PinLow,
}

/// Shared, ordered record of [`Event`]s
pub struct EventLog {
    events: RefCell<Vec<Event, LOG_CAPACITY>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            events: RefCell::new(Vec::new()),
        }
    }

    pub fn push(&self, event: Event) {
        // A full log drops further events
        let _ = self.events.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<Event, LOG_CAPACITY> {
        self.events.borrow().clone()
    }

    pub fn count(&self, event: Event) -> usize {
        self.events.borrow().iter().filter(|e| **e == event).count()
    }

    pub fn first(&self, event: Event) -> Option<usize> {
        self.events.borrow().iter().position(|e| *e == event)
    }

    pub fn last(&self, event: Event) -> Option<usize> {
        self.events.borrow().iter().rposition(|e| *e == event)
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

fn record(log: Option<&EventLog>, event: Event) {
    if let Some(log) = log {
        log.push(event);
    }
}

/// Analog input fed from per-channel queues.
///
/// Once a queue runs dry the channel keeps returning its last value.
pub struct MockAnalog<'a> {
    full_scale: u16,
    soil: Deque<u16, 64>,
    battery: Deque<u16, 64>,
    last_soil: u16,
    last_battery: u16,
    soil_reads: u32,
    battery_reads: u32,
    reference: Reference,
    references: Vec<Reference, 32>,
    internal_reads: u32,
    default_reads: u32,
    log: Option<&'a EventLog>,
}

impl<'a> MockAnalog<'a> {
    pub fn new(full_scale: u16) -> Self {
        Self {
            full_scale,
            soil: Deque::new(),
            battery: Deque::new(),
            last_soil: 0,
            last_battery: 0,
            soil_reads: 0,
            battery_reads: 0,
            reference: Reference::Default,
            references: Vec::new(),
            internal_reads: 0,
            default_reads: 0,
            log: None,
        }
    }

    pub fn with_log(mut self, log: &'a EventLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn push_soil(&mut self, values: &[u16]) {
        for value in values {
            let _ = self.soil.push_back(*value);
        }
    }

    pub fn push_battery(&mut self, values: &[u16]) {
        for value in values {
            let _ = self.battery.push_back(*value);
        }
    }

    pub fn reads(&self, channel: AnalogChannel) -> u32 {
        match channel {
            AnalogChannel::Soil => self.soil_reads,
            AnalogChannel::Battery => self.battery_reads,
        }
    }

    pub fn reads_under(&self, reference: Reference) -> u32 {
        match reference {
            Reference::Internal => self.internal_reads,
            Reference::Default => self.default_reads,
        }
    }

    pub fn reference(&self) -> Reference {
        self.reference
    }

    /// Every reference switch, oldest first
    pub fn references(&self) -> Vec<Reference, 32> {
        self.references.clone()
    }
}

impl AnalogInput for MockAnalog<'_> {
    fn read_raw(&mut self, channel: AnalogChannel) -> u16 {
        record(self.log, Event::Read(channel));
        match self.reference {
            Reference::Internal => self.internal_reads += 1,
            Reference::Default => self.default_reads += 1,
        }
        match channel {
            AnalogChannel::Soil => {
                self.soil_reads += 1;
                if let Some(value) = self.soil.pop_front() {
                    self.last_soil = value;
                }
                self.last_soil
            }
            AnalogChannel::Battery => {
                self.battery_reads += 1;
                if let Some(value) = self.battery.pop_front() {
                    self.last_battery = value;
                }
                self.last_battery
            }
        }
    }

    fn full_scale(&self) -> u16 {
        self.full_scale
    }

    fn set_reference(&mut self, reference: Reference) {
        self.reference = reference;
        let _ = self.references.push(reference);
    }
}

/// Converter power gate, enabled at construction
pub struct MockConverter<'a> {
    enabled: bool,
    log: &'a EventLog,
}

impl<'a> MockConverter<'a> {
    pub fn new(log: &'a EventLog) -> Self {
        Self { enabled: true, log }
    }
}

impl ConverterControl for MockConverter<'_> {
    fn enable(&mut self) {
        self.enabled = true;
        self.log.push(Event::ConverterOn);
    }

    fn disable(&mut self) {
        self.enabled = false;
        self.log.push(Event::ConverterOff);
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Power-down that returns immediately.
///
/// When built with `signalling`, every return raises the wake signal, the way
/// the timer interrupt does on hardware.
pub struct MockSleeper<'a> {
    pub sleeps: u32,
    log: &'a EventLog,
    wake: Option<&'a WakeSignal>,
}

impl<'a> MockSleeper<'a> {
    pub fn new(log: &'a EventLog) -> Self {
        Self {
            sleeps: 0,
            log,
            wake: None,
        }
    }

    pub fn signalling(log: &'a EventLog, wake: &'a WakeSignal) -> Self {
        Self {
            sleeps: 0,
            log,
            wake: Some(wake),
        }
    }
}

impl PowerDown for MockSleeper<'_> {
    fn power_down(&mut self) {
        self.sleeps += 1;
        self.log.push(Event::Sleep);
        if let Some(wake) = self.wake {
            wake.signal();
        }
    }
}

/// Climate sensor returning fixed values
pub struct MockClimate<'a> {
    pub temperature: f32,
    pub humidity: f32,
    pub reads: u32,
    pub restores: u32,
    /// Wake flag state seen by the first read, when watching a signal
    pub pending_at_read: Option<bool>,
    wake: Option<&'a WakeSignal>,
    log: Option<&'a EventLog>,
}

impl<'a> MockClimate<'a> {
    pub fn new(temperature: f32, humidity: f32) -> Self {
        Self {
            temperature,
            humidity,
            reads: 0,
            restores: 0,
            pending_at_read: None,
            wake: None,
            log: None,
        }
    }

    pub fn with_log(mut self, log: &'a EventLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn watching(mut self, wake: &'a WakeSignal) -> Self {
        self.wake = Some(wake);
        self
    }

    fn observe(&mut self) {
        self.reads += 1;
        record(self.log, Event::Climate);
        if let (Some(wake), None) = (self.wake, self.pending_at_read) {
            self.pending_at_read = Some(wake.is_pending());
        }
    }
}

impl ClimateSensor for MockClimate<'_> {
    fn read_temperature(&mut self) -> f32 {
        self.observe();
        self.temperature
    }

    fn read_humidity(&mut self) -> f32 {
        self.observe();
        self.humidity
    }

    fn rail_restored(&mut self) {
        self.restores += 1;
        record(self.log, Event::ClimateRestore);
    }
}

/// Radio that keeps the last payload
pub struct MockRadio<'a> {
    pub sent: u32,
    pub completed: u32,
    payload: Vec<u8, 64>,
    failure: Option<NodeError>,
    log: Option<&'a EventLog>,
}

impl<'a> MockRadio<'a> {
    pub fn new() -> Self {
        Self {
            sent: 0,
            completed: 0,
            payload: Vec::new(),
            failure: None,
            log: None,
        }
    }

    /// Radio whose every send fails with `error`
    pub fn failing(error: NodeError) -> Self {
        Self {
            failure: Some(error),
            ..Self::new()
        }
    }

    pub fn with_log(mut self, log: &'a EventLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn last_payload(&self) -> &[u8] {
        &self.payload
    }
}

impl Default for MockRadio<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockRadio<'_> {
    fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.sent += 1;
        record(self.log, Event::Send);
        if let Some(error) = self.failure {
            return Err(error);
        }
        self.payload.clear();
        self.payload
            .extend_from_slice(payload)
            .map_err(|_| NodeError::Transport)
    }

    fn wait_complete(&mut self) {
        self.completed += 1;
    }
}

/// Uptime clock set by the test
pub struct MockClock {
    now_ms: Cell<u64>,
}

impl MockClock {
    pub fn new(now_ms: u64) -> Self {
        Self {
            now_ms: Cell::new(now_ms),
        }
    }

    pub fn set(&self, now_ms: u64) {
        self.now_ms.set(now_ms);
    }
}

impl Uptime for MockClock {
    fn uptime_ms(&self) -> u64 {
        self.now_ms.get()
    }
}

/// Output pin remembering its level
pub struct MockRail<'a> {
    pub high: bool,
    pub switches: u32,
    log: Option<&'a EventLog>,
}

impl<'a> MockRail<'a> {
    pub fn new() -> Self {
        Self {
            high: false,
            switches: 0,
            log: None,
        }
    }

    pub fn with_log(mut self, log: &'a EventLog) -> Self {
        self.log = Some(log);
        self
    }
}

impl Default for MockRail<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorType for MockRail<'_> {
    type Error = Infallible;
}

impl OutputPin for MockRail<'_> {
    fn set_low(&mut self) -> core::result::Result<(), Self::Error> {
        self.high = false;
        self.switches += 1;
        record(self.log, Event::PinLow);
        Ok(())
    }

    fn set_high(&mut self) -> core::result::Result<(), Self::Error> {
        self.high = true;
        self.switches += 1;
        record(self.log, Event::PinHigh);
        Ok(())
    }
}

/// Delay that only adds up the requested time
#[derive(Debug, Default)]
pub struct MockDelay {
    total_ns: u64,
    pub calls: u32,
}

impl MockDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.total_ns / 1_000_000
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
        self.calls += 1;
    }

    fn delay_us(&mut self, us: u32) {
        self.total_ns += u64::from(us) * 1_000;
        self.calls += 1;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.total_ns += u64::from(ms) * 1_000_000;
        self.calls += 1;
    }
}

/// Wake timer that records how it was started
#[derive(Debug, Default)]
pub struct MockWakeTimer {
    pub started: Option<WakeInterval>,
    pub starts: u32,
    fail: bool,
}

impl MockWakeTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

impl WakeTimer for MockWakeTimer {
    fn start(&mut self, interval: WakeInterval) -> Result<()> {
        self.starts += 1;
        if self.fail {
            return Err(NodeError::WakeTimer);
        }
        self.started = Some(interval);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_analog_repeats_last_value() {
        let mut adc = MockAnalog::new(1023);
        adc.push_soil(&[7, 9]);

        assert_eq!(adc.read_raw(AnalogChannel::Soil), 7);
        assert_eq!(adc.read_raw(AnalogChannel::Soil), 9);
        assert_eq!(adc.read_raw(AnalogChannel::Soil), 9);
        assert_eq!(adc.read_raw(AnalogChannel::Battery), 0);
    }

    #[test]
    fn test_mock_delay_accumulates() {
        let mut delay = MockDelay::new();
        delay.delay_ms(2500);
        delay.delay_us(500);
        delay.delay_us(500);

        assert_eq!(delay.elapsed_ms(), 2501);
        assert_eq!(delay.calls, 3);
    }

    #[test]
    fn test_event_log_positions() {
        let log = EventLog::new();
        log.push(Event::PinHigh);
        log.push(Event::Sleep);
        log.push(Event::Sleep);

        assert_eq!(log.count(Event::Sleep), 2);
        assert_eq!(log.first(Event::Sleep), Some(1));
        assert_eq!(log.last(Event::Sleep), Some(2));
        assert_eq!(log.first(Event::Send), None);
    }
}
