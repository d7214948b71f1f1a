//! Power sequencing
//!
//! Brackets the conversion hardware, drives the peripheral supply rail and
//! runs the bounded power-down loop between cycles.

use embedded_hal::digital::OutputPin;

use crate::hal::{ConverterControl, PowerDown};

/// Converter gating and the multi-iteration deep sleep
pub struct PowerController<C, S> {
    converter: C,
    sleeper: S,
}

impl<C, S> PowerController<C, S>
where
    C: ConverterControl,
    S: PowerDown,
{
    pub fn new(converter: C, sleeper: S) -> Self {
        Self { converter, sleeper }
    }

    pub fn disable_converter(&mut self) {
        self.converter.disable();
    }

    pub fn enable_converter(&mut self) {
        self.converter.enable();
    }

    pub fn converter_enabled(&self) -> bool {
        self.converter.is_enabled()
    }

    /// Dozes for `iterations` wake timer periods.
    ///
    /// Power-down requires the converter off, so it is cleared again before
    /// every sleep even though it was disabled on entry. The converter is left
    /// enabled on return whatever its state was before.
    /// param iterations: Number of power-down/wake pairs
    pub fn enter_deep_sleep(&mut self, iterations: u8) {
        self.converter.disable();
        for i in 0..iterations {
            self.converter.disable();
            self.sleeper.power_down();
            log_trace!("doze {}/{} done", i + 1, iterations);
            self.converter.enable();
        }
        self.converter.enable();
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }
}

/// Switch for the supply rail feeding the sensors and the radio
pub struct PeripheralRail<P> {
    pin: P,
    powered: bool,
}

impl<P: OutputPin> PeripheralRail<P> {
    /// Wraps the switch pin. The rail is considered off until `power_on`.
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            powered: false,
        }
    }

    pub fn power_on(&mut self) {
        if self.pin.set_high().is_err() {
            log_warn!("peripheral rail: failed to switch on");
        }
        self.powered = true;
    }

    pub fn power_off(&mut self) {
        if self.pin.set_low().is_err() {
            log_warn!("peripheral rail: failed to switch off");
        }
        self.powered = false;
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Event, EventLog, MockConverter, MockRail, MockSleeper};

    #[test]
    fn test_deep_sleep_runs_exact_iteration_count() {
        let log = EventLog::new();
        let mut power = PowerController::new(MockConverter::new(&log), MockSleeper::new(&log));

        power.enter_deep_sleep(9);

        assert_eq!(power.sleeper().sleeps, 9);
        assert_eq!(log.count(Event::Sleep), 9);
        assert!(power.converter_enabled());
    }

    #[test]
    fn test_converter_is_off_for_every_sleep() {
        let log = EventLog::new();
        let mut power = PowerController::new(MockConverter::new(&log), MockSleeper::new(&log));

        power.enter_deep_sleep(3);

        let events = log.events();
        for (i, event) in events.iter().enumerate() {
            if *event == Event::Sleep {
                assert_eq!(events[i - 1], Event::ConverterOff);
                assert_eq!(events[i + 1], Event::ConverterOn);
            }
        }
        assert_eq!(events.last(), Some(&Event::ConverterOn));
    }

    #[test]
    fn test_converter_enabled_on_return_regardless_of_entry_state() {
        let log = EventLog::new();
        let mut converter = MockConverter::new(&log);
        converter.disable();
        let mut power = PowerController::new(converter, MockSleeper::new(&log));
        assert!(!power.converter_enabled());

        power.enter_deep_sleep(9);
        assert!(power.converter_enabled());

        power.enable_converter();
        power.enter_deep_sleep(1);
        assert!(power.converter_enabled());
    }

    #[test]
    fn test_zero_iterations_still_reenables_converter() {
        let log = EventLog::new();
        let mut power = PowerController::new(MockConverter::new(&log), MockSleeper::new(&log));

        power.enter_deep_sleep(0);

        assert_eq!(power.sleeper().sleeps, 0);
        assert_eq!(log.events().as_slice(), &[Event::ConverterOff, Event::ConverterOn]);
    }

    #[test]
    fn test_converter_gating_is_idempotent() {
        let log = EventLog::new();
        let mut power = PowerController::new(MockConverter::new(&log), MockSleeper::new(&log));

        power.disable_converter();
        power.disable_converter();
        assert!(!power.converter_enabled());
        power.enable_converter();
        power.enable_converter();
        assert!(power.converter_enabled());
    }

    #[test]
    fn test_rail_follows_power_calls() {
        let mut rail = PeripheralRail::new(MockRail::new());
        assert!(!rail.is_powered());

        rail.power_on();
        assert!(rail.is_powered());
        assert!(rail.pin().high);

        rail.power_off();
        assert!(!rail.is_powered());
        assert!(!rail.pin().high);
        assert_eq!(rail.pin().switches, 2);
    }
}
