//! Wake, measure, transmit, doze
//!
//! [`SensorNode`] owns the message buffer and every peripheral the cycle
//! touches, and borrows the [`WakeSignal`] the timer interrupt raises.
//!
//! ```text
//!            wake taken
//! Sleeping ─────────────▶ Measuring
//!    ▲                        │ all five readings fresh
//!    │ rail restored          ▼
//!    └───────────────── Transmitting
//!      rail off, deep sleep
//! ```

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::config::{NodeConfig, SETUP_SETTLE_MS};
use crate::hal::{AnalogInput, ConverterControl, PowerDown, Uptime};
use crate::message::{ReadingKind, Readings};
use crate::power::{PeripheralRail, PowerController};
use crate::sampler::Sampler;
use crate::scheduler::WakeSignal;
use crate::sensors::{self, ClimateSensor};
use crate::transport::{self, Transport};

/// Where the node is in its duty cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CycleState {
    Sleeping,
    Measuring,
    Transmitting,
}

/// Peripherals handed to the node at startup
/// analog: Soil and battery converter channels
/// converter: Converter power gate
/// sleeper: Power-down entry
/// climate: Temperature/humidity driver
/// radio: Broadcast transport, already configured
/// clock: Uptime source
/// rail: Peripheral supply switch, usually already powered by board setup
/// delay: Blocking delay
pub struct NodeParts<A, C, S, T, R, U, P, D> {
    pub analog: A,
    pub converter: C,
    pub sleeper: S,
    pub climate: T,
    pub radio: R,
    pub clock: U,
    pub rail: PeripheralRail<P>,
    pub delay: D,
}

/// The duty-cycle state machine
pub struct SensorNode<'w, A, C, S, T, R, U, P, D> {
    wake: &'w WakeSignal,
    state: CycleState,
    readings: Readings,
    config: NodeConfig,
    sampler: Sampler,
    power: PowerController<C, S>,
    rail: PeripheralRail<P>,
    analog: A,
    climate: T,
    radio: R,
    clock: U,
    delay: D,
    cycles: u32,
}

impl<'w, A, C, S, T, R, U, P, D> SensorNode<'w, A, C, S, T, R, U, P, D>
where
    A: AnalogInput,
    C: ConverterControl,
    S: PowerDown,
    T: ClimateSensor,
    R: Transport,
    U: Uptime,
    P: OutputPin,
    D: DelayNs,
{
    /// Initialises the message buffer. A rail handed over unpowered is switched
    /// on and given time to settle. The node starts in `Sleeping`.
    pub fn new(
        wake: &'w WakeSignal,
        parts: NodeParts<A, C, S, T, R, U, P, D>,
        config: NodeConfig,
    ) -> Self {
        let settle = !parts.rail.is_powered();

        let mut node = Self {
            wake,
            state: CycleState::Sleeping,
            readings: Readings::new(),
            config,
            sampler: Sampler::new(config.sampling_rate, config.sample_delay_ms),
            power: PowerController::new(parts.converter, parts.sleeper),
            rail: parts.rail,
            analog: parts.analog,
            climate: parts.climate,
            radio: parts.radio,
            clock: parts.clock,
            delay: parts.delay,
            cycles: 0,
        };
        if settle {
            node.rail.power_on();
            node.delay.delay_ms(SETUP_SETTLE_MS);
        }
        log_info!("node ready, doze per cycle {} ms", config.doze_millis());
        node
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn readings(&self) -> &Readings {
        &self.readings
    }

    /// Number of completed cycles since boot
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn power(&self) -> &PowerController<C, S> {
        &self.power
    }

    pub fn rail(&self) -> &PeripheralRail<P> {
        &self.rail
    }

    pub fn climate(&self) -> &T {
        &self.climate
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn clock(&self) -> &U {
        &self.clock
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }

    /// Runs one full cycle if a wake is pending
    /// returns: whether a cycle ran
    pub fn poll(&mut self) -> bool {
        if self.state != CycleState::Sleeping || !self.wake.take() {
            return false;
        }

        self.state = CycleState::Measuring;
        log_debug!("wake, cycle {}", self.cycles.wrapping_add(1));
        self.delay.delay_ms(self.config.wake_settle_ms);
        self.measure();

        self.state = CycleState::Transmitting;
        transport::broadcast(&mut self.radio, &self.readings);
        self.rail.power_off();

        log_debug!("dozing for ~{} ms", self.config.doze_millis());
        self.power.enter_deep_sleep(self.config.sleep_iterations);
        self.rail.power_on();
        self.climate.rail_restored();

        self.cycles = self.cycles.wrapping_add(1);
        self.state = CycleState::Sleeping;
        true
    }

    /// Cycles forever
    pub fn run(&mut self) -> ! {
        loop {
            self.poll();
        }
    }

    /// Refreshes every reading: battery, soil, climate pair, uptime
    fn measure(&mut self) {
        let battery = sensors::measure_battery(
            &mut self.analog,
            &self.sampler,
            &mut self.delay,
            &self.config,
        );
        self.readings.set(ReadingKind::Battery, battery);

        let soil = sensors::measure_soil(&mut self.analog, &self.sampler, &mut self.delay);
        self.readings.set(ReadingKind::SoilHumidity, soil);

        let (temperature, humidity) = sensors::measure_climate(&mut self.climate);
        self.readings.set(ReadingKind::Temperature, temperature);
        self.readings.set(ReadingKind::Humidity, humidity);

        self.readings
            .set(ReadingKind::Uptime, sensors::elapsed_seconds(&self.clock));

        for kind in ReadingKind::ALL {
            log_info!("{}: {}", kind.name(), self.readings.get(kind));
        }
    }
}
