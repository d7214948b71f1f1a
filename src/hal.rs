//! Hardware capabilities consumed by the duty cycle
//!
//! Each trait covers one piece of register-level behaviour so the cycle can run
//! against the RP2040 implementation in `board` or the doubles in `mock`.

use crate::error::Result;
use crate::scheduler::WakeInterval;

/// Analog inputs wired to the node
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AnalogChannel {
    Soil,
    Battery,
}

/// Analog reference selection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reference {
    /// Supply referenced, used for the soil probe
    Default,
    /// Internal low-voltage reference, used for the battery divider
    Internal,
}

/// One-shot analog conversions
pub trait AnalogInput {
    /// Performs a single blocking conversion on `channel`
    fn read_raw(&mut self, channel: AnalogChannel) -> u16;

    /// Raw value corresponding to a full-scale input
    fn full_scale(&self) -> u16;

    /// Switches the conversion reference. Callers wait for it to settle.
    fn set_reference(&mut self, reference: Reference);
}

/// Power gate of the conversion hardware
///
/// Both operations are idempotent and take effect immediately.
pub trait ConverterControl {
    fn enable(&mut self);
    fn disable(&mut self);
    fn is_enabled(&self) -> bool;
}

/// Lowest-power sleep state of the core
pub trait PowerDown {
    /// Enters power-down and returns once the wake timer interrupt has fired
    fn power_down(&mut self);
}

/// Countdown timer that raises the wake interrupt
pub trait WakeTimer {
    /// Starts the periodic countdown. Called once per boot.
    fn start(&mut self, interval: WakeInterval) -> Result<()>;
}

impl<T: WakeTimer + ?Sized> WakeTimer for &mut T {
    fn start(&mut self, interval: WakeInterval) -> Result<()> {
        T::start(self, interval)
    }
}

/// Free-running clock started at boot
pub trait Uptime {
    fn uptime_ms(&self) -> u64;
}
