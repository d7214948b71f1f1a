//! Compile-time hardware configuration and cycle tunables
//!
//! Pin numbers refer to RP2040 GPIOs on the Raspberry Pi Pico.

use crate::scheduler::WakeInterval;

pub const RAIL_POWER_PIN: u8 = 3; // Switches the sensor/radio supply rail
pub const RADIO_TX_PIN: u8 = 0; // UART0 TX into the 433MHz transmitter
pub const RADIO_PTT_PIN: u8 = 2; // Transmitter push-to-talk
pub const SOIL_ANALOG_PIN: u8 = 26; // ADC0
pub const BATTERY_ANALOG_PIN: u8 = 29; // ADC3, VSYS/3 on the Pico
pub const SENSOR_SDA_PIN: u8 = 8;
pub const SENSOR_SCL_PIN: u8 = 9;

pub const TX_BIT_RATE: u32 = 4000; // bit/s
pub const TX_PTT_INVERTED: bool = true;

pub const SAMPLING_RATE: u8 = 10;
pub const SAMPLE_DELAY_MS: u32 = 15;
pub const REFERENCE_SETTLE_MS: u32 = 15;
pub const WAKE_SETTLE_MS: u32 = 2500; // lets the freshly powered rail stabilise
pub const SETUP_SETTLE_MS: u32 = 50;

/// Value of a reading that has not been measured yet
pub const UNMEASURED: f32 = -1.0;

pub const VSYS_DIVIDER: f32 = 3.0; // R5/R6 on the Pico feeding GPIO29
pub const ADC_VREF_VOLTS: f32 = 3.3;

/// Full-scale fraction to volts for the battery channel.
/// Belongs to the board's divider and reference; measure it again when either
/// changes.
pub const BATTERY_CALIBRATION: f32 = VSYS_DIVIDER * ADC_VREF_VOLTS;

pub const SLEEP_ITERATIONS: u8 = 9; // 9 x 8s, roughly 72 seconds of doze
pub const WAKE_INTERVAL_INDEX: u8 = 9;

/// NodeConfig collects the tunables of one measure/transmit/doze cycle.
/// sampling_rate: Raw analog reads averaged per measurement
/// sample_delay_ms: Settle time between two raw reads
/// reference_settle_ms: Settle time after switching the analog reference
/// wake_settle_ms: Settle time between waking and the first measurement
/// sleep_iterations: Wake timer periods spent in power-down per cycle
/// wake_interval: Period of the wake timer
/// battery_calibration: Multiplier from full-scale fraction to volts
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NodeConfig {
    pub sampling_rate: u8,
    pub sample_delay_ms: u32,
    pub reference_settle_ms: u32,
    pub wake_settle_ms: u32,
    pub sleep_iterations: u8,
    pub wake_interval: WakeInterval,
    pub battery_calibration: f32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            sampling_rate: SAMPLING_RATE,
            sample_delay_ms: SAMPLE_DELAY_MS,
            reference_settle_ms: REFERENCE_SETTLE_MS,
            wake_settle_ms: WAKE_SETTLE_MS,
            sleep_iterations: SLEEP_ITERATIONS,
            wake_interval: WakeInterval::from_index(WAKE_INTERVAL_INDEX),
            battery_calibration: BATTERY_CALIBRATION,
        }
    }
}

impl NodeConfig {
    /// Nominal time spent in power-down per cycle
    /// returns: sleep_iterations x wake interval, in milliseconds
    pub fn doze_millis(&self) -> u32 {
        u32::from(self.sleep_iterations) * self.wake_interval.millis()
    }
}
