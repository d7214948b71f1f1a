//! Sensor adapters
//!
//! Turn sampler output and driver readings into the published values.

use embedded_hal::delay::DelayNs;

use crate::config::NodeConfig;
use crate::hal::{AnalogChannel, AnalogInput, Reference, Uptime};
use crate::sampler::Sampler;

/// Calibrated temperature/humidity driver
///
/// On failure a driver returns its own invalid-reading sentinel; adapters pass
/// it through untouched.
pub trait ClimateSensor {
    /// Temperature in degrees Celsius
    fn read_temperature(&mut self) -> f32;

    /// Relative humidity in percent
    fn read_humidity(&mut self) -> f32;

    /// Called after the peripheral rail comes back on. Drivers whose device
    /// loses its configuration without power re-apply it here or on the next
    /// read.
    fn rail_restored(&mut self) {}
}

/// Converts a full-scale fraction of the battery divider to volts
/// param fraction: Sampler mean over full scale
/// param calibration: Empirical divider multiplier
pub fn battery_volts(fraction: f32, calibration: f32) -> f32 {
    fraction * calibration
}

/// Converts a full-scale fraction of the soil probe to the published wetness.
/// The probe reads lower when wetter, so the percentage is inverted.
/// returns: 100 - (fraction * 100)
pub fn soil_wetness(fraction: f32) -> f32 {
    let percent = fraction * 100.0;
    100.0 - percent
}

/// Measures battery voltage against the internal reference
/// param input: Analog input
/// param sampler: Averaging sampler
/// param delay: Delay for reference settling and sampling
/// param config: Node tunables
/// returns: Battery voltage in volts
pub fn measure_battery<A, D>(
    input: &mut A,
    sampler: &Sampler,
    delay: &mut D,
    config: &NodeConfig,
) -> f32
where
    A: AnalogInput,
    D: DelayNs,
{
    input.set_reference(Reference::Internal);
    delay.delay_ms(config.reference_settle_ms);
    let fraction = sampler.measure_fraction(input, AnalogChannel::Battery, delay);
    input.set_reference(Reference::Default);
    battery_volts(fraction, config.battery_calibration)
}

/// Measures soil humidity
/// returns: Wetness in percent, 100 being fully wet
pub fn measure_soil<A, D>(input: &mut A, sampler: &Sampler, delay: &mut D) -> f32
where
    A: AnalogInput,
    D: DelayNs,
{
    soil_wetness(sampler.measure_fraction(input, AnalogChannel::Soil, delay))
}

/// Reads temperature then humidity as one paired operation
/// returns: (temperature, humidity)
pub fn measure_climate<T: ClimateSensor>(sensor: &mut T) -> (f32, f32) {
    let temperature = sensor.read_temperature();
    let humidity = sensor.read_humidity();
    (temperature, humidity)
}

/// Whole seconds since boot
pub fn elapsed_seconds<U: Uptime>(clock: &U) -> f32 {
    (clock.uptime_ms() / 1000) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BATTERY_CALIBRATION;
    use crate::mock::{MockAnalog, MockClimate, MockClock, MockDelay};

    const EPSILON: f32 = 1e-4;

    #[test]
    fn test_soil_inversion() {
        assert!((soil_wetness(0.30) - 70.0).abs() < EPSILON);
        assert_eq!(soil_wetness(1.0), 0.0);
        assert_eq!(soil_wetness(0.0), 100.0);
    }

    #[test]
    fn test_battery_scaling() {
        let volts = battery_volts(0.5, BATTERY_CALIBRATION);
        assert!((volts - 0.5 * BATTERY_CALIBRATION).abs() < EPSILON);
        assert_eq!(battery_volts(0.0, BATTERY_CALIBRATION), 0.0);
    }

    #[test]
    fn test_battery_switches_reference_and_restores_it() {
        let mut adc = MockAnalog::new(1000);
        adc.push_battery(&[500; 10]);
        let mut delay = MockDelay::new();
        let config = NodeConfig::default();

        let volts = measure_battery(&mut adc, &Sampler::default(), &mut delay, &config);

        assert!((volts - 0.5 * BATTERY_CALIBRATION).abs() < EPSILON);
        assert_eq!(adc.references().as_slice(), &[Reference::Internal, Reference::Default]);
        assert_eq!(adc.reference(), Reference::Default);
        // reference settle plus ten sampling pauses
        assert_eq!(delay.elapsed_ms(), 15 + 10 * 15);
    }

    #[test]
    fn test_full_lipo_reads_as_its_voltage() {
        // 4.2 V on VSYS, a third of it on the pin, 12-bit counts of 3.3 V
        let mut adc = MockAnalog::new(4095);
        adc.push_battery(&[1737; 10]);
        let mut delay = MockDelay::new();
        let config = NodeConfig::default();

        let volts = measure_battery(&mut adc, &Sampler::default(), &mut delay, &config);

        assert!((volts - 4.2).abs() < 0.01);
    }

    #[test]
    fn test_battery_samples_only_under_internal_reference() {
        let mut adc = MockAnalog::new(1000);
        adc.push_battery(&[250; 10]);
        let mut delay = MockDelay::new();
        let config = NodeConfig::default();

        measure_battery(&mut adc, &Sampler::default(), &mut delay, &config);

        assert_eq!(adc.reads_under(Reference::Internal), 10);
        assert_eq!(adc.reads_under(Reference::Default), 0);
    }

    #[test]
    fn test_soil_reading_from_raw_counts() {
        let mut adc = MockAnalog::new(1000);
        adc.push_soil(&[300; 10]);
        let mut delay = MockDelay::new();

        let wetness = measure_soil(&mut adc, &Sampler::default(), &mut delay);

        assert!((wetness - 70.0).abs() < EPSILON);
        assert_eq!(adc.reference(), Reference::Default);
    }

    #[test]
    fn test_climate_passes_sentinel_through() {
        let mut sensor = MockClimate::new(f32::NAN, 55.0);

        let (temperature, humidity) = measure_climate(&mut sensor);

        assert!(temperature.is_nan());
        assert_eq!(humidity, 55.0);
        assert_eq!(sensor.reads, 2);
    }

    #[test]
    fn test_elapsed_seconds_truncates() {
        assert_eq!(elapsed_seconds(&MockClock::new(0)), 0.0);
        assert_eq!(elapsed_seconds(&MockClock::new(1_999)), 1.0);
        assert_eq!(elapsed_seconds(&MockClock::new(72_500)), 72.0);
    }
}
