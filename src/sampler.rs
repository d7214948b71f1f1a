//! Averaging sampler for the analog channels

use embedded_hal::delay::DelayNs;

use crate::config::{SAMPLE_DELAY_MS, SAMPLING_RATE};
use crate::hal::{AnalogChannel, AnalogInput};

/// Reads a channel repeatedly and reports the mean of the raw values
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sampler {
    rate: u8,
    delay_ms: u32,
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new(SAMPLING_RATE, SAMPLE_DELAY_MS)
    }
}

impl Sampler {
    /// param rate: Raw reads per measurement, at least one read is always taken
    /// param delay_ms: Pause after each raw read
    pub fn new(rate: u8, delay_ms: u32) -> Self {
        Self {
            rate: rate.max(1),
            delay_ms,
        }
    }

    pub fn rate(&self) -> u8 {
        self.rate
    }

    /// Measures a channel
    /// param input: Converter to read from
    /// param channel: Channel to read
    /// param delay: Delay provider for the settle time between reads
    /// returns: Arithmetic mean of the raw reads, in raw converter units
    pub fn measure<A, D>(&self, input: &mut A, channel: AnalogChannel, delay: &mut D) -> f32
    where
        A: AnalogInput,
        D: DelayNs,
    {
        let mut sum: f32 = 0.0;
        for _ in 0..self.rate {
            sum += f32::from(input.read_raw(channel));
            delay.delay_ms(self.delay_ms);
        }
        sum / f32::from(self.rate)
    }

    /// Same as `measure`, scaled to a fraction of the converter's full scale
    pub fn measure_fraction<A, D>(
        &self,
        input: &mut A,
        channel: AnalogChannel,
        delay: &mut D,
    ) -> f32
    where
        A: AnalogInput,
        D: DelayNs,
    {
        self.measure(input, channel, delay) / f32::from(input.full_scale())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockAnalog, MockDelay};

    #[test]
    fn test_constant_input_returns_that_value() {
        let mut adc = MockAnalog::new(1023);
        adc.push_soil(&[612; 10]);
        let mut delay = MockDelay::new();

        let mean = Sampler::default().measure(&mut adc, AnalogChannel::Soil, &mut delay);

        assert_eq!(mean, 612.0);
    }

    #[test]
    fn test_alternating_input_returns_mean() {
        let mut adc = MockAnalog::new(1023);
        adc.push_battery(&[100, 301, 100, 301, 100, 301, 100, 301, 100, 301]);
        let mut delay = MockDelay::new();

        let mean = Sampler::default().measure(&mut adc, AnalogChannel::Battery, &mut delay);

        assert!((mean - 200.5).abs() < 1e-4);
    }

    #[test]
    fn test_reads_rate_times_with_settle_delay() {
        let mut adc = MockAnalog::new(1023);
        adc.push_soil(&[1, 2, 3, 4]);
        let mut delay = MockDelay::new();

        let sampler = Sampler::new(4, 15);
        let mean = sampler.measure(&mut adc, AnalogChannel::Soil, &mut delay);

        assert_eq!(mean, 2.5);
        assert_eq!(adc.reads(AnalogChannel::Soil), 4);
        assert_eq!(adc.reads(AnalogChannel::Battery), 0);
        assert_eq!(delay.elapsed_ms(), 60);
    }

    #[test]
    fn test_zero_rate_takes_one_read() {
        let mut adc = MockAnalog::new(1023);
        adc.push_soil(&[40]);
        let mut delay = MockDelay::new();

        let sampler = Sampler::new(0, 15);
        assert_eq!(sampler.rate(), 1);
        assert_eq!(sampler.measure(&mut adc, AnalogChannel::Soil, &mut delay), 40.0);
    }

    #[test]
    fn test_fraction_of_full_scale() {
        let mut adc = MockAnalog::new(4095);
        adc.push_soil(&[4095; 10]);
        let mut delay = MockDelay::new();

        let sampler = Sampler::default();
        let fraction = sampler.measure_fraction(&mut adc, AnalogChannel::Soil, &mut delay);

        assert!((fraction - 1.0).abs() < 1e-6);
    }
}
