//! RP2040 (Raspberry Pi Pico) implementations of the hardware capabilities

use core::cell::RefCell;

use bme680::{Bme680, FieldData, PowerMode, Settings};
use critical_section::Mutex;
use embedded_hal::digital::OutputPin;
use embedded_hal_0_2::adc::OneShot;
use i2c_pio::I2C;
use rp_pico::hal::adc::Adc;
use rp_pico::hal::fugit::ExtU32;
use rp_pico::hal::gpio::bank0::{Gpio8, Gpio9};
use rp_pico::hal::gpio::{FunctionNull, Pin, PullDown};
use rp_pico::hal::pac;
use rp_pico::hal::pio::SM0;
use rp_pico::hal::timer::{Alarm, Alarm0};
use rp_pico::hal::uart::{Enabled, UartDevice, UartPeripheral, ValidUartPinout};
use rp_pico::hal::Timer;
use rp_pico::pac::PIO0;

use crate::error::{NodeError, Result};
use crate::hal::{
    AnalogChannel, AnalogInput, ConverterControl, PowerDown, Reference, Uptime, WakeTimer,
};
use crate::scheduler::{WakeInterval, WakeSignal};
use crate::sensors::ClimateSensor;
use crate::transport::{PttKey, Transport};

/// 12-bit SAR converter
const ADC_FULL_SCALE: u16 = 4095;

pub type Bme<'a> = Bme680<
    I2C<'a, PIO0, SM0, Pin<Gpio8, FunctionNull, PullDown>, Pin<Gpio9, FunctionNull, PullDown>>,
    Timer,
>;

/// Alarm driving the wake interrupt, with its period in microseconds
static WAKE_ALARM: Mutex<RefCell<Option<(Alarm0, u32)>>> = Mutex::new(RefCell::new(None));

/// Soil and battery channels on the on-chip ADC
pub struct BoardAnalog<S, B> {
    adc: Adc,
    soil: S,
    battery: B,
    reference: Reference,
}

impl<S, B> BoardAnalog<S, B> {
    pub fn new(adc: Adc, soil: S, battery: B) -> Self {
        Self {
            adc,
            soil,
            battery,
            reference: Reference::Default,
        }
    }
}

impl<S, B> AnalogInput for BoardAnalog<S, B>
where
    Adc: OneShot<Adc, u16, S> + OneShot<Adc, u16, B>,
{
    fn read_raw(&mut self, channel: AnalogChannel) -> u16 {
        // Conversions block until ready; an error reads as zero
        match channel {
            AnalogChannel::Soil => {
                <Adc as OneShot<Adc, u16, S>>::read(&mut self.adc, &mut self.soil).unwrap_or(0)
            }
            AnalogChannel::Battery => {
                <Adc as OneShot<Adc, u16, B>>::read(&mut self.adc, &mut self.battery).unwrap_or(0)
            }
        }
    }

    fn full_scale(&self) -> u16 {
        ADC_FULL_SCALE
    }

    fn set_reference(&mut self, reference: Reference) {
        // The RP2040 converter always runs off ADC_VREF, which the battery
        // calibration is computed against.
        log_trace!("adc reference {:?} -> {:?}", self.reference, reference);
        self.reference = reference;
    }
}

/// EN bit of the ADC control register
pub struct AdcPowerGate;

fn adc_registers() -> &'static pac::adc::RegisterBlock {
    // SAFETY: only the EN bit of CS is touched here, always from thread mode,
    // and never while a conversion started by `BoardAnalog` is in flight.
    unsafe { &*pac::ADC::ptr() }
}

impl ConverterControl for AdcPowerGate {
    fn enable(&mut self) {
        adc_registers().cs().modify(|_, w| w.en().set_bit());
    }

    fn disable(&mut self) {
        adc_registers().cs().modify(|_, w| w.en().clear_bit());
    }

    fn is_enabled(&self) -> bool {
        adc_registers().cs().read().en().bit_is_set()
    }
}

/// Waits for the next interrupt with the core clock stopped
pub struct WfiSleeper;

impl PowerDown for WfiSleeper {
    fn power_down(&mut self) {
        // The wake alarm is the only unmasked interrupt
        cortex_m::asm::wfi();
    }
}

/// Alarm 0 of the system timer, re-armed from its own interrupt
pub struct AlarmWakeTimer {
    alarm: Option<Alarm0>,
}

impl AlarmWakeTimer {
    pub fn new(alarm: Alarm0) -> Self {
        Self { alarm: Some(alarm) }
    }
}

impl WakeTimer for AlarmWakeTimer {
    fn start(&mut self, interval: WakeInterval) -> Result<()> {
        let mut alarm = self.alarm.take().ok_or(NodeError::WakeTimer)?;
        let period_us = interval.millis() * 1_000;
        alarm
            .schedule(period_us.micros())
            .map_err(|_| NodeError::WakeTimer)?;
        alarm.enable_interrupt();
        critical_section::with(|cs| WAKE_ALARM.borrow_ref_mut(cs).replace((alarm, period_us)));
        // SAFETY: the handler only touches WAKE_ALARM inside a critical section
        unsafe { cortex_m::peripheral::NVIC::unmask(pac::Interrupt::TIMER_IRQ_0) };
        Ok(())
    }
}

/// Body of the TIMER_IRQ_0 handler: acknowledge, re-arm, raise the wake.
pub fn on_wake_alarm(wake: &WakeSignal) {
    critical_section::with(|cs| {
        if let Some((alarm, period_us)) = WAKE_ALARM.borrow_ref_mut(cs).as_mut() {
            alarm.clear_interrupt();
            let _ = alarm.schedule(period_us.micros());
        }
    });
    wake.signal();
}

impl Uptime for Timer {
    fn uptime_ms(&self) -> u64 {
        self.get_counter().ticks() / 1_000
    }
}

/// BME680 in forced mode.
///
/// `read_temperature` triggers a measurement; `read_humidity` reuses it. A
/// failed measurement reads as NaN. The sensor forgets its oversampling and
/// filter settings whenever the rail drops, so they are written again before
/// the first measurement after power returns.
pub struct Bme680Climate<'a> {
    bme: Bme<'a>,
    delayer: Timer,
    settings: Settings,
    configured: bool,
    last: Option<FieldData>,
}

impl<'a> Bme680Climate<'a> {
    pub fn new(bme: Bme<'a>, delayer: Timer, settings: Settings) -> Self {
        Self {
            bme,
            delayer,
            settings,
            configured: false,
            last: None,
        }
    }

    /// Applies the settings if needed, sets the sensor's mode to Forced and
    /// fetches one set of field data
    fn sample(&mut self) -> Option<FieldData> {
        if !self.configured {
            self.bme
                .set_sensor_settings(&mut self.delayer, self.settings.clone())
                .ok()?;
            self.configured = true;
        }
        self.bme
            .set_sensor_mode(&mut self.delayer, PowerMode::ForcedMode)
            .ok()?;
        self.bme
            .get_sensor_data(&mut self.delayer)
            .ok()
            .map(|(data, _condition)| data)
    }
}

impl ClimateSensor for Bme680Climate<'_> {
    fn read_temperature(&mut self) -> f32 {
        self.last = self.sample();
        self.last
            .as_ref()
            .map_or(f32::NAN, |data| data.temperature_celsius())
    }

    fn read_humidity(&mut self) -> f32 {
        let data = match self.last.take() {
            Some(data) => Some(data),
            None => self.sample(),
        };
        data.as_ref().map_or(f32::NAN, |data| data.humidity_percent())
    }

    fn rail_restored(&mut self) {
        self.configured = false;
        self.last = None;
    }
}

/// UART-fed 433MHz transmitter with a push-to-talk line
pub struct UartRadio<D, P, T>
where
    D: UartDevice,
    P: ValidUartPinout<D>,
{
    uart: UartPeripheral<Enabled, D, P>,
    ptt: PttKey<T>,
}

impl<D, P, T> UartRadio<D, P, T>
where
    D: UartDevice,
    P: ValidUartPinout<D>,
    T: OutputPin,
{
    pub fn new(uart: UartPeripheral<Enabled, D, P>, ptt: PttKey<T>) -> Self {
        Self { uart, ptt }
    }
}

impl<D, P, T> Transport for UartRadio<D, P, T>
where
    D: UartDevice,
    P: ValidUartPinout<D>,
    T: OutputPin,
{
    fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.ptt.key();
        self.uart.write_full_blocking(payload);
        Ok(())
    }

    fn wait_complete(&mut self) {
        while self.uart.transmit_flushed().is_err() {}
        self.ptt.release();
    }
}
