//! Radio transport
//!
//! The radio is a black box that takes a byte slice and reports when it has
//! physically left the antenna. Nothing is acknowledged or retried.

use embedded_hal::digital::OutputPin;

use crate::config::{RADIO_TX_PIN, TX_BIT_RATE, TX_PTT_INVERTED};
use crate::error::Result;
use crate::message::Readings;

/// Byte-level broadcaster
pub trait Transport {
    /// Queues `payload` for transmission
    fn send(&mut self, payload: &[u8]) -> Result<()>;

    /// Blocks until the last queued payload has been transmitted
    fn wait_complete(&mut self);
}

/// Radio settings applied once during setup
/// tx_pin: Data output pin
/// ptt_inverted: Push-to-talk is active low when set
/// bit_rate: Line rate in bit/s
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransportConfig {
    pub tx_pin: u8,
    pub ptt_inverted: bool,
    pub bit_rate: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            tx_pin: RADIO_TX_PIN,
            ptt_inverted: TX_PTT_INVERTED,
            bit_rate: TX_BIT_RATE,
        }
    }
}

/// Push-to-talk line of the transmitter
pub struct PttKey<P> {
    pin: P,
    inverted: bool,
}

impl<P: OutputPin> PttKey<P> {
    /// Creates the key and leaves the transmitter released
    pub fn new(pin: P, inverted: bool) -> Self {
        let mut key = Self { pin, inverted };
        key.release();
        key
    }

    /// Turns the transmitter on
    pub fn key(&mut self) {
        if self.drive(true).is_err() {
            log_warn!("radio: failed to key transmitter");
        }
    }

    /// Turns the transmitter off
    pub fn release(&mut self) {
        if self.drive(false).is_err() {
            log_warn!("radio: failed to release transmitter");
        }
    }

    fn drive(&mut self, active: bool) -> core::result::Result<(), P::Error> {
        if active != self.inverted {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        }
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }
}

/// Sends the encoded buffer and waits for the radio to finish
pub fn broadcast<T: Transport>(transport: &mut T, readings: &Readings) {
    let payload = readings.encode();
    if let Err(e) = transport.send(&payload) {
        log_warn!("broadcast dropped: {:?}", e);
    }
    transport.wait_complete();
    log_debug!("broadcast {} bytes", payload.len());
}
