#![cfg_attr(not(test), no_std)]

//! # soil-node
//! ## A duty-cycled soil and climate sensor node in Rust
//!
//! Features:
//! - Timer-driven wake scheduling with coalesced wake events
//! - Peripheral rail and ADC power sequencing around every measurement
//! - Battery voltage, soil moisture, temperature, humidity and uptime readings
//! - Fixed 25 byte fire-and-forget radio payload
//! - Bounded multi-iteration deep sleep between cycles

#[macro_use]
pub mod logging;

pub mod config;
pub mod cycle;
pub mod error;
pub mod hal;
pub mod message;
pub mod power;
pub mod sampler;
pub mod scheduler;
pub mod sensors;
pub mod transport;

#[cfg(feature = "rp2040")]
pub mod board;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use config::NodeConfig;
pub use cycle::{CycleState, SensorNode};
pub use error::{NodeError, Result};
pub use message::{Reading, ReadingKind, Readings, PAYLOAD_LEN};
pub use scheduler::{WakeInterval, WakeScheduler, WakeSignal};
