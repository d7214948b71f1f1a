//! Message buffer
//!
//! The full payload of one wake cycle: one reading per [`ReadingKind`], kept in
//! code order and serialized as packed `{code: u8, value: f32 LE}` records.

use crate::config::UNMEASURED;

/// Number of readings in one payload
pub const READING_COUNT: usize = 5;

/// Size of one serialized reading
pub const RECORD_LEN: usize = 1 + core::mem::size_of::<f32>();

/// Size of one serialized payload
pub const PAYLOAD_LEN: usize = READING_COUNT * RECORD_LEN;

/// Measurement kinds, with their stable wire codes
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ReadingKind {
    /// Volts
    Battery = 0,
    /// Percent wetness
    SoilHumidity = 1,
    /// Degrees Celsius
    Temperature = 2,
    /// Percent relative humidity
    Humidity = 3,
    /// Whole seconds since boot
    Uptime = 4,
}

impl ReadingKind {
    /// Every kind, in publication order
    pub const ALL: [ReadingKind; READING_COUNT] = [
        ReadingKind::Battery,
        ReadingKind::SoilHumidity,
        ReadingKind::Temperature,
        ReadingKind::Humidity,
        ReadingKind::Uptime,
    ];

    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(usize::from(code)).copied()
    }

    pub const fn name(self) -> &'static str {
        match self {
            ReadingKind::Battery => "battery",
            ReadingKind::SoilHumidity => "soil_humidity",
            ReadingKind::Temperature => "temperature",
            ReadingKind::Humidity => "humidity",
            ReadingKind::Uptime => "time",
        }
    }
}

/// One tagged measurement
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reading {
    pub code: u8,
    pub value: f32,
}

impl Reading {
    pub const fn unmeasured(kind: ReadingKind) -> Self {
        Self {
            code: kind.code(),
            value: UNMEASURED,
        }
    }

    pub fn is_measured(&self) -> bool {
        // NaN from a failed driver read still counts as measured
        self.value != UNMEASURED
    }

    fn write_to(&self, record: &mut [u8]) {
        record[0] = self.code;
        record[1..RECORD_LEN].copy_from_slice(&self.value.to_le_bytes());
    }
}

/// Fixed set of readings for one cycle, slot index == code
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Readings {
    slots: [Reading; READING_COUNT],
}

impl Default for Readings {
    fn default() -> Self {
        Self::new()
    }
}

impl Readings {
    /// Assigns the five codes in order, every value unmeasured
    pub const fn new() -> Self {
        Self {
            slots: [
                Reading::unmeasured(ReadingKind::Battery),
                Reading::unmeasured(ReadingKind::SoilHumidity),
                Reading::unmeasured(ReadingKind::Temperature),
                Reading::unmeasured(ReadingKind::Humidity),
                Reading::unmeasured(ReadingKind::Uptime),
            ],
        }
    }

    pub fn set(&mut self, kind: ReadingKind, value: f32) {
        self.slots[usize::from(kind.code())].value = value;
    }

    pub fn get(&self, kind: ReadingKind) -> f32 {
        self.slots[usize::from(kind.code())].value
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reading> + '_ {
        self.slots.iter()
    }

    pub fn all_measured(&self) -> bool {
        self.slots.iter().all(Reading::is_measured)
    }

    /// Serializes the buffer into the radio payload
    /// returns: 25 bytes, five `{code, f32 LE}` records in code order
    pub fn encode(&self) -> [u8; PAYLOAD_LEN] {
        let mut payload = [0u8; PAYLOAD_LEN];
        for (record, reading) in payload.chunks_exact_mut(RECORD_LEN).zip(self.slots.iter()) {
            reading.write_to(record);
        }
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_assigns_distinct_codes_and_sentinel() {
        let readings = Readings::new();
        let codes: Vec<u8> = readings.iter().map(|r| r.code).collect();

        assert_eq!(codes, vec![0, 1, 2, 3, 4]);
        assert!(readings.iter().all(|r| r.value == -1.0));
        assert!(!readings.all_measured());
    }

    #[test]
    fn test_set_overwrites_only_its_slot() {
        let mut readings = Readings::new();
        readings.set(ReadingKind::Temperature, 21.5);

        assert_eq!(readings.get(ReadingKind::Temperature), 21.5);
        assert_eq!(readings.get(ReadingKind::Battery), UNMEASURED);
        assert_eq!(readings.get(ReadingKind::Uptime), UNMEASURED);
    }

    #[test]
    fn test_codes_follow_publication_order() {
        for (index, kind) in ReadingKind::ALL.iter().enumerate() {
            assert_eq!(usize::from(kind.code()), index);
            assert_eq!(ReadingKind::from_code(kind.code()), Some(*kind));
        }
        assert_eq!(ReadingKind::from_code(5), None);
    }

    #[test]
    fn test_encode_layout() {
        let mut readings = Readings::new();
        readings.set(ReadingKind::Battery, 3.7);
        readings.set(ReadingKind::SoilHumidity, 70.0);
        readings.set(ReadingKind::Temperature, 21.0);
        readings.set(ReadingKind::Humidity, 48.0);
        readings.set(ReadingKind::Uptime, 75.0);

        let payload = readings.encode();

        assert_eq!(payload.len(), 25);
        assert_eq!(payload[0], 0);
        assert_eq!(&payload[1..5], &3.7f32.to_le_bytes());
        assert_eq!(payload[5], 1);
        assert_eq!(&payload[6..10], &70.0f32.to_le_bytes());
        assert_eq!(payload[20], 4);
        assert_eq!(&payload[21..25], &75.0f32.to_le_bytes());
    }

    #[test]
    fn test_encode_unmeasured_buffer_carries_sentinel() {
        let payload = Readings::new().encode();
        for record in payload.chunks_exact(RECORD_LEN) {
            assert_eq!(&record[1..], &(-1.0f32).to_le_bytes());
        }
    }

    #[test]
    fn test_nan_counts_as_measured() {
        let mut readings = Readings::new();
        for kind in ReadingKind::ALL {
            readings.set(kind, f32::NAN);
        }
        assert!(readings.all_measured());
    }
}
