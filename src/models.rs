use std::collections::{BTreeMap, BTreeSet, HashMap};
use time::OffsetDateTime;

use crate::error::{CollectorError, Result};

/// Fixed mapping of sensor identifier to room name
///
/// Identifiers are stored lower-case so lookups ignore the case `tfrec`
/// happens to print them in. Built once from configuration.
#[derive(Debug, Clone, Default)]
pub struct SensorRegistry {
    rooms_by_id: HashMap<String, String>,
}

impl SensorRegistry {
    /// Build a registry, rejecting empty, duplicate identifiers and duplicate rooms
    pub fn new<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut rooms_by_id = HashMap::new();
        let mut rooms = BTreeSet::new();

        for (id, room) in pairs {
            let id = id.as_ref().trim().to_lowercase();
            let room = room.as_ref().trim().to_string();
            if id.is_empty() || room.is_empty() {
                return Err(CollectorError::config(
                    "sensor identifier and room name must not be empty",
                ));
            }
            if !rooms.insert(room.clone()) {
                return Err(CollectorError::config(format!(
                    "room '{}' is assigned to more than one sensor",
                    room
                )));
            }
            if rooms_by_id.insert(id.clone(), room).is_some() {
                return Err(CollectorError::config(format!(
                    "sensor '{}' is configured more than once",
                    id
                )));
            }
        }

        Ok(SensorRegistry { rooms_by_id })
    }

    pub fn room_for(&self, id: &str) -> Option<&str> {
        self.rooms_by_id
            .get(&id.to_lowercase())
            .map(String::as_str)
    }

    /// All rooms expected to report in a cycle
    pub fn rooms(&self) -> BTreeSet<&str> {
        self.rooms_by_id.values().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.rooms_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms_by_id.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.rooms_by_id
            .iter()
            .map(|(id, room)| (id.as_str(), room.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub temperature: f64,
    /// Absent for temperature-only sensors
    pub humidity: Option<f64>,
}

/// Readings captured during one cycle, keyed by room
#[derive(Debug, Clone, Default)]
pub struct Sample {
    readings: BTreeMap<String, Reading>,
}

impl Sample {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a reading; a later reading for the same room replaces the earlier one
    pub fn record(&mut self, room: &str, reading: Reading) {
        self.readings.insert(room.to_string(), reading);
    }

    pub fn get(&self, room: &str) -> Option<&Reading> {
        self.readings.get(room)
    }

    pub fn rooms(&self) -> BTreeSet<&str> {
        self.readings.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Rooms in alphabetical order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Reading)> {
        self.readings.iter().map(|(room, r)| (room.as_str(), r))
    }
}

/// One row for the time-series store
#[derive(Debug, Clone, PartialEq)]
pub struct ClimateRecord {
    pub measurement: String,
    pub room: String,
    pub time: OffsetDateTime,
    pub temperature: f64,
    pub humidity: Option<f64>,
}

impl ClimateRecord {
    /// One record per room, all sharing the same timestamp
    pub fn from_sample(sample: &Sample, measurement: &str, time: OffsetDateTime) -> Vec<Self> {
        sample
            .iter()
            .map(|(room, reading)| ClimateRecord {
                measurement: measurement.to_string(),
                room: room.to_string(),
                time,
                temperature: reading.temperature,
                humidity: reading.humidity,
            })
            .collect()
    }
}
