//! Decoding of `tfrec` text output into per-room readings
//!
//! Every line starts with a tag naming the sensor protocol, followed by
//! whitespace separated fields. A typical TFA line looks like
//!
//! ```text
//! TFA1 ID 2d +21.3 52% seq 8 lowbat 0 RSSI 73
//! ```
//!
//! The identifier sits at a configurable offset and the readings follow it.

use log::debug;

use crate::error::{CollectorError, Result};
use crate::models::{Reading, Sample, SensorRegistry};

/// Sensor protocols understood by the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// TFA Dostmann sensors, printed as `TFA` optionally followed by a digit
    Tfa,
    /// Mobile Alerts temperature/humidity sensor
    Whb11,
    /// Mobile Alerts temperature-only sensor
    Whb02,
}

impl Variant {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "WHB11" => Some(Variant::Whb11),
            "WHB02" => Some(Variant::Whb02),
            _ => tag
                .strip_prefix("TFA")
                .filter(|rest| rest.chars().all(|c| c.is_ascii_digit()))
                .map(|_| Variant::Tfa),
        }
    }
}

/// Token positions of one variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    pub id: usize,
    pub temperature: usize,
    pub humidity: Option<usize>,
}

impl FieldLayout {
    /// Temperature and humidity directly follow the identifier
    pub fn with_humidity(id: usize) -> Self {
        FieldLayout {
            id,
            temperature: id + 1,
            humidity: Some(id + 2),
        }
    }

    pub fn temperature_only(id: usize) -> Self {
        FieldLayout {
            id,
            temperature: id + 1,
            humidity: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayouts {
    pub tfa: FieldLayout,
    pub whb11: FieldLayout,
    pub whb02: FieldLayout,
}

impl FieldLayouts {
    pub fn for_variant(&self, variant: Variant) -> &FieldLayout {
        match variant {
            Variant::Tfa => &self.tfa,
            Variant::Whb11 => &self.whb11,
            Variant::Whb02 => &self.whb02,
        }
    }
}

impl Default for FieldLayouts {
    fn default() -> Self {
        FieldLayouts {
            tfa: FieldLayout::with_humidity(2),
            whb11: FieldLayout::with_humidity(2),
            whb02: FieldLayout::temperature_only(2),
        }
    }
}

/// Parse a numeric field, stripping `+`, `%`, a trailing separator comma
/// and reading a decimal comma as a decimal point
pub fn parse_number(token: &str) -> Option<f64> {
    let cleaned = token
        .trim_end_matches(',')
        .trim_start_matches('+')
        .trim_end_matches('%')
        .replace(',', ".");
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Decode one line into a `(room, reading)` pair
///
/// Returns `Ok(None)` for lines that are well formed but not of interest:
/// blank lines, unknown tags and identifiers missing from the registry.
pub fn parse_line<'r>(
    line: &str,
    layouts: &FieldLayouts,
    registry: &'r SensorRegistry,
) -> Result<Option<(&'r str, Reading)>> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let variant = match tokens.first().and_then(|tag| Variant::from_tag(tag)) {
        Some(variant) => variant,
        None => return Ok(None),
    };
    let layout = layouts.for_variant(variant);

    let field = |idx: usize, name: &str| {
        tokens
            .get(idx)
            .copied()
            .ok_or_else(|| CollectorError::malformed(line, format!("missing {} field", name)))
    };
    let number = |idx: usize, name: &str| {
        let token = field(idx, name)?;
        parse_number(token)
            .ok_or_else(|| CollectorError::malformed(line, format!("invalid {} '{}'", name, token)))
    };

    let id = field(layout.id, "identifier")?.trim_end_matches(',');
    let room = match registry.room_for(id) {
        Some(room) => room,
        None => return Ok(None),
    };

    let temperature = number(layout.temperature, "temperature")?;
    let humidity = match layout.humidity {
        Some(idx) => Some(number(idx, "humidity")?),
        None => None,
    };

    Ok(Some((
        room,
        Reading {
            temperature,
            humidity,
        },
    )))
}

/// Apply every decodable line of `output` to `sample`
///
/// Returns the number of readings recorded. Malformed lines are skipped.
pub fn apply_output(
    output: &str,
    layouts: &FieldLayouts,
    registry: &SensorRegistry,
    sample: &mut Sample,
) -> usize {
    let mut recorded = 0;

    for line in output.lines() {
        match parse_line(line, layouts, registry) {
            Ok(Some((room, reading))) => {
                debug!("{} -> {:?}", room, reading);
                sample.record(room, reading);
                recorded += 1;
            }
            Ok(None) => {}
            Err(e) => debug!("Skipping line: {}", e),
        }
    }

    recorded
}
