use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::capture::parser::{FieldLayout, FieldLayouts};
use crate::error::{CollectorError, Result};
use crate::models::SensorRegistry;

const DEFAULT_COMMAND: &str = "tfrec";
const DEFAULT_FREQUENCY: &str = "868250";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_COUNTER: u32 = 3;
const DEFAULT_ID_IDX: usize = 2;
const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 300;
const DEFAULT_DB_HOST: &str = "localhost";
const DEFAULT_DB_PORT: u16 = 5432;
const DEFAULT_MEASUREMENT: &str = "climate";

/// Radio and capture parameters handed to `tfrec`
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub command: String,
    pub frequency: String,
    pub gain: Option<String>,
    pub threshold: Option<String>,
    pub decoder: Option<String>,
    pub timeout: Duration,
    pub max_counter: u32,
    pub debug: bool,
    pub layouts: FieldLayouts,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub update_interval: Duration,
    pub database_url: String,
    pub measurement: String,
}

#[derive(Debug, Clone)]
pub struct SensorConfig {
    pub capture: CaptureConfig,
    pub storage: StorageConfig,
    pub sensors: SensorRegistry,
}

impl SensorConfig {
    /// Load configuration from the process environment
    ///
    /// Variables from `env_file` (or `.env` in the working directory when no
    /// file is given) are loaded first; variables already set in the
    /// environment win.
    pub fn new(env_file: Option<&Path>) -> Result<Self> {
        match env_file {
            Some(path) => {
                dotenv::from_path(path).map_err(|e| {
                    CollectorError::config(format!("cannot read {}: {}", path.display(), e))
                })?;
            }
            None => {
                dotenv::dotenv().ok();
            }
        }

        Self::from_vars(&env::vars().collect())
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let sensors = SensorRegistry::new(sensor_pairs(vars)?)?;
        if sensors.is_empty() {
            return Err(CollectorError::config(
                "No sensors configured. Please set SENSORS or SENSOR_<N>_ID/SENSOR_<N>_ROOM environment variables",
            ));
        }

        let max_counter = parse_or(vars, "MAX_COUNTER", DEFAULT_MAX_COUNTER)?;
        if max_counter == 0 {
            return Err(CollectorError::config("MAX_COUNTER must be at least 1"));
        }

        let capture = CaptureConfig {
            command: string_or(vars, "CAPTURE_COMMAND", DEFAULT_COMMAND),
            frequency: string_or(vars, "CAPTURE_FREQUENCY", DEFAULT_FREQUENCY),
            gain: optional(vars, "CAPTURE_GAIN"),
            threshold: optional(vars, "CAPTURE_THRESHOLD"),
            decoder: optional(vars, "CAPTURE_DECODER"),
            timeout: Duration::from_secs(parse_or(vars, "CAPTURE_TIMEOUT", DEFAULT_TIMEOUT_SECS)?),
            max_counter,
            debug: parse_flag(vars, "DEBUG_FLAG")?,
            layouts: FieldLayouts {
                tfa: FieldLayout::with_humidity(parse_or(vars, "TFA_ID_IDX", DEFAULT_ID_IDX)?),
                whb11: FieldLayout::with_humidity(parse_or(vars, "WHB11_ID_IDX", DEFAULT_ID_IDX)?),
                whb02: FieldLayout::temperature_only(parse_or(
                    vars,
                    "WHB02_ID_IDX",
                    DEFAULT_ID_IDX,
                )?),
            },
        };

        let database_url = match optional(vars, "DATABASE_URL") {
            Some(url) => url,
            None => compose_database_url(vars)?,
        };

        let storage = StorageConfig {
            update_interval: Duration::from_secs(parse_or(
                vars,
                "UPDATE_INTERVAL",
                DEFAULT_UPDATE_INTERVAL_SECS,
            )?),
            database_url,
            measurement: string_or(vars, "DB_MEASUREMENT", DEFAULT_MEASUREMENT),
        };

        Ok(SensorConfig {
            capture,
            storage,
            sensors,
        })
    }
}

/// Collect `(id, room)` pairs from `SENSORS` or the numbered fallback variables
fn sensor_pairs(vars: &HashMap<String, String>) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::new();

    // Try SENSORS format first
    if let Some(sensors) = optional(vars, "SENSORS") {
        for pair in sensors.split(',') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            match pair.split_once('=') {
                Some((id, room)) => pairs.push((id.trim().to_string(), room.trim().to_string())),
                None => {
                    return Err(CollectorError::config(format!(
                        "SENSORS entry '{}' is not of the form id=room",
                        pair
                    )))
                }
            }
        }
        return Ok(pairs);
    }

    // Fallback to individual environment variables
    for (key, id) in vars {
        if let Some(index) = key
            .strip_prefix("SENSOR_")
            .and_then(|s| s.strip_suffix("_ID"))
        {
            let room_key = format!("SENSOR_{}_ROOM", index);
            match vars.get(&room_key) {
                Some(room) => pairs.push((id.clone(), room.clone())),
                None => return Err(CollectorError::config(format!("{} is not set", room_key))),
            }
        }
    }
    // Deterministic order keeps duplicate errors stable
    pairs.sort();

    Ok(pairs)
}

fn compose_database_url(vars: &HashMap<String, String>) -> Result<String> {
    let host = string_or(vars, "DB_HOST", DEFAULT_DB_HOST);
    let port: u16 = parse_or(vars, "DB_PORT", DEFAULT_DB_PORT)?;
    let user = required(vars, "DB_USER")?;
    let name = required(vars, "DB_NAME")?;

    let mut url = Url::parse(&format!("postgres://{}:{}", host, port))?;
    url.set_username(&user)
        .map_err(|_| CollectorError::config("DB_USER cannot be used in a database URL"))?;
    if let Some(password) = optional(vars, "DB_PASSWORD") {
        url.set_password(Some(&password))
            .map_err(|_| CollectorError::config("DB_PASSWORD cannot be used in a database URL"))?;
    }
    url.set_path(&name);
    if let Some(cert) = optional(vars, "DB_SSLROOTCERT") {
        url.query_pairs_mut().append_pair("sslrootcert", &cert);
    }

    Ok(url.to_string())
}

fn optional(vars: &HashMap<String, String>, key: &str) -> Option<String> {
    vars.get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(vars: &HashMap<String, String>, key: &str) -> Result<String> {
    optional(vars, key).ok_or_else(|| CollectorError::config(format!("{} is not set", key)))
}

fn string_or(vars: &HashMap<String, String>, key: &str, default: &str) -> String {
    optional(vars, key).unwrap_or_else(|| default.to_string())
}

fn parse_or<T: FromStr>(vars: &HashMap<String, String>, key: &str, default: T) -> Result<T> {
    match optional(vars, key) {
        Some(value) => value
            .parse()
            .map_err(|_| CollectorError::config(format!("{} has invalid value '{}'", key, value))),
        None => Ok(default),
    }
}

/// Any integer is accepted, nonzero meaning enabled; so are the usual words
fn parse_flag(vars: &HashMap<String, String>, key: &str) -> Result<bool> {
    let value = match optional(vars, key) {
        Some(value) => value,
        None => return Ok(false),
    };
    if let Ok(number) = value.parse::<i64>() {
        return Ok(number != 0);
    }
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" => Ok(true),
        "false" | "no" | "off" => Ok(false),
        _ => Err(CollectorError::config(format!(
            "{} has invalid value '{}'",
            key, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn base() -> Vec<(&'static str, &'static str)> {
        vec![
            ("SENSORS", "2d=Bathroom, 6E=Living room"),
            ("DB_USER", "collector"),
            ("DB_PASSWORD", "s3cret"),
            ("DB_NAME", "home"),
        ]
    }

    #[test]
    fn defaults_are_applied() {
        let config = SensorConfig::from_vars(&vars(&base())).unwrap();

        assert_eq!(config.capture.command, "tfrec");
        assert_eq!(config.capture.frequency, "868250");
        assert_eq!(config.capture.gain, None);
        assert_eq!(config.capture.timeout, Duration::from_secs(60));
        assert_eq!(config.capture.max_counter, 3);
        assert!(!config.capture.debug);
        assert_eq!(config.capture.layouts.tfa.id, 2);
        assert_eq!(config.capture.layouts.whb02.humidity, None);
        assert_eq!(config.storage.update_interval, Duration::from_secs(300));
        assert_eq!(config.storage.measurement, "climate");
        assert_eq!(config.sensors.len(), 2);
        assert_eq!(config.sensors.room_for("6e"), Some("Living room"));
    }

    #[test]
    fn database_url_is_composed_from_parts() {
        let mut pairs = base();
        pairs.push(("DB_HOST", "db.lan"));
        pairs.push(("DB_PORT", "5433"));
        pairs.push(("DB_SSLROOTCERT", "/etc/ssl/ca.pem"));
        let config = SensorConfig::from_vars(&vars(&pairs)).unwrap();

        let url = Url::parse(&config.storage.database_url).unwrap();
        assert_eq!(url.scheme(), "postgres");
        assert_eq!(url.host_str(), Some("db.lan"));
        assert_eq!(url.port(), Some(5433));
        assert_eq!(url.username(), "collector");
        assert_eq!(url.password(), Some("s3cret"));
        assert_eq!(url.path(), "/home");
        assert_eq!(
            url.query_pairs().next().map(|(k, v)| (k.into_owned(), v.into_owned())),
            Some(("sslrootcert".to_string(), "/etc/ssl/ca.pem".to_string()))
        );
    }

    #[test]
    fn database_url_overrides_parts() {
        let config = SensorConfig::from_vars(&vars(&[
            ("SENSORS", "2d=Bathroom"),
            ("DATABASE_URL", "postgres://u:p@db/climate"),
        ]))
        .unwrap();
        assert_eq!(config.storage.database_url, "postgres://u:p@db/climate");
    }

    #[test]
    fn numbered_sensor_variables_are_used_without_sensors_list() {
        let config = SensorConfig::from_vars(&vars(&[
            ("SENSOR_1_ID", "2d"),
            ("SENSOR_1_ROOM", "Bathroom"),
            ("SENSOR_2_ID", "6e"),
            ("SENSOR_2_ROOM", "Kitchen"),
            ("DATABASE_URL", "postgres://u@db/climate"),
        ]))
        .unwrap();
        assert_eq!(config.sensors.len(), 2);
        assert_eq!(config.sensors.room_for("6E"), Some("Kitchen"));
    }

    #[test]
    fn missing_sensors_is_an_error() {
        let err = SensorConfig::from_vars(&vars(&[("DATABASE_URL", "postgres://db/x")]))
            .unwrap_err();
        assert!(matches!(err, CollectorError::Config(_)));
    }

    #[test]
    fn duplicate_room_is_an_error() {
        let err = SensorConfig::from_vars(&vars(&[
            ("SENSORS", "2d=Bathroom,6e=Bathroom"),
            ("DATABASE_URL", "postgres://db/x"),
        ]))
        .unwrap_err();
        assert!(matches!(err, CollectorError::Config(_)));
    }

    #[test]
    fn invalid_values_are_rejected() {
        for (key, value) in [
            ("MAX_COUNTER", "0"),
            ("MAX_COUNTER", "many"),
            ("CAPTURE_TIMEOUT", "-5"),
            ("DEBUG_FLAG", "maybe"),
            ("TFA_ID_IDX", "x"),
        ] {
            let mut pairs = base();
            pairs.push((key, value));
            assert!(
                SensorConfig::from_vars(&vars(&pairs)).is_err(),
                "{}={} should be rejected",
                key,
                value
            );
        }
    }

    #[test]
    fn debug_flag_accepts_numbers_and_words() {
        for (value, expected) in [
            ("1", true),
            ("0", false),
            ("2", true),
            ("-1", true),
            ("00", false),
            ("true", true),
            ("Off", false),
        ] {
            let mut pairs = base();
            pairs.push(("DEBUG_FLAG", value));
            let config = SensorConfig::from_vars(&vars(&pairs)).unwrap();
            assert_eq!(config.capture.debug, expected);
        }
    }

    #[test]
    fn storage_credentials_are_required_without_url() {
        let err = SensorConfig::from_vars(&vars(&[("SENSORS", "2d=Bathroom")])).unwrap_err();
        assert!(err.to_string().contains("DB_USER"));
    }
}
