/// Destinations for the records of a finished cycle
use async_trait::async_trait;
use log::{debug, info};

use crate::database::connection::connect;
use crate::database::operations::store_climate_records;
use crate::error::Result;
use crate::models::ClimateRecord;
use crate::utils::format_iso8601;

#[async_trait]
pub trait Sink: Send {
    /// Write one cycle's batch of records
    async fn write(&mut self, records: &[ClimateRecord]) -> Result<()>;
}

/// Writes records to PostgreSQL / TimescaleDB, one connection per batch
#[derive(Debug, Clone)]
pub struct PostgresSink {
    database_url: String,
}

impl PostgresSink {
    pub fn new(database_url: impl Into<String>) -> Self {
        PostgresSink {
            database_url: database_url.into(),
        }
    }
}

#[async_trait]
impl Sink for PostgresSink {
    async fn write(&mut self, records: &[ClimateRecord]) -> Result<()> {
        let mut client = connect(&self.database_url).await?;
        let inserted = store_climate_records(&mut client, records).await?;
        debug!("Inserted {} rows", inserted);
        Ok(())
    }
}

/// Only logs the records, used for dry runs
#[derive(Debug, Clone, Default)]
pub struct LogSink;

#[async_trait]
impl Sink for LogSink {
    async fn write(&mut self, records: &[ClimateRecord]) -> Result<()> {
        for record in records {
            info!(
                "[dry run] {} room={} time={} temperature={}{}",
                record.measurement,
                record.room,
                format_iso8601(&record.time),
                record.temperature,
                record
                    .humidity
                    .map(|h| format!(" humidity={}", h))
                    .unwrap_or_default()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[tokio::test]
    async fn dry_run_sink_accepts_records_with_and_without_humidity() {
        let time = datetime!(2024-01-15 08:30:00 UTC);
        let records = vec![
            ClimateRecord {
                measurement: "climate".to_string(),
                room: "Bathroom".to_string(),
                time,
                temperature: 23.1,
                humidity: Some(61.0),
            },
            ClimateRecord {
                measurement: "climate".to_string(),
                room: "Attic".to_string(),
                time,
                temperature: 12.4,
                humidity: None,
            },
        ];

        let mut sink = LogSink;
        assert!(sink.write(&records).await.is_ok());
        assert!(sink.write(&[]).await.is_ok());
    }
}
