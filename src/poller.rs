/// The collection loop: capture until every room reported, flush, sleep
use log::{debug, error, info, warn};
use std::time::Duration;
use time::OffsetDateTime;
use tokio::time::{sleep, Instant};

use crate::capture::{apply_output, FieldLayouts, Reader};
use crate::completeness::check;
use crate::database::Sink;
use crate::models::{ClimateRecord, Sample, SensorRegistry};
use crate::utils::{format_datetime, next_sleep};

/// Outcome of one collection cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub attempts: u32,
    pub complete: bool,
    /// Rooms handed to the sink
    pub rooms: Vec<String>,
    pub flushed: bool,
    pub elapsed: Duration,
}

pub struct Poller<R, S> {
    reader: R,
    sink: S,
    registry: SensorRegistry,
    layouts: FieldLayouts,
    max_counter: u32,
    update_interval: Duration,
    measurement: String,
}

impl<R: Reader, S: Sink> Poller<R, S> {
    pub fn new(
        reader: R,
        sink: S,
        registry: SensorRegistry,
        layouts: FieldLayouts,
        max_counter: u32,
        update_interval: Duration,
        measurement: impl Into<String>,
    ) -> Self {
        Poller {
            reader,
            sink,
            registry,
            layouts,
            max_counter: max_counter.max(1),
            update_interval,
            measurement: measurement.into(),
        }
    }

    /// Run cycles forever, sleeping out the rest of each update interval
    pub async fn run(&mut self) {
        loop {
            let report = self.run_cycle().await;
            let sleep_time = next_sleep(self.update_interval, report.elapsed);
            info!("Sleeping for {} seconds", sleep_time.as_secs());
            sleep(sleep_time).await;
        }
    }

    /// One cycle: up to `max_counter` attempts, then an unconditional flush
    pub async fn run_cycle(&mut self) -> CycleReport {
        let start = Instant::now();
        let mut sample = Sample::new();

        let (attempts, complete) = self.collect(&mut sample).await;
        log_sample(&self.registry, &sample);
        let flushed = self.flush(&sample, complete).await;

        CycleReport {
            attempts,
            complete,
            rooms: sample.rooms().into_iter().map(str::to_string).collect(),
            flushed,
            elapsed: start.elapsed(),
        }
    }

    async fn collect(&mut self, sample: &mut Sample) -> (u32, bool) {
        let mut attempts = 0;

        while attempts < self.max_counter {
            attempts += 1;
            info!("({:2}/{}) Receiving data ...", attempts, self.max_counter);

            let output = match self.reader.read().await {
                Ok(output) => output,
                Err(e) => {
                    warn!("Capture failed: {}", e);
                    String::new()
                }
            };
            debug!("Capture output:\n{}", output);

            let recorded = apply_output(&output, &self.layouts, &self.registry, sample);
            debug!("Recorded {} readings", recorded);

            let status = check(&self.registry, sample);
            if status.complete {
                info!(
                    "Data complete at {}",
                    format_datetime(&OffsetDateTime::now_utc())
                );
                return (attempts, true);
            }
            debug!(
                "{} rooms still missing",
                status.expected - status.captured.len()
            );
        }

        (attempts, false)
    }

    async fn flush(&mut self, sample: &Sample, complete: bool) -> bool {
        let now = OffsetDateTime::now_utc();
        if sample.is_empty() {
            warn!("No data collected during this interval!");
        } else if !complete {
            warn!(
                "Sending incomplete data set at {} ({}/{} rooms)",
                format_datetime(&now),
                sample.len(),
                self.registry.len()
            );
        }

        let records = ClimateRecord::from_sample(sample, &self.measurement, now);
        for record in &records {
            debug!("{:?}", record);
        }

        match self.sink.write(&records).await {
            Ok(()) => {
                info!("Stored {} records", records.len());
                true
            }
            Err(e) => {
                error!(
                    "Could not write data to database at {}: {}",
                    format_datetime(&OffsetDateTime::now_utc()),
                    e
                );
                false
            }
        }
    }
}

fn log_sample(registry: &SensorRegistry, sample: &Sample) {
    info!("Captured sensors: {}", sample.len());
    for room in registry.rooms() {
        match sample.get(room) {
            Some(reading) => match reading.humidity {
                Some(humidity) => info!(
                    "{:15} Temp: {:5.1} Hum: {:2.0}%",
                    room, reading.temperature, humidity
                ),
                None => info!("{:15} Temp: {:5.1}", room, reading.temperature),
            },
            None => info!("{:15} no data", room),
        }
    }
}
