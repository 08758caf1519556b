/// Running the external `tfrec` receiver and collecting its output
use async_trait::async_trait;
use log::{debug, warn};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::{timeout_at, Instant};

use crate::config::CaptureConfig;
use crate::error::{CollectorError, Result};

// Upper bound for reading buffered output after the process was killed
const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Source of raw capture text for one attempt
#[async_trait]
pub trait Reader: Send {
    async fn read(&mut self) -> Result<String>;
}

/// Reader that runs `tfrec` with the configured radio parameters
#[derive(Debug, Clone)]
pub struct TfrecReader {
    command: String,
    args: Vec<String>,
    limit: Duration,
}

impl TfrecReader {
    pub fn new(config: &CaptureConfig) -> Self {
        TfrecReader {
            command: config.command.clone(),
            args: capture_args(config),
            // tfrec stops by itself after the capture window; allow it twice as long
            limit: config.timeout * 2,
        }
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

#[async_trait]
impl Reader for TfrecReader {
    async fn read(&mut self) -> Result<String> {
        debug!("Running {} {}", self.command, self.args().join(" "));
        capture(&self.command, &self.args, self.limit).await
    }
}

/// Build the command line: frequency and capture window always, the rest when set
pub fn capture_args(config: &CaptureConfig) -> Vec<String> {
    let mut args = vec![
        "-f".to_string(),
        config.frequency.clone(),
        "-w".to_string(),
        config.timeout.as_secs().to_string(),
    ];

    let optional = [
        ("-g", &config.gain),
        ("-t", &config.threshold),
        ("-T", &config.decoder),
    ];
    for (flag, value) in optional {
        if let Some(value) = value {
            args.push(flag.to_string());
            args.push(value.clone());
        }
    }

    args
}

/// Run `command` and return its standard output
///
/// If the process is still running after `limit` it is killed and the output
/// produced up to that point is returned. Only a failure to start the process
/// is reported as an error.
pub async fn capture(command: &str, args: &[String], limit: Duration) -> Result<String> {
    let mut child = Command::new(command)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()?;

    let stdout = child.stdout.take().ok_or_else(|| {
        CollectorError::Capture(std::io::Error::new(
            std::io::ErrorKind::Other,
            "stdout of capture command is not piped",
        ))
    })?;

    let deadline = Instant::now() + limit;
    let mut lines = BufReader::new(stdout).lines();
    let mut output = String::new();
    let mut timed_out = false;

    loop {
        match timeout_at(deadline, lines.next_line()).await {
            Ok(Ok(Some(line))) => {
                output.push_str(&line);
                output.push('\n');
            }
            Ok(Ok(None)) => break,
            Ok(Err(e)) => {
                warn!("Failed to read output of {}: {}", command, e);
                break;
            }
            Err(_) => {
                timed_out = true;
                break;
            }
        }
    }

    if !timed_out {
        match timeout_at(deadline, child.wait()).await {
            Ok(Ok(status)) => {
                debug!("{} exited with {}", command, status);
                return Ok(output);
            }
            Ok(Err(e)) => {
                warn!("Failed to wait for {}: {}", command, e);
                return Ok(output);
            }
            Err(_) => {}
        }
    }

    warn!("{} still running after {:?}, killing it", command, limit);
    if let Err(e) = child.kill().await {
        warn!("Failed to kill {}: {}", command, e);
    }

    // Collect whatever was written before the kill. Processes started by the
    // command may keep stdout open, so the drain has one deadline overall.
    let drain_deadline = Instant::now() + DRAIN_TIMEOUT;
    while let Ok(Ok(Some(line))) = timeout_at(drain_deadline, lines.next_line()).await {
        output.push_str(&line);
        output.push('\n');
    }

    Ok(output)
}
