// src/util/io/transport.rs
//! Sensor transport - opens the line stream from the gas sensor and runs the
//! ingestion loop (parse, then publish) over it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_serial::SerialPortBuilderExt;

use crate::config::{SensorConfig, SensorSource};
use crate::error::{GaswatchError, Result};
use crate::util::io::publisher::TelemetryPublisher;
use crate::util::io::serial::{ParseOutcome, ReadingParser};
use crate::{log_debug, log_info, log_warn};

pub type LineSource = Box<dyn AsyncBufRead + Unpin + Send>;

/// Counters for one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub lines: u64,
    pub readings: u64,
    pub ignored: u64,
    pub rejected: u64,
    pub published: u64,
}

#[derive(Debug, Clone)]
pub struct SensorTransport {
    config: SensorConfig,
}

impl SensorTransport {
    pub fn new(config: SensorConfig) -> Self {
        Self { config }
    }

    /// Open the configured line source.
    pub async fn open(&self) -> Result<LineSource> {
        match self.config.source {
            SensorSource::Serial => self.open_serial(),
            SensorSource::Stdin => {
                log_info!("Reading sensor lines from stdin");
                Ok(Box::new(BufReader::new(tokio::io::stdin())))
            }
            SensorSource::File => {
                let path = self
                    .config
                    .path
                    .as_ref()
                    .ok_or_else(|| GaswatchError::ConfigError("sensor.path is required for the file source".into()))?;
                log_info!("Replaying sensor lines from {}", path.display());
                let file = tokio::fs::File::open(path).await?;
                Ok(Box::new(BufReader::new(file)))
            }
            SensorSource::Simulate => {
                log_info!("Using simulated gas sensor ({} ms interval)", self.config.interval_ms);
                Ok(spawn_simulated_sensor(Duration::from_millis(self.config.interval_ms)))
            }
        }
    }

    fn open_serial(&self) -> Result<LineSource> {
        let port_path = if self.config.port == "auto" {
            let ports = detect_usb_ports();
            for port in &ports {
                log_info!("  - {}", port);
            }
            ports
                .into_iter()
                .next()
                .ok_or_else(|| GaswatchError::RuntimeError("No USB serial ports detected".to_string()))?
        } else {
            self.config.port.clone()
        };

        log_info!("Starting serial listener on {} at {} baud", port_path, self.config.baud_rate);
        let port = tokio_serial::new(&port_path, self.config.baud_rate).open_native_async()?;
        log_info!("Serial port {} opened successfully, listening for gas readings...", port_path);

        Ok(Box::new(BufReader::new(port)))
    }
}

/// Detect available USB serial ports (Linux + macOS)
pub fn detect_usb_ports() -> Vec<String> {
    let mut ports = Vec::new();

    #[cfg(target_os = "linux")]
    {
        if let Ok(entries) = std::fs::read_dir("/dev") {
            for entry in entries.flatten() {
                if let Some(name) = entry.file_name().to_str() {
                    if name.starts_with("ttyUSB") || name.starts_with("ttyACM") {
                        ports.push(format!("/dev/{}", name));
                    }
                }
            }
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Ok(entries) = std::fs::read_dir("/dev") {
            for entry in entries.flatten() {
                if let Some(name) = entry.file_name().to_str() {
                    if name.starts_with("cu.") {
                        ports.push(format!("/dev/{}", name));
                    }
                }
            }
        }
    }

    ports.sort();
    ports.dedup();
    ports
}

/// Read lines until the source ends, publishing every valid reading.
///
/// Blocks only on the next line. Parse and publish failures are logged and
/// skipped; only a transport read error ends the loop early.
pub async fn ingest<R>(
    reader: R,
    parser: &ReadingParser,
    publisher: &mut TelemetryPublisher,
) -> std::io::Result<IngestStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut reader = reader;
    let mut stats = IngestStats::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        // Raw bytes: serial noise must not end the loop with a UTF-8 error
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        stats.lines += 1;

        let line = String::from_utf8_lossy(&buf);
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        log_debug!("Arduino says: {}", trimmed);

        match parser.parse_line(trimmed) {
            ParseOutcome::Reading(reading) => {
                stats.readings += 1;
                if publisher.publish(&reading) {
                    stats.published += 1;
                }
            }
            ParseOutcome::Ignored => stats.ignored += 1,
            ParseOutcome::Rejected(_) => stats.rejected += 1,
        }
    }

    log_warn!(
        "Sensor stream closed after {} lines ({} readings, {} published)",
        stats.lines,
        stats.readings,
        stats.published
    );
    Ok(stats)
}

/// Feed a random walk of sensor lines through an in-memory pipe.
fn spawn_simulated_sensor(interval: Duration) -> LineSource {
    let (reader, mut writer) = tokio::io::duplex(1024);

    tokio::spawn(async move {
        let mut rng = StdRng::from_entropy();
        let mut level: i64 = 40;
        let mut ticker = tokio::time::interval(interval);

        loop {
            ticker.tick().await;

            let line = if rng.gen_ratio(1, 20) {
                "MQ-2 heater stable\n".to_string()
            } else {
                level = (level + rng.gen_range(-15..=15)).clamp(10, 400);
                if rng.gen_ratio(1, 40) {
                    level += 120;
                }
                let status = if level > 100 { "GAS LEAKING" } else { "Normal" };
                format!("Gas Level = {} -> {}\n", level, status)
            };

            if writer.write_all(line.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    Box::new(BufReader::new(reader))
}
