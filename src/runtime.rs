use std::sync::Arc;

use crate::app::App;
use crate::config::{ChannelKind, RuntimeConfig, SensorSource};
use crate::console::{ConsoleObserver, ConsolePrompts, OperatorConsole, HELP};
use crate::error::{GaswatchError, Result};
use crate::event::EventHandler;
use crate::modules::monitoring::MonitoringHandler;
use crate::util::audio::AlarmSound;
use crate::util::io::bus::{MessageBus, TelemetryChannel};
use crate::util::io::journal::JournalChannel;
use crate::util::io::publisher::TelemetryPublisher;
use crate::util::io::serial::ReadingParser;
use crate::util::io::transport::{self, IngestStats, SensorTransport};
use crate::{log_error, log_info, log_warn};

/// Wires the ingestion and monitoring sides to a distribution channel.
#[derive(Debug, Clone)]
pub struct Runtime {
    config: RuntimeConfig,
}

impl Runtime {
    pub fn new(config: RuntimeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn build_channel(&self, kind: ChannelKind) -> Result<Arc<dyn TelemetryChannel>> {
        match kind {
            ChannelKind::Memory => Ok(Arc::new(MessageBus::new(self.config.channel.retain))),
            ChannelKind::Journal => {
                let path = self.config.channel.journal_path.as_ref().ok_or_else(|| {
                    GaswatchError::ConfigError("channel.journal_path is required for the journal channel".into())
                })?;
                Ok(Arc::new(JournalChannel::new(path, self.config.channel.poll_interval())))
            }
        }
    }

    /// Sensor → parser → publisher until the sensor stream ends.
    pub async fn ingest(&self, channel: Arc<dyn TelemetryChannel>) -> Result<IngestStats> {
        let reader = SensorTransport::new(self.config.sensor.clone()).open().await?;
        let parser = ReadingParser::from_config(&self.config.parser);
        let mut publisher = TelemetryPublisher::new(channel);

        let stats = transport::ingest(reader, &parser, &mut publisher).await?;
        log_info!(
            "Ingestion finished: {} published, {} dropped",
            publisher.published(),
            publisher.dropped()
        );
        Ok(stats)
    }

    /// Build the monitoring handler with console collaborators and alarm sound.
    pub fn build_monitor(
        &self,
        channel: Arc<dyn TelemetryChannel>,
        events: &EventHandler,
        prompts: &ConsolePrompts,
    ) -> MonitoringHandler {
        let monitor = &self.config.monitor;
        let sound = AlarmSound::from_config(monitor.alarm_sound.as_deref(), monitor.volume);

        let mut handler = MonitoringHandler::new(
            channel,
            monitor,
            prompts.collaborators(Box::new(sound)),
            events.sender(),
        );
        handler.add_observer(Box::new(ConsoleObserver::new(prompts.clone())));
        handler
    }

    /// Consumer loop over `channel`, driven by console commands when
    /// `interactive` is set.
    pub async fn monitor(&self, channel: Arc<dyn TelemetryChannel>, interactive: bool) -> color_eyre::Result<()> {
        let events = EventHandler::new();
        let prompts = ConsolePrompts::default();
        let handler = self.build_monitor(channel, &events, &prompts);

        let input = if interactive {
            println!("{}", HELP);
            Some(OperatorConsole::new(prompts, events.sender()).spawn_stdin())
        } else {
            None
        };

        let result = App::new(handler, events).run().await;

        if let Some(input) = input {
            input.abort();
        }
        result
    }

    /// Ingestion and consumer in one process over the configured channel.
    pub async fn run(&self) -> color_eyre::Result<()> {
        let channel = self.build_channel(self.config.channel.kind)?;

        // Sensor lines on stdin leave no room for operator commands
        let interactive = self.config.sensor.source != SensorSource::Stdin;
        if !interactive {
            log_warn!("Sensor reads stdin, console commands disabled");
        }

        let ingester = {
            let runtime = self.clone();
            let channel = Arc::clone(&channel);
            tokio::spawn(async move {
                if let Err(e) = runtime.ingest(channel).await {
                    log_error!("Ingestion stopped: {}", e);
                }
            })
        };

        let result = self.monitor(channel, interactive).await;
        ingester.abort();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelConfig;
    use tempfile::TempDir;

    #[test]
    fn test_memory_channel_by_default() {
        let runtime = Runtime::new(RuntimeConfig::default());
        let channel = runtime.build_channel(runtime.config().channel.kind).unwrap();
        assert_eq!(channel.append(&crate::util::io::serial::Reading::new(1, Default::default())).unwrap(), 0);
    }

    #[test]
    fn test_journal_channel_requires_path() {
        let config = RuntimeConfig {
            channel: ChannelConfig {
                journal_path: None,
                ..ChannelConfig::default()
            },
            ..RuntimeConfig::default()
        };

        let result = Runtime::new(config).build_channel(ChannelKind::Journal);
        assert!(matches!(result, Err(GaswatchError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_ingest_replay_file_into_journal() {
        let dir = TempDir::new().unwrap();
        let replay = dir.path().join("sensor.txt");
        std::fs::write(
            &replay,
            "MQ-2 warming up\nGas Level = 42 -> NORMAL\nGas Level = abc\nGas Level = 150 -> GAS LEAKING\n",
        )
        .unwrap();

        let mut config = RuntimeConfig::default();
        config.sensor.source = SensorSource::File;
        config.sensor.path = Some(replay);
        config.channel.journal_path = Some(dir.path().join("journal.jsonl"));
        let runtime = Runtime::new(config);

        let channel = runtime.build_channel(ChannelKind::Journal).unwrap();
        let stats = runtime.ingest(channel).await.unwrap();

        assert_eq!(stats.readings, 2);
        assert_eq!(stats.ignored, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.published, 2);
    }
}
