use crate::cli::Cli;
use anyhow::{Context, Result};
use oddball_audio::{synthesize, Clip, Waveshape};
use oddball_sequencer::SequenceConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A fixed cue sound, rendered once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CueConfig {
    pub frequency_hz: f64,
    pub duration_ms: u64,
    #[serde(default)]
    pub shape: Waveshape,
    pub volume: f32,
}

impl CueConfig {
    pub fn clip(&self, sample_rate: u32) -> Clip {
        synthesize(
            self.frequency_hz,
            Duration::from_millis(self.duration_ms),
            sample_rate,
            self.shape,
            self.volume,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    pub name: String,
    pub source_id: String,
    pub addr: SocketAddr,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            name: "ExperimentMarkers".into(),
            source_id: "experiment_markers".into(),
            addr: ([127, 0, 0, 1], 16571).into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub p300: SequenceConfig,
    pub heartbeat_secs: u64,
    /// Inclusive range of seconds between automatic beeps.
    pub auto_beep_secs: [u64; 2],
    pub beep: CueConfig,
    pub recording_cue: CueConfig,
    pub data_dir: PathBuf,
    pub stream: StreamConfig,
    pub queue_capacity: usize,
    pub log_lines: usize,
    pub font_path: Option<PathBuf>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            p300: SequenceConfig::default(),
            heartbeat_secs: 5,
            auto_beep_secs: [4, 8],
            beep: CueConfig {
                frequency_hz: 440.0,
                duration_ms: 500,
                shape: Waveshape::Sine,
                volume: 0.2,
            },
            recording_cue: CueConfig {
                frequency_hz: 440.0,
                duration_ms: 5000,
                shape: Waveshape::Square,
                volume: 0.2,
            },
            data_dir: PathBuf::from("data"),
            stream: StreamConfig::default(),
            queue_capacity: 1024,
            log_lines: 200,
            font_path: None,
        }
    }
}

impl ConsoleConfig {
    /// Reads `path` if given, otherwise returns the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config
            .p300
            .validate()
            .with_context(|| format!("p300 section of {}", path.display()))?;
        Ok(config)
    }

    /// Command-line flags win over the file.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(source) = &cli.source {
            self.stream.name = source.clone();
        }
        if let Some(id) = &cli.id {
            self.stream.source_id = id.clone();
        }
        if let Some(dir) = &cli.data_dir {
            self.data_dir = dir.clone();
        }
        if let Some(addr) = cli.stream_addr {
            self.stream.addr = addr;
        }
        if let Some(font) = &cli.font {
            self.font_path = Some(font.clone());
        }
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs.max(1))
    }

    pub fn auto_beep_range(&self) -> (Duration, Duration) {
        let [low, high] = self.auto_beep_secs;
        let (low, high) = (low.min(high), low.max(high));
        (Duration::from_secs(low), Duration::from_secs(high))
    }
}
