use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Operator console: timestamped markers plus a background auditory oddball run.
#[derive(Parser, Debug, Default)]
#[command(name = "oddball-console", version, about)]
pub struct Cli {
    /// Marker stream name
    #[arg(long)]
    pub source: Option<String>,

    /// Marker stream source id
    #[arg(long)]
    pub id: Option<String>,

    /// JSON configuration file
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Directory for the daily CSV marker logs
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Address the marker stream publishes to
    #[arg(long)]
    pub stream_addr: Option<SocketAddr>,

    /// TrueType font used for the panel labels
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Run without opening an audio device
    #[arg(long)]
    pub no_audio: bool,
}
