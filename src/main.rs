mod app;
mod auto_beep;
mod cli;
mod config;
mod console;
mod render;
#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use cli::Cli;
use config::ConsoleConfig;
use console::{Console, SharedOutput};
use oddball_audio::NullOutput;
use oddball_marker::{CsvMarkerLog, MarkerSink, MarkerWorker, StreamInfo, UdpMarkerStream};
use std::sync::Arc;

#[cfg(feature = "rodio")]
type AudioGuard = Option<oddball_audio::OutputStream>;
#[cfg(not(feature = "rodio"))]
type AudioGuard = ();

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = ConsoleConfig::load(cli.config.as_deref())?;
    config.apply_cli(&cli);

    let csv = CsvMarkerLog::open_daily(&config.data_dir)
        .with_context(|| format!("opening marker log in {}", config.data_dir.display()))?;
    let stream = open_stream(&config)?;

    let sinks: Vec<Box<dyn MarkerSink>> = vec![Box::new(csv), stream];
    let worker = MarkerWorker::with_capacity(sinks, config.queue_capacity)?;

    // Keeps the device open until the window closes
    let (_audio, output) = open_output(cli.no_audio);
    let font = render::load_font(config.font_path.as_deref());
    let console = Console::new(&config, worker, output)?;

    App::new(console, font).run()
}

fn open_udp_stream(config: &ConsoleConfig, info: StreamInfo) -> Result<Box<dyn MarkerSink>> {
    let stream = UdpMarkerStream::open(info, config.stream.addr)
        .with_context(|| format!("opening marker stream to {}", config.stream.addr))?;
    Ok(Box::new(stream))
}

#[cfg(feature = "lsl")]
fn open_stream(config: &ConsoleConfig) -> Result<Box<dyn MarkerSink>> {
    let info = StreamInfo::markers(config.stream.name.clone(), config.stream.source_id.clone());
    match oddball_marker::LslMarkerOutlet::open(&info) {
        Ok(outlet) => Ok(Box::new(outlet)),
        Err(e) => {
            log::warn!("{e}, falling back to UDP");
            open_udp_stream(config, info)
        }
    }
}

#[cfg(not(feature = "lsl"))]
fn open_stream(config: &ConsoleConfig) -> Result<Box<dyn MarkerSink>> {
    let info = StreamInfo::markers(config.stream.name.clone(), config.stream.source_id.clone());
    open_udp_stream(config, info)
}

#[cfg(feature = "rodio")]
fn open_output(disabled: bool) -> (AudioGuard, SharedOutput) {
    if !disabled {
        match oddball_audio::RodioOutput::open_default() {
            Ok((stream, output)) => return (Some(stream), Arc::new(output)),
            Err(e) => log::warn!("{e}, audio buttons are disabled"),
        }
    }
    (None, Arc::new(NullOutput))
}

#[cfg(not(feature = "rodio"))]
fn open_output(disabled: bool) -> (AudioGuard, SharedOutput) {
    if !disabled {
        log::warn!("Built without the rodio feature, audio buttons are disabled");
    }
    ((), Arc::new(NullOutput))
}
