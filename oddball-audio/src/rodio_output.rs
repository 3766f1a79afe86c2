use crate::error::AudioError;
use crate::output::AudioOutput;
use crate::synth::Clip;
use rodio::{OutputStreamHandle, Source};
use std::sync::Arc;
use std::time::Duration;

pub use rodio::OutputStream;

/// Plays clips on the default output device through rodio's mixer.
#[derive(Clone)]
pub struct RodioOutput {
    handle: OutputStreamHandle,
}

impl RodioOutput {
    /// Opens the default device. The returned `OutputStream` must stay alive
    /// (on the thread that opened it) for as long as the output is used.
    pub fn open_default() -> Result<(OutputStream, Self), AudioError> {
        let (stream, handle) = OutputStream::try_default()
            .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;
        Ok((stream, Self { handle }))
    }
}

impl AudioOutput for RodioOutput {
    fn play(&self, clip: &Clip) -> Result<(), AudioError> {
        self.handle
            .play_raw(ClipSource::new(clip).convert_samples())
            .map_err(|e| AudioError::Playback(e.to_string()))
    }
}

/// Iterates a clip's shared samples without copying them.
struct ClipSource {
    samples: Arc<[i16]>,
    position: usize,
    channels: u16,
    sample_rate: u32,
}

impl ClipSource {
    fn new(clip: &Clip) -> Self {
        Self {
            samples: Arc::clone(clip.samples()),
            position: 0,
            channels: clip.channels(),
            sample_rate: clip.sample_rate(),
        }
    }
}

impl Iterator for ClipSource {
    type Item = i16;

    fn next(&mut self) -> Option<i16> {
        let sample = self.samples.get(self.position).copied()?;
        self.position += 1;
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.samples.len() - self.position;
        (left, Some(left))
    }
}

impl Source for ClipSource {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.samples.len() - self.position)
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        let frames = self.samples.len() / self.channels as usize;
        Some(Duration::from_secs_f64(frames as f64 / self.sample_rate as f64))
    }
}
