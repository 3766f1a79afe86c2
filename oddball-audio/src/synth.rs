use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
const CHANNELS: u16 = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveshape {
    #[default]
    Sine,
    Square,
}

/// Pre-rendered interleaved signed 16-bit PCM.
///
/// Samples sit behind an `Arc` so a clip can be handed to the output on every
/// presentation without copying.
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    samples: Arc<[i16]>,
    channels: u16,
    sample_rate: u32,
}

impl Clip {
    pub fn samples(&self) -> &Arc<[i16]> {
        &self.samples
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of sample frames (one sample per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }
}

/// Renders a stereo tone of the given shape. `amplitude` is clamped to 0..=1
/// and scales full-range `i16`.
pub fn synthesize(
    frequency_hz: f64,
    duration: Duration,
    sample_rate: u32,
    shape: Waveshape,
    amplitude: f32,
) -> Clip {
    let frames = (sample_rate as f64 * duration.as_secs_f64()).round() as usize;
    let scale = 32767.0 * amplitude.clamp(0.0, 1.0) as f64;
    let step = 2.0 * PI * frequency_hz / sample_rate as f64;

    let mut samples = Vec::with_capacity(frames * CHANNELS as usize);
    for i in 0..frames {
        let phase = (step * i as f64).sin();
        let value = match shape {
            Waveshape::Sine => phase,
            Waveshape::Square => {
                if phase >= 0.0 {
                    1.0
                } else {
                    -1.0
                }
            }
        };
        let sample = (value * scale) as i16;
        // same signal on both channels
        samples.push(sample);
        samples.push(sample);
    }

    Clip {
        samples: samples.into(),
        channels: CHANNELS,
        sample_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_count_matches_duration() {
        let clip = synthesize(
            1000.0,
            Duration::from_millis(200),
            DEFAULT_SAMPLE_RATE,
            Waveshape::Sine,
            1.0,
        );
        assert_eq!(clip.frames(), 8820);
        assert_eq!(clip.samples().len(), 8820 * 2);
        assert_eq!(clip.channels(), 2);
        assert_eq!(clip.duration(), Duration::from_millis(200));
    }

    #[test]
    fn channels_carry_identical_signal() {
        let clip = synthesize(440.0, Duration::from_millis(10), 8000, Waveshape::Sine, 1.0);
        for frame in clip.samples().chunks(2) {
            assert_eq!(frame[0], frame[1]);
        }
    }

    #[test]
    fn sine_follows_expected_values() {
        // quarter-period sampling: 0, peak, 0, trough
        let clip = synthesize(1000.0, Duration::from_millis(1), 4000, Waveshape::Sine, 1.0);
        let left: Vec<i16> = clip.samples().iter().step_by(2).copied().collect();
        assert_eq!(left[0], 0);
        assert_eq!(left[1], 32767);
        assert!(left[2].abs() <= 1);
        assert_eq!(left[3], -32767);
    }

    #[test]
    fn amplitude_scales_and_clamps() {
        let quiet = synthesize(440.0, Duration::from_millis(20), 44_100, Waveshape::Square, 0.2);
        let peak = quiet.samples().iter().map(|s| s.unsigned_abs()).max().unwrap();
        assert_eq!(peak, (32767.0f64 * 0.2f32 as f64) as u16);

        let loud = synthesize(440.0, Duration::from_millis(20), 44_100, Waveshape::Square, 3.0);
        assert!(loud.samples().iter().all(|s| s.unsigned_abs() == 32767));
    }

    #[test]
    fn zero_duration_yields_empty_clip() {
        let clip = synthesize(440.0, Duration::ZERO, 44_100, Waveshape::Sine, 1.0);
        assert_eq!(clip.frames(), 0);
        assert_eq!(clip.duration(), Duration::ZERO);
    }
}
