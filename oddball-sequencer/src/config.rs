use crate::error::{Result, SequencerError};
use oddball_audio::DEFAULT_SAMPLE_RATE;
use oddball_core::{Tone, ToneRole};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const PROPORTION_TOLERANCE: f64 = 1e-9;

/// How strictly the no-consecutive-deviant rule is enforced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjacencyRule {
    /// Single repair pass, then re-space deviants if any pair survived.
    #[default]
    Strict,
    /// Single repair pass only; residual pairs near the tail are possible.
    BestEffort,
}

/// One stimulus kind and its share of the run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StimulusRatio {
    pub frequency_hz: f64,
    pub proportion: f64,
    #[serde(default)]
    pub role: ToneRole,
}

impl StimulusRatio {
    pub fn standard(frequency_hz: f64, proportion: f64) -> Self {
        Self {
            frequency_hz,
            proportion,
            role: ToneRole::Standard,
        }
    }

    pub fn deviant(frequency_hz: f64, proportion: f64) -> Self {
        Self {
            frequency_hz,
            proportion,
            role: ToneRole::Deviant,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    pub total_stimuli: usize,
    pub tone_duration_ms: u64,
    /// Silence after each tone, not counting the tone itself.
    pub interval_ms: u64,
    pub sample_rate: u32,
    pub amplitude: f32,
    pub stimuli: Vec<StimulusRatio>,
    pub adjacency: AdjacencyRule,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            total_stimuli: 10_000,
            tone_duration_ms: 200,
            interval_ms: 800,
            sample_rate: DEFAULT_SAMPLE_RATE,
            amplitude: 1.0,
            stimuli: vec![
                StimulusRatio::standard(1000.0, 0.8),
                StimulusRatio::deviant(1200.0, 0.2),
            ],
            adjacency: AdjacencyRule::Strict,
        }
    }
}

impl SequenceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.stimuli.is_empty() {
            return Err(invalid("at least one stimulus kind is required"));
        }
        if self.tone_duration_ms == 0 {
            return Err(invalid("tone duration must be positive"));
        }
        if self.sample_rate == 0 {
            return Err(invalid("sample rate must be positive"));
        }
        if !self.amplitude.is_finite() || !(0.0..=1.0).contains(&self.amplitude) {
            return Err(invalid(format!("amplitude {} outside 0..=1", self.amplitude)));
        }

        for (i, s) in self.stimuli.iter().enumerate() {
            if !s.frequency_hz.is_finite() || s.frequency_hz <= 0.0 {
                return Err(invalid(format!(
                    "stimulus {i}: frequency {} Hz must be positive",
                    s.frequency_hz
                )));
            }
            if !s.proportion.is_finite() || s.proportion < 0.0 {
                return Err(invalid(format!(
                    "stimulus {i}: proportion {} must be non-negative",
                    s.proportion
                )));
            }
            if self.stimuli[..i]
                .iter()
                .any(|other| other.frequency_hz == s.frequency_hz)
            {
                return Err(invalid(format!(
                    "stimulus {i}: frequency {} Hz is listed twice",
                    s.frequency_hz
                )));
            }
        }

        let sum: f64 = self.stimuli.iter().map(|s| s.proportion).sum();
        if sum > 1.0 + PROPORTION_TOLERANCE {
            return Err(invalid(format!("proportions sum to {sum}, above 1")));
        }

        let deviants = self
            .stimuli
            .iter()
            .filter(|s| s.role == ToneRole::Deviant)
            .count();
        if deviants > 1 {
            return Err(invalid("at most one deviant kind is supported"));
        }
        if self.stimuli.len() > 1 && self.deviant_index().is_none() {
            return Err(invalid(
                "no deviant kind: mark one with role \"deviant\" or give it the smallest proportion",
            ));
        }

        if self.adjacency == AdjacencyRule::Strict {
            if let Some(d) = self.deviant_index() {
                let counts = self.counts();
                let others: usize = counts.iter().sum::<usize>() - counts[d];
                if counts[d] > others + 1 {
                    return Err(invalid(format!(
                        "{} deviants cannot be separated by {} other stimuli",
                        counts[d], others
                    )));
                }
            }
        }

        Ok(())
    }

    /// `floor(total * proportion)` per kind; remainders are dropped.
    pub fn counts(&self) -> Vec<usize> {
        self.stimuli
            .iter()
            .map(|s| (self.total_stimuli as f64 * s.proportion).floor() as usize)
            .collect()
    }

    /// The kind marked deviant or, when none is marked and there are at
    /// least two kinds, the single rarest one. `None` if the rarest
    /// proportion is shared.
    pub fn deviant_index(&self) -> Option<usize> {
        if let Some(marked) = self.stimuli.iter().position(|s| s.role == ToneRole::Deviant) {
            return Some(marked);
        }
        if self.stimuli.len() < 2 {
            return None;
        }
        let rarest = self
            .stimuli
            .iter()
            .map(|s| s.proportion)
            .fold(f64::INFINITY, f64::min);
        let mut candidates = self
            .stimuli
            .iter()
            .enumerate()
            .filter(|(_, s)| s.proportion == rarest)
            .map(|(i, _)| i);
        match (candidates.next(), candidates.next()) {
            (Some(i), None) => Some(i),
            _ => None,
        }
    }

    /// One tone per kind, with the resolved deviant carrying `ToneRole::Deviant`.
    pub fn tones(&self) -> Vec<Tone> {
        let deviant = self.deviant_index();
        self.stimuli
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let role = if Some(i) == deviant {
                    ToneRole::Deviant
                } else {
                    ToneRole::Standard
                };
                Tone::new(s.frequency_hz, self.tone_duration_ms, role)
            })
            .collect()
    }

    pub fn tone_duration(&self) -> Duration {
        Duration::from_millis(self.tone_duration_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Tone plus interval: the fixed period between onsets.
    pub fn dwell(&self) -> Duration {
        self.tone_duration() + self.interval()
    }
}

fn invalid(msg: impl Into<String>) -> SequencerError {
    SequencerError::Configuration(msg.into())
}
