use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Defines stimuli and the identifier reported when they are presented
pub trait Stimulus: Clone + Send + Sync + fmt::Debug {
    /// Identifier handed to observers and written into markers.
    fn identifier(&self) -> String;
    /// True for the rare kind that must not repeat back to back.
    fn is_deviant(&self) -> bool;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToneRole {
    #[default]
    Standard,
    Deviant,
}

/// A pure tone of fixed frequency and length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tone {
    pub frequency_hz: f64,
    pub duration_ms: u64,
    pub role: ToneRole,
}

impl Tone {
    pub fn new(frequency_hz: f64, duration_ms: u64, role: ToneRole) -> Self {
        Self {
            frequency_hz,
            duration_ms,
            role,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

impl Stimulus for Tone {
    fn identifier(&self) -> String {
        format!("{}Hz", self.frequency_hz)
    }

    fn is_deviant(&self) -> bool {
        matches!(self.role, ToneRole::Deviant)
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Hz/{}ms", self.frequency_hz, self.duration_ms)
    }
}
