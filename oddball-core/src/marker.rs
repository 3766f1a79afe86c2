use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One timestamped event, as logged and streamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    #[serde(rename = "ux time")]
    pub unix_ns: u64,
    #[serde(rename = "human time")]
    pub human_time: String,
    pub message: String,
}

impl Marker {
    /// Stamps `message` with the current wall-clock time.
    pub fn now(message: impl Into<String>) -> Self {
        Self::at(Local::now(), message)
    }

    pub fn at(time: DateTime<Local>, message: impl Into<String>) -> Self {
        Self {
            unix_ns: time.timestamp_nanos_opt().unwrap_or_default().max(0) as u64,
            human_time: time.format("%H:%M:%S").to_string(),
            message: message.into(),
        }
    }

    /// Text pushed on the real-time stream.
    pub fn stream_sample(&self) -> String {
        format!("{} t:{}", self.message, self.unix_ns)
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, '{}', '{}']", self.unix_ns, self.human_time, self.message)
    }
}
