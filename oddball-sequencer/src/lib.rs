pub mod config;
pub mod error;
pub mod observer;
mod run_state;
pub mod sequence;
pub mod sequencer;

pub use config::{AdjacencyRule, SequenceConfig, StimulusRatio};
pub use error::{Result, SequencerError};
pub use observer::{ObserverError, StimulusObserver, StimulusOnset};
pub use sequencer::{PreparedStimulus, RunSummary, Sequencer};
