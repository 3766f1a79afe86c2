use crate::observer::ObserverError;
use oddball_audio::AudioError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SequencerError {
    #[error("invalid sequence configuration: {0}")]
    Configuration(String),

    #[error("sequencer is already running")]
    AlreadyRunning,

    #[error("observer failed at stimulus {index}")]
    Observer {
        index: usize,
        #[source]
        source: ObserverError,
    },

    #[error("audio output failed at stimulus {index}")]
    Audio {
        index: usize,
        #[source]
        source: AudioError,
    },

    #[error("failed to spawn sequencer worker: {0}")]
    Worker(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SequencerError>;
