use thiserror::Error;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("playback failed: {0}")]
    Playback(String),
}
