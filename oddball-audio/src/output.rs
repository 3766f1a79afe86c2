use crate::error::AudioError;
use crate::synth::Clip;
use std::sync::Arc;

/// Asynchronous playback capability.
///
/// `play` hands the clip to the device and returns without waiting for the
/// sound to finish.
pub trait AudioOutput: Send + Sync {
    fn play(&self, clip: &Clip) -> Result<(), AudioError>;

    /// False when clips are discarded instead of reaching a device.
    fn is_audible(&self) -> bool {
        true
    }
}

impl<T: AudioOutput + ?Sized> AudioOutput for Arc<T> {
    fn play(&self, clip: &Clip) -> Result<(), AudioError> {
        (**self).play(clip)
    }

    fn is_audible(&self) -> bool {
        (**self).is_audible()
    }
}

impl<T: AudioOutput + ?Sized> AudioOutput for Box<T> {
    fn play(&self, clip: &Clip) -> Result<(), AudioError> {
        (**self).play(clip)
    }

    fn is_audible(&self) -> bool {
        (**self).is_audible()
    }
}

/// Discards everything. Used when no device is available or audio is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullOutput;

impl AudioOutput for NullOutput {
    fn play(&self, clip: &Clip) -> Result<(), AudioError> {
        log::debug!("discarding {} frames", clip.frames());
        Ok(())
    }

    fn is_audible(&self) -> bool {
        false
    }
}
