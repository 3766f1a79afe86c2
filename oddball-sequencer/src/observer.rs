use oddball_core::Tone;

pub type ObserverError = Box<dyn std::error::Error + Send + Sync>;

/// What an observer learns about each presentation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StimulusOnset {
    /// Position in the sequence.
    pub index: usize,
    pub tone: Tone,
    /// Sequencer timer reading taken right before notification.
    pub timestamp_ns: u64,
}

/// Notified on every stimulus, on the sequencer's thread, just before the
/// clip is handed to the audio output. Sits on the latency-critical path, so
/// implementations must return quickly. An error aborts the run.
pub trait StimulusObserver: Send + Sync {
    fn on_stimulus(&self, onset: &StimulusOnset) -> Result<(), ObserverError>;
}

impl<F> StimulusObserver for F
where
    F: Fn(&StimulusOnset) -> Result<(), ObserverError> + Send + Sync,
{
    fn on_stimulus(&self, onset: &StimulusOnset) -> Result<(), ObserverError> {
        self(onset)
    }
}
