pub mod error;
pub mod output;
#[cfg(feature = "rodio")]
pub mod rodio_output;
pub mod synth;

pub use error::AudioError;
pub use output::{AudioOutput, NullOutput};
#[cfg(feature = "rodio")]
pub use rodio_output::{OutputStream, RodioOutput};
pub use synth::{Clip, Waveshape, synthesize, DEFAULT_SAMPLE_RATE};
