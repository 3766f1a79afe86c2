pub mod marker;
pub mod stimulus;

pub use marker::Marker;
pub use stimulus::{Stimulus, Tone, ToneRole};
