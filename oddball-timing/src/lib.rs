pub mod stats;
pub mod timer;

pub use stats::DwellStats;
pub use timer::{HighPrecisionTimer, Timer};
