pub mod csv_log;
pub mod error;
#[cfg(feature = "lsl")]
pub mod lsl_outlet;
pub mod sink;
pub mod stream;
pub mod worker;

pub use csv_log::CsvMarkerLog;
pub use error::{MarkerError, Result};
#[cfg(feature = "lsl")]
pub use lsl_outlet::LslMarkerOutlet;
pub use sink::{MarkerSink, MemorySink};
pub use stream::{StreamInfo, UdpMarkerStream};
pub use worker::{MarkerSender, MarkerWorker, MetricsSnapshot};
