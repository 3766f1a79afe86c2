use crate::error::Result;
use oddball_core::Marker;
use std::sync::{Arc, Mutex, PoisonError};

/// Destination for published markers. Sinks are owned by the marker worker
/// and only ever called from its thread.
pub trait MarkerSink: Send {
    fn name(&self) -> &str;
    fn publish(&mut self, marker: &Marker) -> Result<()>;
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Keeps markers in memory; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    markers: Arc<Mutex<Vec<Marker>>>,
}

impl MemorySink {
    pub fn markers(&self) -> Vec<Marker> {
        self.markers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.markers().into_iter().map(|m| m.message).collect()
    }
}

impl MarkerSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn publish(&mut self, marker: &Marker) -> Result<()> {
        self.markers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(marker.clone());
        Ok(())
    }
}
