//! Lab Streaming Layer outlet for markers.
//!
//! Recorders on the network resolve the outlet by name, type or source id
//! and receive one string sample per marker, timestamped by liblsl.

use crate::error::{MarkerError, Result};
use crate::sink::MarkerSink;
use crate::stream::StreamInfo;
use lsl::{ChannelFormat, Pushable, StreamOutlet};
use oddball_core::Marker;

/// Outlet buffer bound; liblsl counts it in hundreds of samples for irregular streams.
const MAX_BUFFERED: i32 = 360;

/// Irregular-rate, single-channel string outlet.
pub struct LslMarkerOutlet {
    outlet: StreamOutlet,
}

impl LslMarkerOutlet {
    pub fn open(info: &StreamInfo) -> Result<Self> {
        let lsl_info = lsl::StreamInfo::new(
            &info.name,
            &info.stream_type,
            1,
            lsl::IRREGULAR_RATE,
            ChannelFormat::String,
            &info.source_id,
        )
        .map_err(|e| MarkerError::Outlet(format!("stream info: {e:?}")))?;
        let outlet = StreamOutlet::new(&lsl_info, 1, MAX_BUFFERED)
            .map_err(|e| MarkerError::Outlet(format!("creating outlet: {e:?}")))?;
        log::info!(
            "LSL outlet '{}' ({}, {}) is live",
            info.name,
            info.stream_type,
            info.source_id
        );
        Ok(Self { outlet })
    }
}

impl MarkerSink for LslMarkerOutlet {
    fn name(&self) -> &str {
        "lsl"
    }

    fn publish(&mut self, marker: &Marker) -> Result<()> {
        self.outlet
            .push_sample(&vec![marker.stream_sample()])
            .map_err(|e| MarkerError::Outlet(format!("push: {e:?}")))
    }
}
