use crate::error::Result;
use crate::sink::MarkerSink;
use oddball_core::Marker;
use serde::{Deserialize, Serialize};
use std::net::{SocketAddr, UdpSocket};

/// Identity of the marker stream, announced with every sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub stream_type: String,
    pub source_id: String,
}

impl StreamInfo {
    pub fn markers(name: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stream_type: "Markers".into(),
            source_id: source_id.into(),
        }
    }
}

/// One datagram on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamPacket {
    #[serde(flatten)]
    pub info: StreamInfo,
    pub sample: String,
}

/// Publishes each marker as a JSON datagram to a fixed address.
///
/// Used when the `lsl` feature is off or the outlet cannot be created.
pub struct UdpMarkerStream {
    socket: UdpSocket,
    target: SocketAddr,
    info: StreamInfo,
}

impl UdpMarkerStream {
    pub fn open(info: StreamInfo, target: SocketAddr) -> Result<Self> {
        let bind: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(bind)?;
        if target.ip().is_multicast() {
            if let SocketAddr::V4(_) = target {
                socket.set_multicast_ttl_v4(1)?;
            }
        }
        log::info!(
            "Marker stream '{}' ({}) publishing to {}",
            info.name,
            info.source_id,
            target
        );
        Ok(Self {
            socket,
            target,
            info,
        })
    }
}

impl MarkerSink for UdpMarkerStream {
    fn name(&self) -> &str {
        "stream"
    }

    fn publish(&mut self, marker: &Marker) -> Result<()> {
        let packet = StreamPacket {
            info: self.info.clone(),
            sample: marker.stream_sample(),
        };
        let bytes = serde_json::to_vec(&packet)?;
        self.socket.send_to(&bytes, self.target)?;
        Ok(())
    }
}
