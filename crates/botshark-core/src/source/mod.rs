//! Packet sources feeding the capture analysis.
//!
//! Sources own all file I/O; they hand out link-layer frames with their
//! capture timestamp and leave every protocol concern to `analysis`.

mod pcap;

pub use pcap::PcapFileSource;

use pcap_parser::Linktype;
use thiserror::Error;

/// One captured link-layer frame.
#[derive(Debug, Clone)]
pub struct PacketEvent {
    /// Capture time in seconds since the Unix epoch.
    pub ts: Option<f64>,
    pub linktype: Linktype,
    pub data: Vec<u8>,
}

/// A pull-based stream of captured frames, in capture order.
pub trait PacketSource {
    /// Next frame, or `None` once the source is exhausted.
    fn next_packet(&mut self) -> Result<Option<PacketEvent>, SourceError>;
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PCAP parse error: {0}")]
    Pcap(String),
}

impl From<pcap::error::PcapSourceError> for SourceError {
    fn from(value: pcap::error::PcapSourceError) -> Self {
        match value {
            pcap::error::PcapSourceError::Io(err) => SourceError::Io(err),
            pcap::error::PcapSourceError::Pcap { context, message } => {
                SourceError::Pcap(format!("{context}: {message}"))
            }
        }
    }
}
