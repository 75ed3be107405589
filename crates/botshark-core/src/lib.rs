//! BotShark core library: offline dissection of Sality v3 and ZeroAccess
//! peer-to-peer command-and-control traffic.
//!
//! The crate is layered bottom-up: `primitives` (RC4, rotating XOR, CRC16,
//! CRC32) feed the protocol dissectors in `protocols`, which turn a raw UDP
//! payload into a checksum-validated message with typed accessors. The
//! capture pipeline (`source` -> `analysis`) drives those dissectors over
//! PCAP/PCAPNG files and aggregates the results into a deterministic report.
//! Dissectors are pure; all I/O is isolated in `source`.
//!
//! Invariants:
//! - A message value exists only after its checksum has been verified.
//! - Report outputs are deterministic and stable across runs.
//!
//! # Examples
//! ```
//! use botshark_core::{Message, ZeroAccessMessage};
//!
//! let frame = hex::decode("cc3a060828948dabc9c0d199a548bf8c")?;
//! let msg = ZeroAccessMessage::parse(&frame)?;
//! assert_eq!(msg.command_name()?, "getL");
//! assert_eq!(msg.checksum(), 1_852_984_062);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ```no_run
//! use std::path::Path;
//!
//! use botshark_core::{AnalysisConfig, analyze_pcap_file};
//!
//! let report = analyze_pcap_file(Path::new("capture.pcapng"), &AnalysisConfig::default())?;
//! println!("decoded {} messages", report.messages.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

mod analysis;
pub mod primitives;
pub mod protocols;
mod source;

pub use analysis::{AnalysisConfig, AnalysisError, ProtocolSet, analyze_pcap_file, analyze_source};
pub use protocols::{
    DecodedMessage, DissectError, DissectErrorKind, Message, Protocol, SalityMessage,
    ZeroAccessMessage, sality, zeroaccess,
};
pub use source::{PacketEvent, PacketSource, PcapFileSource, SourceError};

/// Current report schema version.
pub const REPORT_VERSION: u32 = 1;
/// Default timestamp used when no capture time is available.
pub const DEFAULT_GENERATED_AT: &str = "1970-01-01T00:00:00Z";

/// Aggregated analysis report with deterministic ordering.
///
/// # Examples
/// ```
/// use botshark_core::make_stub_report;
///
/// let report = make_stub_report("capture.pcapng", 123);
/// assert_eq!(report.report_version, botshark_core::REPORT_VERSION);
/// assert!(report.messages.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Report schema version (not the binary version).
    pub report_version: u32,
    pub tool: ToolInfo,
    /// RFC3339 timestamp of the last packet, or the Unix epoch.
    pub generated_at: String,
    pub input: InputInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_summary: Option<CaptureSummary>,
    /// Dissected messages in capture order.
    pub messages: Vec<MessageRecord>,
    /// C2 flows sorted by protocol, source, destination.
    pub flows: Vec<FlowSummary>,
    /// Advertised peers sorted by protocol, address.
    pub peers: Vec<PeerSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

/// Input capture metadata embedded in reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputInfo {
    /// Input path as provided to the analyzer.
    pub path: String,
    /// Input size in bytes.
    pub bytes: u64,
}

/// Capture-wide counters.
///
/// `rejected_payloads` counts UDP payloads that no enabled dissector
/// accepted; `rejections` breaks every failed dissection attempt down by
/// error kind, so one payload tried against two protocols counts twice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptureSummary {
    pub packets_total: u64,
    pub udp_packets: u64,
    pub decoded_messages: u64,
    pub rejected_payloads: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub rejections: BTreeMap<DissectErrorKind, u64>,
    /// RFC3339 timestamp of the first packet (if known).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_start: Option<String>,
    /// RFC3339 timestamp of the last packet (if known).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_end: Option<String>,
}

/// One dissected message and where it was seen.
///
/// # Examples
/// ```
/// use botshark_core::{MessageRecord, Protocol};
///
/// let decoded = Protocol::Sality
///     .decode(&hex::decode("390c17005d4d18a0c6950925e043f28e84d2145f7704e06e6f9a24")?)?;
/// let record = MessageRecord {
///     index: 0,
///     ts: None,
///     src: "10.0.0.1:5000".to_string(),
///     dst: "10.0.0.2:7000".to_string(),
///     message: decoded,
/// };
/// let json = serde_json::to_value(&record)?;
/// assert_eq!(json["protocol"], "sality");
/// assert_eq!(json["command"], "Peer Exchange");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Zero-based packet index within the capture.
    pub index: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
    /// Source endpoint in `ip:port` form.
    pub src: String,
    /// Destination endpoint in `ip:port` form.
    pub dst: String,
    #[serde(flatten)]
    pub message: DecodedMessage,
}

/// Per (source, destination, protocol) C2 traffic totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowSummary {
    pub protocol: Protocol,
    pub src: String,
    pub dst: String,
    pub packets: u64,
    /// UDP payload bytes.
    pub bytes: u64,
    /// Packets per second over the capture duration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pps: Option<f64>,
    /// Bytes per second over the capture duration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bps: Option<f64>,
}

/// A peer endpoint advertised inside decoded messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerSummary {
    pub protocol: Protocol,
    /// `ip:port` for Sality, `ip` for ZeroAccess.
    pub address: String,
    /// How many times the peer was advertised.
    pub sightings: u64,
    /// Sorted endpoints that advertised the peer.
    pub advertised_by: Vec<String>,
}

/// Build a stub report with base fields filled and empty aggregates.
pub fn make_stub_report(input_path: &str, input_bytes: u64) -> Report {
    Report {
        report_version: REPORT_VERSION,
        tool: ToolInfo {
            name: "botshark".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        generated_at: DEFAULT_GENERATED_AT.to_string(),
        input: InputInfo {
            path: input_path.to_string(),
            bytes: input_bytes,
        },
        capture_summary: None,
        messages: vec![],
        flows: vec![],
        peers: vec![],
    }
}
