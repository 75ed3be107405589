//! Capture analysis.
//!
//! Every UDP payload in a capture is offered to each enabled dissector.
//! Accepted payloads become message records and feed the flow and peer
//! aggregates; rejected attempts are only counted, by error kind.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;
use tracing::{debug, info, trace};

use crate::protocols::Protocol;
use crate::source::{PacketEvent, PacketSource, PcapFileSource, SourceError};
use crate::{CaptureSummary, DEFAULT_GENERATED_AT, Report, make_stub_report};

mod flows;
mod peers;
mod records;
mod udp;

use flows::{FlowKey, FlowStats, add_flow_stats, build_flow_summaries};
use peers::{PeerBook, add_advertised_peers, build_peer_summaries};
use records::{Rejections, message_record, ts_to_rfc3339};
use udp::parse_udp_packet;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
}

/// Which dissectors are attempted on each UDP payload.
///
/// # Examples
/// ```
/// use botshark_core::{Protocol, ProtocolSet};
///
/// let only: ProtocolSet = "zeroaccess".parse()?;
/// assert!(only.contains(Protocol::ZeroAccess));
/// assert!(!only.contains(Protocol::Sality));
/// assert_eq!("all".parse::<ProtocolSet>()?, ProtocolSet::ALL);
/// # Ok::<(), String>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolSet {
    sality: bool,
    zeroaccess: bool,
}

impl ProtocolSet {
    pub const ALL: ProtocolSet = ProtocolSet {
        sality: true,
        zeroaccess: true,
    };

    pub fn only(protocol: Protocol) -> Self {
        Self {
            sality: protocol == Protocol::Sality,
            zeroaccess: protocol == Protocol::ZeroAccess,
        }
    }

    pub fn contains(self, protocol: Protocol) -> bool {
        match protocol {
            Protocol::Sality => self.sality,
            Protocol::ZeroAccess => self.zeroaccess,
        }
    }

    /// Enabled protocols in stable order.
    pub fn iter(self) -> impl Iterator<Item = Protocol> {
        Protocol::ALL
            .into_iter()
            .filter(move |protocol| self.contains(*protocol))
    }
}

impl Default for ProtocolSet {
    fn default() -> Self {
        Self::ALL
    }
}

impl fmt::Display for ProtocolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::ALL {
            return f.write_str("all");
        }
        let names: Vec<&str> = self.iter().map(Protocol::as_str).collect();
        f.write_str(&names.join(","))
    }
}

impl FromStr for ProtocolSet {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.eq_ignore_ascii_case("all") {
            return Ok(Self::ALL);
        }
        value.parse::<Protocol>().map(Self::only)
    }
}

/// Analysis options.
#[derive(Debug, Clone, Default)]
pub struct AnalysisConfig {
    pub protocols: ProtocolSet,
}

pub fn analyze_pcap_file(path: &Path, config: &AnalysisConfig) -> Result<Report, AnalysisError> {
    let source = PcapFileSource::open(path)?;
    analyze_source(path, source, config)
}

pub fn analyze_source<S: PacketSource>(
    path: &Path,
    mut source: S,
    config: &AnalysisConfig,
) -> Result<Report, AnalysisError> {
    let mut summary = CaptureSummary::default();
    let mut first_ts = None;
    let mut last_ts = None;
    let mut messages = Vec::new();
    let mut rejections = Rejections::default();
    let mut flow_stats: HashMap<FlowKey, FlowStats> = HashMap::new();
    let mut peer_book = PeerBook::new();

    while let Some(PacketEvent { ts, linktype, data }) = source.next_packet()? {
        let index = summary.packets_total;
        summary.packets_total += 1;
        update_ts_bounds(&mut first_ts, &mut last_ts, ts);

        let udp = match parse_udp_packet(linktype, &data) {
            Ok(Some(udp)) => udp,
            Ok(None) => continue,
            Err(err) => {
                trace!(index, error = %err, "frame not sliced");
                continue;
            }
        };
        summary.udp_packets += 1;

        let mut accepted = false;
        for protocol in config.protocols.iter() {
            match protocol.decode(udp.payload) {
                Ok(message) => {
                    accepted = true;
                    add_flow_stats(&mut flow_stats, protocol, &udp);
                    add_advertised_peers(
                        &mut peer_book,
                        protocol,
                        &udp.src().to_string(),
                        &message.peers,
                    );
                    messages.push(message_record(index, ts, &udp, message));
                }
                Err(err) => {
                    debug!(index, %protocol, kind = ?err.kind(), error = %err, "payload rejected");
                    rejections.record(&err);
                }
            }
        }
        if !accepted {
            summary.rejected_payloads += 1;
        }
    }

    summary.decoded_messages = messages.len() as u64;
    summary.rejections = rejections.into_counts();
    summary.time_start = ts_to_rfc3339(first_ts);
    summary.time_end = ts_to_rfc3339(last_ts);
    info!(
        packets = summary.packets_total,
        udp = summary.udp_packets,
        decoded = summary.decoded_messages,
        rejected = summary.rejected_payloads,
        "capture analysed"
    );

    let duration_s = match (first_ts, last_ts) {
        (Some(start), Some(end)) if end > start => Some(end - start),
        _ => None,
    };

    let mut report = make_stub_report(&path.display().to_string(), path.metadata()?.len());
    report.generated_at = summary
        .time_end
        .clone()
        .or_else(|| summary.time_start.clone())
        .unwrap_or_else(|| DEFAULT_GENERATED_AT.to_string());
    report.capture_summary = Some(summary);
    report.messages = messages;
    report.flows = build_flow_summaries(flow_stats, duration_s);
    report.peers = build_peer_summaries(peer_book);
    Ok(report)
}

fn update_ts_bounds(first: &mut Option<f64>, last: &mut Option<f64>, ts: Option<f64>) {
    let Some(ts) = ts else {
        return;
    };
    if first.is_none_or(|existing| ts < existing) {
        *first = Some(ts);
    }
    if last.is_none_or(|existing| ts > existing) {
        *last = Some(ts);
    }
}

#[cfg(test)]
mod tests {
    use super::{ProtocolSet, update_ts_bounds};
    use crate::Protocol;

    #[test]
    fn ts_bounds_track_min_and_max() {
        let mut first = None;
        let mut last = None;
        for ts in [Some(5.0), None, Some(2.0), Some(9.5), Some(3.0)] {
            update_ts_bounds(&mut first, &mut last, ts);
        }
        assert_eq!(first, Some(2.0));
        assert_eq!(last, Some(9.5));
    }

    #[test]
    fn protocol_set_iterates_in_stable_order() {
        let all: Vec<Protocol> = ProtocolSet::ALL.iter().collect();
        assert_eq!(all, vec![Protocol::Sality, Protocol::ZeroAccess]);
        let only: Vec<Protocol> = ProtocolSet::only(Protocol::Sality).iter().collect();
        assert_eq!(only, vec![Protocol::Sality]);
    }

    #[test]
    fn protocol_set_parses_and_displays() {
        assert_eq!("ALL".parse::<ProtocolSet>().unwrap(), ProtocolSet::ALL);
        assert_eq!(
            "sality".parse::<ProtocolSet>().unwrap(),
            ProtocolSet::only(Protocol::Sality)
        );
        assert!("conficker".parse::<ProtocolSet>().is_err());
        assert_eq!(ProtocolSet::ALL.to_string(), "all");
        assert_eq!(ProtocolSet::only(Protocol::ZeroAccess).to_string(), "zeroaccess");
    }
}
