use std::collections::HashMap;
use std::net::SocketAddr;

use crate::{FlowSummary, Protocol};

use super::udp::UdpPacket;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct FlowKey {
    pub protocol: Protocol,
    pub src: SocketAddr,
    pub dst: SocketAddr,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct FlowStats {
    pub packets: u64,
    pub bytes: u64,
}

/// Count one dissected datagram against its flow.
pub(crate) fn add_flow_stats(
    stats: &mut HashMap<FlowKey, FlowStats>,
    protocol: Protocol,
    packet: &UdpPacket<'_>,
) {
    let key = FlowKey {
        protocol,
        src: packet.src(),
        dst: packet.dst(),
    };
    let entry = stats.entry(key).or_default();
    entry.packets += 1;
    entry.bytes += packet.payload.len() as u64;
}

/// Flow summaries ordered by protocol, then source and destination address.
///
/// Rates are only reported when the capture spans a positive duration.
pub(crate) fn build_flow_summaries(
    stats: HashMap<FlowKey, FlowStats>,
    duration_s: Option<f64>,
) -> Vec<FlowSummary> {
    let mut flows: Vec<(FlowKey, FlowStats)> = stats.into_iter().collect();
    flows.sort_by_key(|(key, _)| *key);

    flows
        .into_iter()
        .map(|(key, stats)| {
            let (pps, bps) = match duration_s {
                Some(d) => (
                    Some(stats.packets as f64 / d),
                    Some(stats.bytes as f64 / d),
                ),
                None => (None, None),
            };
            FlowSummary {
                protocol: key.protocol,
                src: key.src.to_string(),
                dst: key.dst.to_string(),
                packets: stats.packets,
                bytes: stats.bytes,
                pps,
                bps,
            }
        })
        .collect()
}
