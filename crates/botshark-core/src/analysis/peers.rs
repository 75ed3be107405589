use std::collections::{BTreeMap, BTreeSet};

use crate::{PeerSummary, Protocol};

#[derive(Debug, Default)]
pub(crate) struct PeerStats {
    pub sightings: u64,
    pub advertised_by: BTreeSet<String>,
}

/// Advertised peers keyed by protocol and address, in report order.
pub(crate) type PeerBook = BTreeMap<(Protocol, String), PeerStats>;

pub(crate) fn add_advertised_peers(
    book: &mut PeerBook,
    protocol: Protocol,
    advertiser: &str,
    peers: &[String],
) {
    for peer in peers {
        let entry = book.entry((protocol, peer.clone())).or_default();
        entry.sightings += 1;
        entry.advertised_by.insert(advertiser.to_string());
    }
}

pub(crate) fn build_peer_summaries(book: PeerBook) -> Vec<PeerSummary> {
    book.into_iter()
        .map(|((protocol, address), stats)| PeerSummary {
            protocol,
            address,
            sightings: stats.sightings,
            advertised_by: stats.advertised_by.into_iter().collect(),
        })
        .collect()
}
