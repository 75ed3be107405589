use std::collections::BTreeMap;

use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::protocols::{DecodedMessage, DissectError, DissectErrorKind};
use crate::MessageRecord;

use super::udp::UdpPacket;

pub(crate) fn message_record(
    index: u64,
    ts: Option<f64>,
    packet: &UdpPacket<'_>,
    message: DecodedMessage,
) -> MessageRecord {
    MessageRecord {
        index,
        ts: ts_to_rfc3339(ts),
        src: packet.src().to_string(),
        dst: packet.dst().to_string(),
        message,
    }
}

/// Failed dissection attempts by error kind.
#[derive(Debug, Default)]
pub(crate) struct Rejections {
    by_kind: BTreeMap<DissectErrorKind, u64>,
}

impl Rejections {
    pub(crate) fn record(&mut self, err: &DissectError) {
        *self.by_kind.entry(err.kind()).or_default() += 1;
    }

    pub(crate) fn into_counts(self) -> BTreeMap<DissectErrorKind, u64> {
        self.by_kind
    }
}

pub(crate) fn ts_to_rfc3339(ts: Option<f64>) -> Option<String> {
    let ts = ts?;
    let nanos = (ts * 1_000_000_000.0) as i128;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
}

#[cfg(test)]
mod tests {
    use super::{Rejections, message_record, ts_to_rfc3339};
    use crate::analysis::udp::UdpPacket;
    use crate::protocols::{DissectError, DissectErrorKind, Protocol};

    #[test]
    fn record_carries_endpoints_and_message() {
        let payload = hex::decode("cc3a060828948dabc9c0d199a548bf8c").unwrap();
        let packet = UdpPacket {
            src_ip: "10.0.0.4".parse().unwrap(),
            src_port: 16471,
            dst_ip: "10.0.0.5".parse().unwrap(),
            dst_port: 16471,
            payload: &payload,
        };
        let decoded = Protocol::ZeroAccess.decode(packet.payload).unwrap();
        let record = message_record(3, Some(3.0), &packet, decoded);

        assert_eq!(record.index, 3);
        assert_eq!(record.ts.as_deref(), Some("1970-01-01T00:00:03Z"));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["src"], "10.0.0.4:16471");
        assert_eq!(json["protocol"], "zeroaccess");
        assert_eq!(json["command"], "getL");
        assert_eq!(json["fields"]["flag"], 0);
        assert_eq!(json["fields"]["payload"], "36c91cbf");
    }

    #[test]
    fn rejections_count_by_kind() {
        let mut rejections = Rejections::default();
        rejections.record(&DissectError::TooShort {
            needed: 10,
            actual: 3,
        });
        rejections.record(&DissectError::TooShort {
            needed: 16,
            actual: 3,
        });
        rejections.record(&DissectError::MalformedPayload("unaligned".to_string()));

        let counts = rejections.into_counts();
        assert_eq!(counts[&DissectErrorKind::TooShort], 2);
        assert_eq!(counts[&DissectErrorKind::MalformedPayload], 1);
        assert!(!counts.contains_key(&DissectErrorKind::ChecksumMismatch));
    }

    #[test]
    fn missing_timestamp_stays_missing() {
        assert_eq!(ts_to_rfc3339(None), None);
        assert_eq!(
            ts_to_rfc3339(Some(1.5)).as_deref(),
            Some("1970-01-01T00:00:01.5Z")
        );
    }
}
