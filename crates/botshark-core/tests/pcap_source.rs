use std::fs;
use std::path::PathBuf;

use botshark_core::{PacketSource, PcapFileSource, SourceError};
use etherparse::PacketBuilder;
use pcap_parser::Linktype;

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

fn sample_capture() -> PathBuf {
    repo_root()
        .join("tests")
        .join("fixtures")
        .join("c2_sample")
        .join("input.pcapng")
}

fn legacy_pcap(frames: &[(u32, u32, Vec<u8>)]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0xa1b2_c3d4u32.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&4u16.to_le_bytes());
    out.extend_from_slice(&0i32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&65535u32.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes());
    for (sec, usec, data) in frames {
        out.extend_from_slice(&sec.to_le_bytes());
        out.extend_from_slice(&usec.to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(data);
    }
    out
}

#[test]
fn pcapng_fixture_yields_every_frame_in_order() {
    let mut source = PcapFileSource::open(&sample_capture()).unwrap();

    let mut timestamps = Vec::new();
    while let Some(event) = source.next_packet().unwrap() {
        assert_eq!(event.linktype, Linktype::ETHERNET);
        timestamps.push(event.ts.unwrap());
    }

    assert_eq!(timestamps.len(), 8);
    assert!(timestamps.windows(2).all(|pair| pair[1] - pair[0] == 1.0));
    assert_eq!(timestamps[0], 1_388_534_400.0);
}

#[test]
fn legacy_pcap_is_read_with_microsecond_timestamps() {
    let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12])
        .ipv4([10, 0, 0, 1], [10, 0, 0, 2], 64)
        .udp(5000, 7000);
    let payload = [0u8; 12];
    let mut packet = Vec::with_capacity(builder.size(payload.len()));
    builder.write(&mut packet, &payload).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.pcap");
    fs::write(&path, legacy_pcap(&[(10, 500_000, packet.clone())])).unwrap();

    let mut source = PcapFileSource::open(&path).unwrap();
    let event = source.next_packet().unwrap().expect("one packet");
    assert_eq!(event.ts, Some(10.5));
    assert_eq!(event.linktype, Linktype::ETHERNET);
    assert_eq!(event.data, packet);
    assert!(source.next_packet().unwrap().is_none());
}

#[test]
fn pcap_source_rejects_truncated_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("truncated.pcapng");
    fs::write(&path, [0x0a, 0x0d, 0x0d]).unwrap();

    let err = match PcapFileSource::open(&path) {
        Ok(_) => panic!("expected truncated file to be rejected"),
        Err(err) => err,
    };
    assert!(matches!(err, SourceError::Io(_)));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = PcapFileSource::open(&dir.path().join("absent.pcapng"));
    assert!(matches!(result, Err(SourceError::Io(_))));
}
