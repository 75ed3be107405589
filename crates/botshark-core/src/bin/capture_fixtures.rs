//! Writes the sample C2 capture used by the integration and CLI tests.
//!
//! Run from the workspace root: `cargo run -p botshark-core --bin capture_fixtures`.

use std::fs;
use std::path::{Path, PathBuf};

const ETHERTYPE_IPV4: u16 = 0x0800;
const ETHERTYPE_LOCAL_EXPERIMENTAL: u16 = 0x88B5;
const UDP_PROTO: u8 = 17;
const IPV4_HEADER_LEN: usize = 20;
const UDP_HEADER_LEN: usize = 8;

const PCAPNG_SHB: u32 = 0x0A0D_0D0A;
const PCAPNG_IDB: u32 = 1;
const PCAPNG_EPB: u32 = 6;
const PCAPNG_BYTE_ORDER_MAGIC: u32 = 0x1A2B_3C4D;
const LINKTYPE_ETHERNET: u16 = 1;

/// 2014-01-01T00:00:00Z, one packet per second from there.
const BASE_TS_SECONDS: u64 = 1_388_534_400;

const SALITY_PEER_EXCHANGE: &str = "390c17005d4d18a0c6950925e043f28e84d2145f7704e06e6f9a24";
const SALITY_PEER_EXCHANGE_CORRUPTED: &str =
    "390c17005d4d18a0c6950925e043f28e84d3145f7704e06e6f9a24";
const SALITY_HELLO: &str = "458b1f0042f0581cf4123909367ba172c0288a93b44ed9e59c1c17b20ae67d0abc861e";
const SALITY_HELLO_URLPACK: &str = concat!(
    "5ef2020229ef8d010a3ea621d7b100516ff69b6ca61a4ca996bb8e87e32fc3b7c526f6005ddd9ebb",
    "55f7277ddad1c0d74416d06819f90075f93bd35199a7062ea26634be4fa46e5df814e65ca1d24f8c",
    "c9705643926f7c07cdebadf51b10ad6ff9e97fe104f93c45e6c28978a45a520f5cf6209b4661a9c5",
    "9ec2b639efc2b7318932b0c978cc5a085e0076f7cbeff44290fc7f238cbe27b094a6615a4773f9f5",
    "34094824cc181c757756012eeac04448a4d2a18879caba161cf7ef358274440ef623f6ab82b9e51a",
    "f8ee3660a04420c94021eb4f8324c2cc086e78218fb0156daff325eead415533522f77d30942ce85",
    "62fa907dbf3b6113b562480df80d821488ee8dfacb383955554bd434797cf55efb53a669aedbc82d",
    "1b58411568d50cf36188a9412115143d3f305389c8246cd645dbe51a57685e293d66c0b3208339ff",
    "27d51e6dd1accfa114ab0cc0d187fa22c0fc3e198388e4ba3ffdcdc7621d74d7b9b3ba44ddba27b9",
    "85e54362881fcadae39aee7ab2e2cd01e8c6405698a2b47201dab49f2a9d7e98efe83ff6d0f8037b",
    "8e3863c04fdaf5bcf4cf6c6d8e2ff7c0dca86b90995f04e157a9a2820fa26a11db476762e4908c92",
    "134c941f9ca925278c12b8b635231ad64141aa202c06d2f7b950713b2ddd820ca1d0b99987a26f48",
    "f3ed0796dfaa6ac388949202cb82b72caf15e89ec86f48ad70a1b7c34a4fa1517010eee6c6c7",
);
const ZEROACCESS_GET_L: &str = "cc3a060828948dabc9c0d199a548bf8c";
const ZEROACCESS_RET_L: &str = concat!(
    "8561d77128948dbec9c0d1998381a3336a6dcfe223558fced5bbe7e3434a393addce06b9bd37e1e8",
    "fb61698741c080a334f52c63bd1f078ee84d3cde4e601838c298cf8e9d9f65e06567343ed5609281",
    "e199dbfdf99d4d069b6364f240693219f68a9bcc99bbcd64b72f6437fbf0329376b99ad87dddcf4c",
    "7fe26067656b3b33438e899819b3e9cc953e2c67edd2a23326034767",
);

struct Datagram {
    src: ([u8; 4], u16),
    dst: ([u8; 4], u16),
    payload: Vec<u8>,
}

fn main() -> Result<(), String> {
    let path = PathBuf::from("tests")
        .join("fixtures")
        .join("c2_sample")
        .join("input.pcapng");
    write_sample_capture(&path)
}

fn write_sample_capture(path: &Path) -> Result<(), String> {
    let sality_a = ([10, 0, 0, 1], 5000);
    let sality_b = ([10, 0, 0, 2], 7000);
    let sality_c = ([10, 0, 0, 3], 7001);
    let za_a = ([10, 0, 0, 4], 16471);
    let za_b = ([10, 0, 0, 5], 16471);
    let dns_a = ([10, 0, 0, 6], 53);
    let dns_b = ([10, 0, 0, 7], 53);

    let datagrams = [
        (sality_a, sality_b, SALITY_PEER_EXCHANGE),
        (sality_b, sality_a, SALITY_HELLO),
        (sality_c, sality_b, SALITY_HELLO_URLPACK),
        (za_a, za_b, ZEROACCESS_GET_L),
        (za_b, za_a, ZEROACCESS_RET_L),
        (dns_a, dns_b, "6e6f74206120626f746e6574206672616d652121"),
        (sality_a, sality_b, SALITY_PEER_EXCHANGE_CORRUPTED),
    ];

    let mut frames = Vec::new();
    for (src, dst, payload) in datagrams {
        let payload = hex::decode(payload).map_err(|err| format!("bad fixture hex: {err}"))?;
        frames.push(build_ipv4_udp_frame(&Datagram { src, dst, payload }));
    }
    frames.push(build_non_ip_frame());

    let packets: Vec<(u64, Vec<u8>)> = frames
        .into_iter()
        .enumerate()
        .map(|(idx, frame)| ((BASE_TS_SECONDS + idx as u64) * 1_000_000, frame))
        .collect();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| format!("failed to create {}: {}", parent.display(), err))?;
    }
    write_pcapng(path, &packets)
}

fn ethernet_header(ethertype: u16) -> Vec<u8> {
    let mut header = vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x06];
    header.extend_from_slice(&[0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f]);
    header.extend_from_slice(&ethertype.to_be_bytes());
    header
}

fn build_ipv4_udp_frame(datagram: &Datagram) -> Vec<u8> {
    let payload = &datagram.payload;
    let mut frame = ethernet_header(ETHERTYPE_IPV4);

    let total_len = (IPV4_HEADER_LEN + UDP_HEADER_LEN + payload.len()) as u16;
    let mut ip_header = [0u8; IPV4_HEADER_LEN];
    ip_header[0] = 0x45;
    ip_header[2..4].copy_from_slice(&total_len.to_be_bytes());
    ip_header[8] = 64;
    ip_header[9] = UDP_PROTO;
    ip_header[12..16].copy_from_slice(&datagram.src.0);
    ip_header[16..20].copy_from_slice(&datagram.dst.0);
    let checksum = ipv4_checksum(&ip_header);
    ip_header[10..12].copy_from_slice(&checksum.to_be_bytes());
    frame.extend_from_slice(&ip_header);

    let udp_len = (UDP_HEADER_LEN + payload.len()) as u16;
    frame.extend_from_slice(&datagram.src.1.to_be_bytes());
    frame.extend_from_slice(&datagram.dst.1.to_be_bytes());
    frame.extend_from_slice(&udp_len.to_be_bytes());
    frame.extend_from_slice(&0u16.to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// An Ethernet frame with no IP layer, skipped by the analysis.
fn build_non_ip_frame() -> Vec<u8> {
    let mut frame = ethernet_header(ETHERTYPE_LOCAL_EXPERIMENTAL);
    frame.extend_from_slice(&[0u8; 46]);
    frame
}

fn ipv4_checksum(header: &[u8; IPV4_HEADER_LEN]) -> u16 {
    let mut sum: u32 = header
        .chunks_exact(2)
        .map(|chunk| u32::from(u16::from_be_bytes([chunk[0], chunk[1]])))
        .sum();
    while (sum >> 16) != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}

fn write_pcapng(path: &Path, packets: &[(u64, Vec<u8>)]) -> Result<(), String> {
    let mut output = pcapng_block(PCAPNG_SHB, &section_header_body());
    output.extend_from_slice(&pcapng_block(PCAPNG_IDB, &interface_desc_body()));
    for (ts_us, data) in packets {
        output.extend_from_slice(&pcapng_block(PCAPNG_EPB, &enhanced_packet_body(*ts_us, data)));
    }
    fs::write(path, output).map_err(|err| format!("failed to write {}: {}", path.display(), err))
}

fn pcapng_block(block_type: u32, body: &[u8]) -> Vec<u8> {
    let total_len = (8 + body.len() + 4) as u32;
    let mut block = Vec::with_capacity(total_len as usize);
    block.extend_from_slice(&block_type.to_be_bytes());
    block.extend_from_slice(&total_len.to_be_bytes());
    block.extend_from_slice(body);
    block.extend_from_slice(&total_len.to_be_bytes());
    block
}

fn section_header_body() -> Vec<u8> {
    let mut body = PCAPNG_BYTE_ORDER_MAGIC.to_be_bytes().to_vec();
    body.extend_from_slice(&1u16.to_be_bytes());
    body.extend_from_slice(&0u16.to_be_bytes());
    body.extend_from_slice(&(-1i64).to_be_bytes());
    body
}

fn interface_desc_body() -> Vec<u8> {
    let mut body = LINKTYPE_ETHERNET.to_be_bytes().to_vec();
    body.extend_from_slice(&0u16.to_be_bytes());
    body.extend_from_slice(&65535u32.to_be_bytes());
    body
}

fn enhanced_packet_body(ts_us: u64, data: &[u8]) -> Vec<u8> {
    let cap_len = data.len() as u32;
    let mut body = Vec::new();
    body.extend_from_slice(&0u32.to_be_bytes());
    body.extend_from_slice(&((ts_us >> 32) as u32).to_be_bytes());
    body.extend_from_slice(&(ts_us as u32).to_be_bytes());
    body.extend_from_slice(&cap_len.to_be_bytes());
    body.extend_from_slice(&cap_len.to_be_bytes());
    body.extend_from_slice(data);
    body.resize(body.len() + (4 - data.len() % 4) % 4, 0);
    body
}
