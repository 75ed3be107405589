use std::net::{IpAddr, SocketAddr};

use etherparse::{NetSlice, SlicedPacket, TransportSlice};
use pcap_parser::Linktype;

use super::error::UdpError;
use super::reader::UdpReader;

/// A UDP datagram borrowed from its captured frame.
pub struct UdpPacket<'a> {
    pub src_ip: IpAddr,
    pub src_port: u16,
    pub dst_ip: IpAddr,
    pub dst_port: u16,
    pub payload: &'a [u8],
}

impl UdpPacket<'_> {
    pub fn src(&self) -> SocketAddr {
        SocketAddr::new(self.src_ip, self.src_port)
    }

    pub fn dst(&self) -> SocketAddr {
        SocketAddr::new(self.dst_ip, self.dst_port)
    }
}

/// Extract the UDP datagram carried by a link-layer frame.
///
/// Returns `Ok(None)` for frames that are not UDP or use an unsupported
/// linktype; only Ethernet and raw IP captures are sliced.
pub fn parse_udp_packet(
    linktype: Linktype,
    data: &[u8],
) -> Result<Option<UdpPacket<'_>>, UdpError> {
    let sliced = match linktype {
        Linktype::ETHERNET => {
            SlicedPacket::from_ethernet(data).map_err(|e| UdpError::Slice(e.to_string()))?
        }
        Linktype::RAW => SlicedPacket::from_ip(data).map_err(|e| UdpError::Slice(e.to_string()))?,
        _ => return Ok(None),
    };

    let net = sliced.net.ok_or(UdpError::MissingNetworkLayer)?;
    let Some(TransportSlice::Udp(udp)) = sliced.transport else {
        return Ok(None);
    };

    let (src_ip, dst_ip) = match net {
        NetSlice::Ipv4(ref ipv4) => (
            IpAddr::V4(ipv4.header().source_addr()),
            IpAddr::V4(ipv4.header().destination_addr()),
        ),
        NetSlice::Ipv6(ref ipv6) => (
            IpAddr::V6(ipv6.header().source_addr()),
            IpAddr::V6(ipv6.header().destination_addr()),
        ),
    };

    let ip_payload = net.ip_payload_ref().ok_or(UdpError::MissingIpPayload)?;
    let payload = UdpReader::new(ip_payload.payload).payload_without_header()?;

    Ok(Some(UdpPacket {
        src_ip,
        src_port: udp.source_port(),
        dst_ip,
        dst_port: udp.destination_port(),
        payload,
    }))
}
