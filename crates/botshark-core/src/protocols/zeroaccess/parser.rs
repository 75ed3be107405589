use std::fmt;
use std::net::Ipv4Addr;

use serde::Serialize;

use super::layout;
use super::reader::ZeroAccessReader;
use crate::primitives::{crc32_parts, rotating_xor};
use crate::protocols::common::{serialize_hex, truncated};
use crate::protocols::error::DissectError;
use crate::protocols::{Message, Protocol};

/// ZeroAccess command tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZeroAccessCommand {
    /// Peer list request.
    GetL,
    /// Peer list reply.
    RetL,
}

impl ZeroAccessCommand {
    pub fn name(self) -> &'static str {
        match self {
            ZeroAccessCommand::GetL => "getL",
            ZeroAccessCommand::RetL => "retL",
        }
    }

    /// Tag bytes as they appear in the decrypted buffer.
    pub fn tag(self) -> [u8; 4] {
        match self {
            ZeroAccessCommand::GetL => layout::CMD_GET_L,
            ZeroAccessCommand::RetL => layout::CMD_RET_L,
        }
    }
}

impl TryFrom<[u8; 4]> for ZeroAccessCommand {
    type Error = DissectError;

    fn try_from(value: [u8; 4]) -> Result<Self, Self::Error> {
        match value {
            layout::CMD_GET_L => Ok(ZeroAccessCommand::GetL),
            layout::CMD_RET_L => Ok(ZeroAccessCommand::RetL),
            other => Err(DissectError::UnknownCommand(format!(
                "zeroaccess command 0x{}",
                hex::encode(other)
            ))),
        }
    }
}

/// Structured view of a ZeroAccess message.
#[derive(Debug, Clone, Serialize)]
pub struct ZeroAccessFields {
    pub checksum: u32,
    /// Command name, or the raw tag in hex when unknown.
    pub command: String,
    pub flag: u32,
    #[serde(serialize_with = "serialize_hex")]
    pub payload: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peers: Option<Vec<Ipv4Addr>>,
}

/// A checksum-validated ZeroAccess message.
///
/// The stored buffer is fully decrypted: `checksum ‖ command ‖ flag ‖ payload`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZeroAccessMessage {
    data: Vec<u8>,
}

impl ZeroAccessMessage {
    pub fn checksum(&self) -> u32 {
        u32::from_le_bytes(self.word(layout::CHECKSUM_RANGE.start))
    }

    /// Raw command tag.
    pub fn command_bytes(&self) -> [u8; 4] {
        self.word(layout::COMMAND_RANGE.start)
    }

    pub fn command(&self) -> Result<ZeroAccessCommand, DissectError> {
        ZeroAccessCommand::try_from(self.command_bytes())
    }

    pub fn flag(&self) -> u32 {
        u32::from_le_bytes(self.word(layout::FLAG_RANGE.start))
    }

    pub fn payload(&self) -> &[u8] {
        &self.data[layout::PAYLOAD_OFFSET..]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Peer addresses carried by a retL reply, in buffer order.
    ///
    /// # Errors
    /// `UnknownCommand` for an unrecognized tag, `InvalidOperation` for getL,
    /// `MalformedPayload` when the declared count runs past the payload.
    pub fn decode_peer_list(&self) -> Result<Vec<Ipv4Addr>, DissectError> {
        match self.command()? {
            ZeroAccessCommand::RetL => ZeroAccessReader::new(self.payload())
                .read_peers()
                .map_err(truncated("peer list")),
            other => Err(DissectError::InvalidOperation(format!(
                "peer list is only carried by retL, not {}",
                other.name()
            ))),
        }
    }

    /// Space-separated `0xNN` dump of the decrypted buffer.
    pub fn hex_dump(&self) -> String {
        self.data
            .iter()
            .map(|byte| format!("{byte:#04x}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn word(&self, offset: usize) -> [u8; 4] {
        let mut word = [0u8; 4];
        word.copy_from_slice(&self.data[offset..offset + 4]);
        word
    }

    fn command_label(&self) -> String {
        match self.command() {
            Ok(command) => command.name().to_string(),
            Err(_) => format!("0x{}", hex::encode(self.command_bytes())),
        }
    }
}

impl Message for ZeroAccessMessage {
    const PROTOCOL: Protocol = Protocol::ZeroAccess;

    type Fields = ZeroAccessFields;

    /// # Errors
    /// `TooShort` below 16 bytes, `MalformedPayload` when the length is not
    /// a whole number of 4-byte words, `ChecksumMismatch` when the CRC32 of
    /// the decrypted buffer (checksum field zeroed) differs from the
    /// embedded one.
    fn parse(buffer: &[u8]) -> Result<Self, DissectError> {
        ZeroAccessReader::new(buffer).require_len(layout::MIN_LEN)?;

        let data = rotating_xor(buffer, layout::XOR_KEY)?;
        let reader = ZeroAccessReader::new(&data);
        let embedded = reader.read_checksum()?;
        let computed = crc32_parts(&[&layout::ZEROED_CHECKSUM[..], reader.read_checksummed()?]);
        if embedded != computed {
            return Err(DissectError::checksum_mismatch(&embedded, &computed));
        }
        Ok(Self { data })
    }

    fn command_name(&self) -> Result<&'static str, DissectError> {
        self.command().map(ZeroAccessCommand::name)
    }

    fn raw_len(&self) -> usize {
        self.data.len()
    }

    fn fields(&self) -> Result<ZeroAccessFields, DissectError> {
        let peers = match self.command() {
            Ok(ZeroAccessCommand::RetL) => Some(self.decode_peer_list()?),
            _ => None,
        };
        Ok(ZeroAccessFields {
            checksum: self.checksum(),
            command: self.command_label(),
            flag: self.flag(),
            payload: self.payload().to_vec(),
            peers,
        })
    }

    fn advertised_peers(&self) -> Vec<String> {
        self.decode_peer_list()
            .map(|peers| peers.iter().map(ToString::to_string).collect())
            .unwrap_or_default()
    }
}

impl fmt::Display for ZeroAccessMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Checksum: {:#x}, Command: {}, Flag: {:#x}, Payload: 0x{}",
            self.checksum(),
            self.command_label(),
            self.flag(),
            hex::encode(self.payload())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{ZeroAccessCommand, ZeroAccessMessage};
    use crate::primitives::{crc32_parts, rotating_xor};
    use crate::protocols::Message;
    use crate::protocols::error::{DissectError, DissectErrorKind};
    use crate::protocols::zeroaccess::layout;

    const GET_L: &str = "cc3a060828948dabc9c0d199a548bf8c";

    /// Checksum and encrypt a plaintext message the way a ZeroAccess peer would.
    fn build_frame(command: [u8; 4], flag: u32, payload: &[u8]) -> Vec<u8> {
        let mut body = command.to_vec();
        body.extend_from_slice(&flag.to_le_bytes());
        body.extend_from_slice(payload);
        let mut plain = crc32_parts(&[&[0u8; 4][..], body.as_slice()]).to_vec();
        plain.extend(body);
        rotating_xor(&plain, layout::XOR_KEY).unwrap()
    }

    #[test]
    fn parse_get_l() {
        let frame = hex::decode(GET_L).unwrap();
        let msg = ZeroAccessMessage::parse(&frame).unwrap();
        assert_eq!(msg.checksum(), 1_852_984_062);
        assert_eq!(msg.command_name().unwrap(), "getL");
        assert_eq!(msg.flag(), 0);
        assert_eq!(hex::encode(msg.payload()), "36c91cbf");
        assert_eq!(
            hex::encode(msg.as_bytes()),
            "fe4a726e4c7465670000000036c91cbf"
        );
    }

    #[test]
    fn display_and_hex_dump() {
        let frame = hex::decode(GET_L).unwrap();
        let msg = ZeroAccessMessage::parse(&frame).unwrap();
        assert_eq!(
            msg.to_string(),
            "Checksum: 0x6e724afe, Command: getL, Flag: 0x0, Payload: 0x36c91cbf"
        );
        assert_eq!(
            msg.hex_dump(),
            "0xfe 0x4a 0x72 0x6e 0x4c 0x74 0x65 0x67 0x00 0x00 0x00 0x00 0x36 0xc9 0x1c 0xbf"
        );
    }

    #[test]
    fn short_buffers_are_rejected() {
        for len in 0..16 {
            let err = ZeroAccessMessage::parse(&vec![0x11; len]).unwrap_err();
            assert_eq!(
                err,
                DissectError::TooShort {
                    needed: 16,
                    actual: len
                }
            );
        }
    }

    #[test]
    fn unaligned_frame_is_malformed() {
        let mut frame = hex::decode(GET_L).unwrap();
        frame.push(0);
        let err = ZeroAccessMessage::parse(&frame).unwrap_err();
        assert_eq!(err.kind(), DissectErrorKind::MalformedPayload);
    }

    #[test]
    fn flipped_bit_fails_checksum() {
        let mut frame = hex::decode(GET_L).unwrap();
        frame[13] ^= 0x01;
        let err = ZeroAccessMessage::parse(&frame).unwrap_err();
        assert_eq!(err.kind(), DissectErrorKind::ChecksumMismatch);
    }

    #[test]
    fn peer_list_on_get_l_is_invalid() {
        let frame = hex::decode(GET_L).unwrap();
        let msg = ZeroAccessMessage::parse(&frame).unwrap();
        let err = msg.decode_peer_list().unwrap_err();
        assert_eq!(err.kind(), DissectErrorKind::InvalidOperation);
        assert!(msg.advertised_peers().is_empty());
    }

    #[test]
    fn built_ret_l_lists_peers() {
        let mut payload = 2u32.to_le_bytes().to_vec();
        payload.extend_from_slice(&[10, 0, 0, 1, 0xaa, 0xbb, 0xcc, 0xdd]);
        payload.extend_from_slice(&[192, 168, 1, 20, 0, 0, 0, 0]);
        let frame = build_frame(layout::CMD_RET_L, 7, &payload);
        let msg = ZeroAccessMessage::parse(&frame).unwrap();
        assert_eq!(msg.command().unwrap(), ZeroAccessCommand::RetL);
        assert_eq!(msg.flag(), 7);
        assert_eq!(msg.advertised_peers(), vec!["10.0.0.1", "192.168.1.20"]);

        let fields = serde_json::to_value(msg.fields().unwrap()).unwrap();
        assert_eq!(fields["command"], "retL");
        assert_eq!(fields["peers"][1], "192.168.1.20");
    }

    #[test]
    fn overrunning_peer_count_is_malformed() {
        let mut payload = 5u32.to_le_bytes().to_vec();
        payload.extend_from_slice(&[10, 0, 0, 1, 0, 0, 0, 0]);
        let frame = build_frame(layout::CMD_RET_L, 0, &payload);
        let msg = ZeroAccessMessage::parse(&frame).unwrap();
        let err = msg.decode_peer_list().unwrap_err();
        assert_eq!(
            err,
            DissectError::MalformedPayload("peer list: need 44 bytes, got 12".to_string())
        );
        assert!(msg.fields().is_err());
    }

    #[test]
    fn unknown_tag_is_reported_raw() {
        let frame = build_frame(*b"Lpsn", 0, &[0; 4]);
        let msg = ZeroAccessMessage::parse(&frame).unwrap();
        assert_eq!(msg.command_name().unwrap_err().kind(), DissectErrorKind::UnknownCommand);
        assert_eq!(
            msg.decode_peer_list().unwrap_err().kind(),
            DissectErrorKind::UnknownCommand
        );
        assert!(msg.to_string().contains("Command: 0x4c70736e"));
        let fields = serde_json::to_value(msg.fields().unwrap()).unwrap();
        assert_eq!(fields["command"], "0x4c70736e");
        assert!(fields.get("peers").is_none());
    }

    #[test]
    fn command_tags_round_trip() {
        for command in [ZeroAccessCommand::GetL, ZeroAccessCommand::RetL] {
            assert_eq!(ZeroAccessCommand::try_from(command.tag()).unwrap(), command);
        }
    }
}
