use std::fmt;

use serde::{Deserialize, Serialize};

use super::layout;
use super::payload::{self, PayloadFields, SalityFields, ServerIdClass};
use super::reader::SalityReader;
use crate::primitives::{crc16, rc4};
use crate::protocols::error::DissectError;
use crate::protocols::{Message, Protocol};

/// Sality v3 command codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SalityCommand {
    ServerTest,
    PeerExchange,
    Hello,
}

impl SalityCommand {
    pub fn name(self) -> &'static str {
        match self {
            SalityCommand::ServerTest => "Server Test",
            SalityCommand::PeerExchange => "Peer Exchange",
            SalityCommand::Hello => "Hello",
        }
    }

    pub fn code(self) -> u8 {
        match self {
            SalityCommand::ServerTest => layout::CMD_SERVER_TEST,
            SalityCommand::PeerExchange => layout::CMD_PEER_EXCHANGE,
            SalityCommand::Hello => layout::CMD_HELLO,
        }
    }
}

impl TryFrom<u8> for SalityCommand {
    type Error = DissectError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            layout::CMD_SERVER_TEST => Ok(SalityCommand::ServerTest),
            layout::CMD_PEER_EXCHANGE => Ok(SalityCommand::PeerExchange),
            layout::CMD_HELLO => Ok(SalityCommand::Hello),
            other => Err(DissectError::UnknownCommand(format!("sality command {other}"))),
        }
    }
}

/// Decoded Sality header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalityHeader {
    pub checksum: u16,
    /// Length of everything from the version field on, padding included.
    pub length: u16,
    pub version: u8,
    pub urlpackid: u32,
    pub command: u8,
}

/// A checksum-validated Sality v3 message.
///
/// The stored buffer is `checksum ‖ length ‖ decrypted remainder`, so it is
/// always at least [`layout::MIN_LEN`] bytes long and its CRC16 matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalityMessage {
    data: Vec<u8>,
}

impl SalityMessage {
    pub fn checksum(&self) -> u16 {
        u16::from_le_bytes([self.data[0], self.data[1]])
    }

    pub fn length(&self) -> u16 {
        u16::from_le_bytes([self.data[2], self.data[3]])
    }

    pub fn version(&self) -> u8 {
        self.data[layout::VERSION_OFFSET]
    }

    pub fn urlpackid(&self) -> u32 {
        let bytes = &self.data[layout::URLPACK_ID_RANGE];
        u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    pub fn command(&self) -> u8 {
        self.data[layout::COMMAND_OFFSET]
    }

    /// Decrypted payload, including any trailing zero padding.
    pub fn payload(&self) -> &[u8] {
        &self.data[layout::PAYLOAD_OFFSET..]
    }

    /// The decrypted message as stored.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn header(&self) -> SalityHeader {
        SalityHeader {
            checksum: self.checksum(),
            length: self.length(),
            version: self.version(),
            urlpackid: self.urlpackid(),
            command: self.command(),
        }
    }

    /// Role implied by a server id carried in a payload.
    pub fn server_id_class(server_id: u32) -> ServerIdClass {
        ServerIdClass::classify(server_id)
    }

    /// Decode the payload according to the command and its stripped length.
    pub fn payload_fields(&self) -> Result<PayloadFields, DissectError> {
        payload::decode_payload(self.command(), self.payload())
    }
}

impl Message for SalityMessage {
    const PROTOCOL: Protocol = Protocol::Sality;

    type Fields = SalityFields;

    /// # Errors
    /// `TooShort` below 10 bytes, `ChecksumMismatch` when the CRC16 of the
    /// decrypted remainder differs from the plain checksum field.
    fn parse(buffer: &[u8]) -> Result<Self, DissectError> {
        let reader = SalityReader::new(buffer);
        reader.require_len(layout::MIN_LEN)?;

        let key = reader.read_key()?;
        let decrypted = rc4(reader.read_encrypted()?, &key)?;

        let embedded = reader.read_checksum()?;
        let computed = crc16(&decrypted);
        if embedded != computed {
            return Err(DissectError::checksum_mismatch(&embedded, &computed));
        }

        let mut data = Vec::with_capacity(buffer.len());
        data.extend_from_slice(&key);
        data.extend_from_slice(&decrypted);
        Ok(Self { data })
    }

    fn command_name(&self) -> Result<&'static str, DissectError> {
        SalityCommand::try_from(self.command()).map(SalityCommand::name)
    }

    fn raw_len(&self) -> usize {
        self.data.len()
    }

    fn fields(&self) -> Result<SalityFields, DissectError> {
        Ok(SalityFields {
            header: self.header(),
            payload: self.payload_fields()?,
        })
    }

    fn advertised_peers(&self) -> Vec<String> {
        match self.payload_fields() {
            Ok(PayloadFields::PeerExchangeReply {
                peer_ip, peer_port, ..
            }) => vec![format!("{peer_ip}:{peer_port}")],
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for SalityMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Checksum: {:#x}, Length: {:#x}, Version: {:#x}, URLPackID: {:#x}, Command: {:#x}, Payload: 0x{}",
            self.checksum(),
            self.length(),
            self.version(),
            self.urlpackid(),
            self.command(),
            hex::encode(self.payload())
        )
    }
}
