//! Protocol dissectors.
//!
//! Each protocol follows a layered structure:
//! - `layout`: byte offsets, ranges and command codes (source of truth)
//! - `reader`: bounds-checked byte access and protocol conventions
//! - `parser`: the validating factory and header accessors
//!
//! A message value only exists once its obfuscation layer has been removed
//! and its embedded checksum verified; payload views (Sality payload fields,
//! ZeroAccess peer lists) are decoded on demand from the stored buffer.
//! Dissectors are pure and contain no I/O.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::trace;

pub(crate) mod common;
pub mod error;
pub mod sality;
pub mod zeroaccess;

pub use error::{DissectError, DissectErrorKind};
pub use sality::SalityMessage;
pub use zeroaccess::ZeroAccessMessage;

/// Capabilities shared by every dissected message type.
///
/// # Examples
/// ```
/// use botshark_core::{Message, SalityMessage};
///
/// let frame = hex::decode("390c17005d4d18a0c6950925e043f28e84d2145f7704e06e6f9a24")?;
/// let msg = SalityMessage::parse(&frame)?;
/// assert_eq!(msg.command_name()?, "Peer Exchange");
/// assert_eq!(msg.raw_len(), frame.len());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub trait Message: Sized + fmt::Display {
    /// Stable protocol identifier.
    const PROTOCOL: Protocol;

    /// Structured, serializable view of the whole message.
    type Fields: Serialize;

    /// Remove the obfuscation layer and verify the embedded checksum.
    fn parse(buffer: &[u8]) -> Result<Self, DissectError>;

    fn command_name(&self) -> Result<&'static str, DissectError>;

    /// Length of the stored message in bytes.
    fn raw_len(&self) -> usize;

    fn fields(&self) -> Result<Self::Fields, DissectError>;

    /// Peer endpoints advertised by this message, rendered for display.
    fn advertised_peers(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Supported botnet protocols.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Sality,
    ZeroAccess,
}

impl Protocol {
    pub const ALL: [Protocol; 2] = [Protocol::Sality, Protocol::ZeroAccess];

    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Sality => "sality",
            Protocol::ZeroAccess => "zeroaccess",
        }
    }

    /// Dissect `buffer` as this protocol into a protocol-neutral record.
    ///
    /// # Examples
    /// ```
    /// use botshark_core::Protocol;
    ///
    /// let frame = hex::decode("cc3a060828948dabc9c0d199a548bf8c")?;
    /// let decoded = Protocol::ZeroAccess.decode(&frame)?;
    /// assert_eq!(decoded.command.as_deref(), Some("getL"));
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn decode(self, buffer: &[u8]) -> Result<DecodedMessage, DissectError> {
        match self {
            Protocol::Sality => DecodedMessage::from_buffer::<SalityMessage>(buffer),
            Protocol::ZeroAccess => DecodedMessage::from_buffer::<ZeroAccessMessage>(buffer),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "sality" => Ok(Protocol::Sality),
            "zeroaccess" | "zero-access" => Ok(Protocol::ZeroAccess),
            other => Err(format!("unknown protocol '{other}'")),
        }
    }
}

/// Protocol-neutral record of a successfully parsed message.
///
/// Parsing already validated the checksum; a failure while decoding the
/// payload afterwards is kept in `decode_error` rather than discarding the
/// message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodedMessage {
    pub protocol: Protocol,
    /// Stored message length in bytes.
    pub length: usize,
    /// Symbolic command name, when the command is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// One-line human-readable rendering.
    pub summary: String,
    /// Structured header and payload fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<serde_json::Value>,
    /// Payload decode failure, when `fields` could not be produced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decode_error: Option<String>,
    /// Peer endpoints advertised by the message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub peers: Vec<String>,
}

impl DecodedMessage {
    pub fn from_buffer<M: Message>(buffer: &[u8]) -> Result<Self, DissectError> {
        let message = M::parse(buffer)?;
        trace!(protocol = %M::PROTOCOL, len = buffer.len(), "dissected message");
        Ok(Self::from_message(&message))
    }

    pub fn from_message<M: Message>(message: &M) -> Self {
        let (fields, decode_error) = match message.fields() {
            Ok(fields) => match serde_json::to_value(fields) {
                Ok(value) => (Some(value), None),
                Err(err) => (None, Some(err.to_string())),
            },
            Err(err) => (None, Some(err.to_string())),
        };
        Self {
            protocol: M::PROTOCOL,
            length: message.raw_len(),
            command: message.command_name().ok().map(str::to_string),
            summary: message.to_string(),
            fields,
            decode_error,
            peers: message.advertised_peers(),
        }
    }
}
