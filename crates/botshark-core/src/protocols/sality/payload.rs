//! Command- and length-dependent decoding of Sality payloads.
//!
//! The payload shape is selected from the command code and the payload
//! length once trailing zero padding is stripped; field values are read from
//! the unstripped payload. A length that fits no known shape for a known
//! command is reported in-band as [`PayloadFields::MalformedForCommand`];
//! reads past the buffer (including URL pack overruns) are raised as
//! `MalformedPayload`, and unknown commands as `UnknownCommand`.

use std::fmt;
use std::net::Ipv4Addr;

use serde::Serialize;

use super::layout;
use super::parser::{SalityCommand, SalityHeader};
use super::reader::SalityReader;
use crate::protocols::common::{serialize_hex, truncated};
use crate::protocols::error::DissectError;

/// Payload fields, one variant per recognized shape.
///
/// Serializes as a flat object of the variant's fields; `Empty` becomes `{}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PayloadFields {
    ServerTestRequest {
        server_id: u32,
        server_port: u16,
    },
    ServerTestReply {
        new_server_id: u32,
    },
    PeerExchangeRequest {
        server_id: u32,
    },
    PeerExchangeReply {
        peer_ip: Ipv4Addr,
        peer_port: u16,
        peer_server_id: u32,
    },
    HelloAck {
        ack: String,
    },
    HelloRequestWithoutPack {
        server_id: u32,
    },
    HelloWithUrlPack {
        ack: String,
        #[serde(serialize_with = "serialize_hex")]
        delimiter: [u8; 4],
        urlpack: UrlPack,
    },
    Empty {},
    MalformedForCommand {
        error: String,
    },
}

/// Signed update URL list carried by Hello messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlPack {
    #[serde(serialize_with = "serialize_hex")]
    pub signature: Vec<u8>,
    pub version: u32,
    /// 0 = direct list, 1 = indirect list.
    pub listtype: u8,
    /// 0 = all, 1 = servers, 2 = clients.
    pub recipients: u8,
    pub frequency_minutes: u16,
    pub url_list_size: u32,
    pub url_list_entries: u8,
    pub installed: u8,
    pub urls: Vec<String>,
}

impl UrlPack {
    /// Whether the declared list size and entry count are within protocol limits.
    pub fn within_limits(&self) -> bool {
        self.url_list_size <= layout::URL_LIST_MAX_SIZE
            && self.url_list_entries <= layout::URL_LIST_MAX_ENTRIES
    }
}

/// Header plus decoded payload, the structured view of a Sality message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalityFields {
    pub header: SalityHeader,
    pub payload: PayloadFields,
}

/// Role implied by a Sality server id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServerIdClass {
    Undecided,
    NonSuperpeer,
    Superpeer,
    Invalid,
}

impl ServerIdClass {
    pub fn classify(server_id: u32) -> Self {
        if server_id == layout::SERVER_ID_UNDECIDED {
            ServerIdClass::Undecided
        } else if server_id < *layout::SUPERPEER_ID_RANGE.start() {
            ServerIdClass::NonSuperpeer
        } else if layout::SUPERPEER_ID_RANGE.contains(&server_id) {
            ServerIdClass::Superpeer
        } else {
            ServerIdClass::Invalid
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServerIdClass::Undecided => "undecided",
            ServerIdClass::NonSuperpeer => "non-superpeer",
            ServerIdClass::Superpeer => "superpeer",
            ServerIdClass::Invalid => "invalid",
        }
    }
}

impl fmt::Display for ServerIdClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decode a payload for the given command code.
///
/// # Examples
/// ```
/// use botshark_core::sality::{PayloadFields, decode_payload};
///
/// let fields = decode_payload(3, b"OK\0\0\0")?;
/// assert_eq!(fields, PayloadFields::HelloAck { ack: "OK".to_string() });
/// # Ok::<(), botshark_core::DissectError>(())
/// ```
pub fn decode_payload(command: u8, payload: &[u8]) -> Result<PayloadFields, DissectError> {
    let reader = SalityReader::new(payload);
    let len = reader.stripped_len();
    if len == 0 {
        return Ok(PayloadFields::Empty {});
    }

    match SalityCommand::try_from(command)? {
        SalityCommand::ServerTest => decode_server_test(&reader, len, payload),
        SalityCommand::PeerExchange => decode_peer_exchange(&reader, len, payload),
        SalityCommand::Hello => decode_hello(&reader, len, payload),
    }
}

fn decode_server_test(
    reader: &SalityReader<'_>,
    len: usize,
    payload: &[u8],
) -> Result<PayloadFields, DissectError> {
    if layout::SERVER_TEST_REQUEST_LEN.contains(&len) {
        let relabel = truncated("server test request");
        Ok(PayloadFields::ServerTestRequest {
            server_id: reader.read_server_id().map_err(&relabel)?,
            server_port: reader.read_server_port().map_err(&relabel)?,
        })
    } else if len <= layout::SERVER_TEST_REPLY_MAX_LEN {
        Ok(PayloadFields::ServerTestReply {
            new_server_id: reader
                .read_server_id()
                .map_err(truncated("server test reply"))?,
        })
    } else {
        Ok(malformed("server test", payload))
    }
}

fn decode_peer_exchange(
    reader: &SalityReader<'_>,
    len: usize,
    payload: &[u8],
) -> Result<PayloadFields, DissectError> {
    if layout::PEER_EXCHANGE_REQUEST_LEN.contains(&len) {
        Ok(PayloadFields::PeerExchangeRequest {
            server_id: reader
                .read_server_id()
                .map_err(truncated("peer exchange request"))?,
        })
    } else if layout::PEER_EXCHANGE_REPLY_LEN.contains(&len) {
        let relabel = truncated("peer exchange reply");
        Ok(PayloadFields::PeerExchangeReply {
            peer_ip: reader.read_peer_ip().map_err(&relabel)?,
            peer_port: reader.read_peer_port().map_err(&relabel)?,
            peer_server_id: reader.read_peer_server_id().map_err(&relabel)?,
        })
    } else {
        Ok(malformed("peer exchange", payload))
    }
}

fn decode_hello(
    reader: &SalityReader<'_>,
    len: usize,
    payload: &[u8],
) -> Result<PayloadFields, DissectError> {
    // The two-byte acknowledgement overlaps the request range, so it is tested first.
    if len == layout::HELLO_ACK_LEN {
        Ok(PayloadFields::HelloAck {
            ack: reader.read_ack().map_err(truncated("hello ack"))?,
        })
    } else if layout::HELLO_REQUEST_LEN.contains(&len) {
        Ok(PayloadFields::HelloRequestWithoutPack {
            server_id: reader
                .read_server_id()
                .map_err(truncated("hello request"))?,
        })
    } else if len > layout::HELLO_URLPACK_MIN_LEN {
        let relabel = truncated("hello");
        Ok(PayloadFields::HelloWithUrlPack {
            ack: reader.read_ack().map_err(&relabel)?,
            delimiter: reader.read_delimiter().map_err(&relabel)?,
            urlpack: decode_urlpack(reader.read_urlpack_bytes().map_err(&relabel)?)?,
        })
    } else {
        Ok(malformed("hello", payload))
    }
}

/// Decode a URL pack starting at its signature.
///
/// # Errors
/// `MalformedPayload` when the fixed part is shorter than 142 bytes or the
/// declared URL list runs past the buffer.
pub fn decode_urlpack(bytes: &[u8]) -> Result<UrlPack, DissectError> {
    let reader = SalityReader::new(bytes);
    let relabel = truncated("url pack");
    reader
        .require_len(layout::URLPACK_HEADER_LEN)
        .map_err(&relabel)?;

    let url_list_size = reader.read_url_list_size().map_err(&relabel)?;
    Ok(UrlPack {
        signature: reader.read_signature().map_err(&relabel)?,
        version: reader.read_urlpack_version().map_err(&relabel)?,
        listtype: reader.read_list_type().map_err(&relabel)?,
        recipients: reader.read_recipients().map_err(&relabel)?,
        frequency_minutes: reader.read_frequency_minutes().map_err(&relabel)?,
        url_list_size,
        url_list_entries: reader.read_url_list_entries().map_err(&relabel)?,
        installed: reader.read_installed().map_err(&relabel)?,
        urls: reader
            .read_urls(url_list_size)
            .map_err(truncated("url list"))?,
    })
}

fn malformed(kind: &str, payload: &[u8]) -> PayloadFields {
    PayloadFields::MalformedForCommand {
        error: format!("error parsing {kind} message: {}", hex::encode(payload)),
    }
}
