//! Sality v3 peer-to-peer protocol dissection.
//!
//! Wire format (little-endian):
//!
//! ```text
//! checksum(2) | length(2) | RC4[ version(1) | urlpackid(4) | command(1) | payload(var) ]
//! ```
//!
//! The plain checksum and length fields form the 4-byte RC4 key, and the
//! checksum is the CRC16/MODBUS of the decrypted remainder. Payloads are
//! zero-padded; their shape depends on the command and the padded-stripped
//! length (see `payload`). Offsets live in `layout`, conventions in `reader`.

pub mod layout;
pub mod parser;
pub mod payload;
pub(crate) mod reader;

pub use parser::{SalityCommand, SalityHeader, SalityMessage};
pub use payload::{
    PayloadFields, SalityFields, ServerIdClass, UrlPack, decode_payload, decode_urlpack,
};
