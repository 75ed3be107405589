//! ZeroAccess peer-to-peer protocol dissection.
//!
//! ```text
//! XOR["ftp2"][ checksum(4) | command(4) | flag(4) | payload(var) ]
//! ```
//!
//! The whole frame is obfuscated with a rotating XOR whose 32-bit key turns
//! left by one bit per word. The checksum is the CRC32 of the decrypted frame
//! with the checksum field zeroed. A retL payload carries a counted list of
//! `ip(4) | timestamp(4)` peer entries.

pub mod layout;
pub mod parser;
pub(crate) mod reader;

pub use parser::{ZeroAccessCommand, ZeroAccessFields, ZeroAccessMessage};
