//! PCAP/PCAPNG file source.
//!
//! The format is detected from the leading magic bytes; both readers emit
//! the same `PacketEvent`s, with PCAPNG linktypes resolved per interface.

pub mod error;
pub mod layout;
pub mod parser;
pub mod reader;

pub use parser::PcapFileSource;
