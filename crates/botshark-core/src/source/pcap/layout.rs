/// First four bytes of a PCAPNG section header block.
pub const PCAPNG_MAGIC: [u8; 4] = [0x0a, 0x0d, 0x0d, 0x0a];

/// Initial buffer size handed to the pcap-parser readers.
pub const PCAP_READER_BUFFER_SIZE: usize = 64 * 1024;

pub const MICROS_PER_SECOND: f64 = 1e6;
