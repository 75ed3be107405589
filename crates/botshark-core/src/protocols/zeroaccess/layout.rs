use std::ops::Range;

/// Default ZeroAccess rotating XOR key.
pub const XOR_KEY: &[u8; 4] = b"ftp2";

pub const CHECKSUM_RANGE: Range<usize> = 0..4;
pub const COMMAND_RANGE: Range<usize> = 4..8;
pub const FLAG_RANGE: Range<usize> = 8..12;
pub const PAYLOAD_OFFSET: usize = 12;
/// The checksum covers the whole message with its own field zeroed.
pub const CHECKSUMMED_OFFSET: usize = 4;
pub const ZEROED_CHECKSUM: [u8; 4] = [0; 4];

pub const MIN_LEN: usize = 16;

// Command tags are stored byte-reversed on the wire.
pub const CMD_GET_L: [u8; 4] = *b"Lteg";
pub const CMD_RET_L: [u8; 4] = *b"Lter";

// retL payload: count(4) followed by count × (ip(4) | timestamp(4)).
pub const PEER_COUNT_RANGE: Range<usize> = 0..4;
pub const PEER_ENTRIES_OFFSET: usize = 4;
pub const PEER_ENTRY_LEN: usize = 8;
pub const PEER_IP_LEN: usize = 4;
