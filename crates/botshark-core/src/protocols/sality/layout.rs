use std::ops::{Range, RangeInclusive};

// Frame header: checksum and length are plain, everything from VERSION_OFFSET is RC4.
pub const CHECKSUM_RANGE: Range<usize> = 0..2;
pub const LENGTH_RANGE: Range<usize> = 2..4;
pub const KEY_RANGE: Range<usize> = 0..4;
pub const ENCRYPTED_OFFSET: usize = 4;
pub const VERSION_OFFSET: usize = 4;
pub const URLPACK_ID_RANGE: Range<usize> = 5..9;
pub const COMMAND_OFFSET: usize = 9;
pub const PAYLOAD_OFFSET: usize = 10;

pub const MIN_LEN: usize = PAYLOAD_OFFSET;

pub const CMD_SERVER_TEST: u8 = 1;
pub const CMD_PEER_EXCHANGE: u8 = 2;
pub const CMD_HELLO: u8 = 3;

// Payload fields, offsets relative to the payload start.
pub const SERVER_ID_RANGE: Range<usize> = 0..4;
pub const SERVER_PORT_RANGE: Range<usize> = 4..6;
pub const PEER_IP_RANGE: Range<usize> = 0..4;
pub const PEER_PORT_RANGE: Range<usize> = 4..6;
pub const PEER_SERVER_ID_RANGE: Range<usize> = 6..10;
pub const ACK_RANGE: Range<usize> = 0..2;
pub const DELIMITER_RANGE: Range<usize> = 2..6;
pub const URLPACK_OFFSET: usize = 6;

// Payload shapes, by length after trailing zero padding is stripped.
pub const SERVER_TEST_REQUEST_LEN: RangeInclusive<usize> = 5..=6;
pub const SERVER_TEST_REPLY_MAX_LEN: usize = 4;
pub const PEER_EXCHANGE_REQUEST_LEN: RangeInclusive<usize> = 1..=4;
pub const PEER_EXCHANGE_REPLY_LEN: RangeInclusive<usize> = 7..=10;
pub const HELLO_ACK_LEN: usize = 2;
pub const HELLO_REQUEST_LEN: RangeInclusive<usize> = 1..=4;
/// A Hello carries a URL pack only when strictly longer than this.
pub const HELLO_URLPACK_MIN_LEN: usize = URLPACK_OFFSET + URLPACK_HEADER_LEN;

// URL pack, offsets relative to the URL pack start.
pub const SIGNATURE_RANGE: Range<usize> = 0..128;
pub const URLPACK_VERSION_RANGE: Range<usize> = 128..132;
pub const LIST_TYPE_OFFSET: usize = 132;
pub const RECIPIENTS_OFFSET: usize = 133;
pub const FREQUENCY_RANGE: Range<usize> = 134..136;
pub const URL_LIST_SIZE_RANGE: Range<usize> = 136..140;
pub const URL_LIST_ENTRIES_OFFSET: usize = 140;
pub const INSTALLED_OFFSET: usize = 141;
pub const URL_LIST_OFFSET: usize = 142;
pub const URLPACK_HEADER_LEN: usize = URL_LIST_OFFSET;

/// Limits observed in the protocol; decoded values are reported even above them.
pub const URL_LIST_MAX_SIZE: u32 = 1024;
pub const URL_LIST_MAX_ENTRIES: u8 = 30;

pub const SERVER_ID_UNDECIDED: u32 = 1;
pub const SUPERPEER_ID_RANGE: RangeInclusive<u32> = 16_000_000..=20_000_000;
