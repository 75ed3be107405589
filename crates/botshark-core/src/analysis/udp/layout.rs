/// Fixed UDP header: source port, destination port, length, checksum.
pub const UDP_HEADER_LEN: usize = 8;
