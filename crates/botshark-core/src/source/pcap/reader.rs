use std::io::{Read, Seek, SeekFrom};

use super::error::PcapSourceError;
use super::layout;
use pcap_parser::Linktype;

/// Read the magic bytes and rewind the reader to the start.
///
/// # Examples
/// Internal helper; the example is not compiled.
/// ```text
/// use botshark_core::source::pcap::reader::read_magic_and_rewind;
/// use std::io::Cursor;
///
/// let bytes = [0x0a, 0x0d, 0x0d, 0x0a, 0x01];
/// let mut cursor = Cursor::new(bytes);
/// let magic = read_magic_and_rewind(&mut cursor).unwrap();
/// assert_eq!(magic, [0x0a, 0x0d, 0x0d, 0x0a]);
/// ```
///
/// # Errors
/// Returns `PcapSourceError` when the reader cannot be read or rewound.
pub fn read_magic_and_rewind<R: Read + Seek>(reader: &mut R) -> Result<[u8; 4], PcapSourceError> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    reader.seek(SeekFrom::Start(0))?;
    Ok(magic)
}

/// Whether `magic` opens a PCAPNG section header block.
pub fn is_pcapng_magic(magic: &[u8; 4]) -> bool {
    magic == &layout::PCAPNG_MAGIC
}

/// Linktype of the interface a PCAPNG packet refers to (Ethernet when the
/// interface was never described).
pub fn linktype_for_interface(linktypes: &[Linktype], if_id: u32) -> Linktype {
    linktypes
        .get(if_id as usize)
        .copied()
        .unwrap_or(Linktype::ETHERNET)
}

/// Convert a PCAPNG high/low timestamp (microsecond resolution) to seconds.
pub fn pcapng_ts_to_seconds(ts_high: u32, ts_low: u32) -> f64 {
    let ts = (u64::from(ts_high) << 32) | u64::from(ts_low);
    ts as f64 / layout::MICROS_PER_SECOND
}

/// Convert a legacy PCAP seconds/microseconds pair to seconds.
pub fn legacy_ts_to_seconds(ts_sec: u32, ts_usec: u32) -> f64 {
    f64::from(ts_sec) + f64::from(ts_usec) / layout::MICROS_PER_SECOND
}
