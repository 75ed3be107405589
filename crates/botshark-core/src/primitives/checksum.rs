use crc::{CRC_16_MODBUS, Crc};

const MODBUS: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// CRC-16/MODBUS (init `0xFFFF`, reflected polynomial `0xA001`), little-endian.
///
/// # Examples
/// ```
/// use botshark_core::primitives::crc16;
///
/// assert_eq!(crc16(&[0xAA, 0xBB, 0xCC, 0xDD]), [0xC4, 0x80]);
/// ```
pub fn crc16(data: &[u8]) -> [u8; 2] {
    MODBUS.checksum(data).to_le_bytes()
}

/// Standard CRC-32 (IEEE, reflected), little-endian.
///
/// # Examples
/// ```
/// use botshark_core::primitives::crc32;
///
/// assert_eq!(crc32(b"123456789"), 0xCBF4_3926u32.to_le_bytes());
/// ```
pub fn crc32(data: &[u8]) -> [u8; 4] {
    crc32fast::hash(data).to_le_bytes()
}

/// CRC-32 over the concatenation of `parts`, without building the joined buffer.
pub fn crc32_parts(parts: &[&[u8]]) -> [u8; 4] {
    let mut hasher = crc32fast::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().to_le_bytes()
}
