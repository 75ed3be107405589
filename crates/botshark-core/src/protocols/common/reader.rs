use std::net::Ipv4Addr;
use std::ops::Range;

use crate::protocols::error::DissectError;

/// Bounds-checked little-endian reads over a borrowed buffer.
///
/// Reads past the end report `TooShort`; payload decoders re-label that as
/// `MalformedPayload` through [`truncated`].
pub(crate) struct ByteReader<'a> {
    bytes: &'a [u8],
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub(crate) fn len(&self) -> usize {
        self.bytes.len()
    }

    pub(crate) fn require_len(&self, needed: usize) -> Result<(), DissectError> {
        if self.bytes.len() < needed {
            return Err(DissectError::TooShort {
                needed,
                actual: self.bytes.len(),
            });
        }
        Ok(())
    }

    pub(crate) fn read_u8(&self, offset: usize) -> Result<u8, DissectError> {
        self.bytes
            .get(offset)
            .copied()
            .ok_or(DissectError::TooShort {
                needed: offset + 1,
                actual: self.bytes.len(),
            })
    }

    pub(crate) fn read_slice(&self, range: Range<usize>) -> Result<&'a [u8], DissectError> {
        self.bytes
            .get(range.clone())
            .ok_or(DissectError::TooShort {
                needed: range.end,
                actual: self.bytes.len(),
            })
    }

    pub(crate) fn read_array<const N: usize>(
        &self,
        range: Range<usize>,
    ) -> Result<[u8; N], DissectError> {
        let bytes = self.read_slice(range)?;
        bytes.try_into().map_err(|_| DissectError::TooShort {
            needed: N,
            actual: bytes.len(),
        })
    }

    pub(crate) fn read_u16_le(&self, range: Range<usize>) -> Result<u16, DissectError> {
        self.read_array::<2>(range).map(u16::from_le_bytes)
    }

    pub(crate) fn read_u32_le(&self, range: Range<usize>) -> Result<u32, DissectError> {
        self.read_array::<4>(range).map(u32::from_le_bytes)
    }

    /// IPv4 address in buffer order (`b0.b1.b2.b3`).
    pub(crate) fn read_ipv4(&self, range: Range<usize>) -> Result<Ipv4Addr, DissectError> {
        self.read_array::<4>(range).map(Ipv4Addr::from)
    }
}

/// Re-label a short read inside a payload as `MalformedPayload`.
pub(crate) fn truncated(context: &'static str) -> impl Fn(DissectError) -> DissectError {
    move |err| match err {
        DissectError::TooShort { needed, actual } => DissectError::MalformedPayload(format!(
            "{context}: need {needed} bytes, got {actual}"
        )),
        other => other,
    }
}

pub(crate) fn strip_trailing_zeros(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|&b| b != 0)
        .map_or(0, |idx| idx + 1);
    &bytes[..end]
}

#[cfg(test)]
mod tests {
    use super::{ByteReader, strip_trailing_zeros, truncated};
    use crate::protocols::error::DissectError;

    #[test]
    fn reads_little_endian_values() {
        let bytes = [0x39, 0x0c, 0x86, 0x01, 0x00, 0x00];
        let reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_u16_le(0..2).unwrap(), 3129);
        assert_eq!(reader.read_u32_le(2..6).unwrap(), 390);
        assert_eq!(reader.read_u8(5).unwrap(), 0);
    }

    #[test]
    fn reads_ipv4_in_buffer_order() {
        let bytes = [200, 84, 139, 52];
        let reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_ipv4(0..4).unwrap().to_string(), "200.84.139.52");
    }

    #[test]
    fn out_of_bounds_reads_are_too_short() {
        let bytes = [1, 2, 3];
        let reader = ByteReader::new(&bytes);
        assert_eq!(
            reader.read_u32_le(0..4).unwrap_err(),
            DissectError::TooShort {
                needed: 4,
                actual: 3
            }
        );
        assert!(matches!(
            reader.read_u8(3),
            Err(DissectError::TooShort { needed: 4, .. })
        ));
        assert!(reader.require_len(4).is_err());
        assert!(reader.require_len(3).is_ok());
    }

    #[test]
    fn truncated_relabels_short_reads_only() {
        let relabel = truncated("peer list");
        let err = relabel(DissectError::TooShort {
            needed: 12,
            actual: 8,
        });
        assert_eq!(
            err,
            DissectError::MalformedPayload("peer list: need 12 bytes, got 8".to_string())
        );
        let other = relabel(DissectError::UnknownCommand("x".to_string()));
        assert_eq!(other, DissectError::UnknownCommand("x".to_string()));
    }

    #[test]
    fn strips_only_trailing_zeros() {
        assert_eq!(strip_trailing_zeros(&[0, 1, 0, 2, 0, 0]), &[0, 1, 0, 2]);
        assert!(strip_trailing_zeros(&[0, 0, 0]).is_empty());
        assert!(strip_trailing_zeros(&[]).is_empty());
    }
}
