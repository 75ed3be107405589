use std::net::Ipv4Addr;

use super::layout;
use crate::protocols::common::ByteReader;
use crate::protocols::error::DissectError;

pub(crate) struct ZeroAccessReader<'a> {
    inner: ByteReader<'a>,
}

impl<'a> ZeroAccessReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self {
            inner: ByteReader::new(bytes),
        }
    }

    pub(crate) fn require_len(&self, needed: usize) -> Result<(), DissectError> {
        self.inner.require_len(needed)
    }

    pub(crate) fn read_checksum(&self) -> Result<[u8; 4], DissectError> {
        self.inner.read_array(layout::CHECKSUM_RANGE.clone())
    }

    /// Everything the checksum covers besides its own (zeroed) field.
    pub(crate) fn read_checksummed(&self) -> Result<&'a [u8], DissectError> {
        self.inner
            .read_slice(layout::CHECKSUMMED_OFFSET..self.inner.len())
    }

    pub(crate) fn read_command(&self) -> Result<[u8; 4], DissectError> {
        self.inner.read_array(layout::COMMAND_RANGE.clone())
    }

    pub(crate) fn read_flag(&self) -> Result<u32, DissectError> {
        self.inner.read_u32_le(layout::FLAG_RANGE.clone())
    }

    /// Peer addresses of a retL payload, in buffer order.
    ///
    /// The declared count is checked against the buffer before any entry is
    /// read; timestamps are skipped.
    pub(crate) fn read_peers(&self) -> Result<Vec<Ipv4Addr>, DissectError> {
        let count = self.inner.read_u32_le(layout::PEER_COUNT_RANGE.clone())?;
        let needed = layout::PEER_ENTRIES_OFFSET as u64
            + u64::from(count) * layout::PEER_ENTRY_LEN as u64;
        let needed = usize::try_from(needed).unwrap_or(usize::MAX);
        self.inner.require_len(needed)?;

        (0..count as usize)
            .map(|idx| {
                let start = layout::PEER_ENTRIES_OFFSET + idx * layout::PEER_ENTRY_LEN;
                self.inner.read_ipv4(start..start + layout::PEER_IP_LEN)
            })
            .collect()
    }
}
