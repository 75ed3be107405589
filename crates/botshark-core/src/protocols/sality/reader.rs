use std::net::Ipv4Addr;

use super::layout;
use crate::protocols::common::{ByteReader, strip_trailing_zeros};
use crate::protocols::error::DissectError;

pub(crate) struct SalityReader<'a> {
    inner: ByteReader<'a>,
    bytes: &'a [u8],
}

impl<'a> SalityReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self {
            inner: ByteReader::new(bytes),
            bytes,
        }
    }

    pub(crate) fn require_len(&self, needed: usize) -> Result<(), DissectError> {
        self.inner.require_len(needed)
    }

    /// The plain checksum and length fields double as the RC4 key.
    pub(crate) fn read_key(&self) -> Result<[u8; 4], DissectError> {
        self.inner.read_array(layout::KEY_RANGE.clone())
    }

    pub(crate) fn read_checksum(&self) -> Result<[u8; 2], DissectError> {
        self.inner.read_array(layout::CHECKSUM_RANGE.clone())
    }

    pub(crate) fn read_encrypted(&self) -> Result<&'a [u8], DissectError> {
        self.inner
            .read_slice(layout::ENCRYPTED_OFFSET..self.bytes.len())
    }

    pub(crate) fn stripped_len(&self) -> usize {
        strip_trailing_zeros(self.bytes).len()
    }

    pub(crate) fn read_server_id(&self) -> Result<u32, DissectError> {
        self.inner.read_u32_le(layout::SERVER_ID_RANGE.clone())
    }

    pub(crate) fn read_server_port(&self) -> Result<u16, DissectError> {
        self.inner.read_u16_le(layout::SERVER_PORT_RANGE.clone())
    }

    /// Peer addresses are stored in network order, unlike every other field.
    pub(crate) fn read_peer_ip(&self) -> Result<Ipv4Addr, DissectError> {
        self.inner.read_ipv4(layout::PEER_IP_RANGE.clone())
    }

    pub(crate) fn read_peer_port(&self) -> Result<u16, DissectError> {
        self.inner.read_u16_le(layout::PEER_PORT_RANGE.clone())
    }

    pub(crate) fn read_peer_server_id(&self) -> Result<u32, DissectError> {
        self.inner.read_u32_le(layout::PEER_SERVER_ID_RANGE.clone())
    }

    pub(crate) fn read_ack(&self) -> Result<String, DissectError> {
        let bytes = self.inner.read_slice(layout::ACK_RANGE.clone())?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    pub(crate) fn read_delimiter(&self) -> Result<[u8; 4], DissectError> {
        self.inner.read_array(layout::DELIMITER_RANGE.clone())
    }

    pub(crate) fn read_urlpack_bytes(&self) -> Result<&'a [u8], DissectError> {
        self.inner
            .read_slice(layout::URLPACK_OFFSET..self.bytes.len())
    }

    pub(crate) fn read_signature(&self) -> Result<Vec<u8>, DissectError> {
        self.inner
            .read_slice(layout::SIGNATURE_RANGE.clone())
            .map(<[u8]>::to_vec)
    }

    pub(crate) fn read_urlpack_version(&self) -> Result<u32, DissectError> {
        self.inner.read_u32_le(layout::URLPACK_VERSION_RANGE.clone())
    }

    pub(crate) fn read_list_type(&self) -> Result<u8, DissectError> {
        self.inner.read_u8(layout::LIST_TYPE_OFFSET)
    }

    pub(crate) fn read_recipients(&self) -> Result<u8, DissectError> {
        self.inner.read_u8(layout::RECIPIENTS_OFFSET)
    }

    pub(crate) fn read_frequency_minutes(&self) -> Result<u16, DissectError> {
        self.inner.read_u16_le(layout::FREQUENCY_RANGE.clone())
    }

    pub(crate) fn read_url_list_size(&self) -> Result<u32, DissectError> {
        self.inner.read_u32_le(layout::URL_LIST_SIZE_RANGE.clone())
    }

    pub(crate) fn read_url_list_entries(&self) -> Result<u8, DissectError> {
        self.inner.read_u8(layout::URL_LIST_ENTRIES_OFFSET)
    }

    pub(crate) fn read_installed(&self) -> Result<u8, DissectError> {
        self.inner.read_u8(layout::INSTALLED_OFFSET)
    }

    /// NUL-separated URLs from the first `size` bytes of the URL list.
    ///
    /// Trailing NULs are dropped before splitting, so the terminator of the
    /// last entry does not produce empty strings.
    pub(crate) fn read_urls(&self, size: u32) -> Result<Vec<String>, DissectError> {
        let end = usize::try_from(size)
            .ok()
            .and_then(|size| layout::URL_LIST_OFFSET.checked_add(size))
            .ok_or(DissectError::TooShort {
                needed: usize::MAX,
                actual: self.bytes.len(),
            })?;
        let list = self.inner.read_slice(layout::URL_LIST_OFFSET..end)?;
        Ok(strip_trailing_zeros(list)
            .split(|&b| b == 0)
            .map(|url| String::from_utf8_lossy(url).into_owned())
            .collect())
    }
}
