use super::error::UdpError;
use super::layout;

/// Reads the datagram behind the fixed UDP header.
pub struct UdpReader<'a> {
    payload: &'a [u8],
}

impl<'a> UdpReader<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        Self { payload }
    }

    pub fn require_len(&self, needed: usize) -> Result<(), UdpError> {
        if self.payload.len() < needed {
            return Err(UdpError::TooShort {
                needed,
                actual: self.payload.len(),
            });
        }
        Ok(())
    }

    pub fn payload_without_header(&self) -> Result<&'a [u8], UdpError> {
        self.require_len(layout::UDP_HEADER_LEN)?;
        self.payload
            .get(layout::UDP_HEADER_LEN..)
            .ok_or(UdpError::TooShort {
                needed: layout::UDP_HEADER_LEN,
                actual: self.payload.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::UdpReader;
    use crate::analysis::udp::error::UdpError;

    #[test]
    fn payload_without_header_ok() {
        let mut datagram = vec![0x13, 0x88, 0x1b, 0x58, 0x00, 0x23, 0x00, 0x00];
        datagram.extend_from_slice(&[0x39, 0x0c, 0x17, 0x00]);
        let reader = UdpReader::new(&datagram);
        let payload = reader.payload_without_header().unwrap();
        assert_eq!(payload, &[0x39, 0x0c, 0x17, 0x00]);
    }

    #[test]
    fn header_only_datagram_has_empty_payload() {
        let datagram = [0u8; 8];
        let reader = UdpReader::new(&datagram);
        assert!(reader.payload_without_header().unwrap().is_empty());
    }

    #[test]
    fn payload_without_header_too_short() {
        let payload = [0u8; 7];
        let reader = UdpReader::new(&payload);
        let err = reader.payload_without_header().unwrap_err();
        assert!(matches!(err, UdpError::TooShort { .. }));
    }
}
