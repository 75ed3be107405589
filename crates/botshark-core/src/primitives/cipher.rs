use thiserror::Error;

/// Word size of the rotating XOR cipher.
pub const XOR_WORD_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    #[error("RC4 key must not be empty")]
    EmptyKey,
    #[error("input length {len} is not a multiple of the {word}-byte cipher word")]
    UnalignedInput { len: usize, word: usize },
}

/// RC4 (KSA + PRGA) with a fresh state per call.
///
/// Encryption and decryption are the same operation.
///
/// # Examples
/// ```
/// use botshark_core::primitives::rc4;
///
/// let out = rc4(&[0xAA, 0xBB, 0xCC, 0xDD], &[0x11, 0x11])?;
/// assert_eq!(out, [0x26, 0x30, 0xC3, 0xCA]);
/// # Ok::<(), botshark_core::primitives::CipherError>(())
/// ```
pub fn rc4(data: &[u8], key: &[u8]) -> Result<Vec<u8>, CipherError> {
    if key.is_empty() {
        return Err(CipherError::EmptyKey);
    }

    let mut state: [u8; 256] = std::array::from_fn(|idx| idx as u8);
    let mut j = 0u8;
    for i in 0..state.len() {
        j = j.wrapping_add(state[i]).wrapping_add(key[i % key.len()]);
        state.swap(i, j as usize);
    }

    let mut i = 0u8;
    let mut j = 0u8;
    let out = data
        .iter()
        .map(|byte| {
            i = i.wrapping_add(1);
            j = j.wrapping_add(state[i as usize]);
            state.swap(i as usize, j as usize);
            let idx = state[i as usize].wrapping_add(state[j as usize]);
            byte ^ state[idx as usize]
        })
        .collect();
    Ok(out)
}

/// 32-bit rotating XOR: each little-endian word is XORed with the key, then
/// the key rotates left by one bit.
///
/// The initial key is the four key bytes read as a big-endian integer.
/// Inputs that are not a whole number of words are rejected.
///
/// # Examples
/// ```
/// use botshark_core::primitives::rotating_xor;
///
/// let out = rotating_xor(&[0u8; 8], b"ftp2")?;
/// assert_eq!(out[..4], 0x6674_7032u32.to_le_bytes());
/// assert_eq!(out[4..], 0xCCE8_E064u32.to_le_bytes());
/// # Ok::<(), botshark_core::primitives::CipherError>(())
/// ```
pub fn rotating_xor(data: &[u8], key: &[u8; XOR_WORD_LEN]) -> Result<Vec<u8>, CipherError> {
    if data.len() % XOR_WORD_LEN != 0 {
        return Err(CipherError::UnalignedInput {
            len: data.len(),
            word: XOR_WORD_LEN,
        });
    }

    let mut key = u32::from_be_bytes(*key);
    let mut out = Vec::with_capacity(data.len());
    for word in data.chunks_exact(XOR_WORD_LEN) {
        let value = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
        out.extend_from_slice(&(value ^ key).to_le_bytes());
        key = key.rotate_left(1);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::{CipherError, rc4, rotating_xor};

    #[test]
    fn rc4_known_vector() {
        let out = rc4(&[0xAA, 0xBB, 0xCC, 0xDD], &[0x11, 0x11]).unwrap();
        assert_eq!(out, [0x26, 0x30, 0xC3, 0xCA]);
    }

    #[test]
    fn rc4_wikipedia_vector() {
        let out = rc4(b"Plaintext", b"Key").unwrap();
        assert_eq!(hex::encode(out), "bbf316e8d940af0ad3");
    }

    #[test]
    fn rc4_is_deterministic_and_self_inverse() {
        let plain = b"sality peer exchange".to_vec();
        let key = [0x39, 0x0c, 0x17, 0x00];
        let first = rc4(&plain, &key).unwrap();
        let second = rc4(&plain, &key).unwrap();
        assert_eq!(first, second);
        assert_ne!(first, plain);
        assert_eq!(rc4(&first, &key).unwrap(), plain);
    }

    #[test]
    fn rc4_rejects_empty_key() {
        assert_eq!(rc4(&[1, 2, 3], &[]).unwrap_err(), CipherError::EmptyKey);
    }

    #[test]
    fn rc4_empty_input() {
        assert!(rc4(&[], &[1]).unwrap().is_empty());
    }

    #[test]
    fn rotating_xor_rotates_key_per_word() {
        let out = rotating_xor(&[0u8; 12], b"ftp2").unwrap();
        let key = 0x6674_7032u32;
        assert_eq!(out[0..4], key.to_le_bytes());
        assert_eq!(out[4..8], key.rotate_left(1).to_le_bytes());
        assert_eq!(out[8..12], key.rotate_left(2).to_le_bytes());
    }

    #[test]
    fn rotating_xor_wraps_after_32_words() {
        let out = rotating_xor(&[0u8; 33 * 4], b"ftp2").unwrap();
        assert_eq!(out[..4], out[32 * 4..]);
    }

    #[test]
    fn rotating_xor_is_self_inverse() {
        let plain: Vec<u8> = (0u8..64).collect();
        let cipher = rotating_xor(&plain, b"ftp2").unwrap();
        assert_eq!(rotating_xor(&cipher, b"ftp2").unwrap(), plain);
    }

    #[test]
    fn rotating_xor_rejects_partial_word() {
        let err = rotating_xor(&[0u8; 17], b"ftp2").unwrap_err();
        assert_eq!(err, CipherError::UnalignedInput { len: 17, word: 4 });
    }
}
