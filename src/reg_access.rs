//! Element marshaling
//!
//! # Overview
//!
//! Conversions between the representation used at the driver boundary
//! (big-endian byte strings) and the one the coprocessor RAM expects
//! (little-endian sequences of 32-bit words).

/// Loads a big-endian byte string into little-endian words.
///
/// The least significant word is taken from the end of `bytes`. Only
/// `min(words.len(), bytes.len() / 4)` words are written.
pub(crate) fn be_bytes_to_words(bytes: &[u8], words: &mut [u32]) {
    for (word, chunk) in words.iter_mut().zip(bytes.rchunks_exact(4)) {
        *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
}

/// Stores little-endian words as a big-endian byte string.
pub(crate) fn words_to_be_bytes(words: &[u32], bytes: &mut [u8]) {
    for (word, chunk) in words.iter().zip(bytes.rchunks_exact_mut(4)) {
        chunk.copy_from_slice(&word.to_be_bytes());
    }
}

/// Writes the compressed form of an uncompressed `2n`-byte public key into
/// `compressed` (`1 + n` bytes): the parity of y followed by x.
pub(crate) fn compress(public_key: &[u8], compressed: &mut [u8]) {
    let element_bytes = public_key.len() / 2;
    compressed[1..][..element_bytes].copy_from_slice(&public_key[..element_bytes]);
    compressed[0] = public_key[element_bytes * 2 - 1] & 0x01;
}

/// Copies a hash into an element-wide big-endian buffer. Longer hashes keep
/// their leftmost bytes, shorter ones are left-padded with zeros.
pub(crate) fn hash_to_element(hash: &[u8], element: &mut [u8]) {
    element.fill(0);
    if hash.len() >= element.len() {
        element.copy_from_slice(&hash[..element.len()]);
    } else {
        let pad = element.len() - hash.len();
        element[pad..].copy_from_slice(hash);
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn words_are_little_endian() {
        let bytes = hex!("0102030405060708");
        let mut words = [0u32; 2];
        be_bytes_to_words(&bytes, &mut words);
        assert_eq!(words, [0x05060708, 0x01020304]);
    }

    #[test]
    fn element_round_trip() {
        for len in [4usize, 24, 32] {
            let mut bytes = [0u8; 32];
            for (i, b) in bytes.iter_mut().enumerate().take(len) {
                *b = (i as u8).wrapping_mul(37).wrapping_add(11);
            }
            let mut words = [0u32; 8];
            be_bytes_to_words(&bytes[..len], &mut words[..len / 4]);

            let mut back = [0u8; 32];
            words_to_be_bytes(&words[..len / 4], &mut back[..len]);
            assert_eq!(bytes[..len], back[..len]);
        }
    }

    #[test]
    fn compress_keeps_x_and_y_parity() {
        let mut public_key = [0u8; 64];
        public_key[..32].copy_from_slice(&[0xaa; 32]);
        public_key[63] = 0x03;
        let mut compressed = [0u8; 33];
        compress(&public_key, &mut compressed);
        assert_eq!(compressed[0], 1);
        assert_eq!(compressed[1..], [0xaa; 32]);

        public_key[63] = 0x02;
        compress(&public_key, &mut compressed);
        assert_eq!(compressed[0], 0);
    }

    #[test]
    fn hashes_are_fitted_to_the_element() {
        let mut element = [0xffu8; 4];
        hash_to_element(&hex!("0102"), &mut element);
        assert_eq!(element, hex!("00000102"));

        hash_to_element(&hex!("0102030405"), &mut element);
        assert_eq!(element, hex!("01020304"));
    }
}
