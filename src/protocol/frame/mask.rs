//! XOR masking of WebSocket payloads, RFC 6455 §5.3: every client-to-server
//! frame carries a random 4-byte key, and the payload is recovered (or
//! produced) by XORing each byte against `key[i % 4]`.

/// Draw a fresh masking key for an outbound client frame.
#[inline]
pub fn generate_key() -> [u8; 4] {
    rand::random()
}

/// XOR `payload` in place against `key`, cycling the key every 4 bytes.
///
/// Masking is an involution, so the same call both masks and unmasks.
pub fn apply_mask(payload: &mut [u8], key: [u8; 4]) {
    let mut chunks = payload.chunks_exact_mut(4);

    for chunk in &mut chunks {
        for (byte, k) in chunk.iter_mut().zip(key) {
            *byte ^= k;
        }
    }

    for (byte, k) in chunks.into_remainder().iter_mut().zip(key) {
        *byte ^= k;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masking_twice_with_the_same_key_is_a_no_op() {
        let key = [0x11, 0x22, 0x33, 0x44];
        let original = b"a much longer payload than four bytes, to exercise the remainder".to_vec();

        let mut buf = original.clone();
        apply_mask(&mut buf, key);
        assert_ne!(buf, original);

        apply_mask(&mut buf, key);
        assert_eq!(buf, original);
    }

    #[test]
    fn masks_a_payload_shorter_than_the_key() {
        let key = [0x01, 0x02, 0x03, 0x04];
        let mut buf = vec![0xFF, 0xFF];
        apply_mask(&mut buf, key);
        assert_eq!(buf, vec![0xFF ^ 0x01, 0xFF ^ 0x02]);
    }
}
