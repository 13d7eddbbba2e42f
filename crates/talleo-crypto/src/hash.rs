//! Hash functions and the proof-of-work difficulty check

use sha3::{Digest, Keccak256};

/// 32-byte hash as produced by the CryptoNote fast hash
pub type Hash = [u8; 32];

/// Keccak-256 (the CryptoNote "fast hash", NOT SHA3-256)
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Check a hash against a difficulty.
///
/// The hash is read as a little-endian 256-bit integer and accepted iff
/// `hash * difficulty` still fits in 256 bits, i.e. the hash does not exceed
/// the target `floor((2^256 - 1) / difficulty)`. A zero difficulty is not a
/// valid target and never accepts.
pub fn check_hash(hash: &Hash, difficulty: u64) -> bool {
    if difficulty == 0 {
        return false;
    }

    let mut carry: u128 = 0;
    for chunk in hash.chunks_exact(8) {
        let mut word = [0u8; 8];
        word.copy_from_slice(chunk);
        let product = u64::from_le_bytes(word) as u128 * difficulty as u128 + carry;
        carry = product >> 64;
    }

    carry == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak256() {
        // Empty input
        let result = keccak256(b"");
        assert_eq!(
            hex::encode(result),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_check_hash_bounds() {
        let zero = [0u8; 32];
        let max = [0xffu8; 32];

        assert!(check_hash(&zero, u64::MAX));
        assert!(check_hash(&max, 1));
        assert!(!check_hash(&max, 2));
        assert!(!check_hash(&zero, 0));
    }

    #[test]
    fn test_check_hash_top_word_decides() {
        // 2^255 exactly: fits with difficulty 1, overflows with 2
        let mut half = [0u8; 32];
        half[31] = 0x80;
        assert!(check_hash(&half, 1));
        assert!(!check_hash(&half, 2));

        // 2^255 - 1
        let mut below = [0xffu8; 32];
        below[31] = 0x7f;
        assert!(check_hash(&below, 2));
        assert!(!check_hash(&below, 3));
    }
}
