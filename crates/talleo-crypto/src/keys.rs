//! CryptoNote key derivation on Ed25519
//!
//! Secret keys are little-endian scalars; public keys are compressed Edwards
//! points. Unlike plain Ed25519 there is no seed hashing: the secret key *is*
//! the scalar, so a secret key outside the group order is simply invalid.

use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
use curve25519_dalek::scalar::Scalar;

use crate::hash::keccak256;

pub type SecretKey = [u8; 32];
pub type PublicKey = [u8; 32];

/// Derive the public key for `secret`, or `None` if it is not a canonical scalar
pub fn secret_key_to_public_key(secret: &SecretKey) -> Option<PublicKey> {
    let scalar: Option<Scalar> = Scalar::from_canonical_bytes(*secret).into();
    scalar.map(|s| EdwardsPoint::mul_base(&s).compress().to_bytes())
}

/// Reduce 32 arbitrary bytes to a valid secret key
pub fn sc_reduce32(seed: &[u8; 32]) -> SecretKey {
    Scalar::from_bytes_mod_order(*seed).to_bytes()
}

/// Deterministic view keypair: the view secret is `reduce(keccak256(spend))`
pub fn generate_view_from_spend(spend: &SecretKey) -> (SecretKey, PublicKey) {
    let view_scalar = Scalar::from_bytes_mod_order(keccak256(spend));
    let view_public = EdwardsPoint::mul_base(&view_scalar).compress().to_bytes();
    (view_scalar.to_bytes(), view_public)
}

/// Whether `key` decodes to a point on the curve
pub fn check_key(key: &PublicKey) -> bool {
    CompressedEdwardsY(*key).decompress().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(hex_str: &str) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&hex::decode(hex_str).unwrap());
        out
    }

    #[test]
    fn test_basepoint_from_unit_scalar() {
        let mut one = [0u8; 32];
        one[0] = 1;
        let public = secret_key_to_public_key(&one).unwrap();
        assert_eq!(
            hex::encode(public),
            "5866666666666666666666666666666666666666666666666666666666666666"
        );
    }

    #[test]
    fn test_zero_scalar_is_identity() {
        let public = secret_key_to_public_key(&[0u8; 32]).unwrap();
        let mut identity = [0u8; 32];
        identity[0] = 1;
        assert_eq!(public, identity);
    }

    #[test]
    fn test_non_canonical_secret_rejected() {
        assert!(secret_key_to_public_key(&[0xff; 32]).is_none());
        // Group order itself is not canonical
        let order = key("edd3f55c1a631258d69cf7a2def9de1400000000000000000000000000000010");
        assert!(secret_key_to_public_key(&order).is_none());
    }

    #[test]
    fn test_view_from_spend() {
        let mut spend = [0u8; 32];
        spend[0] = 1;
        let (view_secret, view_public) = generate_view_from_spend(&spend);
        assert_eq!(
            hex::encode(view_secret),
            "06c0f15cce848179f575821411bac9878ec4f8e5bc173827ba75cb10a63a9605"
        );
        assert_eq!(
            hex::encode(view_public),
            "7db1402bcabb40ad2e2059b5671ad9503b2dcb52bb559e7f88c60889dde9037d"
        );
        assert_eq!(secret_key_to_public_key(&view_secret), Some(view_public));
    }

    #[test]
    fn test_sc_reduce32() {
        let order = key("edd3f55c1a631258d69cf7a2def9de1400000000000000000000000000000010");
        assert_eq!(sc_reduce32(&order), [0u8; 32]);
    }

    #[test]
    fn test_check_key() {
        let base = key("5866666666666666666666666666666666666666666666666666666666666666");
        assert!(check_key(&base));
        // y = 2 has no matching x on the curve
        let mut off_curve = [0u8; 32];
        off_curve[0] = 2;
        assert!(!check_key(&off_curve));
    }
}
