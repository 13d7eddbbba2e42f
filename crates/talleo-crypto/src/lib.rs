//! Talleo Crypto Primitives
//!
//! Pure functions consumed by the search predicates: hashing, key derivation,
//! CryptoNote Base58 and address encoding.

pub mod address;
pub mod encoding;
pub mod hash;
pub mod keys;

pub use self::address::{decode_address, encode_address, AccountPublicAddress, AddressError, Network, TALLEO};
pub use self::hash::{check_hash, keccak256, Hash};
pub use self::keys::{generate_view_from_spend, secret_key_to_public_key, PublicKey, SecretKey};

// Re-export dependencies for use by other crates
pub use hex;
