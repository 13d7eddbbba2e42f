//! Account address encoding
//!
//! Address = Base58(varint(prefix) || spend_pub || view_pub || checksum), where
//! the checksum is the first 4 bytes of Keccak-256 over everything before it.

use thiserror::Error;

use crate::encoding::{base58_decode, base58_encode, base58_encoded_len, read_varint, write_varint, EncodingError};
use crate::hash::keccak256;
use crate::keys::{check_key, PublicKey};

const CHECKSUM_SIZE: usize = 4;
const KEYS_SIZE: usize = 64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Invalid Base58: {0}")]
    Encoding(#[from] EncodingError),
    #[error("Address prefix {found:#x} does not match network prefix {expected:#x}")]
    WrongPrefix { expected: u64, found: u64 },
    #[error("Invalid address payload length {0}")]
    InvalidLength(usize),
    #[error("Invalid address checksum")]
    InvalidChecksum,
    #[error("Address contains a key that is not a curve point")]
    InvalidKey,
}

/// Network-specific address parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Network {
    /// Human-readable network name
    pub name: &'static str,
    /// Varint tag prepended to every address payload
    pub address_prefix: u64,
    /// Leading characters every address on this network starts with
    pub address_tag: &'static str,
}

/// Talleo mainnet
pub const TALLEO: Network = Network {
    name: "Talleo",
    address_prefix: 0x361c,
    address_tag: "TA",
};

impl Network {
    /// Length in characters of every address on this network
    pub fn address_length(&self) -> usize {
        let mut prefix = Vec::with_capacity(10);
        write_varint(self.address_prefix, &mut prefix);
        base58_encoded_len(prefix.len() + KEYS_SIZE + CHECKSUM_SIZE)
    }
}

/// The two public keys an address commits to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountPublicAddress {
    pub spend_public_key: PublicKey,
    pub view_public_key: PublicKey,
}

/// Encode a public address for `network`
pub fn encode_address(network: &Network, keys: &AccountPublicAddress) -> String {
    let mut data = Vec::with_capacity(10 + KEYS_SIZE + CHECKSUM_SIZE);
    write_varint(network.address_prefix, &mut data);
    data.extend_from_slice(&keys.spend_public_key);
    data.extend_from_slice(&keys.view_public_key);

    let checksum = keccak256(&data);
    data.extend_from_slice(&checksum[..CHECKSUM_SIZE]);

    base58_encode(&data)
}

/// Decode and fully validate an address for `network`
pub fn decode_address(network: &Network, address: &str) -> Result<AccountPublicAddress, AddressError> {
    let data = base58_decode(address)?;
    if data.len() < CHECKSUM_SIZE {
        return Err(AddressError::InvalidLength(data.len()));
    }

    let (body, checksum) = data.split_at(data.len() - CHECKSUM_SIZE);
    if keccak256(body)[..CHECKSUM_SIZE] != *checksum {
        return Err(AddressError::InvalidChecksum);
    }

    let (prefix, consumed) = read_varint(body)?;
    if prefix != network.address_prefix {
        return Err(AddressError::WrongPrefix {
            expected: network.address_prefix,
            found: prefix,
        });
    }

    let keys = &body[consumed..];
    if keys.len() != KEYS_SIZE {
        return Err(AddressError::InvalidLength(keys.len()));
    }

    let mut spend_public_key = [0u8; 32];
    let mut view_public_key = [0u8; 32];
    spend_public_key.copy_from_slice(&keys[..32]);
    view_public_key.copy_from_slice(&keys[32..]);

    if !check_key(&spend_public_key) || !check_key(&view_public_key) {
        return Err(AddressError::InvalidKey);
    }

    Ok(AccountPublicAddress {
        spend_public_key,
        view_public_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{generate_view_from_spend, secret_key_to_public_key};

    const UNIT_SPEND_ADDRESS: &str =
        "TAW567v1uyPJ8QgRfFWTzmJ8QgRfFWTzmJ8QgRfFWTzmJ8Qt2Q3UpMYBpSgzU64UbsdMDJw1z3urCTWdbLQoHuvQ12jqMhBwD";

    fn unit_spend_keys() -> AccountPublicAddress {
        let mut spend = [0u8; 32];
        spend[0] = 1;
        AccountPublicAddress {
            spend_public_key: secret_key_to_public_key(&spend).unwrap(),
            view_public_key: generate_view_from_spend(&spend).1,
        }
    }

    #[test]
    fn test_address_length() {
        assert_eq!(TALLEO.address_length(), 97);
    }

    #[test]
    fn test_encode_known_address() {
        let address = encode_address(&TALLEO, &unit_spend_keys());
        assert_eq!(address, UNIT_SPEND_ADDRESS);
        assert!(address.starts_with(TALLEO.address_tag));
    }

    #[test]
    fn test_zero_spend_key_address() {
        let (_, view_public) = generate_view_from_spend(&[0u8; 32]);
        let keys = AccountPublicAddress {
            spend_public_key: secret_key_to_public_key(&[0u8; 32]).unwrap(),
            view_public_key: view_public,
        };
        assert_eq!(
            encode_address(&TALLEO, &keys),
            "TAVKZojFKq9111111111111111111111111111111111111JuAww3sCXRdffnmiHUw29oG6Buo7XCGjMqg2WmFtY21ToFhZau"
        );
    }

    #[test]
    fn test_decode_address() {
        let decoded = decode_address(&TALLEO, UNIT_SPEND_ADDRESS).unwrap();
        assert_eq!(decoded, unit_spend_keys());
    }

    #[test]
    fn test_decode_rejects_corruption() {
        let mut corrupted = UNIT_SPEND_ADDRESS.to_string();
        corrupted.replace_range(20..21, "A");
        assert!(decode_address(&TALLEO, &corrupted).is_err());

        assert!(matches!(
            decode_address(&TALLEO, "TA0"),
            Err(AddressError::Encoding(_))
        ));
    }

    #[test]
    fn test_decode_rejects_other_network() {
        let other = Network {
            name: "Other",
            address_prefix: 18,
            address_tag: "4",
        };
        let address = encode_address(&other, &unit_spend_keys());
        assert_eq!(address.len(), 95);
        assert_eq!(
            decode_address(&TALLEO, &address),
            Err(AddressError::WrongPrefix {
                expected: 0x361c,
                found: 18
            })
        );
    }
}
