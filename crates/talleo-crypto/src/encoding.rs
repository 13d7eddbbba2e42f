//! Encoding utilities: CryptoNote Base58 and varints

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("Invalid character '{0}' in Base58 input")]
    InvalidCharacter(char),
    #[error("Invalid length")]
    InvalidLength,
    #[error("Base58 block overflows its byte size")]
    Overflow,
    #[error("Truncated varint")]
    TruncatedVarint,
    #[error("Varint exceeds 64 bits")]
    VarintOverflow,
}

/// Base58 alphabet shared with Bitcoin
pub const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

const FULL_BLOCK_SIZE: usize = 8;
const FULL_ENCODED_BLOCK_SIZE: usize = 11;

/// Encoded length for a block of `index` bytes
const ENCODED_BLOCK_SIZES: [usize; FULL_BLOCK_SIZE + 1] = [0, 2, 3, 5, 6, 7, 9, 10, 11];

/// CryptoNote Base58 encoding.
///
/// Input is cut into 8-byte blocks. Each block is read big-endian and written
/// as a fixed number of characters, left-padded with '1', so the output length
/// depends only on the input length.
pub fn base58_encode(data: &[u8]) -> String {
    let alphabet = BASE58_ALPHABET.as_bytes();
    let mut out = String::with_capacity(
        data.len() / FULL_BLOCK_SIZE * FULL_ENCODED_BLOCK_SIZE + FULL_ENCODED_BLOCK_SIZE,
    );

    for chunk in data.chunks(FULL_BLOCK_SIZE) {
        let mut value = chunk.iter().fold(0u64, |acc, &byte| (acc << 8) | byte as u64);
        let mut block = [alphabet[0]; FULL_ENCODED_BLOCK_SIZE];
        let block_len = ENCODED_BLOCK_SIZES[chunk.len()];

        for slot in block[..block_len].iter_mut().rev() {
            *slot = alphabet[(value % 58) as usize];
            value /= 58;
        }

        for &c in &block[..block_len] {
            out.push(c as char);
        }
    }

    out
}

/// Length of the Base58 encoding of `byte_len` bytes
pub fn base58_encoded_len(byte_len: usize) -> usize {
    byte_len / FULL_BLOCK_SIZE * FULL_ENCODED_BLOCK_SIZE
        + ENCODED_BLOCK_SIZES[byte_len % FULL_BLOCK_SIZE]
}

/// CryptoNote Base58 decoding, the inverse of [`base58_encode`]
pub fn base58_decode(input: &str) -> Result<Vec<u8>, EncodingError> {
    let chars: Vec<char> = input.chars().collect();
    let mut out = Vec::with_capacity(chars.len() / FULL_ENCODED_BLOCK_SIZE * FULL_BLOCK_SIZE + FULL_BLOCK_SIZE);

    for block in chars.chunks(FULL_ENCODED_BLOCK_SIZE) {
        let byte_len = ENCODED_BLOCK_SIZES
            .iter()
            .position(|&size| size == block.len())
            .filter(|&len| len > 0)
            .ok_or(EncodingError::InvalidLength)?;

        let mut value: u128 = 0;
        for &c in block {
            let digit = BASE58_ALPHABET
                .find(c)
                .ok_or(EncodingError::InvalidCharacter(c))?;
            value = value * 58 + digit as u128;
        }

        if byte_len < FULL_BLOCK_SIZE && value >> (8 * byte_len) != 0 {
            return Err(EncodingError::Overflow);
        }
        if value > u64::MAX as u128 {
            return Err(EncodingError::Overflow);
        }

        let bytes = (value as u64).to_be_bytes();
        out.extend_from_slice(&bytes[FULL_BLOCK_SIZE - byte_len..]);
    }

    Ok(out)
}

/// Append `value` as an unsigned LEB128 varint
pub fn write_varint(mut value: u64, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Read a varint from the front of `input`, returning the value and bytes consumed
pub fn read_varint(input: &[u8]) -> Result<(u64, usize), EncodingError> {
    let mut value = 0u64;

    for (i, &byte) in input.iter().enumerate() {
        let shift = 7 * i as u32;
        if shift >= 64 || (shift == 63 && byte & 0x7f > 1) {
            return Err(EncodingError::VarintOverflow);
        }
        value |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }

    Err(EncodingError::TruncatedVarint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base58_known_blocks() {
        assert_eq!(base58_encode(&[]), "");
        assert_eq!(base58_encode(&[0x00]), "11");
        assert_eq!(base58_encode(&[0xff]), "5Q");
        assert_eq!(base58_encode(&[0u8; 8]), "11111111111");
        assert_eq!(base58_encode(&[0xffu8; 8]), "jpXCZedGfVQ");
        assert_eq!(
            base58_encode(&[0x06, 0x15, 0x60, 0x13, 0x76, 0x28, 0x79, 0xf7]),
            "22222222222"
        );
    }

    #[test]
    fn test_base58_length_is_fixed_by_input_length() {
        // 70 bytes: 8 full blocks plus a 6-byte tail
        assert_eq!(base58_encode(&[0u8; 70]).len(), 8 * 11 + 9);
        assert_eq!(base58_encoded_len(70), 97);
        assert_eq!(base58_encoded_len(69), 95);
    }

    #[test]
    fn test_base58_decode_roundtrip() {
        let data: Vec<u8> = (0u8..70).map(|b| b.wrapping_mul(37)).collect();
        let encoded = base58_encode(&data);
        assert_eq!(base58_decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_base58_decode_errors() {
        assert_eq!(base58_decode("0"), Err(EncodingError::InvalidLength));
        assert_eq!(base58_decode("1"), Err(EncodingError::InvalidLength));
        assert_eq!(base58_decode("0O"), Err(EncodingError::InvalidCharacter('0')));
        // 57 * 58 + 57 does not fit a single byte
        assert_eq!(base58_decode("zz"), Err(EncodingError::Overflow));
        // Largest 11-character value exceeds u64
        assert_eq!(base58_decode("zzzzzzzzzzz"), Err(EncodingError::Overflow));
    }

    #[test]
    fn test_varint() {
        let mut out = Vec::new();
        write_varint(0x361c, &mut out);
        assert_eq!(out, vec![0x9c, 0x6c]);
        assert_eq!(read_varint(&out).unwrap(), (0x361c, 2));

        let mut max = Vec::new();
        write_varint(u64::MAX, &mut max);
        assert_eq!(max.len(), 10);
        assert_eq!(read_varint(&max).unwrap(), (u64::MAX, 10));

        assert_eq!(read_varint(&[0x80]), Err(EncodingError::TruncatedVarint));
    }
}
