//! Block header model consumed by the miner

use serde::{Deserialize, Serialize};

use talleo_crypto::encoding::write_varint;
use talleo_crypto::{keccak256, Hash};

use crate::error::PredicateError;

/// Block header skeleton whose nonce is varied while mining
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTemplate {
    pub major_version: u8,
    pub minor_version: u8,
    pub timestamp: u64,
    pub previous_block_hash: Hash,
    pub merkle_root: Hash,
    pub nonce: u64,
}

impl BlockTemplate {
    /// Bytes fed to the proof-of-work hash
    pub fn hashing_blob(&self) -> Vec<u8> {
        let mut blob = Vec::with_capacity(96);
        write_varint(u64::from(self.major_version), &mut blob);
        write_varint(u64::from(self.minor_version), &mut blob);
        write_varint(self.timestamp, &mut blob);
        blob.extend_from_slice(&self.previous_block_hash);
        blob.extend_from_slice(&self.nonce.to_le_bytes());
        blob.extend_from_slice(&self.merkle_root);
        blob
    }
}

/// Everything one mining run needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockMiningParameters {
    pub block_template: BlockTemplate,
    pub difficulty: u64,
}

/// Proof-of-work hash over a block header
pub trait BlockHasher: Send + Sync {
    fn hash(&self, block: &BlockTemplate) -> Result<Hash, PredicateError>;
}

/// Keccak-256 over the hashing blob
#[derive(Debug, Clone, Copy, Default)]
pub struct KeccakBlockHasher;

impl BlockHasher for KeccakBlockHasher {
    fn hash(&self, block: &BlockTemplate) -> Result<Hash, PredicateError> {
        Ok(keccak256(&block.hashing_blob()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> BlockTemplate {
        BlockTemplate {
            major_version: 1,
            minor_version: 0,
            timestamp: 300,
            previous_block_hash: [7u8; 32],
            merkle_root: [9u8; 32],
            nonce: 0x0102_0304,
        }
    }

    #[test]
    fn test_hashing_blob_layout() {
        let blob = template().hashing_blob();
        // 1, 0, varint(300) = [0xac, 0x02]
        assert_eq!(&blob[..4], &[1, 0, 0xac, 0x02]);
        assert_eq!(&blob[4..36], &[7u8; 32]);
        assert_eq!(&blob[36..44], &[4, 3, 2, 1, 0, 0, 0, 0]);
        assert_eq!(&blob[44..], &[9u8; 32]);
    }

    #[test]
    fn test_nonce_changes_hash() {
        let hasher = KeccakBlockHasher;
        let mut block = template();
        let first = hasher.hash(&block).unwrap();
        block.nonce += 1;
        assert_ne!(first, hasher.hash(&block).unwrap());
    }
}
