//! Candidate acceptance tests
//!
//! A predicate turns one fully materialized candidate into either nothing or a
//! discovery. Mining uses [`DifficultyPredicate`] over block headers; key
//! search uses [`AddressMatchPredicate`] over key lanes.

use std::fmt;

use serde::{Deserialize, Serialize};

use talleo_crypto::encoding::BASE58_ALPHABET;
use talleo_crypto::hex;
use talleo_crypto::{
    check_hash, decode_address, encode_address, generate_view_from_spend, secret_key_to_public_key,
    AccountPublicAddress, Hash, Network,
};
use talleo_pattern::{AddressRules, Pattern};

use crate::block::{BlockHasher, BlockTemplate};
use crate::counter::{key_from_lanes, KEY_LANES};
use crate::error::{PredicateError, SearchError};

/// Pluggable acceptance test over one candidate
pub trait CandidatePredicate: Send + Sync {
    type Candidate: ?Sized;
    type Output: Send;

    /// `Ok(Some(_))` accepts the candidate, `Ok(None)` rejects it
    fn evaluate(&self, candidate: &Self::Candidate) -> Result<Option<Self::Output>, PredicateError>;
}

/// Predicate over multi-lane key material
pub trait KeyPredicate: CandidatePredicate<Candidate = [u64]> {
    /// Number of 64-bit lanes in one candidate
    fn lane_count(&self) -> usize;
}

/// Accepts a block whose hash meets the difficulty target
pub struct DifficultyPredicate<'h, H> {
    hasher: &'h H,
    difficulty: u64,
}

impl<'h, H: BlockHasher> DifficultyPredicate<'h, H> {
    pub fn new(hasher: &'h H, difficulty: u64) -> Self {
        Self { hasher, difficulty }
    }

    pub fn difficulty(&self) -> u64 {
        self.difficulty
    }
}

impl<H: BlockHasher> CandidatePredicate for DifficultyPredicate<'_, H> {
    type Candidate = BlockTemplate;
    type Output = Hash;

    fn evaluate(&self, block: &BlockTemplate) -> Result<Option<Hash>, PredicateError> {
        let hash = self.hasher.hash(block)?;
        Ok(check_hash(&hash, self.difficulty).then_some(hash))
    }
}

/// One discovered key pair and its address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDiscovery {
    pub address: String,
    pub spend_key: String,
    pub view_key: String,
}

impl fmt::Display for KeyDiscovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Address:   {}", self.address)?;
        writeln!(f, "Spend key: {}", self.spend_key)?;
        write!(f, "View key:  {}", self.view_key)
    }
}

#[derive(Debug, Clone)]
enum MatchMode {
    Prefix(Pattern),
    Exact {
        address: String,
        keys: AccountPublicAddress,
    },
}

/// Accepts keys whose derived address matches a prefix or a full address.
///
/// Prefix mode enumerates spend keys (4 lanes) and derives the view key
/// deterministically. Exact mode enumerates independent spend and view keys
/// (8 lanes) and compares public keys against the decoded target.
#[derive(Debug, Clone)]
pub struct AddressMatchPredicate {
    network: Network,
    mode: MatchMode,
}

impl AddressMatchPredicate {
    /// Prefix-mode predicate; the prefix must start with the network tag
    pub fn prefix(network: Network, prefix: &str) -> Result<Self, SearchError> {
        let pattern = Pattern::prefix(prefix);
        pattern.validate(&address_rules(&network))?;
        Ok(Self {
            network,
            mode: MatchMode::Prefix(pattern),
        })
    }

    /// Exact-mode predicate; the address must decode to valid public keys
    pub fn exact(network: Network, address: &str) -> Result<Self, SearchError> {
        Pattern::exact(address).validate(&address_rules(&network))?;
        let keys = decode_address(&network, address)?;
        Ok(Self {
            network,
            mode: MatchMode::Exact {
                address: address.to_string(),
                keys,
            },
        })
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// The prefix or address being searched for
    pub fn target(&self) -> &str {
        match &self.mode {
            MatchMode::Prefix(pattern) => &pattern.value,
            MatchMode::Exact { address, .. } => address,
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self.mode, MatchMode::Exact { .. })
    }

    fn evaluate_prefix(&self, pattern: &Pattern, lanes: &[u64]) -> Option<KeyDiscovery> {
        let spend = key_from_lanes(lanes);
        let spend_public_key = secret_key_to_public_key(&spend)?;
        let (view, view_public_key) = generate_view_from_spend(&spend);

        let address = encode_address(
            &self.network,
            &AccountPublicAddress {
                spend_public_key,
                view_public_key,
            },
        );
        if !pattern.matches(&address) {
            return None;
        }

        Some(KeyDiscovery {
            address,
            spend_key: hex::encode(spend),
            view_key: hex::encode(view),
        })
    }

    fn evaluate_exact(&self, target: &AccountPublicAddress, address: &str, lanes: &[u64]) -> Option<KeyDiscovery> {
        let view = key_from_lanes(&lanes[KEY_LANES..]);
        if secret_key_to_public_key(&view)? != target.view_public_key {
            return None;
        }

        let spend = key_from_lanes(&lanes[..KEY_LANES]);
        if secret_key_to_public_key(&spend)? != target.spend_public_key {
            return None;
        }

        Some(KeyDiscovery {
            address: address.to_string(),
            spend_key: hex::encode(spend),
            view_key: hex::encode(view),
        })
    }
}

impl CandidatePredicate for AddressMatchPredicate {
    type Candidate = [u64];
    type Output = KeyDiscovery;

    fn evaluate(&self, lanes: &[u64]) -> Result<Option<KeyDiscovery>, PredicateError> {
        let expected = self.lane_count();
        if lanes.len() != expected {
            return Err(PredicateError::LaneCount {
                expected,
                found: lanes.len(),
            });
        }

        Ok(match &self.mode {
            MatchMode::Prefix(pattern) => self.evaluate_prefix(pattern, lanes),
            MatchMode::Exact { address, keys } => self.evaluate_exact(keys, address, lanes),
        })
    }
}

impl KeyPredicate for AddressMatchPredicate {
    fn lane_count(&self) -> usize {
        match self.mode {
            MatchMode::Prefix(_) => KEY_LANES,
            MatchMode::Exact { .. } => 2 * KEY_LANES,
        }
    }
}

fn address_rules(network: &Network) -> AddressRules<'static> {
    AddressRules {
        tag: network.address_tag,
        length: network.address_length(),
        alphabet: BASE58_ALPHABET,
    }
}
