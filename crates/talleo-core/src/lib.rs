//! Talleo Search Engine
//!
//! Concurrent bounded-keyspace search shared by the block miner and the
//! address/key finder: overflow-safe partitioning of the search space across
//! workers, a lock-free coordination cell and pluggable candidate predicates.

mod block;
mod cell;
mod counter;
mod error;
mod miner;
mod pool;
mod predicate;
mod search;
mod stats;
mod telemetry;
mod walker;

pub use block::{BlockHasher, BlockMiningParameters, BlockTemplate, KeccakBlockHasher};
pub use cell::{CellValue, CoordinationCell, FoundCounter, MiningStatus, StopSignal};
pub use counter::{key_from_lanes, lanes_from_key, MultiWordCounter, KEY_LANES};
pub use error::{MinerError, PoolError, PredicateError, SearchError, WorkerError};
pub use miner::{Miner, MinerConfig, MiningOutcome};
pub use pool::{PoolReport, WorkerAssignment, WorkerFailure, WorkerPool};
pub use predicate::{AddressMatchPredicate, CandidatePredicate, DifficultyPredicate, KeyDiscovery, KeyPredicate};
pub use search::{SearchConfig, SearchCoordinator, SearchReport, StartKeys};
pub use stats::{format_count, format_rate, SearchStats};
pub use telemetry::Reporter;
pub use walker::{lane_mask, last_safe_offset, BoundedStrideWalker};

// Re-exports for convenience
pub use talleo_crypto::{Network, TALLEO};
pub use talleo_pattern::{calculate_difficulty, format_difficulty, Pattern, PatternType};
