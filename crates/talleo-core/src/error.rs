//! Error types for the search engine

use thiserror::Error;

use talleo_crypto::AddressError;
use talleo_pattern::PatternError;

/// Problems building a worker pool or a worker's assignment
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("At least one worker thread is required")]
    NoThreads,
    #[error("Worker {worker_id} is out of range for {worker_count} workers")]
    WorkerOutOfRange { worker_id: u64, worker_count: u64 },
    #[error("Execution context has {available} threads but {requested} workers were requested")]
    InsufficientThreads { requested: usize, available: usize },
    #[error("Failed to create thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Failures raised while evaluating a candidate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PredicateError {
    #[error("Hash computation failed: {0}")]
    Hash(String),
    #[error("Candidate has {found} lanes, expected {expected}")]
    LaneCount { expected: usize, found: usize },
}

/// Anything that ends a single worker early
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error(transparent)]
    Predicate(#[from] PredicateError),
    #[error(transparent)]
    Assignment(#[from] PoolError),
}

/// Key search configuration and runtime errors
#[derive(Error, Debug)]
pub enum SearchError {
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] PatternError),
    #[error("Invalid address: {0}")]
    Address(#[from] AddressError),
    #[error("Lane width must be between 1 and 64 bits, got {0}")]
    InvalidLaneWidth(u32),
    #[error("Result count must be at least 1")]
    InvalidTargetCount,
    #[error("Starting key has {found} lanes, expected {expected}")]
    StartLanes { expected: usize, found: usize },
    #[error("Failed to start telemetry: {0}")]
    Telemetry(#[from] std::io::Error),
    #[error("{failures} worker(s) failed")]
    WorkerFailed { failures: usize },
}

/// Mining configuration and runtime errors
#[derive(Error, Debug)]
pub enum MinerError {
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error("Difficulty must be non-zero")]
    InvalidDifficulty,
    #[error("Failed to start telemetry: {0}")]
    Telemetry(#[from] std::io::Error),
    #[error("{failures} mining worker(s) failed")]
    WorkerFailed { failures: usize },
}
