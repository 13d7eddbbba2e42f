//! Key search engine
//!
//! Workers split the outermost key lane with [`BoundedStrideWalker`]s and,
//! for every outer value they own, enumerate all inner lanes in big-number
//! order. The run ends once the found-counter reaches its target or every
//! worker has exhausted its share of the keyspace.
//!
//! [`BoundedStrideWalker`]: crate::BoundedStrideWalker

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use rayon::ThreadPool;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use talleo_crypto::keys::sc_reduce32;
use talleo_crypto::SecretKey;

use crate::cell::{FoundCounter, StopSignal};
use crate::counter::{lanes_from_key, MultiWordCounter};
use crate::error::{PoolError, SearchError, WorkerError};
use crate::pool::{WorkerAssignment, WorkerPool};
use crate::predicate::KeyPredicate;
use crate::stats::{format_count, format_rate, SearchStats};
use crate::telemetry::Reporter;
use crate::walker::lane_mask;

/// Candidates counted locally before being added to the shared statistics
const KEY_BATCH: u64 = 64;

/// Search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Number of worker threads
    pub threads: usize,
    /// Width of every key lane in bits; below 64 restricts the keyspace
    pub lane_bits: u32,
    /// Seconds between progress lines
    pub report_interval_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            lane_bits: 64,
            report_interval_secs: 10,
        }
    }
}

/// Search result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchReport<T> {
    /// Everything found, in publication order
    pub discoveries: Vec<T>,
    /// Total keys tested
    pub keys_tested: u64,
    /// Time taken in seconds
    pub time_secs: f64,
    /// Keys per second achieved
    pub keys_per_second: f64,
    /// Whole keyspace searched without reaching the target count
    pub exhausted: bool,
    /// Workers that ended with an error or a panic
    pub failures: usize,
}

impl<T> SearchReport<T> {
    pub fn found_any(&self) -> bool {
        !self.discoveries.is_empty()
    }
}

/// Starting spend and view keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StartKeys {
    pub spend: SecretKey,
    pub view: SecretKey,
}

impl StartKeys {
    /// Random canonical keys
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut spend = [0u8; 32];
        let mut view = [0u8; 32];
        rng.fill_bytes(&mut spend);
        rng.fill_bytes(&mut view);
        Self {
            spend: sc_reduce32(&spend),
            view: sc_reduce32(&view),
        }
    }

    /// Starting lanes for a predicate: spend lanes first, then view lanes
    pub fn lanes(&self, lane_count: usize) -> Vec<u64> {
        lanes_from_key(&self.spend)
            .into_iter()
            .chain(lanes_from_key(&self.view))
            .take(lane_count)
            .collect()
    }
}

struct SinkState<W, T> {
    out: W,
    discoveries: Vec<T>,
}

/// Serializes discovery output so blocks from different workers never interleave
struct DiscoverySink<W, T> {
    state: Mutex<SinkState<W, T>>,
}

impl<W: Write, T: fmt::Display> DiscoverySink<W, T> {
    fn new(out: W) -> Self {
        Self {
            state: Mutex::new(SinkState {
                out,
                discoveries: Vec::new(),
            }),
        }
    }

    /// Print and count one discovery unless the target is already met
    fn publish(&self, discovery: T, found: &FoundCounter) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if found.reached() {
            return;
        }

        if let Err(e) = writeln!(state.out, "{}\n", discovery).and_then(|_| state.out.flush()) {
            warn!("Failed to write discovery: {}", e);
        }
        state.discoveries.push(discovery);
        found.record();
    }

    fn into_discoveries(self) -> Vec<T> {
        self.state
            .into_inner()
            .unwrap_or_else(|e| e.into_inner())
            .discoveries
    }
}

/// Runs a [`KeyPredicate`] over the keyspace until `target_count` keys are found
pub struct SearchCoordinator<P> {
    predicate: P,
    target_count: u64,
    config: SearchConfig,
    context: Option<Arc<ThreadPool>>,
}

impl<P> SearchCoordinator<P>
where
    P: KeyPredicate,
    P::Output: fmt::Display,
{
    pub fn new(predicate: P, target_count: u64, config: SearchConfig) -> Result<Self, SearchError> {
        if target_count == 0 {
            return Err(SearchError::InvalidTargetCount);
        }
        if !(1..=64).contains(&config.lane_bits) {
            return Err(SearchError::InvalidLaneWidth(config.lane_bits));
        }
        if config.threads == 0 {
            return Err(PoolError::NoThreads.into());
        }

        Ok(Self {
            predicate,
            target_count,
            config,
            context: None,
        })
    }

    /// Spawn workers on `context` instead of a dedicated pool per run
    pub fn with_context(mut self, context: Arc<ThreadPool>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn predicate(&self) -> &P {
        &self.predicate
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Search from `start`, printing discoveries to stdout
    pub fn run(&self, start: &[u64]) -> Result<SearchReport<P::Output>, SearchError> {
        self.run_with_output(start, io::stdout())
    }

    /// Search from `start`, printing each discovery to `out` as one block
    pub fn run_with_output<W: Write + Send>(
        &self,
        start: &[u64],
        out: W,
    ) -> Result<SearchReport<P::Output>, SearchError> {
        let lane_count = self.predicate.lane_count();
        if lane_count == 0 || start.len() != lane_count {
            return Err(SearchError::StartLanes {
                expected: lane_count,
                found: start.len(),
            });
        }

        let pool = match &self.context {
            Some(context) => WorkerPool::with_context(Arc::clone(context), self.config.threads)?,
            None => WorkerPool::new(self.config.threads)?,
        };
        let found = FoundCounter::new(self.target_count);
        let sink = DiscoverySink::new(out);
        let stats = SearchStats::new();

        let interval = Duration::from_secs(self.config.report_interval_secs.max(1));
        let reporter = {
            let stats = Arc::clone(&stats);
            Reporter::spawn("talleo-progress", interval, move || {
                info!(
                    "Tested {} keys ({})",
                    format_count(stats.total()),
                    format_rate(stats.per_second(), "keys")
                );
            })?
        };

        info!(
            threads = self.config.threads,
            lanes = lane_count,
            lane_bits = self.config.lane_bits,
            "Searching for {} result(s)",
            self.target_count
        );

        let outer_start = start[lane_count - 1] & lane_mask(self.config.lane_bits);
        let report = pool.run(outer_start, &found, |assignment| {
            self.search_lanes(start, assignment, &found, &sink, &stats)
        });
        reporter.finish();

        let discoveries = sink.into_discoveries();
        let failures = report.failures.len();
        if failures > 0 {
            if discoveries.is_empty() {
                return Err(SearchError::WorkerFailed { failures });
            }
            warn!(
                failures,
                "Search halted by failed workers after {} discoveries",
                discoveries.len()
            );
        }

        let exhausted = report.is_clean() && !found.reached();
        if exhausted {
            info!("Keyspace exhausted after {} keys", stats.total());
        }

        Ok(SearchReport {
            discoveries,
            keys_tested: stats.total(),
            time_secs: stats.elapsed().as_secs_f64(),
            keys_per_second: stats.per_second(),
            exhausted,
            failures,
        })
    }

    fn search_lanes<W: Write>(
        &self,
        start: &[u64],
        assignment: WorkerAssignment,
        found: &FoundCounter,
        sink: &DiscoverySink<W, P::Output>,
        stats: &SearchStats,
    ) -> Result<(), WorkerError> {
        let mut counter = MultiWordCounter::new(start, self.config.lane_bits);
        let outer = counter.outer_lane();
        let mut pending = 0u64;

        for outer_value in assignment.walker(self.config.lane_bits)? {
            counter.set_lane(outer, outer_value);
            counter.rewind_inner();

            loop {
                if found.should_stop() {
                    stats.add(pending);
                    return Ok(());
                }

                let accepted = self.predicate.evaluate(counter.lanes());
                pending += 1;
                if pending == KEY_BATCH {
                    stats.add(pending);
                    pending = 0;
                }
                if let Some(discovery) = accepted? {
                    sink.publish(discovery, found);
                }

                if !counter.step() {
                    break;
                }
            }
        }

        stats.add(pending);
        Ok(())
    }
}
