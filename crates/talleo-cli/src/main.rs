//! Talleo Search CLI
//!
//! Vanity address generator, key recovery by address and mining benchmark.

use std::io;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use talleo_core::{
    calculate_difficulty, format_difficulty, format_rate, AddressMatchPredicate, BlockMiningParameters,
    BlockTemplate, KeccakBlockHasher, KeyDiscovery, KeyPredicate, Miner, MinerConfig, MiningOutcome,
    MiningStatus, PatternType, SearchConfig, SearchCoordinator, SearchReport, StartKeys, TALLEO,
};
use talleo_crypto::encoding::BASE58_ALPHABET;
use talleo_crypto::{hex, secret_key_to_public_key, SecretKey};
use tracing::warn;

#[derive(Parser)]
#[command(name = "talleo-search")]
#[command(author = "Talleo Developers")]
#[command(version = "0.1.0")]
#[command(about = "Talleo vanity address generator and key finder", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find keys whose address starts with a prefix
    Prefix {
        /// Address prefix, including the network tag
        #[arg(short, long)]
        prefix: String,

        /// Number of addresses to find
        #[arg(short, long, default_value = "1")]
        count: u64,

        #[command(flatten)]
        start: StartArgs,

        /// Number of threads (0 = auto)
        #[arg(long, default_value = "0")]
        threads: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Recover the spend and view keys of an address
    Address {
        /// Full address to search for
        #[arg(short, long)]
        address: String,

        #[command(flatten)]
        start: StartArgs,

        /// Starting view key (hex)
        #[arg(long)]
        view: Option<String>,

        /// Number of threads (0 = auto)
        #[arg(long, default_value = "0")]
        threads: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the block miner against a synthetic template
    Bench {
        /// Number of threads (0 = auto)
        #[arg(long, default_value = "0")]
        threads: usize,

        /// Target difficulty
        #[arg(short, long, default_value = "100000000")]
        difficulty: u64,

        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        seconds: u64,
    },
}

#[derive(clap::Args)]
struct StartArgs {
    /// Start from random keys instead of zero
    #[arg(short, long)]
    randomize: bool,

    /// Starting spend key (hex)
    #[arg(long)]
    spend: Option<String>,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let found = match cli.command {
        Commands::Prefix {
            prefix,
            count,
            start,
            threads,
            json,
        } => cmd_prefix(&prefix, count, &start, threads, json)?,
        Commands::Address {
            address,
            start,
            view,
            threads,
            json,
        } => cmd_address(&address, &start, view.as_deref(), threads, json)?,
        Commands::Bench {
            threads,
            difficulty,
            seconds,
        } => cmd_bench(threads, difficulty, seconds)?,
    };

    Ok(if found { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn cmd_prefix(prefix: &str, count: u64, start: &StartArgs, threads: usize, json: bool) -> Result<bool> {
    let predicate = AddressMatchPredicate::prefix(TALLEO, prefix)?;
    let threads = resolve_threads(threads);

    if !json {
        let difficulty = calculate_difficulty(
            prefix,
            PatternType::Prefix,
            TALLEO.address_tag.len(),
            BASE58_ALPHABET.len(),
        );
        eprintln!("Talleo Search v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("Prefix: {}", prefix);
        eprintln!("Count: {}", count);
        eprintln!("Threads: {}", threads);
        eprintln!("Difficulty: {}", format_difficulty(difficulty));
        eprintln!();
    }

    let keys = start_keys(start, None)?;
    run_search(predicate, count, keys, threads, json)
}

fn cmd_address(address: &str, start: &StartArgs, view: Option<&str>, threads: usize, json: bool) -> Result<bool> {
    let predicate = AddressMatchPredicate::exact(TALLEO, address)?;
    let threads = resolve_threads(threads);

    if !json {
        eprintln!("Talleo Search v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("Address: {}", address);
        eprintln!("Threads: {}", threads);
        eprintln!();
    }

    let keys = start_keys(start, view)?;
    run_search(predicate, 1, keys, threads, json)
}

fn run_search(
    predicate: AddressMatchPredicate,
    count: u64,
    keys: StartKeys,
    threads: usize,
    json: bool,
) -> Result<bool> {
    let lanes = keys.lanes(predicate.lane_count());
    let config = SearchConfig {
        threads,
        ..Default::default()
    };
    let search = SearchCoordinator::new(predicate, count, config)?;

    let report = if json {
        let report = search.run_with_output(&lanes, io::sink())?;
        print_json(&report)?;
        report
    } else {
        let report = search.run(&lanes)?;
        print_summary(&report);
        report
    };

    Ok(report.found_any())
}

fn cmd_bench(threads: usize, difficulty: u64, seconds: u64) -> Result<bool> {
    let threads = resolve_threads(threads);
    let miner = Miner::new(
        KeccakBlockHasher,
        MinerConfig {
            report_interval: Duration::from_secs(1),
            ..Default::default()
        },
    );

    let timestamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    let params = BlockMiningParameters {
        block_template: BlockTemplate {
            major_version: 1,
            minor_version: 0,
            timestamp,
            previous_block_hash: rand::random(),
            merkle_root: rand::random(),
            nonce: 0,
        },
        difficulty,
    };

    eprintln!("Benchmarking block mining for {} seconds...", seconds);
    eprintln!("Threads: {}", threads);
    eprintln!("Difficulty: {}", difficulty);
    eprintln!();

    let started = Instant::now();
    let outcome = thread::scope(|s| {
        let handle = s.spawn(|| miner.mine(&params, threads));

        let deadline = started + Duration::from_secs(seconds);
        while !handle.is_finished() && (miner.state() == MiningStatus::Stopped || Instant::now() < deadline) {
            thread::sleep(Duration::from_millis(50));
        }
        miner.stop();

        handle.join().map_err(|_| anyhow!("Mining thread panicked"))
    })??;

    match outcome {
        MiningOutcome::Found(block) => {
            eprintln!(
                "Found nonce {} after {:.2}s",
                block.nonce,
                started.elapsed().as_secs_f64()
            );
            print_json(&block)?;
        }
        MiningOutcome::Cancelled => eprintln!("\nBenchmark complete!"),
    }

    Ok(true)
}

fn start_keys(start: &StartArgs, view: Option<&str>) -> Result<StartKeys> {
    let mut keys = if start.randomize {
        StartKeys::random(&mut rand::thread_rng())
    } else {
        StartKeys::default()
    };

    if let Some(spend) = &start.spend {
        keys.spend = parse_secret_key(spend).context("Invalid spend key")?;
    }
    if let Some(view) = view {
        keys.view = parse_secret_key(view).context("Invalid view key")?;
    }

    Ok(keys)
}

fn parse_secret_key(s: &str) -> Result<SecretKey> {
    let bytes = hex::decode(s)?;
    let key: SecretKey = bytes
        .try_into()
        .map_err(|b: Vec<u8>| anyhow!("Expected 32 bytes, got {}", b.len()))?;

    if secret_key_to_public_key(&key).is_none() {
        warn!("Start key is not a reduced scalar, candidates above the group order are skipped");
    }
    Ok(key)
}

fn resolve_threads(threads: usize) -> usize {
    if threads == 0 {
        num_cpus::get()
    } else {
        threads
    }
}

fn print_summary(report: &SearchReport<KeyDiscovery>) {
    eprintln!("{:-<60}", "");
    eprintln!("Found:       {}", report.discoveries.len());
    eprintln!("Keys Tested: {}", report.keys_tested);
    eprintln!("Time:        {:.2}s", report.time_secs);
    eprintln!("Speed:       {}", format_rate(report.keys_per_second, "keys"));
    if report.failures > 0 {
        eprintln!("Failed workers: {}", report.failures);
    }
    if report.exhausted {
        eprintln!("Keyspace exhausted.");
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
