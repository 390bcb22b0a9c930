use anyhow::{bail, Context};
use challenge_core::{
    ChallengeError, ChallengeKind, HexPrefix, ShortestPathParams, SortOrder, SortedListParams,
};
use clap::{Parser, Subcommand};
use engine_cpu::{
    search_range, write_path, CandidatePredicate, EngineStatus, Range, ShortestPathPredicate,
    SortedListPredicate,
};
use miner_service::{format_rate, Solution, SolverConfig, DEFAULT_CHUNK_SIZE};
use pathfinder::Verdict;
use rand::RngCore;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Options shared by the two solve commands.
#[derive(clap::Args, Debug)]
struct SearchOpts {
    /// Hash of the previous block, hex encoded
    #[arg(long = "previous-hash", env = "MINER_PREVIOUS_HASH")]
    previous_hash: String,

    /// Hex prefix the witness hash must start with (case-sensitive)
    #[arg(long, env = "MINER_PREFIX")]
    prefix: String,

    /// Number of worker threads (defaults to all logical CPUs)
    #[arg(long = "workers", env = "MINER_WORKERS")]
    workers: Option<usize>,

    /// Nonces handed to each worker per round
    #[arg(long = "chunk-size", env = "MINER_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: u64,

    /// Nonces scanned between two checks of the cancellation flag.
    /// Lower values stop sibling workers sooner after a match.
    #[arg(
        long = "cancel-check-interval",
        env = "MINER_CANCEL_CHECK_INTERVAL",
        default_value_t = engine_cpu::DEFAULT_CANCEL_CHECK_INTERVAL
    )]
    cancel_check_interval: u64,

    /// Give up after this many rounds (default: search until found)
    #[arg(long = "max-rounds", env = "MINER_MAX_ROUNDS")]
    max_rounds: Option<u64>,

    /// First nonce to try (default: random)
    #[arg(long = "start-nonce", env = "MINER_START_NONCE")]
    start_nonce: Option<u64>,

    /// Optional Prometheus metrics exporter port; if omitted, metrics are not served
    #[arg(long, env = "MINER_METRICS_PORT")]
    metrics_port: Option<u16>,

    /// Enable verbose logging (per-worker and per-round details)
    #[arg(short, long, env = "MINER_VERBOSE")]
    verbose: bool,
}

impl SearchOpts {
    fn solver_config(&self) -> SolverConfig {
        SolverConfig {
            workers: self.workers,
            chunk_size: self.chunk_size,
            cancel_check_interval: self.cancel_check_interval,
            max_rounds: self.max_rounds,
            start_nonce: self.start_nonce,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search for a nonce whose sorted-list witness matches the prefix
    SortedList {
        #[command(flatten)]
        search: SearchOpts,

        /// Number of values drawn per nonce
        #[arg(long = "nb-elements", env = "MINER_NB_ELEMENTS", default_value_t = 100)]
        nb_elements: usize,

        /// Sort the values in descending order (reverse_sorted_list)
        #[arg(long)]
        descending: bool,
    },
    /// Search for a nonce whose verified shortest path matches the prefix
    ShortestPath {
        #[command(flatten)]
        search: SearchOpts,

        /// Grid side length, border included
        #[arg(long = "grid-size", env = "MINER_GRID_SIZE", default_value_t = 25)]
        grid_size: usize,

        /// Number of blocker draws per nonce
        #[arg(long = "nb-blockers", env = "MINER_NB_BLOCKERS", default_value_t = 80)]
        nb_blockers: usize,
    },
    /// Print the grid, verified path and witness hash for one nonce
    InspectPath {
        #[arg(long = "previous-hash")]
        previous_hash: String,

        #[arg(long)]
        nonce: u64,

        #[arg(long = "grid-size", default_value_t = 25)]
        grid_size: usize,

        #[arg(long = "nb-blockers", default_value_t = 80)]
        nb_blockers: usize,

        #[arg(short, long, env = "MINER_VERBOSE")]
        verbose: bool,
    },
    /// Print the sorted witness and its hash for one nonce
    InspectList {
        #[arg(long = "previous-hash")]
        previous_hash: String,

        #[arg(long)]
        nonce: u64,

        #[arg(long = "nb-elements", default_value_t = 100)]
        nb_elements: usize,

        #[arg(long)]
        descending: bool,

        #[arg(short, long, env = "MINER_VERBOSE")]
        verbose: bool,
    },
    /// Replay the built-in regression vectors
    SelfTest {
        #[arg(short, long, env = "MINER_VERBOSE")]
        verbose: bool,
    },
    /// Measure the nonce rate of a challenge on this machine
    Benchmark {
        /// Challenge to benchmark: sorted_list, reverse_sorted_list or shortest_path
        #[arg(long, default_value_t = ChallengeKind::ShortestPath)]
        challenge: ChallengeKind,

        /// Number of worker threads (defaults to all logical CPUs)
        #[arg(long = "workers", env = "MINER_WORKERS")]
        workers: Option<usize>,

        /// Benchmark duration in seconds
        #[arg(short, long, default_value_t = 10)]
        duration: u64,

        #[arg(long = "nb-elements", default_value_t = 100)]
        nb_elements: usize,

        #[arg(long = "grid-size", default_value_t = 25)]
        grid_size: usize,

        #[arg(long = "nb-blockers", default_value_t = 80)]
        nb_blockers: usize,

        /// Enable verbose logging during benchmark
        #[arg(short, long, env = "MINER_VERBOSE")]
        verbose: bool,
    },
}

/// Witness miner CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Command::SortedList {
            search,
            nb_elements,
            descending,
        } => run_sorted_list_command(search, nb_elements, descending).await,
        Command::ShortestPath {
            search,
            grid_size,
            nb_blockers,
        } => run_shortest_path_command(search, grid_size, nb_blockers).await,
        Command::InspectPath {
            previous_hash,
            nonce,
            grid_size,
            nb_blockers,
            verbose,
        } => {
            init_logger(verbose);
            run_inspect_path_command(&previous_hash, nonce, grid_size, nb_blockers)
        }
        Command::InspectList {
            previous_hash,
            nonce,
            nb_elements,
            descending,
            verbose,
        } => {
            init_logger(verbose);
            run_inspect_list_command(&previous_hash, nonce, nb_elements, descending)
        }
        Command::SelfTest { verbose } => {
            init_logger(verbose);
            run_self_test_command()
        }
        Command::Benchmark {
            challenge,
            workers,
            duration,
            nb_elements,
            grid_size,
            nb_blockers,
            verbose,
        } => {
            init_logger(verbose);
            let shape = ChallengeShape {
                nb_elements,
                grid_size,
                nb_blockers,
            };
            run_benchmark_command(challenge, shape, workers, duration).await
        }
    }
}

/// Initialize logging. An explicit RUST_LOG wins over `--verbose`.
fn init_logger(verbose: bool) {
    if std::env::var("RUST_LOG").is_err() {
        let log_level = if verbose {
            "debug,miner=debug,miner_service=debug,engine_cpu=debug,pathfinder=debug"
        } else {
            "info,miner=info,miner_service=info,engine_cpu=info,pathfinder=warn"
        };
        std::env::set_var("RUST_LOG", log_level);
    }
    env_logger::init();
}

async fn start_metrics(port: Option<u16>) -> anyhow::Result<()> {
    metrics::set_effective_cpus(num_cpus::get().max(1) as i64);
    if let Some(port) = port {
        metrics::start_http_exporter(port)
            .await
            .with_context(|| format!("starting metrics exporter on port {port}"))?;
    }
    Ok(())
}

async fn run_sorted_list_command(
    search: SearchOpts,
    nb_elements: usize,
    descending: bool,
) -> anyhow::Result<()> {
    init_logger(search.verbose);
    start_metrics(search.metrics_port).await?;

    let config = search.solver_config();
    log::info!("Effective config: {config}");

    let SearchOpts {
        previous_hash,
        prefix,
        ..
    } = search;
    let solution = tokio::task::spawn_blocking(move || {
        miner_service::solve_sorted_sequence(
            &config,
            &prefix,
            &previous_hash,
            nb_elements,
            !descending,
        )
    })
    .await
    .context("solver task panicked")??;

    println!("{}", solution.nonce);
    report_solution(&solution);
    Ok(())
}

async fn run_shortest_path_command(
    search: SearchOpts,
    grid_size: usize,
    nb_blockers: usize,
) -> anyhow::Result<()> {
    init_logger(search.verbose);
    start_metrics(search.metrics_port).await?;

    let config = search.solver_config();
    log::info!("Effective config: {config}");

    let SearchOpts {
        previous_hash,
        prefix,
        ..
    } = search;
    let solution = tokio::task::spawn_blocking(move || {
        miner_service::solve_shortest_path(&config, &prefix, &previous_hash, nb_blockers, grid_size)
    })
    .await
    .context("solver task panicked")??;

    println!("{}", solution.nonce);
    report_solution(&solution);
    Ok(())
}

fn report_solution(solution: &Solution) {
    log::info!(
        "{} rounds, {} nonces in {:.2?} ({})",
        solution.rounds,
        solution.examined,
        solution.elapsed,
        format_rate(solution.rate())
    );
    log::debug!(
        "Process totals: {} nonces over {} rounds",
        metrics::nonces_total(),
        metrics::rounds_total()
    );
}

fn run_inspect_path_command(
    previous_hash: &str,
    nonce: u64,
    grid_size: usize,
    nb_blockers: usize,
) -> anyhow::Result<()> {
    let params = ShortestPathParams::new(grid_size, nb_blockers)?;
    let mut predicate = ShortestPathPredicate::new(previous_hash, HexPrefix::new("")?, params)?;

    let verdict = predicate.solve(nonce);
    println!("nonce:   {nonce}");
    println!("start:   ({}, {})", predicate.start().row, predicate.start().col);
    println!("end:     ({}, {})", predicate.end().row, predicate.end().col);
    println!("{}", predicate.grid());
    println!("verdict: {verdict:?}");

    match verdict {
        Verdict::Accepted => {
            let digest = predicate
                .witness_digest(nonce)
                .context("accepted path produced no witness")?;
            println!("length:  {}", predicate.path().len());
            println!("path:    {}", predicate.serialized());
            println!("hash:    {}", hex::encode(digest));
        }
        Verdict::Mismatch => {
            let mut astar = String::new();
            let mut dijkstra = String::new();
            write_path(&mut astar, predicate.verifier().astar_path());
            write_path(&mut dijkstra, predicate.verifier().dijkstra_path());
            println!("a*:       {astar}");
            println!("dijkstra: {dijkstra}");
        }
        Verdict::Unreachable => {}
    }
    Ok(())
}

fn run_inspect_list_command(
    previous_hash: &str,
    nonce: u64,
    nb_elements: usize,
    descending: bool,
) -> anyhow::Result<()> {
    let params = SortedListParams::new(nb_elements, SortOrder::from_ascending(!descending))?;
    let mut predicate = SortedListPredicate::new(previous_hash, HexPrefix::new("")?, params);

    let digest = predicate
        .witness_digest(nonce)
        .context("sorted list produced no witness")?;
    println!("nonce:     {nonce}");
    println!("challenge: {}", params.kind());
    println!("values:    {:?}", predicate.witness(nonce));
    println!("hash:      {}", hex::encode(digest));
    Ok(())
}

fn run_self_test_command() -> anyhow::Result<()> {
    let report = miner_service::run_self_tests();
    println!("{report}");
    if !report.passed() {
        bail!("{} self-test check(s) failed", report.failures().count());
    }
    Ok(())
}

/// Challenge dimensions used by the benchmark.
#[derive(Clone, Copy, Debug)]
struct ChallengeShape {
    nb_elements: usize,
    grid_size: usize,
    nb_blockers: usize,
}

fn build_predicate(
    challenge: ChallengeKind,
    shape: ChallengeShape,
    previous_hash: &str,
    prefix: &HexPrefix,
) -> Result<Box<dyn CandidatePredicate>, ChallengeError> {
    Ok(match challenge {
        ChallengeKind::SortedList | ChallengeKind::ReverseSortedList => {
            let order = SortOrder::from_ascending(challenge == ChallengeKind::SortedList);
            let params = SortedListParams::new(shape.nb_elements, order)?;
            Box::new(SortedListPredicate::new(previous_hash, prefix.clone(), params))
        }
        ChallengeKind::ShortestPath => {
            let params = ShortestPathParams::new(shape.grid_size, shape.nb_blockers)?;
            Box::new(ShortestPathPredicate::new(
                previous_hash,
                prefix.clone(),
                params,
            )?)
        }
    })
}

async fn run_benchmark_command(
    challenge: ChallengeKind,
    shape: ChallengeShape,
    workers: Option<usize>,
    duration_secs: u64,
) -> anyhow::Result<()> {
    let num_cpus = num_cpus::get().max(1);
    let workers = workers.unwrap_or(num_cpus);
    if workers == 0 {
        bail!("No workers configured. Specify --workers > 0.");
    }

    let mut header = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut header);
    let previous_hash = hex::encode(header);
    // A full-length prefix never matches, so every worker runs for the whole duration.
    let prefix = HexPrefix::new(&"0".repeat(64))?;

    let mut predicates = Vec::with_capacity(workers);
    for _ in 0..workers {
        predicates.push(build_predicate(challenge, shape, &previous_hash, &prefix)?);
    }
    let name = predicates.first().map_or("unknown", |p| p.name());

    println!("Witness Miner Benchmark");
    println!("=======================");
    println!("Challenge: {name}");
    println!("Duration: {} seconds", duration_secs);
    println!("Workers: {}", workers);
    println!("Available CPUs: {}", num_cpus);
    println!();

    let cancel_flag = Arc::new(AtomicBool::new(false));
    let total_nonces = Arc::new(AtomicU64::new(0));
    let benchmark_start = Instant::now();

    // Each worker walks its own stripe of 10K-nonce chunks so no nonce is
    // tested twice.
    const CHUNK: u64 = 10_000;
    let stride = CHUNK * workers as u64;

    let mut handles = Vec::with_capacity(workers);
    for (worker_id, mut predicate) in predicates.into_iter().enumerate() {
        let cancel_flag = cancel_flag.clone();
        let total_nonces = total_nonces.clone();

        handles.push(thread::spawn(move || {
            let mut start = worker_id as u64 * CHUNK;
            while !cancel_flag.load(Ordering::Relaxed) {
                let range = Range::new(start, start + CHUNK);
                let status = search_range(
                    &mut predicate,
                    range,
                    &cancel_flag,
                    engine_cpu::DEFAULT_CANCEL_CHECK_INTERVAL,
                );
                total_nonces.fetch_add(status.hash_count(), Ordering::Relaxed);
                if let EngineStatus::Found { nonce, .. } = status {
                    log::warn!("benchmark worker {} unexpectedly matched nonce {}", worker_id, nonce);
                    break;
                }
                start += stride;
            }
        }));
    }

    let mut last_update = Instant::now();
    loop {
        tokio::time::sleep(Duration::from_millis(100)).await;

        if benchmark_start.elapsed() >= Duration::from_secs(duration_secs) {
            cancel_flag.store(true, Ordering::Relaxed);
            break;
        }

        if last_update.elapsed() >= Duration::from_secs(1) {
            let current = total_nonces.load(Ordering::Relaxed);
            let elapsed = benchmark_start.elapsed().as_secs_f64();
            if current > 0 {
                println!("{:.1}s - {}", elapsed, format_rate(current as f64 / elapsed));
            } else {
                println!("{:.1}s - starting...", elapsed);
            }
            last_update = Instant::now();
        }
    }

    for handle in handles {
        let _ = handle.join();
    }

    let total_elapsed = benchmark_start.elapsed();
    let final_nonces = total_nonces.load(Ordering::Relaxed);
    let avg_rate = final_nonces as f64 / total_elapsed.as_secs_f64();

    println!();
    println!("Benchmark Results");
    println!("=================");
    println!("Total time: {:.2} seconds", total_elapsed.as_secs_f64());
    println!("Total nonces: {}", final_nonces);
    println!("Average rate: {}", format_rate(avg_rate));
    if workers > 1 {
        println!(
            "Per-worker rate: {} (across {} workers)",
            format_rate(avg_rate / workers as f64),
            workers
        );
    }
    Ok(())
}
