use std::{
    error::Error,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use clap::{Parser, ValueEnum};
use hdrhistogram::Histogram;
use tracing_subscriber::EnvFilter;

use tollgate::{SystemClock, TokenBucketLimiter, TokenBucketLimiterOptions};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KeyDist {
    Hot,
    Uniform,
    Skewed,
}

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
enum Mode {
    Max,
    TargetQps,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tollgate-stress",
    about = "Load test / benchmark harness for tollgate"
)]
struct Args {
    #[arg(long, value_enum, default_value_t = KeyDist::Hot)]
    key_dist: KeyDist,

    #[arg(long, value_enum, default_value_t = Mode::Max)]
    mode: Mode,

    #[arg(long, default_value_t = 8)]
    threads: usize,

    #[arg(long, default_value_t = 60)]
    duration_s: u64,

    #[arg(long, default_value_t = 1000.0)]
    refill_rate: f64,

    #[arg(long, default_value_t = 100)]
    capacity: u64,

    /// Defaults to `--capacity` (buckets start full).
    #[arg(long)]
    initial_tokens: Option<u64>,

    #[arg(long, default_value_t = 100000)]
    key_space: usize,

    #[arg(long, default_value_t = 0.8)]
    hot_fraction: f64,

    #[arg(long, default_value_t = 100)]
    sample_every: u64,

    /// Only used when `--mode target-qps`; rate per worker thread.
    #[arg(long)]
    target_qps: Option<u64>,
}

#[derive(Default)]
struct Counts {
    allowed: AtomicU64,
    rejected: AtomicU64,
}

fn build_options(args: &Args) -> TokenBucketLimiterOptions {
    TokenBucketLimiterOptions {
        refill_rate: args.refill_rate,
        capacity: args.capacity,
        initial_tokens: args.initial_tokens.unwrap_or(args.capacity),
    }
}

fn build_keys(args: &Args) -> Vec<String> {
    let n = match args.key_dist {
        KeyDist::Hot => 1,
        _ => args.key_space.max(1),
    };
    (0..n).map(|i| format!("10.0.{}.{}", i / 256, i % 256)).collect()
}

fn should_sample(iter: u64, sample_every: u64) -> bool {
    if sample_every <= 1 {
        return true;
    }

    iter.is_multiple_of(sample_every)
}

fn pick_key<'a>(args: &Args, keys: &'a [String], thread_rng: &mut impl FnMut() -> u64) -> &'a str {
    match args.key_dist {
        KeyDist::Hot => &keys[0],
        KeyDist::Uniform => {
            let idx = (thread_rng() as usize) % keys.len();
            &keys[idx]
        }
        KeyDist::Skewed => {
            let r = (thread_rng() % 10_000) as f64 / 10_000.0;
            if r < args.hot_fraction {
                &keys[0]
            } else {
                let idx = 1 + ((thread_rng() as usize) % (keys.len().saturating_sub(1).max(1)));
                &keys[idx % keys.len()]
            }
        }
    }
}

fn print_results(
    args: &Args,
    elapsed: Duration,
    ops: u64,
    hist: &Histogram<u64>,
    counts: &Counts,
    keys_seen: usize,
) {
    let options = build_options(args);
    let ops_s = ops as f64 / elapsed.as_secs_f64();
    let allowed = counts.allowed.load(Ordering::Relaxed);

    println!(
        "refill_rate={} capacity={} initial_tokens={} mode={:?}",
        options.refill_rate, options.capacity, options.initial_tokens, args.mode
    );
    println!(
        "threads={} duration_s={} key_dist={:?} key_space={} keys_seen={}",
        args.threads, args.duration_s, args.key_dist, args.key_space, keys_seen
    );
    println!(
        "elapsed_s={:.3} ops={} ops_per_s={:.0}",
        elapsed.as_secs_f64(),
        ops,
        ops_s
    );
    println!(
        "allowed={} rejected={}",
        allowed,
        counts.rejected.load(Ordering::Relaxed)
    );

    // Upper bound on admissions if every seen key started with its initial tokens and
    // refilled for the whole run.
    let bound = keys_seen as f64
        * (options.initial_tokens as f64 + options.refill_rate * elapsed.as_secs_f64());
    println!("admission_bound={:.0} within_bound={}", bound, allowed as f64 <= bound.ceil());

    if !hist.is_empty() {
        println!(
            "lat_us p50={} p95={} p99={} p999={} max={}",
            hist.value_at_quantile(0.50),
            hist.value_at_quantile(0.95),
            hist.value_at_quantile(0.99),
            hist.value_at_quantile(0.999),
            hist.max()
        );
        println!("sample_every={} samples={}", args.sample_every, hist.len());
    } else {
        println!("no latency samples collected");
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let options = build_options(&args);
    if let Err(err) = options.validate() {
        tracing::warn!(error = %err, "stress.options, running with invalid options");
    }

    let limiter = Arc::new(TokenBucketLimiter::with_options(options, SystemClock));
    let keys = build_keys(&args);

    let stop = Arc::new(AtomicBool::new(false));
    let counts = Arc::new(Counts::default());
    let total_ops = Arc::new(AtomicU64::new(0));

    let started = Instant::now();
    let deadline = started + Duration::from_secs(args.duration_s);

    tracing::info!(
        threads = args.threads,
        duration_s = args.duration_s,
        "stress.start"
    );

    let mut handles = Vec::with_capacity(args.threads);
    for t in 0..args.threads {
        let limiter = Arc::clone(&limiter);
        let keys = keys.clone();
        let stop = Arc::clone(&stop);
        let counts = Arc::clone(&counts);
        let total_ops = Arc::clone(&total_ops);
        let args = args.clone();

        handles.push(std::thread::spawn(move || -> Result<Histogram<u64>, String> {
            let mut hist =
                Histogram::<u64>::new_with_bounds(1, 60_000_000, 3).map_err(|e| format!("{e:?}"))?;
            let mut i = 0_u64;
            let mut seed = (t as u64 + 1) * 0x9E37_79B9_7F4A_7C15;
            let mut next_deadline = Instant::now();

            let mut rng_u64 = || {
                // xorshift64*
                seed ^= seed >> 12;
                seed ^= seed << 25;
                seed ^= seed >> 27;
                seed = seed.wrapping_mul(0x2545_F491_4F6C_DD1D);
                seed
            };

            while !stop.load(Ordering::Relaxed) {
                if Instant::now() >= deadline {
                    break;
                }

                if args.mode == Mode::TargetQps
                    && let Some(qps) = args.target_qps
                {
                    let per_op_ns = 1_000_000_000u64 / qps.max(1);
                    let now = Instant::now();
                    if now < next_deadline {
                        std::thread::sleep(next_deadline - now);
                    }
                    next_deadline += Duration::from_nanos(per_op_ns);
                }

                i = i.wrapping_add(1);
                let k = pick_key(&args, &keys, &mut rng_u64);
                let sample = should_sample(i, args.sample_every);
                let t0 = if sample { Some(Instant::now()) } else { None };

                let result = limiter.allow(k);

                if let Some(t0) = t0 {
                    let us = t0.elapsed().as_micros() as u64;
                    let _ = hist.record(us.max(1));
                }

                total_ops.fetch_add(1, Ordering::Relaxed);
                if result.allowed {
                    counts.allowed.fetch_add(1, Ordering::Relaxed);
                } else {
                    counts.rejected.fetch_add(1, Ordering::Relaxed);
                }
            }

            Ok(hist)
        }));
    }

    std::thread::sleep(Duration::from_secs(args.duration_s));
    stop.store(true, Ordering::Relaxed);

    let mut merged = Histogram::<u64>::new_with_bounds(1, 60_000_000, 3)
        .map_err(|e| format!("histogram: {e:?}"))?;
    for h in handles {
        let hist = h.join().map_err(|_| "stress worker panicked")??;
        merged
            .add(&hist)
            .map_err(|e| format!("histogram merge: {e:?}"))?;
    }

    let elapsed = started.elapsed();
    let ops = total_ops.load(Ordering::Relaxed);
    print_results(&args, elapsed, ops, &merged, &counts, limiter.len());

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    run(Args::parse())
}
