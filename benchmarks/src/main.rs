//! # Status List - Benchmark Suite
//!
//! Measures the status list pipeline in-process, against the in-memory
//! registry, so results reflect codec and service cost rather than
//! registry latency.
//!
//! ## Benchmarks Included
//!
//! 1. Codec Encode - pack, gzip and encode a list
//! 2. Codec Decode - decode, gunzip and unpack a list
//! 3. Batch Update - apply a batch to an in-memory list
//! 4. Status Check - end-to-end `check` through the service
//! 5. Status Update - end-to-end `update` (publishing) through the service
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --package benchmarks -- --all
//! cargo run --release --package benchmarks -- --benchmark codec-encode --length 1000000
//! cargo run --release --package benchmarks -- --all --output results.csv
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use hdrhistogram::Histogram;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use shared::constants::DEFAULT_STATUS_LIST_LENGTH;
use shared::types::{
    CheckStatusRequest, CreateStatusListRequest, Encoding, StatusAction, StatusPurpose,
    UpdateStatusRequest,
};
use status_service::cache::CacheManager;
use status_service::registry::InMemoryRegistry;
use status_service::service::StatusService;
use status_service::status_list::{codec, StatusList};

// Number of iterations for each benchmark
const DEFAULT_ITERATIONS: usize = 100;

// Warm-up iterations (not counted in results)
const WARMUP_ITERATIONS: usize = 5;

const BENCH_COLLECTION: &str = "did:example:benchmark";

#[derive(Parser, Debug)]
#[command(name = "benchmark")]
#[command(about = "Status List Benchmark Suite")]
struct Args {
    /// Run all benchmarks
    #[arg(long)]
    all: bool,

    /// Specific benchmark to run
    #[arg(long, value_enum)]
    benchmark: Option<BenchmarkType>,

    /// Number of iterations per benchmark
    #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
    iterations: usize,

    /// Bits per status list
    #[arg(long, default_value_t = DEFAULT_STATUS_LIST_LENGTH)]
    length: usize,

    /// Indices per update batch
    #[arg(long, default_value_t = 16)]
    batch: usize,

    /// Transport encoding
    #[arg(long, default_value = "base64url")]
    encoding: String,

    /// Output file for CSV results
    #[arg(long)]
    output: Option<String>,

    /// Skip warm-up iterations
    #[arg(long)]
    no_warmup: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BenchmarkType {
    CodecEncode,
    CodecDecode,
    BatchUpdate,
    StatusCheck,
    StatusUpdate,
}

#[derive(Debug, Clone, Serialize)]
struct BenchmarkResult {
    name: String,
    iterations: usize,
    min_ms: f64,
    max_ms: f64,
    mean_ms: f64,
    median_ms: f64,
    p95_ms: f64,
    p99_ms: f64,
    std_dev_ms: f64,
    timestamp: DateTime<Utc>,
}

impl BenchmarkResult {
    fn from_histogram(name: &str, histogram: &Histogram<u64>, iterations: usize) -> Self {
        let to_ms = |v: u64| v as f64 / 1000.0; // microseconds to milliseconds

        Self {
            name: name.to_string(),
            iterations,
            min_ms: to_ms(histogram.min()),
            max_ms: to_ms(histogram.max()),
            mean_ms: histogram.mean() / 1000.0,
            median_ms: to_ms(histogram.value_at_quantile(0.5)),
            p95_ms: to_ms(histogram.value_at_quantile(0.95)),
            p99_ms: to_ms(histogram.value_at_quantile(0.99)),
            std_dev_ms: histogram.stdev() / 1000.0,
            timestamp: Utc::now(),
        }
    }

    fn print_report(&self) {
        println!("\n{}", "=".repeat(60));
        println!("Benchmark: {}", self.name);
        println!("{}", "=".repeat(60));
        println!("Iterations: {}", self.iterations);
        println!();
        println!("  Min:      {:>10.3} ms", self.min_ms);
        println!("  Max:      {:>10.3} ms", self.max_ms);
        println!("  Mean:     {:>10.3} ms", self.mean_ms);
        println!("  Median:   {:>10.3} ms", self.median_ms);
        println!("  P95:      {:>10.3} ms", self.p95_ms);
        println!("  P99:      {:>10.3} ms", self.p99_ms);
        println!("  Std Dev:  {:>10.3} ms", self.std_dev_ms);
        println!("{}", "=".repeat(60));
    }
}

struct BenchmarkRunner {
    service: StatusService,
    iterations: usize,
    length: usize,
    batch: usize,
    encoding: Encoding,
    warmup: bool,
    verbose: bool,
}

impl BenchmarkRunner {
    fn new(args: &Args) -> Result<Self> {
        let registry = Arc::new(InMemoryRegistry::new());
        let config = shared::config::StatusServiceConfig::default();
        let cache = Arc::new(CacheManager::new(&config.cache));

        Ok(Self {
            service: StatusService::new(registry, cache, &config),
            iterations: args.iterations,
            length: args.length,
            batch: args.batch,
            encoding: args.encoding.parse()?,
            warmup: !args.no_warmup,
            verbose: args.verbose,
        })
    }

    fn create_histogram() -> Result<Histogram<u64>> {
        // Microsecond precision, max 60 seconds
        Histogram::new_with_bounds(1, 60_000_000, 3).context("invalid histogram bounds")
    }

    async fn run_benchmark<F, Fut>(&self, name: &str, mut f: F) -> Result<BenchmarkResult>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<()>>,
    {
        let mut histogram = Self::create_histogram()?;

        if self.warmup {
            if self.verbose {
                println!("  Warming up ({} iterations)...", WARMUP_ITERATIONS);
            }
            for _ in 0..WARMUP_ITERATIONS {
                f().await?;
            }
        }

        if self.verbose {
            println!("  Running {} iterations...", self.iterations);
        }

        for i in 0..self.iterations {
            let start = Instant::now();
            f().await?;
            let elapsed = start.elapsed();

            histogram.record(elapsed.as_micros().max(1) as u64).ok();

            if self.verbose {
                println!("    Iteration {}: {:.3} ms", i + 1, elapsed.as_secs_f64() * 1000.0);
            }
        }

        Ok(BenchmarkResult::from_histogram(name, &histogram, self.iterations))
    }

    /// A list with roughly 1% of its bits set
    fn sample_list(&self) -> Result<StatusList> {
        let mut rng = rand::thread_rng();
        let mut list = StatusList::allocate(self.length, StatusPurpose::Revocation)?;
        let indices: Vec<usize> = (0..(self.length / 100).max(1))
            .map(|_| rng.gen_range(0..self.length))
            .collect();
        list.apply_batch(&indices, StatusAction::Revoke)?;
        Ok(list)
    }

    fn random_batch(&self) -> Vec<usize> {
        let mut rng = rand::thread_rng();
        (0..self.batch.max(1)).map(|_| rng.gen_range(0..self.length)).collect()
    }

    async fn create_list(&self, name: &str, purpose: StatusPurpose) -> Result<()> {
        self.service
            .create(CreateStatusListRequest {
                collection_id: BENCH_COLLECTION.into(),
                name: name.into(),
                purpose,
                length: Some(self.length),
                encoding: Some(self.encoding),
                encrypted: false,
                key: None,
                version: None,
                also_known_as: Vec::new(),
            })
            .await?;
        Ok(())
    }

    // =========================================================================
    // BENCHMARK: Codec
    // =========================================================================

    async fn benchmark_codec_encode(&self) -> Result<BenchmarkResult> {
        println!("\nBenchmark: Codec Encode ({} bits, {})", self.length, self.encoding);
        let list = self.sample_list()?;
        let encoding = self.encoding;

        self.run_benchmark("Codec Encode", || {
            let result = codec::encode(list.bits(), encoding);
            async move {
                result?;
                Ok(())
            }
        })
        .await
    }

    async fn benchmark_codec_decode(&self) -> Result<BenchmarkResult> {
        println!("\nBenchmark: Codec Decode ({} bits, {})", self.length, self.encoding);
        let list = self.sample_list()?;
        let encoded = codec::encode(list.bits(), self.encoding)?;
        let encoding = self.encoding;
        let length = self.length;

        self.run_benchmark("Codec Decode", || {
            let result = codec::decode_exact(&encoded, encoding, length);
            async move {
                result?;
                Ok(())
            }
        })
        .await
    }

    // =========================================================================
    // BENCHMARK: Engine
    // =========================================================================

    async fn benchmark_batch_update(&self) -> Result<BenchmarkResult> {
        println!("\nBenchmark: Batch Update ({} indices)", self.batch);
        let mut list = StatusList::allocate(self.length, StatusPurpose::Suspension)?;

        self.run_benchmark("Batch Update", || {
            let batch = self.random_batch();
            let result = list
                .apply_batch(&batch, StatusAction::Suspend)
                .and_then(|_| list.apply_batch(&batch, StatusAction::Reinstate));
            async move {
                result?;
                Ok(())
            }
        })
        .await
    }

    // =========================================================================
    // BENCHMARK: Service
    // =========================================================================

    async fn benchmark_status_check(&self) -> Result<BenchmarkResult> {
        println!("\nBenchmark: Status Check (in-memory registry, cached bodies)");
        let name = format!("check-{}", Utc::now().timestamp_micros());
        self.create_list(&name, StatusPurpose::Revocation).await?;

        self.run_benchmark("Status Check", || {
            let index = rand::thread_rng().gen_range(0..self.length);
            let request = CheckStatusRequest {
                collection_id: BENCH_COLLECTION.into(),
                name: name.clone(),
                index,
                purpose: None,
                encrypted: None,
                key: None,
                version: None,
            };
            async move {
                self.service.check(request).await?;
                Ok(())
            }
        })
        .await
    }

    async fn benchmark_status_update(&self) -> Result<BenchmarkResult> {
        println!("\nBenchmark: Status Update (publishes one version per iteration)");
        let name = format!("update-{}", Utc::now().timestamp_micros());
        self.create_list(&name, StatusPurpose::Suspension).await?;

        let mut suspend = true;
        self.run_benchmark("Status Update", || {
            let action = if suspend { StatusAction::Suspend } else { StatusAction::Reinstate };
            suspend = !suspend;
            let request = UpdateStatusRequest {
                collection_id: BENCH_COLLECTION.into(),
                name: name.clone(),
                indices: self.random_batch(),
                action,
                publish: true,
                purpose: None,
                encrypted: None,
                key: None,
                version: None,
            };
            async move {
                self.service.update(request).await?;
                Ok(())
            }
        })
        .await
    }

    async fn run(&self, benchmark: BenchmarkType) -> Result<BenchmarkResult> {
        match benchmark {
            BenchmarkType::CodecEncode => self.benchmark_codec_encode().await,
            BenchmarkType::CodecDecode => self.benchmark_codec_decode().await,
            BenchmarkType::BatchUpdate => self.benchmark_batch_update().await,
            BenchmarkType::StatusCheck => self.benchmark_status_check().await,
            BenchmarkType::StatusUpdate => self.benchmark_status_update().await,
        }
    }
}

// =============================================================================
// CSV Export
// =============================================================================

fn export_to_csv(results: &[BenchmarkResult], filename: &str) -> Result<()> {
    use std::fs::File;
    use std::io::Write;

    let mut file = File::create(filename)?;

    writeln!(
        file,
        "benchmark,iterations,min_ms,max_ms,mean_ms,median_ms,p95_ms,p99_ms,std_dev_ms,timestamp"
    )?;

    for r in results {
        writeln!(
            file,
            "{},{},{:.3},{:.3},{:.3},{:.3},{:.3},{:.3},{:.3},{}",
            r.name,
            r.iterations,
            r.min_ms,
            r.max_ms,
            r.mean_ms,
            r.median_ms,
            r.p95_ms,
            r.p99_ms,
            r.std_dev_ms,
            r.timestamp.to_rfc3339()
        )?;
    }

    println!("\nResults exported to: {}", filename);
    Ok(())
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    println!("Status List Benchmark Suite");
    println!();
    println!("Configuration:");
    println!("  List length: {} bits", args.length);
    println!("  Batch size:  {}", args.batch);
    println!("  Encoding:    {}", args.encoding);
    println!("  Iterations:  {}", args.iterations);
    println!("  Warm-up:     {}", if args.no_warmup { "disabled" } else { "enabled" });

    let runner = BenchmarkRunner::new(&args).context("invalid benchmark configuration")?;

    let selected: Vec<BenchmarkType> = if args.all {
        BenchmarkType::value_variants().to_vec()
    } else if let Some(benchmark) = args.benchmark {
        vec![benchmark]
    } else {
        println!("No benchmark specified. Use --all or --benchmark <type>");
        println!();
        println!("Available benchmarks:");
        println!("  codec-encode  - Pack, gzip and encode a list");
        println!("  codec-decode  - Decode, gunzip and unpack a list");
        println!("  batch-update  - Apply a batch to an in-memory list");
        println!("  status-check  - End-to-end check through the service");
        println!("  status-update - End-to-end publishing update");
        println!();
        println!("Example: cargo run --release -p benchmarks -- --all");
        return Ok(());
    };

    let mut results = Vec::with_capacity(selected.len());
    for benchmark in selected {
        let result = runner.run(benchmark).await?;
        result.print_report();
        results.push(result);
    }

    info!(benchmarks = results.len(), "Benchmarks finished");

    println!("\nSUMMARY");
    println!("{:<30} {:>10} {:>10} {:>10}", "Benchmark", "Mean", "P95", "P99");
    println!("{}", "-".repeat(62));
    for r in &results {
        println!(
            "{:<30} {:>8.3}ms {:>8.3}ms {:>8.3}ms",
            r.name, r.mean_ms, r.p95_ms, r.p99_ms
        );
    }

    if let Some(output_file) = args.output {
        export_to_csv(&results, &output_file)?;
    }

    Ok(())
}
