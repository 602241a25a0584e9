//! CLI binary for edgebench.

use clap::{Args, Parser, Subcommand};
use edgebench::compare::compare;
use edgebench::config::BenchConfig;
use edgebench::detector::OrtDetector;
use edgebench::monitor::SystemSampler;
use edgebench::report::{self, ResultWriter};
use edgebench::runner::{BenchmarkRunner, FrameProgress, RunMode};
use edgebench::source::{FrameSource, ImageSource, SyntheticSource};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Edgebench: inference benchmarking harness for single-board computers.
#[derive(Parser)]
#[command(name = "edgebench", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Benchmark one model and write a result record.
    Run(RunArgs),

    /// Compare two benchmark records.
    Compare(CompareArgs),

    /// Print a few system metric snapshots and exit.
    Probe {
        /// Number of snapshots to take, one per second.
        #[arg(long, default_value_t = 3)]
        count: u32,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Path to the ONNX model.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Model identifier for result records (default: model file stem).
    #[arg(long)]
    name: Option<String>,

    /// Benchmark against a static image, re-fed each iteration.
    #[arg(long, conflicts_with = "synthetic")]
    image: Option<PathBuf>,

    /// Benchmark against generated random frames.
    #[arg(long)]
    synthetic: bool,

    /// Run for a fixed wall-clock duration in seconds.
    #[arg(long, conflicts_with = "iterations")]
    duration: Option<u64>,

    /// Run for a fixed number of frames.
    #[arg(long)]
    iterations: Option<u64>,

    /// Square input resolution fed to the model.
    #[arg(long)]
    input_size: Option<u32>,

    /// Confidence threshold for detection candidates.
    #[arg(long)]
    conf: Option<f32>,

    /// Results root directory.
    #[arg(long)]
    results_dir: Option<PathBuf>,
}

#[derive(Args)]
struct CompareArgs {
    /// First record path.
    #[arg(long)]
    a: Option<PathBuf>,

    /// Second record path.
    #[arg(long)]
    b: Option<PathBuf>,

    /// Resolve the latest record for each configured model instead.
    #[arg(long)]
    auto: bool,

    /// Results root directory searched in auto mode.
    #[arg(long)]
    results_dir: Option<PathBuf>,

    /// Where to write the comparison JSON.
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing — suppress noisy dependency logs by default.
    // Users can override with RUST_LOG=debug to see everything.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("edgebench=info,ort=warn")),
        )
        .init();

    let cli = Cli::parse();

    // Load config
    let config = if let Some(ref path) = cli.config {
        BenchConfig::from_file(path)?
    } else {
        BenchConfig::default()
    };

    match cli.command {
        Command::Run(args) => run_benchmark(config, args),
        Command::Compare(args) => run_comparison(config, args),
        Command::Probe { count } => probe(count),
    }
}

fn run_benchmark(mut config: BenchConfig, args: RunArgs) -> anyhow::Result<()> {
    if let Some(model) = args.model {
        config.model.path = model;
    }
    if let Some(name) = args.name {
        config.model.name = Some(name);
    }
    if let Some(size) = args.input_size {
        config.model.input_size = size;
    }
    if let Some(conf) = args.conf {
        config.model.confidence_threshold = conf;
    }
    if let Some(dir) = args.results_dir {
        config.output.results_dir = Some(dir);
    }
    if let Some(duration) = args.duration {
        config.run.duration_seconds = duration;
    }
    if let Some(iterations) = args.iterations {
        config.run.iterations = iterations;
    }
    if config.model.path.as_os_str().is_empty() {
        anyhow::bail!("no model specified: pass --model or set model.path in the config file");
    }

    // Duration mode only on request; a static input defaults to a fixed
    // iteration count.
    let mode = if args.duration.is_some() {
        RunMode::Duration(Duration::from_secs(config.run.duration_seconds))
    } else {
        RunMode::Iterations(config.run.iterations)
    };

    println!("edgebench v{}", env!("CARGO_PKG_VERSION"));

    let mut source: Box<dyn FrameSource> = if let Some(ref image) = args.image {
        Box::new(ImageSource::open(image, config.model.input_size)?)
    } else {
        if !args.synthetic {
            info!("no input specified; defaulting to synthetic frames");
        }
        Box::new(SyntheticSource::new(config.model.input_size))
    };

    let mut detector = OrtDetector::load(&config.model)?;
    let mut runner = BenchmarkRunner::from_settings(mode, &config.run);

    let pb = match mode {
        RunMode::Iterations(n) => ProgressBar::new(n),
        RunMode::Duration(d) => ProgressBar::new(d.as_secs()),
    };
    if let Ok(style) = ProgressStyle::with_template("  [{bar:30}] {pos}/{len} {msg}") {
        pb.set_style(style);
    }

    let started = Instant::now();
    let result = runner.run_with_progress(
        &mut detector,
        source.as_mut(),
        &mut |progress: FrameProgress| {
            match mode {
                RunMode::Iterations(_) => pb.set_position(progress.frame),
                RunMode::Duration(d) => {
                    pb.set_position(started.elapsed().as_secs().min(d.as_secs()));
                }
            }
            pb.set_message(format!(
                "FPS {:.2} | {:.1}ms",
                progress.windowed_fps, progress.latency_ms
            ));
        },
    )?;
    pb.finish_and_clear();

    let writer = ResultWriter::new(config.output.results_dir());
    let written = writer.write(&result)?;

    println!(
        "\n{} frames in {:.1}s ({:?}) | avg FPS {:.2} | avg inference {:.1}ms",
        result.total_frames,
        result.elapsed_seconds,
        result.state,
        result.fps.average,
        result.inference_ms.average,
    );
    println!("Record: {}", written.json_path.display());
    println!("Log:    {}", written.log_path.display());
    Ok(())
}

fn run_comparison(config: BenchConfig, args: CompareArgs) -> anyhow::Result<()> {
    let results_dir = args
        .results_dir
        .unwrap_or_else(|| config.output.results_dir());

    let use_auto = args.auto || args.a.is_none() || args.b.is_none();
    let (path_a, path_b) = if use_auto {
        let models = &config.compare.models;
        anyhow::ensure!(
            models.len() == 2,
            "auto comparison needs exactly two entries in compare.models, found {}",
            models.len()
        );
        info!("resolving latest records for {} and {}", models[0], models[1]);
        (
            report::find_latest_record(&results_dir, &models[0])?,
            report::find_latest_record(&results_dir, &models[1])?,
        )
    } else {
        // Both present when use_auto is false.
        (args.a.unwrap_or_default(), args.b.unwrap_or_default())
    };

    let result_a = report::load_result(&path_a)?;
    let result_b = report::load_result(&path_b)?;
    let comparison = compare(&result_a, &result_b, &config.compare.metrics)?;

    print!("{}", report::render_comparison_text(&comparison));

    let output = args
        .output
        .unwrap_or_else(|| results_dir.join("comparison_result.json"));
    report::write_comparison(&comparison, &output)?;
    println!("\nComparison saved to: {}", output.display());
    Ok(())
}

fn probe(count: u32) -> anyhow::Result<()> {
    let mut sampler = SystemSampler::new();
    for i in 0..count {
        let sample = sampler.sample();
        println!("Snapshot {}/{count}:", i + 1);
        println!("  CPU:       {}", fmt_pct(sample.cpu_percent));
        println!("  RAM:       {}", fmt_pct(sample.memory_percent));
        println!(
            "  Temp:      {}",
            sample
                .temperature_celsius
                .map(|v| format!("{v:.1}C"))
                .unwrap_or_else(|| "n/a".to_owned())
        );
        println!(
            "  Throttled: {}",
            sample
                .throttled
                .map(|t| t.to_string())
                .unwrap_or_else(|| "n/a".to_owned())
        );
        if i + 1 < count {
            std::thread::sleep(Duration::from_secs(1));
        }
    }
    Ok(())
}

fn fmt_pct(value: Option<f32>) -> String {
    value
        .map(|v| format!("{v:.1}%"))
        .unwrap_or_else(|| "n/a".to_owned())
}
