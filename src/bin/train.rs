//! Gin Rummy CFR training binary.
//!
//! Usage:
//!   cargo run --release --bin train -- [OPTIONS]
//!
//! Trains in batches, reporting the Convergence Indicator after each batch,
//! and writes the regret/strategy tables in the text format that `--resume`
//! reads back.

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};

use gin_cfr::cfr::{CFRConfig, Trainer, WalkerKind};

#[derive(Parser, Debug)]
#[command(author, version, about = "Train Gin Rummy strategies with CFR", long_about = None)]
struct Args {
    /// Number of hands to train on
    #[arg(short, long, default_value_t = 100_000)]
    iterations: u64,

    /// Worker threads (default: all cores)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Random seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Exploration probability for the trained player
    #[arg(short, long)]
    exploration: Option<f64>,

    /// Truncate walks after this many full rounds
    #[arg(long)]
    max_turns: Option<u32>,

    /// Configuration JSON file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where to write the trained tables
    #[arg(short, long, default_value = "tables.txt")]
    output: PathBuf,

    /// Tables to resume training from
    #[arg(long)]
    resume: Option<PathBuf>,

    /// Use the full-width vanilla walker (keep --max-turns small)
    #[arg(long)]
    vanilla: bool,

    /// Hands per progress report
    #[arg(long, default_value_t = 10_000)]
    report_every: u64,

    /// Hands to play with the average strategy after training
    #[arg(long, default_value_t = 0)]
    evaluate: u64,
}

fn build_config(args: &Args) -> Result<CFRConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => {
            log::info!("loading configuration from {}", path.display());
            CFRConfig::from_json_file(path)?
        }
        None => CFRConfig::default(),
    };
    if let Some(e) = args.exploration {
        config = config.with_exploration(e);
    }
    if let Some(turns) = args.max_turns {
        config = config.with_max_turns(turns);
    }
    if let Some(threads) = args.threads {
        config = config.with_threads(threads);
    }
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    if args.vanilla {
        config = config.with_walker(WalkerKind::Vanilla);
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = build_config(&args)?;

    println!("=================================================");
    println!("  Gin Rummy CFR Trainer");
    println!("=================================================");
    println!();
    println!("Walker: {:?}", config.walker);
    println!("Exploration: {}", config.exploration);
    match config.max_turns {
        Some(turns) => println!("Turn cap: {} rounds", turns),
        None => println!("Turn cap: none"),
    }
    println!(
        "Rules: gin {} / undercut {} / knock at {}",
        config.rules.gin_bonus, config.rules.undercut_bonus, config.rules.max_deadwood
    );
    println!(
        "Threads: {}",
        config
            .num_threads
            .map_or_else(|| "auto".to_string(), |t| t.to_string())
    );
    println!("Iterations: {}", args.iterations);
    println!("Output: {}", args.output.display());
    println!();

    let mut trainer = Trainer::new(config);
    if let Some(path) = &args.resume {
        trainer.load_tables(path)?;
    }

    let pb = ProgressBar::new(args.iterations);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let start_time = Instant::now();
    let chunk = args.report_every.max(1);
    let mut snapshot = trainer.snapshot_strategies();
    let mut done = 0u64;

    while done < args.iterations {
        let batch = chunk.min(args.iterations - done);
        trainer.train_parallel(batch)?;
        done += batch;
        pb.set_position(done);

        let ci = trainer.calculate_ci(&snapshot);
        snapshot = trainer.snapshot_strategies();
        let stats = trainer.stats();
        pb.suspend(|| {
            println!(
                "Iteration {:>8} | CI: {:>6.2} | Keys: {:>8} | Regret: {:>8.4} | Speed: {:>6.0} it/s",
                done,
                if ci.is_infinite() { 0.0 } else { ci },
                stats.info_sets,
                stats.average_regret.unwrap_or(0.0),
                stats.iterations_per_second
            );
        });
    }
    pb.finish_and_clear();

    println!();
    println!("Training complete!");
    println!("Total time: {:.2}s", start_time.elapsed().as_secs_f64());
    println!("Final keys: {}", trainer.tables().num_info_sets());
    println!();

    trainer.save_tables(&args.output)?;

    if args.evaluate > 0 {
        let value = trainer.evaluate(args.evaluate)?;
        println!(
            "Average strategy value for player 0 over {} hands: {:+.3}",
            args.evaluate, value
        );
    }

    Ok(())
}
