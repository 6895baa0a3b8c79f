//! Offline grader: raw per-race metrics in, published grading snapshot out.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use race_grades::config::Config;
use race_grades::error::{AppError, Result};
use race_grades::scorer::{RawRaceMetrics, SnapshotGrader};
use race_grades::state::SnapshotStore;

#[derive(Parser, Debug)]
#[command(name = "grader")]
#[command(about = "Grade raw race market metrics and publish a dated snapshot")]
#[command(version)]
struct Cli {
    /// JSON array of raw per-race metrics
    #[arg(short, long)]
    input: PathBuf,

    /// Snapshot date (YYYY-MM-DD); defaults to today
    #[arg(short, long)]
    date: Option<NaiveDate>,

    /// Override GRADES_DIR
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Grade and print a summary without publishing
    #[arg(long)]
    dry_run: bool,
}

fn main() {
    let cli = Cli::parse();
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cli, cfg) {
        error!("Grading failed: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli, cfg: Config) -> Result<()> {
    let raw = std::fs::read(&cli.input)?;
    let metrics: Vec<RawRaceMetrics> = serde_json::from_slice(&raw)?;
    if metrics.is_empty() {
        return Err(AppError::InvalidSnapshot(format!(
            "{} contains no races",
            cli.input.display()
        )));
    }

    let date = cli.date.unwrap_or_else(|| chrono::Local::now().date_naive());
    let snapshot = SnapshotGrader::new(cfg.grading).grade(date, &metrics);

    let mut counts = [0usize; 5];
    for race in &snapshot.races {
        counts[race.grade.ordinal() as usize] += 1;
    }
    info!(
        "Graded {} races for {date}: A={} B={} C={} D={} F={}",
        snapshot.total_races, counts[0], counts[1], counts[2], counts[3], counts[4]
    );

    if cli.dry_run {
        info!("Dry run; nothing published");
        return Ok(());
    }

    let dir = cli.dir.unwrap_or(cfg.grades_dir);
    let store = SnapshotStore::new(dir, cfg.grading.fixed_cutoffs());
    let path = store.publish(&snapshot)?;
    info!("Snapshot written to {}", path.display());
    Ok(())
}
