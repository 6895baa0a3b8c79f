use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use race_grades::api::{router, ApiState};
use race_grades::config::Config;
use race_grades::error::Result;
use race_grades::state::SnapshotStore;

#[tokio::main]
async fn main() {
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

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    let store = SnapshotStore::new(&cfg.grades_dir, cfg.grading.fixed_cutoffs());
    let dates = store.list_available_dates()?;
    match dates.first() {
        Some(latest) => info!(
            "Grades store at {} ({} dated snapshots, newest {latest})",
            cfg.grades_dir.display(),
            dates.len()
        ),
        None => info!(
            "Grades store at {} is empty; run `grader` to publish a snapshot",
            cfg.grades_dir.display()
        ),
    }

    let app = router(ApiState::new(store));
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
