use std::path::PathBuf;

use crate::error::{AppError, Result};
use crate::scorer::{CutoffPolicy, GradingPolicy, ScoreWeights};
use crate::types::GradeCutoffs;

pub const GRADES_DIR: &str = "data/grades";

/// Composite score weights (volume, spread, open interest). Must sum to 1.0.
pub const DEFAULT_WEIGHT_VOLUME: f64 = 0.35;
pub const DEFAULT_WEIGHT_SPREAD: f64 = 0.45;
pub const DEFAULT_WEIGHT_OI: f64 = 0.20;

/// Fixed grade cutoffs used when no quantile-derived cutoffs are available.
pub const DEFAULT_CUTOFFS: GradeCutoffs = GradeCutoffs { a: 0.8, b: 0.6, c: 0.4, d: 0.2 };

/// Quantiles of the composite score distribution at which A/B/C/D begin.
pub const CUTOFF_QUANTILES: [f64; 4] = [80.0, 60.0, 40.0, 20.0];

/// Number of segments in the text-table heat bar.
pub const HEAT_BAR_WIDTH: usize = 10;

/// Margin -> rating breaks, checked top-down with `margin >= threshold`.
/// Anything below the last break is "Solid D".
pub const RATING_BREAKS: &[(i64, &str)] = &[
    (17, "Solid R"),
    (9, "Likely R"),
    (4, "Lean R"),
    (-4, "Tossup"),
    (-9, "Lean D"),
    (-17, "Likely D"),
];

/// TUI auto-refresh interval (seconds).
pub const TUI_REFRESH_INTERVAL_SECS: u64 = 30;

/// HTTP client timeout for the TUI (seconds).
pub const CLIENT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub grades_dir: PathBuf,
    pub log_level: String,
    pub api_port: u16,
    /// Weights and cutoffs injected into the grade model (GRADE_WEIGHTS, GRADE_CUTOFFS)
    pub grading: GradingPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let weights = match std::env::var("GRADE_WEIGHTS") {
            Ok(raw) => parse_weights(&raw)?,
            Err(_) => ScoreWeights::default(),
        };
        let cutoffs = match std::env::var("GRADE_CUTOFFS") {
            Ok(raw) => parse_cutoff_policy(&raw)?,
            Err(_) => CutoffPolicy::Quantile,
        };

        Ok(Self {
            grades_dir: std::env::var("GRADES_DIR")
                .unwrap_or_else(|_| GRADES_DIR.to_string())
                .into(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            grading: GradingPolicy { weights, cutoffs },
        })
    }
}

fn parse_numbers(raw: &str, name: &str, expected: usize) -> Result<Vec<f64>> {
    let values = raw
        .split(',')
        .map(|s| s.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| AppError::Config(format!("{name} must be comma-separated numbers")))?;
    if values.len() != expected {
        return Err(AppError::Config(format!("{name} expects {expected} values, got {}", values.len())));
    }
    Ok(values)
}

/// `volume,spread,open_interest`
pub fn parse_weights(raw: &str) -> Result<ScoreWeights> {
    let v = parse_numbers(raw, "GRADE_WEIGHTS", 3)?;
    ScoreWeights::new(v[0], v[1], v[2])
}

/// `quantile` or `a,b,c,d`
pub fn parse_cutoff_policy(raw: &str) -> Result<CutoffPolicy> {
    if raw.trim().eq_ignore_ascii_case("quantile") {
        return Ok(CutoffPolicy::Quantile);
    }
    let v = parse_numbers(raw, "GRADE_CUTOFFS", 4)?;
    let cutoffs = GradeCutoffs { a: v[0], b: v[1], c: v[2], d: v[3] };
    crate::scorer::check_cutoffs(&cutoffs)?;
    Ok(CutoffPolicy::Fixed(cutoffs))
}
