use crate::config::{
    CUTOFF_QUANTILES, DEFAULT_CUTOFFS, DEFAULT_WEIGHT_OI, DEFAULT_WEIGHT_SPREAD,
    DEFAULT_WEIGHT_VOLUME, RATING_BREAKS,
};
use crate::error::{AppError, Result};
use crate::types::{Grade, GradeCutoffs, GradingSnapshot};

// ---------------------------------------------------------------------------
// Grading policy
// ---------------------------------------------------------------------------

/// Weights applied to the three percentile ranks to form the composite score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    volume: f64,
    spread: f64,
    open_interest: f64,
}

impl ScoreWeights {
    pub fn new(volume: f64, spread: f64, open_interest: f64) -> Result<Self> {
        if [volume, spread, open_interest].iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(AppError::Config("grade weights must be non-negative".to_string()));
        }
        let sum = volume + spread + open_interest;
        if (sum - 1.0).abs() > 1e-6 {
            return Err(AppError::Config(format!("grade weights must sum to 1.0, got {sum:.4}")));
        }
        Ok(Self { volume, spread, open_interest })
    }

    pub fn equal() -> Self {
        let third = 1.0 / 3.0;
        Self { volume: third, spread: third, open_interest: third }
    }

    /// Composite liquidity score in [0, 1] from three percentile ranks in [0, 1].
    pub fn composite(&self, volume_pct: f64, spread_pct: f64, oi_pct: f64) -> f64 {
        let score = self.volume * volume_pct + self.spread * spread_pct + self.open_interest * oi_pct;
        score.clamp(0.0, 1.0)
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            volume: DEFAULT_WEIGHT_VOLUME,
            spread: DEFAULT_WEIGHT_SPREAD,
            open_interest: DEFAULT_WEIGHT_OI,
        }
    }
}

/// How grade cutoffs are chosen when a snapshot is produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CutoffPolicy {
    /// A = top 20% of composite scores, B = 60-80th, C = 40-60th, D = 20-40th, F = rest.
    Quantile,
    Fixed(GradeCutoffs),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradingPolicy {
    pub weights: ScoreWeights,
    pub cutoffs: CutoffPolicy,
}

impl GradingPolicy {
    pub fn resolve_cutoffs(&self, scores: &[f64]) -> GradeCutoffs {
        match self.cutoffs {
            CutoffPolicy::Quantile => quantile_cutoffs(scores),
            CutoffPolicy::Fixed(c) => c,
        }
    }

    /// Cutoffs a stored snapshot without its own is held to. `None` under the
    /// quantile policy, where they are rebuilt from the snapshot's scores.
    pub fn fixed_cutoffs(&self) -> Option<GradeCutoffs> {
        match self.cutoffs {
            CutoffPolicy::Quantile => None,
            CutoffPolicy::Fixed(c) => Some(c),
        }
    }
}

impl Default for GradingPolicy {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            cutoffs: CutoffPolicy::Quantile,
        }
    }
}

// ---------------------------------------------------------------------------
// Bucketing
// ---------------------------------------------------------------------------

impl GradeCutoffs {
    /// Pure, monotone bucketing of a composite score. Non-finite scores grade F.
    pub fn grade_for(&self, score: f64) -> Grade {
        if !score.is_finite() {
            return Grade::F;
        }
        if score >= self.a {
            Grade::A
        } else if score >= self.b {
            Grade::B
        } else if score >= self.c {
            Grade::C
        } else if score >= self.d {
            Grade::D
        } else {
            Grade::F
        }
    }
}

pub fn check_cutoffs(c: &GradeCutoffs) -> Result<()> {
    let ordered = [c.a, c.b, c.c, c.d];
    if ordered.iter().any(|v| !(0.0..=1.0).contains(v)) {
        return Err(AppError::Config("grade cutoffs must lie in [0, 1]".to_string()));
    }
    if ordered.windows(2).any(|w| w[0] < w[1]) {
        return Err(AppError::Config("grade cutoffs must be descending (A >= B >= C >= D)".to_string()));
    }
    Ok(())
}

/// Cutoffs at the 80/60/40/20th percentiles of `scores` (linear interpolation).
/// Falls back to the fixed defaults when there are no finite scores.
pub fn quantile_cutoffs(scores: &[f64]) -> GradeCutoffs {
    let mut sorted: Vec<f64> = scores.iter().copied().filter(|s| s.is_finite()).collect();
    if sorted.is_empty() {
        return DEFAULT_CUTOFFS;
    }
    sorted.sort_by(f64::total_cmp);
    let [a, b, c, d] = CUTOFF_QUANTILES.map(|q| round3(interpolated_percentile(&sorted, q)));
    GradeCutoffs { a, b, c, d }
}

fn interpolated_percentile(sorted: &[f64], q: f64) -> f64 {
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Fraction of `peers` that are `<= value`. An empty peer set ranks at 0.5.
pub fn percentile_rank(value: f64, peers: &[f64]) -> f64 {
    if peers.is_empty() {
        return 0.5;
    }
    let below = peers.iter().filter(|&&p| p <= value).count();
    below as f64 / peers.len() as f64
}

pub fn margin_to_rating(margin: i64) -> &'static str {
    RATING_BREAKS
        .iter()
        .find(|(threshold, _)| margin >= *threshold)
        .map_or("Solid D", |(_, rating)| rating)
}

/// Scores and cutoffs are published at three decimals.
pub fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

// ---------------------------------------------------------------------------
// Snapshot verification
// ---------------------------------------------------------------------------

/// Cutoffs a snapshot's grades are held to: the ones it records, else the
/// configured fixed cutoffs, else quantiles of its own scores.
pub fn snapshot_cutoffs(snapshot: &GradingSnapshot, fixed: Option<&GradeCutoffs>) -> GradeCutoffs {
    snapshot.grade_cutoffs.or(fixed.copied()).unwrap_or_else(|| {
        let scores: Vec<f64> = snapshot.races.iter().map(|r| r.liquidity_score).collect();
        quantile_cutoffs(&scores)
    })
}

pub fn verify_race_count(snapshot: &GradingSnapshot) -> Result<()> {
    if snapshot.total_races != snapshot.races.len() {
        return Err(AppError::InvalidSnapshot(format!(
            "{}: total_races={} but {} races present",
            snapshot.date,
            snapshot.total_races,
            snapshot.races.len()
        )));
    }
    Ok(())
}

/// Every grade is what `cutoffs` assign to its liquidity score.
pub fn verify_grades(snapshot: &GradingSnapshot, cutoffs: &GradeCutoffs) -> Result<()> {
    for race in &snapshot.races {
        let expected = cutoffs.grade_for(race.liquidity_score);
        if race.grade != expected {
            return Err(AppError::InvalidSnapshot(format!(
                "{}: {} graded {} but score {:.3} buckets to {}",
                snapshot.date, race.race_id, race.grade, race.liquidity_score, expected
            )));
        }
    }
    Ok(())
}

/// Checks the published invariants of a snapshot: the race count matches and
/// every grade is what its cutoffs assign to its liquidity score.
pub fn verify_snapshot(snapshot: &GradingSnapshot, fixed: Option<&GradeCutoffs>) -> Result<()> {
    verify_race_count(snapshot)?;
    verify_grades(snapshot, &snapshot_cutoffs(snapshot, fixed))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_uses_weights() {
        let w = ScoreWeights::new(0.5, 0.5, 0.0).unwrap();
        assert!((w.composite(1.0, 0.0, 1.0) - 0.5).abs() < 1e-9);
        let eq = ScoreWeights::equal();
        assert!((eq.composite(0.3, 0.6, 0.9) - 0.6).abs() < 1e-9);
        let d = ScoreWeights::default();
        assert!((d.composite(1.0, 1.0, 1.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn bucketing_follows_cutoffs() {
        let c = DEFAULT_CUTOFFS;
        assert_eq!(c.grade_for(0.95), Grade::A);
        assert_eq!(c.grade_for(0.8), Grade::A);
        assert_eq!(c.grade_for(0.79), Grade::B);
        assert_eq!(c.grade_for(0.45), Grade::C);
        assert_eq!(c.grade_for(0.2), Grade::D);
        assert_eq!(c.grade_for(0.0), Grade::F);
        assert_eq!(c.grade_for(f64::NAN), Grade::F);
    }

    #[test]
    fn higher_score_never_grades_worse() {
        let cutoffs = [
            DEFAULT_CUTOFFS,
            GradeCutoffs { a: 0.9, b: 0.9, c: 0.1, d: 0.0 },
            quantile_cutoffs(&[0.1, 0.2, 0.25, 0.5, 0.51, 0.9]),
        ];
        for c in cutoffs {
            let mut prev = Grade::F;
            for i in 0..=1000 {
                let g = c.grade_for(i as f64 / 1000.0);
                assert!(g <= prev, "score {} graded {g} after {prev}", i as f64 / 1000.0);
                prev = g;
            }
        }
    }

    #[test]
    fn quantile_cutoffs_interpolate() {
        let scores = [0.0, 0.25, 0.5, 0.75, 1.0];
        let c = quantile_cutoffs(&scores);
        assert!((c.a - 0.8).abs() < 1e-9);
        assert!((c.b - 0.6).abs() < 1e-9);
        assert!((c.c - 0.4).abs() < 1e-9);
        assert!((c.d - 0.2).abs() < 1e-9);
        assert_eq!(quantile_cutoffs(&[]), DEFAULT_CUTOFFS);
        assert!(check_cutoffs(&quantile_cutoffs(&[0.9, 0.1, 0.4])).is_ok());
    }

    #[test]
    fn percentile_rank_counts_ties_as_below() {
        let peers = [10.0, 20.0, 20.0, 40.0];
        assert_eq!(percentile_rank(10.0, &peers), 0.25);
        assert_eq!(percentile_rank(20.0, &peers), 0.75);
        assert_eq!(percentile_rank(40.0, &peers), 1.0);
        assert_eq!(percentile_rank(5.0, &[]), 0.5);
    }

    #[test]
    fn ratings_from_margin() {
        assert_eq!(margin_to_rating(25), "Solid R");
        assert_eq!(margin_to_rating(17), "Solid R");
        assert_eq!(margin_to_rating(9), "Likely R");
        assert_eq!(margin_to_rating(4), "Lean R");
        assert_eq!(margin_to_rating(0), "Tossup");
        assert_eq!(margin_to_rating(-4), "Tossup");
        assert_eq!(margin_to_rating(-5), "Lean D");
        assert_eq!(margin_to_rating(-17), "Likely D");
        assert_eq!(margin_to_rating(-18), "Solid D");
    }

    #[test]
    fn snapshot_cutoffs_prefer_recorded_then_fixed() {
        use crate::types::{Chamber, RaceGrade};
        use chrono::NaiveDate;

        let race = |score: f64| RaceGrade {
            race_id: "S2026IA02".to_string(),
            event_ticker: None,
            market_url: None,
            chamber: Chamber::Senate,
            state: "IA".to_string(),
            state_name: "Iowa".to_string(),
            label: "Iowa".to_string(),
            grade: Grade::C,
            liquidity_score: score,
            volume_pct: None,
            spread_pct: None,
            oi_pct: None,
            rating: None,
            margin: None,
        };
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let races: Vec<RaceGrade> = [0.0, 0.25, 0.5, 0.75, 1.0].into_iter().map(race).collect();
        let fixed = GradeCutoffs { a: 0.9, b: 0.7, c: 0.5, d: 0.3 };

        let unrecorded = GradingSnapshot::new(date, races.clone(), None);
        assert_eq!(snapshot_cutoffs(&unrecorded, None), quantile_cutoffs(&[0.0, 0.25, 0.5, 0.75, 1.0]));
        assert_eq!(snapshot_cutoffs(&unrecorded, Some(&fixed)), fixed);

        let recorded = GradingSnapshot::new(date, races, Some(DEFAULT_CUTOFFS));
        assert_eq!(snapshot_cutoffs(&recorded, Some(&fixed)), DEFAULT_CUTOFFS);
        assert!(verify_race_count(&recorded).is_ok());
        assert!(verify_grades(&recorded, &DEFAULT_CUTOFFS).is_err());
    }

    #[test]
    fn invalid_weights_rejected() {
        assert!(ScoreWeights::new(-0.1, 0.6, 0.5).is_err());
        assert!(ScoreWeights::new(0.2, 0.2, 0.2).is_err());
    }
}
