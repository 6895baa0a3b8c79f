pub mod grade_model;
pub mod pipeline;

pub use grade_model::{
    check_cutoffs, margin_to_rating, percentile_rank, quantile_cutoffs, snapshot_cutoffs,
    verify_grades, verify_race_count, verify_snapshot,
    CutoffPolicy, GradingPolicy, ScoreWeights,
};
pub use pipeline::{parse_race_id, RawRaceMetrics, SnapshotGrader};
