use std::borrow::Borrow;
use std::cmp::Ordering;

use crate::types::RaceGrade;

/// Stands in for an absent percentile: below every valid value in [0, 1].
const MISSING_METRIC: f64 = -1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Label,
    Grade,
    Score,
    Volume,
    Spread,
    OpenInterest,
}

impl SortKey {
    pub const ALL: [SortKey; 6] = [
        SortKey::Label,
        SortKey::Grade,
        SortKey::Score,
        SortKey::Volume,
        SortKey::Spread,
        SortKey::OpenInterest,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            SortKey::Label => "Race",
            SortKey::Grade => "Grade",
            SortKey::Score => "Score",
            SortKey::Volume => "Vol",
            SortKey::Spread => "Spread",
            SortKey::OpenInterest => "OI",
        }
    }

    /// Ascending comparison under this key.
    pub fn compare(&self, a: &RaceGrade, b: &RaceGrade) -> Ordering {
        match self {
            SortKey::Label => a.label.cmp(&b.label),
            SortKey::Grade => a.grade.ordinal().cmp(&b.grade.ordinal()),
            SortKey::Score => a.liquidity_score.total_cmp(&b.liquidity_score),
            SortKey::Volume => metric(a.volume_pct).total_cmp(&metric(b.volume_pct)),
            SortKey::Spread => metric(a.spread_pct).total_cmp(&metric(b.spread_pct)),
            SortKey::OpenInterest => metric(a.oi_pct).total_cmp(&metric(b.oi_pct)),
        }
    }
}

fn metric(v: Option<f64>) -> f64 {
    v.unwrap_or(MISSING_METRIC)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    pub fn flipped(self) -> Self {
        match self {
            SortDir::Asc => SortDir::Desc,
            SortDir::Desc => SortDir::Asc,
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            SortDir::Asc => "▲",
            SortDir::Desc => "▼",
        }
    }
}

/// Stable sort. Ties keep their incoming order in both directions.
pub fn sort_races<R: Borrow<RaceGrade>>(races: &mut [R], key: SortKey, dir: SortDir) {
    races.sort_by(|a, b| {
        let ord = key.compare(
            Borrow::<RaceGrade>::borrow(a),
            Borrow::<RaceGrade>::borrow(b),
        );
        match dir {
            SortDir::Asc => ord,
            SortDir::Desc => ord.reverse(),
        }
    });
}

/// Interactive sort selection: a new key starts descending, the active key flips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    pub key: SortKey,
    pub dir: SortDir,
}

impl Default for SortState {
    fn default() -> Self {
        Self { key: SortKey::Grade, dir: SortDir::Asc }
    }
}

impl SortState {
    pub fn select(&mut self, key: SortKey) {
        if self.key == key {
            self.dir = self.dir.flipped();
        } else {
            self.key = key;
            self.dir = SortDir::Desc;
        }
    }

    pub fn apply<R: Borrow<RaceGrade>>(&self, races: &mut [R]) {
        sort_races(races, self.key, self.dir);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
