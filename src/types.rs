use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Chamber
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Chamber {
    House,
    Senate,
    Governor,
}

impl Chamber {
    /// Tab order used by the interactive table.
    pub const ALL: [Chamber; 3] = [Chamber::Senate, Chamber::Governor, Chamber::House];

    pub fn as_str(&self) -> &'static str {
        match self {
            Chamber::House => "House",
            Chamber::Senate => "Senate",
            Chamber::Governor => "Governor",
        }
    }

    /// Single-letter code: leading character of a race id and the shorthand query's first token.
    pub fn from_code(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'h' => Some(Chamber::House),
            's' => Some(Chamber::Senate),
            'g' => Some(Chamber::Governor),
            _ => None,
        }
    }

    /// Case-insensitive parse of the full chamber name.
    pub fn parse(s: &str) -> Option<Self> {
        Chamber::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl std::fmt::Display for Chamber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Grade
// ---------------------------------------------------------------------------

/// Letter grade, declared best-first so the derived `Ord` is the grade ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub const ALL: [Grade; 5] = [Grade::A, Grade::B, Grade::C, Grade::D, Grade::F];

    /// 0 = best (A), 4 = worst (F).
    pub fn ordinal(&self) -> u8 {
        *self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Grade::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(s.trim()))
    }

    /// Heat value used to colour the grade cell: A = 1.0 down to F = 0.0.
    pub fn heat(&self) -> f64 {
        1.0 - f64::from(self.ordinal()) * 0.25
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RaceGrade
// ---------------------------------------------------------------------------

/// One graded race-market as stored in a daily snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceGrade {
    /// Canonical uppercase id, e.g. `S2026IA02`.
    pub race_id: String,
    #[serde(default)]
    pub event_ticker: Option<String>,
    #[serde(default, alias = "kalshi_url")]
    pub market_url: Option<String>,
    pub chamber: Chamber,
    pub state: String,
    pub state_name: String,
    pub label: String,
    pub grade: Grade,
    pub liquidity_score: f64,
    /// Percentile ranks within the chamber, higher = more favourable.
    #[serde(default)]
    pub volume_pct: Option<f64>,
    #[serde(default)]
    pub spread_pct: Option<f64>,
    #[serde(default)]
    pub oi_pct: Option<f64>,
    #[serde(default)]
    pub rating: Option<String>,
    /// Implied margin in points; positive leans Republican.
    #[serde(default)]
    pub margin: Option<i64>,
}

impl RaceGrade {
    /// Numeric district parsed from the label's suffix after the first dash (`CO-03` -> 3).
    pub fn district(&self) -> Option<u32> {
        let (_, suffix) = self.label.split_once('-')?;
        leading_integer(suffix)
    }
}

/// Integer formed by the leading ASCII digits of `s`, ignoring surrounding whitespace.
pub fn leading_integer(s: &str) -> Option<u32> {
    let s = s.trim_start();
    let end = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(s.len(), |(i, _)| i);
    s[..end].parse().ok()
}

// ---------------------------------------------------------------------------
// GradingSnapshot
// ---------------------------------------------------------------------------

/// Cutoffs that produced a snapshot's grades, lowest score for A, B, C and D.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradeCutoffs {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingSnapshot {
    pub date: NaiveDate,
    pub total_races: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade_cutoffs: Option<GradeCutoffs>,
    pub races: Vec<RaceGrade>,
}

impl GradingSnapshot {
    pub fn new(date: NaiveDate, races: Vec<RaceGrade>, grade_cutoffs: Option<GradeCutoffs>) -> Self {
        Self {
            date,
            total_races: races.len(),
            grade_cutoffs,
            races,
        }
    }

    pub fn date_string(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
