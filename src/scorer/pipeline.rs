//! Offline producer: turns raw per-race market metrics into a graded snapshot.
//! Percentiles are ranked within each chamber, combined under the policy's
//! weights, and bucketed into grades with the policy's cutoffs.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{info, warn};

use super::grade_model::{margin_to_rating, percentile_rank, round3, GradingPolicy};
use crate::types::{Chamber, GradingSnapshot, RaceGrade};

/// Raw market metrics for one race, as exported by the market puller.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRaceMetrics {
    pub race_id: String,
    #[serde(default)]
    pub event_ticker: Option<String>,
    #[serde(default, alias = "kalshi_url")]
    pub market_url: Option<String>,
    pub volume: f64,
    pub open_interest: f64,
    /// Best ask minus best bid; absent when the book is one-sided.
    #[serde(default)]
    pub spread: Option<f64>,
    #[serde(default)]
    pub margin: Option<i64>,
    #[serde(default)]
    pub rating: Option<String>,
}

impl RawRaceMetrics {
    /// Tighter spreads rank higher; a missing or non-positive spread ranks as zero.
    fn inverse_spread(&self) -> f64 {
        match self.spread {
            Some(s) if s > 0.0 => 1.0 / s,
            _ => 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Race id parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RaceIdParts {
    pub race_id: String,
    pub chamber: Chamber,
    pub state: String,
    pub state_name: String,
    pub label: String,
}

/// Parse `<C><YYYY><ST><NN>` (e.g. `H2026CO03`, `S2026IA02`).
/// House races are labelled `ST-N` (`ST-AL` for an at-large seat); statewide
/// races take the state's full name.
pub fn parse_race_id(raw: &str) -> Option<RaceIdParts> {
    let race_id = raw.trim().to_ascii_uppercase();
    if race_id.len() < 7 || !race_id.is_ascii() {
        return None;
    }
    let chamber = Chamber::from_code(race_id.chars().next()?)?;
    if !race_id[1..5].bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let state = &race_id[5..7];
    if !state.bytes().all(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    let district = &race_id[7..];
    let state_name = state_name(state).unwrap_or(state).to_string();

    let label = match chamber {
        Chamber::House => {
            let trimmed = district.trim_start_matches('0');
            format!("{state}-{}", if trimmed.is_empty() { "AL" } else { trimmed })
        }
        Chamber::Senate | Chamber::Governor => state_name.clone(),
    };

    Some(RaceIdParts {
        state: state.to_string(),
        race_id,
        chamber,
        state_name,
        label,
    })
}

pub fn state_name(code: &str) -> Option<&'static str> {
    STATE_NAMES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, name)| *name)
}

const STATE_NAMES: &[(&str, &str)] = &[
    ("AL", "Alabama"), ("AK", "Alaska"), ("AZ", "Arizona"), ("AR", "Arkansas"),
    ("CA", "California"), ("CO", "Colorado"), ("CT", "Connecticut"), ("DE", "Delaware"),
    ("FL", "Florida"), ("GA", "Georgia"), ("HI", "Hawaii"), ("ID", "Idaho"),
    ("IL", "Illinois"), ("IN", "Indiana"), ("IA", "Iowa"), ("KS", "Kansas"),
    ("KY", "Kentucky"), ("LA", "Louisiana"), ("ME", "Maine"), ("MD", "Maryland"),
    ("MA", "Massachusetts"), ("MI", "Michigan"), ("MN", "Minnesota"), ("MS", "Mississippi"),
    ("MO", "Missouri"), ("MT", "Montana"), ("NE", "Nebraska"), ("NV", "Nevada"),
    ("NH", "New Hampshire"), ("NJ", "New Jersey"), ("NM", "New Mexico"), ("NY", "New York"),
    ("NC", "North Carolina"), ("ND", "North Dakota"), ("OH", "Ohio"), ("OK", "Oklahoma"),
    ("OR", "Oregon"), ("PA", "Pennsylvania"), ("RI", "Rhode Island"), ("SC", "South Carolina"),
    ("SD", "South Dakota"), ("TN", "Tennessee"), ("TX", "Texas"), ("UT", "Utah"),
    ("VT", "Vermont"), ("VA", "Virginia"), ("WA", "Washington"), ("WV", "West Virginia"),
    ("WI", "Wisconsin"), ("WY", "Wyoming"),
];

// ---------------------------------------------------------------------------
// SnapshotGrader
// ---------------------------------------------------------------------------

pub struct SnapshotGrader {
    policy: GradingPolicy,
}

impl SnapshotGrader {
    pub fn new(policy: GradingPolicy) -> Self {
        Self { policy }
    }

    /// Grade every parseable race and assemble the dated snapshot.
    pub fn grade(&self, date: NaiveDate, raw: &[RawRaceMetrics]) -> GradingSnapshot {
        let mut parsed = Vec::with_capacity(raw.len());
        let mut seen = HashSet::new();
        for metrics in raw {
            let Some(parts) = parse_race_id(&metrics.race_id) else {
                warn!(race_id = %metrics.race_id, "skipping unparseable race id");
                continue;
            };
            // Ids are unique per snapshot; the first entry wins
            if !seen.insert(parts.race_id.clone()) {
                warn!(race_id = %parts.race_id, "skipping duplicate race id");
                continue;
            }
            parsed.push((parts, metrics));
        }

        // Peer sets per chamber
        let mut peers: HashMap<Chamber, (Vec<f64>, Vec<f64>, Vec<f64>)> = HashMap::new();
        for (parts, m) in &parsed {
            let entry = peers.entry(parts.chamber).or_default();
            entry.0.push(m.volume);
            entry.1.push(m.inverse_spread());
            entry.2.push(m.open_interest);
        }

        let scored: Vec<(RaceIdParts, &RawRaceMetrics, [f64; 3], f64)> = parsed
            .into_iter()
            .map(|(parts, m)| {
                let (volumes, inv_spreads, ois) = &peers[&parts.chamber];
                let pcts = [
                    round3(percentile_rank(m.volume, volumes)),
                    round3(percentile_rank(m.inverse_spread(), inv_spreads)),
                    round3(percentile_rank(m.open_interest, ois)),
                ];
                let score = round3(self.policy.weights.composite(pcts[0], pcts[1], pcts[2]));
                (parts, m, pcts, score)
            })
            .collect();

        let scores: Vec<f64> = scored.iter().map(|(_, _, _, s)| *s).collect();
        let cutoffs = self.policy.resolve_cutoffs(&scores);
        info!(
            races = scored.len(),
            "grade cutoffs: A>={:.3} B>={:.3} C>={:.3} D>={:.3} F=rest",
            cutoffs.a, cutoffs.b, cutoffs.c, cutoffs.d,
        );

        let mut races: Vec<RaceGrade> = scored
            .into_iter()
            .map(|(parts, m, pcts, score)| RaceGrade {
                race_id: parts.race_id,
                event_ticker: m.event_ticker.clone(),
                market_url: m.market_url.clone(),
                chamber: parts.chamber,
                state: parts.state,
                state_name: parts.state_name,
                label: parts.label,
                grade: cutoffs.grade_for(score),
                liquidity_score: score,
                volume_pct: Some(pcts[0]),
                spread_pct: Some(pcts[1]),
                oi_pct: Some(pcts[2]),
                rating: m
                    .rating
                    .clone()
                    .or_else(|| m.margin.map(|v| margin_to_rating(v).to_string())),
                margin: m.margin,
            })
            .collect();

        // Statewide races first, then closest contests.
        races.sort_by_key(|r| (chamber_rank(r.chamber), r.margin.map_or(u64::MAX, i64::unsigned_abs)));

        GradingSnapshot::new(date, races, Some(cutoffs))
    }
}

fn chamber_rank(c: Chamber) -> u8 {
    match c {
        Chamber::Senate => 0,
        Chamber::Governor => 1,
        Chamber::House => 2,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::{verify_snapshot, CutoffPolicy, ScoreWeights};
    use crate::types::Grade;

    fn raw(id: &str, volume: f64, oi: f64, spread: Option<f64>, margin: Option<i64>) -> RawRaceMetrics {
        RawRaceMetrics {
            race_id: id.to_string(),
            event_ticker: None,
            market_url: None,
            volume,
            open_interest: oi,
            spread,
            margin,
            rating: None,
        }
    }

    #[test]
    fn parses_house_and_statewide_ids() {
        let h = parse_race_id("h2026co03").unwrap();
        assert_eq!(h.race_id, "H2026CO03");
        assert_eq!(h.chamber, Chamber::House);
        assert_eq!(h.label, "CO-3");
        assert_eq!(h.state_name, "Colorado");

        let al = parse_race_id("H2026WY00").unwrap();
        assert_eq!(al.label, "WY-AL");

        let s = parse_race_id("S2026IA02").unwrap();
        assert_eq!(s.chamber, Chamber::Senate);
        assert_eq!(s.label, "Iowa");

        assert!(parse_race_id("X2026IA02").is_none());
        assert!(parse_race_id("S26").is_none());
    }

    #[test]
    fn grades_are_consistent_with_recorded_cutoffs() {
        let input = vec![
            raw("H2026CO03", 5000.0, 900.0, Some(0.01), Some(2)),
            raw("H2026CO13", 10.0, 5.0, None, Some(-30)),
            raw("H2026CA22", 800.0, 100.0, Some(0.05), Some(-3)),
            raw("S2026IA02", 20000.0, 4000.0, Some(0.02), Some(6)),
            raw("G2026AZ00", 300.0, 50.0, Some(0.10), None),
        ];
        let grader = SnapshotGrader::new(GradingPolicy::default());
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let snapshot = grader.grade(date, &input);

        assert_eq!(snapshot.total_races, 5);
        verify_snapshot(&snapshot, None).unwrap();

        // Senate, Governor, then House by closeness.
        let ids: Vec<&str> = snapshot.races.iter().map(|r| r.race_id.as_str()).collect();
        assert_eq!(ids, ["S2026IA02", "G2026AZ00", "H2026CO03", "H2026CA22", "H2026CO13"]);

        let thin = snapshot.races.iter().find(|r| r.race_id == "H2026CO13").unwrap();
        assert_eq!(thin.rating.as_deref(), Some("Solid D"));
        assert_eq!(thin.grade, Grade::F);
    }

    #[test]
    fn duplicate_ids_keep_first_and_extreme_margins_sort() {
        let input = vec![
            raw("H2026CO03", 5000.0, 900.0, Some(0.01), Some(i64::MIN)),
            raw("h2026co03", 1.0, 1.0, None, Some(0)),
            raw("H2026CA22", 800.0, 100.0, Some(0.05), Some(-3)),
        ];
        let grader = SnapshotGrader::new(GradingPolicy::default());
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let snapshot = grader.grade(date, &input);

        assert_eq!(snapshot.total_races, 2);
        let ids: Vec<&str> = snapshot.races.iter().map(|r| r.race_id.as_str()).collect();
        assert_eq!(ids, ["H2026CA22", "H2026CO03"]);
        assert_eq!(snapshot.races[1].margin, Some(i64::MIN));
    }

    #[test]
    fn percentiles_rank_within_chamber() {
        let input = vec![
            raw("S2026IA02", 100.0, 100.0, Some(0.01), None),
            raw("H2026CO03", 1.0, 1.0, Some(0.5), None),
        ];
        let policy = GradingPolicy {
            weights: ScoreWeights::equal(),
            cutoffs: CutoffPolicy::Fixed(crate::config::DEFAULT_CUTOFFS),
        };
        let snapshot = SnapshotGrader::new(policy).grade(NaiveDate::MIN, &input);
        // Each race is alone in its chamber, so each ranks at the top.
        for race in &snapshot.races {
            assert_eq!(race.volume_pct, Some(1.0));
            assert_eq!(race.grade, Grade::A);
        }
    }

    #[test]
    fn explicit_rating_wins_over_margin() {
        let mut m = raw("S2026ME01", 10.0, 10.0, Some(0.02), Some(20));
        m.rating = Some("Tossup".to_string());
        let snapshot = SnapshotGrader::new(GradingPolicy::default()).grade(NaiveDate::MIN, &[m]);
        assert_eq!(snapshot.races[0].rating.as_deref(), Some("Tossup"));
    }
}
