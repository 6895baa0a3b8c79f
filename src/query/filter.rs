use serde::Deserialize;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::types::RaceGrade;

// ---------------------------------------------------------------------------
// Criteria
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum StateMatch {
    /// Structured query form: whole code, case-insensitive.
    Exact(String),
    /// Shorthand form: partial codes narrow the set.
    Prefix(String),
}

/// One active filter. A query keeps every race that matches all of its criteria,
/// so criteria can be applied in any order.
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    Chamber(String),
    State(StateMatch),
    Grade(String),
    /// Races without a rating never match.
    Rating(String),
    MinLiquidity(f64),
    /// `None` is an unparseable district token, which matches nothing.
    District(Option<u32>),
}

impl Criterion {
    pub fn matches(&self, race: &RaceGrade) -> bool {
        match self {
            Criterion::Chamber(c) => race.chamber.as_str().eq_ignore_ascii_case(c),
            Criterion::State(StateMatch::Exact(s)) => race.state.eq_ignore_ascii_case(s),
            Criterion::State(StateMatch::Prefix(p)) => race
                .state
                .to_ascii_uppercase()
                .starts_with(&p.to_ascii_uppercase()),
            Criterion::Grade(g) => race.grade.as_str().eq_ignore_ascii_case(g),
            Criterion::Rating(r) => race
                .rating
                .as_deref()
                .is_some_and(|rating| rating.eq_ignore_ascii_case(r)),
            Criterion::MinLiquidity(t) => race.liquidity_score >= *t,
            Criterion::District(Some(n)) => race.district() == Some(*n),
            Criterion::District(None) => false,
        }
    }
}

// ---------------------------------------------------------------------------
// FilterParams — the structured query form
// ---------------------------------------------------------------------------

/// Raw filter literals as received. Everything stays a string so that bad
/// values degrade the query instead of failing it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterParams {
    pub chamber: Option<String>,
    pub state: Option<String>,
    pub grade: Option<String>,
    pub rating: Option<String>,
    #[serde(alias = "minLiquidity")]
    pub min_liquidity: Option<String>,
    pub race: Option<String>,
}

// ---------------------------------------------------------------------------
// RaceQuery
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RaceQuery {
    pub criteria: Vec<Criterion>,
    /// Single-record lookup, searched for after every criterion is applied.
    pub race_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult<'a> {
    Races(Vec<&'a RaceGrade>),
    Race(&'a RaceGrade),
}

impl RaceQuery {
    /// Build from the structured form. Empty literals are absent filters and a
    /// non-numeric `min_liquidity` is dropped.
    pub fn from_params(params: &FilterParams) -> Self {
        let present = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);

        let mut query = RaceQuery::default();
        if let Some(c) = present(&params.chamber) {
            query.criteria.push(Criterion::Chamber(c));
        }
        if let Some(s) = present(&params.state) {
            query.criteria.push(Criterion::State(StateMatch::Exact(s)));
        }
        if let Some(g) = present(&params.grade) {
            query.criteria.push(Criterion::Grade(g));
        }
        if let Some(r) = present(&params.rating) {
            query.criteria.push(Criterion::Rating(r));
        }
        if let Some(raw) = present(&params.min_liquidity) {
            match raw.parse::<f64>() {
                Ok(t) if t.is_finite() => query.criteria.push(Criterion::MinLiquidity(t)),
                _ => debug!(min_liquidity = %raw, "ignoring non-numeric min_liquidity filter"),
            }
        }
        query.race_id = present(&params.race).map(|r| r.to_ascii_uppercase());
        query
    }

    pub fn with(mut self, criterion: Criterion) -> Self {
        self.criteria.push(criterion);
        self
    }

    pub fn matches(&self, race: &RaceGrade) -> bool {
        self.criteria.iter().all(|c| c.matches(race))
    }

    /// Races passing every criterion, in snapshot order.
    pub fn filter<'a>(&self, races: &'a [RaceGrade]) -> Vec<&'a RaceGrade> {
        races.iter().filter(|r| self.matches(r)).collect()
    }

    /// Run the query. A lookup that finds nothing is `RaceNotFound`; a list
    /// that matches nothing is an empty success.
    pub fn run<'a>(&self, races: &'a [RaceGrade]) -> Result<QueryResult<'a>> {
        let filtered = self.filter(races);
        match &self.race_id {
            None => Ok(QueryResult::Races(filtered)),
            Some(id) => filtered
                .into_iter()
                .find(|r| r.race_id.eq_ignore_ascii_case(id))
                .map(QueryResult::Race)
                .ok_or_else(|| AppError::RaceNotFound { race_id: id.clone() }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chamber, Grade};

    fn race(id: &str, chamber: Chamber, state: &str, label: &str, grade: Grade, score: f64, rating: Option<&str>) -> RaceGrade {
        RaceGrade {
            race_id: id.to_string(),
            event_ticker: None,
            market_url: None,
            chamber,
            state: state.to_string(),
            state_name: state.to_string(),
            label: label.to_string(),
            grade,
            liquidity_score: score,
            volume_pct: Some(score),
            spread_pct: Some(score),
            oi_pct: Some(score),
            rating: rating.map(str::to_string),
            margin: None,
        }
    }

    fn fixture() -> Vec<RaceGrade> {
        vec![
            race("H2026CO03", Chamber::House, "CO", "CO-3", Grade::A, 0.91, Some("Tossup")),
            race("H2026CO08", Chamber::House, "CO", "CO-8", Grade::C, 0.52, Some("Lean R")),
            race("H2026CA22", Chamber::House, "CA", "CA-22", Grade::F, 0.05, None),
            race("S2026IA02", Chamber::Senate, "IA", "Iowa", Grade::A, 0.88, Some("Lean R")),
            race("G2026AZ00", Chamber::Governor, "AZ", "Arizona", Grade::B, 0.7, Some("Tossup")),
        ]
    }

    fn ids<'a>(races: &[&'a RaceGrade]) -> Vec<&'a str> {
        races.iter().map(|r| r.race_id.as_str()).collect()
    }

    fn params(pairs: &[(&str, &str)]) -> FilterParams {
        let mut p = FilterParams::default();
        for (k, v) in pairs {
            let v = Some(v.to_string());
            match *k {
                "chamber" => p.chamber = v,
                "state" => p.state = v,
                "grade" => p.grade = v,
                "rating" => p.rating = v,
                "min_liquidity" => p.min_liquidity = v,
                "race" => p.race = v,
                _ => unreachable!(),
            }
        }
        p
    }

    #[test]
    fn chamber_and_grade_select_single_race() {
        let races = fixture();
        let q = RaceQuery::from_params(&params(&[("chamber", "house"), ("grade", "a")]));
        assert_eq!(ids(&q.filter(&races)), ["H2026CO03"]);
    }

    #[test]
    fn state_is_exact_in_structured_form() {
        let races = fixture();
        let q = RaceQuery::from_params(&params(&[("state", "c")]));
        assert!(q.filter(&races).is_empty());
        let q = RaceQuery::from_params(&params(&[("state", "co")]));
        assert_eq!(ids(&q.filter(&races)), ["H2026CO03", "H2026CO08"]);
    }

    #[test]
    fn rating_never_matches_missing_rating() {
        let races = fixture();
        let q = RaceQuery::from_params(&params(&[("rating", "lean r")]));
        assert_eq!(ids(&q.filter(&races)), ["H2026CO08", "S2026IA02"]);
        let q = RaceQuery::default().with(Criterion::Rating(String::new()));
        assert!(q.filter(&races).is_empty());
    }

    #[test]
    fn non_numeric_min_liquidity_is_ignored() {
        let races = fixture();
        let q = RaceQuery::from_params(&params(&[("min_liquidity", "abc")]));
        assert!(q.criteria.is_empty());
        assert_eq!(q.filter(&races).len(), races.len());

        let q = RaceQuery::from_params(&params(&[("min_liquidity", "NaN")]));
        assert!(q.criteria.is_empty());

        let q = RaceQuery::from_params(&params(&[("min_liquidity", "0.7")]));
        assert_eq!(ids(&q.filter(&races)), ["H2026CO03", "S2026IA02", "G2026AZ00"]);
    }

    #[test]
    fn unknown_chamber_matches_nothing() {
        let races = fixture();
        let q = RaceQuery::from_params(&params(&[("chamber", "assembly")]));
        assert!(q.filter(&races).is_empty());
    }

    #[test]
    fn lookup_searches_within_filtered_set() {
        let races = fixture();
        let q = RaceQuery::from_params(&params(&[("race", "s2026ia02")]));
        match q.run(&races).unwrap() {
            QueryResult::Race(r) => assert_eq!(r.race_id, "S2026IA02"),
            other => panic!("expected single race, got {other:?}"),
        }

        let q = RaceQuery::from_params(&params(&[("race", "s2026ia02"), ("chamber", "house")]));
        match q.run(&races) {
            Err(AppError::RaceNotFound { race_id }) => assert_eq!(race_id, "S2026IA02"),
            other => panic!("expected race not found, got {other:?}"),
        }
    }

    #[test]
    fn empty_result_is_success() {
        let races = fixture();
        let q = RaceQuery::from_params(&params(&[("grade", "D")]));
        assert_eq!(q.run(&races).unwrap(), QueryResult::Races(vec![]));
    }

    #[test]
    fn criteria_order_does_not_matter() {
        let races = fixture();
        let criteria = vec![
            Criterion::Chamber("house".to_string()),
            Criterion::State(StateMatch::Exact("co".to_string())),
            Criterion::MinLiquidity(0.5),
            Criterion::Rating("tossup".to_string()),
        ];
        let expected = ids(&RaceQuery { criteria: criteria.clone(), race_id: None }.filter(&races));

        // Every rotation and its reverse
        for shift in 0..criteria.len() {
            let mut rotated = criteria.clone();
            rotated.rotate_left(shift);
            let forward = RaceQuery { criteria: rotated.clone(), race_id: None };
            assert_eq!(ids(&forward.filter(&races)), expected);
            rotated.reverse();
            let backward = RaceQuery { criteria: rotated, race_id: None };
            assert_eq!(ids(&backward.filter(&races)), expected);
        }

        // Applying criteria one at a time equals applying them together
        let mut staged: Vec<&RaceGrade> = races.iter().collect();
        for c in criteria.iter().rev() {
            staged.retain(|r| c.matches(r));
        }
        assert_eq!(ids(&staged), expected);
        assert_eq!(expected, ["H2026CO03"]);
    }
}
