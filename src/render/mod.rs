//! Dual-format response rendering. The render target picks the body, the
//! declared content type, and travels with every outcome including errors.

pub mod table;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::types::{GradingSnapshot, RaceGrade};

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    Structured,
    Table,
}

impl RenderTarget {
    /// `table` or `pretty` selects the text table; anything else is structured.
    pub fn from_format(format: Option<&str>) -> Self {
        match format.map(str::trim) {
            Some(f) if f.eq_ignore_ascii_case("table") || f.eq_ignore_ascii_case("pretty") => {
                RenderTarget::Table
            }
            _ => RenderTarget::Structured,
        }
    }
}

// ---------------------------------------------------------------------------
// Structured payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceListPayload<R = RaceGrade> {
    pub date: NaiveDate,
    pub total: usize,
    pub races: Vec<R>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceLookupPayload<R = RaceGrade> {
    pub date: NaiveDate,
    pub race: R,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatesPayload {
    pub available_dates: Vec<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Rendered
// ---------------------------------------------------------------------------

/// A fully rendered response: status, declared content kind, and body.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: String,
}

impl Rendered {
    fn text(status: StatusCode, body: String) -> Self {
        Self { status, content_type: CONTENT_TYPE_TEXT, body }
    }

    fn json<T: Serialize>(status: StatusCode, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self { status, content_type: CONTENT_TYPE_JSON, body },
            Err(e) => Self::text(StatusCode::INTERNAL_SERVER_ERROR, format!("serialization failed: {e}\n")),
        }
    }
}

impl IntoResponse for Rendered {
    fn into_response(self) -> Response {
        (self.status, [(header::CONTENT_TYPE, self.content_type)], self.body).into_response()
    }
}

pub fn render_races(target: RenderTarget, snapshot: &GradingSnapshot, races: &[&RaceGrade]) -> Rendered {
    match target {
        RenderTarget::Structured => Rendered::json(
            StatusCode::OK,
            &RaceListPayload { date: snapshot.date, total: races.len(), races: races.to_vec() },
        ),
        RenderTarget::Table => Rendered::text(StatusCode::OK, table::races_table(snapshot.date, races)),
    }
}

pub fn render_race(target: RenderTarget, snapshot: &GradingSnapshot, race: &RaceGrade) -> Rendered {
    match target {
        RenderTarget::Structured => {
            Rendered::json(StatusCode::OK, &RaceLookupPayload { date: snapshot.date, race })
        }
        RenderTarget::Table => Rendered::text(StatusCode::OK, table::race_fact_sheet(snapshot.date, race)),
    }
}

pub fn render_dates(target: RenderTarget, dates: &[NaiveDate]) -> Rendered {
    match target {
        RenderTarget::Structured => {
            Rendered::json(StatusCode::OK, &DatesPayload { available_dates: dates.to_vec() })
        }
        RenderTarget::Table => Rendered::text(StatusCode::OK, table::dates_list(dates)),
    }
}

pub fn render_error(target: RenderTarget, err: &AppError) -> Rendered {
    match target {
        RenderTarget::Structured => {
            let mut body = serde_json::json!({
                "error": err.kind(),
                "message": err.to_string(),
            });
            if let AppError::RaceNotFound { race_id } = err {
                body["race_id"] = serde_json::Value::String(race_id.clone());
            }
            Rendered::json(err.status(), &body)
        }
        RenderTarget::Table => Rendered::text(err.status(), table::error_notice(err)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chamber, Grade};

    fn snapshot() -> GradingSnapshot {
        let race = RaceGrade {
            race_id: "S2026IA02".to_string(),
            event_ticker: Some("SENATEIA-26".to_string()),
            market_url: Some("https://example.com/ia".to_string()),
            chamber: Chamber::Senate,
            state: "IA".to_string(),
            state_name: "Iowa".to_string(),
            label: "Iowa".to_string(),
            grade: Grade::A,
            liquidity_score: 0.912,
            volume_pct: Some(0.95),
            spread_pct: None,
            oi_pct: Some(0.81),
            rating: Some("Lean R".to_string()),
            margin: Some(6),
        };
        GradingSnapshot::new(NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(), vec![race], None)
    }

    #[test]
    fn format_selects_target() {
        assert_eq!(RenderTarget::from_format(Some("table")), RenderTarget::Table);
        assert_eq!(RenderTarget::from_format(Some("PRETTY")), RenderTarget::Table);
        assert_eq!(RenderTarget::from_format(Some("json")), RenderTarget::Structured);
        assert_eq!(RenderTarget::from_format(None), RenderTarget::Structured);
    }

    #[test]
    fn structured_round_trip_preserves_every_field() {
        let snap = snapshot();
        let view: Vec<&RaceGrade> = snap.races.iter().collect();
        let rendered = render_races(RenderTarget::Structured, &snap, &view);
        assert_eq!(rendered.content_type, CONTENT_TYPE_JSON);

        let back: RaceListPayload = serde_json::from_str(&rendered.body).unwrap();
        assert_eq!(back.date, snap.date);
        assert_eq!(back.total, 1);
        assert_eq!(back.races, snap.races);
    }

    #[test]
    fn errors_follow_target() {
        let err = AppError::RaceNotFound { race_id: "H2026ZZ01".to_string() };

        let json = render_error(RenderTarget::Structured, &err);
        assert_eq!(json.status, StatusCode::NOT_FOUND);
        assert_eq!(json.content_type, CONTENT_TYPE_JSON);
        let v: serde_json::Value = serde_json::from_str(&json.body).unwrap();
        assert_eq!(v["error"], "race_not_found");
        assert_eq!(v["race_id"], "H2026ZZ01");

        let text = render_error(RenderTarget::Table, &err);
        assert_eq!(text.status, StatusCode::NOT_FOUND);
        assert_eq!(text.content_type, CONTENT_TYPE_TEXT);
        assert_eq!(text.body, "Race \"H2026ZZ01\" not found.\n");
    }

    #[test]
    fn lookup_renders_fact_sheet_in_table_form() {
        let snap = snapshot();
        let rendered = render_race(RenderTarget::Table, &snap, &snap.races[0]);
        assert_eq!(rendered.content_type, CONTENT_TYPE_TEXT);
        assert!(rendered.body.contains("S2026IA02 · Iowa"));
        assert!(!rendered.body.contains("Market Grades ·"));
    }
}
