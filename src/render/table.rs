//! Fixed-width plain-text rendering for terminal consumers. Output is a pure
//! function of its inputs, so the same record set always renders the same bytes.

use chrono::NaiveDate;

use crate::config::HEAT_BAR_WIDTH;
use crate::error::AppError;
use crate::types::RaceGrade;

// ---------------------------------------------------------------------------
// Cell formatting
// ---------------------------------------------------------------------------

/// `HEAT_BAR_WIDTH` segments, filled in proportion to `score` in [0, 1].
pub fn heat_bar(score: f64) -> String {
    let filled = if score.is_finite() {
        (score.clamp(0.0, 1.0) * HEAT_BAR_WIDTH as f64).round() as usize
    } else {
        0
    };
    let mut bar = "█".repeat(filled);
    bar.push_str(&"░".repeat(HEAT_BAR_WIDTH - filled));
    bar
}

/// Percentile rank as an integer percentage, `--` when absent.
pub fn fmt_pct(v: Option<f64>) -> String {
    match v {
        Some(p) if p.is_finite() => format!("{}", (p * 100.0).round() as i64),
        _ => "--".to_string(),
    }
}

/// Positive margins lean Republican (`R+6`), negative Democratic (`D+3`).
pub fn fmt_margin(margin: Option<i64>) -> String {
    match margin {
        Some(m) if m > 0 => format!("R+{m}"),
        Some(m) if m < 0 => format!("D+{}", m.unsigned_abs()),
        Some(_) => "EVEN".to_string(),
        None => "--".to_string(),
    }
}

fn fmt_liquidity(score: f64) -> String {
    format!("{} {:>3}", heat_bar(score), fmt_pct(Some(score)))
}

fn fmt_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

// ---------------------------------------------------------------------------
// Table layout
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum Align {
    Left,
    Center,
    Right,
}

struct Column {
    title: &'static str,
    align: Align,
    width: usize,
}

fn rule(left: char, mid: char, right: char, columns: &[Column]) -> String {
    let segments: Vec<String> = columns.iter().map(|c| "─".repeat(c.width + 2)).collect();
    format!("{left}{}{right}\n", segments.join(&mid.to_string()))
}

fn row(columns: &[Column], cells: &[String]) -> String {
    let mut line = String::from("│");
    for (col, cell) in columns.iter().zip(cells) {
        let w = col.width;
        let padded = match col.align {
            Align::Left => format!(" {cell:<w$} "),
            Align::Center => format!(" {cell:^w$} "),
            Align::Right => format!(" {cell:>w$} "),
        };
        line.push_str(&padded);
        line.push('│');
    }
    line.push('\n');
    line
}

fn race_cells(race: &RaceGrade) -> Vec<String> {
    vec![
        race.label.clone(),
        race.grade.to_string(),
        fmt_liquidity(race.liquidity_score),
        fmt_pct(race.volume_pct),
        fmt_pct(race.spread_pct),
        fmt_pct(race.oi_pct),
        race.rating.clone().unwrap_or_else(|| "--".to_string()),
        fmt_margin(race.margin),
    ]
}

/// Bordered multi-row table, or the "no races match" notice for an empty set.
pub fn races_table(date: NaiveDate, races: &[&RaceGrade]) -> String {
    if races.is_empty() {
        return no_matches(date);
    }

    let rows: Vec<Vec<String>> = races.iter().map(|r| race_cells(r)).collect();
    let mut columns = vec![
        Column { title: "Race", align: Align::Left, width: 0 },
        Column { title: "Grade", align: Align::Center, width: 0 },
        Column { title: "Liquidity", align: Align::Left, width: 0 },
        Column { title: "Vol%", align: Align::Right, width: 0 },
        Column { title: "Spread%", align: Align::Right, width: 0 },
        Column { title: "OI%", align: Align::Right, width: 0 },
        Column { title: "Rating", align: Align::Left, width: 0 },
        Column { title: "Margin", align: Align::Left, width: 0 },
    ];
    for (i, col) in columns.iter_mut().enumerate() {
        col.width = rows
            .iter()
            .map(|r| r[i].chars().count())
            .chain(std::iter::once(col.title.chars().count()))
            .max()
            .unwrap_or(0);
    }

    let plural = if races.len() == 1 { "" } else { "s" };
    let mut out = format!("Market Grades · {} · {} race{plural}\n", fmt_date(date), races.len());
    out.push_str(&rule('┌', '┬', '┐', &columns));
    let titles: Vec<String> = columns.iter().map(|c| c.title.to_string()).collect();
    // Titles are always left-aligned
    let mut header = String::from("│");
    for (col, title) in columns.iter().zip(&titles) {
        let w = col.width;
        header.push_str(&format!(" {title:<w$} │"));
    }
    out.push_str(&header);
    out.push('\n');
    out.push_str(&rule('├', '┼', '┤', &columns));
    for cells in &rows {
        out.push_str(&row(&columns, cells));
    }
    out.push_str(&rule('└', '┴', '┘', &columns));
    out
}

/// Compact vertical fact sheet for a single-race lookup.
pub fn race_fact_sheet(date: NaiveDate, race: &RaceGrade) -> String {
    let facts: Vec<(&str, String)> = vec![
        ("Chamber", race.chamber.to_string()),
        ("State", format!("{} ({})", race.state, race.state_name)),
        ("Grade", race.grade.to_string()),
        ("Liquidity", fmt_liquidity(race.liquidity_score)),
        ("Volume %", fmt_pct(race.volume_pct)),
        ("Spread %", fmt_pct(race.spread_pct)),
        ("OI %", fmt_pct(race.oi_pct)),
        ("Rating", race.rating.clone().unwrap_or_else(|| "--".to_string())),
        ("Margin", fmt_margin(race.margin)),
        ("Market", race.market_url.clone().or_else(|| race.event_ticker.clone()).unwrap_or_else(|| "--".to_string())),
        ("As of", fmt_date(date)),
    ];
    let key_width = facts.iter().map(|(k, _)| k.chars().count()).max().unwrap_or(0);
    let title = format!("{} · {}", race.race_id, race.label);
    let lines: Vec<String> = facts
        .iter()
        .map(|(k, v)| format!("{k:<key_width$}  {v}"))
        .collect();
    let width = lines
        .iter()
        .map(|l| l.chars().count())
        .chain(std::iter::once(title.chars().count()))
        .max()
        .unwrap_or(0);

    let bar = "─".repeat(width + 2);
    let mut out = format!("┌{bar}┐\n");
    out.push_str(&format!("│ {title:<width$} │\n"));
    out.push_str(&format!("├{bar}┤\n"));
    for line in &lines {
        out.push_str(&format!("│ {line:<width$} │\n"));
    }
    out.push_str(&format!("└{bar}┘\n"));
    out
}

pub fn no_matches(date: NaiveDate) -> String {
    format!("No races match the given filters ({}).\n", fmt_date(date))
}

pub fn dates_list(dates: &[NaiveDate]) -> String {
    if dates.is_empty() {
        return "No grades snapshots published yet.\n".to_string();
    }
    let mut out = String::from("Available dates:\n");
    for d in dates {
        out.push_str(&format!("  {}\n", fmt_date(*d)));
    }
    out
}

pub fn error_notice(err: &AppError) -> String {
    format!("{err}\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chamber, Grade};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn race(label: &str, score: f64, margin: Option<i64>) -> RaceGrade {
        RaceGrade {
            race_id: "S2026IA02".to_string(),
            event_ticker: Some("SENATEIA-26".to_string()),
            market_url: None,
            chamber: Chamber::Senate,
            state: "IA".to_string(),
            state_name: "Iowa".to_string(),
            label: label.to_string(),
            grade: Grade::A,
            liquidity_score: score,
            volume_pct: Some(0.914),
            spread_pct: None,
            oi_pct: Some(0.0),
            rating: Some("Lean R".to_string()),
            margin,
        }
    }

    #[test]
    fn heat_bar_is_proportional() {
        assert_eq!(heat_bar(0.0), "░░░░░░░░░░");
        assert_eq!(heat_bar(0.91), "█████████░");
        assert_eq!(heat_bar(1.0), "██████████");
        assert_eq!(heat_bar(1.7), "██████████");
        assert_eq!(heat_bar(f64::NAN), "░░░░░░░░░░");
    }

    #[test]
    fn cells_format_percent_and_margin() {
        assert_eq!(fmt_pct(Some(0.914)), "91");
        assert_eq!(fmt_pct(Some(0.005)), "1");
        assert_eq!(fmt_pct(None), "--");
        assert_eq!(fmt_margin(Some(6)), "R+6");
        assert_eq!(fmt_margin(Some(-12)), "D+12");
        assert_eq!(fmt_margin(Some(0)), "EVEN");
        assert_eq!(fmt_margin(None), "--");
    }

    #[test]
    fn table_rows_line_up() {
        let a = race("Iowa", 0.91, Some(6));
        let b = race("North Carolina", 0.3, None);
        let out = races_table(date(), &[&a, &b]);

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Market Grades · 2026-10-18 · 2 races");
        // Header, 3 rules, 2 rows
        assert_eq!(lines.len(), 7);
        let width = lines[1].chars().count();
        assert!(lines[1..].iter().all(|l| l.chars().count() == width));
        assert!(lines[1].starts_with('┌') && lines[6].starts_with('└'));
        assert!(lines[4].contains("█████████░  91"));
        assert!(lines[4].contains("R+6"));
        assert!(lines[5].contains("North Carolina"));
    }

    #[test]
    fn table_render_is_deterministic() {
        let a = race("Iowa", 0.91, Some(6));
        assert_eq!(races_table(date(), &[&a]), races_table(date(), &[&a]));
        assert!(races_table(date(), &[&a]).contains("1 race\n"));
    }

    #[test]
    fn empty_set_renders_notice_not_frame() {
        let out = races_table(date(), &[]);
        assert_eq!(out, "No races match the given filters (2026-10-18).\n");
        assert!(!out.contains('┌'));
    }

    #[test]
    fn fact_sheet_is_vertical() {
        let out = race_fact_sheet(date(), &race("Iowa", 0.91, Some(-3)));
        assert!(out.starts_with('┌'));
        assert!(out.contains("S2026IA02 · Iowa"));
        assert!(out.contains("Margin     D+3"));
        assert!(out.contains("Market     SENATEIA-26"));
        assert!(!out.contains("Spread%"));
        let widths: Vec<usize> = out.lines().map(|l| l.chars().count()).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]));
    }
}
