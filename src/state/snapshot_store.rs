use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::scorer::{snapshot_cutoffs, verify_grades, verify_race_count, verify_snapshot};
use crate::types::{GradeCutoffs, GradingSnapshot};

const LATEST_FILE: &str = "latest.json";

// ---------------------------------------------------------------------------
// SnapshotRef
// ---------------------------------------------------------------------------

/// Which snapshot a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotRef {
    Latest,
    Date(NaiveDate),
}

impl SnapshotRef {
    /// `None`/`latest` resolve to the latest pointer; a strict `YYYY-MM-DD` literal
    /// to that day. Anything else yields `None`, which callers treat as not found.
    pub fn parse(param: Option<&str>) -> Option<Self> {
        match param {
            None | Some("latest") => Some(SnapshotRef::Latest),
            Some(s) if is_date_literal(s) => {
                NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(SnapshotRef::Date)
            }
            Some(_) => None,
        }
    }
}

/// Exactly four digits, dash, two digits, dash, two digits.
pub fn is_date_literal(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 10
        && b.iter().enumerate().all(|(i, c)| match i {
            4 | 7 => *c == b'-',
            _ => c.is_ascii_digit(),
        })
}

// ---------------------------------------------------------------------------
// SnapshotStore
// ---------------------------------------------------------------------------

/// Read side of the daily grading snapshots kept as `<YYYY-MM-DD>.json` files
/// plus a `latest.json` pointer copy.
///
/// Dated snapshots never change once published, so they are cached after the
/// first read. `latest.json` is re-read on every request; the producer swaps
/// it with a rename, so a reader sees either the old or the new file whole.
pub struct SnapshotStore {
    dir: PathBuf,
    /// date → parsed snapshot
    dated: DashMap<NaiveDate, Arc<GradingSnapshot>>,
    /// Cutoffs for checking snapshots that don't record their own; `None`
    /// rebuilds them from the snapshot's scores
    fixed_cutoffs: Option<GradeCutoffs>,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>, fixed_cutoffs: Option<GradeCutoffs>) -> Arc<Self> {
        Arc::new(Self {
            dir: dir.into(),
            dated: DashMap::new(),
            fixed_cutoffs,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load by request literal (`None`, empty, `latest`, or `YYYY-MM-DD`).
    /// Malformed literals are reported as not found, echoing the literal.
    pub fn load(&self, date_param: Option<&str>) -> Result<Arc<GradingSnapshot>> {
        let date_param = date_param.filter(|d| !d.trim().is_empty());
        let not_found = || AppError::SnapshotNotFound {
            date: date_param.filter(|d| *d != "latest").map(str::to_string),
        };
        let Some(snapshot_ref) = SnapshotRef::parse(date_param) else {
            debug!(date = ?date_param, "malformed snapshot date treated as not found");
            return Err(not_found());
        };
        match self.load_ref(snapshot_ref) {
            Err(AppError::SnapshotNotFound { .. }) => Err(not_found()),
            other => other,
        }
    }

    pub fn load_ref(&self, snapshot_ref: SnapshotRef) -> Result<Arc<GradingSnapshot>> {
        match snapshot_ref {
            SnapshotRef::Latest => {
                let path = self.dir.join(LATEST_FILE);
                self.read_snapshot(&path)?
                    .map(Arc::new)
                    .ok_or(AppError::SnapshotNotFound { date: None })
            }
            SnapshotRef::Date(date) => {
                if let Some(cached) = self.dated.get(&date) {
                    return Ok(Arc::clone(&cached));
                }
                let path = self.dated_path(date);
                let snapshot = self.read_snapshot(&path)?.ok_or_else(|| AppError::SnapshotNotFound {
                    date: Some(date.format("%Y-%m-%d").to_string()),
                })?;
                let snapshot = Arc::new(snapshot);
                self.dated.insert(date, Arc::clone(&snapshot));
                Ok(snapshot)
            }
        }
    }

    /// Dates with a published snapshot, newest first. A missing directory is empty.
    pub fn list_available_dates(&self) -> Result<Vec<NaiveDate>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut dates = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(stem) = name.strip_suffix(".json") else { continue };
            if let Some(SnapshotRef::Date(d)) = SnapshotRef::parse(Some(stem)) {
                dates.push(d);
            }
        }
        dates.sort_unstable_by(|a, b| b.cmp(a));
        Ok(dates)
    }

    /// Publish a snapshot as `<date>.json` and swap `latest.json` to it.
    /// Both files are written to a temp name first and renamed into place.
    /// A dated snapshot that already exists is never overwritten.
    pub fn publish(&self, snapshot: &GradingSnapshot) -> Result<PathBuf> {
        verify_snapshot(snapshot, self.fixed_cutoffs.as_ref())?;
        fs::create_dir_all(&self.dir)?;

        let dated = self.dated_path(snapshot.date);
        if dated.exists() {
            return Err(AppError::SnapshotExists(snapshot.date_string()));
        }

        let body = serde_json::to_vec_pretty(snapshot)?;
        write_atomically(&dated, &body)?;
        write_atomically(&self.dir.join(LATEST_FILE), &body)?;

        info!(
            date = %snapshot.date,
            races = snapshot.total_races,
            path = %dated.display(),
            "published grading snapshot"
        );
        Ok(dated)
    }

    fn dated_path(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("{}.json", date.format("%Y-%m-%d")))
    }

    /// `Ok(None)` when the file does not exist.
    fn read_snapshot(&self, path: &Path) -> Result<Option<GradingSnapshot>> {
        let bytes = match fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot: GradingSnapshot = serde_json::from_slice(&bytes).map_err(|e| {
            warn!(path = %path.display(), "snapshot failed to decode: {e}");
            AppError::InvalidSnapshot(format!("{}: {e}", path.display()))
        })?;
        if let Err(e) = verify_race_count(&snapshot) {
            warn!(path = %path.display(), "{e}");
            return Err(e);
        }
        let cutoffs = snapshot_cutoffs(&snapshot, self.fixed_cutoffs.as_ref());
        if let Err(e) = verify_grades(&snapshot, &cutoffs) {
            // Recorded cutoffs are ours and must hold. Snapshots from other
            // producers are served as published.
            if snapshot.grade_cutoffs.is_some() {
                warn!(path = %path.display(), "{e}");
                return Err(e);
            }
            warn!(path = %path.display(), "serving snapshot whose grades disagree with derived cutoffs: {e}");
        }
        Ok(Some(snapshot))
    }
}

fn write_atomically(path: &Path, body: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(body)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
