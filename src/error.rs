use axum::{http::StatusCode, response::IntoResponse, Json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{}", snapshot_not_found_message(.date.as_deref()))]
    SnapshotNotFound { date: Option<String> },

    #[error("Race \"{race_id}\" not found.")]
    RaceNotFound { race_id: String },

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Snapshot for {0} already published")]
    SnapshotExists(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

fn snapshot_not_found_message(date: Option<&str>) -> String {
    match date {
        Some(d) => format!("No grades data for date \"{d}\". Use ?dates to list available dates."),
        None => "No grades data available.".to_string(),
    }
}

impl AppError {
    /// Machine-readable kind carried in structured error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::SnapshotNotFound { .. } => "snapshot_not_found",
            AppError::RaceNotFound { .. } => "race_not_found",
            AppError::InvalidSnapshot(_) => "invalid_snapshot",
            AppError::SnapshotExists(_) => "snapshot_exists",
            AppError::Config(_) => "config",
            AppError::Json(_) => "json",
            AppError::Io(_) => "io",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::SnapshotNotFound { .. } | AppError::RaceNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let mut body = serde_json::json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        if let AppError::RaceNotFound { race_id } = &self {
            body["race_id"] = serde_json::Value::String(race_id.clone());
        }
        (self.status(), Json(body)).into_response()
    }
}
