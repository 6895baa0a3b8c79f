use serde::Deserialize;
use tokio::sync::mpsc::UnboundedSender;

use race_grades::client::{
    fetch, ApiRequest, ApiResponse, ConsoleState, GradesTableState, RequestId, RequestTracker,
};
use race_grades::render::RaceListPayload;
use race_grades::types::RaceGrade;

// ---------------------------------------------------------------------------
// API response types (mirror routes.rs shapes)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LatencyResponse {
    pub p50_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
    pub sample_count: Option<u64>,
}

// ---------------------------------------------------------------------------
// Background results
// ---------------------------------------------------------------------------

/// Results of spawned requests, drained by the event loop.
#[derive(Debug)]
pub enum ApiEvent {
    Grades(RequestId, Result<RaceListPayload, String>),
    Console(RequestId, Result<ApiResponse, String>),
    Latency(LatencyResponse),
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Connecting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Table,
    Console,
}

pub struct AppState {
    pub status: ConnectionStatus,
    pub date: Option<String>,
    pub races: Vec<RaceGrade>,
    pub table: GradesTableState,
    pub console: ConsoleState,
    pub focus: Focus,
    pub latency: LatencyResponse,
    pub last_refresh: std::time::Instant,
    pub base_url: String,
    grades_requests: RequestTracker,
    client: reqwest::Client,
    events: UnboundedSender<ApiEvent>,
}

impl AppState {
    pub fn new(base_url: String, client: reqwest::Client, events: UnboundedSender<ApiEvent>) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            date: None,
            races: Vec::new(),
            table: GradesTableState::new(),
            console: ConsoleState::new(),
            focus: Focus::Table,
            latency: LatencyResponse::default(),
            last_refresh: std::time::Instant::now(),
            base_url,
            grades_requests: RequestTracker::new(),
            client,
            events,
        }
    }

    /// Reload the full snapshot and latency stats in the background.
    pub fn refresh(&mut self) {
        let id = self.grades_requests.begin();
        let client = self.client.clone();
        let base_url = self.base_url.clone();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = match fetch(&client, &base_url, &ApiRequest::all_grades()).await {
                Ok(resp) if resp.is_success() => {
                    serde_json::from_str::<RaceListPayload>(&resp.body).map_err(|e| format!("parse error: {e}"))
                }
                Ok(resp) => Err(format!("HTTP {}", resp.status)),
                Err(e) => Err(e.to_string()),
            };
            let _ = tx.send(ApiEvent::Grades(id, result));

            let latency = ApiRequest::new("/stats/latency");
            if let Ok(resp) = fetch(&client, &base_url, &latency).await {
                if let Ok(l) = serde_json::from_str::<LatencyResponse>(&resp.body) {
                    let _ = tx.send(ApiEvent::Latency(l));
                }
            }
        });
        self.last_refresh = std::time::Instant::now();
    }

    /// Issue a console request, if the submitted command produced one.
    pub fn dispatch_console(&self, issued: Option<(RequestId, ApiRequest)>) {
        let Some((id, req)) = issued else { return };
        let client = self.client.clone();
        let base_url = self.base_url.clone();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = fetch(&client, &base_url, &req).await.map_err(|e| e.to_string());
            let _ = tx.send(ApiEvent::Console(id, result));
        });
    }

    pub fn apply(&mut self, event: ApiEvent) {
        match event {
            ApiEvent::Grades(id, result) => {
                if !self.grades_requests.is_current(id) {
                    return;
                }
                match result {
                    Ok(payload) => {
                        self.date = Some(payload.date.format("%Y-%m-%d").to_string());
                        self.races = payload.races;
                        self.status = ConnectionStatus::Connected;
                    }
                    Err(e) => self.status = ConnectionStatus::Error(e),
                }
            }
            ApiEvent::Console(id, result) => {
                self.console.complete(id, result);
            }
            ApiEvent::Latency(l) => self.latency = l,
        }
    }

    pub fn visible_races(&self) -> Vec<&RaceGrade> {
        self.table.visible(&self.races)
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

pub fn format_latency(ms: Option<f64>) -> String {
    match ms {
        Some(d) if d >= 1000.0 => format!("{:.1}s", d / 1000.0),
        Some(d) => format!("{:.1}ms", d),
        None => "—".to_string(),
    }
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}
