//! The command console: takes `curl` lines, maps them onto grades API requests,
//! and keeps a scrollback of commands and raw output.

use crate::client::request::{ApiRequest, ApiResponse, RequestId, RequestTracker};

pub const BANNER: &str = "Race Grades API\nType a curl command or press F1-F6 for a suggestion.\n";

pub const CONNECT_FAILED: &str = "curl: (7) Failed to connect";

/// Canned commands, bound to F1..F6 in order.
pub const SUGGESTIONS: [(&str, &str); 6] = [
    ("Senate", "curl \"/api/grades?chamber=senate&format=table\""),
    ("House", "curl \"/api/grades?chamber=house&format=table\""),
    ("Iowa", "curl \"/api/grades?state=IA&format=table\""),
    ("Single race", "curl \"/api/grades?race=S2026IA02&format=table\""),
    ("A-graded", "curl \"/api/grades?grade=A&format=table\""),
    ("JSON", "curl \"/api/grades?chamber=senate\""),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandNotFound {
    pub word: String,
}

impl std::fmt::Display for CommandNotFound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "command not found: {}\nTry: curl /api/grades", self.word)
    }
}

/// Parse `curl ["']/?<path>["']`. A path outside `api/` is taken as the
/// query string of `api/grades`.
pub fn parse_command(input: &str) -> Result<ApiRequest, CommandNotFound> {
    let trimmed = input.trim();
    let not_found = || CommandNotFound {
        word: trimmed.split(' ').next().unwrap_or_default().to_string(),
    };

    let Some((word, rest)) = trimmed.split_once(char::is_whitespace) else {
        return Err(not_found());
    };
    if !word.eq_ignore_ascii_case("curl") {
        return Err(not_found());
    }

    let rest = rest.trim();
    let rest = rest.strip_prefix(['"', '\'']).unwrap_or(rest);
    let rest = rest.strip_prefix('/').unwrap_or(rest);
    let path = rest.strip_suffix(['"', '\'']).unwrap_or(rest).trim_end();
    if path.is_empty() {
        return Err(not_found());
    }

    if path.starts_with("api/") {
        Ok(ApiRequest::new(path))
    } else if path.starts_with('?') {
        Ok(ApiRequest::new(format!("api/grades{path}")))
    } else {
        Ok(ApiRequest::new(format!("api/grades?{path}")))
    }
}

/// Display text for a response: plain text as-is, JSON re-indented.
pub fn format_response(resp: &ApiResponse) -> String {
    if resp.is_text() {
        return resp.body.clone();
    }
    serde_json::from_str::<serde_json::Value>(&resp.body)
        .and_then(|v| serde_json::to_string_pretty(&v))
        .unwrap_or_else(|_| resp.body.clone())
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryOutput {
    Text(String),
    Error(String),
    Pending(RequestId),
    /// A newer command started before this one answered.
    Superseded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleEntry {
    /// Empty for the banner.
    pub command: String,
    pub output: EntryOutput,
}

#[derive(Debug)]
pub struct ConsoleState {
    pub entries: Vec<ConsoleEntry>,
    pub input: String,
    cmd_history: Vec<String>,
    cmd_index: Option<usize>,
    tracker: RequestTracker,
}

impl Default for ConsoleState {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleState {
    pub fn new() -> Self {
        Self {
            entries: vec![ConsoleEntry {
                command: String::new(),
                output: EntryOutput::Text(BANNER.to_string()),
            }],
            input: String::new(),
            cmd_history: Vec::new(),
            cmd_index: None,
            tracker: RequestTracker::new(),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.entries
            .iter()
            .any(|e| matches!(e.output, EntryOutput::Pending(_)))
    }

    pub fn submit_input(&mut self) -> Option<(RequestId, ApiRequest)> {
        let cmd = std::mem::take(&mut self.input);
        self.submit(&cmd)
    }

    /// Run F1..F6 (`n` is 1-based).
    pub fn submit_suggestion(&mut self, n: usize) -> Option<(RequestId, ApiRequest)> {
        let (_, cmd) = SUGGESTIONS.get(n.checked_sub(1)?)?;
        self.submit(cmd)
    }

    /// Record the command and, if it parses, return the request to issue.
    pub fn submit(&mut self, cmd: &str) -> Option<(RequestId, ApiRequest)> {
        let trimmed = cmd.trim();
        if trimmed.is_empty() {
            return None;
        }
        self.cmd_history.push(trimmed.to_string());
        self.cmd_index = None;
        self.input.clear();

        let req = match parse_command(trimmed) {
            Ok(req) => req,
            Err(e) => {
                self.entries.push(ConsoleEntry {
                    command: trimmed.to_string(),
                    output: EntryOutput::Error(e.to_string()),
                });
                return None;
            }
        };

        for entry in &mut self.entries {
            if matches!(entry.output, EntryOutput::Pending(_)) {
                entry.output = EntryOutput::Superseded;
            }
        }
        let id = self.tracker.begin();
        self.entries.push(ConsoleEntry {
            command: trimmed.to_string(),
            output: EntryOutput::Pending(id),
        });
        Some((id, req))
    }

    /// Apply a finished request. Returns false when it was stale and dropped.
    pub fn complete(&mut self, id: RequestId, result: Result<ApiResponse, String>) -> bool {
        if !self.tracker.is_current(id) {
            return false;
        }
        let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.output == EntryOutput::Pending(id))
        else {
            // Cleared while in flight
            return false;
        };
        entry.output = match result {
            Ok(resp) if resp.is_success() => EntryOutput::Text(format_response(&resp)),
            Ok(resp) => EntryOutput::Error(format_response(&resp)),
            Err(_) => EntryOutput::Error(CONNECT_FAILED.to_string()),
        };
        true
    }

    /// Up arrow: step back through earlier commands.
    pub fn history_prev(&mut self) {
        if self.cmd_history.is_empty() {
            return;
        }
        let idx = match self.cmd_index {
            None => self.cmd_history.len() - 1,
            Some(i) => i.saturating_sub(1),
        };
        self.cmd_index = Some(idx);
        self.input = self.cmd_history[idx].clone();
    }

    /// Down arrow: step forward; past the newest command the input empties.
    pub fn history_next(&mut self) {
        let Some(i) = self.cmd_index else { return };
        if i + 1 >= self.cmd_history.len() {
            self.cmd_index = None;
            self.input.clear();
        } else {
            self.cmd_index = Some(i + 1);
            self.input = self.cmd_history[i + 1].clone();
        }
    }

    /// Ctrl+L. Command history survives.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_text(body: &str) -> ApiResponse {
        ApiResponse {
            status: 200,
            content_type: "text/plain; charset=utf-8".to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn quoted_and_bare_paths_parse() {
        let req = parse_command("curl \"/api/grades?chamber=senate&format=table\"").unwrap();
        assert_eq!(req.path, "/api/grades?chamber=senate&format=table");

        let req = parse_command("CURL 'api/grades?race=S2026IA02'").unwrap();
        assert_eq!(req.path, "/api/grades?race=S2026IA02");

        let req = parse_command("curl /api/grades").unwrap();
        assert_eq!(req.path, "/api/grades");
    }

    #[test]
    fn bare_query_targets_grades() {
        assert_eq!(parse_command("curl grade=A").unwrap().path, "/api/grades?grade=A");
        assert_eq!(parse_command("curl \"?dates\"").unwrap().path, "/api/grades?dates");
    }

    #[test]
    fn malformed_input_is_command_not_found() {
        let err = parse_command("ls -la").unwrap_err();
        assert_eq!(err.to_string(), "command not found: ls\nTry: curl /api/grades");
        assert_eq!(parse_command("curl").unwrap_err().word, "curl");
        assert_eq!(parse_command("curl \"\"").unwrap_err().word, "curl");
    }

    #[test]
    fn json_output_is_reindented() {
        let resp = ApiResponse {
            status: 200,
            content_type: "application/json".to_string(),
            body: r#"{"date":"2026-10-18","total":0,"races":[]}"#.to_string(),
        };
        let out = format_response(&resp);
        assert!(out.starts_with("{\n  \"date\": \"2026-10-18\""));
    }

    #[test]
    fn bad_command_does_not_issue_request() {
        let mut console = ConsoleState::new();
        assert!(console.submit("foo bar").is_none());
        let last = console.entries.last().unwrap();
        assert!(matches!(&last.output, EntryOutput::Error(msg) if msg.starts_with("command not found: foo")));
    }

    #[test]
    fn stale_response_is_dropped() {
        let mut console = ConsoleState::new();
        let (first, _) = console.submit_suggestion(1).unwrap();
        let (second, req) = console.submit_suggestion(5).unwrap();
        assert_eq!(req.path, "/api/grades?grade=A&format=table");

        assert!(!console.complete(first, Ok(ok_text("senate table"))));
        assert!(console.complete(second, Ok(ok_text("a-graded table"))));

        let outputs: Vec<&EntryOutput> = console.entries.iter().map(|e| &e.output).collect();
        assert_eq!(outputs[1], &EntryOutput::Superseded);
        assert_eq!(outputs[2], &EntryOutput::Text("a-graded table".to_string()));
        assert!(!console.is_loading());
    }

    #[test]
    fn failures_render_as_errors() {
        let mut console = ConsoleState::new();
        let (id, _) = console.submit("curl /api/grades?race=nope").unwrap();
        console.complete(
            id,
            Ok(ApiResponse {
                status: 404,
                content_type: "text/plain; charset=utf-8".to_string(),
                body: "Race \"NOPE\" not found.\n".to_string(),
            }),
        );
        assert!(matches!(&console.entries.last().unwrap().output, EntryOutput::Error(_)));

        let (id, _) = console.submit("curl /api/grades").unwrap();
        console.complete(id, Err("connection refused".to_string()));
        assert_eq!(
            console.entries.last().unwrap().output,
            EntryOutput::Error(CONNECT_FAILED.to_string())
        );
    }

    #[test]
    fn history_navigation_walks_commands() {
        let mut console = ConsoleState::new();
        console.submit("curl grade=A");
        console.submit("curl grade=B");

        console.history_prev();
        assert_eq!(console.input, "curl grade=B");
        console.history_prev();
        assert_eq!(console.input, "curl grade=A");
        console.history_prev();
        assert_eq!(console.input, "curl grade=A");
        console.history_next();
        assert_eq!(console.input, "curl grade=B");
        console.history_next();
        assert!(console.input.is_empty());
    }

    #[test]
    fn clear_empties_scrollback() {
        let mut console = ConsoleState::new();
        let (id, _) = console.submit("curl grade=A").unwrap();
        console.clear();
        assert!(console.entries.is_empty());
        assert!(!console.complete(id, Ok(ok_text("late"))));
    }
}
