pub mod console;
pub mod request;
pub mod table_view;

pub use console::{parse_command, ConsoleEntry, ConsoleState, EntryOutput};
pub use request::{fetch, http_client, ApiRequest, ApiResponse, RequestId, RequestTracker};
pub use table_view::GradesTableState;
