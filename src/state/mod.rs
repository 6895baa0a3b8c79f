pub mod snapshot_store;

pub use snapshot_store::{is_date_literal, SnapshotRef, SnapshotStore};
