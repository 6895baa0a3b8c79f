pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod query;
pub mod render;
pub mod scorer;
pub mod state;
pub mod types;
