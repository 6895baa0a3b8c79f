pub mod health;
pub mod latency;
pub mod routes;

pub use routes::{grades_response, router, ApiState, GradesQuery};
