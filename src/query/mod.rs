pub mod filter;
pub mod shorthand;
pub mod sort;

pub use filter::{Criterion, FilterParams, QueryResult, RaceQuery, StateMatch};
pub use shorthand::{DistrictToken, Shorthand};
pub use sort::{sort_races, SortDir, SortKey, SortState};
