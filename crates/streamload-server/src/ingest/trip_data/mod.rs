//! For-hire-vehicle trip records
//!
//! Converts lines of the high-volume FHV trip CSV layout (24 columns) into
//! [`TripDataRow`]s.

pub mod adapter;
pub mod models;

pub use adapter::TripDataCsvAdapter;
pub use models::TripDataRow;
