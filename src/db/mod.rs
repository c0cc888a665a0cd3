//! Database module for the campus registry
//!
//! Pool construction plus one data-access function per table operation.
//! Every function takes an open connection and issues a single statement.

pub mod cities;
pub mod models;
pub mod pool;
pub mod students;

pub use models::{City, NewStudent, SortDirection, Student, StudentDetails, StudentUpdate};
pub use pool::{connect, PoolStatus};
