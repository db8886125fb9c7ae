//! Loading bracket tables from schedule files.

mod loader;

pub use loader::{BracketRecord, BracketTableLoader, Schedule, ScheduleLoaderError};
