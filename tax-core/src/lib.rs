pub mod calculations;
pub mod models;

pub use calculations::{BracketTaxEngine, NetIncomeError};
pub use models::*;
