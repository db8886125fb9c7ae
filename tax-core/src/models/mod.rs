mod bracket;
mod bracket_table;

pub use bracket::Bracket;
pub use bracket_table::{BracketTable, BracketTableError};
