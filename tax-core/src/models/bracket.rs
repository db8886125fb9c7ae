use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single marginal-rate bracket.
///
/// The bracket covers incomes above the previous bracket's upper bound up to
/// and including `upper_bound`. `None` means the bracket is unbounded and
/// must be the last one in a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bracket {
    #[serde(default)]
    pub upper_bound: Option<Decimal>,
    pub rate: Decimal,
}

impl Bracket {
    pub fn bounded(
        upper_bound: Decimal,
        rate: Decimal,
    ) -> Self {
        Self {
            upper_bound: Some(upper_bound),
            rate,
        }
    }

    pub fn unbounded(rate: Decimal) -> Self {
        Self {
            upper_bound: None,
            rate,
        }
    }

    /// Share of each dollar in this bracket that is kept after tax.
    pub fn retained_share(&self) -> Decimal {
        Decimal::ONE - self.rate
    }

    /// Whether `amount` does not exceed this bracket's upper bound.
    pub fn admits(
        &self,
        amount: Decimal,
    ) -> bool {
        self.upper_bound.is_none_or(|upper| amount <= upper)
    }
}
