use std::sync::LazyLock;

use rust_decimal::Decimal;
use thiserror::Error;

use super::Bracket;

/// Reasons a bracket table is rejected at construction time.
///
/// Positions are zero-based indexes into the bracket list as supplied.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BracketTableError {
    #[error("bracket table has no brackets")]
    Empty,

    #[error("bracket {position} has non-positive upper bound {bound}")]
    NonPositiveBound { position: usize, bound: Decimal },

    #[error("bracket {position} upper bound {bound} does not exceed the previous bound {previous}")]
    BoundsNotIncreasing {
        position: usize,
        bound: Decimal,
        previous: Decimal,
    },

    #[error("bracket {position} rate {rate} is outside [0, 1)")]
    RateOutOfRange { position: usize, rate: Decimal },

    #[error("bracket {position} rate {rate} is lower than the previous rate {previous}")]
    RatesDecreasing {
        position: usize,
        rate: Decimal,
        previous: Decimal,
    },

    #[error("bracket {position} is unbounded but is not the last bracket")]
    UnboundedBeforeLast { position: usize },

    #[error("last bracket must be unbounded, found upper bound {0}")]
    FinalBoundNotUnbounded(Decimal),
}

impl BracketTableError {
    /// Stable kind name shared by every table validation failure.
    pub fn kind(&self) -> &'static str {
        "MalformedBracketTable"
    }
}

static REFERENCE: LazyLock<BracketTable> = LazyLock::new(BracketTable::australian_resident);

/// An immutable, validated progressive tax schedule.
///
/// Income starts at a floor of zero. Bracket `i` covers
/// `(upper[i - 1], upper[i]]`, with zero itself belonging to the first
/// bracket. Bounds strictly increase, rates lie in `[0, 1)` and never
/// decrease, and the last bracket is unbounded.
///
/// The table also caches, for every bracket, the gross income at its floor
/// and the net income accumulated by all brackets below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketTable {
    brackets: Vec<Bracket>,
    floors: Vec<Decimal>,
    net_at_floors: Vec<Decimal>,
}

impl BracketTable {
    /// Validates `brackets` and builds the table.
    ///
    /// # Errors
    ///
    /// Returns [`BracketTableError`] describing the first rule the brackets
    /// break, checked in order of position.
    pub fn new(brackets: Vec<Bracket>) -> Result<Self, BracketTableError> {
        validate(&brackets)?;
        Ok(Self::from_validated(brackets))
    }

    /// The Australian resident schedule used as the default table.
    ///
    /// | upper bound | rate  |
    /// |-------------|-------|
    /// | 18200       | 0     |
    /// | 45000       | 0.19  |
    /// | 120000      | 0.325 |
    /// | 180000      | 0.37  |
    /// | unbounded   | 0.45  |
    pub fn australian_resident() -> Self {
        Self::from_validated(vec![
            Bracket::bounded(Decimal::from(18_200), Decimal::ZERO),
            Bracket::bounded(Decimal::from(45_000), Decimal::new(19, 2)),
            Bracket::bounded(Decimal::from(120_000), Decimal::new(325, 3)),
            Bracket::bounded(Decimal::from(180_000), Decimal::new(37, 2)),
            Bracket::unbounded(Decimal::new(45, 2)),
        ])
    }

    /// Shared instance of [`BracketTable::australian_resident`].
    pub fn reference() -> &'static Self {
        &REFERENCE
    }

    fn from_validated(brackets: Vec<Bracket>) -> Self {
        let mut floors = Vec::with_capacity(brackets.len());
        let mut net_at_floors = Vec::with_capacity(brackets.len());
        let mut floor = Decimal::ZERO;
        let mut net = Decimal::ZERO;

        for bracket in &brackets {
            floors.push(floor);
            net_at_floors.push(net);
            if let Some(upper) = bracket.upper_bound {
                net += (upper - floor) * bracket.retained_share();
                floor = upper;
            }
        }

        Self {
            brackets,
            floors,
            net_at_floors,
        }
    }

    pub fn brackets(&self) -> &[Bracket] {
        &self.brackets
    }

    pub fn len(&self) -> usize {
        self.brackets.len()
    }

    /// Always false for a validated table; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.brackets.is_empty()
    }

    pub fn bracket(
        &self,
        position: usize,
    ) -> Option<&Bracket> {
        self.brackets.get(position)
    }

    /// Gross income at which the bracket at `position` starts.
    pub fn floor_of(
        &self,
        position: usize,
    ) -> Option<Decimal> {
        self.floors.get(position).copied()
    }

    /// Unrounded net income of a gross income equal to the floor of the
    /// bracket at `position`.
    pub fn net_at_floor(
        &self,
        position: usize,
    ) -> Option<Decimal> {
        self.net_at_floors.get(position).copied()
    }

    /// Unrounded net income of `income`, assuming it lies in the bracket at
    /// `position`. `None` when the result does not fit in a `Decimal`.
    pub(crate) fn net_within(
        &self,
        position: usize,
        income: Decimal,
    ) -> Option<Decimal> {
        let retained = self.brackets[position].retained_share();
        income
            .checked_sub(self.floors[position])?
            .checked_mul(retained)?
            .checked_add(self.net_at_floors[position])
    }

    /// Unrounded gross income that nets `net`, assuming the gross income lies
    /// in the bracket at `position`.
    pub(crate) fn gross_within(
        &self,
        position: usize,
        net: Decimal,
    ) -> Option<Decimal> {
        let retained = self.brackets[position].retained_share();
        let floor = self.floors[position];
        net.checked_sub(self.net_at_floors[position])?
            .checked_add(retained.checked_mul(floor)?)?
            .checked_div(retained)
    }

    /// Position of the bracket containing `amount`: the first bracket whose
    /// upper bound is at least `amount`.
    ///
    /// Bounds are strictly increasing, so a binary search finds the same
    /// bracket a first-match linear scan would. Callers reject negative
    /// amounts before asking.
    pub fn bracket_index(
        &self,
        amount: Decimal,
    ) -> usize {
        self.brackets
            .partition_point(|bracket| bracket.upper_bound.is_some_and(|upper| upper < amount))
    }
}

fn validate(brackets: &[Bracket]) -> Result<(), BracketTableError> {
    let last = brackets.len().checked_sub(1).ok_or(BracketTableError::Empty)?;
    let mut previous_bound = Decimal::ZERO;
    let mut previous_rate = Decimal::ZERO;

    for (position, bracket) in brackets.iter().enumerate() {
        let rate = bracket.rate;
        if rate < Decimal::ZERO || rate >= Decimal::ONE {
            return Err(BracketTableError::RateOutOfRange { position, rate });
        }
        if position > 0 && rate < previous_rate {
            return Err(BracketTableError::RatesDecreasing {
                position,
                rate,
                previous: previous_rate,
            });
        }
        previous_rate = rate;

        match bracket.upper_bound {
            Some(bound) if position == last => {
                return Err(BracketTableError::FinalBoundNotUnbounded(bound));
            }
            Some(bound) if bound <= Decimal::ZERO => {
                return Err(BracketTableError::NonPositiveBound { position, bound });
            }
            Some(bound) if bound <= previous_bound => {
                return Err(BracketTableError::BoundsNotIncreasing {
                    position,
                    bound,
                    previous: previous_bound,
                });
            }
            Some(bound) => previous_bound = bound,
            None if position != last => {
                return Err(BracketTableError::UnboundedBeforeLast { position });
            }
            None => {}
        }
    }

    Ok(())
}
