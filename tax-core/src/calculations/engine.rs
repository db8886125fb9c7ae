//! Bracket tax engine.
//!
//! Converts gross income to net income under a progressive [`BracketTable`]
//! and back, and derives the quantities used to compare the value of the
//! next dollar earned against the average dollar.
//!
//! Net income is piecewise-linear in gross income: every completed bracket
//! below the income contributes its full width taxed at its own rate, and
//! the partially filled bracket contributes the remainder taxed at its rate.
//! Because every rate is below one, the function is continuous and strictly
//! increasing, which is what makes the inverse well defined.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use tax_core::BracketTaxEngine;
//!
//! let engine = BracketTaxEngine::reference();
//!
//! assert_eq!(engine.net_income(dec!(51389)).unwrap(), dec!(44220.57));
//! assert_eq!(engine.net_income_inverse(dec!(51389)).unwrap(), dec!(62008.89));
//! assert_eq!(engine.tax_paid_from_gross(dec!(51389)).unwrap(), dec!(7168.43));
//! assert_eq!(engine.marginal_value(dec!(180001)).unwrap(), dec!(0.55));
//! ```

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use crate::BracketTable;
use crate::calculations::common::round_currency;

/// Errors returned by engine operations.
///
/// Every operation is a pure function of its input and the table, so none
/// of these are worth retrying with the same input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NetIncomeError {
    /// A negative gross income was supplied.
    #[error("income must not be negative, got {0}")]
    InvalidIncome(Decimal),

    /// A zero or negative net income was supplied to the inverse.
    #[error("net income must be greater than zero, got {0}")]
    InvalidNetIncome(Decimal),

    /// A ratio was requested whose denominator is zero: average return at
    /// an income of zero, or premium where net income rounds to zero.
    #[error("result is undefined because its denominator is zero")]
    DivisionUndefined,

    /// An intermediate result does not fit in a `Decimal`.
    #[error("result for {0} is outside the representable range")]
    Overflow(Decimal),

    /// No bracket admits the amount. Cannot happen with a validated table
    /// because the last bracket is unbounded.
    #[error("no tax bracket found for {0}")]
    NoMatchingBracket(Decimal),
}

impl NetIncomeError {
    /// Stable name of the error kind, suitable for user-facing reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidIncome(_) => "InvalidIncome",
            Self::InvalidNetIncome(_) => "InvalidNetIncome",
            Self::DivisionUndefined => "DivisionUndefined",
            Self::Overflow(_) => "Overflow",
            Self::NoMatchingBracket(_) => "NoMatchingBracket",
        }
    }
}

/// Calculator bound to one bracket table.
///
/// The engine only borrows the table, so it is `Copy` and can be shared
/// freely across threads alongside a `&'static` table.
#[derive(Debug, Clone, Copy)]
pub struct BracketTaxEngine<'a> {
    table: &'a BracketTable,
}

impl BracketTaxEngine<'static> {
    /// Engine over the shared reference schedule.
    pub fn reference() -> Self {
        Self::new(BracketTable::reference())
    }
}

impl<'a> BracketTaxEngine<'a> {
    pub fn new(table: &'a BracketTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &'a BracketTable {
        self.table
    }

    /// Net income of a gross `income`, rounded to cents.
    ///
    /// Income inside a zero-rate first bracket is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`NetIncomeError::InvalidIncome`] when `income` is negative and
    /// [`NetIncomeError::Overflow`] when the result cannot be represented.
    pub fn net_income(
        &self,
        income: Decimal,
    ) -> Result<Decimal, NetIncomeError> {
        let position = self.bracket_for_income(income)?;
        let bracket = self
            .table
            .bracket(position)
            .ok_or(NetIncomeError::NoMatchingBracket(income))?;

        if position == 0 && bracket.rate.is_zero() {
            return Ok(income);
        }

        let net = self
            .table
            .net_within(position, income)
            .ok_or(NetIncomeError::Overflow(income))?;
        Ok(round_currency(net))
    }

    /// Gross income that produces a net income of `net`, rounded to cents.
    ///
    /// Gross income is never below net income, so the search starts at the
    /// bracket whose bounds would contain `net` itself and moves upward until
    /// the gross income solved for a bracket actually fits inside it. The
    /// loop visits at most every bracket once.
    ///
    /// # Errors
    ///
    /// Returns [`NetIncomeError::InvalidNetIncome`] when `net` is zero or
    /// negative, and [`NetIncomeError::Overflow`] when the gross income
    /// needed is too large to represent.
    pub fn net_income_inverse(
        &self,
        net: Decimal,
    ) -> Result<Decimal, NetIncomeError> {
        if net <= Decimal::ZERO {
            return Err(NetIncomeError::InvalidNetIncome(net));
        }

        let candidate = self.table.bracket_index(net);

        for (position, bracket) in self.table.brackets().iter().enumerate().skip(candidate) {
            let gross = self
                .table
                .gross_within(position, net)
                .ok_or(NetIncomeError::Overflow(net))?;
            debug!(position, %net, %gross, "solving gross income within bracket");

            if bracket.admits(gross) {
                return Ok(round_currency(gross));
            }
        }

        Err(NetIncomeError::NoMatchingBracket(net))
    }

    /// Tax paid on a gross `income`.
    pub fn tax_paid_from_gross(
        &self,
        income: Decimal,
    ) -> Result<Decimal, NetIncomeError> {
        let net = self.net_income(income)?;
        Ok(round_currency(income - net))
    }

    /// Tax paid by someone whose net income is `net`.
    pub fn tax_paid_from_net(
        &self,
        net: Decimal,
    ) -> Result<Decimal, NetIncomeError> {
        let gross = self.net_income_inverse(net)?;
        Ok(round_currency(gross - net))
    }

    /// Net value of the next dollar earned at `income`: one minus the
    /// marginal rate of the bracket containing `income`.
    pub fn marginal_value(
        &self,
        income: Decimal,
    ) -> Result<Decimal, NetIncomeError> {
        let position = self.bracket_for_income(income)?;
        self.table
            .bracket(position)
            .map(|bracket| bracket.retained_share())
            .ok_or(NetIncomeError::NoMatchingBracket(income))
    }

    /// Net income divided by gross income, unrounded.
    ///
    /// # Errors
    ///
    /// Returns [`NetIncomeError::InvalidIncome`] for negative income and
    /// [`NetIncomeError::DivisionUndefined`] for zero income.
    pub fn average_return(
        &self,
        income: Decimal,
    ) -> Result<Decimal, NetIncomeError> {
        let net = self.net_income(income)?;
        if income.is_zero() {
            return Err(NetIncomeError::DivisionUndefined);
        }
        net.checked_div(income)
            .ok_or(NetIncomeError::Overflow(income))
    }

    /// Percentage by which the marginal dollar's value falls short of the
    /// average dollar's value, rounded to two decimal places.
    ///
    /// Never negative for a table with non-decreasing rates, and exactly zero
    /// inside a zero-rate first bracket.
    ///
    /// # Errors
    ///
    /// Returns [`NetIncomeError::DivisionUndefined`] when the average return
    /// is zero. That happens at an income of zero, and also for incomes of
    /// under a cent whose net income rounds to zero under a taxed first
    /// bracket.
    pub fn premium(
        &self,
        income: Decimal,
    ) -> Result<Decimal, NetIncomeError> {
        let average = self.average_return(income)?;
        if average.is_zero() {
            return Err(NetIncomeError::DivisionUndefined);
        }
        let marginal = self.marginal_value(income)?;

        (average - marginal)
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|shortfall| shortfall.checked_div(average))
            .map(round_currency)
            .ok_or(NetIncomeError::Overflow(income))
    }

    fn bracket_for_income(
        &self,
        income: Decimal,
    ) -> Result<usize, NetIncomeError> {
        if income < Decimal::ZERO {
            return Err(NetIncomeError::InvalidIncome(income));
        }
        let position = self.table.bracket_index(income);
        debug!(position, %income, "selected bracket");
        Ok(position)
    }
}
