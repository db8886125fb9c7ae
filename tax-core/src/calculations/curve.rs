//! Sampling engine outputs across an income range.
//!
//! Charting consumers plot net income, tax paid and premium over a range of
//! gross incomes. Each sample is an independent engine call, so the points
//! carry no ordering dependency beyond the order they were requested in.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::engine::{BracketTaxEngine, NetIncomeError};

/// Largest number of points a single [`sample_curve`] call will produce.
pub const MAX_CURVE_POINTS: usize = 100_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CurveError {
    #[error("step must be greater than zero, got {0}")]
    NonPositiveStep(Decimal),

    #[error("range end {end} is below range start {start}")]
    EmptyRange { start: Decimal, end: Decimal },

    #[error("range {start} to {end} with step {step} needs more than {limit} points")]
    TooManyPoints {
        start: Decimal,
        end: Decimal,
        step: Decimal,
        limit: usize,
    },

    #[error(transparent)]
    NetIncome(#[from] NetIncomeError),
}

/// Engine outputs for one gross income.
///
/// `average_return` and `premium` are `None` at an income of zero, where
/// both are undefined. `premium` is also `None` when net income rounds to
/// zero, which a taxed first bracket does for incomes under a cent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub income: Decimal,
    pub net_income: Decimal,
    pub tax_paid: Decimal,
    pub marginal_value: Decimal,
    pub average_return: Option<Decimal>,
    pub premium: Option<Decimal>,
}

impl CurvePoint {
    fn at(
        engine: &BracketTaxEngine<'_>,
        income: Decimal,
    ) -> Result<Self, NetIncomeError> {
        let (average_return, premium) = if income.is_zero() {
            (None, None)
        } else {
            let premium = match engine.premium(income) {
                Ok(premium) => Some(premium),
                Err(NetIncomeError::DivisionUndefined) => None,
                Err(err) => return Err(err),
            };
            (Some(engine.average_return(income)?), premium)
        };

        Ok(Self {
            income,
            net_income: engine.net_income(income)?,
            tax_paid: engine.tax_paid_from_gross(income)?,
            marginal_value: engine.marginal_value(income)?,
            average_return,
            premium,
        })
    }
}

/// Samples the engine at `start`, `start + step`, ... up to and including
/// `end` when it falls on the grid.
///
/// # Errors
///
/// Returns [`CurveError`] when `step` is not positive, `end` is below
/// `start`, `start` is a negative income, or the range holds more than
/// [`MAX_CURVE_POINTS`] points.
pub fn sample_curve(
    engine: &BracketTaxEngine<'_>,
    start: Decimal,
    end: Decimal,
    step: Decimal,
) -> Result<Vec<CurvePoint>, CurveError> {
    if step <= Decimal::ZERO {
        return Err(CurveError::NonPositiveStep(step));
    }
    if end < start {
        return Err(CurveError::EmptyRange { start, end });
    }
    if start < Decimal::ZERO {
        return Err(NetIncomeError::InvalidIncome(start).into());
    }

    let count = point_count(start, end, step)?;
    let mut points = Vec::with_capacity(count);
    let mut income = start;
    for _ in 0..count {
        points.push(CurvePoint::at(engine, income)?);
        // Only the step past the last point can leave the representable range.
        match income.checked_add(step) {
            Some(next) => income = next,
            None => break,
        }
    }

    tracing::debug!(count = points.len(), %start, %end, %step, "sampled income curve");
    Ok(points)
}

/// Number of grid points from `start` to `end`, both non-negative with
/// `start <= end`.
fn point_count(
    start: Decimal,
    end: Decimal,
    step: Decimal,
) -> Result<usize, CurveError> {
    let too_many = || CurveError::TooManyPoints {
        start,
        end,
        step,
        limit: MAX_CURVE_POINTS,
    };

    let intervals = (end - start).checked_div(step).ok_or_else(too_many)?.floor();
    intervals
        .to_usize()
        .and_then(|n| n.checked_add(1))
        .filter(|&n| n <= MAX_CURVE_POINTS)
        .ok_or_else(too_many)
}

/// The point with the highest premium. Ties keep the lowest income.
pub fn peak_premium(points: &[CurvePoint]) -> Option<&CurvePoint> {
    points
        .iter()
        .filter(|point| point.premium.is_some())
        .fold(None, |best: Option<&CurvePoint>, point| match best {
            Some(best) if best.premium >= point.premium => Some(best),
            _ => Some(point),
        })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn engine() -> BracketTaxEngine<'static> {
        BracketTaxEngine::reference()
    }

    #[test]
    fn sample_includes_both_ends_on_grid() {
        let points = sample_curve(&engine(), dec!(0), dec!(100000), dec!(25000)).unwrap();

        let incomes: Vec<_> = points.iter().map(|p| p.income).collect();
        assert_eq!(
            incomes,
            vec![dec!(0), dec!(25000), dec!(50000), dec!(75000), dec!(100000)]
        );
    }

    #[test]
    fn sample_stops_before_end_off_grid() {
        let points = sample_curve(&engine(), dec!(10), dec!(35), dec!(10)).unwrap();

        assert_eq!(points.len(), 3);
        assert_eq!(points[2].income, dec!(30));
    }

    #[test]
    fn zero_income_point_has_no_ratios() {
        let points = sample_curve(&engine(), dec!(0), dec!(0), dec!(1)).unwrap();

        assert_eq!(
            points,
            vec![CurvePoint {
                income: dec!(0),
                net_income: dec!(0),
                tax_paid: dec!(0),
                marginal_value: dec!(1),
                average_return: None,
                premium: None,
            }]
        );
    }

    #[test]
    fn point_matches_engine_outputs() {
        let points = sample_curve(&engine(), dec!(51389), dec!(51389), dec!(1)).unwrap();
        let point = &points[0];

        assert_eq!(point.net_income, dec!(44220.57));
        assert_eq!(point.tax_paid, dec!(7168.43));
        assert_eq!(point.marginal_value, dec!(0.675));
    }

    #[test]
    fn rejects_non_positive_step() {
        let result = sample_curve(&engine(), dec!(0), dec!(10), dec!(0));

        assert_eq!(result, Err(CurveError::NonPositiveStep(dec!(0))));
    }

    #[test]
    fn rejects_reversed_range() {
        let result = sample_curve(&engine(), dec!(10), dec!(5), dec!(1));

        assert_eq!(
            result,
            Err(CurveError::EmptyRange {
                start: dec!(10),
                end: dec!(5),
            })
        );
    }

    #[test]
    fn rejects_negative_start() {
        let result = sample_curve(&engine(), dec!(-10), dec!(5), dec!(1));

        assert_eq!(
            result,
            Err(CurveError::NetIncome(NetIncomeError::InvalidIncome(dec!(-10))))
        );
    }

    #[test]
    fn rejects_range_over_point_limit() {
        let result = sample_curve(&engine(), dec!(0), dec!(1000000000000), dec!(0.01));

        assert_eq!(
            result,
            Err(CurveError::TooManyPoints {
                start: dec!(0),
                end: dec!(1000000000000),
                step: dec!(0.01),
                limit: MAX_CURVE_POINTS,
            })
        );
    }

    #[test]
    fn accepts_range_at_point_limit() {
        let end = Decimal::from(MAX_CURVE_POINTS - 1);

        let points = sample_curve(&engine(), dec!(0), end, dec!(1)).unwrap();

        assert_eq!(points.len(), MAX_CURVE_POINTS);
        assert_eq!(points.last().map(|p| p.income), Some(end));
    }

    #[test]
    fn rejects_range_one_past_point_limit() {
        let end = Decimal::from(MAX_CURVE_POINTS);

        let err = sample_curve(&engine(), dec!(0), end, dec!(1)).unwrap_err();

        assert!(matches!(err, CurveError::TooManyPoints { .. }), "got {err:?}");
    }

    #[test]
    fn range_ending_at_largest_decimal_does_not_overflow() {
        let start = Decimal::MAX - dec!(50);

        let points = sample_curve(&engine(), start, Decimal::MAX, dec!(100)).unwrap();

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].income, start);
        assert_eq!(points[0].marginal_value, dec!(0.55));
    }

    #[test]
    fn sub_cent_income_under_taxed_first_bracket_has_no_premium() {
        let table = crate::BracketTable::new(vec![
            crate::Bracket::bounded(dec!(10000), dec!(0.10)),
            crate::Bracket::unbounded(dec!(0.20)),
        ])
        .unwrap();
        let engine = BracketTaxEngine::new(&table);

        let points = sample_curve(&engine, dec!(0.004), dec!(0.004), dec!(1)).unwrap();

        assert_eq!(points[0].net_income, dec!(0));
        assert_eq!(points[0].average_return, Some(dec!(0)));
        assert_eq!(points[0].premium, None);
    }

    #[test]
    fn premium_peaks_just_above_second_bracket_below_300000() {
        let points = sample_curve(&engine(), dec!(1), dec!(300000), dec!(1000)).unwrap();

        let peak = peak_premium(&points).unwrap();

        assert_eq!(peak.income, dec!(45001));
        assert_eq!(peak.premium, Some(dec!(23.89)));
    }

    #[test]
    fn peak_of_empty_curve_is_none() {
        assert_eq!(peak_premium(&[]), None);
    }

    #[test]
    fn peak_keeps_lowest_income_on_ties() {
        let points = sample_curve(&engine(), dec!(1000), dec!(3000), dec!(1000)).unwrap();

        let peak = peak_premium(&points).unwrap();

        assert_eq!(peak.income, dec!(1000));
    }
}
