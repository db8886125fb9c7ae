use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;

use crate::utils::parse_decimal;

/// Net income calculator for progressive bracket tax schedules.
///
/// Converts between gross and net income and reports tax paid, the value of
/// the marginal dollar and how far it falls below the average dollar.
#[derive(Debug, Parser)]
#[command(name = "net-income-calc", version, about, long_about = None)]
pub struct Cli {
    /// Bracket schedule file (.csv or .toml).
    /// Defaults to the built-in Australian resident schedule.
    #[arg(long, global = true, env = "TAX_SCHEDULE")]
    pub schedule: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Net income of a gross income.
    NetIncome {
        #[arg(value_parser = parse_decimal, allow_negative_numbers = true)]
        income: Decimal,
    },

    /// Gross income needed to take home a net income.
    GrossIncome {
        #[arg(value_parser = parse_decimal, allow_negative_numbers = true)]
        net: Decimal,
    },

    /// Tax paid, from either a gross or a net income.
    TaxPaid(TaxPaidArgs),

    /// Net value of the next dollar earned at an income.
    MarginalValue {
        #[arg(value_parser = parse_decimal, allow_negative_numbers = true)]
        income: Decimal,
    },

    /// Net income divided by gross income.
    AverageReturn {
        #[arg(value_parser = parse_decimal, allow_negative_numbers = true)]
        income: Decimal,
    },

    /// Percentage by which the marginal dollar falls short of the average dollar.
    Premium {
        #[arg(value_parser = parse_decimal, allow_negative_numbers = true)]
        income: Decimal,
    },

    /// Sample every measure across an income range as CSV, up to 100000
    /// points per call.
    Curve(CurveArgs),

    /// Print the active bracket schedule.
    Schedule,
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct TaxPaidArgs {
    /// Gross income the tax is levied on.
    #[arg(long, value_parser = parse_decimal, allow_negative_numbers = true)]
    pub from_gross: Option<Decimal>,

    /// Net income left after tax.
    #[arg(long, value_parser = parse_decimal, allow_negative_numbers = true)]
    pub from_net: Option<Decimal>,
}

#[derive(Debug, Args)]
pub struct CurveArgs {
    #[arg(long, default_value = "0", value_parser = parse_decimal, allow_negative_numbers = true)]
    pub start: Decimal,

    #[arg(long, default_value = "300000", value_parser = parse_decimal, allow_negative_numbers = true)]
    pub end: Decimal,

    #[arg(long, default_value = "1000", value_parser = parse_decimal, allow_negative_numbers = true)]
    pub step: Decimal,

    /// Only print the point with the highest premium.
    #[arg(long)]
    pub peak: bool,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_negative_income() {
        let cli = Cli::try_parse_from(["net-income-calc", "net-income", "-1"]).unwrap();

        let Command::NetIncome { income } = cli.command else {
            panic!("expected net-income, got {:?}", cli.command);
        };
        assert_eq!(income, dec!(-1));
    }

    #[test]
    fn parses_thousands_separator() {
        let cli = Cli::try_parse_from(["net-income-calc", "gross-income", "51,389"]).unwrap();

        let Command::GrossIncome { net } = cli.command else {
            panic!("expected gross-income, got {:?}", cli.command);
        };
        assert_eq!(net, dec!(51389));
    }

    #[test]
    fn tax_paid_requires_exactly_one_source() {
        assert!(Cli::try_parse_from(["net-income-calc", "tax-paid"]).is_err());
        assert!(
            Cli::try_parse_from([
                "net-income-calc",
                "tax-paid",
                "--from-gross",
                "1",
                "--from-net",
                "1",
            ])
            .is_err()
        );
    }

    #[test]
    fn schedule_flag_is_global() {
        let cli =
            Cli::try_parse_from(["net-income-calc", "schedule", "--schedule", "brackets.toml"])
                .unwrap();

        assert_eq!(cli.schedule, Some(PathBuf::from("brackets.toml")));
    }

    #[test]
    fn curve_defaults() {
        let cli = Cli::try_parse_from(["net-income-calc", "curve"]).unwrap();

        let Command::Curve(args) = cli.command else {
            panic!("expected curve, got {:?}", cli.command);
        };
        assert_eq!((args.start, args.end, args.step), (dec!(0), dec!(300000), dec!(1000)));
        assert!(!args.peak);
    }

    #[test]
    fn rejects_non_numeric_income() {
        let err = Cli::try_parse_from(["net-income-calc", "net-income", "lots"]).unwrap_err();

        assert_eq!(err.exit_code(), 2);
    }
}
