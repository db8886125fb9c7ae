use std::fmt::Write as _;

use rust_decimal::Decimal;
use tax_core::calculations::{CurveError, peak_premium, sample_curve};
use tax_core::{BracketTaxEngine, NetIncomeError};
use tax_data::Schedule;
use thiserror::Error;
use tracing::debug;

use crate::cli::{Command, CurveArgs, TaxPaidArgs};

/// Failures while running a subcommand against a loaded schedule.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    NetIncome(#[from] NetIncomeError),

    #[error(transparent)]
    Curve(#[from] CurveError),

    #[error("tax-paid needs either --from-gross or --from-net")]
    MissingTaxPaidSource,

    #[error("failed to write CSV output: {0}")]
    Output(String),
}

impl From<csv::Error> for CommandError {
    fn from(err: csv::Error) -> Self {
        CommandError::Output(err.to_string())
    }
}

impl CommandError {
    /// Stable kind name printed ahead of the message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NetIncome(err) | Self::Curve(CurveError::NetIncome(err)) => err.kind(),
            Self::Curve(_) => "InvalidRange",
            Self::MissingTaxPaidSource => "InvalidArguments",
            Self::Output(_) => "Output",
        }
    }

    /// Process exit code: 2 for rejected input, 1 for anything else.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::NetIncome(_) | Self::Curve(_) | Self::MissingTaxPaidSource => 2,
            Self::Output(_) => 1,
        }
    }
}

/// Runs `command` against `schedule` and returns the text to print.
pub fn execute(
    command: &Command,
    schedule: &Schedule,
) -> Result<String, CommandError> {
    let engine = BracketTaxEngine::new(&schedule.table);
    debug!(schedule = %schedule.name, ?command, "executing command");

    let output = match command {
        Command::NetIncome { income } => currency(engine.net_income(*income)?),
        Command::GrossIncome { net } => currency(engine.net_income_inverse(*net)?),
        Command::TaxPaid(args) => currency(tax_paid(&engine, args)?),
        Command::MarginalValue { income } => {
            format!("{}\n", engine.marginal_value(*income)?.normalize())
        }
        Command::AverageReturn { income } => {
            format!("{}\n", engine.average_return(*income)?.round_dp(4).normalize())
        }
        Command::Premium { income } => currency(engine.premium(*income)?),
        Command::Curve(args) => curve(&engine, args)?,
        Command::Schedule => describe_schedule(schedule),
    };

    Ok(output)
}

fn currency(value: Decimal) -> String {
    format!("{value:.2}\n")
}

fn tax_paid(
    engine: &BracketTaxEngine<'_>,
    args: &TaxPaidArgs,
) -> Result<Decimal, CommandError> {
    let paid = match (args.from_gross, args.from_net) {
        (Some(gross), _) => engine.tax_paid_from_gross(gross)?,
        (None, Some(net)) => engine.tax_paid_from_net(net)?,
        (None, None) => return Err(CommandError::MissingTaxPaidSource),
    };
    Ok(paid)
}

fn curve(
    engine: &BracketTaxEngine<'_>,
    args: &CurveArgs,
) -> Result<String, CommandError> {
    let points = sample_curve(engine, args.start, args.end, args.step)?;
    let mut writer = csv::Writer::from_writer(Vec::new());

    if args.peak {
        if let Some(point) = peak_premium(&points) {
            writer.serialize(point)?;
        }
    } else {
        for point in &points {
            writer.serialize(point)?;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| CommandError::Output(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| CommandError::Output(e.to_string()))
}

fn describe_schedule(schedule: &Schedule) -> String {
    let mut out = format!("{}\n", schedule.name);
    let table = &schedule.table;

    for (position, bracket) in table.brackets().iter().enumerate() {
        let floor = table.floor_of(position).unwrap_or_default();
        let upper = bracket
            .upper_bound
            .map(|u| u.to_string())
            .unwrap_or_else(|| "unbounded".to_string());
        // Writing to a String cannot fail.
        let _ = writeln!(
            out,
            "{floor:>12} - {upper:<12} {}%",
            (bracket.rate * Decimal::ONE_HUNDRED).normalize()
        );
    }

    out
}
