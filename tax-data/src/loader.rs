use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::Deserialize;
use tax_core::{Bracket, BracketTable, BracketTableError};
use thiserror::Error;
use tracing::info;

/// Errors that can occur when loading a bracket schedule.
#[derive(Debug, Error)]
pub enum ScheduleLoaderError {
    #[error("failed to read schedule file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("unsupported schedule format '{0}' (expected .csv or .toml)")]
    UnsupportedFormat(String),

    #[error("malformed bracket table: {0}")]
    MalformedBracketTable(#[from] BracketTableError),
}

impl ScheduleLoaderError {
    /// Stable kind name for user-facing reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io { .. } => "ScheduleUnreadable",
            Self::CsvParse(_) | Self::TomlParse(_) => "ScheduleParse",
            Self::UnsupportedFormat(_) => "UnsupportedFormat",
            Self::MalformedBracketTable(err) => err.kind(),
        }
    }
}

impl From<csv::Error> for ScheduleLoaderError {
    fn from(err: csv::Error) -> Self {
        ScheduleLoaderError::CsvParse(err.to_string())
    }
}

impl From<toml::de::Error> for ScheduleLoaderError {
    fn from(err: toml::de::Error) -> Self {
        ScheduleLoaderError::TomlParse(err.to_string())
    }
}

/// A single row from a bracket schedule CSV file.
///
/// - `upper_bound`: inclusive upper bound of the bracket. An empty cell,
///   `inf` or `infinity` (any case) marks the unbounded top bracket.
/// - `rate`: the marginal tax rate as a decimal (e.g. 0.325 for 32.5%)
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BracketRecord {
    #[serde(deserialize_with = "deserialize_upper_bound")]
    pub upper_bound: Option<Decimal>,
    pub rate: Decimal,
}

impl From<BracketRecord> for Bracket {
    fn from(record: BracketRecord) -> Self {
        Bracket {
            upper_bound: record.upper_bound,
            rate: record.rate,
        }
    }
}

fn deserialize_upper_bound<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) if s.eq_ignore_ascii_case("inf") || s.eq_ignore_ascii_case("infinity") => Ok(None),
        Some(s) => s.parse::<Decimal>().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Layout of a TOML schedule file.
#[derive(Debug, Deserialize)]
struct ScheduleFile {
    name: Option<String>,
    brackets: Vec<Bracket>,
}

/// A validated bracket table together with a display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub name: String,
    pub table: BracketTable,
}

impl Schedule {
    /// The built-in Australian resident schedule.
    pub fn reference() -> Self {
        Self {
            name: "australian-resident".to_string(),
            table: BracketTable::reference().clone(),
        }
    }
}

/// Loader for bracket schedules stored as CSV or TOML.
///
/// Both formats list brackets in increasing order of upper bound. The result
/// is validated through [`BracketTable::new`], so a loaded schedule always
/// satisfies the table invariants.
pub struct BracketTableLoader;

impl BracketTableLoader {
    /// Parse bracket records from a CSV reader with an
    /// `upper_bound,rate` header.
    pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<BracketRecord>, ScheduleLoaderError> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: BracketRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Build a validated table from a CSV reader.
    pub fn table_from_csv<R: Read>(reader: R) -> Result<BracketTable, ScheduleLoaderError> {
        let records = Self::parse_csv(reader)?;
        let brackets = records.into_iter().map(Bracket::from).collect();
        Ok(BracketTable::new(brackets)?)
    }

    /// Parse a TOML schedule. The file may carry a top-level `name`.
    pub fn parse_toml(contents: &str) -> Result<(Option<String>, BracketTable), ScheduleLoaderError> {
        let file: ScheduleFile = toml::from_str(contents)?;
        let table = BracketTable::new(file.brackets)?;
        Ok((file.name, table))
    }

    /// Load a schedule from disk, choosing the format from the file
    /// extension. Without a `name` in the file, the file stem is used.
    pub fn load_from_file(path: &Path) -> Result<Schedule, ScheduleLoaderError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "schedule".to_string());

        let read = |path: &Path| {
            fs::read_to_string(path).map_err(|source| ScheduleLoaderError::Io {
                path: path.to_path_buf(),
                source,
            })
        };

        let schedule = match extension.as_str() {
            "csv" => Schedule {
                name: stem,
                table: Self::table_from_csv(read(path)?.as_bytes())?,
            },
            "toml" => {
                let (name, table) = Self::parse_toml(&read(path)?)?;
                Schedule {
                    name: name.unwrap_or(stem),
                    table,
                }
            }
            other => return Err(ScheduleLoaderError::UnsupportedFormat(other.to_string())),
        };

        info!(
            path = %path.display(),
            name = %schedule.name,
            brackets = schedule.table.len(),
            "loaded bracket schedule"
        );
        Ok(schedule)
    }
}
