//! Whitelisted dataset commands
//!
//! The model may request a computed value by replying with a command. Only
//! the fixed set of named operations below is permitted; the request text is
//! parsed into a `Command` and executed against the dataset snapshot. Model
//! output is never evaluated as code.
//!
//! Evaluation failures are caught here and converted into a display string,
//! which is fed back to the model like any other command result.

use crate::agent::dataset::Dataset;
use thiserror::Error;

/// Errors produced while parsing or executing a command
#[derive(Error, Debug)]
pub enum CommandError {
    /// Input did not look like `name(args)`
    #[error("malformed command: {0}")]
    Malformed(String),

    /// Function name is not on the whitelist
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    /// Wrong number of arguments for the function
    #[error("{0} expects {1} argument(s)")]
    BadArity(&'static str, usize),

    /// Named column does not exist in the dataset
    #[error("unknown column: {0}")]
    UnknownColumn(String),

    /// A cell could not be read as a number
    #[error("column {column} contains a non-numeric value: {value}")]
    NotNumeric {
        /// Column being aggregated
        column: String,
        /// Offending cell content
        value: String,
    },

    /// Aggregate over zero rows has no defined value
    #[error("column {0} has no rows")]
    EmptyColumn(String),
}

/// A parsed whitelisted command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `count()` - number of data rows
    Count,
    /// `sum(column)` - numeric sum of a column
    Sum(String),
    /// `mean(column)` - numeric mean of a column
    Mean(String),
    /// `min(column)` - numeric minimum of a column
    Min(String),
    /// `max(column)` - numeric maximum of a column
    Max(String),
    /// `distinct(column)` - unique values of a column, in first-seen order
    Distinct(String),
    /// `count_where(column, value)` - rows whose column equals the value
    CountWhere(String, String),
}

impl Command {
    /// Parse a command request of the form `name(arg, ...)`
    pub fn parse(input: &str) -> Result<Self, CommandError> {
        let input = input.trim();
        let open = input
            .find('(')
            .ok_or_else(|| CommandError::Malformed(input.to_string()))?;
        if !input.ends_with(')') {
            return Err(CommandError::Malformed(input.to_string()));
        }

        let name = input[..open].trim().to_ascii_lowercase();
        let args_str = &input[open + 1..input.len() - 1];
        let args: Vec<String> = if args_str.trim().is_empty() {
            Vec::new()
        } else {
            args_str.split(',').map(|a| unquote(a.trim())).collect()
        };

        match name.as_str() {
            "count" => match args.len() {
                0 => Ok(Command::Count),
                _ => Err(CommandError::BadArity("count", 0)),
            },
            "sum" => one_arg("sum", args).map(Command::Sum),
            "mean" => one_arg("mean", args).map(Command::Mean),
            "min" => one_arg("min", args).map(Command::Min),
            "max" => one_arg("max", args).map(Command::Max),
            "distinct" => one_arg("distinct", args).map(Command::Distinct),
            "count_where" => match <[String; 2]>::try_from(args) {
                Ok([column, value]) => Ok(Command::CountWhere(column, value)),
                Err(_) => Err(CommandError::BadArity("count_where", 2)),
            },
            _ => Err(CommandError::UnknownFunction(name)),
        }
    }

    /// Execute the command against a dataset snapshot
    pub fn execute(&self, dataset: &Dataset) -> Result<String, CommandError> {
        match self {
            Command::Count => Ok(dataset.row_count().to_string()),
            Command::Sum(column) => {
                let values = numeric_column(dataset, column)?;
                Ok(format_number(values.iter().sum()))
            }
            Command::Mean(column) => {
                let values = numeric_column(dataset, column)?;
                if values.is_empty() {
                    return Err(CommandError::EmptyColumn(column.clone()));
                }
                Ok(format_number(
                    values.iter().sum::<f64>() / values.len() as f64,
                ))
            }
            Command::Min(column) => {
                let values = numeric_column(dataset, column)?;
                values
                    .into_iter()
                    .reduce(f64::min)
                    .map(format_number)
                    .ok_or_else(|| CommandError::EmptyColumn(column.clone()))
            }
            Command::Max(column) => {
                let values = numeric_column(dataset, column)?;
                values
                    .into_iter()
                    .reduce(f64::max)
                    .map(format_number)
                    .ok_or_else(|| CommandError::EmptyColumn(column.clone()))
            }
            Command::Distinct(column) => {
                let index = column_index(dataset, column)?;
                let mut seen: Vec<String> = Vec::new();
                for value in dataset.column_values(index) {
                    if !seen.iter().any(|s| s.as_str() == value) {
                        seen.push(value.to_string());
                    }
                }
                Ok(seen.join(", "))
            }
            Command::CountWhere(column, value) => {
                let index = column_index(dataset, column)?;
                let count = dataset
                    .column_values(index)
                    .filter(|v| *v == value.as_str())
                    .count();
                Ok(count.to_string())
            }
        }
    }
}

/// Parse and execute a command request, converting any failure to a
/// display string
///
/// This is the only place command failures are caught; they never abort the
/// surrounding interaction.
pub fn evaluate(dataset: &Dataset, input: &str) -> String {
    match Command::parse(input).and_then(|c| c.execute(dataset)) {
        Ok(result) => result,
        Err(e) => format!("error: {}", e),
    }
}

fn one_arg(name: &'static str, args: Vec<String>) -> Result<String, CommandError> {
    match <[String; 1]>::try_from(args) {
        Ok([arg]) => Ok(arg),
        Err(_) => Err(CommandError::BadArity(name, 1)),
    }
}

fn unquote(value: &str) -> String {
    let stripped = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')));
    stripped.unwrap_or(value).to_string()
}

fn column_index(dataset: &Dataset, column: &str) -> Result<usize, CommandError> {
    dataset
        .column_index(column)
        .ok_or_else(|| CommandError::UnknownColumn(column.to_string()))
}

fn numeric_column(dataset: &Dataset, column: &str) -> Result<Vec<f64>, CommandError> {
    let index = column_index(dataset, column)?;
    dataset
        .column_values(index)
        .map(|v| {
            v.trim().parse::<f64>().map_err(|_| CommandError::NotNumeric {
                column: column.to_string(),
                value: v.to_string(),
            })
        })
        .collect()
}

/// Render a float without a trailing `.0` for whole numbers
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
