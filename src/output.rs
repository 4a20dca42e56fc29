//! Output formatting

use std::path::Path;

use clap::ValueEnum;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::error::CliResult;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

impl OutputFormat {
    /// Prints a list of result rows.
    pub fn print_rows<T: Serialize + Tabled>(&self, rows: &[T]) {
        match self {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(rows).unwrap_or_default());
            }
            OutputFormat::Yaml => {
                println!("{}", serde_yaml::to_string(rows).unwrap_or_default());
            }
            OutputFormat::Table => {
                if rows.is_empty() {
                    println!("(no results)");
                } else {
                    println!("{}", Table::new(rows).with(Style::rounded()));
                }
            }
        }
    }

    /// Prints a single value. Structured reports that have no natural row
    /// shape fall back to JSON in table mode.
    pub fn print_value<T: Serialize>(&self, value: &T) {
        match self {
            OutputFormat::Yaml => {
                println!("{}", serde_yaml::to_string(value).unwrap_or_default());
            }
            OutputFormat::Json | OutputFormat::Table => {
                println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
            }
        }
    }

    pub fn is_table(&self) -> bool {
        matches!(self, OutputFormat::Table)
    }
}

/// Writes result rows to a CSV file with a header derived from the row type.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> CliResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
