use std::path::PathBuf;

use clap::Parser;
use colored::*;

use crate::category::{Category, CategorySet, MAX_RATING};
use crate::config::Config;
use crate::error::ConfigError;
use crate::matrix::{RatingMatrix, RowId};
use crate::table::TableView;

#[derive(Parser, Debug)]
#[command(name = "pizza-ratings")]
#[command(version)]
#[command(about = "Rate pizzas 0-5 per category; ratings sync to a remote sheet")]
pub struct Args {
    /// Pizzas to rate, one table row each (the names the sheet uses)
    #[arg(required = true)]
    pub pizzas: Vec<String>,

    /// TOML config file
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Debounce quiet period in milliseconds (overrides the config file)
    #[arg(long)]
    pub quiet_ms: Option<u64>,

    /// Also rate the dayAfter column
    #[arg(long)]
    pub day_after: bool,

    /// Keep ratings in memory instead of syncing with the sheet
    #[arg(long)]
    pub offline: bool,
}

impl Args {
    /// Config file (or defaults) with command-line overrides applied.
    pub fn resolve_config(&self) -> Result<Config, ConfigError> {
        let mut cfg = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(ms) = self.quiet_ms {
            cfg.quiet_period_ms = ms;
        }
        if self.day_after {
            cfg.include_day_after = true;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

/// One line of interactive input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `click <row> <column>`: advance one cell.
    Click { row: RowId, column: usize },
    /// `set <row> <column> <value>`: set a cell outright.
    Set { row: RowId, category: Category, value: i64 },
    /// `show`: redraw the table.
    Show,
    /// `save`: send pending edits without waiting.
    Save,
    /// `help`
    Help,
    /// `quit` / `exit`
    Quit,
}

pub const HELP: &str = "\
commands:
  click <row> <column>        advance a rating (0 -> 1 -> ... -> 5 -> 0)
  set <row> <column> <value>  set a rating 0-5
  show                        print the table
  save                        save now instead of waiting
  quit                        save pending edits and exit
rows are numbered from 1; columns are numbers from 1 or names like sauce, boxDesign";

impl Command {
    /// Parse a command line. Rows and numeric columns are 1-based.
    pub fn parse(line: &str, categories: &CategorySet) -> Result<Self, String> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            ["click" | "c", row, column] => Ok(Command::Click {
                row: parse_row(row)?,
                column: parse_column(column, categories)?,
            }),
            ["set" | "s", row, column, value] => {
                let column = parse_column(column, categories)?;
                let category = categories
                    .at(column)
                    .ok_or_else(|| format!("no column {}", column + 1))?;
                let value = value
                    .parse::<i64>()
                    .map_err(|_| format!("rating must be a number, got {value:?}"))?;
                Ok(Command::Set {
                    row: parse_row(row)?,
                    category,
                    value,
                })
            }
            ["show"] => Ok(Command::Show),
            ["save"] => Ok(Command::Save),
            ["help" | "?"] => Ok(Command::Help),
            ["quit" | "exit" | "q"] => Ok(Command::Quit),
            [] => Err("empty command".to_string()),
            _ => Err(format!("unknown command {line:?} (try `help`)")),
        }
    }
}

fn parse_row(s: &str) -> Result<RowId, String> {
    match s.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(RowId(n - 1)),
        _ => Err(format!("row must be a number from 1, got {s:?}")),
    }
}

fn parse_column(s: &str, categories: &CategorySet) -> Result<usize, String> {
    if let Ok(n) = s.parse::<usize>() {
        return match n {
            n if n >= 1 && n <= categories.len() => Ok(n - 1),
            _ => Err(format!("column must be 1..={}, got {n}", categories.len())),
        };
    }
    Category::from_key(s)
        .and_then(|c| categories.column_of(c))
        .ok_or_else(|| format!("unknown column {s:?}"))
}

/// Draw the table with one slice icon per rating point.
pub fn render_table<V: TableView>(matrix: &RatingMatrix<V>) -> String {
    let categories = matrix.categories().categories();
    let label_width = (0..matrix.row_count())
        .filter_map(|i| matrix.label(RowId(i)).map(|l| l.chars().count()))
        .max()
        .unwrap_or(0)
        .max(5);
    let cell_width = (MAX_RATING as usize).max(categories.iter().map(|c| c.key().len()).max().unwrap_or(0));

    let mut out = String::new();
    out.push_str(&format!("{:>3}  {:<label_width$}", "#", "pizza"));
    for c in categories {
        out.push_str(&format!("  {:<cell_width$}", c.key()));
    }
    out.push('\n');

    for i in 0..matrix.row_count() {
        let row = RowId(i);
        out.push_str(&format!("{:>3}  {:<label_width$}", i + 1, matrix.label(row).unwrap_or("")));
        for c in categories {
            let units = matrix.get_rating(row, *c).value() as usize;
            let empty = MAX_RATING as usize - units;
            let slices = format!("{}{}", "●".repeat(units).yellow(), "·".repeat(empty).dimmed());
            out.push_str("  ");
            out.push_str(&slices);
            out.push_str(&" ".repeat(cell_width - MAX_RATING as usize));
        }
        out.push('\n');
    }
    out
}
