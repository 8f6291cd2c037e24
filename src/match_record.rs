use std::fmt;

use log::debug;

use crate::text_manipulators::{normalize_decimal, split_event_lines};

/// Header labels, in the order every table and report uses.
pub const COLUMNS: [&str; 6] = ["date", "team1_nome", "team2_nome", "team1", "empate", "team2"];

// Positions inside the filtered lines of an event block. Slot 3 carries the
// market label and is ignored.
const TEAM1_NAME: usize = 0;
const TEAM2_NAME: usize = 1;
const DATE: usize = 2;
const TEAM1_ODDS: usize = 4;
const DRAW_ODDS: usize = 5;
const TEAM2_ODDS: usize = 6;
const REQUIRED_LINES: usize = TEAM2_ODDS + 1;

#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub date: String,
    pub team1_name: String,
    pub team2_name: String,
    pub team1_odds: f64,
    pub draw_odds: f64,
    pub team2_odds: f64,
}

impl MatchRecord {
    /// Cell texts in `COLUMNS` order.
    pub fn cells(&self) -> [String; 6] {
        [
            self.date.clone(),
            self.team1_name.clone(),
            self.team2_name.clone(),
            format!("{:.2}", self.team1_odds),
            format!("{:.2}", self.draw_odds),
            format!("{:.2}", self.team2_odds),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowError {
    TooFewFields { found: usize },
    BadOdds { column: &'static str, raw: String },
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowError::TooFewFields { found } => write!(
                f,
                "expected at least {REQUIRED_LINES} usable lines, found {found}"
            ),
            RowError::BadOdds { column, raw } => {
                write!(f, "column {column} is not a valid price: {raw:?}")
            }
        }
    }
}

impl std::error::Error for RowError {}

fn parse_odds(column: &'static str, raw: &str) -> Result<f64, RowError> {
    match normalize_decimal(raw) {
        Some(value) if value.is_finite() && value > 0.0 => Ok(value),
        _ => Err(RowError::BadOdds {
            column,
            raw: raw.to_string(),
        }),
    }
}

/// Turns one raw event block into a record, validating its shape first.
pub fn parse_event_text(text: &str) -> Result<MatchRecord, RowError> {
    let lines = split_event_lines(text);
    if lines.len() < REQUIRED_LINES {
        return Err(RowError::TooFewFields { found: lines.len() });
    }
    Ok(MatchRecord {
        date: lines[DATE].to_string(),
        team1_name: lines[TEAM1_NAME].to_string(),
        team2_name: lines[TEAM2_NAME].to_string(),
        team1_odds: parse_odds(COLUMNS[3], lines[TEAM1_ODDS])?,
        draw_odds: parse_odds(COLUMNS[4], lines[DRAW_ODDS])?,
        team2_odds: parse_odds(COLUMNS[5], lines[TEAM2_ODDS])?,
    })
}

/// Parses every block, silently skipping the ones that don't fit.
pub fn parse_events<S: AsRef<str>>(texts: &[S]) -> MatchTable {
    let rows = texts
        .iter()
        .filter_map(|text| match parse_event_text(text.as_ref()) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!("dropping event row: {e}");
                None
            }
        })
        .collect();
    MatchTable { rows }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchTable {
    pub rows: Vec<MatchRecord>,
}

impl MatchTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn append(&mut self, other: MatchTable) {
        self.rows.extend(other.rows);
    }
}

impl fmt::Display for MatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<[String; 6]> = self.rows.iter().map(MatchRecord::cells).collect();
        let mut widths = COLUMNS.map(|c| c.chars().count());
        for row in &cells {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let header = COLUMNS.map(str::to_string);
        for row in std::iter::once(&header).chain(&cells) {
            let line = row
                .iter()
                .zip(widths)
                .map(|(cell, width)| format!("{cell:<width$}"))
                .collect::<Vec<_>>()
                .join("  ");
            writeln!(f, "{}", line.trim_end())?;
        }
        Ok(())
    }
}
