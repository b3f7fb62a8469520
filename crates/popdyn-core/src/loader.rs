//! Readers for the plain-text population and reaction tables.
//!
//! Population tables hold `<code> <count>` rows. Reaction tables hold
//! `reactants products [rate [coefficients]]` rows; the rate defaults to 1 and
//! the coefficients to the null code. Blank lines and `#` comments are skipped
//! in both.

use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::{Reaction, ReactionId, Rejection};
use crate::registry::{PopulationUpdate, Registration};
use crate::species::Stoichiometry;
use crate::system::ReactionSystem;

const DEFAULT_RATE: f64 = 1.0;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("could not read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct PopulationRow {
    pub line: usize,
    pub code: Stoichiometry,
    pub value: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReactionRow {
    pub line: usize,
    pub reaction: Reaction,
}

/// Outcome of applying a reaction table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReactionLoadReport {
    pub accepted: Vec<ReactionId>,
    /// Rejected rows with their line numbers.
    pub rejected: Vec<(usize, Rejection)>,
}

fn data_lines(text: &str) -> impl Iterator<Item = (usize, Vec<&str>)> {
    text.lines().enumerate().filter_map(|(idx, raw)| {
        let content = raw.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            return None;
        }
        Some((idx + 1, content.split_whitespace().collect()))
    })
}

fn parse_code(line: usize, field: &str) -> Result<Stoichiometry, LoadError> {
    Stoichiometry::parse(field).map_err(|e| LoadError::Parse {
        line,
        message: e.to_string(),
    })
}

pub fn parse_population_table(text: &str) -> Result<Vec<PopulationRow>, LoadError> {
    data_lines(text)
        .map(|(line, fields)| {
            let [code, value] = fields[..] else {
                return Err(LoadError::Parse {
                    line,
                    message: format!("expected 2 fields, found {}", fields.len()),
                });
            };
            let value = value.parse::<u64>().map_err(|e| LoadError::Parse {
                line,
                message: format!("invalid population {value:?}: {e}"),
            })?;
            Ok(PopulationRow {
                line,
                code: parse_code(line, code)?,
                value,
            })
        })
        .collect()
}

pub fn parse_reaction_table(text: &str) -> Result<Vec<ReactionRow>, LoadError> {
    let mut rows = Vec::new();
    for (line, fields) in data_lines(text) {
        if fields.len() < 2 {
            log::warn!("reaction table line {line}: skipping row with fewer than two fields");
            continue;
        }
        let rate = match fields.get(2) {
            Some(raw) => raw.parse::<f64>().map_err(|e| LoadError::Parse {
                line,
                message: format!("invalid rate {raw:?}: {e}"),
            })?,
            None => DEFAULT_RATE,
        };
        let coefficients = match fields.get(3) {
            Some(raw) => parse_code(line, raw)?,
            None => Stoichiometry::empty(),
        };
        let reaction = Reaction::new(
            parse_code(line, fields[0])?,
            parse_code(line, fields[1])?,
            rate,
        )
        .with_coefficients(coefficients);
        rows.push(ReactionRow { line, reaction });
    }
    Ok(rows)
}

fn read(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Apply population rows one `set_population` call per row.
pub fn apply_populations(
    system: &mut ReactionSystem,
    rows: &[PopulationRow],
    mode: Registration,
) -> Vec<PopulationUpdate> {
    rows.iter()
        .map(|row| system.set_population(&row.code, row.value, mode))
        .collect()
}

/// Add reaction rows in order. Rejected rows are reported, not fatal.
pub fn apply_reactions(
    system: &mut ReactionSystem,
    rows: Vec<ReactionRow>,
    mode: Registration,
) -> ReactionLoadReport {
    let mut report = ReactionLoadReport::default();
    for row in rows {
        match system.add_reaction(row.reaction, mode) {
            Ok(id) => report.accepted.push(id),
            Err(rejection) => {
                log::warn!("reaction table line {}: {rejection}", row.line);
                report.rejected.push((row.line, rejection));
            }
        }
    }
    report
}

pub fn load_populations(
    system: &mut ReactionSystem,
    path: &Path,
    mode: Registration,
) -> Result<Vec<PopulationUpdate>, LoadError> {
    let rows = parse_population_table(&read(path)?)?;
    Ok(apply_populations(system, &rows, mode))
}

pub fn load_reactions(
    system: &mut ReactionSystem,
    path: &Path,
    mode: Registration,
) -> Result<ReactionLoadReport, LoadError> {
    let rows = parse_reaction_table(&read(path)?)?;
    Ok(apply_reactions(system, rows, mode))
}
