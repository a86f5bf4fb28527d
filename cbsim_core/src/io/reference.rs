//! Reading reference flux distributions
//!
//! One `reaction value` pair per line, separated by a tab, a comma, or whitespace. Lines
//! starting with `#` are comments, and a first line whose value isn't a number is taken
//! to be a header.
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use log::debug;
use thiserror::Error;

/// Read reference fluxes from a file
pub fn read_fluxes<P: AsRef<Path>>(path: P) -> Result<IndexMap<String, f64>, ReferenceError> {
    let source = fs::read_to_string(path)?;
    parse_fluxes(&source)
}

/// Parse reference fluxes from a string
pub fn parse_fluxes(source: &str) -> Result<IndexMap<String, f64>, ReferenceError> {
    let mut fluxes = IndexMap::new();
    let mut first = true;
    for (index, raw_line) in source.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|field| !field.is_empty())
            .collect();
        let is_header = first;
        first = false;
        let [id, value, ..] = fields.as_slice() else {
            return Err(ReferenceError::InvalidLine(index + 1, line.to_string()));
        };
        match value.parse::<f64>() {
            Ok(value) => {
                fluxes.insert(id.to_string(), value);
            }
            Err(_) if is_header => debug!("Skipping reference header `{}`", line),
            Err(_) => return Err(ReferenceError::InvalidValue(index + 1, value.to_string())),
        }
    }
    Ok(fluxes)
}

/// Errors raised while reading reference fluxes
#[derive(Error, Debug)]
pub enum ReferenceError {
    #[error("Unable to read file due to {0}")]
    UnableToRead(#[from] std::io::Error),
    #[error("line {0}: expected `reaction value`, found `{1}`")]
    InvalidLine(usize, String),
    #[error("line {0}: invalid flux value `{1}`")]
    InvalidValue(usize, String),
}
