//! Module providing plaintext IO for Models
//!
//! One reaction per line:
//!
//! ```text
//! # comment
//! R1 : A + 2 B --> C [0, 10] @1
//! R2 : C <-> D [, 20]
//! ```
//!
//! Bounds and the objective coefficient are optional, an empty bound takes the default
//! for that side.
use std::fs;
use std::path::Path;

use log::debug;
use thiserror::Error;

use crate::configuration;
use crate::io::equation::{parse_equation, EquationError};
use crate::metabolic_model::model::Model;
use crate::metabolic_model::reaction::Reaction;

impl Model {
    /// Read a plaintext model file
    pub fn read_plaintext<P: AsRef<Path>>(path: P) -> Result<Model, PlaintextError> {
        let source = fs::read_to_string(path)?;
        Model::from_plaintext(&source)
    }

    /// Build a model from plaintext source
    pub fn from_plaintext(source: &str) -> Result<Model, PlaintextError> {
        let (default_lower, default_upper) = {
            let config = configuration::read();
            (config.lower_bound, config.upper_bound)
        };
        let mut model = Model::new_empty();
        for (index, raw_line) in source.lines().enumerate() {
            let line_number = index + 1;
            let line = strip_comment(raw_line).trim();
            if line.is_empty() {
                continue;
            }
            let (id, rest) = line
                .split_once(':')
                .ok_or_else(|| PlaintextError::InvalidLine(line_number, line.to_string()))?;
            let id = id.trim();
            if id.is_empty() {
                return Err(PlaintextError::InvalidLine(line_number, line.to_string()));
            }
            if model.reactions.contains_key(id) {
                return Err(PlaintextError::DuplicateReaction(line_number, id.to_string()));
            }

            // Objective coefficient
            let (rest, objective) = match rest.split_once('@') {
                Some((rest, coef)) => {
                    let coef = coef.trim().parse::<f64>().map_err(|_| {
                        PlaintextError::InvalidObjective(line_number, coef.trim().to_string())
                    })?;
                    (rest, Some(coef))
                }
                None => (rest, None),
            };

            // Bounds
            let (equation_str, bounds) = match rest.find('[') {
                Some(start) => {
                    let end = rest[start..]
                        .find(']')
                        .map(|end| start + end)
                        .ok_or_else(|| {
                            PlaintextError::InvalidBounds(line_number, rest[start..].to_string())
                        })?;
                    (&rest[..start], Some(&rest[start + 1..end]))
                }
                None => (rest, None),
            };

            let equation = parse_equation(equation_str)
                .map_err(|source| PlaintextError::Equation { line: line_number, source })?;
            let (mut lower_bound, mut upper_bound) =
                equation.default_bounds(default_lower, default_upper);
            if let Some(bounds) = bounds {
                let (lower, upper) = bounds
                    .split_once(',')
                    .ok_or_else(|| PlaintextError::InvalidBounds(line_number, bounds.to_string()))?;
                if let Some(lower) = parse_bound(lower, line_number)? {
                    lower_bound = lower;
                }
                if let Some(upper) = parse_bound(upper, line_number)? {
                    upper_bound = upper;
                }
            }

            equation.register_metabolites(&mut model);
            model.add_reaction(Reaction {
                id: id.to_string(),
                metabolites: equation.metabolites,
                name: None,
                gpr: None,
                lower_bound,
                upper_bound,
                subsystem: None,
                notes: None,
                annotation: None,
            });
            if let Some(coef) = objective {
                if coef != 0f64 {
                    model.objective.insert(id.to_string(), coef);
                }
            }
        }
        debug!(
            "Read plaintext model with {} reactions and {} metabolites",
            model.reactions.len(),
            model.metabolites.len()
        );
        Ok(model)
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

/// Parse one side of a bound pair, `None` when it's empty
fn parse_bound(bound: &str, line_number: usize) -> Result<Option<f64>, PlaintextError> {
    let bound = bound.trim();
    if bound.is_empty() {
        return Ok(None);
    }
    bound
        .parse::<f64>()
        .map(Some)
        .map_err(|_| PlaintextError::InvalidBounds(line_number, bound.to_string()))
}

/// Errors raised while reading a plaintext model
#[derive(Error, Debug)]
pub enum PlaintextError {
    #[error("Unable to read file due to {0}")]
    UnableToRead(#[from] std::io::Error),
    #[error("line {0}: expected `id : equation`, found `{1}`")]
    InvalidLine(usize, String),
    #[error("line {0}: reaction `{1}` is defined twice")]
    DuplicateReaction(usize, String),
    #[error("line {0}: invalid bounds `{1}`")]
    InvalidBounds(usize, String),
    #[error("line {0}: invalid objective coefficient `{1}`")]
    InvalidObjective(usize, String),
    #[error("line {line}: {source}")]
    Equation {
        line: usize,
        #[source]
        source: EquationError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn read_toy_model() {
        let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        path.push("test_data/test_models/toy_model.txt");
        let model = Model::read_plaintext(path).unwrap();
        assert_eq!(model.reactions.len(), 5);
        assert_eq!(model.metabolites.len(), 3);
        assert_eq!(model.objective.get("R_BIOMASS"), Some(&1.));
        let exchange = &model.reactions["R_EX_A"];
        assert_eq!((exchange.lower_bound, exchange.upper_bound), (-10., 1000.));
        assert_eq!(exchange.metabolites["A"], -1.);
        assert_eq!(model.reactions["R_R1"].lower_bound, 0.);
    }

    #[test]
    fn empty_bounds_use_defaults() {
        let model = Model::from_plaintext("R1 : A <-> B [, 20]  # partly bounded\n").unwrap();
        let reaction = &model.reactions["R1"];
        assert_eq!(reaction.upper_bound, 20.);
        assert!(reaction.lower_bound < 0.);
        assert!(model.objective.is_empty());
    }

    #[test]
    fn errors_carry_line_numbers() {
        let err = Model::from_plaintext("# header\nR1 : A --> B\nR2 A --> B\n").unwrap_err();
        assert!(matches!(err, PlaintextError::InvalidLine(3, _)));
        let err = Model::from_plaintext("R1 : A --> B [0, x]").unwrap_err();
        assert!(matches!(err, PlaintextError::InvalidBounds(1, _)));
        let err = Model::from_plaintext("R1 : A B").unwrap_err();
        assert!(matches!(err, PlaintextError::Equation { line: 1, .. }));
        let err = Model::from_plaintext("R1 : A --> B\nR1 : B --> A").unwrap_err();
        assert!(matches!(err, PlaintextError::DuplicateReaction(2, _)));
    }
}
