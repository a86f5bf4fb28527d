//! Reaction equations shared by the BioOpt and plaintext readers
//!
//! An equation has the form `2 A + B --> C`, sides are separated by an arrow, and terms
//! by ` + `. Reversible arrows are `<->`, `<=>` and `<-->`, irreversible ones are `-->`,
//! `->` and `=>`.
use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::model::Model;
use indexmap::IndexMap;
use thiserror::Error;

/// Arrows, longest first so `<-->` isn't read as `-->`
const ARROWS: [(&str, bool); 6] = [
    ("<-->", true),
    ("<->", true),
    ("<=>", true),
    ("-->", false),
    ("=>", false),
    ("->", false),
];

/// A parsed reaction equation
#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    /// Metabolite ids to stoichiometric coefficients, negative for substrates
    pub metabolites: IndexMap<String, f64>,
    /// Whether the arrow was reversible
    pub reversible: bool,
}

impl Equation {
    /// Default bounds for a reaction with this equation
    pub fn default_bounds(&self, lower_bound: f64, upper_bound: f64) -> (f64, f64) {
        if self.reversible {
            (lower_bound, upper_bound)
        } else {
            (0., upper_bound)
        }
    }

    /// Add any metabolite of the equation that the model doesn't know yet
    pub fn register_metabolites(&self, model: &mut Model) {
        for met_id in self.metabolites.keys() {
            if !model.metabolites.contains_key(met_id) {
                model.add_metabolite(Metabolite::new(met_id));
            }
        }
    }
}

/// Parse a reaction equation
pub fn parse_equation(equation: &str) -> Result<Equation, EquationError> {
    let (position, arrow, reversible) = ARROWS
        .iter()
        .find_map(|(arrow, reversible)| {
            equation
                .find(arrow)
                .map(|position| (position, *arrow, *reversible))
        })
        .ok_or_else(|| EquationError::MissingArrow(equation.to_string()))?;
    let substrates = &equation[..position];
    let products = &equation[position + arrow.len()..];

    let mut metabolites = IndexMap::new();
    for (side, sign) in [(substrates, -1f64), (products, 1f64)] {
        for (met_id, coefficient) in parse_side(side)? {
            *metabolites.entry(met_id).or_insert(0f64) += sign * coefficient;
        }
    }
    Ok(Equation {
        metabolites,
        reversible,
    })
}

fn parse_side(side: &str) -> Result<Vec<(String, f64)>, EquationError> {
    let mut terms = Vec::new();
    for term in side.split(" + ") {
        let term = term.trim();
        if term.is_empty() {
            continue;
        }
        let parts: Vec<&str> = term.split_whitespace().collect();
        let parsed = match parts.as_slice() {
            [met_id] => (met_id.to_string(), 1f64),
            [coefficient, met_id] => {
                let coefficient = coefficient
                    .trim_start_matches('(')
                    .trim_end_matches(')')
                    .parse::<f64>()
                    .map_err(|_| EquationError::InvalidCoefficient(term.to_string()))?;
                (met_id.to_string(), coefficient)
            }
            _ => return Err(EquationError::InvalidTerm(term.to_string())),
        };
        terms.push(parsed);
    }
    Ok(terms)
}

/// Errors raised while parsing an equation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EquationError {
    #[error("No reaction arrow found in `{0}`")]
    MissingArrow(String),
    #[error("Invalid stoichiometric coefficient in `{0}`")]
    InvalidCoefficient(String),
    #[error("Can't read reaction term `{0}`")]
    InvalidTerm(String),
}
