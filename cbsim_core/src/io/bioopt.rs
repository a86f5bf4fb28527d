//! Module providing BioOpt IO for Models
//!
//! A BioOpt file is split in sections:
//!
//! ```text
//! -REACTIONS
//! R1 : A + 2 B -> C
//! -CONSTRAINTS
//! R1 [0, 10]
//! -EXTERNAL METABOLITES
//! A
//! -OBJ
//! R_biomass 1 1
//! -DESIGNOBJ
//! R_product 1 1
//! ```
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use log::{debug, warn};
use thiserror::Error;

use crate::configuration;
use crate::io::equation::{parse_equation, EquationError};
use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::model::Model;
use crate::metabolic_model::reaction::Reaction;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    /// Before any section header
    Preamble,
    Reactions,
    Constraints,
    ExternalMetabolites,
    Objective,
    DesignObjective,
}

impl Section {
    fn from_header(header: &str) -> Option<Section> {
        let normalized = header
            .trim_start_matches('-')
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase();
        match normalized.as_str() {
            "REACTIONS" => Some(Section::Reactions),
            "CONSTRAINTS" => Some(Section::Constraints),
            "EXTERNAL METABOLITES" => Some(Section::ExternalMetabolites),
            "OBJ" => Some(Section::Objective),
            "DESIGNOBJ" => Some(Section::DesignObjective),
            _ => None,
        }
    }
}

impl Model {
    /// Read a BioOpt model file
    pub fn read_bioopt<P: AsRef<Path>>(path: P) -> Result<Model, BioOptError> {
        let source = fs::read_to_string(path)?;
        Model::from_bioopt(&source)
    }

    /// Build a model from BioOpt source
    pub fn from_bioopt(source: &str) -> Result<Model, BioOptError> {
        let (default_lower, default_upper) = {
            let config = configuration::read();
            (config.lower_bound, config.upper_bound)
        };
        let mut model = Model::new_empty();
        let mut bounds: IndexMap<String, (usize, f64, f64)> = IndexMap::new();
        let mut external: Vec<String> = Vec::new();
        let mut section = Section::Preamble;

        for (index, raw_line) in source.lines().enumerate() {
            let line_number = index + 1;
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line.starts_with('-') {
                section = Section::from_header(line)
                    .ok_or_else(|| BioOptError::UnknownSection(line_number, line.to_string()))?;
                continue;
            }
            match section {
                Section::Preamble => {
                    return Err(BioOptError::OutsideSection(line_number, line.to_string()))
                }
                Section::Reactions => {
                    let (id, equation) = line.split_once(':').ok_or_else(|| {
                        BioOptError::InvalidLine(line_number, line.to_string())
                    })?;
                    let id = id.trim();
                    if model.reactions.contains_key(id) {
                        return Err(BioOptError::DuplicateReaction(line_number, id.to_string()));
                    }
                    let equation = parse_equation(equation)
                        .map_err(|source| BioOptError::Equation { line: line_number, source })?;
                    let (lower_bound, upper_bound) =
                        equation.default_bounds(default_lower, default_upper);
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
                }
                Section::Constraints => {
                    let (id, lower, upper) = parse_constraint(line)
                        .ok_or_else(|| BioOptError::InvalidLine(line_number, line.to_string()))?;
                    bounds.insert(id, (line_number, lower, upper));
                }
                Section::ExternalMetabolites => {
                    external.push(line.to_string());
                }
                Section::Objective => {
                    let mut fields = line.split_whitespace();
                    let id = fields.next().unwrap_or_default().to_string();
                    let coefficient = match fields.next() {
                        Some(value) => value.parse::<f64>().map_err(|_| {
                            BioOptError::InvalidLine(line_number, line.to_string())
                        })?,
                        None => 1f64,
                    };
                    if !model.reactions.contains_key(&id) {
                        return Err(BioOptError::UnknownReaction(line_number, id));
                    }
                    model.objective.insert(id, coefficient);
                }
                Section::DesignObjective => {
                    debug!("Ignoring design objective `{}`", line);
                }
            }
        }

        for (id, (line_number, lower, upper)) in bounds {
            match model.reactions.get_mut(&id) {
                Some(reaction) => {
                    reaction.lower_bound = lower;
                    reaction.upper_bound = upper;
                }
                None => return Err(BioOptError::UnknownReaction(line_number, id)),
            }
        }
        for met_id in external {
            match model.metabolites.get_mut(&met_id) {
                Some(met) => met.boundary = true,
                None => {
                    warn!("External metabolite `{}` takes part in no reaction", met_id);
                    let mut met = Metabolite::new(&met_id);
                    met.boundary = true;
                    model.add_metabolite(met);
                }
            }
        }
        debug!(
            "Read BioOpt model with {} reactions and {} metabolites",
            model.reactions.len(),
            model.metabolites.len()
        );
        Ok(model)
    }
}

/// Parse `id [lb, ub]`
fn parse_constraint(line: &str) -> Option<(String, f64, f64)> {
    let start = line.find('[')?;
    let end = line.rfind(']')?;
    if end < start {
        return None;
    }
    let id = line[..start].trim();
    let (lower, upper) = line[start + 1..end].split_once(',')?;
    if id.is_empty() {
        return None;
    }
    Some((
        id.to_string(),
        lower.trim().parse().ok()?,
        upper.trim().parse().ok()?,
    ))
}

/// Errors raised while reading a BioOpt model
#[derive(Error, Debug)]
pub enum BioOptError {
    #[error("Unable to read file due to {0}")]
    UnableToRead(#[from] std::io::Error),
    #[error("line {0}: unknown section `{1}`")]
    UnknownSection(usize, String),
    #[error("line {0}: `{1}` is not inside a section")]
    OutsideSection(usize, String),
    #[error("line {0}: can't read `{1}`")]
    InvalidLine(usize, String),
    #[error("line {0}: reaction `{1}` is defined twice")]
    DuplicateReaction(usize, String),
    #[error("line {0}: unknown reaction `{1}`")]
    UnknownReaction(usize, String),
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
        path.push("test_data/test_models/toy_model.bioopt");
        let model = Model::read_bioopt(path).unwrap();
        assert_eq!(model.reactions.len(), 5);
        assert_eq!(model.objective.get("R_BIOMASS"), Some(&1.));
        let exchange = &model.reactions["R_EX_A"];
        assert_eq!((exchange.lower_bound, exchange.upper_bound), (-10., 1000.));
        assert_eq!(model.reactions["R_R2"].lower_bound, 0.);
        let (rows, _) = model.stoichiometric_matrix();
        assert_eq!(rows, vec!["A", "B", "C"]);
    }

    #[test]
    fn external_metabolites_are_boundary() {
        let source = "-REACTIONS\nUPT : Aext -> A\nOUT : A -> \n\n-EXTERNAL METABOLITES\nAext\n\n-OBJ\nOUT 2 1\n";
        let model = Model::from_bioopt(source).unwrap();
        assert!(model.metabolites["Aext"].boundary);
        assert!(!model.metabolites["A"].boundary);
        assert_eq!(model.objective.get("OUT"), Some(&2.));
        let (rows, _) = model.stoichiometric_matrix();
        assert_eq!(rows, vec!["A"]);
    }

    #[test]
    fn bad_files() {
        assert!(matches!(
            Model::from_bioopt("R1 : A -> B"),
            Err(BioOptError::OutsideSection(1, _))
        ));
        assert!(matches!(
            Model::from_bioopt("-REACTIONS\nR1 : A -> B\n-CONSTRAINTS\nR9 [0, 1]"),
            Err(BioOptError::UnknownReaction(4, _))
        ));
        assert!(matches!(
            Model::from_bioopt("-SOMETHING"),
            Err(BioOptError::UnknownSection(1, _))
        ));
    }
}
