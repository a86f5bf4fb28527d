//! Constraint based simulation methods
//!
//! Every method takes temporary bound overrides ([`Constraints`]) which only affect the
//! optimization problem, the model is never changed.
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use indexmap::IndexMap;
use log::warn;
use thiserror::Error;

use crate::metabolic_model::model::{Constraints, Model, ModelError};
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::{Problem, ProblemError};
use crate::optimize::solvers::SolverError;
use crate::optimize::{OptimizationStatus, ProblemSolution};

pub mod deletion;
pub mod essentiality;
mod fba;
mod moma;
mod pfba;
mod room;

pub use fba::fba;
pub use moma::{lmoma, moma};
pub use pfba::pfba;
pub use room::room;

/// Result of a simulation
#[derive(Debug, Clone)]
pub struct FluxSolution {
    /// Status reported by the solver
    pub status: OptimizationStatus,
    /// Value of the method's objective, `None` unless the status is optimal
    pub objective_value: Option<f64>,
    /// Flux of every reaction, in model order
    pub fluxes: Option<IndexMap<String, f64>>,
    /// Dual values of the mass balance constraints, keyed by metabolite id, when the
    /// solver reports them
    pub shadow_prices: Option<IndexMap<String, f64>>,
    /// Reduced costs of the reactions, in model order, when the solver reports them
    pub reduced_costs: Option<IndexMap<String, f64>>,
}

impl FluxSolution {
    /// Keep only the parts of a problem solution which belong to the model
    pub(crate) fn from_problem_solution(model: &Model, solution: ProblemSolution) -> Self {
        if !solution.status.is_optimal() {
            return FluxSolution {
                status: solution.status,
                objective_value: None,
                fluxes: None,
                shadow_prices: None,
                reduced_costs: None,
            };
        }
        let fluxes = solution.variable_values.as_ref().map(|values| {
            model
                .reactions
                .keys()
                .map(|id| (id.clone(), values.get(id).copied().unwrap_or(0.)))
                .collect()
        });
        let shadow_prices = solution.dual_values.map(|duals| {
            duals
                .into_iter()
                .filter(|(id, _)| model.metabolites.contains_key(id))
                .collect()
        });
        let reduced_costs = solution.reduced_costs.map(|costs| {
            model
                .reactions
                .keys()
                .map(|id| (id.clone(), costs.get(id).copied().unwrap_or(0.)))
                .collect()
        });
        FluxSolution {
            status: solution.status,
            objective_value: solution.objective_value,
            fluxes,
            shadow_prices,
            reduced_costs,
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status.is_optimal()
    }

    /// Flux of a reaction, if the simulation produced fluxes
    pub fn flux(&self, reaction_id: &str) -> Option<f64> {
        self.fluxes
            .as_ref()
            .and_then(|fluxes| fluxes.get(reaction_id).copied())
    }
}

/// Available simulation methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimulationMethod {
    /// Flux balance analysis
    Fba,
    /// Parsimonious flux balance analysis
    Pfba,
    /// Minimization of metabolic adjustment (quadratic)
    Moma,
    /// Linear minimization of metabolic adjustment
    Lmoma,
    /// Regulatory on/off minimization
    Room,
}

impl SimulationMethod {
    /// Whether the method compares against reference fluxes
    pub fn needs_reference(&self) -> bool {
        matches!(
            self,
            SimulationMethod::Moma | SimulationMethod::Lmoma | SimulationMethod::Room
        )
    }
}

impl Display for SimulationMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SimulationMethod::Fba => "fba",
            SimulationMethod::Pfba => "pfba",
            SimulationMethod::Moma => "moma",
            SimulationMethod::Lmoma => "lmoma",
            SimulationMethod::Room => "room",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for SimulationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fba" => Ok(SimulationMethod::Fba),
            "pfba" => Ok(SimulationMethod::Pfba),
            "moma" => Ok(SimulationMethod::Moma),
            "lmoma" => Ok(SimulationMethod::Lmoma),
            "room" => Ok(SimulationMethod::Room),
            other => Err(format!("unknown simulation method `{other}`")),
        }
    }
}

/// Errors raised while simulating
#[derive(Error, Debug, Clone)]
pub enum SimulationError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("Unable to build the optimization problem: {0}")]
    Problem(#[from] ProblemError),
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error("The objective is empty, the model defines no objective and none was given")]
    NoObjective,
    #[error("Objective refers to unknown reaction `{0}`")]
    UnknownReaction(String),
    #[error("The wild type simulation ended with status {0}")]
    WildTypeNotOptimal(OptimizationStatus),
}

/// Run a simulation method with default parameters
///
/// FBA and pFBA maximize the model objective. When a method needs reference fluxes and
/// `reference` is `None`, the pFBA solution under `constraints` is used. ROOM takes its
/// tolerances from the configuration.
pub fn simulate(
    model: &Model,
    method: SimulationMethod,
    reference: Option<&IndexMap<String, f64>>,
    constraints: &Constraints,
) -> Result<FluxSolution, SimulationError> {
    match method {
        SimulationMethod::Fba => fba(model, None, false, constraints),
        SimulationMethod::Pfba => pfba(model, None, false, constraints),
        SimulationMethod::Moma => moma(model, reference, constraints),
        SimulationMethod::Lmoma => lmoma(model, reference, constraints),
        SimulationMethod::Room => {
            let (delta, epsilon) = {
                let config = crate::configuration::read();
                (config.room_delta, config.room_epsilon)
            };
            room(model, reference, constraints, delta, epsilon)
        }
    }
}

/// Reference fluxes of the wild type, the pFBA solution under `constraints`
pub fn wild_type_reference(
    model: &Model,
    constraints: &Constraints,
) -> Result<IndexMap<String, f64>, SimulationError> {
    let solution = pfba(model, None, false, constraints)?;
    match solution.fluxes {
        Some(fluxes) if solution.status.is_optimal() => Ok(fluxes),
        _ => Err(SimulationError::WildTypeNotOptimal(solution.status)),
    }
}

/// Add a linear objective over reactions to a problem built by [`Model::build_problem`]
pub(crate) fn set_reaction_objective(
    problem: &mut Problem,
    model: &Model,
    objective: &IndexMap<String, f64>,
    sense: ObjectiveSense,
) -> Result<(), SimulationError> {
    if objective.is_empty() {
        return Err(SimulationError::NoObjective);
    }
    problem.remove_all_objective_terms();
    problem.update_objective_sense(sense);
    for (id, coefficient) in objective {
        if !model.reactions.contains_key(id) {
            return Err(SimulationError::UnknownReaction(id.clone()));
        }
        problem.add_new_linear_objective_term_by_id(id, *coefficient)?;
    }
    Ok(())
}

/// Reference entries for reactions in the model, others are skipped with a warning
pub(crate) fn usable_reference<'r>(
    model: &Model,
    reference: &'r IndexMap<String, f64>,
) -> Vec<(&'r String, f64)> {
    reference
        .iter()
        .filter(|(id, _)| {
            let known = model.reactions.contains_key(*id);
            if !known {
                warn!("Skipping reference flux of unknown reaction `{}`", id);
            }
            known
        })
        .map(|(id, value)| (id, *value))
        .collect()
}

/// Effective bounds of a reaction, taking overrides into account
pub(crate) fn effective_bounds(model: &Model, constraints: &Constraints, id: &str) -> (f64, f64) {
    match constraints.get(id) {
        Some(bounds) => *bounds,
        None => model
            .reactions
            .get(id)
            .map(|r| (r.lower_bound, r.upper_bound))
            .unwrap_or((f64::NEG_INFINITY, f64::INFINITY)),
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use crate::io::read_model;
    use crate::metabolic_model::model::Model;
    use std::path::PathBuf;

    /// The toy model: uptake of A, two routes from A to B, and B drained by the biomass
    /// reaction
    pub(crate) fn toy_model() -> Model {
        let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        path.push("test_data/test_models/toy_model.xml");
        read_model(path).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_utils::toy_model;
    use super::*;

    #[test]
    fn method_names() {
        assert_eq!("pFBA".parse::<SimulationMethod>(), Ok(SimulationMethod::Pfba));
        assert_eq!(SimulationMethod::Lmoma.to_string(), "lmoma");
        assert!("flux".parse::<SimulationMethod>().is_err());
        assert!(SimulationMethod::Room.needs_reference());
        assert!(!SimulationMethod::Pfba.needs_reference());
    }

    #[test]
    fn simulate_dispatches() {
        let model = toy_model();
        let constraints = Constraints::new();
        for method in [SimulationMethod::Fba, SimulationMethod::Pfba] {
            let solution = simulate(&model, method, None, &constraints).unwrap();
            assert!(solution.is_optimal());
            assert!((solution.flux("R_BIOMASS").unwrap() - 10.).abs() < 1e-4);
        }
    }

    #[test]
    fn wild_type_reference_is_pfba() {
        let model = toy_model();
        let reference = wild_type_reference(&model, &Constraints::new()).unwrap();
        assert_eq!(reference.len(), 5);
        assert!((reference["R_R1"] - 10.).abs() < 1e-4);
        assert!(reference["R_R2"].abs() < 1e-4);
    }

    #[test]
    fn unknown_reference_reactions_are_skipped() {
        let model = toy_model();
        let mut reference = IndexMap::new();
        reference.insert("R_R1".to_string(), 1.);
        reference.insert("R_UNKNOWN".to_string(), 1.);
        let usable = usable_reference(&model, &reference);
        assert_eq!(usable.len(), 1);
        assert_eq!(usable[0].0, "R_R1");
    }
}
