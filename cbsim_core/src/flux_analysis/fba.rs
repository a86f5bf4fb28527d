//! Flux balance analysis
use indexmap::IndexMap;
use log::debug;

use crate::flux_analysis::{set_reaction_objective, FluxSolution, SimulationError};
use crate::metabolic_model::model::{Constraints, Model};
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::solvers;

/// Optimize a linear objective over the reactions of the model
///
/// # Parameters
/// - `objective`: reaction ids to coefficients, the model objective when `None`
/// - `minimize`: minimize instead of maximize the objective
/// - `constraints`: temporary bound overrides
pub fn fba(
    model: &Model,
    objective: Option<&IndexMap<String, f64>>,
    minimize: bool,
    constraints: &Constraints,
) -> Result<FluxSolution, SimulationError> {
    let objective = objective.unwrap_or(&model.objective);
    let sense = if minimize {
        ObjectiveSense::Minimize
    } else {
        ObjectiveSense::Maximize
    };
    let mut problem = model.build_problem(constraints)?;
    set_reaction_objective(&mut problem, model, objective, sense)?;
    let solution = solvers::solve(&problem)?;
    debug!(
        "FBA finished with status {} and objective {:?}",
        solution.status, solution.objective_value
    );
    Ok(FluxSolution::from_problem_solution(model, solution))
}
