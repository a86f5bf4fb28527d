//! Regulatory on/off minimization
use indexmap::IndexMap;
use log::debug;

use crate::configuration;
use crate::flux_analysis::{
    effective_bounds, usable_reference, wild_type_reference, FluxSolution, SimulationError,
};
use crate::metabolic_model::model::{Constraints, Model};
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::solvers;
use crate::optimize::variable::VariableType;
use crate::utils::hashing::auxiliary_id;

/// Find the flux distribution with the fewest significant changes from the reference
///
/// A flux counts as unchanged while it stays within `w ± (delta * |w| + epsilon)`. Every
/// reference reaction gets a binary variable `y` which relaxes that band to the reaction
/// bounds, and the number of relaxed bands is minimized. Infinite bounds are replaced by
/// the configured `unbounded_flux`.
///
/// The problem is mixed integer, so it needs a solver with integer support.
pub fn room(
    model: &Model,
    reference: Option<&IndexMap<String, f64>>,
    constraints: &Constraints,
    delta: f64,
    epsilon: f64,
) -> Result<FluxSolution, SimulationError> {
    let reference = match reference {
        Some(reference) => reference.clone(),
        None => wild_type_reference(model, constraints)?,
    };
    let unbounded = configuration::read().unbounded_flux;

    let mut problem = model.build_problem(constraints)?;
    problem.update_objective_sense(ObjectiveSense::Minimize);
    for (id, target) in usable_reference(model, &reference) {
        let (lower_bound, upper_bound) = effective_bounds(model, constraints, id);
        let lower_bound = if lower_bound.is_finite() {
            lower_bound
        } else {
            -unbounded
        };
        let upper_bound = if upper_bound.is_finite() {
            upper_bound
        } else {
            unbounded
        };
        let band = delta * target.abs() + epsilon;
        let (band_lower, band_upper) = (target - band, target + band);

        let switch = auxiliary_id(id, "room_y");
        problem.add_new_variable(&switch, None, VariableType::Binary, 0., 1.)?;
        // v - (ub - w_u) y <= w_u
        problem.add_new_inequality_constraint_by_id(
            &format!("{}_upper", switch),
            &[id.as_str(), switch.as_str()],
            &[1., -(upper_bound - band_upper)],
            f64::NEG_INFINITY,
            band_upper,
        )?;
        // v - (lb - w_l) y >= w_l
        problem.add_new_inequality_constraint_by_id(
            &format!("{}_lower", switch),
            &[id.as_str(), switch.as_str()],
            &[1., -(lower_bound - band_lower)],
            band_lower,
            f64::INFINITY,
        )?;
        problem.add_new_linear_objective_term_by_id(&switch, 1.)?;
    }

    let solution = solvers::solve(&problem)?;
    debug!(
        "ROOM finished with status {}, {:?} fluxes changed",
        solution.status, solution.objective_value
    );
    Ok(FluxSolution::from_problem_solution(model, solution))
}
