//! Minimization of metabolic adjustment, in its quadratic and linear forms
use indexmap::IndexMap;
use log::debug;

use crate::flux_analysis::{usable_reference, wild_type_reference, FluxSolution, SimulationError};
use crate::metabolic_model::model::{Constraints, Model};
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::Problem;
use crate::optimize::solvers;
use crate::optimize::variable::VariableType;
use crate::utils::hashing::auxiliary_id;

/// Reference fluxes to compare against, the pFBA solution under `constraints` if none
/// were given
fn reference_or_wild_type(
    model: &Model,
    reference: Option<&IndexMap<String, f64>>,
    constraints: &Constraints,
) -> Result<IndexMap<String, f64>, SimulationError> {
    match reference {
        Some(reference) => Ok(reference.clone()),
        None => {
            debug!("No reference fluxes given, using the wild type pFBA solution");
            wild_type_reference(model, constraints)
        }
    }
}

/// Find the flux distribution closest to the reference in euclidean distance
///
/// Minimizes `sum((v - w)^2)` over the reactions present in the reference. The reported
/// objective value is that sum of squares.
pub fn moma(
    model: &Model,
    reference: Option<&IndexMap<String, f64>>,
    constraints: &Constraints,
) -> Result<FluxSolution, SimulationError> {
    let reference = reference_or_wild_type(model, reference, constraints)?;
    let targets = usable_reference(model, &reference);

    let mut problem = model.build_problem(constraints)?;
    problem.update_objective_sense(ObjectiveSense::Minimize);
    // (v - w)^2 = v^2 - 2wv + w^2, the constant doesn't change the optimum
    for (id, target) in &targets {
        problem.add_new_quadratic_objective_term_by_id(id, id, 1.)?;
        if *target != 0. {
            problem.add_new_linear_objective_term_by_id(id, -2. * target)?;
        }
    }

    let solution = solvers::solve(&problem)?;
    let mut flux_solution = FluxSolution::from_problem_solution(model, solution);
    if let Some(fluxes) = &flux_solution.fluxes {
        flux_solution.objective_value = Some(
            targets
                .iter()
                .map(|(id, target)| (fluxes.get(*id).copied().unwrap_or(0.) - target).powi(2))
                .sum(),
        );
    }
    Ok(flux_solution)
}

/// Find the flux distribution closest to the reference in absolute distance
///
/// Every reaction in the reference gets a pair of non-negative deviation variables,
/// `v - d+ <= w` and `-v - d- <= -w`, and their sum is minimized.
pub fn lmoma(
    model: &Model,
    reference: Option<&IndexMap<String, f64>>,
    constraints: &Constraints,
) -> Result<FluxSolution, SimulationError> {
    let reference = reference_or_wild_type(model, reference, constraints)?;
    let targets = usable_reference(model, &reference);

    let mut problem = model.build_problem(constraints)?;
    problem.update_objective_sense(ObjectiveSense::Minimize);
    for (id, target) in &targets {
        add_deviation(&mut problem, id, *target)?;
    }

    let solution = solvers::solve(&problem)?;
    debug!(
        "lMOMA finished with status {} and total deviation {:?}",
        solution.status, solution.objective_value
    );
    Ok(FluxSolution::from_problem_solution(model, solution))
}

fn add_deviation(problem: &mut Problem, id: &str, target: f64) -> Result<(), SimulationError> {
    let positive = auxiliary_id(id, "lmoma_pos");
    let negative = auxiliary_id(id, "lmoma_neg");
    problem.add_new_variable(
        &positive,
        None,
        VariableType::Continuous,
        0.,
        f64::INFINITY,
    )?;
    problem.add_new_variable(
        &negative,
        None,
        VariableType::Continuous,
        0.,
        f64::INFINITY,
    )?;
    problem.add_new_inequality_constraint_by_id(
        &format!("{}_upper", positive),
        &[id, positive.as_str()],
        &[1., -1.],
        f64::NEG_INFINITY,
        target,
    )?;
    problem.add_new_inequality_constraint_by_id(
        &format!("{}_lower", negative),
        &[id, negative.as_str()],
        &[-1., -1.],
        f64::NEG_INFINITY,
        -target,
    )?;
    problem.add_new_linear_objective_term_by_id(&positive, 1.)?;
    problem.add_new_linear_objective_term_by_id(&negative, 1.)?;
    Ok(())
}
