//! Parsimonious flux balance analysis
use indexmap::IndexMap;
use log::debug;

use crate::flux_analysis::{effective_bounds, fba, FluxSolution, SimulationError};
use crate::metabolic_model::model::{Constraints, Model};
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::solvers;
use crate::optimize::variable::VariableType;
use crate::utils::hashing::auxiliary_id;

const OBJECTIVE_CONSTRAINT: &str = "__pfba_objective";
/// Relative slack on the optimum, below solver accuracy and printed precision
const OPTIMUM_SLACK: f64 = 1e-9;

/// Find the optimum of the objective, then the flux distribution with the smallest total
/// absolute flux which still reaches that optimum
///
/// The objective is held at its optimum from the side the first pass optimized towards,
/// minus a slack of `1e-9` scaled by the magnitude of the optimum. Reactions able to run
/// in reverse are split in non-negative forward and reverse parts.
///
/// The reported objective value is the value of the original objective, not the total flux.
pub fn pfba(
    model: &Model,
    objective: Option<&IndexMap<String, f64>>,
    minimize: bool,
    constraints: &Constraints,
) -> Result<FluxSolution, SimulationError> {
    let fba_solution = fba(model, objective, minimize, constraints)?;
    let optimum = match fba_solution.objective_value {
        Some(optimum) if fba_solution.is_optimal() => optimum,
        _ => return Ok(fba_solution),
    };
    let objective = objective.unwrap_or(&model.objective);
    let slack = OPTIMUM_SLACK * optimum.abs().max(1.);
    let (objective_lower, objective_upper) = if minimize {
        (f64::NEG_INFINITY, optimum + slack)
    } else {
        (optimum - slack, f64::INFINITY)
    };

    let mut problem = model.build_problem(constraints)?;
    let (objective_ids, objective_coefficients): (Vec<&str>, Vec<f64>) = objective
        .iter()
        .map(|(id, coef)| (id.as_str(), *coef))
        .unzip();
    problem.add_new_inequality_constraint_by_id(
        OBJECTIVE_CONSTRAINT,
        &objective_ids,
        &objective_coefficients,
        objective_lower,
        objective_upper,
    )?;

    problem.update_objective_sense(ObjectiveSense::Minimize);
    for (id, reaction) in &model.reactions {
        let (lower_bound, upper_bound) = effective_bounds(model, constraints, id);
        if lower_bound >= 0. {
            problem.add_new_linear_objective_term_by_id(id, 1.)?;
            continue;
        }
        let forward = reaction.get_forward_id();
        let reverse = reaction.get_reverse_id();
        problem.add_new_variable(
            &forward,
            None,
            VariableType::Continuous,
            0.,
            upper_bound.max(0.),
        )?;
        problem.add_new_variable(&reverse, None, VariableType::Continuous, 0., -lower_bound)?;
        problem.add_new_equality_constraint_by_id(
            &auxiliary_id(id, "pfba_split"),
            &[id.as_str(), forward.as_str(), reverse.as_str()],
            &[1., -1., 1.],
            0.,
        )?;
        problem.add_new_linear_objective_term_by_id(&forward, 1.)?;
        problem.add_new_linear_objective_term_by_id(&reverse, 1.)?;
    }

    let solution = solvers::solve(&problem)?;
    debug!(
        "pFBA finished with status {}, total flux {:?}",
        solution.status, solution.objective_value
    );
    let mut flux_solution = FluxSolution::from_problem_solution(model, solution);
    if let Some(fluxes) = &flux_solution.fluxes {
        flux_solution.objective_value = Some(
            objective
                .iter()
                .map(|(id, coef)| coef * fluxes.get(id).copied().unwrap_or(0.))
                .sum(),
        );
    }
    Ok(flux_solution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flux_analysis::test_utils::toy_model;

    #[test]
    fn shortest_route_is_used() {
        let model = toy_model();
        let solution = pfba(&model, None, false, &Constraints::new()).unwrap();
        assert!(solution.is_optimal());
        assert!((solution.objective_value.unwrap() - 10.).abs() < 1e-4);
        assert!((solution.flux("R_R1").unwrap() - 10.).abs() < 1e-4);
        assert!(solution.flux("R_R2").unwrap().abs() < 1e-4);
        assert!(solution.flux("R_R3").unwrap().abs() < 1e-4);
        // Split variables don't leak into the fluxes
        assert_eq!(solution.fluxes.unwrap().len(), 5);
    }

    #[test]
    fn optimum_is_kept_at_printed_precision() {
        let model = toy_model();
        let fba_solution = fba(&model, None, false, &Constraints::new()).unwrap();
        let solution = pfba(&model, None, false, &Constraints::new()).unwrap();
        assert_eq!(
            format!("{:.6}", solution.objective_value.unwrap()),
            format!("{:.6}", fba_solution.objective_value.unwrap())
        );
        assert_eq!(format!("{:.6}", solution.flux("R_R1").unwrap()), "10.000000");
    }

    #[test]
    fn minimized_objective_is_held_from_above() {
        let model = toy_model();
        let mut constraints = Constraints::new();
        constraints.insert("R_BIOMASS".to_string(), (2., 1000.));
        let solution = pfba(&model, None, true, &constraints).unwrap();
        assert!(solution.is_optimal());
        assert_eq!(format!("{:.6}", solution.objective_value.unwrap()), "2.000000");
        assert!((solution.flux("R_R1").unwrap() - 2.).abs() < 1e-4);
    }

    #[test]
    fn split_ids_do_not_clash_with_reactions() {
        let model = Model::from_plaintext(
            "R : A <-> [-10, 1000]\nR_forward : A --> B\nBIO : B --> @1\n",
        )
        .unwrap();
        let solution = pfba(&model, None, false, &Constraints::new()).unwrap();
        assert!(solution.is_optimal());
        assert!((solution.flux("R").unwrap() + 10.).abs() < 1e-4);
        assert!((solution.flux("R_forward").unwrap() - 10.).abs() < 1e-4);
    }

    #[test]
    fn knocked_out_route() {
        let model = toy_model();
        let mut constraints = Constraints::new();
        constraints.insert("R_R1".to_string(), (0., 0.));
        let solution = pfba(&model, None, false, &constraints).unwrap();
        assert!((solution.flux("R_R2").unwrap() - 10.).abs() < 1e-4);
        assert!((solution.flux("R_R3").unwrap() - 10.).abs() < 1e-4);
    }

    #[test]
    fn infeasible_fba_is_returned() {
        let model = toy_model();
        let mut constraints = Constraints::new();
        constraints.insert("R_BIOMASS".to_string(), (5., 5.));
        constraints.insert("R_EX_A".to_string(), (0., 0.));
        let solution = pfba(&model, None, false, &constraints).unwrap();
        assert!(!solution.is_optimal());
    }
}
