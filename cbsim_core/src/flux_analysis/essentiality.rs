//! Essential reactions and genes
use log::{debug, info, warn};

use crate::flux_analysis::deletion::{DeletionError, KnockoutKind};
use crate::flux_analysis::{set_reaction_objective, SimulationError};
use crate::metabolic_model::model::{Constraints, Model};
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::{Problem, ProblemError};
use crate::optimize::{solvers, OptimizationStatus, ProblemSolution};

/// Default fraction of the wild type objective below which a deletion counts as lethal
pub const DEFAULT_MIN_GROWTH: f64 = 0.01;

/// Find the reactions or genes whose single deletion is lethal
///
/// A deletion is lethal when FBA is infeasible without the element, or reaches less than
/// `min_growth` times the wild type objective. Asking for genes on a model without genes
/// falls back to reactions.
///
/// The FBA problem is built once. Each deletion closes the bounds of the affected
/// reactions, solves, then restores them.
///
/// # Returns
/// Ids of the essential elements, in model order
pub fn essentiality(
    model: &Model,
    kind: KnockoutKind,
    min_growth: f64,
    constraints: &Constraints,
) -> Result<Vec<String>, DeletionError> {
    let mut problem = model
        .build_problem(constraints)
        .map_err(SimulationError::from)?;
    set_reaction_objective(&mut problem, model, &model.objective, ObjectiveSense::Maximize)?;
    let wild_type = solve(&problem)?;
    let wt_objective = match wild_type.objective_value {
        Some(objective) if wild_type.status.is_optimal() => objective,
        _ => {
            return Err(SimulationError::WildTypeNotOptimal(wild_type.status).into());
        }
    };
    let threshold = min_growth * wt_objective;
    info!(
        "Wild type objective is {}, deletions below {} are lethal",
        wt_objective, threshold
    );

    let kind = if kind == KnockoutKind::Genes && model.genes.is_empty() {
        warn!("The model has no genes, testing reactions instead");
        KnockoutKind::Reactions
    } else {
        kind
    };

    let mut essential = Vec::new();
    match kind {
        KnockoutKind::Reactions => {
            for id in model.reactions.keys() {
                if is_lethal(&mut problem, &[id.as_str()], threshold)? {
                    essential.push(id.clone());
                }
            }
        }
        KnockoutKind::Genes => {
            for id in model.genes.keys() {
                let reactions = model.deleted_genes_to_reactions(&[id.as_str()])?;
                if reactions.is_empty() {
                    debug!("Deleting gene `{}` affects no reaction", id);
                    continue;
                }
                if is_lethal(&mut problem, reactions.as_slice(), threshold)? {
                    essential.push(id.clone());
                }
            }
        }
    }
    info!("Found {} essential {}", essential.len(), kind);
    Ok(essential)
}

fn solve(problem: &Problem) -> Result<ProblemSolution, SimulationError> {
    Ok(solvers::solve(problem)?)
}

/// Solve with the reactions closed, leaving the problem as it was found
fn is_lethal<S: AsRef<str>>(
    problem: &mut Problem,
    reactions: &[S],
    threshold: f64,
) -> Result<bool, DeletionError> {
    let mut saved = Vec::with_capacity(reactions.len());
    for id in reactions {
        let id = id.as_ref();
        let variable = problem
            .get_variable(id)
            .ok_or_else(|| ProblemError::NonExistentVariable(id.to_string()))
            .map_err(SimulationError::from)?;
        saved.push((id, variable.lower_bound, variable.upper_bound));
    }
    for (id, _, _) in &saved {
        problem
            .update_variable_bounds(id, 0., 0.)
            .map_err(SimulationError::from)?;
    }
    let solution = solve(problem);
    for (id, lower_bound, upper_bound) in &saved {
        problem
            .update_variable_bounds(id, *lower_bound, *upper_bound)
            .map_err(SimulationError::from)?;
    }
    let solution = solution?;
    match (solution.status, solution.objective_value) {
        (OptimizationStatus::Infeasible, _) => Ok(true),
        (status, Some(objective)) if status.is_optimal() => Ok(objective < threshold),
        (status, _) => {
            warn!(
                "Deleting {:?} ended with status {}, treating it as not essential",
                saved.iter().map(|(id, _, _)| *id).collect::<Vec<_>>(),
                status
            );
            Ok(false)
        }
    }
}

/// Genes whose single deletion is lethal
pub fn essential_genes(
    model: &Model,
    min_growth: f64,
    constraints: &Constraints,
) -> Result<Vec<String>, DeletionError> {
    essentiality(model, KnockoutKind::Genes, min_growth, constraints)
}

/// Reactions whose single deletion is lethal
pub fn essential_reactions(
    model: &Model,
    min_growth: f64,
    constraints: &Constraints,
) -> Result<Vec<String>, DeletionError> {
    essentiality(model, KnockoutKind::Reactions, min_growth, constraints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flux_analysis::test_utils::toy_model;

    #[test]
    fn toy_essential_reactions() {
        let model = toy_model();
        let essential =
            essential_reactions(&model, DEFAULT_MIN_GROWTH, &Constraints::new()).unwrap();
        assert_eq!(essential, vec!["R_EX_A", "R_BIOMASS"]);
    }

    #[test]
    fn toy_essential_genes() {
        let model = toy_model();
        let essential =
            essential_genes(&model, DEFAULT_MIN_GROWTH, &Constraints::new()).unwrap();
        assert_eq!(essential, vec!["g5"]);
    }

    #[test]
    fn constraints_change_essentiality() {
        let model = toy_model();
        let mut constraints = Constraints::new();
        constraints.insert("R_R3".to_string(), (0., 0.));
        let essential = essential_reactions(&model, DEFAULT_MIN_GROWTH, &constraints).unwrap();
        assert_eq!(essential, vec!["R_EX_A", "R_R1", "R_BIOMASS"]);
    }

    #[test]
    fn gene_free_model_falls_back_to_reactions() {
        let model = Model::from_plaintext("EX : A <-> [-5, 5]\nGROW : A --> @1\n").unwrap();
        let essential =
            essential_genes(&model, DEFAULT_MIN_GROWTH, &Constraints::new()).unwrap();
        assert_eq!(essential, vec!["EX", "GROW"]);
    }

    #[test]
    fn deletions_leave_the_problem_unchanged() {
        let model = toy_model();
        let mut problem = model.build_problem(&Constraints::new()).unwrap();
        set_reaction_objective(&mut problem, &model, &model.objective, ObjectiveSense::Maximize)
            .unwrap();
        assert!(is_lethal(&mut problem, &["R_BIOMASS"], 0.1).unwrap());
        assert!(!is_lethal(&mut problem, &["R_R1"], 0.1).unwrap());
        assert!(is_lethal(&mut problem, &["R_R1", "R_R2"], 0.1).unwrap());
        for (id, reaction) in &model.reactions {
            let variable = problem.get_variable(id).unwrap();
            assert_eq!(
                (variable.lower_bound, variable.upper_bound),
                (reaction.lower_bound, reaction.upper_bound)
            );
        }
        assert!(matches!(
            is_lethal(&mut problem, &["R_NOPE"], 0.1),
            Err(DeletionError::Simulation(SimulationError::Problem(_)))
        ));
    }

    #[test]
    fn infeasible_wild_type_is_an_error() {
        let model = toy_model();
        let mut constraints = Constraints::new();
        constraints.insert("R_BIOMASS".to_string(), (5., 5.));
        constraints.insert("R_EX_A".to_string(), (0., 0.));
        assert!(matches!(
            essential_reactions(&model, DEFAULT_MIN_GROWTH, &constraints),
            Err(DeletionError::Simulation(SimulationError::WildTypeNotOptimal(_)))
        ));
    }
}
