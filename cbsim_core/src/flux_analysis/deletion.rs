//! Reaction and gene knock-outs
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use indexmap::IndexMap;
use log::debug;
use thiserror::Error;

use crate::flux_analysis::{
    simulate, wild_type_reference, FluxSolution, SimulationError, SimulationMethod,
};
use crate::metabolic_model::model::{Constraints, GprError, Model};

/// What a knock-out deletes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnockoutKind {
    Reactions,
    Genes,
}

impl Display for KnockoutKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            KnockoutKind::Reactions => write!(f, "reactions"),
            KnockoutKind::Genes => write!(f, "genes"),
        }
    }
}

impl FromStr for KnockoutKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reactions" | "reaction" => Ok(KnockoutKind::Reactions),
            "genes" | "gene" => Ok(KnockoutKind::Genes),
            other => Err(format!("unknown knock-out kind `{other}`")),
        }
    }
}

/// Bound overrides deleting `targets`, on top of `constraints`
///
/// Deleted reactions get `(0, 0)` bounds, replacing any override they had. Deleting genes
/// deletes every reaction whose rule no longer holds without them.
pub fn knockout_constraints<S: AsRef<str>>(
    model: &Model,
    kind: KnockoutKind,
    targets: &[S],
    constraints: &Constraints,
) -> Result<Constraints, DeletionError> {
    let reactions = match kind {
        KnockoutKind::Reactions => {
            let mut reactions = Vec::with_capacity(targets.len());
            for reaction in targets {
                let reaction = reaction.as_ref();
                if !model.reactions.contains_key(reaction) {
                    return Err(DeletionError::UnknownReaction(reaction.to_string()));
                }
                reactions.push(reaction.to_string());
            }
            reactions
        }
        KnockoutKind::Genes => {
            for gene in targets {
                if !model.genes.contains_key(gene.as_ref()) {
                    return Err(DeletionError::UnknownGene(gene.as_ref().to_string()));
                }
            }
            let reactions = model.deleted_genes_to_reactions(targets)?;
            debug!(
                "Deleting {} genes removes reactions {:?}",
                targets.len(),
                reactions
            );
            reactions
        }
    };
    let mut knocked_out = constraints.clone();
    for reaction in reactions {
        knocked_out.insert(reaction, (0., 0.));
    }
    Ok(knocked_out)
}

/// Delete `targets` of the given kind and simulate
///
/// Methods which need reference fluxes use the pFBA solution of the model under
/// `constraints`, without the deletions, when `reference` is `None`.
pub fn knockout<S: AsRef<str>>(
    model: &Model,
    kind: KnockoutKind,
    targets: &[S],
    method: SimulationMethod,
    reference: Option<&IndexMap<String, f64>>,
    constraints: &Constraints,
) -> Result<FluxSolution, DeletionError> {
    let wild_type;
    let reference = match reference {
        None if method.needs_reference() => {
            wild_type = wild_type_reference(model, constraints)?;
            Some(&wild_type)
        }
        reference => reference,
    };
    let knocked_out = knockout_constraints(model, kind, targets, constraints)?;
    debug!("Simulating {} with {} {} deleted", method, targets.len(), kind);
    Ok(simulate(model, method, reference, &knocked_out)?)
}

/// Simulate the model with `reactions` forced to zero flux
pub fn reaction_deletion<S: AsRef<str>>(
    model: &Model,
    reactions: &[S],
    method: SimulationMethod,
    reference: Option<&IndexMap<String, f64>>,
    constraints: &Constraints,
) -> Result<FluxSolution, DeletionError> {
    knockout(
        model,
        KnockoutKind::Reactions,
        reactions,
        method,
        reference,
        constraints,
    )
}

/// Simulate the model with `genes` deleted
pub fn gene_deletion<S: AsRef<str>>(
    model: &Model,
    genes: &[S],
    method: SimulationMethod,
    reference: Option<&IndexMap<String, f64>>,
    constraints: &Constraints,
) -> Result<FluxSolution, DeletionError> {
    knockout(model, KnockoutKind::Genes, genes, method, reference, constraints)
}

/// Errors raised by knock-out simulations
#[derive(Error, Debug, Clone)]
pub enum DeletionError {
    #[error("Reaction `{0}` is not in the model")]
    UnknownReaction(String),
    #[error("Gene `{0}` is not in the model")]
    UnknownGene(String),
    #[error(transparent)]
    Gpr(#[from] GprError),
    #[error(transparent)]
    Simulation(#[from] SimulationError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flux_analysis::test_utils::toy_model;
    use crate::optimize::OptimizationStatus;

    #[test]
    fn kind_names() {
        assert_eq!("Genes".parse::<KnockoutKind>(), Ok(KnockoutKind::Genes));
        assert_eq!("reaction".parse::<KnockoutKind>(), Ok(KnockoutKind::Reactions));
        assert!("metabolites".parse::<KnockoutKind>().is_err());
        assert_eq!(KnockoutKind::Reactions.to_string(), "reactions");
    }

    #[test]
    fn alternative_route_keeps_growth() {
        let model = toy_model();
        let solution = reaction_deletion(
            &model,
            &["R_R1"],
            SimulationMethod::Fba,
            None,
            &Constraints::new(),
        )
        .unwrap();
        assert!((solution.objective_value.unwrap() - 10.).abs() < 1e-4);
        assert!(solution.flux("R_R1").unwrap().abs() < 1e-6);
        // The model keeps its bounds
        assert!(model.reactions["R_R1"].upper_bound > 0.);
    }

    #[test]
    fn both_routes_deleted() {
        let model = toy_model();
        let solution = reaction_deletion(
            &model,
            &["R_R1", "R_R3"],
            SimulationMethod::Fba,
            None,
            &Constraints::new(),
        )
        .unwrap();
        assert!(solution.objective_value.unwrap().abs() < 1e-4);
    }

    #[test]
    fn moma_reference_is_the_undeleted_wild_type() {
        let model = toy_model();
        let solution = reaction_deletion(
            &model,
            &["R_R1"],
            SimulationMethod::Moma,
            None,
            &Constraints::new(),
        )
        .unwrap();
        assert!((solution.flux("R_BIOMASS").unwrap() - 5.).abs() < 1e-3);
    }

    #[test]
    fn gene_rules_are_followed() {
        let model = toy_model();
        // g2 or g3, one of them is enough
        let solution = gene_deletion(
            &model,
            &["g1", "g2"],
            SimulationMethod::Fba,
            None,
            &Constraints::new(),
        )
        .unwrap();
        assert!((solution.objective_value.unwrap() - 10.).abs() < 1e-4);

        let solution = gene_deletion(
            &model,
            &["g1", "g2", "g3"],
            SimulationMethod::Fba,
            None,
            &Constraints::new(),
        )
        .unwrap();
        assert!(solution.objective_value.unwrap().abs() < 1e-4);

        let mut constraints = Constraints::new();
        constraints.insert("R_R1".to_string(), (1., 1000.));
        let solution = knockout(
            &model,
            KnockoutKind::Genes,
            &["g5"],
            SimulationMethod::Fba,
            None,
            &constraints,
        )
        .unwrap();
        assert_eq!(solution.status, OptimizationStatus::Infeasible);
    }

    #[test]
    fn knockouts_replace_overrides() {
        let model = toy_model();
        let mut constraints = Constraints::new();
        constraints.insert("R_R2".to_string(), (1., 5.));
        constraints.insert("R_EX_A".to_string(), (-5., 0.));
        let knocked_out =
            knockout_constraints(&model, KnockoutKind::Genes, &["g2", "g3"], &constraints)
                .unwrap();
        assert_eq!(knocked_out.get("R_R2"), Some(&(0., 0.)));
        assert_eq!(knocked_out.get("R_EX_A"), Some(&(-5., 0.)));
        assert_eq!(knocked_out.len(), 2);
        // A gene without rules of its own changes nothing
        let knocked_out =
            knockout_constraints(&model, KnockoutKind::Genes, &["g2"], &Constraints::new())
                .unwrap();
        assert!(knocked_out.is_empty());
    }

    #[test]
    fn unknown_targets() {
        let model = toy_model();
        assert!(matches!(
            reaction_deletion(
                &model,
                &["R_NOPE"],
                SimulationMethod::Fba,
                None,
                &Constraints::new()
            ),
            Err(DeletionError::UnknownReaction(_))
        ));
        assert!(matches!(
            knockout(
                &model,
                KnockoutKind::Genes,
                &["g42"],
                SimulationMethod::Fba,
                None,
                &Constraints::new()
            ),
            Err(DeletionError::UnknownGene(_))
        ));
    }
}
