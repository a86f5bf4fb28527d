//! This module provides the Model struct for representing an entire metabolic model
use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use crate::metabolic_model::gene::{Gene, GeneActivity};
use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::reaction::Reaction;
use crate::optimize::problem::{Problem, ProblemError};
use crate::optimize::variable::VariableType;

use indexmap::{IndexMap, IndexSet};
use log::debug;
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use thiserror::Error;

/// Temporary flux bound overrides, keyed by reaction id, as (lower bound, upper bound)
///
/// These are applied to the optimization problem only, the model itself is never changed.
pub type Constraints = IndexMap<String, (f64, f64)>;

/// Represents a Genome Scale Metabolic Model
#[derive(Clone, Debug)]
pub struct Model {
    /// Map of reaction ids to Reactions
    pub reactions: IndexMap<String, Reaction>,
    /// Map of gene ids to Genes
    pub genes: IndexMap<String, Gene>,
    /// Map of metabolite ids to Metabolites
    pub metabolites: IndexMap<String, Metabolite>,
    /// Map of reaction ids to objective function coefficients
    pub objective: IndexMap<String, f64>,
    /// Id associated with the Model
    pub id: Option<String>,
    /// Human readable name of the Model
    pub name: Option<String>,
    /// Compartments in the model
    ///
    /// An IndexMap<String, String> of {short name: long name}
    pub compartments: Option<IndexMap<String, String>>,
    /// A version identifier for the Model, stored as a string
    pub version: Option<String>,
}

impl Model {
    pub fn new_empty() -> Self {
        Model {
            reactions: IndexMap::new(),
            genes: IndexMap::new(),
            metabolites: IndexMap::new(),
            objective: IndexMap::new(),
            id: None,
            name: None,
            compartments: None,
            version: None,
        }
    }

    /// Add a reaction to the model
    ///
    /// # Parameters
    /// - reaction: Reaction to add
    ///
    /// # Examples
    /// ```rust
    /// use cbsim_core::metabolic_model::model::Model;
    /// use cbsim_core::metabolic_model::reaction::ReactionBuilder;
    /// let mut model = Model::new_empty();
    /// let new_reaction = ReactionBuilder::default().id("new_reaction").build().unwrap();
    /// model.add_reaction(new_reaction);
    /// ```
    pub fn add_reaction(&mut self, reaction: Reaction) {
        let id = reaction.id.clone();
        self.reactions.insert(id, reaction);
    }

    /// Add a gene to the model
    ///
    /// # Examples
    /// ```rust
    /// use cbsim_core::metabolic_model::gene::GeneBuilder;
    /// use cbsim_core::metabolic_model::model::Model;
    /// let mut model = Model::new_empty();
    /// let new_gene = GeneBuilder::default().id("new_gene").build().unwrap();
    /// model.add_gene(new_gene);
    /// ```
    pub fn add_gene(&mut self, gene: Gene) {
        let id = gene.id.clone();
        self.genes.insert(id, gene);
    }

    /// Add a metabolite to the model
    pub fn add_metabolite(&mut self, metabolite: Metabolite) {
        let id = metabolite.id.clone();
        self.metabolites.insert(id, metabolite);
    }

    // region Stoichiometry

    /// Stoichiometric matrix of the mass balanced metabolites
    ///
    /// # Returns
    /// A tuple of the row (metabolite) ids and the matrix itself. Rows follow the model's
    /// metabolite order, followed by any metabolite only known from a reaction. Boundary
    /// metabolites and metabolites taking part in no reaction have no row. Columns follow
    /// the model's reaction order.
    pub fn stoichiometric_matrix(&self) -> (Vec<String>, CsrMatrix<f64>) {
        let mut rows: IndexSet<&str> = IndexSet::new();
        let mut used: HashSet<&str> = HashSet::new();
        for reaction in self.reactions.values() {
            for (met_id, coef) in &reaction.metabolites {
                if *coef != 0f64 {
                    used.insert(met_id.as_str());
                }
            }
        }
        for (met_id, met) in &self.metabolites {
            if !met.boundary && used.contains(met_id.as_str()) {
                rows.insert(met_id.as_str());
            }
        }
        for reaction in self.reactions.values() {
            for (met_id, coef) in &reaction.metabolites {
                if *coef != 0f64 && !self.metabolites.contains_key(met_id) {
                    rows.insert(met_id.as_str());
                }
            }
        }

        let mut coo = CooMatrix::new(rows.len(), self.reactions.len());
        for (col, reaction) in self.reactions.values().enumerate() {
            for (met_id, coef) in &reaction.metabolites {
                if *coef == 0f64 {
                    continue;
                }
                if let Some(row) = rows.get_index_of(met_id.as_str()) {
                    coo.push(row, col, *coef);
                }
            }
        }
        let row_ids = rows.into_iter().map(String::from).collect();
        (row_ids, CsrMatrix::from(&coo))
    }

    /// Build the flux balance optimization problem for the model
    ///
    /// One continuous variable per reaction (the variable id is the reaction id), and one
    /// mass balance equality constraint per row of the stoichiometric matrix (the constraint
    /// id is the metabolite id). The objective is left empty, as a maximization.
    ///
    /// # Parameters
    /// - `constraints`: temporary bound overrides for some reactions
    pub fn build_problem(&self, constraints: &Constraints) -> Result<Problem, ModelError> {
        if let Some(unknown) = constraints
            .keys()
            .find(|id| !self.reactions.contains_key(*id))
        {
            return Err(ModelError::UnknownReaction(unknown.clone()));
        }

        let mut problem = Problem::new_maximization();
        for (id, reaction) in &self.reactions {
            let (lower_bound, upper_bound) = constraints
                .get(id)
                .copied()
                .unwrap_or((reaction.lower_bound, reaction.upper_bound));
            if lower_bound > upper_bound {
                return Err(ModelError::InvalidBounds {
                    id: id.clone(),
                    lower_bound,
                    upper_bound,
                });
            }
            problem.add_new_variable(
                id,
                reaction.name.as_deref(),
                VariableType::Continuous,
                lower_bound,
                upper_bound,
            )?;
        }

        let (met_ids, stoichiometry) = self.stoichiometric_matrix();
        let reaction_ids: Vec<&str> = self.reactions.keys().map(String::as_str).collect();
        for (met_id, row) in met_ids.iter().zip(stoichiometry.row_iter()) {
            let variables: Vec<&str> = row.col_indices().iter().map(|&j| reaction_ids[j]).collect();
            problem.add_new_equality_constraint_by_id(met_id, &variables, row.values(), 0f64)?;
        }
        debug!(
            "Built problem with {} variables and {} mass balance constraints",
            reaction_ids.len(),
            met_ids.len()
        );
        Ok(problem)
    }

    // endregion Stoichiometry
}

/// Errors associated with the Model
#[derive(Error, Debug, Clone)]
pub enum ModelError {
    /// A reaction id was referenced that doesn't exist in the model
    #[error("Reaction `{0}` does not exist in the model")]
    UnknownReaction(String),
    /// Bounds where lower bound > upper bound
    #[error("Invalid bounds for reaction `{id}`: lower bound {lower_bound} > upper bound {upper_bound}")]
    InvalidBounds {
        id: String,
        lower_bound: f64,
        upper_bound: f64,
    },
    /// Error while constructing the optimization problem
    #[error("Unable to build the optimization problem: {0}")]
    Problem(#[from] ProblemError),
}

// region GPR Functionality
/// Representation of a Gene Protein Reaction Rule as an AST
#[derive(Clone, Debug, PartialEq)]
pub enum Gpr {
    /// Operation on two genes (see [`GprOperation`])
    Operation(GprOperation),
    /// A terminal gene Node (see [`Gene`])
    GeneNode(String),
}

impl Display for Gpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string_id())
    }
}

impl Gpr {
    /// Create a new binary operation node
    pub fn new_binary_operation(
        left: Gpr,
        operator: GprOperatorType,
        right: Gpr,
    ) -> Result<Gpr, GprError> {
        let op = match operator {
            GprOperatorType::Or => GprOperation::Or {
                left: Box::new(left),
                right: Box::new(right),
            },
            GprOperatorType::And => GprOperation::And {
                left: Box::new(left),
                right: Box::new(right),
            },
            GprOperatorType::Not => return Err(GprError::InvalidBinaryOp),
        };
        Ok(Gpr::Operation(op))
    }

    /// Create a new unary operation node
    pub fn new_unary_operation(operator: GprOperatorType, operand: Gpr) -> Result<Gpr, GprError> {
        let op = match operator {
            GprOperatorType::Not => GprOperation::Not {
                val: Box::new(operand),
            },
            _ => return Err(GprError::InvalidUnaryOp),
        };
        Ok(Gpr::Operation(op))
    }

    /// Create a new gene node
    pub fn new_gene_node(gene: &str) -> Gpr {
        Gpr::GeneNode(gene.to_string())
    }

    /// Generate a GPR string with gene ids from the GPR AST
    pub fn to_string_id(&self) -> String {
        match self {
            Gpr::Operation(op) => match op {
                GprOperation::Or { left, right } => {
                    format!("({} or {})", left.to_string_id(), right.to_string_id())
                }
                GprOperation::And { left, right } => {
                    format!("({} and {})", left.to_string_id(), right.to_string_id())
                }
                GprOperation::Not { val } => {
                    format!("(not {})", val)
                }
            },
            Gpr::GeneNode(gene_ref) => gene_ref.to_string(),
        }
    }

    /// Ids of all genes in the rule, in order of first appearance
    pub fn gene_ids(&self) -> Vec<&str> {
        let mut ids: IndexSet<&str> = IndexSet::new();
        self.collect_gene_ids(&mut ids);
        ids.into_iter().collect()
    }

    fn collect_gene_ids<'a>(&'a self, ids: &mut IndexSet<&'a str>) {
        match self {
            Gpr::Operation(GprOperation::Or { left, right })
            | Gpr::Operation(GprOperation::And { left, right }) => {
                left.collect_gene_ids(ids);
                right.collect_gene_ids(ids);
            }
            Gpr::Operation(GprOperation::Not { val }) => val.collect_gene_ids(ids),
            Gpr::GeneNode(gene) => {
                ids.insert(gene.as_str());
            }
        }
    }

    /// Evaluate the rule, looking up the activity of each gene with `activity`
    pub fn eval_with<F>(&self, activity: &F) -> Result<GeneActivity, GprError>
    where
        F: Fn(&str) -> Option<GeneActivity>,
    {
        match self {
            Gpr::Operation(op) => match op {
                GprOperation::Or { left, right } => {
                    let l = left.eval_with(activity)?;
                    let r = right.eval_with(activity)?;
                    if l == GeneActivity::Active || r == GeneActivity::Active {
                        Ok(GeneActivity::Active)
                    } else {
                        Ok(GeneActivity::Inactive)
                    }
                }
                GprOperation::And { left, right } => {
                    let l = left.eval_with(activity)?;
                    let r = right.eval_with(activity)?;
                    if l == GeneActivity::Active && r == GeneActivity::Active {
                        Ok(GeneActivity::Active)
                    } else {
                        Ok(GeneActivity::Inactive)
                    }
                }
                GprOperation::Not { val } => match val.eval_with(activity)? {
                    GeneActivity::Active => Ok(GeneActivity::Inactive),
                    GeneActivity::Inactive => Ok(GeneActivity::Active),
                },
            },
            Gpr::GeneNode(gene) => {
                activity(gene).ok_or_else(|| GprError::GeneNotFound(gene.clone()))
            }
        }
    }
}

/// Possible operations on genes
#[derive(Clone, Debug, PartialEq)]
pub enum GprOperation {
    Or { left: Box<Gpr>, right: Box<Gpr> },
    And { left: Box<Gpr>, right: Box<Gpr> },
    Not { val: Box<Gpr> },
}

/// Types of Allowed GPR Operations
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GprOperatorType {
    /// Or, results in active if either left or right are active
    Or,
    /// And, results in active if both left and right are active
    And,
    /// Not, results in active if val is inactive
    Not,
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum GprError {
    #[error("Invalid Binary Operation")]
    InvalidBinaryOp,
    #[error("Invalid Unary Operation")]
    InvalidUnaryOp,
    #[error("Gene `{0}` in GPR is not present in the model")]
    GeneNotFound(String),
}

// Model associated functions for working with GPRs
impl Model {
    /// Evaluate whether a GPR evaluates to Active or Inactive
    pub fn eval_gpr(&self, gpr: &Gpr) -> Result<GeneActivity, GprError> {
        gpr.eval_with(&|gene: &str| self.genes.get(gene).map(|g| g.activity))
    }

    /// Evaluate a GPR as if the `knocked_out` genes were inactive
    pub fn eval_gpr_with_knockouts(
        &self,
        gpr: &Gpr,
        knocked_out: &HashSet<&str>,
    ) -> Result<GeneActivity, GprError> {
        gpr.eval_with(&|gene: &str| {
            self.genes.get(gene).map(|g| {
                if knocked_out.contains(gene) {
                    GeneActivity::Inactive
                } else {
                    g.activity
                }
            })
        })
    }

    /// Determine which reactions lose their activity when `genes` are deleted
    ///
    /// # Returns
    /// Ids of the reactions (in model order) whose rule evaluates to inactive. Reactions
    /// without a rule are never affected.
    pub fn deleted_genes_to_reactions<S: AsRef<str>>(
        &self,
        genes: &[S],
    ) -> Result<Vec<String>, GprError> {
        let mut knocked_out: HashSet<&str> = HashSet::new();
        for gene in genes {
            let gene = gene.as_ref();
            if !self.genes.contains_key(gene) {
                return Err(GprError::GeneNotFound(gene.to_string()));
            }
            knocked_out.insert(gene);
        }
        let mut deleted = Vec::new();
        for (id, reaction) in &self.reactions {
            if let Some(gpr) = &reaction.gpr {
                if self.eval_gpr_with_knockouts(gpr, &knocked_out)? == GeneActivity::Inactive {
                    deleted.push(id.clone());
                }
            }
        }
        Ok(deleted)
    }
}

// endregion GPR Functionality
