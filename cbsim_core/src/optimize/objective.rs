//! Provides struct for representing an optimization problem's objective

/// Represents the Objective of an optimization problem
#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    /// Terms included in the objective (See [`ObjectiveTerm`])
    pub(crate) terms: Vec<ObjectiveTerm>,
    /// Sense of the objective (maximize, or minimize), see [`ObjectiveSense`]
    pub(crate) sense: ObjectiveSense,
}

impl Objective {
    /// Create a new empty objective, with a given sense
    pub fn new(sense: ObjectiveSense) -> Self {
        Self {
            terms: Vec::new(),
            sense,
        }
    }

    /// Create a new empty maximization objective
    pub fn new_maximize() -> Self {
        Self::new(ObjectiveSense::Maximize)
    }

    /// Create a new empty minimization objective
    pub fn new_minimize() -> Self {
        Self::new(ObjectiveSense::Minimize)
    }

    /// Change the sense of the objective
    pub fn set_sense(&mut self, sense: ObjectiveSense) {
        self.sense = sense;
    }

    /// Sense of the objective
    pub fn sense(&self) -> ObjectiveSense {
        self.sense
    }

    /// Terms of the objective
    pub fn terms(&self) -> &[ObjectiveTerm] {
        &self.terms
    }

    /// Add a new term to the objective
    pub fn add_term(&mut self, term: ObjectiveTerm) {
        self.terms.push(term);
    }

    /// Remove all the terms, keeping the sense
    pub fn remove_all_terms(&mut self) {
        self.terms.clear();
    }

    /// Whether any term is quadratic
    pub fn contains_quadratic(&self) -> bool {
        self.terms
            .iter()
            .any(|term| matches!(term, ObjectiveTerm::Quadratic { .. }))
    }

    /// Evaluate the objective given a lookup of variable values
    pub fn evaluate<F>(&self, value: F) -> f64
    where
        F: Fn(&str) -> f64,
    {
        self.terms
            .iter()
            .map(|term| match term {
                ObjectiveTerm::Linear { var, coef } => coef * value(var.as_str()),
                ObjectiveTerm::Quadratic { var1, var2, coef } => {
                    coef * value(var1.as_str()) * value(var2.as_str())
                }
            })
            .sum()
    }
}

/// Represents the sense of the objective, whether it should be maximized or minimized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveSense {
    /// The objective should be minimized
    Minimize,
    /// The objective should be maximized
    Maximize,
}

// region Objective Terms
/// A term in the objective
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectiveTerm {
    /// A quadratic term in the objective, `coef * var1 * var2`
    Quadratic {
        /// Id of the first variable in the objective term
        var1: String,
        /// Id of the second variable in the objective term
        var2: String,
        /// Coefficient for quadratic term
        coef: f64,
    },
    /// A linear term in the objective, `coef * var`
    Linear {
        /// Id of the variable in objective term
        var: String,
        /// Coefficient for linear term
        coef: f64,
    },
}

impl ObjectiveTerm {
    /// Create a new quadratic objective term
    pub fn new_quadratic(var1: &str, var2: &str, coef: f64) -> Self {
        ObjectiveTerm::Quadratic {
            var1: var1.to_string(),
            var2: var2.to_string(),
            coef,
        }
    }

    /// Create a new linear objective term
    pub fn new_linear(var: &str, coef: f64) -> Self {
        ObjectiveTerm::Linear {
            var: var.to_string(),
            coef,
        }
    }
}

// endregion Objective Terms
