//! Provides struct representing an optimization problem
use crate::optimize::constraint::Constraint;
use crate::optimize::objective::{Objective, ObjectiveSense, ObjectiveTerm};
use crate::optimize::variable::{Variable, VariableType};
use indexmap::IndexMap;
use thiserror::Error;

/// An optimization problem
///
/// Variables, constraints and objective terms refer to variables by id. Variables keep
/// their insertion order, which is also the column order handed to the solvers.
#[derive(Debug, Clone)]
pub struct Problem {
    /// Objective to optimize
    objective: Objective,
    /// Variables of the optimization problem
    variables: IndexMap<String, Variable>,
    /// Constraints of the optimization problem
    constraints: IndexMap<String, Constraint>,
    /// Type of problem
    problem_type: ProblemType,
}

impl Problem {
    // region Creation Functions
    /// Create a new optimization problem
    pub fn new(objective_sense: ObjectiveSense) -> Self {
        Self {
            objective: Objective::new(objective_sense),
            variables: IndexMap::new(),
            constraints: IndexMap::new(),
            problem_type: ProblemType::LinearContinuous,
        }
    }

    /// Create a new maximization problem
    pub fn new_maximization() -> Self {
        Self::new(ObjectiveSense::Maximize)
    }

    /// Create a new minimization problem
    pub fn new_minimization() -> Self {
        Self::new(ObjectiveSense::Minimize)
    }

    // endregion Creation Functions

    // region Accessors
    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn objective_sense(&self) -> ObjectiveSense {
        self.objective.sense()
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    pub fn get_variable(&self, id: &str) -> Option<&Variable> {
        self.variables.get(id)
    }

    /// Column index of a variable
    pub fn variable_index(&self, id: &str) -> Option<usize> {
        self.variables.get_index_of(id)
    }

    pub fn constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.values()
    }

    pub fn get_constraint(&self, id: &str) -> Option<&Constraint> {
        self.constraints.get(id)
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn problem_type(&self) -> ProblemType {
        self.problem_type
    }
    // endregion Accessors

    // region Update Objective Sense
    /// Update the objective sense of the problem
    pub fn update_objective_sense(&mut self, sense: ObjectiveSense) {
        self.objective.set_sense(sense);
    }
    // endregion Update Objective Sense

    // region Adding Variables
    /// Add a variable to the optimization problem
    pub fn add_variable(&mut self, mut variable: Variable) -> Result<(), ProblemError> {
        // Validate that the variable can in fact be added to the problem
        self.validate_variable(&variable)?;
        // Update the index of the variable to reflect the current variable count
        variable.index = self.variables.len();
        let variable_type = variable.variable_type;
        self.variables.insert(variable.id.clone(), variable);
        // Update the type of the model if needed
        match variable_type {
            VariableType::Continuous => {
                // This will not change the type
            }
            VariableType::Integer | VariableType::Binary => match self.problem_type {
                ProblemType::LinearContinuous => {
                    self.problem_type = ProblemType::LinearMixedInteger;
                }
                ProblemType::QuadraticContinuous => {
                    self.problem_type = ProblemType::QuadraticMixedInteger;
                }
                _ => {}
            },
        }
        Ok(())
    }

    /// Create a new variable and add it to the optimization problem
    pub fn add_new_variable(
        &mut self,
        id: &str,
        name: Option<&str>,
        variable_type: VariableType,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        let (lower_bound, upper_bound) = match variable_type {
            VariableType::Binary => (lower_bound.max(0.), upper_bound.min(1.)),
            _ => (lower_bound, upper_bound),
        };
        self.add_variable(Variable {
            id: id.to_string(),
            name: name.map(String::from),
            variable_type,
            lower_bound,
            upper_bound,
            index: 0,
        })
    }
    // endregion Adding Variables

    // region Adding Constraints
    /// Add a constraint to the problem
    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<(), ProblemError> {
        self.validate_constraint(&constraint)?;
        self.constraints
            .insert(constraint.get_id().to_string(), constraint);
        Ok(())
    }

    /// Create a new equality constraint using variable ids, and add it to the model
    pub fn add_new_equality_constraint_by_id<S: AsRef<str>>(
        &mut self,
        id: &str,
        variables: &[S],
        coefficients: &[f64],
        equals: f64,
    ) -> Result<(), ProblemError> {
        if variables.len() != coefficients.len() {
            return Err(ProblemError::MismatchedTerms);
        }
        self.add_constraint(Constraint::new_equality(
            id,
            variables,
            coefficients,
            equals,
        ))
    }

    /// Create a new inequality constraint using variable ids, and add it to the model
    pub fn add_new_inequality_constraint_by_id<S: AsRef<str>>(
        &mut self,
        id: &str,
        variables: &[S],
        coefficients: &[f64],
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        if variables.len() != coefficients.len() {
            return Err(ProblemError::MismatchedTerms);
        }
        self.add_constraint(Constraint::new_inequality(
            id,
            variables,
            coefficients,
            lower_bound,
            upper_bound,
        ))
    }

    // endregion Adding Constraints

    // region Adding Objective Terms
    /// Add a new term to the objective
    pub fn add_objective_term(
        &mut self,
        objective_term: ObjectiveTerm,
    ) -> Result<(), ProblemError> {
        self.validate_objective_term(&objective_term)?;
        if let ObjectiveTerm::Quadratic { .. } = &objective_term {
            match self.problem_type {
                ProblemType::LinearContinuous | ProblemType::QuadraticContinuous => {
                    self.problem_type = ProblemType::QuadraticContinuous;
                }
                ProblemType::LinearMixedInteger | ProblemType::QuadraticMixedInteger => {
                    self.problem_type = ProblemType::QuadraticMixedInteger;
                }
            }
        }
        self.objective.add_term(objective_term);
        Ok(())
    }

    /// Add a new linear term to the objective using the variable id
    pub fn add_new_linear_objective_term_by_id(
        &mut self,
        variable_id: &str,
        coefficient: f64,
    ) -> Result<(), ProblemError> {
        self.add_objective_term(ObjectiveTerm::new_linear(variable_id, coefficient))
    }

    /// Add a new quadratic term to the objective using the variable ids
    pub fn add_new_quadratic_objective_term_by_id(
        &mut self,
        variable1: &str,
        variable2: &str,
        coefficient: f64,
    ) -> Result<(), ProblemError> {
        self.add_objective_term(ObjectiveTerm::new_quadratic(
            variable1,
            variable2,
            coefficient,
        ))
    }

    // endregion Adding Objective Terms

    // region update variable bounds
    /// Update the bounds of a variable
    pub fn update_variable_bounds(
        &mut self,
        id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        if lower_bound > upper_bound {
            return Err(ProblemError::InvalidVariableBounds(id.to_string()));
        }
        match self.variables.get_mut(id) {
            Some(var) => {
                var.lower_bound = lower_bound;
                var.upper_bound = upper_bound;
            }
            None => return Err(ProblemError::NonExistentVariable(id.to_string())),
        };
        Ok(())
    }

    // endregion update variable bounds

    // region Remove Objective Terms
    /// Remove all terms from the objective
    pub fn remove_all_objective_terms(&mut self) {
        self.objective.remove_all_terms();
        self.fix_problem_type();
    }
    // endregion Remove Objective Terms

    // region Validation Functions
    /// Check that a variable to be added is valid to add to this problem
    fn validate_variable(&self, variable: &Variable) -> Result<(), ProblemError> {
        // Check if there is already a variable with this id
        if self.variables.contains_key(&variable.id) {
            return Err(ProblemError::VariableIdAlreadyExists(variable.id.clone()));
        };
        // Check if the variable bounds are valid
        if variable.lower_bound > variable.upper_bound
            || variable.lower_bound.is_nan()
            || variable.upper_bound.is_nan()
        {
            return Err(ProblemError::InvalidVariableBounds(variable.id.clone()));
        }
        Ok(())
    }

    /// Check that a constraint to be added is valid to add to this Problem
    fn validate_constraint(&self, constraint: &Constraint) -> Result<(), ProblemError> {
        if self.constraints.contains_key(constraint.get_id()) {
            return Err(ProblemError::ConstraintAlreadyExists(
                constraint.get_id().to_string(),
            ));
        }
        // Check that for inequality constraints the bounds make sense
        if let Constraint::Inequality {
            lower_bound,
            upper_bound,
            ..
        } = constraint
        {
            if lower_bound > upper_bound {
                return Err(ProblemError::InvalidConstraintBounds(
                    constraint.get_id().to_string(),
                ));
            }
        }
        // Check that the variables in this constraint are in the model
        if let Some(term) = constraint
            .get_terms()
            .iter()
            .find(|term| !self.variables.contains_key(&term.variable))
        {
            return Err(ProblemError::NonExistentVariablesInConstraint(
                term.variable.clone(),
            ));
        }
        // All checks have passed
        Ok(())
    }

    /// Check that an objective term to be added is valid to add to this Problem
    fn validate_objective_term(&self, objective_term: &ObjectiveTerm) -> Result<(), ProblemError> {
        let missing = match objective_term {
            ObjectiveTerm::Quadratic { var1, var2, .. } => [Some(var1), Some(var2)]
                .into_iter()
                .flatten()
                .find(|v| !self.variables.contains_key(*v)),
            ObjectiveTerm::Linear { var, .. } => {
                Some(var).filter(|v| !self.variables.contains_key(*v))
            }
        };
        match missing {
            Some(var) => Err(ProblemError::NonExistentVariablesInObjective(var.clone())),
            None => Ok(()),
        }
    }

    // endregion Validation Functions

    // region Fix Problem Functions
    fn fix_problem_type(&mut self) {
        let integer_variables = self.has_integer_variables();
        let quadratic_objective = self.has_quadratic_objective_terms();
        self.problem_type = match (integer_variables, quadratic_objective) {
            (true, true) => ProblemType::QuadraticMixedInteger,
            (false, true) => ProblemType::QuadraticContinuous,
            (true, false) => ProblemType::LinearMixedInteger,
            (false, false) => ProblemType::LinearContinuous,
        }
    }

    // endregion Fix Problem Functions

    // region Check Problem
    pub fn has_integer_variables(&self) -> bool {
        self.variables
            .values()
            .any(|var| var.variable_type != VariableType::Continuous)
    }

    pub fn has_quadratic_objective_terms(&self) -> bool {
        self.objective.contains_quadratic()
    }

    // endregion Check Problem
}

/// Types of optimization problems
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProblemType {
    /// Problem with linear objectives and constraints, and continuous variables
    LinearContinuous,
    /// Problem with quadratic objective, linear constraints, and continuous variables
    QuadraticContinuous,
    /// Problem with linear objective and constraints, with integer and continuous variables
    LinearMixedInteger,
    /// Problem with a quadratic objective function, and some integer variables
    ///
    /// # Note:
    /// This problem type is not currently supported by any of the solvers
    QuadraticMixedInteger,
}

/// Errors associated with the Problem
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProblemError {
    /// Error when trying to add a variable with the same id as an existing variable
    #[error("Tried to add variable `{0}` with the same id as an existing variable")]
    VariableIdAlreadyExists(String),
    /// Error when trying to add variable with invalid bounds
    #[error("Tried to give variable `{0}` a lower_bound > upper_bound")]
    InvalidVariableBounds(String),
    /// Error when trying to add a constraint with the same id as an existing constraint
    #[error("Tried to add constraint `{0}` with the same id as an existing constraint")]
    ConstraintAlreadyExists(String),
    /// Error when trying to add a constraint with invalid bounds
    #[error("Tried to add inequality constraint `{0}` with lower_bound > upper_bound")]
    InvalidConstraintBounds(String),
    /// Error when trying to add a constraint that contains variables not in the model
    #[error("Tried to add a constraint with variable `{0}` not in the problem")]
    NonExistentVariablesInConstraint(String),
    /// Error when trying to add an objective term which includes variables not in the model
    #[error("Tried adding an objective term with variable `{0}` not in the problem")]
    NonExistentVariablesInObjective(String),
    /// Error when trying to perform an update or drop on a variable that doesn't exist
    #[error("Tried to access variable `{0}` which doesn't exist")]
    NonExistentVariable(String),
    /// Error when the number of variables and coefficients differ
    #[error("Number of variables and coefficients differ")]
    MismatchedTerms,
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn new_problem() {
        // Check that the specific creation functions work
        let max_problem = Problem::new_maximization();
        assert_eq!(max_problem.objective.sense, ObjectiveSense::Maximize);

        let min_problem = Problem::new_minimization();
        assert_eq!(min_problem.objective.sense, ObjectiveSense::Minimize);
    }

    #[test]
    fn update_objective_sense() {
        let mut problem = Problem::new(ObjectiveSense::Maximize);
        problem.update_objective_sense(ObjectiveSense::Minimize);
        assert_eq!(problem.objective.sense, ObjectiveSense::Minimize);
        problem.update_objective_sense(ObjectiveSense::Maximize);
        assert_eq!(problem.objective.sense, ObjectiveSense::Maximize);
    }

    #[test]
    fn add_variables() {
        let mut problem = Problem::new(ObjectiveSense::Maximize);

        // Add a single variable
        problem
            .add_new_variable("x", None, VariableType::Continuous, 64., 100.)
            .unwrap();
        // Check that the variable is in fact added
        if let Some(var) = problem.variables.get("x") {
            assert_eq!(var.variable_type, VariableType::Continuous);
            assert_eq!(var.index, 0);
            assert!(
                (var.lower_bound - 64.0).abs() < 1e-25,
                "Variable added with incorrect lower bound"
            );
            assert!(
                (var.upper_bound - 100.0).abs() < 1e-25,
                "Variable added with incorrect upper bound"
            );
        } else {
            panic!("Variable not added to model")
        }
        // Check that the problem has the correct type
        assert_eq!(problem.problem_type, ProblemType::LinearContinuous);

        // Add another variable, this time an integer variable
        problem
            .add_new_variable("y", None, VariableType::Integer, 64., 100.)
            .unwrap();
        assert_eq!(problem.variables.get("y").unwrap().index, 1);
        // Check that the problem has updated its type
        assert_eq!(problem.problem_type, ProblemType::LinearMixedInteger);
    }

    #[test]
    fn add_bad_variable() {
        let mut problem = Problem::new(ObjectiveSense::Maximize);

        // Add a variable with bad bounds
        let res = problem.add_new_variable("x", None, VariableType::Continuous, 100., 64.);
        assert_eq!(res, Err(ProblemError::InvalidVariableBounds("x".to_string())));

        problem
            .add_new_variable("x", None, VariableType::Continuous, 0., 64.)
            .unwrap();
        let res = problem.add_new_variable("x", None, VariableType::Continuous, 0., 64.);
        assert_eq!(
            res,
            Err(ProblemError::VariableIdAlreadyExists("x".to_string()))
        );
    }

    #[test]
    fn add_constraint() {
        let mut problem = Problem::new(ObjectiveSense::Maximize);

        // Add some variables
        problem
            .add_new_variable("x", None, VariableType::Continuous, 64., 100.)
            .unwrap();
        problem
            .add_new_variable("y", None, VariableType::Continuous, 64., 100.)
            .unwrap();

        // Add an equality constraint
        problem
            .add_new_equality_constraint_by_id("test_constraint", &["x", "y"], &[2., 3.], 200.)
            .unwrap();

        // Check that the constraint was correctly added
        match problem.constraints.get("test_constraint").unwrap() {
            Constraint::Equality { equals, .. } => {
                assert!((equals - 200.).abs() < 1e-25)
            }
            Constraint::Inequality { .. } => panic!("Incorrect constraint type added"),
        }

        // Add an inequality constraint
        problem
            .add_new_inequality_constraint_by_id(
                "test_inequality",
                &["x", "y"],
                &[2., 3.],
                100.,
                200.,
            )
            .unwrap();

        // Check that the constraint was correctly added
        match problem.constraints.get("test_inequality").unwrap() {
            Constraint::Inequality {
                lower_bound,
                upper_bound,
                ..
            } => {
                assert!((lower_bound - 100.).abs() < 1e-25);
                assert!((upper_bound - 200.).abs() < 1e-25);
            }
            Constraint::Equality { .. } => panic!("Incorrect constraint type added"),
        }
        assert_eq!(problem.num_constraints(), 2);
    }

    #[test]
    fn add_bad_constraint() {
        let mut problem = Problem::new(ObjectiveSense::Maximize);

        problem
            .add_new_variable("x", None, VariableType::Continuous, 64., 100.)
            .unwrap();
        problem
            .add_new_variable("y", None, VariableType::Continuous, 64., 100.)
            .unwrap();

        let res = problem.add_new_inequality_constraint_by_id(
            "bad_constraint",
            &["x", "y"],
            &[2., 3.],
            200.,
            100.,
        );
        assert_eq!(
            res,
            Err(ProblemError::InvalidConstraintBounds(
                "bad_constraint".to_string()
            ))
        );

        let res = problem.add_new_equality_constraint_by_id("missing", &["x", "z"], &[1., 1.], 0.);
        assert_eq!(
            res,
            Err(ProblemError::NonExistentVariablesInConstraint(
                "z".to_string()
            ))
        );
    }

    #[test]
    fn objective_terms_update_type() {
        let mut problem = Problem::new_minimization();
        problem
            .add_new_variable("x", None, VariableType::Continuous, 0., 1.)
            .unwrap();
        problem
            .add_new_quadratic_objective_term_by_id("x", "x", 1.)
            .unwrap();
        assert_eq!(problem.problem_type(), ProblemType::QuadraticContinuous);
        assert!(problem
            .add_new_linear_objective_term_by_id("nope", 1.)
            .is_err());
        problem.remove_all_objective_terms();
        assert_eq!(problem.problem_type(), ProblemType::LinearContinuous);
    }

    #[test]
    fn variable_bounds_can_be_updated() {
        let mut problem = Problem::new_maximization();
        problem
            .add_new_variable("a", None, VariableType::Continuous, -1., 1.)
            .unwrap();
        problem.update_variable_bounds("a", 0., 0.).unwrap();
        let a = problem.get_variable("a").unwrap();
        assert_eq!((a.lower_bound, a.upper_bound), (0., 0.));
        assert_eq!(
            problem.update_variable_bounds("a", 2., 1.),
            Err(ProblemError::InvalidVariableBounds("a".to_string()))
        );
        assert_eq!(
            problem.update_variable_bounds("b", 0., 1.),
            Err(ProblemError::NonExistentVariable("b".to_string()))
        );
    }
}
