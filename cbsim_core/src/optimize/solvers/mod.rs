//! Solver backends, and selection of a backend for a problem
use crate::configuration;
use crate::configuration::Solver as SolverChoice;
use crate::optimize::problem::{Problem, ProblemType};
use crate::optimize::ProblemSolution;
use log::debug;
use thiserror::Error;

pub mod clarabel;
#[cfg(feature = "microlp")]
pub mod microlp;

/// Interface implemented by every solver backend
pub trait Solver {
    /// Name of the backend, used in log messages
    fn name(&self) -> &'static str;

    /// Whether the backend can handle quadratic objective terms
    fn quadratic_objective_capable(&self) -> bool;

    /// Whether the backend can handle integer variables
    fn integer_variable_capable(&self) -> bool;

    /// Whether the backend can handle binary variables
    fn binary_variable_capable(&self) -> bool {
        self.integer_variable_capable()
    }

    /// Whether the backend can solve a problem of the given type
    fn supports(&self, problem_type: ProblemType) -> bool {
        match problem_type {
            ProblemType::LinearContinuous => true,
            ProblemType::QuadraticContinuous => self.quadratic_objective_capable(),
            ProblemType::LinearMixedInteger => self.integer_variable_capable(),
            ProblemType::QuadraticMixedInteger => {
                self.quadratic_objective_capable() && self.integer_variable_capable()
            }
        }
    }

    /// Solve the problem
    ///
    /// Infeasible or unbounded problems are not errors, they are reported through the
    /// status of the returned [`ProblemSolution`].
    fn solve(&self, problem: &Problem) -> Result<ProblemSolution, SolverError>;
}

/// Errors associated with solving a problem
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// No compiled solver can handle the problem
    #[error("No available solver can handle a {0:?} problem")]
    Unsupported(ProblemType),
    /// The problem uses a feature the chosen backend can't express
    #[error("{solver} can't solve this problem: {reason}")]
    InvalidProblem {
        solver: &'static str,
        reason: String,
    },
    /// The backend failed in an unexpected way
    #[error("{solver} failed: {reason}")]
    Backend {
        solver: &'static str,
        reason: String,
    },
}

/// Backends compiled into the crate, in fallback order
fn available_solvers() -> Vec<Box<dyn Solver>> {
    #[allow(unused_mut)]
    let mut solvers: Vec<Box<dyn Solver>> = vec![Box::new(clarabel::ClarabelSolver::default())];
    cfg_if::cfg_if! {
        if #[cfg(feature = "microlp")] {
            solvers.push(Box::new(microlp::MicroLpSolver::default()));
        }
    }
    solvers
}

/// Create the backend matching a configured solver choice, if it is compiled in
fn solver_for_choice(choice: SolverChoice) -> Option<Box<dyn Solver>> {
    match choice {
        SolverChoice::Clarabel => Some(Box::new(clarabel::ClarabelSolver::default())),
        SolverChoice::MicroLp => {
            cfg_if::cfg_if! {
                if #[cfg(feature = "microlp")] {
                    Some(Box::new(microlp::MicroLpSolver::default()))
                } else {
                    None
                }
            }
        }
    }
}

/// Pick the backend for a problem
///
/// The configured solver is used when it can handle the problem type, otherwise the
/// first compiled backend that can.
pub fn select_solver(problem_type: ProblemType) -> Result<Box<dyn Solver>, SolverError> {
    let choice = configuration::read().solver;
    if let Some(solver) = solver_for_choice(choice).filter(|s| s.supports(problem_type)) {
        return Ok(solver);
    }
    available_solvers()
        .into_iter()
        .find(|s| s.supports(problem_type))
        .ok_or(SolverError::Unsupported(problem_type))
}

/// Solve a problem with the backend chosen by [`select_solver`]
pub fn solve(problem: &Problem) -> Result<ProblemSolution, SolverError> {
    let solver = select_solver(problem.problem_type())?;
    debug!(
        "Solving {:?} problem with {} variables and {} constraints using {}",
        problem.problem_type(),
        problem.num_variables(),
        problem.num_constraints(),
        solver.name()
    );
    solver.solve(problem)
}
