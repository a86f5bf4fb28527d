//! Implements a solver interface for microlp
use crate::optimize::constraint::Constraint;
use crate::optimize::objective::{ObjectiveSense, ObjectiveTerm};
use crate::optimize::problem::Problem;
use crate::optimize::solvers::{Solver, SolverError};
use crate::optimize::variable::VariableType;
use crate::optimize::{OptimizationStatus, ProblemSolution};
use indexmap::IndexMap;
use log::trace;
use microlp::{ComparisonOp, LinearExpr, OptimizationDirection};

const SOLVER_NAME: &str = "microlp";

/// Simplex solver with branch and bound, for linear and mixed integer linear problems
#[derive(Clone, Debug, Default)]
pub struct MicroLpSolver {}

impl MicroLpSolver {
    fn objective_coefficients(problem: &Problem) -> Result<Vec<f64>, SolverError> {
        let mut coefficients = vec![0f64; problem.num_variables()];
        for term in problem.objective().terms() {
            match term {
                ObjectiveTerm::Linear { var, coef } => {
                    let index = problem.variable_index(var).ok_or_else(|| {
                        SolverError::InvalidProblem {
                            solver: SOLVER_NAME,
                            reason: format!("unknown variable `{var}`"),
                        }
                    })?;
                    coefficients[index] += coef;
                }
                ObjectiveTerm::Quadratic { .. } => {
                    return Err(SolverError::InvalidProblem {
                        solver: SOLVER_NAME,
                        reason: "quadratic objective terms are not supported".to_string(),
                    })
                }
            }
        }
        Ok(coefficients)
    }
}

/// Integer bounds for microlp, which takes them as i32
fn integer_bounds(lower_bound: f64, upper_bound: f64) -> (i32, i32) {
    let clamp = |bound: f64, default: i32| {
        if bound.is_finite() {
            bound.clamp(i32::MIN as f64, i32::MAX as f64) as i32
        } else {
            default
        }
    };
    (
        clamp(lower_bound.ceil(), i32::MIN),
        clamp(upper_bound.floor(), i32::MAX),
    )
}

impl Solver for MicroLpSolver {
    fn name(&self) -> &'static str {
        SOLVER_NAME
    }

    fn quadratic_objective_capable(&self) -> bool {
        false
    }

    fn integer_variable_capable(&self) -> bool {
        true
    }

    fn solve(&self, problem: &Problem) -> Result<ProblemSolution, SolverError> {
        let direction = match problem.objective_sense() {
            ObjectiveSense::Minimize => OptimizationDirection::Minimize,
            ObjectiveSense::Maximize => OptimizationDirection::Maximize,
        };
        let coefficients = Self::objective_coefficients(problem)?;
        let mut lp = microlp::Problem::new(direction);

        let variables: Vec<microlp::Variable> = problem
            .variables()
            .map(|var| {
                let coef = coefficients[var.index];
                match var.variable_type {
                    VariableType::Continuous => {
                        lp.add_var(coef, (var.lower_bound, var.upper_bound))
                    }
                    VariableType::Integer | VariableType::Binary => {
                        lp.add_integer_var(coef, integer_bounds(var.lower_bound, var.upper_bound))
                    }
                }
            })
            .collect();

        for constraint in problem.constraints() {
            let mut expr = LinearExpr::empty();
            for term in constraint.get_terms() {
                let index = problem.variable_index(&term.variable).ok_or_else(|| {
                    SolverError::InvalidProblem {
                        solver: SOLVER_NAME,
                        reason: format!("unknown variable `{}`", term.variable),
                    }
                })?;
                expr.add(variables[index], term.coefficient);
            }
            match constraint {
                Constraint::Equality { equals, .. } => {
                    lp.add_constraint(expr, ComparisonOp::Eq, *equals);
                }
                Constraint::Inequality {
                    lower_bound,
                    upper_bound,
                    ..
                } => {
                    if lower_bound == upper_bound {
                        lp.add_constraint(expr, ComparisonOp::Eq, *upper_bound);
                        continue;
                    }
                    match (lower_bound.is_finite(), upper_bound.is_finite()) {
                        (true, true) => {
                            lp.add_constraint(expr.clone(), ComparisonOp::Ge, *lower_bound);
                            lp.add_constraint(expr, ComparisonOp::Le, *upper_bound);
                        }
                        (true, false) => {
                            lp.add_constraint(expr, ComparisonOp::Ge, *lower_bound);
                        }
                        (false, true) => {
                            lp.add_constraint(expr, ComparisonOp::Le, *upper_bound);
                        }
                        (false, false) => {}
                    }
                }
            }
        }
        trace!(
            "microlp problem with {} variables and {} constraints",
            problem.num_variables(),
            problem.num_constraints()
        );

        match lp.solve() {
            Ok(solution) => {
                let variable_values: IndexMap<String, f64> = problem
                    .variables()
                    .map(|var| (var.id.clone(), solution[variables[var.index]]))
                    .collect();
                Ok(ProblemSolution {
                    status: OptimizationStatus::Optimal,
                    objective_value: Some(solution.objective()),
                    variable_values: Some(variable_values),
                    dual_values: None,
                    reduced_costs: None,
                })
            }
            Err(microlp::Error::Infeasible) => {
                Ok(ProblemSolution::from_status(OptimizationStatus::Infeasible))
            }
            Err(microlp::Error::Unbounded) => {
                Ok(ProblemSolution::from_status(OptimizationStatus::Unbounded))
            }
            Err(err) => Err(SolverError::Backend {
                solver: SOLVER_NAME,
                reason: err.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_maximization() {
        // maximize x + y, x + 2y <= 4, 3x + y <= 6, x and y integer
        let mut problem = Problem::new_maximization();
        problem
            .add_new_variable("x", None, VariableType::Integer, 0., 10.)
            .unwrap();
        problem
            .add_new_variable("y", None, VariableType::Integer, 0., 10.)
            .unwrap();
        problem
            .add_new_inequality_constraint_by_id(
                "c1",
                &["x", "y"],
                &[1., 2.],
                f64::NEG_INFINITY,
                4.,
            )
            .unwrap();
        problem
            .add_new_inequality_constraint_by_id(
                "c2",
                &["x", "y"],
                &[3., 1.],
                f64::NEG_INFINITY,
                6.,
            )
            .unwrap();
        problem.add_new_linear_objective_term_by_id("x", 1.).unwrap();
        problem.add_new_linear_objective_term_by_id("y", 1.).unwrap();

        let solution = MicroLpSolver::default().solve(&problem).unwrap();
        assert_eq!(solution.status, OptimizationStatus::Optimal);
        assert!((solution.objective_value.unwrap() - 2.).abs() < 1e-6);
    }

    #[test]
    fn infeasible_problem() {
        let mut problem = Problem::new_minimization();
        problem
            .add_new_variable("x", None, VariableType::Continuous, 0., 1.)
            .unwrap();
        problem
            .add_new_inequality_constraint_by_id("c", &["x"], &[1.], 2., 3.)
            .unwrap();
        let solution = MicroLpSolver::default().solve(&problem).unwrap();
        assert_eq!(solution.status, OptimizationStatus::Infeasible);
    }

    #[test]
    fn integer_bounds_are_rounded_inwards() {
        assert_eq!(integer_bounds(0.5, 2.5), (1, 2));
        assert_eq!(
            integer_bounds(f64::NEG_INFINITY, f64::INFINITY),
            (i32::MIN, i32::MAX)
        );
    }
}
