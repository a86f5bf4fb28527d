//! Implements a solver interface for Clarabel
//!
//! Clarabel solves problems of the form
//!
//! ```text
//! minimize    1/2 x'Px + q'x
//! subject to  Ax + s = b,  s in K
//! ```
//!
//! Here K is a product of a zero cone (equality rows) followed by a nonnegative cone
//! (inequality rows, including variable bounds).
use crate::optimize::constraint::Constraint;
use crate::optimize::objective::{ObjectiveSense, ObjectiveTerm};
use crate::optimize::problem::Problem;
use crate::optimize::solvers::{Solver, SolverError};
use crate::optimize::{OptimizationStatus, ProblemSolution};
use clarabel::algebra::CscMatrix;
use clarabel::solver::{
    DefaultSettings, DefaultSolver, IPSolver, SolverStatus, SupportedConeT,
};
use indexmap::IndexMap;
use log::trace;
use nalgebra_sparse::{CooMatrix, CscMatrix as NalgebraCsc};

const SOLVER_NAME: &str = "clarabel";

/// Interior point solver for linear and convex quadratic problems
#[derive(Clone, Debug, Default)]
pub struct ClarabelSolver {
    /// Print Clarabel's iteration log
    pub verbose: bool,
}

/// A single row of the constraint matrix
struct Row {
    terms: Vec<(usize, f64)>,
    rhs: f64,
}

/// Position of a row within its cone
#[derive(Clone, Copy)]
enum RowRef {
    Zero(usize),
    Nonnegative(usize),
}

/// Constraint rows split by cone, along with the equality constraint each zero row came from
/// and the bound rows of each variable
#[derive(Default)]
struct Rows {
    zero: Vec<Row>,
    zero_ids: Vec<Option<String>>,
    nonnegative: Vec<Row>,
    /// (variable index, row, sign of the variable in the row)
    bounds: Vec<(usize, RowRef, f64)>,
}

impl Rows {
    fn push_equality(&mut self, id: Option<&str>, terms: Vec<(usize, f64)>, rhs: f64) -> RowRef {
        self.zero.push(Row { terms, rhs });
        self.zero_ids.push(id.map(String::from));
        RowRef::Zero(self.zero.len() - 1)
    }

    fn push_nonnegative(&mut self, terms: Vec<(usize, f64)>, rhs: f64) -> RowRef {
        self.nonnegative.push(Row { terms, rhs });
        RowRef::Nonnegative(self.nonnegative.len() - 1)
    }

    /// Add the rows for `lower <= terms <= upper`, skipping infinite sides
    ///
    /// Returns the rows added, with the sign the terms were given
    fn push_range(
        &mut self,
        id: Option<&str>,
        terms: Vec<(usize, f64)>,
        lower: f64,
        upper: f64,
    ) -> Vec<(RowRef, f64)> {
        if lower == upper && upper.is_finite() {
            return vec![(self.push_equality(id, terms, upper), 1.)];
        }
        let mut added = Vec::with_capacity(2);
        if upper.is_finite() {
            added.push((self.push_nonnegative(terms.clone(), upper), 1.));
        }
        if lower.is_finite() {
            let negated = terms.iter().map(|(col, coef)| (*col, -coef)).collect();
            added.push((self.push_nonnegative(negated, -lower), -1.));
        }
        added
    }

    /// Index of a row in the stacked constraint matrix
    fn index(&self, row: RowRef) -> usize {
        match row {
            RowRef::Zero(index) => index,
            RowRef::Nonnegative(index) => self.zero.len() + index,
        }
    }
}

impl ClarabelSolver {
    fn check_problem(&self, problem: &Problem) -> Result<(), SolverError> {
        if problem.has_integer_variables() {
            return Err(SolverError::InvalidProblem {
                solver: SOLVER_NAME,
                reason: "integer and binary variables are not supported".to_string(),
            });
        }
        if problem.has_quadratic_objective_terms()
            && problem.objective_sense() == ObjectiveSense::Maximize
        {
            return Err(SolverError::InvalidProblem {
                solver: SOLVER_NAME,
                reason: "quadratic objectives must be minimized".to_string(),
            });
        }
        Ok(())
    }

    fn column(problem: &Problem, id: &str) -> Result<usize, SolverError> {
        problem
            .variable_index(id)
            .ok_or_else(|| SolverError::InvalidProblem {
                solver: SOLVER_NAME,
                reason: format!("unknown variable `{id}`"),
            })
    }

    /// Build P (upper triangle) and q
    fn objective_matrices(
        problem: &Problem,
    ) -> Result<(CscMatrix<f64>, Vec<f64>), SolverError> {
        let n = problem.num_variables();
        let sign = match problem.objective_sense() {
            ObjectiveSense::Minimize => 1.,
            ObjectiveSense::Maximize => -1.,
        };
        let mut q = vec![0f64; n];
        let mut p = CooMatrix::new(n, n);
        for term in problem.objective().terms() {
            match term {
                ObjectiveTerm::Linear { var, coef } => {
                    q[Self::column(problem, var)?] += sign * coef;
                }
                ObjectiveTerm::Quadratic { var1, var2, coef } => {
                    let i = Self::column(problem, var1)?;
                    let j = Self::column(problem, var2)?;
                    if i == j {
                        p.push(i, i, 2. * coef);
                    } else {
                        p.push(i.min(j), i.max(j), *coef);
                    }
                }
            }
        }
        Ok((to_clarabel_csc(&p), q))
    }

    /// Collect the constraint rows, variable bounds included
    fn constraint_rows(problem: &Problem) -> Result<Rows, SolverError> {
        let mut rows = Rows::default();
        for constraint in problem.constraints() {
            let terms = constraint
                .get_terms()
                .iter()
                .map(|t| Ok((Self::column(problem, &t.variable)?, t.coefficient)))
                .collect::<Result<Vec<_>, SolverError>>()?;
            match constraint {
                Constraint::Equality { id, equals, .. } => {
                    rows.push_equality(Some(id), terms, *equals);
                }
                Constraint::Inequality {
                    id,
                    lower_bound,
                    upper_bound,
                    ..
                } => {
                    rows.push_range(Some(id), terms, *lower_bound, *upper_bound);
                }
            }
        }
        for variable in problem.variables() {
            let added = rows.push_range(
                None,
                vec![(variable.index, 1.)],
                variable.lower_bound,
                variable.upper_bound,
            );
            rows.bounds.extend(
                added
                    .into_iter()
                    .map(|(row, sign)| (variable.index, row, sign)),
            );
        }
        Ok(rows)
    }
}

/// Convert a COO matrix into Clarabel's CSC format, summing duplicate entries
fn to_clarabel_csc(coo: &CooMatrix<f64>) -> CscMatrix<f64> {
    let csc = NalgebraCsc::from(coo);
    CscMatrix::new(
        csc.nrows(),
        csc.ncols(),
        csc.col_offsets().to_vec(),
        csc.row_indices().to_vec(),
        csc.values().to_vec(),
    )
}

fn convert_status(status: &SolverStatus) -> OptimizationStatus {
    match status {
        SolverStatus::Solved => OptimizationStatus::Optimal,
        SolverStatus::AlmostSolved => OptimizationStatus::AlmostOptimal,
        SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
            OptimizationStatus::Infeasible
        }
        SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
            OptimizationStatus::Unbounded
        }
        SolverStatus::MaxIterations
        | SolverStatus::MaxTime
        | SolverStatus::InsufficientProgress => OptimizationStatus::SolverHalted,
        SolverStatus::NumericalError => OptimizationStatus::NumericalError,
        _ => OptimizationStatus::Unoptimized,
    }
}

impl Solver for ClarabelSolver {
    fn name(&self) -> &'static str {
        SOLVER_NAME
    }

    fn quadratic_objective_capable(&self) -> bool {
        true
    }

    fn integer_variable_capable(&self) -> bool {
        false
    }

    fn solve(&self, problem: &Problem) -> Result<ProblemSolution, SolverError> {
        self.check_problem(problem)?;
        let n = problem.num_variables();
        let (p, q) = Self::objective_matrices(problem)?;
        let rows = Self::constraint_rows(problem)?;
        let num_zero = rows.zero.len();
        let num_nonneg = rows.nonnegative.len();

        let mut a = CooMatrix::new(num_zero + num_nonneg, n);
        let mut b = Vec::with_capacity(num_zero + num_nonneg);
        for (row_index, row) in rows.zero.iter().chain(rows.nonnegative.iter()).enumerate() {
            for (col, coef) in &row.terms {
                if *coef != 0f64 {
                    a.push(row_index, *col, *coef);
                }
            }
            b.push(row.rhs);
        }
        let a = to_clarabel_csc(&a);

        let mut cones = Vec::new();
        if num_zero > 0 {
            cones.push(SupportedConeT::ZeroConeT(num_zero));
        }
        if num_nonneg > 0 {
            cones.push(SupportedConeT::NonnegativeConeT(num_nonneg));
        }
        trace!(
            "Clarabel problem with {} variables, {} equality rows, {} inequality rows",
            n,
            num_zero,
            num_nonneg
        );

        let mut settings = DefaultSettings::<f64>::default();
        settings.verbose = self.verbose;
        let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, settings);
        solver.solve();

        let status = convert_status(&solver.solution.status);
        if !status.is_optimal() {
            return Ok(ProblemSolution::from_status(status));
        }

        let variable_values: IndexMap<String, f64> = problem
            .variables()
            .map(|var| (var.id.clone(), solver.solution.x[var.index]))
            .collect();
        let objective_value = problem
            .objective()
            .evaluate(|id| variable_values.get(id).copied().unwrap_or(0.));
        // Clarabel's duals belong to the minimization, flip them back for maximization
        let dual_sign = match problem.objective_sense() {
            ObjectiveSense::Minimize => -1.,
            ObjectiveSense::Maximize => 1.,
        };
        let dual_values: IndexMap<String, f64> = rows
            .zero_ids
            .iter()
            .enumerate()
            .filter_map(|(row, id)| {
                id.as_ref()
                    .map(|id| (id.clone(), dual_sign * solver.solution.z[row]))
            })
            .collect();

        // The multipliers of a variable's bound rows are its reduced cost
        let mut costs = vec![0f64; n];
        for (column, row, sign) in &rows.bounds {
            costs[*column] += dual_sign * sign * solver.solution.z[rows.index(*row)];
        }
        let reduced_costs: IndexMap<String, f64> = problem
            .variables()
            .map(|var| (var.id.clone(), costs[var.index]))
            .collect();

        Ok(ProblemSolution {
            status,
            objective_value: Some(objective_value),
            variable_values: Some(variable_values),
            dual_values: Some(dual_values),
            reduced_costs: Some(reduced_costs),
        })
    }
}
