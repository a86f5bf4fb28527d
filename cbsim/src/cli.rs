//! Command line arguments
use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

use cbsim_core::configuration::Solver;
use cbsim_core::flux_analysis::deletion::KnockoutKind;
use cbsim_core::flux_analysis::SimulationMethod;
use cbsim_core::io::ModelFormat;

/// Constraint based simulation of metabolic models
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Model file, SBML, BioOpt or plaintext, recognized by its file name
    pub model: PathBuf,

    /// Read the model with this reader whatever the file name
    #[arg(short, long, value_enum)]
    pub format: Option<FormatArg>,

    /// Simulation method
    #[arg(short, long, value_enum, default_value_t = MethodArg::Fba)]
    pub method: MethodArg,

    /// Objective term replacing the model objective (FBA and pFBA), repeatable
    #[arg(long = "objective", value_name = "ID[=COEF]", value_parser = parse_objective_term)]
    pub objective: Vec<(String, f64)>,

    /// Minimize the objective instead of maximizing it (FBA and pFBA)
    #[arg(long)]
    pub minimize: bool,

    /// Environmental constraint, repeatable, `ID=VALUE` fixes the flux
    #[arg(
        short = 'c',
        long = "constraint",
        value_name = "ID=LB:UB",
        allow_hyphen_values = true,
        value_parser = parse_constraint
    )]
    pub constraints: Vec<(String, (f64, f64))>,

    /// Tab separated reference fluxes, the wild type pFBA solution by default
    #[arg(short, long, value_name = "FILE")]
    pub reference: Option<PathBuf>,

    /// Delete elements of this kind, one knock-out per target
    #[arg(short, long, value_enum)]
    pub knockouts: Option<KnockoutArg>,

    /// Comma separated knock-out targets, all elements of the kind by default
    #[arg(short, long, value_delimiter = ',', requires = "knockouts")]
    pub targets: Vec<String>,

    /// File with one knock-out target per line
    #[arg(long, value_name = "FILE", requires = "knockouts")]
    pub targets_file: Option<PathBuf>,

    /// Delete all targets together in a single simulation
    #[arg(long, requires = "knockouts")]
    pub simultaneous: bool,

    /// Report the essential elements of the knock-out kind instead, tested one at a time
    /// with FBA on the model objective
    #[arg(
        long,
        requires = "knockouts",
        conflicts_with_all = [
            "simultaneous",
            "targets",
            "targets_file",
            "method",
            "reference",
            "fluxes",
        ]
    )]
    pub essential: bool,

    /// Fraction of the wild type objective below which a deletion is lethal
    #[arg(long, value_name = "FRAC", default_value_t = 0.01)]
    pub min_growth: f64,

    /// Add one column per reaction to the knock-out table
    #[arg(long)]
    pub fluxes: bool,

    /// Append the shadow price of each metabolite and the reduced cost of each reaction
    #[arg(long, conflicts_with = "knockouts")]
    pub duals: bool,

    /// Relative tolerance of ROOM
    #[arg(long, default_value_t = 0.03)]
    pub delta: f64,

    /// Absolute tolerance of ROOM
    #[arg(long, default_value_t = 0.001)]
    pub epsilon: f64,

    /// Preferred solver
    #[arg(long, value_enum)]
    pub solver: Option<SolverArg>,

    /// Solver tolerance, smaller values are printed as zero
    #[arg(long, value_name = "TOL")]
    pub tolerance: Option<f64>,

    /// Number of decimals in the output
    #[arg(long, value_name = "N", default_value_t = 6)]
    pub precision: usize,

    /// Write the table to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Log more, repeat for more detail
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Log level selected by the verbosity flags
    pub fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            return log::LevelFilter::Error;
        }
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatArg {
    Sbml,
    Bioopt,
    Plaintext,
}

impl From<FormatArg> for ModelFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Sbml => ModelFormat::Sbml,
            FormatArg::Bioopt => ModelFormat::BioOpt,
            FormatArg::Plaintext => ModelFormat::Plaintext,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MethodArg {
    Fba,
    Pfba,
    Moma,
    Lmoma,
    Room,
}

impl From<MethodArg> for SimulationMethod {
    fn from(value: MethodArg) -> Self {
        match value {
            MethodArg::Fba => SimulationMethod::Fba,
            MethodArg::Pfba => SimulationMethod::Pfba,
            MethodArg::Moma => SimulationMethod::Moma,
            MethodArg::Lmoma => SimulationMethod::Lmoma,
            MethodArg::Room => SimulationMethod::Room,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum KnockoutArg {
    Reactions,
    Genes,
}

impl From<KnockoutArg> for KnockoutKind {
    fn from(value: KnockoutArg) -> Self {
        match value {
            KnockoutArg::Reactions => KnockoutKind::Reactions,
            KnockoutArg::Genes => KnockoutKind::Genes,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolverArg {
    Clarabel,
    Microlp,
}

impl From<SolverArg> for Solver {
    fn from(value: SolverArg) -> Self {
        match value {
            SolverArg::Clarabel => Solver::Clarabel,
            SolverArg::Microlp => Solver::MicroLp,
        }
    }
}

/// Parse `ID` or `ID=COEF`
fn parse_objective_term(arg: &str) -> Result<(String, f64), String> {
    let (id, coefficient) = match arg.split_once('=') {
        Some((id, coefficient)) => (
            id.trim(),
            coefficient
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("invalid objective coefficient in `{arg}`"))?,
        ),
        None => (arg.trim(), 1.),
    };
    if id.is_empty() {
        return Err(format!("missing reaction id in `{arg}`"));
    }
    Ok((id.to_string(), coefficient))
}

/// Parse `ID=LB:UB` or `ID=VALUE`, an empty bound is unbounded on that side
fn parse_constraint(arg: &str) -> Result<(String, (f64, f64)), String> {
    let (id, bounds) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected `ID=LB:UB` or `ID=VALUE`, found `{arg}`"))?;
    let id = id.trim();
    if id.is_empty() {
        return Err(format!("missing reaction id in `{arg}`"));
    }
    let parse_bound = |bound: &str, default: f64| -> Result<f64, String> {
        let bound = bound.trim();
        if bound.is_empty() {
            return Ok(default);
        }
        bound
            .parse::<f64>()
            .map_err(|_| format!("invalid bound `{bound}` in `{arg}`"))
    };
    let (lower, upper) = match bounds.split_once(':') {
        Some((lower, upper)) => (
            parse_bound(lower, f64::NEG_INFINITY)?,
            parse_bound(upper, f64::INFINITY)?,
        ),
        None => {
            let value = bounds
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("invalid flux value in `{arg}`"))?;
            (value, value)
        }
    };
    if lower > upper {
        return Err(format!("lower bound above upper bound in `{arg}`"));
    }
    Ok((id.to_string(), (lower, upper)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn objective_terms() {
        assert_eq!(parse_objective_term("R1"), Ok(("R1".to_string(), 1.)));
        assert_eq!(parse_objective_term("R1=-2.5"), Ok(("R1".to_string(), -2.5)));
        assert!(parse_objective_term("R1=x").is_err());
        assert!(parse_objective_term("=1").is_err());
    }

    #[test]
    fn constraints() {
        assert_eq!(
            parse_constraint("EX=-10:5"),
            Ok(("EX".to_string(), (-10., 5.)))
        );
        assert_eq!(parse_constraint("EX=3"), Ok(("EX".to_string(), (3., 3.))));
        assert_eq!(
            parse_constraint("EX=:5"),
            Ok(("EX".to_string(), (f64::NEG_INFINITY, 5.)))
        );
        assert!(parse_constraint("EX=5:1").is_err());
        assert!(parse_constraint("EX").is_err());
        assert!(parse_constraint("EX=a:b").is_err());
    }

    #[test]
    fn verbosity() {
        let cli = Cli::try_parse_from(["cbsim", "model.xml", "-vv"]).unwrap();
        assert_eq!(cli.log_level(), log::LevelFilter::Debug);
        let cli = Cli::try_parse_from(["cbsim", "model.xml", "-q"]).unwrap();
        assert_eq!(cli.log_level(), log::LevelFilter::Error);
        assert!(Cli::try_parse_from(["cbsim", "model.xml", "-q", "-v"]).is_err());
    }

    #[test]
    fn knockout_options_need_a_kind() {
        assert!(Cli::try_parse_from(["cbsim", "model.xml", "--essential"]).is_err());
        let cli = Cli::try_parse_from([
            "cbsim",
            "model.xml",
            "-k",
            "genes",
            "-t",
            "g1,g2",
            "-c",
            "R_EX_A=-5:0",
        ])
        .unwrap();
        assert_eq!(cli.knockouts, Some(KnockoutArg::Genes));
        assert_eq!(cli.targets, vec!["g1", "g2"]);
        assert_eq!(cli.constraints, vec![("R_EX_A".to_string(), (-5., 0.))]);
    }

    #[test]
    fn essentiality_takes_no_targets_or_method() {
        let base = ["cbsim", "model.xml", "-k", "genes", "--essential"];
        let with = |extra: &[&str]| {
            Cli::try_parse_from(base.iter().chain(extra.iter()).copied())
        };
        assert!(with(&[]).is_ok());
        assert!(with(&["--min-growth", "0.5"]).is_ok());
        assert!(with(&["-t", "g1"]).is_err());
        assert!(with(&["--targets-file", "targets.txt"]).is_err());
        assert!(with(&["-m", "moma"]).is_err());
        assert!(with(&["--simultaneous"]).is_err());
        assert!(with(&["--fluxes"]).is_err());
    }

    #[test]
    fn solver_options() {
        let cli = Cli::try_parse_from([
            "cbsim",
            "model.xml",
            "--solver",
            "microlp",
            "--tolerance",
            "1e-9",
            "--delta",
            "0.1",
            "--epsilon",
            "0.01",
        ])
        .unwrap();
        assert_eq!(cli.solver.map(Solver::from), Some(Solver::MicroLp));
        assert_eq!(cli.tolerance, Some(1e-9));
        assert_eq!(cli.delta, 0.1);
        assert_eq!(cli.epsilon, 0.01);
        assert!(Cli::try_parse_from(["cbsim", "model.xml", "--solver", "gurobi"]).is_err());
    }

    #[test]
    fn duals_only_for_single_simulations() {
        assert!(Cli::try_parse_from(["cbsim", "model.xml", "--duals"]).is_ok());
        assert!(
            Cli::try_parse_from(["cbsim", "model.xml", "--duals", "-k", "reactions"]).is_err()
        );
    }
}
