//! Drives a simulation from parsed arguments
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};

use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use log::{debug, info, warn};

use cbsim_core::configuration;
use cbsim_core::flux_analysis::deletion::{knockout_constraints, KnockoutKind};
use cbsim_core::flux_analysis::essentiality::essentiality;
use cbsim_core::flux_analysis::{
    fba, pfba, room, simulate, wild_type_reference, FluxSolution, SimulationError,
    SimulationMethod,
};
use cbsim_core::io::reference::read_fluxes;
use cbsim_core::io::{read_model, read_model_with_format};
use cbsim_core::metabolic_model::model::{Constraints, Model};

use crate::cli::Cli;
use crate::output::TableWriter;

/// Run the command, writing the table to the output file or stdout
pub fn execute(cli: &Cli) -> Result<()> {
    match &cli.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Unable to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            run(cli, &mut writer)?;
            writer.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            run(cli, &mut writer)?;
        }
    }
    Ok(())
}

/// Run the command, writing the table to `writer`
pub fn run(cli: &Cli, writer: &mut dyn Write) -> Result<()> {
    configure(cli);
    let model = load_model(cli)?;
    let constraints = build_constraints(cli, &model)?;
    let objective = build_objective(cli, &model)?;
    let method = SimulationMethod::from(cli.method);
    let table = TableWriter::new(cli.precision, configuration::read().tolerance);

    let Some(kind) = cli.knockouts.map(KnockoutKind::from) else {
        let reference = load_reference(cli, &model, method, &constraints)?;
        let solution = run_method(
            cli,
            &model,
            method,
            objective.as_ref(),
            reference.as_ref(),
            &constraints,
        )?;
        info!("{} finished with status {}", method, solution.status);
        table.write_single(writer, method, &solution)?;
        if cli.duals {
            if solution.is_optimal()
                && solution.shadow_prices.is_none()
                && solution.reduced_costs.is_none()
            {
                warn!("The solver reported no dual values");
            }
            table.write_duals(writer, &solution)?;
        }
        return Ok(());
    };

    if cli.essential {
        let essential = essentiality(&model, kind, cli.min_growth, &constraints)?;
        table.write_essential(writer, kind, &essential)?;
        return Ok(());
    }

    let targets = collect_targets(cli, &model, kind)?;
    if targets.is_empty() {
        bail!("Model {} has no {} to knock out", cli.model.display(), kind);
    }
    let sets: Vec<Vec<String>> = if cli.simultaneous {
        vec![targets]
    } else {
        targets.into_iter().map(|target| vec![target]).collect()
    };
    let reference = load_reference(cli, &model, method, &constraints)?;
    let mut rows = Vec::with_capacity(sets.len());
    for set in &sets {
        let label = set.join("+");
        debug!("Knocking out {}", label);
        let knocked_out = knockout_constraints(&model, kind, set.as_slice(), &constraints)?;
        let solution = run_method(
            cli,
            &model,
            method,
            objective.as_ref(),
            reference.as_ref(),
            &knocked_out,
        )?;
        rows.push((label, solution));
    }
    info!("Simulated {} knock-outs", rows.len());
    let reactions: Option<Vec<String>> = cli
        .fluxes
        .then(|| model.reactions.keys().cloned().collect());
    table.write_sweep(writer, &rows, reactions.as_deref())?;
    Ok(())
}

/// Write the command line overrides into the process wide configuration
fn configure(cli: &Cli) {
    let mut config = configuration::write();
    if let Some(solver) = cli.solver {
        config.solver = solver.into();
    }
    if let Some(tolerance) = cli.tolerance {
        config.tolerance = tolerance;
    }
}

fn load_model(cli: &Cli) -> Result<Model> {
    let model = match cli.format {
        Some(format) => read_model_with_format(&cli.model, format.into()),
        None => read_model(&cli.model),
    };
    model.with_context(|| format!("Unable to read model {}", cli.model.display()))
}

fn build_constraints(cli: &Cli, model: &Model) -> Result<Constraints> {
    let mut constraints = Constraints::new();
    for (id, bounds) in &cli.constraints {
        if !model.reactions.contains_key(id) {
            bail!("Constraint on unknown reaction `{}`", id);
        }
        constraints.insert(id.clone(), *bounds);
    }
    Ok(constraints)
}

fn build_objective(cli: &Cli, model: &Model) -> Result<Option<IndexMap<String, f64>>> {
    if cli.objective.is_empty() {
        return Ok(None);
    }
    let mut objective = IndexMap::new();
    for (id, coefficient) in &cli.objective {
        if !model.reactions.contains_key(id) {
            bail!("Objective on unknown reaction `{}`", id);
        }
        *objective.entry(id.clone()).or_insert(0.) += coefficient;
    }
    Ok(Some(objective))
}

/// Reference fluxes for methods that need them, from a file or the wild type pFBA solution
fn load_reference(
    cli: &Cli,
    model: &Model,
    method: SimulationMethod,
    constraints: &Constraints,
) -> Result<Option<IndexMap<String, f64>>> {
    if !method.needs_reference() {
        return Ok(None);
    }
    let reference = match &cli.reference {
        Some(path) => read_fluxes(path)
            .with_context(|| format!("Unable to read reference fluxes {}", path.display()))?,
        None => wild_type_reference(model, constraints)
            .context("Unable to compute the wild type reference")?,
    };
    debug!("Using {} reference fluxes", reference.len());
    Ok(Some(reference))
}

fn run_method(
    cli: &Cli,
    model: &Model,
    method: SimulationMethod,
    objective: Option<&IndexMap<String, f64>>,
    reference: Option<&IndexMap<String, f64>>,
    constraints: &Constraints,
) -> Result<FluxSolution, SimulationError> {
    match method {
        SimulationMethod::Fba => fba(model, objective, cli.minimize, constraints),
        SimulationMethod::Pfba => pfba(model, objective, cli.minimize, constraints),
        SimulationMethod::Room => room(model, reference, constraints, cli.delta, cli.epsilon),
        _ => simulate(model, method, reference, constraints),
    }
}

/// Knock-out targets from the command line and the targets file, de-duplicated in first
/// seen order, all elements of the kind when none are given
fn collect_targets(cli: &Cli, model: &Model, kind: KnockoutKind) -> Result<Vec<String>> {
    let mut requested: Vec<String> = cli
        .targets
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if let Some(path) = &cli.targets_file {
        let source = fs::read_to_string(path)
            .with_context(|| format!("Unable to read targets file {}", path.display()))?;
        requested.extend(
            source
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(String::from),
        );
    }
    if requested.is_empty() {
        return Ok(match kind {
            KnockoutKind::Reactions => model.reactions.keys().cloned().collect(),
            KnockoutKind::Genes => model.genes.keys().cloned().collect(),
        });
    }
    let is_known = |id: &str| match kind {
        KnockoutKind::Reactions => model.reactions.contains_key(id),
        KnockoutKind::Genes => model.genes.contains_key(id),
    };
    let mut seen = HashSet::new();
    let mut targets = Vec::new();
    for target in requested {
        if !is_known(&target) {
            bail!("Unknown {} knock-out target `{}`", kind, target);
        }
        if seen.insert(target.clone()) {
            targets.push(target);
        }
    }
    Ok(targets)
}
