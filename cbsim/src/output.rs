//! Tab separated result tables
use std::io::Write;

use cbsim_core::flux_analysis::deletion::KnockoutKind;
use cbsim_core::flux_analysis::{FluxSolution, SimulationMethod};

const MISSING: &str = "NA";

/// Writes result tables with a fixed number of decimals
#[derive(Clone, Copy, Debug)]
pub struct TableWriter {
    /// Decimals printed for every value
    pub precision: usize,
    /// Magnitudes below this are printed as zero
    pub tolerance: f64,
}

impl TableWriter {
    pub fn new(precision: usize, tolerance: f64) -> Self {
        TableWriter {
            precision,
            tolerance,
        }
    }

    /// Format a value, printing solver noise around zero as zero
    pub fn format_value(&self, value: f64) -> String {
        if value.abs() < self.tolerance {
            return format!("{:.*}", self.precision, 0f64);
        }
        let formatted = format!("{:.*}", self.precision, value);
        // Rounding can leave a negative zero behind
        if formatted.starts_with('-') && formatted[1..].chars().all(|c| c == '0' || c == '.') {
            formatted[1..].to_string()
        } else {
            formatted
        }
    }

    fn format_objective(&self, solution: &FluxSolution) -> String {
        match solution.objective_value {
            Some(value) if solution.is_optimal() => self.format_value(value),
            _ => MISSING.to_string(),
        }
    }

    /// A single simulation, header comments then one flux per reaction
    pub fn write_single(
        &self,
        writer: &mut dyn Write,
        method: SimulationMethod,
        solution: &FluxSolution,
    ) -> std::io::Result<()> {
        writeln!(writer, "# method\t{}", method)?;
        writeln!(writer, "# status\t{}", solution.status)?;
        writeln!(writer, "# objective\t{}", self.format_objective(solution))?;
        if let Some(fluxes) = solution.fluxes.as_ref().filter(|_| solution.is_optimal()) {
            writeln!(writer, "reaction\tflux")?;
            for (id, flux) in fluxes {
                writeln!(writer, "{}\t{}", id, self.format_value(*flux))?;
            }
        }
        Ok(())
    }

    /// Shadow prices then reduced costs of an optimal solution, each section skipped when
    /// the solver didn't report it
    pub fn write_duals(
        &self,
        writer: &mut dyn Write,
        solution: &FluxSolution,
    ) -> std::io::Result<()> {
        if !solution.is_optimal() {
            return Ok(());
        }
        if let Some(prices) = &solution.shadow_prices {
            writeln!(writer, "metabolite\tshadow_price")?;
            for (id, price) in prices {
                writeln!(writer, "{}\t{}", id, self.format_value(*price))?;
            }
        }
        if let Some(costs) = &solution.reduced_costs {
            writeln!(writer, "reaction\treduced_cost")?;
            for (id, cost) in costs {
                writeln!(writer, "{}\t{}", id, self.format_value(*cost))?;
            }
        }
        Ok(())
    }

    /// One row per knock-out set, with a flux column per entry of `reactions` when given
    pub fn write_sweep(
        &self,
        writer: &mut dyn Write,
        rows: &[(String, FluxSolution)],
        reactions: Option<&[String]>,
    ) -> std::io::Result<()> {
        write!(writer, "knockout\tstatus\tobjective")?;
        for id in reactions.unwrap_or_default() {
            write!(writer, "\t{}", id)?;
        }
        writeln!(writer)?;
        for (label, solution) in rows {
            write!(
                writer,
                "{}\t{}\t{}",
                label,
                solution.status,
                self.format_objective(solution)
            )?;
            for id in reactions.unwrap_or_default() {
                let value = solution
                    .flux(id)
                    .filter(|_| solution.is_optimal())
                    .map(|flux| self.format_value(flux))
                    .unwrap_or_else(|| MISSING.to_string());
                write!(writer, "\t{}", value)?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }

    /// Essential elements, one per row
    pub fn write_essential(
        &self,
        writer: &mut dyn Write,
        kind: KnockoutKind,
        essential: &[String],
    ) -> std::io::Result<()> {
        writeln!(writer, "essential_{}", kind)?;
        for id in essential {
            writeln!(writer, "{}", id)?;
        }
        Ok(())
    }
}
