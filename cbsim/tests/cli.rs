use std::path::PathBuf;

use cbsim::{execute, run, Cli};
use clap::Parser;

fn test_model(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("../cbsim_core/test_data/test_models");
    path.push(name);
    path.to_string_lossy().into_owned()
}

fn run_args(args: &[&str]) -> anyhow::Result<String> {
    let cli = Cli::try_parse_from(std::iter::once("cbsim").chain(args.iter().copied()))?;
    let mut buffer = Vec::new();
    run(&cli, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

#[test]
fn fba_on_every_format() {
    for model in ["toy_model.xml", "toy_model.bioopt", "toy_model.txt"] {
        let output = run_args(&[&test_model(model), "--precision", "3"]).unwrap();
        assert!(
            output.starts_with("# method\tfba\n# status\toptimal\n# objective\t10.000\n"),
            "{model}: {output}"
        );
        assert!(output.contains("reaction\tflux\n"));
        assert!(output.contains("R_BIOMASS\t10.000\n"));
        assert!(output.contains("R_EX_A\t-10.000\n"));
    }
}

#[test]
fn pfba_with_constraint() {
    let model = test_model("toy_model.xml");
    let output = run_args(&[
        &model,
        "-m",
        "pfba",
        "-c",
        "R_EX_A=-4:0",
        "--precision",
        "3",
    ])
    .unwrap();
    assert!(output.contains("# objective\t4.000\n"));
    assert!(output.contains("R_R1\t4.000\n"));
    assert!(output.contains("R_R2\t0.000\n"));
}

#[test]
fn custom_objective_minimized() {
    let model = test_model("toy_model.xml");
    let output = run_args(&[
        &model,
        "--objective",
        "R_EX_A",
        "--minimize",
        "--precision",
        "3",
    ])
    .unwrap();
    assert!(output.contains("# objective\t-10.000\n"), "{output}");
}

#[test]
fn infeasible_simulation_is_reported() {
    let model = test_model("toy_model.xml");
    let output = run_args(&[&model, "-c", "R_EX_A=0", "-c", "R_BIOMASS=5"]).unwrap();
    assert_eq!(
        output,
        "# method\tfba\n# status\tinfeasible\n# objective\tNA\n"
    );
}

#[test]
fn moma_with_reference_file() {
    let model = test_model("toy_model.xml");
    let reference = test_model("toy_reference.tsv");
    let output = run_args(&[
        &model,
        "-m",
        "moma",
        "-r",
        &reference,
        "-c",
        "R_R1=0",
        "--precision",
        "2",
    ])
    .unwrap();
    assert!(output.contains("# status\toptimal\n"));
    assert!(output.contains("R_BIOMASS\t5.00\n"), "{output}");
}

#[test]
fn reaction_sweep() {
    let model = test_model("toy_model.xml");
    let output = run_args(&[
        &model,
        "-k",
        "reactions",
        "-t",
        "R_R1,R_BIOMASS,R_R1",
        "--precision",
        "3",
    ])
    .unwrap();
    assert_eq!(
        output,
        "knockout\tstatus\tobjective\nR_R1\toptimal\t10.000\nR_BIOMASS\toptimal\t0.000\n"
    );
}

#[test]
fn simultaneous_sweep_with_fluxes() {
    let model = test_model("toy_model.txt");
    let output = run_args(&[
        &model,
        "-k",
        "reactions",
        "-t",
        "R_R1,R_R3",
        "--simultaneous",
        "--fluxes",
        "--precision",
        "3",
    ])
    .unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(
        lines[0],
        "knockout\tstatus\tobjective\tR_EX_A\tR_R1\tR_R2\tR_R3\tR_BIOMASS"
    );
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("R_R1+R_R3\toptimal\t0.000\t"));
}

#[test]
fn gene_sweep_from_targets_file() {
    let model = test_model("toy_model.xml");
    let mut targets = std::env::temp_dir();
    targets.push(format!("cbsim_targets_{}.txt", std::process::id()));
    std::fs::write(&targets, "# genes to delete\ng5\n\ng1\n").unwrap();
    let output = run_args(&[
        &model,
        "-k",
        "genes",
        "--targets-file",
        &targets.to_string_lossy(),
        "--precision",
        "3",
    ])
    .unwrap();
    std::fs::remove_file(&targets).unwrap();
    assert_eq!(
        output,
        "knockout\tstatus\tobjective\ng5\toptimal\t0.000\ng1\toptimal\t10.000\n"
    );
}

#[test]
fn essential_genes_and_reactions() {
    let model = test_model("toy_model.xml");
    let output = run_args(&[&model, "-k", "genes", "--essential"]).unwrap();
    assert_eq!(output, "essential_genes\ng5\n");
    let output = run_args(&[&model, "-k", "reactions", "--essential"]).unwrap();
    assert_eq!(output, "essential_reactions\nR_EX_A\nR_BIOMASS\n");
}

#[cfg(feature = "microlp")]
#[test]
fn room_knockout() {
    let model = test_model("toy_model.xml");
    let output = run_args(&[&model, "-m", "room", "-k", "reactions", "-t", "R_R1"]).unwrap();
    assert!(output.starts_with("knockout\tstatus\tobjective\nR_R1\toptimal\t3.0"));
}

#[cfg(feature = "microlp")]
#[test]
fn room_tolerances() {
    let model = test_model("toy_model.xml");
    let room_objective = |extra: &[&str]| {
        let mut args = vec![model.as_str(), "-m", "room", "-c", "R_R1=0", "--precision", "3"];
        args.extend_from_slice(extra);
        let output = run_args(&args).unwrap();
        assert!(output.starts_with("# method\troom\n# status\toptimal\n"), "{output}");
        output
    };
    assert!(room_objective(&[]).contains("# objective\t3.000\n"));
    // A wide absolute band tolerates rerouting part of the flux
    let wide = room_objective(&["--delta", "0.03", "--epsilon", "6"]);
    assert!(wide.contains("# objective\t1.000\n"), "{wide}");
}

#[test]
fn lmoma_after_knockout() {
    let model = test_model("toy_model.xml");
    let output = run_args(&[&model, "-m", "lmoma", "-c", "R_R1=0", "--precision", "3"]).unwrap();
    assert!(output.starts_with("# method\tlmoma\n# status\toptimal\n"), "{output}");
    assert!(output.contains("R_R1\t0.000\n"));
    // |0 - 10| for R_R1, then the rerouted flux and the lost growth add up to 2 * 10
    assert!(output.contains("# objective\t30.000\n"), "{output}");
}

#[test]
fn forced_format_ignores_the_file_name() {
    let mut path = std::env::temp_dir();
    path.push(format!("cbsim_forced_{}.txt", std::process::id()));
    std::fs::copy(test_model("toy_model.xml"), &path).unwrap();
    let model = path.to_string_lossy().into_owned();
    let forced = run_args(&[&model, "-f", "sbml", "--precision", "3"]);
    let guessed = run_args(&[&model, "--precision", "3"]);
    std::fs::remove_file(&path).unwrap();
    assert!(forced.unwrap().contains("# objective\t10.000\n"));
    assert!(guessed.is_err());

    let output = run_args(&[
        &test_model("toy_model.bioopt"),
        "-f",
        "bioopt",
        "--precision",
        "3",
    ])
    .unwrap();
    assert!(output.contains("# objective\t10.000\n"));
}

#[test]
fn solver_and_tolerance_options() {
    let model = test_model("toy_model.xml");
    let output = run_args(&[&model, "--solver", "clarabel", "--tolerance", "1e-7"]).unwrap();
    assert!(output.contains("# objective\t10.000000\n"), "{output}");
    assert!(output.contains("R_EX_A\t-10.000000\n"));
}

#[test]
fn pfba_keeps_the_optimum_at_default_precision() {
    let model = test_model("toy_model.xml");
    let output = run_args(&[&model, "-m", "pfba"]).unwrap();
    assert!(output.contains("# objective\t10.000000\n"), "{output}");
    assert!(output.contains("R_R1\t10.000000\n"), "{output}");
    assert!(output.contains("R_BIOMASS\t10.000000\n"), "{output}");
}

#[test]
fn duals_are_appended() {
    let model = test_model("toy_model.xml");
    let output = run_args(&[&model, "--duals", "--precision", "3"]).unwrap();
    let prices = output.find("metabolite\tshadow_price\n").unwrap();
    let costs = output.find("reaction\treduced_cost\n").unwrap();
    assert!(output.find("reaction\tflux\n").unwrap() < prices);
    assert!(prices < costs);
    assert!(output[prices..costs].contains("\nA\t-1.000\n"), "{output}");
    assert!(output[prices..costs].contains("\nB\t-1.000\n"), "{output}");
    assert!(output[costs..].contains("\nR_EX_A\t-1.000\n"), "{output}");
    assert!(output[costs..].contains("\nR_BIOMASS\t0.000\n"), "{output}");
}

#[test]
fn empty_knockout_set_is_an_error() {
    let mut path = std::env::temp_dir();
    path.push(format!("cbsim_gene_free_{}.txt", std::process::id()));
    std::fs::write(&path, "EX : A <-> [-10, 10]\nBIO : A --> @1\n").unwrap();
    let model = path.to_string_lossy().into_owned();
    let simultaneous = run_args(&[&model, "-k", "genes", "--simultaneous"]);
    let single = run_args(&[&model, "-k", "genes"]);
    let reactions = run_args(&[&model, "-k", "reactions", "--simultaneous"]);
    std::fs::remove_file(&path).unwrap();
    let message = simultaneous.unwrap_err().to_string();
    assert!(message.contains("no genes to knock out"), "{message}");
    assert!(single.is_err());
    assert!(reactions.unwrap().starts_with("knockout\tstatus\tobjective\nEX+BIO\t"));
}

#[test]
fn output_file() {
    let model = test_model("toy_model.xml");
    let mut path = std::env::temp_dir();
    path.push(format!("cbsim_output_{}.tsv", std::process::id()));
    let output = path.to_string_lossy().into_owned();
    let cli = Cli::try_parse_from([
        "cbsim",
        model.as_str(),
        "-k",
        "genes",
        "--essential",
        "-o",
        output.as_str(),
    ])
    .unwrap();
    execute(&cli).unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(written, "essential_genes\ng5\n");
}

#[test]
fn bad_input_is_an_error() {
    let model = test_model("toy_model.xml");
    assert!(run_args(&[&model, "-c", "R_NOPE=0:1"]).is_err());
    assert!(run_args(&[&model, "--objective", "R_NOPE"]).is_err());
    assert!(run_args(&[&model, "-k", "genes", "-t", "g42"]).is_err());
    assert!(run_args(&[&test_model("missing.xml")]).is_err());
    assert!(run_args(&[&model, "-m", "annealing"]).is_err());
    assert!(run_args(&[&model, "-f", "plaintext"]).is_err());
}
