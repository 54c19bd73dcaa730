// Scenario Runner - Load and execute experiment batches from YAML files
//
// Usage:
//   cargo run --bin scenario_runner scenarios/baseline.yaml
//   cargo run --bin scenario_runner scenarios/  (runs all .yaml files in directory)
//   cargo run --bin scenario_runner scenarios/clustered.yaml --debug

use std::env;
use std::fs;
use std::path::Path;
use std::process;

use log::{error, info, LevelFilter};
use simple_logger::SimpleLogger;

use gossip_model::{ExperimentConfig, ExperimentRunner};

/// Scenario file format
#[derive(Debug, serde::Deserialize)]
struct ScenarioFile {
    /// Scenario metadata
    #[serde(default)]
    meta: ScenarioMeta,

    /// Experiments, run in file order
    experiments: Vec<ExperimentConfig>,
}

#[derive(Debug, Default, serde::Deserialize)]
struct ScenarioMeta {
    name: Option<String>,
    description: Option<String>,
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <scenario.yaml | directory/> [--debug]", args[0]);
        eprintln!("\nExamples:");
        eprintln!("  {} scenarios/baseline.yaml", args[0]);
        eprintln!("  {} scenarios/", args[0]);
        process::exit(1);
    }

    let debug = args[2..].iter().any(|a| a == "--debug");
    if let Err(e) = SimpleLogger::new().with_level(LevelFilter::Info).init() {
        eprintln!("logger unavailable: {}", e);
    }

    let path = Path::new(&args[1]);
    if path.is_file() {
        run_scenario_file(path, debug);
    } else if path.is_dir() {
        run_scenario_directory(path, debug);
    } else {
        eprintln!("Error: Path does not exist: {}", path.display());
        process::exit(1);
    }
}

fn run_scenario_directory(dir: &Path, debug: bool) {
    let mut scenarios = Vec::new();

    // Find all .yaml files
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("yaml")
                || path.extension().and_then(|s| s.to_str()) == Some("yml")
            {
                scenarios.push(path);
            }
        }
    }

    scenarios.sort();

    if scenarios.is_empty() {
        eprintln!("No .yaml files found in {}", dir.display());
        process::exit(1);
    }

    println!("Found {} scenario(s) to run\n", scenarios.len());

    for (i, scenario_path) in scenarios.iter().enumerate() {
        println!("\n{}/{} Running: {}\n", i + 1, scenarios.len(), scenario_path.display());
        run_scenario_file(scenario_path, debug);
    }
}

fn load_scenario(path: &Path) -> Result<ScenarioFile, String> {
    let yaml_content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;

    serde_yaml::from_str(&yaml_content)
        .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
}

fn run_scenario_file(path: &Path, debug: bool) {
    info!("Loading scenario from: {}", path.display());

    let scenario = load_scenario(path).unwrap_or_else(|e| {
        eprintln!("{}", e);
        process::exit(1);
    });

    // every experiment is checked before the first one runs
    let mut runners = Vec::with_capacity(scenario.experiments.len());
    for (i, mut config) in scenario.experiments.into_iter().enumerate() {
        config.debug |= debug;
        match ExperimentRunner::new(config) {
            Ok(runner) => runners.push(runner),
            Err(e) => {
                error!("experiment #{} in {}: {}", i + 1, path.display(), e);
                process::exit(1);
            }
        }
    }

    match &scenario.meta.name {
        Some(name) => println!("=== {} ===", name),
        None => println!("=== {} ===", path.display()),
    }
    if let Some(ref desc) = scenario.meta.description {
        println!("{}\n", desc);
    }

    for runner in runners {
        let config = runner.config();
        println!(
            "Algorithm: {}  Leader: {}  Trials: {}  Link probability: {}  Clusters: {}",
            config.algorithm,
            config.leader,
            config.trials,
            config.default_probability,
            config.clusters.len()
        );

        match runner.run() {
            Ok(report) if runner.config().debug => println!("{}", report.histogram_line()),
            Ok(report) => println!("{}\n", report),
            Err(e) => {
                error!("{}", e);
                process::exit(1);
            }
        }
    }
}
