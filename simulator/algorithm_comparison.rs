// Algorithm Comparison: all six push-gossip variants on one configuration
//
// Every algorithm runs the same number of trials over networks of the same
// size and fan-out. The table compares how fast each one fills the network,
// how many messages it wastes and how often it stalls.
//
//   cargo run --example algorithm_comparison -- 200 4 500

use std::env;

use log::LevelFilter;
use simple_logger::SimpleLogger;

use gossip_model::{Algorithm, ExperimentConfig, ExperimentReport, ExperimentRunner};

fn mean_epochs(report: &ExperimentReport) -> f64 {
    let filled = report.filled();
    if filled == 0 {
        return 0.0;
    }
    let total: usize = report
        .histogram()
        .iter()
        .map(|(epochs, count)| epochs * count)
        .sum();
    total as f64 / filled as f64
}

fn arg_or(args: &[String], index: usize, default: usize) -> usize {
    args.get(index).and_then(|a| a.parse().ok()).unwrap_or(default)
}

fn main() {
    if let Err(e) = SimpleLogger::new().with_level(LevelFilter::Warn).init() {
        eprintln!("logger unavailable: {}", e);
    }

    let args: Vec<String> = env::args().collect();
    let size = arg_or(&args, 1, 100);
    let fanout = arg_or(&args, 2, 4);
    let trials = arg_or(&args, 3, 200);

    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║  Push-Gossip Algorithm Comparison                      ║");
    println!("╚════════════════════════════════════════════════════════╝\n");

    println!("Setup:");
    println!("  - {} nodes, fully connected", size);
    println!("  - fan-out {}, leader node 0", fanout);
    println!("  - {} trials per algorithm\n", trials);

    println!("┌────────────────────────┬──────────┬──────────┬──────────┬──────────┐");
    println!("│ Algorithm              │  epochs  │  reused  │  stalls  │   time   │");
    println!("├────────────────────────┼──────────┼──────────┼──────────┼──────────┤");

    for algorithm in Algorithm::ALL {
        let config = ExperimentConfig {
            size,
            fanout,
            trials,
            algorithm,
            ..ExperimentConfig::default()
        };

        let report = match ExperimentRunner::new(config).and_then(|runner| runner.run()) {
            Ok(report) => report,
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        };

        println!(
            "│ {:<22} │  {:6.2}  │  {:6}  │ {:6.2}%  │ {:6.2}s  │",
            algorithm.name(),
            mean_epochs(&report),
            report.mean_reused(),
            report.non_convergence_rate(),
            report.elapsed.as_secs_f64()
        );
    }

    println!("└────────────────────────┴──────────┴──────────┴──────────┴──────────┘\n");
    println!("✓ Comparison complete!\n");
}
