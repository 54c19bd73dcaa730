// Push-gossip experiment runner
//
// Usage:
//   cargo run --bin gossip_runner -- -s 100 -f 10 -c 1000
//   cargo run --bin gossip_runner -- -s 200 -f 4 -a vector-once --clusters 0.9/50,0.5/50 -p 0.3
//   cargo run --bin gossip_runner -- -i          (interactive prompt)

use std::env;
use std::io::{self, BufRead, Write};
use std::process;
use std::str::FromStr;

use log::{error, LevelFilter};
use simple_logger::SimpleLogger;

use gossip_model::{parse_cluster_list, ExperimentConfig, ExperimentRunner, GossipError};

#[derive(Debug)]
struct Options {
    config: ExperimentConfig,
    interactive: bool,
    verbose: bool,
}

fn main() {
    let args: Vec<String> = env::args().collect();

    let options = match parse_args(&args[1..]) {
        Ok(Some(options)) => options,
        Ok(None) => {
            print_usage(&args[0]);
            return;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage(&args[0]);
            process::exit(1);
        }
    };

    let level = if options.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("logger unavailable: {}", e);
    }

    if options.interactive {
        let stdin = io::stdin();
        if let Err(e) = repl(stdin.lock(), io::stdout(), &options.config) {
            error!("interactive session failed: {}", e);
            process::exit(1);
        }
    } else if let Err(e) = run_experiment(options.config, &mut io::stdout()) {
        error!("{}", e);
        process::exit(1);
    }
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} [options]", program);
    eprintln!("\nOptions:");
    eprintln!("  -s <size>            size of network map (default 100)");
    eprintln!("  -f <fanout>          size of fanout value (default 10)");
    eprintln!("  -n <leader>          index of leader node (default 0)");
    eprintln!("  -c <count>           number of experiments (default 10)");
    eprintln!("  -a <algorithm>       naive-once | naive-forever | naive-forever-memorise |");
    eprintln!("                       centralised | centralised-memorise | vector-once");
    eprintln!("  -p <probability>     default link probability (default 1.0)");
    eprintln!("  --clusters <list>    clusters as <probability>/<capacity>,...");
    eprintln!("  --debug              dense histogram output, dump stalled trials");
    eprintln!("  -v                   verbose logging");
    eprintln!("  -i                   interactive mode");
}

fn flag_value<T: FromStr>(flag: &str, value: Option<&String>) -> Result<T, GossipError> {
    let value = value.ok_or_else(|| GossipError::InvalidArgument(format!("{} needs a value", flag)))?;
    value
        .parse()
        .map_err(|_| GossipError::InvalidArgument(format!("{} {}", flag, value)))
}

/// `Ok(None)` when help was requested
fn parse_args(args: &[String]) -> Result<Option<Options>, GossipError> {
    let mut options = Options {
        config: ExperimentConfig::default(),
        interactive: false,
        verbose: false,
    };

    let mut args = args.iter();
    while let Some(arg) = args.next() {
        let config = &mut options.config;
        match arg.as_str() {
            "-s" => config.size = flag_value(arg, args.next())?,
            "-f" => config.fanout = flag_value(arg, args.next())?,
            "-n" => config.leader = flag_value(arg, args.next())?,
            "-c" => config.trials = flag_value(arg, args.next())?,
            "-p" => config.default_probability = flag_value(arg, args.next())?,
            "-a" => {
                let name: String = flag_value(arg, args.next())?;
                config.algorithm = name.parse()?;
            }
            "--clusters" => {
                let list: String = flag_value(arg, args.next())?;
                config.clusters = parse_cluster_list(&list)?;
            }
            "--debug" => config.debug = true,
            "-v" => options.verbose = true,
            "-i" => options.interactive = true,
            "-h" | "--help" => return Ok(None),
            other => {
                return Err(GossipError::InvalidArgument(format!("unknown flag {}", other)));
            }
        }
    }

    if !options.interactive {
        options.config.validate()?;
    }
    Ok(Some(options))
}

fn run_experiment<W: Write>(config: ExperimentConfig, out: &mut W) -> Result<(), GossipError> {
    let debug = config.debug;
    let report = ExperimentRunner::new(config)?.run()?;

    let printed = if debug {
        writeln!(out, "{}", report.histogram_line())
    } else {
        writeln!(out, "{}", report)
    };
    printed.map_err(|e| GossipError::InvalidArgument(format!("cannot write report: {}", e)))
}

// ============================================================================
// Interactive mode
// ============================================================================

fn prompt<R: BufRead, W: Write>(input: &mut R, out: &mut W, text: &str) -> io::Result<Option<String>> {
    write!(out, "{}", text)?;
    out.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn repl<R: BufRead, W: Write>(mut input: R, mut out: W, base: &ExperimentConfig) -> io::Result<()> {
    writeln!(out, "Interactive push-gossip model runner")?;
    writeln!(out, "Print 'run' and fill model parameters")?;

    while let Some(command) = prompt(&mut input, &mut out, ">>> ")? {
        match command.as_str() {
            "" => {}
            "run" => {
                if let Some(config) = read_run_parameters(&mut input, &mut out, base)? {
                    writeln!(out, "-----------")?;
                    if let Err(e) = run_experiment(config, &mut out) {
                        writeln!(out, "Error: {}", e)?;
                    }
                }
            }
            "help" => {
                writeln!(out, "run   run gossip experiment")?;
                writeln!(out, "exit  leave the runner")?;
            }
            "exit" | "quit" => break,
            other => writeln!(out, "Unknown command: {}", other)?,
        }
    }
    Ok(())
}

/// `Ok(None)` when an answer was rejected or input ended
fn read_run_parameters<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    base: &ExperimentConfig,
) -> io::Result<Option<ExperimentConfig>> {
    let size = prompt(input, out, "Network size: ")?.and_then(|s| s.parse::<usize>().ok());
    let size = match size {
        Some(size) if size > 0 => size,
        _ => {
            writeln!(out, "Incorrect network size")?;
            return Ok(None);
        }
    };

    let fanout = prompt(input, out, "Fan-out size: ")?.and_then(|s| s.parse::<usize>().ok());
    let fanout = match fanout {
        Some(fanout) if fanout > 0 && fanout < size => fanout,
        _ => {
            writeln!(out, "Incorrect fan-out size")?;
            return Ok(None);
        }
    };

    let trials = prompt(input, out, "Number of experiments: ")?.and_then(|s| s.parse::<usize>().ok());
    let trials = match trials {
        Some(trials) if trials > 0 => trials,
        _ => {
            writeln!(out, "Incorrect number of experiments")?;
            return Ok(None);
        }
    };

    Ok(Some(ExperimentConfig {
        size,
        fanout,
        trials,
        leader: 0,
        debug: false,
        ..base.clone()
    }))
}
