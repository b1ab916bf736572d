use clap::Parser;
use dotp::{DotpError, Result};
use dotp::simulator::config::{load_and_merge_configs, CliOverrides};
use dotp::simulator::utils::log::init_log;
use dotp::simulator::utils::report::format_csr_map;
use dotp::simulator::Simulator;
use std::path::PathBuf;
use std::process::ExitCode;

/// dotp - register-level model of the CSR dot-product accelerator
#[derive(Parser, Debug)]
#[command(name = "dotp")]
#[command(version = "0.1.0")]
#[command(about = "Cycle model of a CSR-driven 8-lane dot-product accelerator", long_about = None)]
struct Args {
  /// Enable step mode (interactive stepping)
  #[arg(short, long)]
  step: bool,

  /// Quiet mode (suppress log messages)
  #[arg(short, long)]
  quiet: bool,

  /// Output trace file path (JSON lines, one per tick)
  #[arg(long, value_name = "FILE")]
  trace_file: Option<String>,

  /// Config file merged over the built-in defaults
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Compute latency in cycles
  #[arg(long, value_name = "N")]
  latency: Option<u32>,

  /// Cycles to wait for done before giving up
  #[arg(long, value_name = "N")]
  budget: Option<u32>,

  /// Operand vector A, comma separated
  #[arg(long, value_name = "A0,..,A7", allow_hyphen_values = true)]
  a: Option<String>,

  /// Operand vector B, comma separated
  #[arg(long, value_name = "B0,..,B7", allow_hyphen_values = true)]
  b: Option<String>,

  /// Print the CSR map and exit
  #[arg(long)]
  csr_map: bool,

  /// With --csr-map, print JSON instead of a table
  #[arg(long, requires = "csr_map")]
  json: bool,
}

fn parse_lanes(name: &str, s: &str) -> Result<Vec<i32>> {
  s.split(',')
    .map(|v| {
      v.trim()
        .parse::<i32>()
        .map_err(|e| DotpError::config(format!("--{} value '{}': {}", name, v, e)))
    })
    .collect()
}

fn main() -> ExitCode {
  let args = Args::parse();
  init_log(args.quiet);

  match run(args) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      log::error!("{}", e);
      ExitCode::FAILURE
    },
  }
}

fn run(args: Args) -> Result<()> {
  let cli = CliOverrides {
    quiet: args.quiet,
    step: args.step,
    trace_file: args.trace_file,
    latency: args.latency,
    poll_budget: args.budget,
    a: args.a.as_deref().map(|s| parse_lanes("a", s)).transpose()?,
    b: args.b.as_deref().map(|s| parse_lanes("b", s)).transpose()?,
  };

  let app_config = load_and_merge_configs(args.config.as_deref(), &cli)?;
  let mut simulator = Simulator::from_app_config(&app_config)?;

  if args.csr_map {
    let map = simulator.csr_map();
    if args.json {
      let json = serde_json::to_string_pretty(&map).map_err(|e| DotpError::config(e.to_string()))?;
      println!("{}", json);
    } else {
      print!("{}", format_csr_map(&map));
    }
    return simulator.finish();
  }

  let (a, b) = app_config.vectors()?;
  let result = simulator.run(&a, &b);
  simulator.finish()?;
  result
}
