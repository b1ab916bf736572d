use crate::error::{DotpError, Result};
use crate::simulator::accel::{DEFAULT_LATENCY, LANES};
use crate::simulator::host::DEFAULT_POLL_BUDGET;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Built-in defaults, embedded at compile time
pub const DEFAULT_CONFIG_TOML: &str = include_str!("default.toml");

const DEFAULT_A: [i32; LANES] = [1, -2, 3, -4, 5, -6, 7, -8];
const DEFAULT_B: [i32; LANES] = [8, 7, -6, -5, 4, 3, -2, -1];

/// Accelerator model parameters
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AcceleratorSection {
  pub latency: u32,
}

impl Default for AcceleratorSection {
  fn default() -> Self {
    Self {
      latency: DEFAULT_LATENCY,
    }
  }
}

/// Host driver parameters
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HostSection {
  pub poll_budget: u32,
  pub csr_base: u64,
}

impl Default for HostSection {
  fn default() -> Self {
    Self {
      poll_budget: DEFAULT_POLL_BUDGET,
      csr_base: 0,
    }
  }
}

/// Simulation run options
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SimulationSection {
  pub quiet: bool,
  pub step_mode: bool,
  /// Empty means no trace
  pub trace_file: String,
}

/// Operand vectors used by the self-check run
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WorkloadSection {
  pub a: Vec<i32>,
  pub b: Vec<i32>,
}

impl Default for WorkloadSection {
  fn default() -> Self {
    Self {
      a: DEFAULT_A.to_vec(),
      b: DEFAULT_B.to_vec(),
    }
  }
}

/// Unified application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AppConfig {
  pub accelerator: AcceleratorSection,
  pub host: HostSection,
  pub simulation: SimulationSection,
  pub workload: WorkloadSection,
}

impl AppConfig {
  /// Workload vectors as fixed lane arrays
  pub fn vectors(&self) -> Result<([i32; LANES], [i32; LANES])> {
    Ok((lanes("a", &self.workload.a)?, lanes("b", &self.workload.b)?))
  }
}

fn lanes(name: &str, values: &[i32]) -> Result<[i32; LANES]> {
  values.try_into().map_err(|_| {
    DotpError::config(format!(
      "workload.{} needs exactly {} values, got {}",
      name,
      LANES,
      values.len()
    ))
  })
}

// A user file only overrides what it mentions, so every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PartialConfig {
  accelerator: PartialAccelerator,
  host: PartialHost,
  simulation: PartialSimulation,
  workload: PartialWorkload,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PartialAccelerator {
  latency: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PartialHost {
  poll_budget: Option<u32>,
  csr_base: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PartialSimulation {
  quiet: Option<bool>,
  step_mode: Option<bool>,
  trace_file: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PartialWorkload {
  a: Option<Vec<i32>>,
  b: Option<Vec<i32>>,
}

/// Values given on the command line; `None`/`false` leaves the config alone
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
  pub quiet: bool,
  pub step: bool,
  pub trace_file: Option<String>,
  pub latency: Option<u32>,
  pub poll_budget: Option<u32>,
  pub a: Option<Vec<i32>>,
  pub b: Option<Vec<i32>>,
}

/// Load the embedded default.toml
pub fn load_default_config() -> Result<AppConfig> {
  toml::from_str::<AppConfig>(DEFAULT_CONFIG_TOML)
    .map_err(|e| DotpError::config(format!("built-in default.toml: {}", e)))
}

fn parse_partial(content: &str, origin: &str) -> Result<PartialConfig> {
  toml::from_str::<PartialConfig>(content).map_err(|e| DotpError::config(format!("parse {} failed: {}", origin, e)))
}

/// Merge a user file over `base`. Relative trace paths in the file resolve
/// against the file's directory.
pub fn merge_config_file(base: AppConfig, path: &Path) -> Result<AppConfig> {
  let content = fs::read_to_string(path)?;
  let mut partial = parse_partial(&content, &path.display().to_string())?;

  if let (Some(trace), Some(dir)) = (partial.simulation.trace_file.as_mut(), path.parent()) {
    *trace = resolve_path(trace, dir);
  }

  Ok(merge_config(base, partial))
}

/// Merge TOML text over `base`
pub fn merge_config_str(base: AppConfig, content: &str) -> Result<AppConfig> {
  Ok(merge_config(base, parse_partial(content, "config")?))
}

fn merge_config(mut base: AppConfig, over: PartialConfig) -> AppConfig {
  if let Some(latency) = over.accelerator.latency {
    base.accelerator.latency = latency;
  }
  if let Some(budget) = over.host.poll_budget {
    base.host.poll_budget = budget;
  }
  if let Some(csr_base) = over.host.csr_base {
    base.host.csr_base = csr_base;
  }
  if let Some(quiet) = over.simulation.quiet {
    base.simulation.quiet = quiet;
  }
  if let Some(step_mode) = over.simulation.step_mode {
    base.simulation.step_mode = step_mode;
  }
  if let Some(trace_file) = over.simulation.trace_file {
    base.simulation.trace_file = trace_file;
  }
  if let Some(a) = over.workload.a {
    base.workload.a = a;
  }
  if let Some(b) = over.workload.b {
    base.workload.b = b;
  }
  base
}

/// Apply command-line overrides
pub fn apply_cli_overrides(config: &mut AppConfig, cli: &CliOverrides) {
  if cli.quiet {
    config.simulation.quiet = true;
  }
  if cli.step {
    config.simulation.step_mode = true;
  }
  if let Some(file) = &cli.trace_file {
    config.simulation.trace_file = file.clone();
  }
  if let Some(latency) = cli.latency {
    config.accelerator.latency = latency;
  }
  if let Some(budget) = cli.poll_budget {
    config.host.poll_budget = budget;
  }
  if let Some(a) = &cli.a {
    config.workload.a = a.clone();
  }
  if let Some(b) = &cli.b {
    config.workload.b = b.clone();
  }
}

/// Validate the final configuration
pub fn validate_config(config: &AppConfig) -> Result<()> {
  if config.accelerator.latency == 0 {
    return Err(DotpError::config("accelerator.latency must be at least 1"));
  }
  if config.host.poll_budget == 0 {
    return Err(DotpError::config("host.poll_budget must be at least 1"));
  }
  config.vectors()?;
  Ok(())
}

fn resolve_path(path_str: &str, root: &Path) -> String {
  let path = Path::new(path_str);
  if path_str.is_empty() || path.is_absolute() {
    return path_str.to_string();
  }
  root.join(path).to_string_lossy().to_string()
}

/// Load and merge configs
///
/// Flow:
/// 1. Load the built-in defaults
/// 2. Merge the user config file, if any
/// 3. Apply CLI overrides
/// 4. Validate
pub fn load_and_merge_configs(custom_config_path: Option<&Path>, cli: &CliOverrides) -> Result<AppConfig> {
  let mut config = load_default_config()?;

  if let Some(path) = custom_config_path {
    config = merge_config_file(config, path)?;
  }

  apply_cli_overrides(&mut config, cli);
  validate_config(&config)?;

  Ok(config)
}
