use crate::simulator::config::AppConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
  Continuous,
  Step,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
  pub quiet: bool,
  pub step_mode: StepMode,
  pub trace_file: Option<String>,
  pub latency: u32,
  pub poll_budget: u32,
  pub csr_base: u64,
}

impl SimConfig {
  pub fn from_app_config(app: &AppConfig) -> Self {
    let trace_file = Some(app.simulation.trace_file.clone()).filter(|f| !f.is_empty());
    Self {
      quiet: app.simulation.quiet,
      step_mode: if app.simulation.step_mode {
        StepMode::Step
      } else {
        StepMode::Continuous
      },
      trace_file,
      latency: app.accelerator.latency,
      poll_budget: app.host.poll_budget,
      csr_base: app.host.csr_base,
    }
  }
}

impl Default for SimConfig {
  fn default() -> Self {
    Self::from_app_config(&AppConfig::default())
  }
}
