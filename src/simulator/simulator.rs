use super::accel::{Clocked, DotProductAccel, LANES};
use super::config::AppConfig;
use super::csr::{csr_map, CsrMapEntry, RegisterFile};
use super::host::{sw_dotp, HostDriver};
use super::sim::mode::{SimConfig, StepMode};
use super::sim::model::{TraceWriter, TracedModel};
use super::sim::records::Reportable;
use super::sim::shell::{Command, Shell};
use super::utils::report::{format_registers, hex64, print_simulation_records};
use crate::error::{DotpError, Result};
use log::info;
use std::path::Path;

/// One simulation session: a register file, the accelerator attached to it,
/// and a host driver talking to both.
pub struct Simulator {
  config: SimConfig,
  regs: RegisterFile,
  accel: DotProductAccel,
  driver: HostDriver,
  trace: Option<TraceWriter>,
}

impl Simulator {
  pub fn new(config: SimConfig) -> Result<Self> {
    if config.latency == 0 {
      return Err(DotpError::config("accelerator.latency must be at least 1"));
    }
    if config.poll_budget == 0 {
      return Err(DotpError::config("host.poll_budget must be at least 1"));
    }

    let trace = match &config.trace_file {
      Some(path) => {
        info!("Writing trace to {}", path);
        Some(TraceWriter::create(Path::new(path))?)
      },
      None => None,
    };

    Ok(Self {
      regs: RegisterFile::new(),
      accel: DotProductAccel::new(config.latency),
      driver: HostDriver::new(config.poll_budget),
      trace,
      config,
    })
  }

  pub fn from_app_config(app: &AppConfig) -> Result<Self> {
    Self::new(SimConfig::from_app_config(app))
  }

  pub fn config(&self) -> &SimConfig {
    &self.config
  }

  pub fn regs(&self) -> &RegisterFile {
    &self.regs
  }

  pub fn regs_mut(&mut self) -> &mut RegisterFile {
    &mut self.regs
  }

  pub fn accel(&self) -> &DotProductAccel {
    &self.accel
  }

  /// Global cycle count, including ticks issued by the driver
  pub fn cycle(&self) -> u64 {
    self.accel.cycle()
  }

  pub fn csr_map(&self) -> Vec<CsrMapEntry> {
    csr_map(self.config.csr_base)
  }

  fn traced(&mut self) -> (&mut RegisterFile, TracedModel<'_>) {
    (
      &mut self.regs,
      TracedModel {
        model: &mut self.accel,
        trace: self.trace.as_mut(),
      },
    )
  }

  /// Advance the accelerator by one tick
  pub fn step(&mut self) {
    let (regs, mut model) = self.traced();
    model.tick(regs);
  }

  pub fn pulse_start(&mut self) {
    let (regs, mut model) = self.traced();
    HostDriver::pulse_start(regs, &mut model);
  }

  pub fn poll_done(&mut self, max_cycles: u32) -> Result<u32> {
    let (regs, mut model) = self.traced();
    HostDriver::poll_done(regs, &mut model, max_cycles)
  }

  pub fn dot_product(&mut self, a: &[i32; LANES], b: &[i32; LANES]) -> Result<i64> {
    let driver = self.driver;
    let (regs, mut model) = self.traced();
    driver.dot_product(regs, &mut model, a, b)
  }

  /// Compare the accelerator against the software reference and report both
  /// the way the demo firmware does
  pub fn self_check(&mut self, a: &[i32; LANES], b: &[i32; LANES]) -> Result<i64> {
    println!("A = {:?}", a);
    println!("B = {:?}", b);
    println!("Software: {}", hex64(sw_dotp(a, b)));

    let driver = self.driver;
    let (regs, mut model) = self.traced();
    match driver.self_check(regs, &mut model, a, b) {
      Ok(hw) => {
        println!("Hardware: {}", hex64(hw));
        println!("[OK] Results match");
        Ok(hw)
      },
      Err(DotpError::Mismatch { expected, actual }) => {
        println!("Hardware: {}", hex64(actual));
        println!("[ERROR] Results differ");
        Err(DotpError::Mismatch { expected, actual })
      },
      Err(e) => Err(e),
    }
  }

  pub fn run(&mut self, a: &[i32; LANES], b: &[i32; LANES]) -> Result<()> {
    match self.config.step_mode {
      StepMode::Continuous => self.run_continuous(a, b),
      StepMode::Step => self.run_step_mode(a, b),
    }
  }

  fn run_continuous(&mut self, a: &[i32; LANES], b: &[i32; LANES]) -> Result<()> {
    println!("\nDot-Product Accelerator Demo");
    println!("Latency: {} cycles\n", self.accel.latency());

    let result = self.self_check(a, b);
    if !self.config.quiet {
      print_simulation_records(&[&self.accel as &dyn Reportable]);
    }
    result.map(|_| ())
  }

  fn run_step_mode(&mut self, a: &[i32; LANES], b: &[i32; LANES]) -> Result<()> {
    HostDriver::write_vectors(&mut self.regs, a, b);
    println!("Step mode - operands loaded, 'p' pulses start, Enter ticks, 'q' quits");

    let mut shell = Shell::new()?;
    loop {
      match shell.read_command()? {
        Command::Step(n) => {
          for _ in 0..n {
            self.step();
          }
          self.print_status();
        },
        Command::Continue => {
          match self.poll_done(self.config.poll_budget) {
            Ok(spent) => println!(
              "done after {} cycles, result {}",
              spent,
              HostDriver::read_result(&self.regs)
            ),
            Err(e) => println!("{}", e),
          }
          self.print_status();
        },
        Command::Pulse => {
          self.pulse_start();
          self.print_status();
        },
        Command::Write(csr, value) => self.regs.write_masked(csr, value),
        Command::Dump => print!("{}", format_registers(&self.regs)),
        Command::Quit => break,
      }
    }
    Ok(())
  }

  fn print_status(&self) {
    println!("cycle {}: {}", self.cycle(), self.accel.status());
  }

  /// Flush the trace, reporting any write error hit during the run
  pub fn finish(self) -> Result<()> {
    if let Some(trace) = self.trace {
      let lines = trace.lines();
      trace.finish()?;
      info!("Trace complete: {} ticks", lines);
    }
    Ok(())
  }
}
