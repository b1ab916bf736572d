use super::Clocked;
use crate::model_record;
use crate::simulator::csr::{Csr, CsrBus};
use crate::simulator::sim::records::{ModelRecord, Reportable};
use log::{debug, info};
use serde::Serialize;

/// Parallel multiply-accumulate lanes
pub const LANES: usize = 8;

/// Ticks spent in Computing before the result is published
pub const DEFAULT_LATENCY: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AccelState {
  Idle,
  Computing,
  Done,
}

/// Cycle model of the CSR-driven dot-product accelerator.
///
/// Each [`tick`](Self::tick) evaluates one transition against the register
/// bus:
///
/// - `Idle`: a set `start` bit captures both operand vectors, clears `done`
///   and enters `Computing`.
/// - `Computing`: counts ticks; after `latency` of them the 64-bit result is
///   written to `result_lo`/`result_hi`, `done` is set and the model enters
///   `Done`. `start` is ignored meanwhile.
/// - `Done`: outputs are sticky. A set `start` re-arms to `Idle` without
///   touching the outputs; the capture happens on the following tick.
#[derive(Debug, Clone)]
pub struct DotProductAccel {
  state: AccelState,
  a: [i32; LANES],
  b: [i32; LANES],
  cycle_count: u32,
  result: i64,
  latency: u32,

  /// Ticks seen since construction
  cycle: u64,
  records: Vec<ModelRecord>,
}

impl DotProductAccel {
  pub fn new(latency: u32) -> Self {
    assert!(latency >= 1, "compute latency must be at least one cycle");
    Self {
      state: AccelState::Idle,
      a: [0; LANES],
      b: [0; LANES],
      cycle_count: 0,
      result: 0,
      latency,
      cycle: 0,
      records: Vec::new(),
    }
  }

  pub fn tick<B: CsrBus + ?Sized>(&mut self, regs: &mut B) {
    self.cycle += 1;
    let start = regs.read(Csr::START) & 1 == 1;

    match self.state {
      AccelState::Idle => {
        if start {
          self.capture(regs);
        }
      },
      AccelState::Computing => {
        self.cycle_count += 1;
        if self.cycle_count >= self.latency {
          self.complete(regs);
        }
      },
      AccelState::Done => {
        if start {
          debug!("cycle {}: start sampled in Done, re-arming", self.cycle);
          model_record!(self, "rearm", "Done -> Idle");
          self.state = AccelState::Idle;
        }
      },
    }
  }

  fn capture<B: CsrBus + ?Sized>(&mut self, regs: &mut B) {
    for lane in 0..LANES {
      self.a[lane] = to_signed32(regs.read(Csr::a(lane)));
      self.b[lane] = to_signed32(regs.read(Csr::b(lane)));
    }
    self.cycle_count = 0;
    regs.write(Csr::DONE, 0);
    self.state = AccelState::Computing;

    debug!("cycle {}: captured A={:?} B={:?}", self.cycle, self.a, self.b);
    model_record!(self, "capture", format!("A={:?} B={:?}", self.a, self.b));
  }

  fn complete<B: CsrBus + ?Sized>(&mut self, regs: &mut B) {
    let bits = truncate64(dot_wide(&self.a, &self.b));
    self.result = bits as i64;

    regs.write(Csr::RESULT_LO, (bits & 0xFFFF_FFFF) as u32);
    regs.write(Csr::RESULT_HI, (bits >> 32) as u32);
    regs.write(Csr::DONE, 1);
    self.state = AccelState::Done;

    info!(
      "cycle {}: dot product done after {} cycles, result {} ({:#018x})",
      self.cycle, self.cycle_count, self.result, bits
    );
    model_record!(
      self,
      "complete",
      format!("result={} lo={:#010x} hi={:#010x}", self.result, bits as u32, bits >> 32)
    );
  }

  pub fn state(&self) -> AccelState {
    self.state
  }

  pub fn is_busy(&self) -> bool {
    self.state == AccelState::Computing
  }

  /// Operands captured at the last start; zero before the first capture
  pub fn operands(&self) -> (&[i32; LANES], &[i32; LANES]) {
    (&self.a, &self.b)
  }

  /// Last published result; zero before the first completion
  pub fn result(&self) -> i64 {
    self.result
  }

  pub fn latency(&self) -> u32 {
    self.latency
  }

  pub fn cycle(&self) -> u64 {
    self.cycle
  }
}

impl Clocked for DotProductAccel {
  fn tick<B: CsrBus + ?Sized>(&mut self, bus: &mut B) {
    DotProductAccel::tick(self, bus)
  }

  fn is_busy(&self) -> bool {
    DotProductAccel::is_busy(self)
  }
}

impl Default for DotProductAccel {
  fn default() -> Self {
    Self::new(DEFAULT_LATENCY)
  }
}

impl Reportable for DotProductAccel {
  fn id(&self) -> &str {
    "dotp"
  }

  fn status(&self) -> String {
    format!(
      "state={:?}, cycle_count={}/{}, result={}",
      self.state, self.cycle_count, self.latency, self.result
    )
  }

  fn records(&self) -> &[ModelRecord] {
    &self.records
  }
}

/// Reinterpret a 32-bit register pattern as a two's-complement lane value
pub fn to_signed32(v: u32) -> i32 {
  v as i32
}

/// Exact sum of lane products. Each product fits in 63 bits, eight of them
/// need 66, so the accumulator is i128.
pub fn dot_wide(a: &[i32; LANES], b: &[i32; LANES]) -> i128 {
  a.iter()
    .zip(b.iter())
    .map(|(&x, &y)| i128::from(x) * i128::from(y))
    .sum()
}

/// Two's-complement truncation to the 64-bit result register pair
pub fn truncate64(value: i128) -> u64 {
  value as u64
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::simulator::csr::RegisterFile;

  fn load(regs: &mut RegisterFile, a: [i32; LANES], b: [i32; LANES]) {
    for lane in 0..LANES {
      regs.write(Csr::a(lane), a[lane] as u32);
      regs.write(Csr::b(lane), b[lane] as u32);
    }
  }

  #[test]
  fn test_to_signed32() {
    assert_eq!(to_signed32(0), 0);
    assert_eq!(to_signed32(0x7FFF_FFFF), i32::MAX);
    assert_eq!(to_signed32(0x8000_0000), i32::MIN);
    assert_eq!(to_signed32(0xFFFF_FFFF), -1);
  }

  #[test]
  fn test_wide_accumulator_does_not_overflow() {
    let a = [i32::MIN; LANES];
    let b = [i32::MIN; LANES];
    // 8 * 2^62 = 2^65
    assert_eq!(dot_wide(&a, &b), 1i128 << 65);
    assert_eq!(truncate64(1i128 << 65), 0);
    assert_eq!(truncate64(-8), 0xFFFF_FFFF_FFFF_FFF8);
  }

  #[test]
  fn test_idle_without_start_is_noop() {
    let mut regs = RegisterFile::new();
    let mut accel = DotProductAccel::default();
    load(&mut regs, [3; LANES], [4; LANES]);
    for _ in 0..20 {
      accel.tick(&mut regs);
    }
    assert_eq!(accel.state(), AccelState::Idle);
    assert_eq!(regs.read(Csr::DONE), 0);
    assert_eq!(accel.operands().0, &[0; LANES]);
  }

  #[test]
  fn test_capture_and_latency() {
    let mut regs = RegisterFile::new();
    let mut accel = DotProductAccel::new(DEFAULT_LATENCY);
    load(&mut regs, [1, -2, 3, -4, 5, -6, 7, -8], [8, 7, -6, -5, 4, 3, -2, -1]);

    regs.write(Csr::START, 1);
    accel.tick(&mut regs);
    regs.write(Csr::START, 0);
    assert_eq!(accel.state(), AccelState::Computing);
    assert!(accel.is_busy());
    assert_eq!(accel.operands().0, &[1, -2, 3, -4, 5, -6, 7, -8]);

    for _ in 1..DEFAULT_LATENCY {
      accel.tick(&mut regs);
      assert_eq!(regs.read(Csr::DONE), 0);
    }
    accel.tick(&mut regs);
    assert_eq!(accel.state(), AccelState::Done);
    assert!(!accel.is_busy());
    assert_eq!(regs.read(Csr::DONE), 1);
    assert_eq!(regs.read(Csr::RESULT_LO), 0xFFFF_FFF8);
    assert_eq!(regs.read(Csr::RESULT_HI), 0xFFFF_FFFF);
    assert_eq!(accel.result(), -8);
  }

  #[test]
  fn test_start_ignored_while_computing() {
    let mut regs = RegisterFile::new();
    let mut accel = DotProductAccel::new(4);
    load(&mut regs, [1; LANES], [1; LANES]);

    regs.write(Csr::START, 1);
    accel.tick(&mut regs);
    // Keep start high and change operands: neither may affect the pass
    load(&mut regs, [2; LANES], [2; LANES]);
    for _ in 0..4 {
      accel.tick(&mut regs);
    }
    assert_eq!(accel.state(), AccelState::Done);
    assert_eq!(accel.result(), 8);
  }

  #[test]
  fn test_done_rearms_through_idle() {
    let mut regs = RegisterFile::new();
    let mut accel = DotProductAccel::new(2);
    load(&mut regs, [1; LANES], [1; LANES]);

    regs.write(Csr::START, 1);
    accel.tick(&mut regs);
    regs.write(Csr::START, 0);
    accel.tick(&mut regs);
    accel.tick(&mut regs);
    assert_eq!(accel.state(), AccelState::Done);

    // Sticky while start stays low
    for _ in 0..5 {
      accel.tick(&mut regs);
      assert_eq!(accel.state(), AccelState::Done);
      assert_eq!(regs.read(Csr::DONE), 1);
    }

    load(&mut regs, [3; LANES], [1; LANES]);
    regs.write(Csr::START, 1);
    accel.tick(&mut regs);
    assert_eq!(accel.state(), AccelState::Idle);
    assert_eq!(regs.read(Csr::DONE), 1);
    assert_eq!(regs.read(Csr::RESULT_LO), 8);

    accel.tick(&mut regs);
    regs.write(Csr::START, 0);
    assert_eq!(accel.state(), AccelState::Computing);
    assert_eq!(regs.read(Csr::DONE), 0);
    assert_eq!(regs.read(Csr::RESULT_LO), 8);

    accel.tick(&mut regs);
    accel.tick(&mut regs);
    assert_eq!(regs.read(Csr::RESULT_LO), 24);
  }

  #[test]
  fn test_records_track_transitions() {
    let mut regs = RegisterFile::new();
    let mut accel = DotProductAccel::new(1);
    regs.write(Csr::START, 1);
    accel.tick(&mut regs);
    accel.tick(&mut regs);
    accel.tick(&mut regs);

    let actions: Vec<&str> = accel.records().iter().map(|r| r.action.as_str()).collect();
    assert_eq!(actions, vec!["capture", "complete", "rearm"]);
    assert_eq!(accel.records()[0].cycle, 1);
    assert_eq!(accel.records()[1].cycle, 2);
  }

  #[test]
  #[should_panic(expected = "at least one cycle")]
  fn test_zero_latency_rejected() {
    let _ = DotProductAccel::new(0);
  }
}
