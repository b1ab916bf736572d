use crate::error::{DotpError, Result};
use crate::simulator::accel::{Clocked, LANES};
use crate::simulator::csr::{Csr, CsrBus};
use log::{debug, warn};

/// Default number of ticks `dot_product` waits for `done`
pub const DEFAULT_POLL_BUDGET: u32 = 20;

/// Host side of the CSR handshake. Holds nothing but the polling budget; all
/// state lives in the register bus and the accelerator model. Apart from the
/// busy check in [`dot_product`](Self::dot_product) only register reads and
/// writes are used, so the same sequence drives real hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostDriver {
  poll_budget: u32,
}

impl HostDriver {
  pub fn new(poll_budget: u32) -> Self {
    Self { poll_budget }
  }

  pub fn poll_budget(&self) -> u32 {
    self.poll_budget
  }

  /// Write both operand vectors as raw 32-bit patterns
  pub fn write_vectors<B: CsrBus + ?Sized>(bus: &mut B, a: &[i32; LANES], b: &[i32; LANES]) {
    for lane in 0..LANES {
      bus.write(Csr::a(lane), a[lane] as u32);
      bus.write(Csr::b(lane), b[lane] as u32);
    }
  }

  /// Raise `start` for exactly one tick, then clear it
  pub fn pulse_start<B: CsrBus + ?Sized, M: Clocked>(bus: &mut B, model: &mut M) {
    bus.write(Csr::START, 1);
    model.tick(bus);
    bus.write(Csr::START, 0);
  }

  /// Tick the model until `done` reads 1, at most `max_cycles` times.
  /// Returns the number of ticks spent. A zero budget is rejected.
  pub fn poll_done<B: CsrBus + ?Sized, M: Clocked>(bus: &mut B, model: &mut M, max_cycles: u32) -> Result<u32> {
    if max_cycles == 0 {
      return Err(DotpError::config("poll budget must be at least 1"));
    }
    for spent in 1..=max_cycles {
      model.tick(bus);
      if bus.read(Csr::DONE) == 1 {
        debug!("done after {} polling cycles", spent);
        return Ok(spent);
      }
    }
    warn!("accelerator not done after {} cycles", max_cycles);
    Err(DotpError::Timeout { budget: max_cycles })
  }

  /// Reassemble the signed 64-bit result from its two halves
  pub fn read_result<B: CsrBus + ?Sized>(bus: &B) -> i64 {
    let lo = u64::from(bus.read(Csr::RESULT_LO));
    let hi = u64::from(bus.read(Csr::RESULT_HI));
    ((hi << 32) | lo) as i64
  }

  /// Full write, start, poll, read sequence. An accelerator still showing
  /// `done` needs one extra pulse to fall back to idle before it captures.
  ///
  /// Fails with [`DotpError::Busy`] while an earlier pass (one that timed
  /// out, say) is still computing: its start pulse would be ignored and the
  /// old result read back. Drain it with [`poll_done`](Self::poll_done).
  pub fn dot_product<B: CsrBus + ?Sized, M: Clocked>(
    &self,
    bus: &mut B,
    model: &mut M,
    a: &[i32; LANES],
    b: &[i32; LANES],
  ) -> Result<i64> {
    if model.is_busy() {
      warn!("dot product requested while the previous pass is still computing");
      return Err(DotpError::Busy);
    }
    Self::write_vectors(bus, a, b);
    if bus.read(Csr::DONE) == 1 {
      Self::pulse_start(bus, model);
    }
    Self::pulse_start(bus, model);
    Self::poll_done(bus, model, self.poll_budget)?;
    Ok(Self::read_result(bus))
  }

  /// Run on the accelerator and compare with the software reference
  pub fn self_check<B: CsrBus + ?Sized, M: Clocked>(
    &self,
    bus: &mut B,
    model: &mut M,
    a: &[i32; LANES],
    b: &[i32; LANES],
  ) -> Result<i64> {
    let expected = sw_dotp(a, b);
    let actual = self.dot_product(bus, model, a, b)?;
    if actual != expected {
      return Err(DotpError::Mismatch { expected, actual });
    }
    Ok(actual)
  }
}

impl Default for HostDriver {
  fn default() -> Self {
    Self::new(DEFAULT_POLL_BUDGET)
  }
}

/// Software dot product with 64-bit wrapping accumulation, matching the
/// accelerator's truncated result bit for bit
pub fn sw_dotp(a: &[i32; LANES], b: &[i32; LANES]) -> i64 {
  a.iter()
    .zip(b.iter())
    .fold(0i64, |acc, (&x, &y)| acc.wrapping_add(i64::from(x) * i64::from(y)))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::simulator::accel::{AccelState, DotProductAccel, DEFAULT_LATENCY};
  use crate::simulator::csr::RegisterFile;

  const A: [i32; LANES] = [1, -2, 3, -4, 5, -6, 7, -8];
  const B: [i32; LANES] = [8, 7, -6, -5, 4, 3, -2, -1];

  #[test]
  fn test_write_vectors_stores_bit_patterns() {
    let mut regs = RegisterFile::new();
    HostDriver::write_vectors(&mut regs, &A, &B);
    assert_eq!(regs.read(Csr::a(0)), 1);
    assert_eq!(regs.read(Csr::a(1)), 0xFFFF_FFFE);
    assert_eq!(regs.read(Csr::b(7)), 0xFFFF_FFFF);
  }

  #[test]
  fn test_pulse_start_clears_start() {
    let mut regs = RegisterFile::new();
    let mut accel = DotProductAccel::default();
    HostDriver::pulse_start(&mut regs, &mut accel);
    assert_eq!(regs.read(Csr::START), 0);
    assert_eq!(accel.state(), AccelState::Computing);
    assert_eq!(accel.cycle(), 1);
  }

  #[test]
  fn test_poll_done_counts_latency() {
    let mut regs = RegisterFile::new();
    let mut accel = DotProductAccel::default();
    HostDriver::write_vectors(&mut regs, &A, &B);
    HostDriver::pulse_start(&mut regs, &mut accel);
    let spent = HostDriver::poll_done(&mut regs, &mut accel, 20).unwrap();
    assert_eq!(spent, DEFAULT_LATENCY);
    assert_eq!(HostDriver::read_result(&regs), -8);
  }

  #[test]
  fn test_poll_done_times_out() {
    let mut regs = RegisterFile::new();
    let mut accel = DotProductAccel::default();
    HostDriver::pulse_start(&mut regs, &mut accel);
    let err = HostDriver::poll_done(&mut regs, &mut accel, DEFAULT_LATENCY - 1).unwrap_err();
    assert!(matches!(err, DotpError::Timeout { budget } if budget == DEFAULT_LATENCY - 1));
    assert!(err.is_recoverable());

    // A larger budget picks up where the first one stopped
    assert_eq!(HostDriver::poll_done(&mut regs, &mut accel, 5).unwrap(), 1);
  }

  #[test]
  fn test_poll_done_without_start_times_out() {
    let mut regs = RegisterFile::new();
    let mut accel = DotProductAccel::default();
    assert!(HostDriver::poll_done(&mut regs, &mut accel, 100).is_err());
  }

  #[test]
  fn test_read_result_sign_extension() {
    let mut regs = RegisterFile::new();
    regs.write(Csr::RESULT_LO, 0xFFFF_FFF8);
    regs.write(Csr::RESULT_HI, 0xFFFF_FFFF);
    assert_eq!(HostDriver::read_result(&regs), -8);

    regs.write(Csr::RESULT_LO, 0xFFFF_FFFF);
    regs.write(Csr::RESULT_HI, 0x7FFF_FFFF);
    assert_eq!(HostDriver::read_result(&regs), i64::MAX);

    regs.write(Csr::RESULT_LO, 0);
    regs.write(Csr::RESULT_HI, 0x8000_0000);
    assert_eq!(HostDriver::read_result(&regs), i64::MIN);
  }

  #[test]
  fn test_dot_product_back_to_back() {
    let mut regs = RegisterFile::new();
    let mut accel = DotProductAccel::default();
    let driver = HostDriver::default();

    assert_eq!(driver.dot_product(&mut regs, &mut accel, &A, &B).unwrap(), -8);
    assert_eq!(accel.state(), AccelState::Done);
    assert_eq!(driver.dot_product(&mut regs, &mut accel, &[1; LANES], &[2; LANES]).unwrap(), 16);
  }

  #[test]
  fn test_self_check_passes_on_worked_example() {
    let mut regs = RegisterFile::new();
    let mut accel = DotProductAccel::default();
    assert_eq!(HostDriver::default().self_check(&mut regs, &mut accel, &A, &B).unwrap(), -8);
  }

  #[test]
  fn test_self_check_reports_timeout_for_slow_model() {
    let mut regs = RegisterFile::new();
    let mut accel = DotProductAccel::new(50);
    let err = HostDriver::new(10).self_check(&mut regs, &mut accel, &A, &B).unwrap_err();
    assert!(matches!(err, DotpError::Timeout { budget: 10 }));
  }

  #[test]
  fn test_dot_product_refuses_while_previous_pass_computing() {
    let mut regs = RegisterFile::new();
    let mut accel = DotProductAccel::default();

    let err = HostDriver::new(3).dot_product(&mut regs, &mut accel, &[1; LANES], &[1; LANES]).unwrap_err();
    assert!(matches!(err, DotpError::Timeout { budget: 3 }));
    assert!(accel.is_busy());

    // The new operands must not be paired with the old pass's result
    let driver = HostDriver::default();
    let err = driver.dot_product(&mut regs, &mut accel, &[2; LANES], &[3; LANES]).unwrap_err();
    assert!(matches!(err, DotpError::Busy));
    assert!(err.is_recoverable());
    assert_eq!(regs.read(Csr::a(0)), 1);

    // Drain the old pass, then the new one runs normally
    HostDriver::poll_done(&mut regs, &mut accel, 20).unwrap();
    assert_eq!(HostDriver::read_result(&regs), 8);
    assert_eq!(driver.dot_product(&mut regs, &mut accel, &[2; LANES], &[3; LANES]).unwrap(), 48);
  }

  #[test]
  fn test_poll_done_rejects_zero_budget() {
    let mut regs = RegisterFile::new();
    let mut accel = DotProductAccel::new(1);
    HostDriver::pulse_start(&mut regs, &mut accel);
    HostDriver::poll_done(&mut regs, &mut accel, 1).unwrap();
    assert_eq!(regs.read(Csr::DONE), 1);

    let cycle = accel.cycle();
    let err = HostDriver::poll_done(&mut regs, &mut accel, 0).unwrap_err();
    assert!(matches!(err, DotpError::Config { .. }));
    assert!(!err.is_recoverable());
    assert_eq!(accel.cycle(), cycle);
  }

  #[test]
  fn test_sw_dotp_wraps_like_hardware() {
    let max = [i32::MAX; LANES];
    // 8 * (2^31 - 1)^2 = 2^65 - 2^35 + 8, which wraps to 8 - 2^35
    assert_eq!(sw_dotp(&max, &max), 8 - (1i64 << 35));
    assert_eq!(sw_dotp(&A, &B), -8);
  }
}
