pub mod dotp;

pub use dotp::{dot_wide, to_signed32, truncate64, AccelState, DotProductAccel, DEFAULT_LATENCY, LANES};

use crate::simulator::csr::CsrBus;

/// Anything the host can advance by one clock against a register bus
pub trait Clocked {
  fn tick<B: CsrBus + ?Sized>(&mut self, bus: &mut B);

  /// A captured pass has not published its result yet. `done` reads 0 both
  /// here and in idle, so the register bus alone cannot tell.
  fn is_busy(&self) -> bool;
}
