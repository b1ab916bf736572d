pub mod register_file;
pub mod table;

pub use register_file::RegisterFile;
pub use table::{csr_map, Csr, CsrDesc, CsrMapEntry, Direction, CSR_COUNT};

/// Register-level access to the accelerator. Implemented by the in-memory
/// [`RegisterFile`]; an MMIO backend for real hardware implements the same
/// contract.
pub trait CsrBus {
  fn read(&self, csr: Csr) -> u32;
  fn write(&mut self, csr: Csr, value: u32);
}
