use super::table::{check_table, Csr, CSR_COUNT, CSR_TABLE};
use super::CsrBus;

/// Bank of 32-bit CSRs shared by the host driver and the accelerator model.
/// Wider values go through [`write_masked`](Self::write_masked), which keeps
/// the low 32 bits; unwritten registers read 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFile {
  regs: [u32; CSR_COUNT],
}

impl RegisterFile {
  pub fn new() -> Self {
    check_table(&CSR_TABLE);
    Self { regs: [0; CSR_COUNT] }
  }

  pub fn read(&self, csr: Csr) -> u32 {
    self.regs[csr.index()]
  }

  pub fn write(&mut self, csr: Csr, value: u32) {
    self.regs[csr.index()] = value;
  }

  /// Store a wider value, keeping its low 32 bits
  pub fn write_masked(&mut self, csr: Csr, value: u64) {
    self.write(csr, (value & 0xFFFF_FFFF) as u32)
  }

  /// Read by name. An unknown name is a programmer error and panics.
  pub fn read_named(&self, name: &str) -> u32 {
    self.read(lookup(name))
  }

  /// Write by name. An unknown name is a programmer error and panics.
  pub fn write_named(&mut self, name: &str, value: u64) {
    self.write_masked(lookup(name), value)
  }

  /// All registers with their current values, in offset order
  pub fn iter(&self) -> impl Iterator<Item = (Csr, u32)> + '_ {
    Csr::all().map(move |csr| (csr, self.read(csr)))
  }
}

fn lookup(name: &str) -> Csr {
  match Csr::from_name(name) {
    Ok(csr) => csr,
    Err(e) => panic!("{}", e),
  }
}

impl Default for RegisterFile {
  fn default() -> Self {
    Self::new()
  }
}

impl CsrBus for RegisterFile {
  fn read(&self, csr: Csr) -> u32 {
    RegisterFile::read(self, csr)
  }

  fn write(&mut self, csr: Csr, value: u32) {
    RegisterFile::write(self, csr, value)
  }
}
