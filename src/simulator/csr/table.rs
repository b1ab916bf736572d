use crate::error::{DotpError, Result};
use crate::simulator::accel::LANES;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Number of CSRs exposed by the accelerator
pub const CSR_COUNT: usize = 2 * LANES + 4;

/// Prefix the SoC generator puts in front of every accelerator CSR
pub const SOC_PREFIX: &str = "dotp_";

/// Bytes between consecutive CSRs on the host bus
pub const CSR_STRIDE: u64 = 4;

/// Who writes the register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
  /// Host writes, accelerator samples (storage)
  Write,
  /// Accelerator writes, host reads (status)
  Read,
}

/// Static description of one CSR
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CsrDesc {
  pub name: &'static str,
  /// Significant bits; everything is stored in 32
  pub width: u8,
  pub direction: Direction,
  /// Word offset inside the accelerator's CSR block
  pub offset: u16,
}

const fn storage(name: &'static str, width: u8, offset: u16) -> CsrDesc {
  CsrDesc {
    name,
    width,
    direction: Direction::Write,
    offset,
  }
}

const fn status(name: &'static str, width: u8, offset: u16) -> CsrDesc {
  CsrDesc {
    name,
    width,
    direction: Direction::Read,
    offset,
  }
}

/// CSR map in offset order. Operand lanes are interleaved (a0, b0, a1, b1, ...)
/// the same way the SoC integration lays them out.
pub static CSR_TABLE: [CsrDesc; CSR_COUNT] = [
  storage("a0", 32, 0),
  storage("b0", 32, 1),
  storage("a1", 32, 2),
  storage("b1", 32, 3),
  storage("a2", 32, 4),
  storage("b2", 32, 5),
  storage("a3", 32, 6),
  storage("b3", 32, 7),
  storage("a4", 32, 8),
  storage("b4", 32, 9),
  storage("a5", 32, 10),
  storage("b5", 32, 11),
  storage("a6", 32, 12),
  storage("b6", 32, 13),
  storage("a7", 32, 14),
  storage("b7", 32, 15),
  storage("start", 1, 16),
  status("done", 1, 17),
  status("result_lo", 32, 18),
  status("result_hi", 32, 19),
];

/// Panics if the descriptor table is malformed: offsets must be dense and in
/// order, names unique, widths within 1..=32.
pub(crate) fn check_table(table: &[CsrDesc]) {
  for (i, desc) in table.iter().enumerate() {
    assert_eq!(
      desc.offset as usize, i,
      "CSR {} has offset {} but sits at index {}",
      desc.name, desc.offset, i
    );
    assert!(
      (1..=32).contains(&desc.width),
      "CSR {} has invalid width {}",
      desc.name,
      desc.width
    );
    assert!(
      table[..i].iter().all(|other| other.name != desc.name),
      "duplicate CSR name {}",
      desc.name
    );
  }
}

/// Handle to one entry of [`CSR_TABLE`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Csr(u8);

impl Csr {
  pub const START: Csr = Csr(2 * LANES as u8);
  pub const DONE: Csr = Csr(2 * LANES as u8 + 1);
  pub const RESULT_LO: Csr = Csr(2 * LANES as u8 + 2);
  pub const RESULT_HI: Csr = Csr(2 * LANES as u8 + 3);

  /// Operand A, lane `lane`
  pub const fn a(lane: usize) -> Csr {
    assert!(lane < LANES, "operand lane out of range");
    Csr((2 * lane) as u8)
  }

  /// Operand B, lane `lane`
  pub const fn b(lane: usize) -> Csr {
    assert!(lane < LANES, "operand lane out of range");
    Csr((2 * lane + 1) as u8)
  }

  /// Look up a register by name. Accepts the bare name (`a0`) and the
  /// SoC-level name (`dotp_a0`).
  pub fn from_name(name: &str) -> Result<Csr> {
    let bare = name.strip_prefix(SOC_PREFIX).unwrap_or(name);
    CSR_TABLE
      .iter()
      .position(|desc| desc.name == bare)
      .map(|idx| Csr(idx as u8))
      .ok_or_else(|| DotpError::UnknownRegister { name: name.to_string() })
  }

  pub fn all() -> impl Iterator<Item = Csr> {
    (0..CSR_COUNT as u8).map(Csr)
  }

  pub fn desc(self) -> &'static CsrDesc {
    &CSR_TABLE[self.index()]
  }

  pub fn name(self) -> &'static str {
    self.desc().name
  }

  pub fn index(self) -> usize {
    self.0 as usize
  }

  /// Byte address on a host bus whose CSR block starts at `base`
  pub fn byte_addr(self, base: u64) -> u64 {
    base + u64::from(self.desc().offset) * CSR_STRIDE
  }
}

impl fmt::Display for Csr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for Csr {
  type Err = DotpError;

  fn from_str(s: &str) -> Result<Self> {
    Csr::from_name(s)
  }
}

/// One row of the printable CSR map
#[derive(Debug, Clone, Serialize)]
pub struct CsrMapEntry {
  pub name: String,
  pub address: u64,
  pub offset: u16,
  pub width: u8,
  pub direction: Direction,
}

/// Full CSR map with SoC-level names and byte addresses
pub fn csr_map(base: u64) -> Vec<CsrMapEntry> {
  Csr::all()
    .map(|csr| {
      let desc = csr.desc();
      CsrMapEntry {
        name: format!("{}{}", SOC_PREFIX, desc.name),
        address: csr.byte_addr(base),
        offset: desc.offset,
        width: desc.width,
        direction: desc.direction,
      }
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_table_is_well_formed() {
    check_table(&CSR_TABLE);
    assert_eq!(CSR_COUNT, 20);
  }

  #[test]
  fn test_lane_handles_match_names() {
    for lane in 0..LANES {
      assert_eq!(Csr::a(lane).name(), format!("a{}", lane));
      assert_eq!(Csr::b(lane).name(), format!("b{}", lane));
    }
    assert_eq!(Csr::START.name(), "start");
    assert_eq!(Csr::DONE.name(), "done");
    assert_eq!(Csr::RESULT_LO.name(), "result_lo");
    assert_eq!(Csr::RESULT_HI.name(), "result_hi");
  }

  #[test]
  fn test_from_name_accepts_soc_prefix() {
    assert_eq!(Csr::from_name("b3").unwrap(), Csr::b(3));
    assert_eq!(Csr::from_name("dotp_result_hi").unwrap(), Csr::RESULT_HI);
    assert_eq!("start".parse::<Csr>().unwrap(), Csr::START);
  }

  #[test]
  fn test_from_name_rejects_unknown() {
    for bad in ["a8", "b", "Done", "dotp_", "result"] {
      match Csr::from_name(bad) {
        Err(DotpError::UnknownRegister { name }) => assert_eq!(name, bad),
        other => panic!("expected UnknownRegister for {}, got {:?}", bad, other),
      }
    }
  }

  #[test]
  fn test_csr_map_addresses() {
    let map = csr_map(0xf000_0000);
    assert_eq!(map.len(), CSR_COUNT);
    assert_eq!(map[0].name, "dotp_a0");
    assert_eq!(map[0].address, 0xf000_0000);
    assert_eq!(map[1].name, "dotp_b0");
    assert_eq!(map[16].name, "dotp_start");
    assert_eq!(map[19].address, 0xf000_0000 + 19 * 4);
    assert_eq!(map[17].direction, Direction::Read);
    assert_eq!(map[16].width, 1);
  }
}
