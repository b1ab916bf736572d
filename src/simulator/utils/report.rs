use crate::simulator::csr::{CsrMapEntry, Direction, RegisterFile};
use crate::simulator::sim::records::Reportable;
use std::fmt::Write;

pub fn print_simulation_records(models: &[&dyn Reportable]) {
  println!("\n--- Simulation Records ---");

  for model in models {
    print!("{}", format_model_records(*model));
  }

  println!("--- End Records ---\n");
}

pub fn format_model_records(model: &dyn Reportable) -> String {
  let mut out = String::new();
  let records = model.records();

  if !records.is_empty() {
    let _ = writeln!(out, "\n[{}] {}", model.id(), model.status());
    for record in records {
      let _ = writeln!(out, "  Cycle {}: {} {}", record.cycle, record.action, record.subject);
    }
  }
  out
}

/// 64-bit value as the firmware prints it: `0x` plus 16 upper-case digits
pub fn hex64(value: i64) -> String {
  format!("0x{:016X}", value as u64)
}

pub fn format_registers(regs: &RegisterFile) -> String {
  let mut out = String::new();
  for (csr, value) in regs.iter() {
    let _ = writeln!(out, "  {:<10} 0x{:08X}  ({})", csr.name(), value, value as i32);
  }
  out
}

pub fn format_csr_map(entries: &[CsrMapEntry]) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "{:<16} {:>10}  {:>5}  {}", "name", "address", "width", "dir");
  for entry in entries {
    let dir = match entry.direction {
      Direction::Write => "rw",
      Direction::Read => "ro",
    };
    let _ = writeln!(
      out,
      "{:<16} 0x{:08x}  {:>5}  {}",
      entry.name, entry.address, entry.width, dir
    );
  }
  let _ = writeln!(out, "Total CSRs: {}", entries.len());
  out
}
