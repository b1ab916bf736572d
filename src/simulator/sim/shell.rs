use crate::error::{DotpError, Result};
use crate::simulator::csr::Csr;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
  Step(u32), // Step N times
  Continue,
  Pulse,
  Write(Csr, u64),
  Dump,
  Quit,
}

const USAGE: &str =
  "Use Enter to step, 'si 100' to step N times, 'c' to run until done, 'p' to pulse start, 'w <reg> <value>' to write, 'r' to dump registers, 'q' to quit";

/// Parse one shell line. Errors are messages for the user, not failures.
pub fn parse_command(line: &str) -> std::result::Result<Command, String> {
  let trimmed = line.trim();

  // Empty input: step once
  if trimmed.is_empty() {
    return Ok(Command::Step(1));
  }

  let mut words = trimmed.split_whitespace();
  let head = words.next().unwrap_or_default();
  let args: Vec<&str> = words.collect();

  match (head, args.as_slice()) {
    ("si", []) => Err("'si' requires a number, e.g., 'si 100'".to_string()),
    ("si", [n]) => match n.parse::<u32>() {
      Ok(n) if n > 0 => Ok(Command::Step(n)),
      Ok(_) => Err("step count must be greater than 0".to_string()),
      Err(e) => Err(format!("invalid number '{}': {}", n, e)),
    },
    ("c", []) => Ok(Command::Continue),
    ("p", []) => Ok(Command::Pulse),
    ("r", []) => Ok(Command::Dump),
    ("q", []) => Ok(Command::Quit),
    ("w", [reg, value]) => {
      let csr = Csr::from_name(reg).map_err(|e| e.to_string())?;
      let value = parse_value(value).ok_or_else(|| format!("invalid value '{}'", value))?;
      Ok(Command::Write(csr, value))
    },
    ("w", _) => Err("usage: w <reg> <value>".to_string()),
    _ => Err(format!("Unknown command: '{}'. {}", trimmed, USAGE)),
  }
}

/// Decimal, `0x` hex, or negative decimal (stored as its two's-complement bits)
pub fn parse_value(s: &str) -> Option<u64> {
  if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
    return u64::from_str_radix(hex, 16).ok();
  }
  s.parse::<i64>().ok().map(|v| v as u64)
}

/// Line editor with history for step mode
pub struct Shell {
  editor: DefaultEditor,
}

impl Shell {
  pub fn new() -> Result<Self> {
    let editor = DefaultEditor::new().map_err(readline_err)?;
    Ok(Self { editor })
  }

  pub fn read_command(&mut self) -> Result<Command> {
    loop {
      match self.editor.readline("(dotp) ") {
        Ok(line) => {
          let trimmed = line.trim();

          // Add to history if not empty
          if !trimmed.is_empty() {
            let _ = self.editor.add_history_entry(trimmed);
          }

          match parse_command(trimmed) {
            Ok(cmd) => return Ok(cmd),
            Err(msg) => eprintln!("Error: {}", msg),
          }
        },
        // Ctrl-C / Ctrl-D: quit
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(Command::Quit),
        Err(err) => return Err(readline_err(err)),
      }
    }
  }
}

fn readline_err(err: ReadlineError) -> DotpError {
  io::Error::new(io::ErrorKind::Other, err).into()
}
