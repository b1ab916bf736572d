use crate::error::Result;
use crate::simulator::accel::{Clocked, DotProductAccel};
use crate::simulator::csr::{Csr, CsrBus};
use serde_json::json;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// JSON-lines trace, one object per model tick. The first write error is
/// kept and reported by [`finish`](Self::finish); later ticks are not traced.
pub struct TraceWriter<W: Write = BufWriter<File>> {
  out: W,
  error: Option<io::Error>,
  lines: u64,
}

impl TraceWriter<BufWriter<File>> {
  pub fn create(path: &Path) -> Result<Self> {
    Ok(Self::new(BufWriter::new(File::create(path)?)))
  }
}

impl<W: Write> TraceWriter<W> {
  pub fn new(out: W) -> Self {
    Self {
      out,
      error: None,
      lines: 0,
    }
  }

  pub fn record<B: CsrBus + ?Sized>(&mut self, model: &DotProductAccel, bus: &B) {
    if self.error.is_some() {
      return;
    }

    let entry = json!({
      "cycle": model.cycle(),
      "state": model.state(),
      "start": bus.read(Csr::START),
      "done": bus.read(Csr::DONE),
      "result_lo": bus.read(Csr::RESULT_LO),
      "result_hi": bus.read(Csr::RESULT_HI),
    });

    match writeln!(self.out, "{}", entry).and_then(|_| self.out.flush()) {
      Ok(()) => self.lines += 1,
      Err(e) => {
        log::error!("trace write failed, tracing stopped: {}", e);
        self.error = Some(e);
      },
    }
  }

  pub fn lines(&self) -> u64 {
    self.lines
  }

  pub fn finish(mut self) -> Result<W> {
    if let Some(e) = self.error.take() {
      return Err(e.into());
    }
    self.out.flush()?;
    Ok(self.out)
  }
}

/// The accelerator seen through an optional tracer. Every tick, including
/// the ones issued by the host driver, lands in the trace.
pub struct TracedModel<'a, W: Write = BufWriter<File>> {
  pub model: &'a mut DotProductAccel,
  pub trace: Option<&'a mut TraceWriter<W>>,
}

impl<W: Write> Clocked for TracedModel<'_, W> {
  fn tick<B: CsrBus + ?Sized>(&mut self, bus: &mut B) {
    self.model.tick(bus);
    if let Some(trace) = self.trace.as_mut() {
      trace.record(self.model, bus);
    }
  }

  fn is_busy(&self) -> bool {
    self.model.is_busy()
  }
}
