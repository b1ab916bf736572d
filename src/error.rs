//! Error types for accelerator simulation and host-driver operations

use thiserror::Error;

/// Result type alias for dot-product simulator operations
pub type Result<T> = std::result::Result<T, DotpError>;

/// Errors reported to callers of the host driver and simulator
#[derive(Debug, Error)]
pub enum DotpError {
  /// `done` never became set within the polling budget
  #[error("accelerator did not finish within {budget} cycles")]
  Timeout {
    /// Number of ticks spent polling
    budget: u32,
  },

  /// A new pass was requested while the previous one is still computing
  #[error("accelerator busy: previous pass still computing")]
  Busy,

  /// Hardware result differs from the software reference
  #[error("result mismatch: software {expected:#018x}, hardware {actual:#018x}")]
  Mismatch {
    /// Reference value computed on the host
    expected: i64,
    /// Value reconstructed from result_lo/result_hi
    actual: i64,
  },

  /// User-supplied register name is not part of the CSR map
  #[error("unknown register: {name}")]
  UnknownRegister {
    /// Name as given
    name: String,
  },

  /// Configuration rejected by validation
  #[error("invalid configuration: {reason}")]
  Config {
    /// What was wrong
    reason: String,
  },

  /// I/O error from config, trace or shell handling
  #[error("I/O error: {source}")]
  Io {
    /// Underlying I/O error
    #[from]
    source: std::io::Error,
  },
}

impl DotpError {
  /// Create a configuration error
  pub fn config(reason: impl Into<String>) -> Self {
    Self::Config { reason: reason.into() }
  }

  /// Whether the caller can retry, e.g. by polling the pending pass to
  /// completion with a larger budget
  pub fn is_recoverable(&self) -> bool {
    matches!(self, Self::Timeout { .. } | Self::Busy)
  }
}
