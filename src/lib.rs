pub mod error;
pub mod simulator;

pub use error::{DotpError, Result};
pub use simulator::accel::{AccelState, DotProductAccel, LANES};
pub use simulator::csr::{Csr, CsrBus, RegisterFile};
pub use simulator::host::driver::HostDriver;
pub use simulator::sim::mode::{SimConfig, StepMode};
pub use simulator::Simulator;
