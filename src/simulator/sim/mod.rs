pub mod mode;
pub mod model;
pub mod records;
pub mod shell;

pub use mode::{SimConfig, StepMode};
pub use model::{TraceWriter, TracedModel};
