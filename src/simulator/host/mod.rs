pub mod driver;

pub use driver::{sw_dotp, HostDriver, DEFAULT_POLL_BUDGET};
