pub mod accel;
pub mod config;
pub mod csr;
pub mod host;
pub mod sim;
pub mod simulator;
pub mod utils;

pub use simulator::Simulator;
