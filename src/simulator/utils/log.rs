/// Global logging setup
use env_logger::{Builder, Env};

/// Initialise the env_logger backend. `RUST_LOG` wins over the defaults:
/// `info`, or `warn` in quiet mode. Calling it twice is harmless.
pub fn init_log(quiet: bool) {
  let default_level = if quiet { "warn" } else { "info" };
  let _ = Builder::from_env(Env::default().default_filter_or(default_level))
    .format_timestamp(None)
    .try_init();
}
