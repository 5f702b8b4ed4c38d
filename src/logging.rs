//! Logger initialisation for binaries

use log::LevelFilter;

/// Install env_logger. `RUST_LOG` wins over `default_level`.
/// Calling it twice is harmless.
pub fn init(default_level: LevelFilter)
{   let env = env_logger::Env::default()
      .default_filter_or(default_level.to_string());
    let _ = env_logger::Builder::from_env(env)
      .format_timestamp_millis()
      .try_init();
}
