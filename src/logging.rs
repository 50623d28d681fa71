//! Logging setup.
//!
//! The crate logs through the `log` facade. Applications pick their own
//! logger; [`init_logging`] installs `env_logger` for those that don't.

use log::info;

/// Installs `env_logger` with `level` as the default filter.
///
/// `RUST_LOG` overrides `level`. Returns `false` when a logger was already
/// installed, which makes repeated calls harmless.
pub fn init_logging(level: &str) -> bool {
    let installed = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .try_init()
        .is_ok();
    if installed {
        info!("Logging initialized at level {}", level);
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_initialization_is_a_no_op() {
        init_logging("debug");
        assert!(!init_logging("debug"));
    }
}
