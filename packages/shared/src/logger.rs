//! Logger setup.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Build the default filter directive for a binary.
///
/// Cargo binary names use `-` while tracing targets use the crate's `_` form,
/// so `chatelly-server` becomes `chatelly_server=<level>`.
pub fn default_directive(bin_name: &str, default_level: &str) -> String {
    format!(
        "{}={level},tower_http={level}",
        bin_name.replace('-', "_"),
        level = default_level
    )
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `default_level`. Calling this more than
/// once is harmless: later calls leave the first subscriber in place.
pub fn setup_logger(bin_name: &str, default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(bin_name, default_level)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_uses_crate_target() {
        // テスト項目: バイナリ名のハイフンがアンダースコアに変換される
        // when (操作):
        let directive = default_directive("chatelly-server", "debug");

        // then (期待する結果):
        assert_eq!(directive, "chatelly_server=debug,tower_http=debug");
    }

    #[test]
    fn test_setup_logger_twice_does_not_panic() {
        // テスト項目: 2 回呼び出してもパニックしない
        setup_logger("chatelly-server", "info");
        setup_logger("chatelly-server", "debug");
    }
}
