// SPDX-License-Identifier: GPL-3.0-only

use tracing_subscriber::{EnvFilter, fmt};

/// Filter used when `RUST_LOG` is unset.
pub fn default_directive(debug: bool, configured: Option<&str>) -> String {
    match configured {
        Some(directive) if !debug => directive.to_string(),
        _ if debug => "debug".to_string(),
        _ => "info".to_string(),
    }
}

/// Log to stderr; stdout carries the passphrase prompt.
pub fn init(debug: bool, configured: Option<&str>) {
    let directive = default_directive(debug, configured);
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::default_directive;

    #[test]
    fn debug_flag_wins_over_configured_level() {
        assert_eq!(default_directive(false, None), "info");
        assert_eq!(default_directive(true, None), "debug");
        assert_eq!(default_directive(false, Some("warn")), "warn");
        assert_eq!(default_directive(true, Some("warn")), "debug");
    }
}
