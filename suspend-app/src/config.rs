// SPDX-License-Identifier: GPL-3.0-only

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::Deserialize;
use suspend_contracts::SuspendError;
use suspend_types::HostPaths;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/luks-suspend.toml";

/// `/etc/luks-suspend.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub debug: bool,

    /// tracing filter directive, e.g. `"debug"` or `"suspend_core=trace"`
    pub log_level: Option<String>,

    pub paths: HostPaths,
}

impl Config {
    /// A missing file gives the defaults; an unreadable or malformed one is
    /// an error.
    pub fn load(path: &Path) -> Result<Self, SuspendError> {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content)
                .map_err(|error| error.context(path.display())),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(SuspendError::config(format!("{}: {error}", path.display()))),
        }
    }

    pub fn parse(content: &str) -> Result<Self, SuspendError> {
        toml::from_str(content).map_err(|error| SuspendError::config(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use suspend_contracts::SuspendErrorKind;

    #[test]
    fn empty_file_is_all_defaults() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn overrides_paths_individually() {
        let config = Config::parse(
            r#"
debug = true
log_level = "suspend_core=trace"

[paths]
initramfs_dir = "/run/suspend-root"
sleep_hook_dir = "/etc/luks-suspend/hooks"
"#,
        )
        .unwrap();

        assert!(config.debug);
        assert_eq!(config.log_level.as_deref(), Some("suspend_core=trace"));
        assert_eq!(config.paths.initramfs_dir, PathBuf::from("/run/suspend-root"));
        assert_eq!(config.paths.crypttab, PathBuf::from("/etc/crypttab"));
    }

    #[test]
    fn unknown_keys_are_config_errors() {
        let error = Config::parse("[paths]\ncryptab = \"/etc/x\"\n").unwrap_err();
        assert_eq!(error.kind, SuspendErrorKind::Config);
    }

    #[test]
    fn missing_file_is_default() {
        let config = Config::load(Path::new("/nonexistent/luks-suspend.toml")).unwrap();
        assert_eq!(config, Config::default());
    }
}
