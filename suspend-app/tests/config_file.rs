// SPDX-License-Identifier: GPL-3.0-only

use std::fs;
use std::path::PathBuf;

use luks_suspend::config::Config;
use suspend_contracts::SuspendErrorKind;

fn scratch(name: &str, content: &str) -> PathBuf {
    let path = std::env::temp_dir()
        .join(format!("luks-suspend-{name}-{}.toml", std::process::id()));
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn loads_config_from_disk() {
    let path = scratch("ok", "debug = true\n[paths]\ncryptsetup = \"/sbin/cryptsetup\"\n");
    let config = Config::load(&path).unwrap();
    assert!(config.debug);
    assert_eq!(config.paths.cryptsetup, PathBuf::from("/sbin/cryptsetup"));
    fs::remove_file(&path).unwrap();
}

#[test]
fn malformed_config_names_the_file() {
    let path = scratch("bad", "debug = maybe\n");
    let error = Config::load(&path).unwrap_err();
    assert_eq!(error.kind, SuspendErrorKind::Config);
    assert!(error.message.starts_with(&path.display().to_string()));
    fs::remove_file(&path).unwrap();
}
