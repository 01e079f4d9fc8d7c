// SPDX-License-Identifier: GPL-3.0-only

use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;
use luks_suspend::cli::ResumeCli;
use luks_suspend::config::Config;
use suspend_sys::environment::InitramfsChroot;

fn argv(chroot: &InitramfsChroot, debug: bool) -> Vec<OsString> {
    let mut argv = vec![OsString::from("initramfs-suspend")];
    argv.extend(chroot.child_args(debug));
    argv
}

#[test]
fn configured_paths_reach_the_resume_binary() {
    let config = Config::parse(
        "[paths]\ncryptsetup = \"/sbin/cryptsetup\"\nkey_mount_dir = \"/run/keys\"\n",
    )
    .unwrap();

    let chroot = InitramfsChroot::for_paths(&config.paths);
    let cli = ResumeCli::try_parse_from(argv(&chroot, true)).unwrap();

    assert!(cli.debug);
    assert_eq!(cli.state_fd, 3);
    let paths = cli.paths();
    assert_eq!(paths.cryptsetup, PathBuf::from("/sbin/cryptsetup"));
    assert_eq!(paths.key_mount_dir, PathBuf::from("/run/keys"));
}

#[test]
fn default_paths_round_trip_unchanged() {
    let config = Config::default();
    let chroot = InitramfsChroot::for_paths(&config.paths);
    let cli = ResumeCli::try_parse_from(argv(&chroot, false)).unwrap();

    assert!(!cli.debug);
    assert_eq!(cli.paths().cryptsetup, config.paths.cryptsetup);
    assert_eq!(cli.paths().key_mount_dir, config.paths.key_mount_dir);
}
