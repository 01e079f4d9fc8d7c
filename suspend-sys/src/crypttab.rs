// SPDX-License-Identifier: GPL-3.0-only

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use suspend_types::Keyfile;
use tracing::{debug, warn};

use crate::cmdline::resolve_device_spec;
use crate::error::{Result, SysError};

const NO_KEY: &[&str] = &["", "-", "none"];

/// Key-files by volume name. A missing crypttab means no key-files.
pub fn read_crypttab(path: &Path) -> Result<BTreeMap<String, Keyfile>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(parse_crypttab(&content)),
        Err(error) if error.kind() == ErrorKind::NotFound => {
            debug!("{} does not exist", path.display());
            Ok(BTreeMap::new())
        }
        Err(error) => Err(SysError::InvalidFile {
            path: path.to_path_buf(),
            reason: error.to_string(),
        }),
    }
}

/// `NAME DEVICE [KEY [OPTIONS]]` per line. KEY may be `PATH:DEVICE` for a
/// key-file on another filesystem.
pub fn parse_crypttab(content: &str) -> BTreeMap<String, Keyfile> {
    let mut keyfiles = BTreeMap::new();

    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        let [name, _device, rest @ ..] = fields.as_slice() else {
            warn!("crypttab line {}: expected at least two fields", number + 1);
            continue;
        };

        let key = rest.first().copied().unwrap_or("");
        if NO_KEY.contains(&key) || (key.starts_with("/dev/") && key.ends_with("random")) {
            continue;
        }

        let keyfile = match key.split_once(':') {
            Some((path, device)) if !path.is_empty() && !device.is_empty() => {
                Keyfile::on_device(resolve_device_spec(device), None, path)
            }
            Some(_) => {
                warn!("crypttab line {}: malformed key {key}", number + 1);
                continue;
            }
            None => Keyfile::at(key),
        };
        keyfiles.insert(name.to_string(), keyfile);
    }

    keyfiles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_real_keyfiles_only() {
        let content = "\
# <name> <device> <password> <options>
crypthome  UUID=1111  /etc/keys/home.key  luks
cryptswap  /dev/sda3  /dev/urandom        swap,cipher=aes-xts-plain64
cryptdata  UUID=2222  none                luks
cryptold   UUID=3333  -
cryptusb   UUID=4444  /usb.key:LABEL=keys luks
lonely

cryptbare  UUID=5555
";
        let keyfiles = parse_crypttab(content);
        assert_eq!(
            keyfiles.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["crypthome", "cryptusb"]
        );
        assert_eq!(keyfiles["crypthome"], Keyfile::at("/etc/keys/home.key"));
        assert_eq!(
            keyfiles["cryptusb"],
            Keyfile::on_device("/dev/disk/by-label/keys", None, "/usb.key")
        );
    }

    #[test]
    fn missing_file_is_empty() {
        let keyfiles = read_crypttab(Path::new("/nonexistent/crypttab")).expect("read");
        assert!(keyfiles.is_empty());
    }
}
