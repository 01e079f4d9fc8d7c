// SPDX-License-Identifier: GPL-3.0-only

use std::collections::BTreeMap;

use thiserror::Error;

use crate::volume::{Keyfile, Volume};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("volume with empty name")]
    EmptyName,

    #[error("duplicate volume name: {0}")]
    DuplicateName(String),

    #[error("more than one root volume: {first} and {second}")]
    MultipleRoots { first: String, second: String },
}

/// Ordered catalog of encrypted volumes for one suspend/resume cycle.
///
/// Order is significant: locking walks it backwards and resuming walks it
/// forwards, so the constructors never reorder except
/// [`VolumeRegistry::from_discovery`], which moves the root volume to the
/// front once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeRegistry {
    volumes: Vec<Volume>,
}

impl VolumeRegistry {
    /// Validate and keep the given order.
    pub fn new(volumes: Vec<Volume>) -> Result<Self, RegistryError> {
        validate(&volumes)?;
        Ok(Self { volumes })
    }

    /// Validate discovered volumes and put the root volume first, keeping
    /// the others in discovery order.
    pub fn from_discovery(mut volumes: Vec<Volume>) -> Result<Self, RegistryError> {
        validate(&volumes)?;
        if let Some(index) = volumes.iter().position(|volume| volume.is_root) {
            let root = volumes.remove(index);
            volumes.insert(0, root);
        }
        Ok(Self { volumes })
    }

    pub fn volumes(&self) -> &[Volume] {
        &self.volumes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Volume> {
        self.volumes.iter()
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    pub fn root(&self) -> Option<&Volume> {
        self.volumes.iter().find(|volume| volume.is_root)
    }

    /// The volume whose resume ends the strict phase: the root volume, or
    /// the first volume when none backs the root filesystem.
    pub fn gate(&self) -> Option<&Volume> {
        self.root().or_else(|| self.volumes.first())
    }

    /// Every volume except the gate, in registry order.
    pub fn after_gate(&self) -> impl Iterator<Item = &Volume> {
        let gate = self.gate().map(|volume| volume.name.clone());
        self.volumes
            .iter()
            .filter(move |volume| Some(&volume.name) != gate.as_ref())
    }

    pub fn get(&self, name: &str) -> Option<&Volume> {
        self.volumes.iter().find(|volume| volume.name == name)
    }

    /// Attach key-files to the non-root volumes they name. The root volume's
    /// key-file comes from the kernel command line and is left alone.
    /// Returns how many volumes gained a key-file.
    pub fn apply_keyfiles(&mut self, mut keyfiles: BTreeMap<String, Keyfile>) -> usize {
        let mut applied = 0;
        for volume in self.volumes.iter_mut().filter(|volume| !volume.is_root) {
            if let Some(keyfile) = keyfiles.remove(&volume.name) {
                volume.keyfile = Some(keyfile);
                applied += 1;
            }
        }
        applied
    }

    pub fn into_vec(self) -> Vec<Volume> {
        self.volumes
    }
}

impl<'a> IntoIterator for &'a VolumeRegistry {
    type Item = &'a Volume;
    type IntoIter = std::slice::Iter<'a, Volume>;

    fn into_iter(self) -> Self::IntoIter {
        self.volumes.iter()
    }
}

fn validate(volumes: &[Volume]) -> Result<(), RegistryError> {
    let mut root: Option<&str> = None;
    for (index, volume) in volumes.iter().enumerate() {
        if volume.name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if volumes[..index].iter().any(|seen| seen.name == volume.name) {
            return Err(RegistryError::DuplicateName(volume.name.clone()));
        }
        if volume.is_root {
            if let Some(first) = root {
                return Err(RegistryError::MultipleRoots {
                    first: first.to_string(),
                    second: volume.name.clone(),
                });
            }
            root = Some(&volume.name);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(registry: &VolumeRegistry) -> Vec<&str> {
        registry.iter().map(|volume| volume.name.as_str()).collect()
    }

    #[test]
    fn discovery_moves_root_first() {
        let registry = VolumeRegistry::from_discovery(vec![
            Volume::new("swap", false),
            Volume::new("root", true),
            Volume::new("home", false),
        ])
        .expect("valid registry");

        assert_eq!(names(&registry), vec!["root", "swap", "home"]);
        assert_eq!(registry.gate().map(|v| v.name.as_str()), Some("root"));
        assert_eq!(
            registry.after_gate().map(|v| v.name.as_str()).collect::<Vec<_>>(),
            vec!["swap", "home"]
        );
    }

    #[test]
    fn new_keeps_order() {
        let volumes = vec![Volume::new("a", false), Volume::new("root", true)];
        let registry = VolumeRegistry::new(volumes.clone()).expect("valid registry");
        assert_eq!(registry.into_vec(), volumes);
    }

    #[test]
    fn rejects_two_roots() {
        let err = VolumeRegistry::new(vec![Volume::new("a", true), Volume::new("b", true)])
            .expect_err("two roots");
        assert_eq!(
            err,
            RegistryError::MultipleRoots {
                first: "a".into(),
                second: "b".into()
            }
        );
    }

    #[test]
    fn rejects_duplicates_and_empty_names() {
        assert_eq!(
            VolumeRegistry::new(vec![Volume::new("a", false), Volume::new("a", false)]),
            Err(RegistryError::DuplicateName("a".into()))
        );
        assert_eq!(
            VolumeRegistry::new(vec![Volume::new(" ", false)]),
            Err(RegistryError::EmptyName)
        );
    }

    #[test]
    fn gate_falls_back_to_first_volume() {
        let registry =
            VolumeRegistry::new(vec![Volume::new("data", false), Volume::new("media", false)])
                .expect("valid registry");
        assert!(registry.root().is_none());
        assert_eq!(registry.gate().map(|v| v.name.as_str()), Some("data"));
        assert_eq!(registry.after_gate().count(), 1);
    }

    #[test]
    fn keyfiles_skip_root_volume() {
        let mut registry = VolumeRegistry::from_discovery(vec![
            Volume::new("root", true),
            Volume::new("home", false),
        ])
        .expect("valid registry");

        let mut keyfiles = BTreeMap::new();
        keyfiles.insert("root".to_string(), Keyfile::at("/etc/keys/root.key"));
        keyfiles.insert("home".to_string(), Keyfile::at("/etc/keys/home.key"));
        keyfiles.insert("gone".to_string(), Keyfile::at("/etc/keys/gone.key"));

        assert_eq!(registry.apply_keyfiles(keyfiles), 1);
        assert!(registry.get("root").is_some_and(|v| v.keyfile.is_none()));
        assert!(registry.get("home").is_some_and(|v| v.has_keyfile()));
    }
}
