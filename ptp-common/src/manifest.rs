//! Install Manifest
//!
//! The five artifacts the package ships and where each one lands.

use crate::paths::install;
use std::path::{Component, Path, PathBuf};

/// Front-end executable name
pub const FRONTEND_BIN: &str = "plymouth-theme-preview";

/// Privileged helper executable name
pub const HELPER_BIN: &str = "plymouth-theme-preview-helper";

/// System bus policy
pub const DBUS_CONF: &str = "ru.gentoo.plymouth_theme_preview_helper.conf";

/// System bus activation file
pub const DBUS_SERVICE: &str = "ru.gentoo.plymouth_theme_preview_helper.service";

/// Polkit action definitions
pub const POLKIT_POLICY: &str = "ru.gentoo.plymouth_theme_preview.policy";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Built by cargo, looked up in the binary directory
    Binary,
    /// Shipped verbatim from the data directory
    Data,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallEntry {
    /// File name, identical at source and destination
    pub source: &'static str,
    /// Absolute destination directory
    pub dest_dir: PathBuf,
    pub kind: EntryKind,
}

impl InstallEntry {
    /// Unix permission bits for the installed file
    pub fn mode(&self) -> u32 {
        match self.kind {
            EntryKind::Binary => 0o755,
            EntryKind::Data => 0o644,
        }
    }

    /// Final path of the installed file, re-rooted under `destdir` when staging
    pub fn destination(&self, destdir: Option<&Path>) -> PathBuf {
        let target = self.dest_dir.join(self.source);
        match destdir {
            Some(root) => rebase(root, &target),
            None => target,
        }
    }
}

/// Join an absolute path below `root`, dropping its leading `/`
fn rebase(root: &Path, absolute: &Path) -> PathBuf {
    let relative: PathBuf = absolute
        .components()
        .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
        .collect();
    root.join(relative)
}

/// The full install layout; `prefix` only affects the front-end binary
pub fn manifest(prefix: &Path) -> Vec<InstallEntry> {
    vec![
        InstallEntry {
            source: FRONTEND_BIN,
            dest_dir: prefix.join("bin"),
            kind: EntryKind::Binary,
        },
        InstallEntry {
            source: HELPER_BIN,
            dest_dir: PathBuf::from(install::LIBEXEC_DIR),
            kind: EntryKind::Binary,
        },
        InstallEntry {
            source: DBUS_CONF,
            dest_dir: PathBuf::from(install::DBUS_SYSTEM_CONF_DIR),
            kind: EntryKind::Data,
        },
        InstallEntry {
            source: DBUS_SERVICE,
            dest_dir: PathBuf::from(install::DBUS_SYSTEM_SERVICES_DIR),
            kind: EntryKind::Data,
        },
        InstallEntry {
            source: POLKIT_POLICY,
            dest_dir: PathBuf::from(install::POLKIT_ACTIONS_DIR),
            kind: EntryKind::Data,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_layout() {
        let entries = manifest(Path::new("/usr"));
        let dests: Vec<_> = entries.iter().map(|e| e.destination(None)).collect();
        assert_eq!(
            dests,
            [
                PathBuf::from("/usr/bin/plymouth-theme-preview"),
                PathBuf::from("/usr/libexec/plymouth-theme-preview-helper"),
                PathBuf::from("/etc/dbus-1/system.d/ru.gentoo.plymouth_theme_preview_helper.conf"),
                PathBuf::from(
                    "/usr/share/dbus-1/system-services/ru.gentoo.plymouth_theme_preview_helper.service"
                ),
                PathBuf::from("/usr/share/polkit-1/actions/ru.gentoo.plymouth_theme_preview.policy"),
            ]
        );
    }

    #[test]
    fn test_helper_ignores_prefix() {
        let entries = manifest(Path::new("/usr/local"));
        assert_eq!(entries[0].dest_dir, PathBuf::from("/usr/local/bin"));
        assert_eq!(entries[1].destination(None), PathBuf::from(install::HELPER_PATH));
    }

    #[test]
    fn test_destdir_rebases() {
        let entry = &manifest(Path::new("/usr"))[2];
        assert_eq!(
            entry.destination(Some(Path::new("/tmp/stage"))),
            PathBuf::from("/tmp/stage/etc/dbus-1/system.d/ru.gentoo.plymouth_theme_preview_helper.conf")
        );
    }

    #[test]
    fn test_modes() {
        let entries = manifest(Path::new("/usr"));
        assert_eq!(entries[0].mode(), 0o755);
        assert_eq!(entries[1].mode(), 0o755);
        assert!(entries[2..].iter().all(|e| e.mode() == 0o644));
    }
}
