//! System Integration Files
//!
//! The D-Bus policy, the activation file and the polkit actions, built into
//! the binary so `install` works from any directory. Including them here
//! also means a missing file under `data/` fails the build.

use crate::manifest::{DBUS_CONF, DBUS_SERVICE, POLKIT_POLICY};

/// Bus policy: root owns the name, anyone may call it
pub const DBUS_CONF_FILE: &str = include_str!("../data/ru.gentoo.plymouth_theme_preview_helper.conf");

/// Bus activation file pointing at the helper in libexec
pub const DBUS_SERVICE_FILE: &str =
    include_str!("../data/ru.gentoo.plymouth_theme_preview_helper.service");

/// Polkit definitions of the preview and set-default-theme actions
pub const POLKIT_POLICY_FILE: &str = include_str!("../data/ru.gentoo.plymouth_theme_preview.policy");

/// Built-in contents of a data file by its manifest name
pub fn contents(name: &str) -> Option<&'static str> {
    match name {
        DBUS_CONF => Some(DBUS_CONF_FILE),
        DBUS_SERVICE => Some(DBUS_SERVICE_FILE),
        POLKIT_POLICY => Some(POLKIT_POLICY_FILE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus;
    use crate::manifest::{manifest, EntryKind};
    use crate::paths::install::HELPER_PATH;
    use std::path::Path;

    #[test]
    fn test_every_data_entry_is_built_in() {
        for entry in manifest(Path::new("/usr")) {
            if entry.kind == EntryKind::Data {
                assert!(contents(entry.source).is_some(), "{} not built in", entry.source);
            }
        }
        assert!(contents("plymouth-theme-preview").is_none());
    }

    #[test]
    fn test_service_file_activates_helper() {
        let lines: Vec<_> = DBUS_SERVICE_FILE.lines().map(str::trim).collect();
        assert_eq!(lines[0], "[D-BUS Service]");
        assert!(lines.contains(&format!("Name={}", bus::BUS_NAME).as_str()));
        assert!(lines.contains(&format!("Exec={}", HELPER_PATH).as_str()));
        assert!(lines.contains(&"User=root"));
    }

    #[test]
    fn test_bus_policy_names_service() {
        assert!(DBUS_CONF_FILE.contains(&format!("<allow own=\"{}\"/>", bus::BUS_NAME)));
        assert!(DBUS_CONF_FILE.contains(&format!("send_interface=\"{}\"", bus::INTERFACE)));
        assert!(DBUS_CONF_FILE.contains("<policy user=\"root\">"));
    }

    #[test]
    fn test_policy_declares_every_action() {
        for action in bus::ACTIONS {
            assert!(
                POLKIT_POLICY_FILE.contains(&format!("<action id=\"{}\">", action)),
                "{} missing from policy",
                action
            );
        }
        assert_eq!(POLKIT_POLICY_FILE.matches("<action id=").count(), bus::ACTIONS.len());
    }
}
