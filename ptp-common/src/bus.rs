//! D-Bus and PolicyKit names
//!
//! These must stay in sync with the files under `data/`: the bus policy,
//! the activation file and the polkit action definitions.

/// Well-known name owned by the helper on the system bus
pub const BUS_NAME: &str = "ru.gentoo.plymouth_theme_preview_helper";

/// Object path the helper serves its interface at
pub const OBJECT_PATH: &str = "/ru/gentoo/plymouth_theme_preview_helper";

/// Interface name of the helper service
pub const INTERFACE: &str = "ru.gentoo.plymouth_theme_preview_helper";

/// Polkit action required to run a splash preview
pub const ACTION_PREVIEW: &str = "ru.gentoo.plymouth_theme_preview.preview";

/// Polkit action required to change the default theme
pub const ACTION_SET_DEFAULT_THEME: &str = "ru.gentoo.plymouth_theme_preview.set-default-theme";

/// All actions declared in the policy file
pub const ACTIONS: &[&str] = &[ACTION_PREVIEW, ACTION_SET_DEFAULT_THEME];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_path_matches_bus_name() {
        let derived = format!("/{}", BUS_NAME.replace('.', "/"));
        assert_eq!(derived, OBJECT_PATH);
    }

    #[test]
    fn test_actions_share_policy_prefix() {
        for action in ACTIONS {
            assert!(action.starts_with("ru.gentoo.plymouth_theme_preview."));
        }
    }
}
