//! Centralized Path Definitions
//!
//! Plymouth locations and install destinations used by both the front end
//! and the helper.

/// Plymouth's own files
pub mod plymouth {
    /// Directory holding one subdirectory per installed theme
    pub const THEMES_DIR: &str = "/usr/share/plymouth/themes";

    /// Administrator daemon configuration
    pub const DAEMON_CONF: &str = "/etc/plymouth/plymouthd.conf";

    /// Distribution defaults, consulted when the admin config names no theme
    pub const DAEMON_DEFAULTS: &str = "/usr/share/plymouth/plymouthd.defaults";

    /// The daemon binary
    pub const PLYMOUTHD: &str = "/usr/sbin/plymouthd";

    /// The client used to talk to a running daemon
    pub const PLYMOUTH: &str = "/usr/bin/plymouth";

    /// Tool that switches the default theme (and optionally rebuilds the initrd)
    pub const SET_DEFAULT_THEME: &str = "/usr/sbin/plymouth-set-default-theme";

    /// Pid file of the daemon spawned for a preview
    pub const PREVIEW_PID_FILE: &str = "/run/plymouth-theme-preview.pid";
}

/// Install destinations declared by the package manifest
pub mod install {
    /// Default prefix for the front-end binary
    pub const PREFIX: &str = "/usr";

    /// The helper is not meant to be run by hand, so it lives in libexec
    pub const LIBEXEC_DIR: &str = "/usr/libexec";

    /// System bus policy files
    pub const DBUS_SYSTEM_CONF_DIR: &str = "/etc/dbus-1/system.d";

    /// System bus activation files
    pub const DBUS_SYSTEM_SERVICES_DIR: &str = "/usr/share/dbus-1/system-services";

    /// Polkit action definitions
    pub const POLKIT_ACTIONS_DIR: &str = "/usr/share/polkit-1/actions";

    /// Full path of the installed helper, referenced by the activation file
    pub const HELPER_PATH: &str = "/usr/libexec/plymouth-theme-preview-helper";
}

/// Configuration file locations
pub mod config {
    use std::path::PathBuf;

    /// System-wide configuration shared by the front end and the helper
    pub const SYSTEM_CONFIG: &str = "/etc/plymouth-theme-preview.toml";

    /// Get the per-user configuration file (~/.config/plymouth-theme-preview/config.toml)
    pub fn user_config() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("plymouth-theme-preview").join("config.toml"))
    }
}
