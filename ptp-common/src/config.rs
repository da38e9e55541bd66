//! Configuration Parser
//!
//! Parses plymouth-theme-preview.toml. Every section is optional; a missing
//! file means all defaults.

use crate::paths;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Upper bound for a single preview, in seconds
pub const MAX_PREVIEW_SECS: u32 = 120;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub plymouth: PlymouthConfig,
    #[serde(default)]
    pub helper: HelperConfig,
}

/// Front-end defaults
#[derive(Debug, Clone, Deserialize)]
pub struct PreviewConfig {
    /// How long a preview runs unless overridden on the command line
    #[serde(default = "default_duration")]
    pub duration_secs: u32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            duration_secs: default_duration(),
        }
    }
}

/// Locations of plymouth's own binaries and data
#[derive(Debug, Clone, Deserialize)]
pub struct PlymouthConfig {
    #[serde(default = "default_themes_dir")]
    pub themes_dir: PathBuf,

    #[serde(default = "default_plymouthd")]
    pub plymouthd: PathBuf,

    #[serde(default = "default_plymouth")]
    pub plymouth: PathBuf,

    #[serde(default = "default_set_default_theme")]
    pub set_default_theme: PathBuf,

    #[serde(default = "default_daemon_conf")]
    pub daemon_conf: PathBuf,

    #[serde(default = "default_daemon_defaults")]
    pub daemon_defaults: PathBuf,

    #[serde(default = "default_pid_file")]
    pub pid_file: PathBuf,
}

impl Default for PlymouthConfig {
    fn default() -> Self {
        Self {
            themes_dir: default_themes_dir(),
            plymouthd: default_plymouthd(),
            plymouth: default_plymouth(),
            set_default_theme: default_set_default_theme(),
            daemon_conf: default_daemon_conf(),
            daemon_defaults: default_daemon_defaults(),
            pid_file: default_pid_file(),
        }
    }
}

/// Privileged helper settings
#[derive(Debug, Clone, Deserialize)]
pub struct HelperConfig {
    /// Exit after this many seconds without a request
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

/// Partial config used for the per-user overlay
#[derive(Debug, Deserialize)]
struct UserConfig {
    #[serde(default)]
    preview: Option<PreviewConfig>,
}

fn default_duration() -> u32 {
    10
}

fn default_idle_timeout() -> u64 {
    30
}

fn default_themes_dir() -> PathBuf {
    PathBuf::from(paths::plymouth::THEMES_DIR)
}

fn default_plymouthd() -> PathBuf {
    PathBuf::from(paths::plymouth::PLYMOUTHD)
}

fn default_plymouth() -> PathBuf {
    PathBuf::from(paths::plymouth::PLYMOUTH)
}

fn default_set_default_theme() -> PathBuf {
    PathBuf::from(paths::plymouth::SET_DEFAULT_THEME)
}

fn default_daemon_conf() -> PathBuf {
    PathBuf::from(paths::plymouth::DAEMON_CONF)
}

fn default_daemon_defaults() -> PathBuf {
    PathBuf::from(paths::plymouth::DAEMON_DEFAULTS)
}

fn default_pid_file() -> PathBuf {
    PathBuf::from(paths::plymouth::PREVIEW_PID_FILE)
}

impl Config {
    /// Load configuration from a file path
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::from_str(&contents)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_str(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str).context("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load the system config if present, otherwise the defaults
    pub fn load_system() -> Result<Self> {
        let path = Path::new(paths::config::SYSTEM_CONFIG);
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// System config overlaid with the user's `[preview]` preferences
    ///
    /// The helper never reads the user file: plymouth paths must not be
    /// controllable by an unprivileged caller.
    pub fn load_default() -> Result<Self> {
        let mut config = Self::load_system()?;

        if let Some(user_path) = paths::config::user_config() {
            if user_path.exists() {
                config.apply_user_overlay(&user_path)?;
            }
        }

        Ok(config)
    }

    fn apply_user_overlay(&mut self, path: &Path) -> Result<()> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let user: UserConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        if let Some(preview) = user.preview {
            self.preview = preview;
        }
        self.validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_PREVIEW_SECS).contains(&self.preview.duration_secs) {
            anyhow::bail!(
                "preview.duration_secs must be between 1 and {}, got: {}",
                MAX_PREVIEW_SECS,
                self.preview.duration_secs
            );
        }

        if self.helper.idle_timeout_secs == 0 {
            anyhow::bail!("helper.idle_timeout_secs must be at least 1");
        }

        let p = &self.plymouth;
        for (key, path) in [
            ("themes_dir", &p.themes_dir),
            ("plymouthd", &p.plymouthd),
            ("plymouth", &p.plymouth),
            ("set_default_theme", &p.set_default_theme),
            ("daemon_conf", &p.daemon_conf),
            ("daemon_defaults", &p.daemon_defaults),
            ("pid_file", &p.pid_file),
        ] {
            if !path.is_absolute() {
                anyhow::bail!("plymouth.{} must be an absolute path, got: {}", key, path.display());
            }
        }

        Ok(())
    }
}

/// Clamp a requested preview length into the accepted range
pub fn clamp_duration(secs: u32) -> u32 {
    secs.clamp(1, MAX_PREVIEW_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.preview.duration_secs, 10);
        assert_eq!(config.helper.idle_timeout_secs, 30);
        assert_eq!(config.plymouth.themes_dir, PathBuf::from("/usr/share/plymouth/themes"));
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [preview]
            duration_secs = 25

            [plymouth]
            themes_dir = "/opt/plymouth/themes"
            plymouthd = "/sbin/plymouthd"

            [helper]
            idle_timeout_secs = 5
        "#;

        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.preview.duration_secs, 25);
        assert_eq!(config.plymouth.plymouthd, PathBuf::from("/sbin/plymouthd"));
        assert_eq!(config.plymouth.plymouth, PathBuf::from("/usr/bin/plymouth"));
        assert_eq!(config.helper.idle_timeout_secs, 5);
    }

    #[test]
    fn test_rejects_out_of_range_duration() {
        assert!(Config::from_str("[preview]\nduration_secs = 0\n").is_err());
        assert!(Config::from_str("[preview]\nduration_secs = 121\n").is_err());
    }

    #[test]
    fn test_rejects_relative_paths() {
        let err = Config::from_str("[plymouth]\nplymouth = \"bin/plymouth\"\n").unwrap_err();
        assert!(format!("{:#}", err).contains("plymouth.plymouth"));
    }

    #[test]
    fn test_user_overlay_only_touches_preview() {
        let tmp = tempfile::tempdir().unwrap();
        let user = tmp.path().join("config.toml");
        std::fs::write(
            &user,
            "[preview]\nduration_secs = 3\n\n[plymouth]\nplymouthd = \"/tmp/evil\"\n",
        )
        .unwrap();

        let mut config = Config::default();
        config.apply_user_overlay(&user).unwrap();
        assert_eq!(config.preview.duration_secs, 3);
        assert_eq!(config.plymouth.plymouthd, PathBuf::from("/usr/sbin/plymouthd"));
    }

    #[test]
    fn test_clamp_duration() {
        assert_eq!(clamp_duration(0), 1);
        assert_eq!(clamp_duration(30), 30);
        assert_eq!(clamp_duration(1000), MAX_PREVIEW_SECS);
    }
}
