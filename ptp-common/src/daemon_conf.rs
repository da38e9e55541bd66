//! plymouthd.conf reader
//!
//! Only the `[Daemon]` section matters here. The admin file wins over the
//! distribution defaults, key by key.

use anyhow::{Context, Result};
use freedesktop_entry_parser::Entry;
use std::path::Path;

const DAEMON_SECTION: &str = "Daemon";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DaemonConf {
    pub theme: Option<String>,
    pub show_delay: Option<f64>,
    pub device_timeout: Option<f64>,
}

impl DaemonConf {
    pub fn parse(text: &str) -> Result<Self> {
        let entry = Entry::parse(text).map_err(|e| anyhow::anyhow!("{}", e))?;
        let section = entry.section(DAEMON_SECTION);

        let number = |key: &str| -> Result<Option<f64>> {
            section
                .attr(key)
                .map(|v| {
                    v.trim()
                        .parse::<f64>()
                        .with_context(|| format!("Invalid {} value: {:?}", key, v))
                })
                .transpose()
        };

        Ok(Self {
            theme: section
                .attr("Theme")
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            show_delay: number("ShowDelay")?,
            device_timeout: number("DeviceTimeout")?,
        })
    }

    /// Load a config file; a missing file reads as empty
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text)
                .with_context(|| format!("Failed to parse {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    /// Fill every key this file leaves unset from `fallback`
    pub fn or(self, fallback: Self) -> Self {
        Self {
            theme: self.theme.or(fallback.theme),
            show_delay: self.show_delay.or(fallback.show_delay),
            device_timeout: self.device_timeout.or(fallback.device_timeout),
        }
    }
}

/// The settings plymouthd will boot with; unreadable files count as empty
pub fn effective(etc_conf: &Path, defaults_conf: &Path) -> DaemonConf {
    let read = |path: &Path| {
        DaemonConf::load(path).unwrap_or_else(|e| {
            tracing::warn!("{:#}", e);
            DaemonConf::default()
        })
    };

    read(etc_conf).or(read(defaults_conf))
}

/// The theme plymouthd will use on next boot, if any is configured
pub fn current_theme(etc_conf: &Path, defaults_conf: &Path) -> Option<String> {
    effective(etc_conf, defaults_conf).theme
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_daemon_section() {
        let conf = DaemonConf::parse(
            "# Administrator customizations go in this file\n\
             [Daemon]\n\
             Theme=bgrt\n\
             ShowDelay=0.5\n",
        )
        .unwrap();
        assert_eq!(conf.theme.as_deref(), Some("bgrt"));
        assert_eq!(conf.show_delay, Some(0.5));
        assert_eq!(conf.device_timeout, None);
    }

    #[test]
    fn test_empty_theme_is_unset() {
        let conf = DaemonConf::parse("[Daemon]\nTheme=\n").unwrap();
        assert_eq!(conf.theme, None);
    }

    #[test]
    fn test_bad_number_is_error() {
        assert!(DaemonConf::parse("[Daemon]\nShowDelay=soon\n").is_err());
    }

    #[test]
    fn test_current_theme_prefers_etc() {
        let tmp = tempfile::tempdir().unwrap();
        let etc = tmp.path().join("plymouthd.conf");
        let defaults = tmp.path().join("plymouthd.defaults");
        std::fs::write(&defaults, "[Daemon]\nTheme=spinner\n").unwrap();

        // etc missing -> defaults
        assert_eq!(current_theme(&etc, &defaults).as_deref(), Some("spinner"));

        // etc without a theme -> defaults
        std::fs::write(&etc, "[Daemon]\nShowDelay=5\n").unwrap();
        assert_eq!(current_theme(&etc, &defaults).as_deref(), Some("spinner"));

        std::fs::write(&etc, "[Daemon]\nTheme=tribar\n").unwrap();
        assert_eq!(current_theme(&etc, &defaults).as_deref(), Some("tribar"));
    }

    #[test]
    fn test_effective_merges_key_by_key() {
        let tmp = tempfile::tempdir().unwrap();
        let etc = tmp.path().join("plymouthd.conf");
        let defaults = tmp.path().join("plymouthd.defaults");
        std::fs::write(&defaults, "[Daemon]\nTheme=spinner\nShowDelay=0\nDeviceTimeout=8\n").unwrap();
        std::fs::write(&etc, "[Daemon]\nShowDelay=2.5\n").unwrap();

        let conf = effective(&etc, &defaults);
        assert_eq!(conf.theme.as_deref(), Some("spinner"));
        assert_eq!(conf.show_delay, Some(2.5));
        assert_eq!(conf.device_timeout, Some(8.0));
    }

    #[test]
    fn test_effective_ignores_broken_file() {
        let tmp = tempfile::tempdir().unwrap();
        let etc = tmp.path().join("plymouthd.conf");
        let defaults = tmp.path().join("plymouthd.defaults");
        std::fs::write(&etc, "[Daemon]\nTheme=tribar\nShowDelay=soon\n").unwrap();
        std::fs::write(&defaults, "[Daemon]\nTheme=spinner\n").unwrap();

        assert_eq!(effective(&etc, &defaults).theme.as_deref(), Some("spinner"));
    }
}
