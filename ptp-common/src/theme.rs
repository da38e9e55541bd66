//! Plymouth Theme Discovery
//!
//! A theme is a directory under the themes dir containing `<name>.plymouth`,
//! an INI file with a `[Plymouth Theme]` section. The directory name is the
//! identifier plymouth itself uses, so it is what every operation addresses.

use freedesktop_entry_parser::Entry;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Section holding the theme description inside a `.plymouth` file
const THEME_SECTION: &str = "Plymouth Theme";

/// Longest theme name accepted from callers
pub const MAX_NAME_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("invalid theme name {0:?}")]
    InvalidName(String),

    #[error("theme {0:?} is not installed")]
    NotFound(String),

    #[error("failed to read theme file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed theme file {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

/// An installed plymouth theme
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Theme {
    /// Directory name, used to select the theme
    pub name: String,

    /// Human-readable name from the `Name` key
    pub display_name: String,

    /// Free-form description, may be empty
    pub description: String,

    /// Splash plugin (`ModuleName`), e.g. "two-step" or "script"
    pub module: String,

    /// Path to the `.plymouth` file
    pub path: PathBuf,
}

impl Theme {
    /// Parse a theme from the contents of its `.plymouth` file
    pub fn parse(name: &str, text: &str, path: &Path) -> Result<Self, ThemeError> {
        let entry = Entry::parse(text).map_err(|e| ThemeError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if !entry.has_section(THEME_SECTION) {
            return Err(ThemeError::Malformed {
                path: path.to_path_buf(),
                reason: format!("missing [{}] section", THEME_SECTION),
            });
        }

        let section = entry.section(THEME_SECTION);
        let module = section.attr("ModuleName").ok_or_else(|| ThemeError::Malformed {
            path: path.to_path_buf(),
            reason: "missing ModuleName".to_string(),
        })?;

        Ok(Self {
            name: name.to_string(),
            display_name: section.attr("Name").unwrap_or(name).to_string(),
            description: section.attr("Description").unwrap_or_default().to_string(),
            module: module.to_string(),
            path: path.to_path_buf(),
        })
    }

    /// Load the theme living in `theme_dir`
    pub fn from_dir(theme_dir: &Path) -> Result<Self, ThemeError> {
        let name = theme_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| ThemeError::InvalidName(theme_dir.display().to_string()))?;
        validate_theme_name(&name)?;

        let path = theme_dir.join(format!("{}.plymouth", name));
        let text = std::fs::read_to_string(&path).map_err(|source| ThemeError::Io {
            path: path.clone(),
            source,
        })?;

        Self::parse(&name, &text, &path)
    }
}

/// Reject names that could escape the themes directory or confuse plymouth
pub fn validate_theme_name(name: &str) -> Result<(), ThemeError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if valid {
        Ok(())
    } else {
        Err(ThemeError::InvalidName(name.to_string()))
    }
}

/// List every usable theme under `dir`, sorted by name
///
/// Entries that are not directories, have unsafe names, or carry a broken
/// `.plymouth` file are skipped with a warning.
pub fn discover_themes(dir: &Path) -> anyhow::Result<Vec<Theme>> {
    use anyhow::Context;

    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read themes directory: {}", dir.display()))?;

    let mut themes = Vec::new();
    for entry in entries {
        let entry = entry
            .with_context(|| format!("Failed to list themes directory: {}", dir.display()))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        match Theme::from_dir(&path) {
            Ok(theme) => themes.push(theme),
            Err(e) => tracing::warn!("Skipping theme at {:?}: {}", path, e),
        }
    }

    themes.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(themes)
}

/// Look up a single installed theme by name
pub fn find_theme(dir: &Path, name: &str) -> Result<Theme, ThemeError> {
    validate_theme_name(name)?;

    let theme_dir = dir.join(name);
    if !theme_dir.is_dir() {
        return Err(ThemeError::NotFound(name.to_string()));
    }

    match Theme::from_dir(&theme_dir) {
        Err(ThemeError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            Err(ThemeError::NotFound(name.to_string()))
        }
        other => other,
    }
}
