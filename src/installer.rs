//! Installer - places the binaries and system integration files
//!
//! Installs the five artifacts of the manifest at their declared locations.
//! All sources are checked before anything is copied, and files whose
//! contents already match are left alone, so running it twice is a no-op.

use crate::manifest::{self, EntryKind, InstallEntry};
use crate::system_files;
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Where to take files from and where to put them
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Directory holding the D-Bus and polkit files; None uses the copies
    /// built into this binary
    pub data_dir: Option<PathBuf>,

    /// Directory holding the built binaries (e.g. target/release)
    pub bin_dir: PathBuf,

    /// Staging root for packaging; None installs into the live system
    pub destdir: Option<PathBuf>,

    /// Prefix for the front-end binary
    pub prefix: PathBuf,
}

impl InstallOptions {
    fn entries(&self) -> Vec<InstallEntry> {
        manifest::manifest(&self.prefix)
    }

    /// On-disk source, or None for a data file taken from the binary
    fn source_of(&self, entry: &InstallEntry) -> Option<PathBuf> {
        match entry.kind {
            EntryKind::Binary => Some(self.bin_dir.join(entry.source)),
            EntryKind::Data => self.data_dir.as_ref().map(|dir| dir.join(entry.source)),
        }
    }

    async fn read_source(&self, entry: &InstallEntry) -> Result<Vec<u8>> {
        match self.source_of(entry) {
            Some(path) => fs::read(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display())),
            None => system_files::contents(entry.source)
                .map(|text| text.as_bytes().to_vec())
                .with_context(|| format!("No built-in copy of {}", entry.source)),
        }
    }

    fn destination_of(&self, entry: &InstallEntry) -> PathBuf {
        entry.destination(self.destdir.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallAction {
    /// Destination did not exist
    Installed,
    /// Destination existed with different contents
    Replaced,
    /// Destination already matched the source
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledFile {
    pub destination: PathBuf,
    pub action: InstallAction,
}

#[derive(Debug, Default)]
pub struct InstallReport {
    pub files: Vec<InstalledFile>,
}

impl InstallReport {
    pub fn changed(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.action != InstallAction::Unchanged)
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyIssue {
    Missing(PathBuf),
    Modified(PathBuf),
}

impl std::fmt::Display for VerifyIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerifyIssue::Missing(path) => write!(f, "missing: {}", path.display()),
            VerifyIssue::Modified(path) => write!(f, "modified: {}", path.display()),
        }
    }
}

/// SHA256 of some bytes as hex
pub fn digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// SHA256 of a file's contents as hex
pub async fn file_digest(path: &Path) -> Result<String> {
    let bytes = fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(digest(&bytes))
}

/// Fail with the full list of absent sources, before touching any destination
async fn ensure_sources(opts: &InstallOptions) -> Result<()> {
    let mut missing = Vec::new();
    for entry in opts.entries() {
        match opts.source_of(&entry) {
            Some(source) => {
                if !fs::try_exists(&source).await.unwrap_or(false) {
                    missing.push(source.display().to_string());
                }
            }
            None => {
                if system_files::contents(entry.source).is_none() {
                    missing.push(entry.source.to_string());
                }
            }
        }
    }

    if !missing.is_empty() {
        anyhow::bail!(
            "Missing source files:\n  {}\n\
             Build the binaries first (cargo build --release) and run from the source tree.",
            missing.join("\n  ")
        );
    }
    Ok(())
}

/// Install every manifest entry
pub async fn install(opts: &InstallOptions) -> Result<InstallReport> {
    ensure_sources(opts).await?;

    let mut report = InstallReport::default();
    for entry in opts.entries() {
        let contents = opts.read_source(&entry).await?;
        let destination = opts.destination_of(&entry);
        let action = install_file(&contents, &destination, entry.mode()).await?;

        tracing::info!("{:?}: {}", action, destination.display());
        report.files.push(InstalledFile { destination, action });
    }

    Ok(report)
}

async fn install_file(contents: &[u8], destination: &Path, mode: u32) -> Result<InstallAction> {
    let action = if fs::try_exists(destination).await.unwrap_or(false) {
        if digest(contents) == file_digest(destination).await? {
            InstallAction::Unchanged
        } else {
            InstallAction::Replaced
        }
    } else {
        InstallAction::Installed
    };

    if action == InstallAction::Unchanged {
        set_mode(destination, mode).await?;
    } else {
        replace_file(contents.to_vec(), destination.to_path_buf(), mode).await?;
    }
    Ok(action)
}

/// Write into a temporary sibling and rename it over `destination`
///
/// The rename swaps the directory entry: a running binary keeps its old
/// inode (no ETXTBSY) and a failed write leaves the destination untouched.
async fn replace_file(contents: Vec<u8>, destination: PathBuf, mode: u32) -> Result<()> {
    let parent = destination
        .parent()
        .map(Path::to_path_buf)
        .with_context(|| format!("{} has no parent directory", destination.display()))?;

    fs::create_dir_all(&parent)
        .await
        .with_context(|| format!("Failed to create {}", parent.display()))?;

    tokio::task::spawn_blocking(move || -> Result<()> {
        use std::io::Write;

        let mut staged = tempfile::NamedTempFile::new_in(&parent).with_context(|| {
            format!(
                "Failed to create a file in {}. Are you running as root?",
                parent.display()
            )
        })?;
        staged.write_all(&contents)?;
        staged.as_file().sync_all()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            staged
                .as_file()
                .set_permissions(std::fs::Permissions::from_mode(mode))?;
        }

        staged
            .persist(&destination)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to install {}", destination.display()))?;
        Ok(())
    })
    .await
    .context("Install task failed")?
}

async fn set_mode(path: &Path, mode: u32) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let current = fs::metadata(path).await?.permissions().mode() & 0o7777;
        if current != mode {
            fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
                .await
                .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
        }
    }
    Ok(())
}

/// Compare installed files against the sources
pub async fn verify(opts: &InstallOptions) -> Result<Vec<VerifyIssue>> {
    ensure_sources(opts).await?;

    let mut issues = Vec::new();
    for entry in opts.entries() {
        let destination = opts.destination_of(&entry);
        if !fs::try_exists(&destination).await.unwrap_or(false) {
            issues.push(VerifyIssue::Missing(destination));
            continue;
        }

        let expected = digest(&opts.read_source(&entry).await?);
        if expected != file_digest(&destination).await? {
            issues.push(VerifyIssue::Modified(destination));
        }
    }

    Ok(issues)
}

/// Remove installed files; directories are left in place
pub async fn uninstall(opts: &InstallOptions) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for entry in opts.entries() {
        let destination = opts.destination_of(&entry);
        match fs::remove_file(&destination).await {
            Ok(()) => {
                tracing::info!("Removed {}", destination.display());
                removed.push(destination);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to remove {}", destination.display()));
            }
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{DBUS_CONF, DBUS_SERVICE, FRONTEND_BIN, HELPER_BIN, POLKIT_POLICY};

    struct Fixture {
        _tmp: tempfile::TempDir,
        opts: InstallOptions,
    }

    fn fixture() -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let data_dir = tmp.path().join("data");
        let bin_dir = tmp.path().join("bin");
        std::fs::create_dir_all(&data_dir).unwrap();
        std::fs::create_dir_all(&bin_dir).unwrap();

        for name in [FRONTEND_BIN, HELPER_BIN] {
            std::fs::write(bin_dir.join(name), format!("ELF {}", name)).unwrap();
        }
        for name in [DBUS_CONF, DBUS_SERVICE, POLKIT_POLICY] {
            std::fs::write(data_dir.join(name), format!("data {}", name)).unwrap();
        }

        let opts = InstallOptions {
            data_dir: Some(data_dir),
            bin_dir,
            destdir: Some(tmp.path().join("root")),
            prefix: PathBuf::from("/usr"),
        };
        Fixture { _tmp: tmp, opts }
    }

    fn staged(opts: &InstallOptions, absolute: &str) -> PathBuf {
        opts.destdir
            .as_ref()
            .unwrap()
            .join(absolute.trim_start_matches('/'))
    }

    #[tokio::test]
    async fn test_install_places_files_unmodified() {
        let fx = fixture();
        let report = install(&fx.opts).await.unwrap();
        assert_eq!(report.files.len(), 5);
        assert!(report.files.iter().all(|f| f.action == InstallAction::Installed));

        let policy = staged(
            &fx.opts,
            "/usr/share/polkit-1/actions/ru.gentoo.plymouth_theme_preview.policy",
        );
        assert_eq!(
            std::fs::read_to_string(policy).unwrap(),
            format!("data {}", POLKIT_POLICY)
        );
        assert!(staged(&fx.opts, "/usr/libexec/plymouth-theme-preview-helper").exists());
        assert!(staged(&fx.opts, "/usr/bin/plymouth-theme-preview").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_install_sets_modes() {
        use std::os::unix::fs::PermissionsExt;

        let fx = fixture();
        install(&fx.opts).await.unwrap();

        let mode = |p: &str| {
            std::fs::metadata(staged(&fx.opts, p)).unwrap().permissions().mode() & 0o777
        };
        assert_eq!(mode("/usr/libexec/plymouth-theme-preview-helper"), 0o755);
        assert_eq!(
            mode("/etc/dbus-1/system.d/ru.gentoo.plymouth_theme_preview_helper.conf"),
            0o644
        );
    }

    #[tokio::test]
    async fn test_reinstall_is_idempotent() {
        let fx = fixture();
        install(&fx.opts).await.unwrap();
        let conf = staged(
            &fx.opts,
            "/etc/dbus-1/system.d/ru.gentoo.plymouth_theme_preview_helper.conf",
        );
        let first = std::fs::read(&conf).unwrap();

        let again = install(&fx.opts).await.unwrap();
        assert_eq!(again.changed(), 0);
        assert_eq!(std::fs::read(&conf).unwrap(), first);
    }

    #[tokio::test]
    async fn test_missing_source_fails_before_copying() {
        let fx = fixture();
        std::fs::remove_file(fx.opts.data_dir.as_ref().unwrap().join(DBUS_SERVICE)).unwrap();

        let err = install(&fx.opts).await.unwrap_err();
        assert!(err.to_string().contains(DBUS_SERVICE));
        assert!(!fx.opts.destdir.as_ref().unwrap().exists());
    }

    #[tokio::test]
    async fn test_replaced_and_verified() {
        let fx = fixture();
        install(&fx.opts).await.unwrap();
        assert!(verify(&fx.opts).await.unwrap().is_empty());

        let service = staged(
            &fx.opts,
            "/usr/share/dbus-1/system-services/ru.gentoo.plymouth_theme_preview_helper.service",
        );
        std::fs::write(&service, "tampered").unwrap();
        assert_eq!(
            verify(&fx.opts).await.unwrap(),
            [VerifyIssue::Modified(service.clone())]
        );

        let report = install(&fx.opts).await.unwrap();
        assert_eq!(report.changed(), 1);
        assert!(report
            .files
            .iter()
            .any(|f| f.destination == service && f.action == InstallAction::Replaced));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_replacing_keeps_open_binary_intact() {
        use std::io::Read;
        use std::os::unix::fs::MetadataExt;

        let fx = fixture();
        install(&fx.opts).await.unwrap();
        let helper = staged(&fx.opts, "/usr/libexec/plymouth-theme-preview-helper");
        let old_inode = std::fs::metadata(&helper).unwrap().ino();

        // Stands in for the bus-activated helper still running the old build
        let mut running = std::fs::File::open(&helper).unwrap();

        std::fs::write(fx.opts.bin_dir.join(HELPER_BIN), "ELF new helper").unwrap();
        let report = install(&fx.opts).await.unwrap();
        assert_eq!(report.changed(), 1);

        assert_ne!(std::fs::metadata(&helper).unwrap().ino(), old_inode);
        assert_eq!(std::fs::read_to_string(&helper).unwrap(), "ELF new helper");

        let mut old = String::new();
        running.read_to_string(&mut old).unwrap();
        assert_eq!(old, format!("ELF {}", HELPER_BIN));

        // No staging files are left next to the destination
        let siblings = std::fs::read_dir(helper.parent().unwrap()).unwrap().count();
        assert_eq!(siblings, 1);
    }

    #[tokio::test]
    async fn test_install_builtin_data_files() {
        let mut fx = fixture();
        fx.opts.data_dir = None;
        install(&fx.opts).await.unwrap();

        let service = staged(
            &fx.opts,
            "/usr/share/dbus-1/system-services/ru.gentoo.plymouth_theme_preview_helper.service",
        );
        assert_eq!(
            std::fs::read_to_string(service).unwrap(),
            system_files::DBUS_SERVICE_FILE
        );
        assert!(verify(&fx.opts).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_uninstall_removes_files_only() {
        let fx = fixture();
        install(&fx.opts).await.unwrap();

        let removed = uninstall(&fx.opts).await.unwrap();
        assert_eq!(removed.len(), 5);
        assert!(staged(&fx.opts, "/usr/libexec").is_dir());

        let issues = verify(&fx.opts).await.unwrap();
        assert!(issues.iter().all(|i| matches!(i, VerifyIssue::Missing(_))));
        assert_eq!(uninstall(&fx.opts).await.unwrap().len(), 0);
    }
}
