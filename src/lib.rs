//! plymouth-theme-preview Library
//!
//! This library provides the unprivileged front end:
//! - The D-Bus client for the privileged helper
//! - Installation of the binaries and system integration files
//! - The GTK4/Libadwaita window

// Re-export from ptp-common for convenience
pub use ptp_common::{bus, config, daemon_conf, manifest, paths, theme};

pub mod client;
pub mod installer;
pub mod system_files;
pub mod ui;
