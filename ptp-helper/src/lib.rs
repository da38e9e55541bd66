//! plymouth-theme-preview helper library
//!
//! This library provides the privileged side:
//! - Polkit authorization of bus callers
//! - The plymouth command sequences for previews and theme switching
//! - The D-Bus interface and its activation lifecycle

pub use ptp_common::{bus, config, daemon_conf, paths, theme};

pub mod authority;
pub mod error;
pub mod lifecycle;
pub mod plymouth;
pub mod service;
