//! plymouth-theme-preview common library
//!
//! Shared modules for the front end and the privileged helper.
//! This crate has NO GTK4 or async dependencies.

pub mod bus;
pub mod config;
pub mod daemon_conf;
pub mod manifest;
pub mod paths;
pub mod theme;
