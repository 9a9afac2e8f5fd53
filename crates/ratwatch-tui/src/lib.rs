//! Terminal dashboard for the ratwatch sensor rig.
//!
//! This crate provides a standalone binary wrapper around ratwatch-cli's dashboard.
//! The implementation lives in `ratwatch-cli` with the `tui` feature enabled.
//!
//! For the dashboard implementation, see [`ratwatch_cli::tui`].

pub use ratwatch_cli::tui;
