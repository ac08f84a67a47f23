//! Terminal presentation for the host process
//!
//! Stands in for an editor status bar: every lifecycle transition becomes a
//! single colored line on stdout.

pub mod status;
pub mod theme;
