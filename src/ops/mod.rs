//! Lifecycle operations over the attendance store.
//!
//! Each module owns one subsystem: its record types, its mutations and
//! queries, and its CLI group. Account gating is shared: every mutation
//! resolves its user through [`users::require_active_user`] (or the admin
//! variant) before touching storage, so deactivated accounts are rejected
//! uniformly.

pub mod attendance;
pub mod breaks;
pub mod holidays;
pub mod leave;
pub mod report;
pub mod users;

use clap::ValueEnum;

/// Output format accepted by the list and report commands.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
