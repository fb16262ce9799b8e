//! Shared primitives: storage handle, schema, migrations, config, errors.
//!
//! Everything operation modules have in common lives here. The ops modules
//! (`crate::ops`) own behavior; core owns the database they share.

pub mod config;
pub mod db;
pub mod error;
pub mod migration;
pub mod schemas;
pub mod store;
pub mod time;
