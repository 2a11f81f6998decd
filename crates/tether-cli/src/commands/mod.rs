//! Subcommand implementations.

pub mod connect;
pub mod devices;
pub mod last;
