//! CLI command implementations for the `dosprobe` binary.

pub mod config;
pub mod fixture;
pub mod keys;
pub mod store;
