//! Library surface of the `cldispatch` binary.
//!
//! The subcommand implementations live here so integration tests can drive
//! them without spawning the binary.

pub mod commands;
pub mod config;
