//! Library half of the `surety` command: configuration, argument
//! definitions and subcommand implementations.

pub mod cli;
pub mod commands;
pub mod config;
