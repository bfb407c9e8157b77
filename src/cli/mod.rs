//! CLI module for vetloop - command-line interface and subcommands.

pub mod commands;

pub use commands::Cli;
