//! Argument parsing for the `hashlink-chain` binary

pub mod commands;

pub use commands::{Command, Opt};
