//! Configuration management
//!
//! Node settings loaded from a TOML file, with environment overrides for the
//! values most often changed between runs.

pub mod settings;

pub use settings::{Config, GenesisAllocation};
