//! Shared fixtures for the unit tests: fast configurations, funded ledgers and nodes,
//! and small in-process networks.

pub mod test_utils;

pub use test_utils::*;
