pub mod aggregate;
pub mod config;
pub mod error;
pub mod plot;
pub mod report;
pub mod runner;
pub mod snapshot;
pub mod speedup;
pub mod summary;
pub mod sweep;
pub mod verdict;

pub use error::{BuildError, BuildStep, HarnessError, Result};

#[cfg(test)]
mod testing;

#[cfg(test)]
mod aggregate_test;
