//! dbops: find, launch and watch Databricks jobs; safely delete Unity Catalog
//! objects after taking ownership of them.

pub mod cli;
pub mod config;
pub mod console;
pub mod error;
pub mod gateway;
pub mod jobs;
pub mod output;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod uc;
