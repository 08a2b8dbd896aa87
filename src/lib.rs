//! Samples validator - checks that API documentation code samples work
//!
//! Samples are discovered from a directory convention, ordered so that
//! resources are created before and deleted after their children, executed
//! per language, and threaded together by substituting values from earlier
//! responses into later samples.

pub mod cli;
pub mod commands;
pub mod common;
pub mod edn;
pub mod prerequisites;
pub mod propagation;
pub mod report;
pub mod runner;
pub mod sample;
pub mod session;
pub mod tree;

// Re-export commonly used types for tests
pub use common::{Config, Error, Result};
pub use runner::{ExecutionOutcome, FailureReason};
pub use sample::{HttpMethod, Language, Sample};
