//! CLI command definitions
//!
//! Defines the clap commands for the samples validator.

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::sample::Language;

#[derive(Subcommand)]
pub enum Commands {
    /// Run code samples against the API and report the results
    ///
    /// The exit code is the number of failed samples.
    Run {
        #[command(flatten)]
        selection: SampleSelection,

        /// Configuration file (YAML, or TOML with a .toml extension)
        #[arg(long, short)]
        config: Option<PathBuf>,
    },

    /// List samples in the order they would run, without running them
    List {
        #[command(flatten)]
        selection: SampleSelection,

        /// Configuration file (only used for the spec directory suffix)
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
}

/// Which samples to pick up
#[derive(Args, Debug, Clone)]
pub struct SampleSelection {
    /// Directory holding the samples
    #[arg(long, short = 's')]
    pub samples_dir: PathBuf,

    /// Only samples of this language
    #[arg(long, short = 'l', value_enum)]
    pub lang: Option<Language>,

    /// Only samples whose resource path contains this text
    #[arg(long, short = 'k')]
    pub keyword: Option<String>,
}
