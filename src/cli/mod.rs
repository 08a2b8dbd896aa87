//! CLI command handling
//!
//! Dispatches CLI commands and turns a session into a process exit code.

use tracing::info;

use crate::commands::{Commands, SampleSelection};
use crate::common::{Config, Error, Result};
use crate::prerequisites::{HttpResourceApi, ResourceRegistry};
use crate::report::Reporter;
use crate::sample::{order_samples, scan_samples, Sample, ScanOptions};
use crate::session::TestSession;

/// Dispatch a CLI command; returns the process exit code
pub async fn dispatch(command: Commands) -> Result<i32> {
    match command {
        Commands::Run { selection, config } => {
            let config = Config::load(config.as_deref())?;
            let samples = select_samples(&selection, &config)?;
            info!(count = samples.len(), dir = %selection.samples_dir.display(), "Loaded samples");

            let api = HttpResourceApi::new(config.access_token.clone(), config.sample_timeout)?;
            let registry = ResourceRegistry::new(Box::new(api), config.api_url.clone());
            let reporter = Reporter::stdout(config.debug, config.sample_timeout);
            let report = TestSession::new(&config, registry, reporter).run(&samples).await?;

            Ok(exit_code(report.failed()))
        }

        Commands::List { selection, config } => {
            let config = Config::load(config.as_deref())?;
            let samples = select_samples(&selection, &config)?;

            if samples.is_empty() {
                println!("No samples found in {}", selection.samples_dir.display());
                return Ok(0);
            }
            for sample in &samples {
                println!(
                    "{:<6} {:>6}  {}",
                    sample.language.id(),
                    sample.method.as_str(),
                    sample.name
                );
            }
            Ok(0)
        }
    }
}

/// Scan and order the selected samples
fn select_samples(selection: &SampleSelection, config: &Config) -> Result<Vec<Sample>> {
    if !selection.samples_dir.is_dir() {
        return Err(Error::Config(format!(
            "samples directory '{}' does not exist",
            selection.samples_dir.display()
        )));
    }

    let opts = ScanOptions {
        languages: selection.lang.map(|lang| vec![lang]),
        keyword: selection.keyword.clone(),
        spec_dir_suffix: config.spec_dir_suffix.clone(),
    };
    Ok(order_samples(scan_samples(&selection.samples_dir, &opts)?))
}

/// Exit code for a number of failed samples
///
/// Exit statuses are truncated to 8 bits, so larger counts saturate
/// instead of wrapping around to success.
pub fn exit_code(failed: usize) -> i32 {
    failed.min(255) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_saturates() {
        assert_eq!(exit_code(0), 0);
        assert_eq!(exit_code(3), 3);
        assert_eq!(exit_code(256), 255);
    }

    #[test]
    fn test_missing_samples_dir() {
        let selection = SampleSelection {
            samples_dir: "/definitely/not/here".into(),
            lang: None,
            keyword: None,
        };
        assert!(matches!(
            select_samples(&selection, &Config::default()),
            Err(Error::Config(_))
        ));
    }
}
