//! Test session orchestration
//!
//! Samples run strictly one after another in lifecycle order. Before each
//! sample the session gathers its substitutions (configuration, ancestor
//! responses, prerequisites), runs it with the runner of its language and
//! stores the outcome for the samples that follow.

use serde_json::Map;
use std::collections::HashMap;
use tracing::info;

use crate::common::{Config, Error, Result};
use crate::prerequisites::ResourceRegistry;
use crate::propagation::ResultMap;
use crate::report::{Reporter, SessionReport};
use crate::runner::{run_sample, runner_for, ExecutionOutcome, SampleRunner, SubstitutionSet};
use crate::sample::{Language, Sample};

pub struct TestSession<'c> {
    config: &'c Config,
    runners: HashMap<Language, Box<dyn SampleRunner>>,
    registry: ResourceRegistry,
    results: ResultMap,
    reporter: Reporter,
    outcomes: Vec<ExecutionOutcome>,
}

impl<'c> TestSession<'c> {
    pub fn new(config: &'c Config, registry: ResourceRegistry, reporter: Reporter) -> Self {
        Self {
            config,
            runners: HashMap::new(),
            registry,
            results: ResultMap::new(),
            reporter,
            outcomes: Vec::new(),
        }
    }

    /// Use `runner` for its language instead of the default one
    pub fn with_runner(mut self, runner: Box<dyn SampleRunner>) -> Self {
        self.runners.insert(runner.language(), runner);
        self
    }

    /// Run every sample in the given order and report the result
    ///
    /// Prerequisite cleanup runs whether the samples finished, a fatal
    /// error stopped them, or the user pressed Ctrl-C.
    pub async fn run(mut self, samples: &[Sample]) -> Result<SessionReport> {
        info!(count = samples.len(), "Starting test session");

        let result = tokio::select! {
            result = self.run_samples(samples) => result,
            _ = tokio::signal::ctrl_c() => Err(Error::Interrupted),
        };
        self.registry.cleanup().await;
        result?;

        let report = SessionReport {
            outcomes: std::mem::take(&mut self.outcomes),
        };
        self.reporter.session_finished(&report);
        info!(passed = report.passed(), failed = report.failed(), "Test session finished");
        Ok(report)
    }

    async fn run_samples(&mut self, samples: &[Sample]) -> Result<()> {
        let config = self.config;
        let mut current = None;

        for sample in samples {
            let language = sample.language;
            if current != Some(language) {
                current = Some(language);
                self.reporter.language_started(language);
                self.runners
                    .entry(language)
                    .or_insert_with(|| runner_for(language, config))
                    .ensure_environment()
                    .await?;
            }

            self.reporter.sample_started(sample);

            let mut subs: SubstitutionSet = config.substitutions.iter().collect();
            subs.merge(self.results.ancestor_substitutions(sample));

            let extra = match config.prerequisite_for(&sample.name, sample.method) {
                Some(decl) => self.registry.create(decl).await,
                None => Map::new(),
            };
            for (name, value) in &extra {
                subs.insert_attribute(name, value);
            }

            let runner = self
                .runners
                .get(&language)
                .ok_or_else(|| Error::provision(language.id(), "no runner available"))?;
            let outcome = run_sample(runner.as_ref(), sample, subs, &config.companion_file_name).await;

            self.reporter.sample_finished(&outcome);
            self.outcomes.push(outcome.clone());
            self.results
                .put(outcome, &config.renames_for(&sample.name), &extra);
        }

        Ok(())
    }
}
