//! Scenario runner: sends setup messages, drives steps and collects results

use chrono::{DateTime, Utc};
use filesapp_harness_common::PollPolicy;
use filesapp_harness_remote::Dispatcher;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::error::{E2eError, E2eResult};
use crate::spec::TestSpec;
use crate::steps::{execute_step, StepResult};

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub success: bool,
    pub skipped: bool,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub error: Option<String>,
}

/// Result of running a set of scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    pub fn from_results(started_at: DateTime<Utc>, duration_ms: u64, results: Vec<TestResult>) -> Self {
        let skipped = results.iter().filter(|r| r.skipped).count();
        let passed = results.iter().filter(|r| r.success && !r.skipped).count();
        Self {
            started_at,
            total: results.len(),
            passed,
            failed: results.len() - passed - skipped,
            skipped,
            duration_ms,
            results,
        }
    }
}

/// Configuration for the test runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub specs_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Wait policy for scenarios that do not set their own
    pub poll: PollPolicy,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            specs_dir: PathBuf::from("specs"),
            output_dir: PathBuf::from("test-results"),
            poll: PollPolicy::default(),
        }
    }
}

/// Runs scenarios one after another against a connected application
pub struct TestRunner {
    dispatcher: Dispatcher,
    config: RunnerConfig,
}

impl TestRunner {
    pub fn new(dispatcher: Dispatcher, config: RunnerConfig) -> Self {
        Self { dispatcher, config }
    }

    /// Run all scenarios in the specs directory
    pub async fn run_all(&self) -> E2eResult<TestSuiteResult> {
        let specs = TestSpec::load_all(&self.config.specs_dir)?;
        Ok(self.run_specs(&specs).await)
    }

    /// Run scenarios carrying a tag
    pub async fn run_tagged(&self, tag: &str) -> E2eResult<TestSuiteResult> {
        let specs = TestSpec::load_all(&self.config.specs_dir)?;
        let filtered: Vec<TestSpec> = TestSpec::filter_by_tag(&specs, tag)
            .into_iter()
            .cloned()
            .collect();
        Ok(self.run_specs(&filtered).await)
    }

    /// Run one scenario by name
    pub async fn run_test(&self, name: &str) -> E2eResult<TestSuiteResult> {
        let specs = TestSpec::load_all(&self.config.specs_dir)?;
        let spec = specs
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| E2eError::SpecParse(format!("Test not found: {}", name)))?;
        Ok(self.run_specs(std::slice::from_ref(&spec)).await)
    }

    /// Run a list of scenarios; a failing scenario does not stop the others
    pub async fn run_specs(&self, specs: &[TestSpec]) -> TestSuiteResult {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut results = Vec::with_capacity(specs.len());

        info!("Running {} scenario(s)...", specs.len());

        for spec in specs {
            let result = self.run_spec(spec).await;
            if result.skipped {
                info!("- {} (skipped)", result.name);
            } else if result.success {
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);
        }

        let suite = TestSuiteResult::from_results(started_at, start.elapsed().as_millis() as u64, results);

        info!(
            "Test Results: {} passed, {} failed, {} skipped ({} ms)",
            suite.passed, suite.failed, suite.skipped, suite.duration_ms
        );

        suite
    }

    /// Run a single scenario, stopping at its first failing step
    pub async fn run_spec(&self, spec: &TestSpec) -> TestResult {
        let start = Instant::now();

        if spec.skip {
            return TestResult {
                name: spec.name.clone(),
                success: true,
                skipped: true,
                duration_ms: 0,
                steps: vec![],
                error: None,
            };
        }

        debug!("Running scenario: {}", spec.name);

        let policy = spec
            .poll
            .as_ref()
            .map(|p| p.policy())
            .unwrap_or_else(|| self.config.poll.clone());
        let app = self.dispatcher.app(spec.app_id.as_str()).with_policy(policy);

        let mut steps = Vec::new();
        let mut test_error = None;

        for message in &spec.setup {
            if let Err(e) = app.send_test_message(message).await {
                test_error = Some(format!("Setup message {} failed: {}", message.name, e));
                break;
            }
        }

        if test_error.is_none() {
            for step in &spec.steps {
                let result = execute_step(&app, step).await;
                let failed = !result.success;
                if failed {
                    let failure = E2eError::StepFailed {
                        step: result.step_name.clone(),
                        reason: result.error.clone().unwrap_or_default(),
                    };
                    test_error = Some(failure.to_string());
                }
                steps.push(result);
                if failed {
                    break;
                }
            }
        }

        TestResult {
            name: spec.name.clone(),
            success: test_error.is_none(),
            skipped: false,
            duration_ms: start.elapsed().as_millis() as u64,
            steps,
            error: test_error,
        }
    }

    /// Write results as pretty JSON into the output directory
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}
