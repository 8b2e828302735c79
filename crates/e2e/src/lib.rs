//! Files App Harness Scenario Runner
//!
//! Runs declarative YAML scenarios against a Files app that is already
//! listening on its test endpoint:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Scenario Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── run_all() / run_tagged() / run_test()                │
//! │    ├── run_spec(spec) -> TestResult                         │
//! │    └── write_results(suite) -> test-results.json            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestSpec (YAML)                                            │
//! │    ├── name, description, tags, app_id, poll                │
//! │    ├── setup: [test message]                                │
//! │    └── steps: [TestStep]                                    │
//! │          ├── call { name, args, expect? }                   │
//! │          ├── click / key / input_text / drag_and_drop       │
//! │          ├── wait_for_element { query, text? }              │
//! │          └── wait_for_files { rows, ignore_* }              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Dispatcher ── line JSON ──> application test endpoint      │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod runner;
pub mod spec;
pub mod steps;

pub use error::{E2eError, E2eResult};
pub use runner::{RunnerConfig, TestResult, TestRunner, TestSuiteResult};
pub use spec::{TestSpec, TestStep};
pub use steps::StepResult;
