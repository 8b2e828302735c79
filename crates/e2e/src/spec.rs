//! Declarative YAML scenario specification

use filesapp_harness_common::{FileRow, PollConfig};
use filesapp_harness_remote::TestMessage;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use crate::error::{E2eError, E2eResult};

/// A complete scenario parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSpec {
    /// Unique name for this scenario
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering scenarios
    #[serde(default)]
    pub tags: Vec<String>,

    /// Window the steps are addressed to
    #[serde(default = "default_app_id")]
    pub app_id: String,

    /// Skip this scenario (still reported)
    #[serde(default)]
    pub skip: bool,

    /// Wait policy overrides for this scenario
    #[serde(default)]
    pub poll: Option<PollConfig>,

    /// Test messages sent before the first step, e.g. to mount fake volumes
    #[serde(default)]
    pub setup: Vec<TestMessage>,

    /// Steps to execute in order
    pub steps: Vec<TestStep>,
}

fn default_app_id() -> String {
    "window-1".to_string()
}

/// A single step in a scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TestStep {
    /// Call any remote test utility, optionally checking its result
    Call {
        name: String,
        #[serde(default)]
        args: Vec<Value>,
        #[serde(default)]
        expect: Option<Value>,
    },

    /// Send a message on the test side channel
    Message {
        name: String,
        #[serde(default)]
        fields: Map<String, Value>,
        #[serde(default)]
        expect: Option<String>,
    },

    /// Left click an element
    Click { query: String },

    /// Double click an element
    DoubleClick { query: String },

    /// Right click an element
    RightClick { query: String },

    /// Replace the value of a text input
    InputText { query: String, text: String },

    /// Press a key chord such as `ctrl-a` on an element
    Key { query: String, key: String },

    /// Select a file in the current directory
    SelectFile { name: String },

    /// Open a file or folder in the current directory
    OpenFile { name: String },

    /// Run an application command
    Command { command: String },

    /// Drag one element onto another
    DragAndDrop { source: String, target: String },

    /// Wait for an element, optionally with a given text
    WaitForElement {
        query: String,
        #[serde(default)]
        text: Option<String>,
    },

    /// Wait until an element is gone
    WaitForElementLost { query: String },

    /// Wait until the file list holds these rows
    WaitForFiles {
        rows: Vec<FileRow>,
        #[serde(default)]
        ignore_file_size: bool,
        #[serde(default)]
        ignore_last_modified: bool,
        #[serde(default)]
        check_order: bool,
    },

    /// Wait until the breadcrumb shows a path
    WaitForDirectory { path: String },

    /// Wait for a fixed amount of time (use sparingly)
    Sleep { ms: u64 },

    /// Log a message (for debugging)
    Log { message: String },
}

impl TestStep {
    /// Short label for reports
    pub fn name(&self) -> String {
        match self {
            TestStep::Call { name, .. } => format!("call:{}", name),
            TestStep::Message { name, .. } => format!("message:{}", name),
            TestStep::Click { query } => format!("click:{}", query),
            TestStep::DoubleClick { query } => format!("double_click:{}", query),
            TestStep::RightClick { query } => format!("right_click:{}", query),
            TestStep::InputText { query, .. } => format!("input_text:{}", query),
            TestStep::Key { key, .. } => format!("key:{}", key),
            TestStep::SelectFile { name } => format!("select_file:{}", name),
            TestStep::OpenFile { name } => format!("open_file:{}", name),
            TestStep::Command { command } => format!("command:{}", command),
            TestStep::DragAndDrop { source, target } => format!("drag_and_drop:{}->{}", source, target),
            TestStep::WaitForElement { query, .. } => format!("wait_for_element:{}", query),
            TestStep::WaitForElementLost { query } => format!("wait_for_element_lost:{}", query),
            TestStep::WaitForFiles { rows, .. } => format!("wait_for_files:{} rows", rows.len()),
            TestStep::WaitForDirectory { path } => format!("wait_for_directory:{}", path),
            TestStep::Sleep { ms } => format!("sleep:{}ms", ms),
            TestStep::Log { message } => {
                format!("log:{}", message.chars().take(30).collect::<String>())
            }
        }
    }
}

impl TestSpec {
    /// Parse a scenario from a YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let spec: Self = serde_yaml::from_str(yaml)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Parse a scenario from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::SpecParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all scenarios from a directory, sorted by name
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut specs = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            specs.push(Self::from_file(entry.path())?);
        }

        specs.sort_by(|a, b| a.name.cmp(&b.name));
        if let Some(pair) = specs.windows(2).find(|pair| pair[0].name == pair[1].name) {
            return Err(E2eError::SpecParse(format!("Duplicate test name: {}", pair[0].name)));
        }

        Ok(specs)
    }

    /// Filter specs by tag
    pub fn filter_by_tag<'a>(specs: &'a [Self], tag: &str) -> Vec<&'a Self> {
        specs.iter().filter(|s| s.tags.iter().any(|t| t == tag)).collect()
    }

    fn validate(&self) -> E2eResult<()> {
        if self.name.trim().is_empty() {
            return Err(E2eError::SpecParse("scenario name is empty".to_string()));
        }
        if self.steps.is_empty() {
            return Err(E2eError::SpecParse(format!("'{}' has no steps", self.name)));
        }
        Ok(())
    }
}
