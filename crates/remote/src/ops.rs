//! Typed remote operations
//!
//! Each operation pins one remote test-utility name to the arguments it
//! expects and the shape of its result, so argument lists are checked where
//! the call is written instead of failing on the remote side.

use filesapp_harness_common::{Error, FileRow, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// A remote test utility with a known argument encoding and result shape
pub trait Operation {
    /// Remote utility name
    const NAME: &'static str;

    /// Deserialized result
    type Output: DeserializeOwned;

    /// Positional arguments
    fn args(&self) -> Result<Vec<Value>>;
}

/// Snapshot of a DOM element as reported by the remote side
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ElementObject {
    pub tag_name: String,
    pub text: Option<String>,
    pub inner_text: Option<String>,
    pub value: Option<String>,
    pub hidden: bool,
    pub attributes: BTreeMap<String, String>,
    pub styles: BTreeMap<String, String>,
    pub render_left: Option<f64>,
    pub render_top: Option<f64>,
    pub render_width: Option<f64>,
    pub render_height: Option<f64>,
}

impl ElementObject {
    /// Visible text, preferring `innerText` over `textContent`
    pub fn visible_text(&self) -> Option<&str> {
        self.inner_text.as_deref().or(self.text.as_deref())
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

fn selector(query: &str) -> Result<Value> {
    if query.trim().is_empty() {
        return Err(Error::InvalidArgument("element query is empty".to_string()));
    }
    Ok(Value::String(query.to_string()))
}

fn file_name(name: &str) -> Result<Value> {
    if name.is_empty() || name.contains('/') {
        return Err(Error::InvalidArgument(format!("'{}' is not a file name", name)));
    }
    Ok(Value::String(name.to_string()))
}

/// Rows of the current file list
#[derive(Debug, Clone, Copy, Default)]
pub struct GetFileList;

impl Operation for GetFileList {
    const NAME: &'static str = "getFileList";
    type Output = Vec<FileRow>;

    fn args(&self) -> Result<Vec<Value>> {
        Ok(vec![])
    }
}

/// All elements matching a CSS selector
#[derive(Debug, Clone)]
pub struct QueryAllElements {
    pub query: String,
    pub styles: Vec<String>,
}

impl QueryAllElements {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            styles: Vec::new(),
        }
    }

    pub fn with_styles<I, S>(mut self, styles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.styles = styles.into_iter().map(Into::into).collect();
        self
    }
}

impl Operation for QueryAllElements {
    const NAME: &'static str = "queryAllElements";
    type Output = Vec<ElementObject>;

    fn args(&self) -> Result<Vec<Value>> {
        Ok(vec![selector(&self.query)?, json!(self.styles)])
    }
}

/// Elements matched through a chain of shadow roots, one selector per level
#[derive(Debug, Clone)]
pub struct DeepQueryAllElements {
    pub path: Vec<String>,
    pub styles: Vec<String>,
}

impl DeepQueryAllElements {
    pub fn new<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            styles: Vec::new(),
        }
    }
}

impl Operation for DeepQueryAllElements {
    const NAME: &'static str = "deepQueryAllElements";
    type Output = Vec<ElementObject>;

    fn args(&self) -> Result<Vec<Value>> {
        if self.path.is_empty() {
            return Err(Error::InvalidArgument("deep query path is empty".to_string()));
        }
        let path = self
            .path
            .iter()
            .map(|q| selector(q))
            .collect::<Result<Vec<_>>>()?;
        Ok(vec![Value::Array(path), json!(self.styles)])
    }
}

macro_rules! query_operation {
    ($(#[$doc:meta])* $ty:ident, $name:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $ty {
            pub query: String,
        }

        impl $ty {
            pub fn new(query: impl Into<String>) -> Self {
                Self { query: query.into() }
            }
        }

        impl Operation for $ty {
            const NAME: &'static str = $name;
            type Output = bool;

            fn args(&self) -> Result<Vec<Value>> {
                Ok(vec![selector(&self.query)?])
            }
        }
    };
}

query_operation!(
    /// Left click on the first element matching the query
    FakeMouseClick,
    "fakeMouseClick"
);
query_operation!(FakeMouseDoubleClick, "fakeMouseDoubleClick");
query_operation!(
    /// Right click, opening the context menu
    FakeMouseRightClick,
    "fakeMouseRightClick"
);

/// Replace the value of a text input
#[derive(Debug, Clone)]
pub struct InputText {
    pub query: String,
    pub text: String,
}

impl Operation for InputText {
    const NAME: &'static str = "inputText";
    type Output = Value;

    fn args(&self) -> Result<Vec<Value>> {
        Ok(vec![selector(&self.query)?, json!(self.text)])
    }
}

/// Dispatch a keydown event
#[derive(Debug, Clone, Default)]
pub struct FakeKeyDown {
    pub query: String,
    pub key: String,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

impl FakeKeyDown {
    pub fn new(query: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            key: key.into(),
            ..Default::default()
        }
    }

    /// Parse a chord such as `ctrl-shift-Delete`
    pub fn chord(query: impl Into<String>, chord: &str) -> Result<Self> {
        let mut parts: Vec<&str> = chord.split('-').collect();
        let key = match parts.pop() {
            Some(key) if !key.is_empty() => key,
            _ => return Err(Error::InvalidArgument(format!("'{}' names no key", chord))),
        };
        let mut op = Self::new(query, key);
        for modifier in parts {
            match modifier.to_ascii_lowercase().as_str() {
                "ctrl" => op.ctrl = true,
                "shift" => op.shift = true,
                "alt" => op.alt = true,
                other => {
                    return Err(Error::InvalidArgument(format!(
                        "unknown modifier '{}' in '{}'",
                        other, chord
                    )))
                }
            }
        }
        Ok(op)
    }
}

impl Operation for FakeKeyDown {
    const NAME: &'static str = "fakeKeyDown";
    type Output = bool;

    fn args(&self) -> Result<Vec<Value>> {
        if self.key.is_empty() {
            return Err(Error::InvalidArgument("key is empty".to_string()));
        }
        Ok(vec![
            selector(&self.query)?,
            json!(self.key),
            json!(self.ctrl),
            json!(self.shift),
            json!(self.alt),
        ])
    }
}

/// Select a file in the current directory by name
#[derive(Debug, Clone)]
pub struct SelectFile {
    pub name: String,
}

impl Operation for SelectFile {
    const NAME: &'static str = "selectFile";
    type Output = bool;

    fn args(&self) -> Result<Vec<Value>> {
        Ok(vec![file_name(&self.name)?])
    }
}

/// Open a file or directory in the current directory by name
#[derive(Debug, Clone)]
pub struct OpenFile {
    pub name: String,
}

impl Operation for OpenFile {
    const NAME: &'static str = "openFile";
    type Output = bool;

    fn args(&self) -> Result<Vec<Value>> {
        Ok(vec![file_name(&self.name)?])
    }
}

/// The focused element, if any
#[derive(Debug, Clone, Copy, Default)]
pub struct GetActiveElement;

impl Operation for GetActiveElement {
    const NAME: &'static str = "getActiveElement";
    type Output = Option<ElementObject>;

    fn args(&self) -> Result<Vec<Value>> {
        Ok(vec![])
    }
}

/// Run an application command such as `delete` or `new-folder`
#[derive(Debug, Clone)]
pub struct ExecCommand {
    pub command: String,
}

impl Operation for ExecCommand {
    const NAME: &'static str = "execCommand";
    type Output = bool;

    fn args(&self) -> Result<Vec<Value>> {
        if self.command.trim().is_empty() {
            return Err(Error::InvalidArgument("command is empty".to_string()));
        }
        Ok(vec![json!(self.command)])
    }
}

/// Drag the source element and drop it on the target element
#[derive(Debug, Clone)]
pub struct FakeDragAndDrop {
    pub source: String,
    pub target: String,
}

impl Operation for FakeDragAndDrop {
    const NAME: &'static str = "fakeDragAndDrop";
    type Output = bool;

    fn args(&self) -> Result<Vec<Value>> {
        Ok(vec![selector(&self.source)?, selector(&self.target)?])
    }
}

/// Path shown in the breadcrumb, e.g. `/My files/Downloads`
#[derive(Debug, Clone, Copy, Default)]
pub struct GetBreadcrumbPath;

impl Operation for GetBreadcrumbPath {
    const NAME: &'static str = "getBreadcrumbPath";
    type Output = String;

    fn args(&self) -> Result<Vec<Value>> {
        Ok(vec![])
    }
}
