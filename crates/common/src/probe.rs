//! Outcome of a single polling attempt

use serde::Serialize;
use serde_json::Value;

use crate::format::format_message;

/// Diagnostic carried by a pending attempt: a `%s`/`%d`/`%j` template plus
/// its positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    template: String,
    args: Vec<Value>,
}

impl Diagnostic {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            args: Vec::new(),
        }
    }

    /// Append a positional argument. Values that fail to serialize are
    /// recorded as their error text so a diagnostic never fails to render.
    pub fn arg<A: Serialize>(mut self, arg: A) -> Self {
        let value = serde_json::to_value(arg).unwrap_or_else(|e| Value::String(e.to_string()));
        self.args.push(value);
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Render the template with its arguments.
    pub fn render(&self) -> String {
        format_message(&self.template, &self.args)
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

/// Result of one probe invocation.
///
/// A probe that has nothing to return still has to say it is done, with
/// `ProbeOutcome::Done(())`.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome<T> {
    Done(T),
    Pending(Diagnostic),
}

impl<T> ProbeOutcome<T> {
    pub fn pending(template: impl Into<String>) -> Self {
        ProbeOutcome::Pending(Diagnostic::new(template))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ProbeOutcome::Pending(_))
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ProbeOutcome<U> {
        match self {
            ProbeOutcome::Done(value) => ProbeOutcome::Done(f(value)),
            ProbeOutcome::Pending(diagnostic) => ProbeOutcome::Pending(diagnostic),
        }
    }
}

/// Build a `ProbeOutcome::Pending` from a template and positional arguments.
///
/// ```
/// use filesapp_harness_common::{pending, ProbeOutcome};
///
/// let outcome: ProbeOutcome<()> = pending!("Waiting for %s to equal %d", "count", 5);
/// match outcome {
///     ProbeOutcome::Pending(d) => assert_eq!(d.render(), "Waiting for count to equal 5"),
///     ProbeOutcome::Done(_) => unreachable!(),
/// }
/// ```
#[macro_export]
macro_rules! pending {
    ($template:expr $(,)?) => {
        $crate::ProbeOutcome::Pending($crate::Diagnostic::new($template))
    };
    ($template:expr, $($arg:expr),+ $(,)?) => {
        $crate::ProbeOutcome::Pending(
            $crate::Diagnostic::new($template)$(.arg(&$arg))+
        )
    };
}
