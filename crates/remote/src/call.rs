//! Remote call descriptors and test messages

use filesapp_harness_common::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Identifier of the application window a call is addressed to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(String);

impl AppId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AppId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for AppId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One invocation of a named test utility in the remote application.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCall {
    name: String,
    app_id: Option<AppId>,
    args: Vec<Value>,
}

impl RemoteCall {
    /// Build a call, rejecting names the remote side could never dispatch.
    pub fn new(name: impl Into<String>, app_id: Option<AppId>, args: Vec<Value>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidArgument("operation name is empty".to_string()));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(Error::InvalidArgument(format!(
                "operation name '{}' contains whitespace",
                name
            )));
        }
        Ok(Self { name, app_id, args })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn app_id(&self) -> Option<&AppId> {
        self.app_id.as_ref()
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }
}

impl From<RemoteCall> for Request {
    fn from(call: RemoteCall) -> Self {
        Request::Call {
            name: call.name,
            app_id: call.app_id,
            args: call.args,
        }
    }
}

/// Message for the test side channel that configures fakes in the
/// application under test (volumes, entries, policy rules, sync state).
///
/// Serialized flat: `{"name": "mountFakeUsb", ...fields}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestMessage {
    pub name: String,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl TestMessage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Map::new(),
        }
    }

    /// Add a field. Values that cannot be represented as JSON are rejected.
    pub fn field<V: Serialize>(mut self, key: impl Into<String>, value: V) -> Result<Self> {
        let key = key.into();
        if key == "name" {
            return Err(Error::InvalidArgument("'name' is reserved in test messages".to_string()));
        }
        self.fields.insert(key, serde_json::to_value(value)?);
        Ok(self)
    }
}

/// A request as it travels to the remote endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    Call {
        name: String,
        #[serde(rename = "appId")]
        app_id: Option<AppId>,
        args: Vec<Value>,
    },
    Message {
        message: TestMessage,
    },
}

impl Request {
    /// Short label for logs
    pub fn label(&self) -> String {
        match self {
            Request::Call { name, app_id: Some(app), .. } => format!("{}@{}", name, app),
            Request::Call { name, app_id: None, .. } => name.clone(),
            Request::Message { message } => format!("message:{}", message.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rejects_bad_names() {
        assert!(RemoteCall::new("", None, vec![]).is_err());
        assert!(RemoteCall::new("get file list", None, vec![]).is_err());
        assert!(RemoteCall::new("getFileList", None, vec![]).is_ok());
    }

    #[test]
    fn test_call_request_shape() {
        let call = RemoteCall::new("fakeMouseClick", Some("window-1".into()), vec![json!("#delete-button")]).unwrap();
        let request = Request::from(call);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "type": "call",
                "name": "fakeMouseClick",
                "appId": "window-1",
                "args": ["#delete-button"],
            })
        );
        assert_eq!(request.label(), "fakeMouseClick@window-1");
    }

    #[test]
    fn test_message_is_flattened() {
        let message = TestMessage::new("mountFakeUsb")
            .field("volumeType", "removable")
            .unwrap();
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"name": "mountFakeUsb", "volumeType": "removable"})
        );
        assert!(TestMessage::new("x").field("name", "y").is_err());
    }
}
