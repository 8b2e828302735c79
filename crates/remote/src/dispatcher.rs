//! Remote test utility dispatcher
//!
//! Forwards one named operation at a time to the application under test.
//! Nothing is retried, cached or batched here; callers that need to wait
//! for a post-condition wrap calls in the polling waiter.

use filesapp_harness_common::{Error, PollPolicy, RemoteConfig, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::call::{AppId, RemoteCall, Request, TestMessage};
use crate::ops::Operation;
use crate::transport::{self, Transport};

/// Generic entry point for remote test utilities
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Connect to the endpoint named in `config`
    pub async fn connect(config: &RemoteConfig) -> Result<Self> {
        let transport = transport::connect(&config.endpoint, config.io_timeout()).await?;
        Ok(Self::new(transport))
    }

    /// Forward a prepared call and return the remote result unmodified.
    pub async fn call_remote_test_util(&self, call: RemoteCall) -> Result<Value> {
        let request = Request::from(call);
        debug!("Remote call {}", request.label());
        self.transport.exchange(request).await
    }

    /// Forward `name` with untyped arguments.
    pub async fn call_raw(&self, name: &str, app_id: Option<&AppId>, args: Vec<Value>) -> Result<Value> {
        let call = RemoteCall::new(name, app_id.cloned(), args)?;
        self.call_remote_test_util(call).await
    }

    /// Forward a typed operation and decode its result.
    pub async fn call<O: Operation>(&self, app_id: Option<&AppId>, op: &O) -> Result<O::Output> {
        let value = self.call_raw(O::NAME, app_id, op.args()?).await?;
        serde_json::from_value(value.clone()).map_err(|e| {
            Error::UnexpectedResponse(format!("{} returned {}: {}", O::NAME, value, e))
        })
    }

    /// Send a message on the test side channel and return its reply.
    pub async fn send_test_message(&self, message: &TestMessage) -> Result<String> {
        let request = Request::Message {
            message: message.clone(),
        };
        debug!("Test message {}", message.name);
        match self.transport.exchange(request).await? {
            Value::String(reply) => Ok(reply),
            Value::Null => Ok(String::new()),
            other => Ok(other.to_string()),
        }
    }

    /// Bind this dispatcher to one application window
    pub fn app(&self, app_id: impl Into<AppId>) -> AppHandle {
        AppHandle {
            dispatcher: self.clone(),
            app_id: app_id.into(),
            policy: PollPolicy::default(),
        }
    }
}

/// Explicit context for one application window: every call made through it
/// is addressed to `app_id`, and every wait uses `policy`.
#[derive(Clone)]
pub struct AppHandle {
    pub(crate) dispatcher: Dispatcher,
    pub(crate) app_id: AppId,
    pub(crate) policy: PollPolicy,
}

impl AppHandle {
    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn app_id(&self) -> &AppId {
        &self.app_id
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub async fn call<O: Operation>(&self, op: &O) -> Result<O::Output> {
        self.dispatcher.call(Some(&self.app_id), op).await
    }

    pub async fn call_raw(&self, name: &str, args: Vec<Value>) -> Result<Value> {
        self.dispatcher.call_raw(name, Some(&self.app_id), args).await
    }

    pub async fn send_test_message(&self, message: &TestMessage) -> Result<String> {
        self.dispatcher.send_test_message(message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{FakeMouseClick, GetFileList};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Transport that records requests and replays canned results
    struct Scripted {
        seen: Mutex<Vec<Request>>,
        replies: Mutex<Vec<Result<Value>>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<Value>>) -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
                replies: Mutex::new(replies.into_iter().rev().collect()),
            })
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn exchange(&self, request: Request) -> Result<Value> {
            self.seen.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(Error::ConnectionClosed))
        }
    }

    #[tokio::test]
    async fn test_raw_result_is_returned_unmodified() {
        let transport = Scripted::new(vec![Ok(json!([["a.txt", "10 B", "Jan 1"]]))]);
        let dispatcher = Dispatcher::new(transport.clone());

        let result = dispatcher
            .call_raw("getFileList", Some(&"window-1".into()), vec![])
            .await
            .unwrap();
        assert_eq!(result, json!([["a.txt", "10 B", "Jan 1"]]));

        let seen = transport.seen.lock().unwrap();
        assert_eq!(
            seen[0],
            Request::Call {
                name: "getFileList".to_string(),
                app_id: Some("window-1".into()),
                args: vec![],
            }
        );
    }

    #[tokio::test]
    async fn test_typed_call_decodes_output() {
        let transport = Scripted::new(vec![Ok(json!([["a.txt", "10 B", "Text", "Jan 1"]]))]);
        let app = Dispatcher::new(transport).app("window-1");

        let rows = app.call(&GetFileList).await.unwrap();
        assert_eq!(rows, vec![vec!["a.txt", "10 B", "Text", "Jan 1"]]);
    }

    #[tokio::test]
    async fn test_shape_mismatch_is_unexpected_response() {
        let transport = Scripted::new(vec![Ok(json!("not a bool"))]);
        let app = Dispatcher::new(transport).app("window-1");

        let err = app.call(&FakeMouseClick::new("#ok")).await.unwrap_err();
        assert!(matches!(err, Error::UnexpectedResponse(ref m) if m.contains("fakeMouseClick")));
    }

    #[tokio::test]
    async fn test_invalid_arguments_never_reach_transport() {
        let transport = Scripted::new(vec![]);
        let app = Dispatcher::new(transport.clone()).app("window-1");

        let err = app.call(&FakeMouseClick::new("")).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(transport.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failures_are_not_retried() {
        let transport = Scripted::new(vec![
            Err(Error::Transport("reset by peer".to_string())),
            Ok(json!(true)),
        ]);
        let app = Dispatcher::new(transport.clone()).app("window-1");

        assert!(app.call(&FakeMouseClick::new("#ok")).await.is_err());
        assert_eq!(transport.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_message_reply() {
        let transport = Scripted::new(vec![Ok(json!("true")), Ok(json!(null)), Ok(json!(3))]);
        let dispatcher = Dispatcher::new(transport.clone());
        let message = TestMessage::new("getVolumesCount");

        assert_eq!(dispatcher.send_test_message(&message).await.unwrap(), "true");
        assert_eq!(dispatcher.send_test_message(&message).await.unwrap(), "");
        assert_eq!(dispatcher.send_test_message(&message).await.unwrap(), "3");
        assert!(matches!(
            transport.seen.lock().unwrap()[0],
            Request::Message { ref message } if message.name == "getVolumesCount"
        ));
    }
}
