//! Step execution against one application window

use filesapp_harness_common::Error;
use filesapp_harness_remote::ops::{
    ExecCommand, FakeDragAndDrop, FakeKeyDown, FakeMouseClick, FakeMouseDoubleClick,
    FakeMouseRightClick, InputText, OpenFile, Operation, SelectFile,
};
use filesapp_harness_remote::{AppHandle, FileListOptions, TestMessage};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::error::E2eResult;
use crate::spec::TestStep;

/// Result of executing a step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    pub step_name: String,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Execute a single step, recording failures in the result rather than
/// returning them.
pub async fn execute_step(app: &AppHandle, step: &TestStep) -> StepResult {
    let start = Instant::now();
    let step_name = step.name();

    debug!("Executing step: {}", step_name);
    let result = run_step(app, step).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(()) => StepResult {
            success: true,
            step_name,
            duration_ms,
            error: None,
        },
        Err(e) => StepResult {
            success: false,
            step_name,
            duration_ms,
            error: Some(e.to_string()),
        },
    }
}

/// Call an operation whose `bool` result reports whether it took effect.
async fn expect_true<O: Operation<Output = bool>>(app: &AppHandle, op: &O) -> E2eResult<()> {
    if app.call(op).await? {
        Ok(())
    } else {
        Err(Error::Assertion(format!("{} returned false", O::NAME)).into())
    }
}

async fn run_step(app: &AppHandle, step: &TestStep) -> E2eResult<()> {
    match step {
        TestStep::Call { name, args, expect } => {
            let result = app.call_raw(name, args.clone()).await?;
            if let Some(expected) = expect {
                if &result != expected {
                    return Err(Error::Assertion(format!(
                        "{} returned {}, expected {}",
                        name, result, expected
                    ))
                    .into());
                }
            }
        }
        TestStep::Message { name, fields, expect } => {
            let message = TestMessage {
                name: name.clone(),
                fields: fields.clone(),
            };
            let reply = app.send_test_message(&message).await?;
            if let Some(expected) = expect {
                if &reply != expected {
                    return Err(Error::Assertion(format!(
                        "message {} replied '{}', expected '{}'",
                        name, reply, expected
                    ))
                    .into());
                }
            }
        }
        TestStep::Click { query } => expect_true(app, &FakeMouseClick::new(query.as_str())).await?,
        TestStep::DoubleClick { query } => {
            expect_true(app, &FakeMouseDoubleClick::new(query.as_str())).await?
        }
        TestStep::RightClick { query } => {
            expect_true(app, &FakeMouseRightClick::new(query.as_str())).await?
        }
        TestStep::InputText { query, text } => {
            app.call(&InputText {
                query: query.clone(),
                text: text.clone(),
            })
            .await?;
        }
        TestStep::Key { query, key } => {
            expect_true(app, &FakeKeyDown::chord(query.as_str(), key)?).await?
        }
        TestStep::SelectFile { name } => {
            expect_true(app, &SelectFile { name: name.clone() }).await?
        }
        TestStep::OpenFile { name } => expect_true(app, &OpenFile { name: name.clone() }).await?,
        TestStep::Command { command } => {
            expect_true(
                app,
                &ExecCommand {
                    command: command.clone(),
                },
            )
            .await?
        }
        TestStep::DragAndDrop { source, target } => {
            expect_true(
                app,
                &FakeDragAndDrop {
                    source: source.clone(),
                    target: target.clone(),
                },
            )
            .await?
        }
        TestStep::WaitForElement { query, text } => match text {
            Some(text) => {
                app.wait_for_element_with_text(query, text).await?;
            }
            None => {
                app.wait_for_element(query).await?;
            }
        },
        TestStep::WaitForElementLost { query } => app.wait_for_element_lost(query).await?,
        TestStep::WaitForFiles {
            rows,
            ignore_file_size,
            ignore_last_modified,
            check_order,
        } => {
            let options = FileListOptions {
                ignore_file_size: *ignore_file_size,
                ignore_last_modified: *ignore_last_modified,
                check_order: *check_order,
            };
            app.wait_for_files(rows, options).await?
        }
        TestStep::WaitForDirectory { path } => app.wait_until_current_directory_is(path).await?,
        TestStep::Sleep { ms } => tokio::time::sleep(Duration::from_millis(*ms)).await,
        TestStep::Log { message } => info!("[TEST LOG] {}", message),
    }
    Ok(())
}
