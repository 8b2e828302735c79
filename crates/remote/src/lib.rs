//! Files App Harness Remote Calls
//!
//! Drives a running Files app through its test endpoint:
//!
//! - [`Dispatcher`] forwards `(operation, app id, args)` and returns the
//!   remote result, with no retries of its own
//! - [`ops`] pins operation names to typed arguments and results
//! - [`AppHandle`] binds a dispatcher to one window and carries the wait
//!   helpers built on the polling waiter
//! - [`transport`] speaks line-delimited JSON over a Unix or TCP socket
//!
//! ```no_run
//! use filesapp_harness_common::{HarnessConfig, Result};
//! use filesapp_harness_remote::{ops::FakeMouseClick, Dispatcher};
//!
//! # async fn run() -> Result<()> {
//! let config = HarnessConfig::default();
//! let app = Dispatcher::connect(&config.remote).await?.app("window-1");
//! app.wait_for_element("#file-list").await?;
//! app.call(&FakeMouseClick::new("#delete-button")).await?;
//! app.wait_for_element_lost("#file-list li[file-name='hello.txt']").await?;
//! # Ok(())
//! # }
//! ```

pub mod call;
pub mod dispatcher;
pub mod fake;
pub mod helpers;
pub mod ops;
pub mod transport;

pub use call::{AppId, RemoteCall, Request, TestMessage};
pub use dispatcher::{AppHandle, Dispatcher};
pub use helpers::{FakeVolume, FileListOptions, Volume};
pub use transport::{LineTransport, RemoteFault, Transport};
