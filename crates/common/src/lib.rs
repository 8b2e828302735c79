//! Files App Harness Common Library
//!
//! Shared pieces of the remote-control test harness: the error type, the
//! polling condition waiter with its diagnostic formatting, configuration,
//! and fixture entries describing expected file-list rows.

pub mod config;
pub mod error;
pub mod fixture;
pub mod format;
pub mod poll;
pub mod probe;

// Re-export commonly used types
pub use config::{Endpoint, HarnessConfig, PollConfig, RemoteConfig};
pub use error::{Error, Result};
pub use fixture::{EntryKind, FileRow, TestEntryInfo};
pub use format::format_message;
pub use poll::{poll_until, repeat_until, repeat_until_with, CallerTag, PollPolicy};
pub use probe::{Diagnostic, ProbeOutcome};

/// Harness version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
