//! Polling condition waiter
//!
//! Repeatedly runs a probe with a fixed delay between attempts until it
//! reports [`ProbeOutcome::Done`]. Probe errors are returned immediately and
//! never retried. The policy bounds the wait with an attempt cap and/or a
//! deadline; exhausting it yields [`Error::Timeout`] carrying the last
//! pending diagnostic. A probe still running when the deadline passes is
//! dropped, so a peer that never answers cannot stall a bounded wait.

use std::fmt;
use std::future::Future;
use std::panic::Location;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::probe::ProbeOutcome;

/// Default delay between attempts
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(200);

/// Default overall deadline
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(60);

/// Source location of the code that started a wait, used to correlate
/// repeated pending messages with the test line that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerTag(&'static Location<'static>);

impl CallerTag {
    /// Tag for the caller of the enclosing `#[track_caller]` function.
    #[track_caller]
    pub fn here() -> Self {
        Self(Location::caller())
    }

    pub fn location(&self) -> &'static Location<'static> {
        self.0
    }
}

impl From<&'static Location<'static>> for CallerTag {
    fn from(location: &'static Location<'static>) -> Self {
        Self(location)
    }
}

impl fmt::Display for CallerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.0.file(), self.0.line(), self.0.column())
    }
}

/// Retry budget for a wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Fixed delay between attempts
    pub interval: Duration,

    /// Give up after this many probe invocations
    pub max_attempts: Option<u32>,

    /// Give up once this much time has passed since the first attempt
    pub deadline: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            max_attempts: None,
            deadline: Some(DEFAULT_DEADLINE),
        }
    }
}

impl PollPolicy {
    /// Poll until the probe is done, however long that takes.
    pub fn unbounded() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            max_attempts: None,
            deadline: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    fn exhausted(&self, attempts: u32, elapsed: Duration) -> bool {
        if self.max_attempts.is_some_and(|max| attempts >= max) {
            return true;
        }
        self.deadline.is_some_and(|deadline| elapsed >= deadline)
    }
}

/// Wait with the default policy.
#[track_caller]
pub fn repeat_until<T, F, Fut>(probe: F) -> impl Future<Output = Result<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ProbeOutcome<T>>>,
{
    poll_until(CallerTag::here(), PollPolicy::default(), probe)
}

/// Wait with an explicit policy.
#[track_caller]
pub fn repeat_until_with<T, F, Fut>(policy: &PollPolicy, probe: F) -> impl Future<Output = Result<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ProbeOutcome<T>>>,
{
    poll_until(CallerTag::here(), policy.clone(), probe)
}

/// Wait on behalf of `caller`.
///
/// Helpers that are themselves `#[track_caller]` use this to forward the
/// location of the test line rather than their own.
pub async fn poll_until<T, F, Fut>(caller: CallerTag, policy: PollPolicy, mut probe: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ProbeOutcome<T>>>,
{
    let start = Instant::now();
    let mut attempts: u32 = 0;
    let mut last_message: Option<String> = None;

    loop {
        attempts = attempts.saturating_add(1);

        // A probe that never completes must not outlive the deadline.
        let outcome = match policy.deadline {
            Some(deadline) => {
                let left = deadline.saturating_sub(start.elapsed());
                match timeout(left, probe()).await {
                    Ok(outcome) => outcome?,
                    Err(_) => {
                        let message = last_message
                            .unwrap_or_else(|| format!("attempt {} did not complete", attempts));
                        return Err(give_up(caller, attempts, start.elapsed(), message));
                    }
                }
            }
            None => probe().await?,
        };

        let diagnostic = match outcome {
            ProbeOutcome::Done(value) => return Ok(value),
            ProbeOutcome::Pending(diagnostic) => diagnostic,
        };

        let message = diagnostic.render();
        debug!(caller = %caller, attempt = attempts, "{}", message);

        let elapsed = start.elapsed();
        if policy.exhausted(attempts, elapsed) {
            return Err(give_up(caller, attempts, elapsed, message));
        }
        last_message = Some(message);

        let pause = match policy.deadline {
            Some(deadline) => policy.interval.min(deadline.saturating_sub(elapsed)),
            None => policy.interval,
        };
        sleep(pause).await;
    }
}

fn give_up(caller: CallerTag, attempts: u32, elapsed: Duration, message: String) -> Error {
    warn!(caller = %caller, attempts, ?elapsed, "Gave up waiting: {}", message);
    Error::Timeout {
        caller: caller.to_string(),
        attempts,
        elapsed,
        last_message: message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pending;
    use serde_json::Value;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Probe that stays pending for `pending_for` calls, then returns `value`.
    fn counting_probe(
        calls: Rc<Cell<u32>>,
        pending_for: u32,
        value: &'static str,
    ) -> impl FnMut() -> std::future::Ready<Result<ProbeOutcome<&'static str>>> {
        move || {
            let n = calls.get() + 1;
            calls.set(n);
            if n <= pending_for {
                std::future::ready(Ok(pending!("attempt %d", n)))
            } else {
                std::future::ready(Ok(ProbeOutcome::Done(value)))
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_after_exact_number_of_attempts() {
        let calls = Rc::new(Cell::new(0));
        let policy = PollPolicy::unbounded().with_interval(Duration::from_millis(100));

        let start = Instant::now();
        let value = repeat_until_with(&policy, counting_probe(calls.clone(), 2, "done"))
            .await
            .unwrap();

        assert_eq!(value, "done");
        assert_eq!(calls.get(), 3);
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_success_does_not_sleep() {
        let calls = Rc::new(Cell::new(0));
        let start = Instant::now();

        let value = repeat_until(counting_probe(calls.clone(), 0, "ready"))
            .await
            .unwrap();

        assert_eq!(value, "ready");
        assert_eq!(calls.get(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_done_is_terminal() {
        let value = repeat_until(|| async { Ok(ProbeOutcome::Done(Value::Null)) })
            .await
            .unwrap();
        assert_eq!(value, Value::Null);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_error_propagates_without_retry() {
        let calls = Rc::new(Cell::new(0u32));
        let counter = calls.clone();

        let result: Result<()> = repeat_until(move || {
            let n = counter.get() + 1;
            counter.set(n);
            async move {
                if n == 2 {
                    Err(Error::Transport("boom".to_string()))
                } else {
                    Ok(ProbeOutcome::pending("first try"))
                }
            }
        })
        .await;

        match result {
            Err(Error::Transport(msg)) => assert_eq!(msg, "boom"),
            other => panic!("expected the probe error, got {:?}", other),
        }
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_cap_reports_last_message() {
        let calls = Rc::new(Cell::new(0));
        let policy = PollPolicy::unbounded().with_max_attempts(4);

        let err = repeat_until_with(&policy, counting_probe(calls.clone(), u32::MAX, "never"))
            .await
            .unwrap_err();

        assert_eq!(calls.get(), 4);
        match err {
            Error::Timeout {
                attempts,
                last_message,
                caller,
                ..
            } => {
                assert_eq!(attempts, 4);
                assert_eq!(last_message, "attempt 4");
                assert!(caller.contains("poll.rs"), "caller tag was {}", caller);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_is_not_reached_early() {
        let calls = Rc::new(Cell::new(0));
        let policy = PollPolicy::unbounded()
            .with_interval(Duration::from_millis(100))
            .with_deadline(Duration::from_secs(1));

        let start = Instant::now();
        let err = repeat_until_with(&policy, counting_probe(calls.clone(), u32::MAX, "never"))
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(start.elapsed() >= Duration::from_secs(1));
        assert!((10..=12).contains(&calls.get()), "made {} attempts", calls.get());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_bounds_a_probe_that_never_completes() {
        let policy = PollPolicy::unbounded().with_deadline(Duration::from_secs(1));

        let start = Instant::now();
        let result: Result<()> = repeat_until_with(&policy, || {
            std::future::pending::<Result<ProbeOutcome<()>>>()
        })
        .await;

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(1) && elapsed < Duration::from_secs(2));
        match result {
            Err(Error::Timeout {
                attempts,
                last_message,
                ..
            }) => {
                assert_eq!(attempts, 1);
                assert_eq!(last_message, "attempt 1 did not complete");
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_probe_reports_previous_diagnostic() {
        let calls = Rc::new(Cell::new(0u32));
        let counter = calls.clone();
        let policy = PollPolicy::unbounded()
            .with_interval(Duration::from_millis(300))
            .with_deadline(Duration::from_secs(1));

        let start = Instant::now();
        let result: Result<()> = repeat_until_with(&policy, move || {
            let n = counter.get() + 1;
            counter.set(n);
            async move {
                if n == 1 {
                    Ok(pending!("Element %s does not exist", "#file-list"))
                } else {
                    std::future::pending().await
                }
            }
        })
        .await;

        assert_eq!(calls.get(), 2);
        assert!(start.elapsed() < Duration::from_secs(2));
        match result {
            Err(Error::Timeout { last_message, .. }) => {
                assert_eq!(last_message, "Element #file-list does not exist")
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_is_capped_at_the_deadline() {
        let calls = Rc::new(Cell::new(0));
        let policy = PollPolicy::unbounded()
            .with_interval(Duration::from_secs(10))
            .with_deadline(Duration::from_secs(1));

        let start = Instant::now();
        let err = repeat_until_with(&policy, counting_probe(calls.clone(), u32::MAX, "never"))
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(calls.get(), 2);
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    #[test]
    fn test_caller_tag_points_at_call_site() {
        let tag = CallerTag::here();
        let line = line!() - 1;
        assert_eq!(tag.location().line(), line);
        assert!(tag.to_string().ends_with(&format!("{}:{}", line, tag.location().column())));
    }
}
