//! Terminal-outcome plumbing: run results, the caller-facing callback, and
//! the per-package completion sink handed to the deletion port.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Error code surfaced through [`TaskCallback::on_error`].
///
/// Resolution failures and deletion failures both map to this code; the
/// distinction is preserved in log output only.
pub const ERROR_DELETING_APPS: u32 = 0;

/// Terminal state of one cleanup run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    Error(u32),
}

/// Caller-facing completion callback.
///
/// Invoked exactly once per run, possibly from the execution context that
/// delivers the final package completion.
pub trait TaskCallback: Send + Sync {
    fn on_success(&self);
    fn on_error(&self, code: u32);
}

// ── Join state ────────────────────────────────────────────────────────────────

/// Shared state for one fan-out/join cycle.
///
/// `outstanding` counts issued deletions not yet completed. `terminated`
/// makes the terminal state absorbing: whichever delivery path reaches it
/// first wins, and the callback can never fire twice.
pub(crate) struct JoinState {
    outstanding: AtomicUsize,
    failure_observed: AtomicBool,
    terminated: AtomicBool,
    callback: Arc<dyn TaskCallback>,
}

impl JoinState {
    pub(crate) fn new(outstanding: usize, callback: Arc<dyn TaskCallback>) -> Arc<Self> {
        Arc::new(Self {
            outstanding: AtomicUsize::new(outstanding),
            failure_observed: AtomicBool::new(false),
            terminated: AtomicBool::new(false),
            callback,
        })
    }

    /// Record one package completion. The delivery that moves the counter
    /// from 1 to 0 finalizes the run; first failure wins for the outcome.
    pub(crate) fn complete_one(&self, package: &str, succeeded: bool) {
        if succeeded {
            debug!(package, "package deleted");
        } else {
            warn!(package, "package deletion failed");
            self.failure_observed.store(true, Ordering::SeqCst);
        }
        // checked_sub: a delivery after the counter reached zero would mean a
        // port violated its exactly-once contract. Ignore it rather than
        // wrapping the counter and re-arming the join.
        match self
            .outstanding
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        {
            Ok(1) => self.finalize(),
            Ok(_) => {}
            Err(_) => warn!(package, "completion delivered after join finished; ignored"),
        }
    }

    /// Emit the terminal callback. Absorbing: only the first caller wins.
    fn finalize(&self) {
        if self.terminated.swap(true, Ordering::SeqCst) {
            return;
        }
        if self.failure_observed.load(Ordering::SeqCst) {
            self.callback.on_error(ERROR_DELETING_APPS);
        } else {
            self.callback.on_success();
        }
    }
}

// ── Deletion sink ─────────────────────────────────────────────────────────────

/// Per-package completion handle handed to the deletion port.
///
/// `complete` consumes the sink, so a port cannot report the same package
/// twice. A sink dropped without completion is recorded as a failure, so a
/// buggy port cannot leave the join barrier hanging.
pub struct DeletionSink {
    package: String,
    state: Option<Arc<JoinState>>,
}

impl DeletionSink {
    pub(crate) fn new(package: String, state: Arc<JoinState>) -> Self {
        Self {
            package,
            state: Some(state),
        }
    }

    /// Report the removal result for this sink's package.
    pub fn complete(mut self, succeeded: bool) {
        if let Some(state) = self.state.take() {
            state.complete_one(&self.package, succeeded);
        }
    }

    /// The package this sink reports for.
    #[must_use]
    pub fn package(&self) -> &str {
        &self.package
    }
}

impl Drop for DeletionSink {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            warn!(package = %self.package, "deletion sink dropped without a result; counting as failure");
            state.complete_one(&self.package, false);
        }
    }
}

// ── Awaitable callback ────────────────────────────────────────────────────────

/// [`TaskCallback`] backed by a oneshot channel, for callers that want to
/// await the terminal outcome instead of implementing the trait.
pub struct ChannelCallback {
    tx: Mutex<Option<oneshot::Sender<RunOutcome>>>,
}

/// Build an awaitable callback and its receiving half.
#[must_use]
pub fn outcome_channel() -> (Arc<ChannelCallback>, oneshot::Receiver<RunOutcome>) {
    let (tx, rx) = oneshot::channel();
    (
        Arc::new(ChannelCallback {
            tx: Mutex::new(Some(tx)),
        }),
        rx,
    )
}

impl ChannelCallback {
    fn send(&self, outcome: RunOutcome) {
        let tx = self.tx.lock().ok().and_then(|mut slot| slot.take());
        if let Some(tx) = tx {
            // Receiver may already be gone; the outcome is then discarded.
            let _ = tx.send(outcome);
        }
    }
}

impl TaskCallback for ChannelCallback {
    fn on_success(&self) {
        self.send(RunOutcome::Success);
    }

    fn on_error(&self, code: u32) {
        self.send(RunOutcome::Error(code));
    }
}
