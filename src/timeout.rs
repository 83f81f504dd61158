//! Generic timeout wrapper for external-tool invocations (spec.md §5).
//!
//! External tool calls carry a per-call timeout; on timeout the call
//! reports as failed and the caller treats the underlying fragment as
//! whatever its own fallback rule says (PCR-impossible, off-target
//! screening skipped, etc.) rather than aborting the whole invocation.

use crate::error::{PlannerError, Result};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Runs `work` on a helper thread and waits up to `timeout`. If the
/// deadline passes before `work` finishes, returns
/// `Error::ExternalToolFailure` naming `tool`; the helper thread is
/// abandoned (it will finish and drop its result silently, since external
/// tools are simple child-process calls with no shared state to corrupt).
pub fn with_timeout<T, F>(tool: &str, timeout: Duration, work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(work());
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(PlannerError::ExternalToolFailure {
            tool: tool.to_string(),
            detail: format!("timed out after {:?}", timeout),
        }),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(PlannerError::ExternalToolFailure {
            tool: tool.to_string(),
            detail: "worker thread terminated without a result".to_string(),
        }),
    }
}

/// A token polled cooperatively at each branch-and-bound expansion and
/// between worker batches (spec.md §5). Cheap to clone and share.
#[derive(Clone, Default)]
pub struct CancellationToken {
    flag: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Returns `Err(Error::Cancelled)` if cancellation has been requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(PlannerError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_work_completes_before_timeout() {
        let result = with_timeout("aligner", Duration::from_secs(1), || Ok(42));
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn slow_work_times_out() {
        let result: Result<()> = with_timeout("aligner", Duration::from_millis(20), || {
            thread::sleep(Duration::from_millis(200));
            Ok(())
        });
        assert!(matches!(
            result.unwrap_err(),
            PlannerError::ExternalToolFailure { .. }
        ));
    }

    #[test]
    fn cancellation_token_reflects_cancel() {
        let token = CancellationToken::new();
        assert!(token.check().is_ok());
        token.cancel();
        assert!(matches!(token.check().unwrap_err(), PlannerError::Cancelled));
    }
}
