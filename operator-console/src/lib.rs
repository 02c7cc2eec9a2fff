pub mod prompt;
pub mod report;

use audit_log::{AuditEvent, AuditLog};
use skyprune_core::{DeletionObserver, DeletionOutcome, DeletionStatus};
use std::io::Write;
use std::time::Duration;

pub use prompt::{Confirmation, Prompter};

/// Prints deletion progress for the operator and mirrors every event into
/// the run's audit log.
pub struct ConsoleObserver<'a, W> {
    out: W,
    audit: &'a AuditLog,
}

impl<'a, W: Write> ConsoleObserver<'a, W> {
    pub fn new(out: W, audit: &'a AuditLog) -> Self {
        Self { out, audit }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{}", line).and_then(|_| self.out.flush()) {
            tracing::warn!("Could not write progress to console: {}", e);
        }
    }
}

impl<W: Write> DeletionObserver for ConsoleObserver<'_, W> {
    fn on_retry(&mut self, uri: &str, attempt: u32, max_attempts: u32, delay: Duration) {
        self.emit(&format!(
            "⚠ Rate limit hit, waiting {}s before retry...",
            delay.as_secs_f64()
        ));
        self.audit.record(AuditEvent::RetryScheduled {
            uri,
            delay,
            attempt,
            max_attempts,
        });
    }

    fn on_outcome(&mut self, position: usize, total: usize, outcome: &DeletionOutcome) {
        match &outcome.status {
            DeletionStatus::Deleted => {}
            DeletionStatus::FailedRateLimited => self.emit(&format!(
                "✗ Failed to delete post {} after {} attempts (rate limit)",
                position, outcome.attempts
            )),
            DeletionStatus::FailedOther { reason } => {
                self.emit(&format!("✗ Failed to delete post {}: {}", position, reason))
            }
        }
        self.audit.record(AuditEvent::Outcome {
            position,
            total,
            outcome,
        });
    }

    fn on_progress(&mut self, completed: usize, total: usize) {
        self.emit(&format!("Progress: {}/{} posts deleted", completed, total));
    }
}
