//! Sequential deletion of the delete set.
//!
//! Each post gets up to `max_attempts` tries. Only rate limiting is retried,
//! with exponential backoff; every other failure is final for that post.
//! A fixed pacing pause separates consecutive posts. Failures never stop the
//! batch and nothing is rolled back.

use crate::pacing::{PacingConfig, RequestPacer};
use crate::retry::{calculate_delay, get_retry_strategy, RetryConfig, RetryStrategy};
use skyprune_core::{
    AppConfig, ClassifiedPost, DeletionObserver, DeletionOutcome, DeletionReport, DeletionStatus,
    PostDeleter,
};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};

#[derive(Debug)]
pub struct DeletionExecutor {
    retry: RetryConfig,
    pacer: RequestPacer,
}

impl DeletionExecutor {
    pub fn new(retry: RetryConfig, pacing: PacingConfig) -> Self {
        Self {
            retry,
            pacer: RequestPacer::new(pacing),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            RetryConfig::from(&config.retry),
            PacingConfig::from(&config.pacing),
        )
    }

    pub fn pacing_interval(&self) -> Duration {
        self.pacer.interval()
    }

    /// Delete every post in order. In dry-run mode nothing is called and the
    /// report is empty.
    pub async fn run<D, O>(
        &mut self,
        posts: &[ClassifiedPost],
        dry_run: bool,
        deleter: &mut D,
        observer: &mut O,
    ) -> DeletionReport
    where
        D: PostDeleter + Send,
        O: DeletionObserver + Send,
    {
        let mut report = DeletionReport::default();
        if dry_run {
            info!("Dry-run: skipping deletion of {} posts", posts.len());
            return report;
        }

        let total = posts.len();
        info!("Deleting {} posts", total);

        for (index, classified) in posts.iter().enumerate() {
            let position = index + 1;
            let outcome = self.delete_one(classified, deleter, observer).await;

            observer.on_outcome(position, total, &outcome);
            report.push(outcome);

            if self.pacer.progress_due(position, total) {
                observer.on_progress(position, total);
            }

            self.pacer.pause_after(position, total).await;
        }

        info!(
            "Deletion finished: {} deleted, {} failed",
            report.deleted_count, report.failed_count
        );
        report
    }

    async fn delete_one<D, O>(
        &self,
        classified: &ClassifiedPost,
        deleter: &mut D,
        observer: &mut O,
    ) -> DeletionOutcome
    where
        D: PostDeleter + Send,
        O: DeletionObserver + Send,
    {
        let post = &classified.post;
        let max_attempts = self.retry.max_attempts;
        let finish = |attempts: u32, status: DeletionStatus| DeletionOutcome {
            uri: post.uri.clone(),
            text: post.text.clone(),
            attempts,
            status,
        };

        for attempt in 1..=max_attempts {
            let error = match deleter.delete_post(&post.uri).await {
                Ok(()) => {
                    debug!("Deleted {} on attempt {}", post.uri, attempt);
                    return finish(attempt, DeletionStatus::Deleted);
                }
                Err(error) => error,
            };

            // The observer tells the operator; these stay at debug level.
            match get_retry_strategy(&error, attempt, &self.retry) {
                RetryStrategy::Retry => {
                    let delay = calculate_delay(attempt, &self.retry);
                    debug!(
                        "Rate limit hit for {}, retrying in {:?} (attempt {}/{})",
                        post.uri, delay, attempt, max_attempts
                    );
                    observer.on_retry(&post.uri, attempt, max_attempts, delay);
                    sleep(delay).await;
                }
                RetryStrategy::GiveUpRateLimited => {
                    debug!(
                        "Rate limit exceeded for {} after {} attempts",
                        post.uri, attempt
                    );
                    return finish(attempt, DeletionStatus::FailedRateLimited);
                }
                RetryStrategy::NoRetry => {
                    debug!("Failed to delete {}: {}", post.uri, error);
                    return finish(
                        attempt,
                        DeletionStatus::FailedOther {
                            reason: error.to_string(),
                        },
                    );
                }
            }
        }

        finish(
            0,
            DeletionStatus::FailedOther {
                reason: "no delete attempts configured".to_string(),
            },
        )
    }
}
