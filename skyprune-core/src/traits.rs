use crate::error::CoreError;
use crate::types::{Credentials, DeletionOutcome, Post};
use async_trait::async_trait;
use std::time::Duration;

/// Removes a single post. Implementations report rate limiting as
/// `BlueskyApiError::RateLimitExceeded` so callers never inspect messages.
#[async_trait]
pub trait PostDeleter {
    async fn delete_post(&mut self, uri: &str) -> Result<(), CoreError>;
}

/// The account operations one cleanup run needs, in the order it needs them.
#[async_trait]
pub trait AccountClient: PostDeleter {
    async fn sign_in(&mut self, credentials: &Credentials) -> Result<(), CoreError>;

    /// Every post the account wrote, newest first. `on_fetched` receives the
    /// running count after each post.
    async fn fetch_all_posts(
        &mut self,
        on_fetched: &mut (dyn FnMut(usize) + Send),
    ) -> Result<Vec<Post>, CoreError>;
}

/// Receives deletion progress. All methods default to no-ops.
pub trait DeletionObserver {
    fn on_retry(&mut self, _uri: &str, _attempt: u32, _max_attempts: u32, _delay: Duration) {}

    /// `position` is 1-based.
    fn on_outcome(&mut self, _position: usize, _total: usize, _outcome: &DeletionOutcome) {}

    fn on_progress(&mut self, _completed: usize, _total: usize) {}
}

/// Observer that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl DeletionObserver for NoopObserver {}
