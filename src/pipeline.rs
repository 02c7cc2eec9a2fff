//! One interactive cleanup run, from credentials to the final log line.
//!
//! The run talks to the operator through a `Prompter` and to the account
//! through an `AccountClient`, so the whole flow can be driven from a
//! script. Each run path closes its audit log exactly once.

use anyhow::{Context, Result};
use audit_log::{AuditEvent, AuditLog};
use bluesky_client::DeletionExecutor;
use chrono::Utc;
use operator_console::report::{
    render_auth_failure, render_banner, render_deletion_summary, write_preview,
};
use operator_console::{Confirmation, ConsoleObserver, Prompter};
use skyprune_core::{
    partition_posts, AccountClient, AppConfig, BlueskyApiError, ClassifiedPost, CoreError,
    DeletionReport, Post, RunMode,
};
use std::fmt;
use std::io::{BufRead, Write};
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::debug;

/// Marks a failure the operator has already been told about.
#[derive(Debug)]
pub struct AlreadyReported;

impl fmt::Display for AlreadyReported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("already reported to the operator")
    }
}

impl std::error::Error for AlreadyReported {}

/// Whether `error` still has to be shown to the operator.
pub fn needs_report(error: &anyhow::Error) -> bool {
    error.downcast_ref::<AlreadyReported>().is_none()
}

/// How a run ended when nothing went wrong.
#[derive(Debug)]
pub enum RunOutcome {
    NoPosts,
    NothingToDelete,
    DryRunOnly,
    Cancelled,
    Completed(DeletionReport),
}

/// Process exit status: 0 for any finished run, cancellations included,
/// and 1 for failures.
pub fn exit_status(result: &Result<RunOutcome>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(_) => 1,
    }
}

/// Prompts block, so on a multi-threaded runtime they leave the scheduler.
fn blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current().map(|handle| handle.runtime_flavor()) {
        Ok(RuntimeFlavor::MultiThread) => tokio::task::block_in_place(f),
        _ => f(),
    }
}

pub struct Pipeline<'a, R, W, C> {
    config: &'a AppConfig,
    prompter: Prompter<R, W>,
    client: C,
}

impl<'a, R, W, C> Pipeline<'a, R, W, C>
where
    R: BufRead + Send,
    W: Write + Send,
    C: AccountClient + Send,
{
    pub fn new(config: &'a AppConfig, prompter: Prompter<R, W>, client: C) -> Self {
        Self {
            config,
            prompter,
            client,
        }
    }

    pub fn into_parts(self) -> (Prompter<R, W>, C) {
        (self.prompter, self.client)
    }

    pub async fn run(&mut self) -> Result<RunOutcome> {
        self.prompter.say(&render_banner())?;

        let credentials = blocking(|| self.prompter.ask_credentials())?;
        let criteria = blocking(|| self.prompter.ask_criteria())?;

        let audit = AuditLog::create(&self.config.log_dir, criteria.run_mode())
            .context("could not create the audit log")?;
        audit.record(AuditEvent::Separator);
        audit.record(AuditEvent::RunStarted {
            run_id: audit.run_id(),
            user: &credentials.identifier,
            criteria: &criteria,
        });

        self.prompter.say("\nAuthenticating...")?;
        if let Err(e) = self.client.sign_in(&credentials).await {
            let reason = match &e {
                CoreError::BlueskyApi(BlueskyApiError::AuthenticationFailed { reason }) => {
                    reason.clone()
                }
                other => other.to_string(),
            };
            self.prompter.say(&render_auth_failure(&reason))?;
            audit.record(AuditEvent::AuthenticationFailed { reason: &reason });
            return Err(anyhow::Error::new(e).context(AlreadyReported));
        }
        self.prompter.say(&format!(
            "✓ Successfully authenticated as {}",
            credentials.identifier
        ))?;

        self.prompter.say("\nFetching your posts...")?;
        audit.record(AuditEvent::FetchStarted);
        let posts = match self.fetch_posts().await {
            Ok(posts) => posts,
            Err(e) => {
                self.prompter.say(&format!("✗ Error fetching posts: {}", e))?;
                audit.record(AuditEvent::FetchFailed {
                    error: &e.to_string(),
                });
                return Err(anyhow::Error::new(e).context(AlreadyReported));
            }
        };
        self.prompter
            .say(&format!("✓ Fetched {} posts", posts.len()))?;
        audit.record(AuditEvent::FetchCompleted { count: posts.len() });

        if posts.is_empty() {
            self.prompter.say("No posts found!")?;
            audit.record(AuditEvent::NoPosts);
            return Ok(RunOutcome::NoPosts);
        }

        let outcome = partition_posts(posts, &criteria, Utc::now());
        audit.record(AuditEvent::FilterCriteria(&criteria));
        for skipped in &outcome.unparseable {
            audit.record(AuditEvent::UnparseableDate {
                uri: &skipped.post.uri,
                reason: &skipped.reason,
            });
        }
        audit.record(AuditEvent::FilterSummary {
            keep: outcome.to_keep.len(),
            delete: outcome.to_delete.len(),
            skipped: outcome.unparseable.len(),
        });
        if !outcome.unparseable.is_empty() {
            self.prompter.say(&format!(
                "\n⚠ Skipped {} posts with unreadable dates (see log)",
                outcome.unparseable.len()
            ))?;
        }

        write_preview(
            self.prompter.output(),
            &outcome.to_delete,
            self.config.preview_sample,
            &audit,
        )?;

        if outcome.to_delete.is_empty() {
            self.finish(&audit)?;
            return Ok(RunOutcome::NothingToDelete);
        }

        let mut executor = DeletionExecutor::from_config(self.config);

        if !criteria.dry_run {
            let result = if blocking(|| self.prompter.confirm_actual_deletion())? {
                self.confirm_and_delete(&mut executor, &outcome.to_delete, &audit)
                    .await?
            } else {
                self.cancel(&audit)?;
                RunOutcome::Cancelled
            };
            self.finish(&audit)?;
            return Ok(result);
        }

        let mut observer = ConsoleObserver::new(self.prompter.output(), &audit);
        executor
            .run(&outcome.to_delete, true, &mut self.client, &mut observer)
            .await;
        self.prompter
            .say("\n✓ Dry-run mode: No posts were actually deleted.")?;
        audit.record(AuditEvent::DryRunCompleted);

        if !blocking(|| self.prompter.offer_real_run())? {
            self.prompter.say("\n✓ Actual deletion skipped.")?;
            self.finish(&audit)?;
            return Ok(RunOutcome::DryRunOnly);
        }

        // The dry-run log ends here; the deletion log is the one reported.
        audit.record(AuditEvent::Separator);

        let real_criteria = criteria.for_real_run();
        let real_audit = AuditLog::create(&self.config.log_dir, RunMode::Deletion)
            .context("could not create the deletion audit log")?;
        real_audit.record(AuditEvent::Separator);
        real_audit.record(AuditEvent::ProceedingAfterDryRun {
            user: &credentials.identifier,
            criteria: &real_criteria,
        });

        let result = self
            .confirm_and_delete(&mut executor, &outcome.to_delete, &real_audit)
            .await?;
        self.finish(&real_audit)?;
        Ok(result)
    }

    async fn fetch_posts(&mut self) -> Result<Vec<Post>, CoreError> {
        let output = self.prompter.output();
        let mut on_fetched = |count: usize| {
            if count % 100 == 0 {
                if let Err(e) = writeln!(output, "  ...{} posts so far", count) {
                    debug!("Could not print fetch progress: {}", e);
                }
            }
        };
        self.client.fetch_all_posts(&mut on_fetched).await
    }

    /// Ask for the `DELETE` phrase and delete only once it is typed.
    async fn confirm_and_delete(
        &mut self,
        executor: &mut DeletionExecutor,
        posts: &[ClassifiedPost],
        audit: &AuditLog,
    ) -> Result<RunOutcome> {
        match blocking(|| self.prompter.confirm_phrase())? {
            Confirmation::Confirmed => {
                let report = self.delete_for_real(executor, posts, audit).await?;
                Ok(RunOutcome::Completed(report))
            }
            Confirmation::Cancelled => {
                self.cancel(audit)?;
                Ok(RunOutcome::Cancelled)
            }
        }
    }

    async fn delete_for_real(
        &mut self,
        executor: &mut DeletionExecutor,
        posts: &[ClassifiedPost],
        audit: &AuditLog,
    ) -> Result<DeletionReport> {
        self.prompter.say("\nDeleting posts...")?;
        self.prompter.say(&format!(
            "(Rate limiting: ~{}s delay between deletions)",
            executor.pacing_interval().as_secs_f64()
        ))?;

        let mut observer = ConsoleObserver::new(self.prompter.output(), audit);
        let report = executor
            .run(posts, false, &mut self.client, &mut observer)
            .await;

        self.prompter.say(&render_deletion_summary(&report))?;
        audit.record(AuditEvent::DeletionComplete {
            deleted: report.deleted_count,
            failed: report.failed_count,
        });
        Ok(report)
    }

    fn cancel(&mut self, audit: &AuditLog) -> Result<()> {
        self.prompter.say("\n✓ Deletion cancelled.")?;
        audit.record(AuditEvent::Cancelled);
        Ok(())
    }

    fn finish(&mut self, audit: &AuditLog) -> Result<()> {
        self.prompter
            .say(&format!("\n✓ Log saved to: {}", audit.path().display()))?;
        audit.record(AuditEvent::Separator);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use skyprune_core::{Credentials, PacingSettings, PostDeleter};
    use std::fs;
    use std::io::Cursor;
    use std::path::Path;
    use tempfile::TempDir;

    const ANSWERS_PREFIX: &str = "owner.bsky.social\nabcd-efgh-ijkl-mnop\n30\n0\n0\nn\n";

    #[derive(Default)]
    struct ScriptedAccount {
        sign_in_error: Option<CoreError>,
        fetch_error: Option<CoreError>,
        posts: Vec<Post>,
        deleted: Vec<String>,
    }

    impl ScriptedAccount {
        fn with_old_posts(count: usize) -> Self {
            let posts = (1..=count)
                .map(|n| Post {
                    uri: format!("at://did:plc:owner/app.bsky.feed.post/{}", n),
                    author_did: "did:plc:owner".to_string(),
                    created_at: "2020-01-01T00:00:00Z".to_string(),
                    text: format!("old post {}", n),
                    like_count: 0,
                    repost_count: 0,
                    has_image_embed: false,
                })
                .collect();
            Self {
                posts,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl PostDeleter for ScriptedAccount {
        async fn delete_post(&mut self, uri: &str) -> Result<(), CoreError> {
            self.deleted.push(uri.to_string());
            Ok(())
        }
    }

    #[async_trait]
    impl AccountClient for ScriptedAccount {
        async fn sign_in(&mut self, _credentials: &Credentials) -> Result<(), CoreError> {
            match self.sign_in_error.take() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }

        async fn fetch_all_posts(
            &mut self,
            on_fetched: &mut (dyn FnMut(usize) + Send),
        ) -> Result<Vec<Post>, CoreError> {
            if let Some(e) = self.fetch_error.take() {
                return Err(e);
            }
            for count in 1..=self.posts.len() {
                on_fetched(count);
            }
            Ok(self.posts.clone())
        }
    }

    struct Finished {
        result: Result<RunOutcome>,
        transcript: String,
        account: ScriptedAccount,
    }

    fn config_in(dir: &Path) -> AppConfig {
        AppConfig {
            log_dir: dir.to_path_buf(),
            pacing: PacingSettings {
                interval_ms: 0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    async fn run_script(dir: &Path, script: &str, account: ScriptedAccount) -> Finished {
        let config = config_in(dir);
        let prompter = Prompter::new(Cursor::new(script.as_bytes().to_vec()), Vec::new());
        let mut pipeline = Pipeline::new(&config, prompter, account);

        let result = pipeline.run().await;

        let (prompter, account) = pipeline.into_parts();
        let (_, output) = prompter.into_inner();
        Finished {
            result,
            transcript: String::from_utf8(output).unwrap(),
            account,
        }
    }

    fn read_log(dir: &Path, prefix: &str) -> String {
        let entry = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .find(|path| {
                path.file_name()
                    .unwrap()
                    .to_string_lossy()
                    .starts_with(prefix)
            })
            .unwrap_or_else(|| panic!("no {} log in {}", prefix, dir.display()));
        fs::read_to_string(entry).unwrap()
    }

    fn log_count(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test(start_paused = true)]
    async fn test_declining_first_gate_cancels_without_deleting() {
        let dir = TempDir::new().unwrap();
        let script = format!("{}n\nn\n", ANSWERS_PREFIX);

        let finished = run_script(dir.path(), &script, ScriptedAccount::with_old_posts(3)).await;

        assert!(matches!(finished.result, Ok(RunOutcome::Cancelled)));
        assert_eq!(exit_status(&finished.result), 0);
        assert!(finished.account.deleted.is_empty());
        assert!(finished.transcript.contains("✓ Deletion cancelled."));
        assert!(!finished.transcript.contains("Type 'DELETE'"));

        let log = read_log(dir.path(), "deletion-");
        assert!(log.contains(" - INFO - User cancelled deletion"));
        assert_eq!(log_count(dir.path()), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_word_at_phrase_gate_cancels_without_deleting() {
        let dir = TempDir::new().unwrap();
        let script = format!("{}n\ny\ndelete\nno\n", ANSWERS_PREFIX);

        let finished = run_script(dir.path(), &script, ScriptedAccount::with_old_posts(3)).await;

        assert!(matches!(finished.result, Ok(RunOutcome::Cancelled)));
        assert_eq!(exit_status(&finished.result), 0);
        assert!(finished.account.deleted.is_empty());
        // Lowercase "delete" is re-asked, not accepted.
        assert!(finished.transcript.contains("Invalid input."));
        assert!(read_log(dir.path(), "deletion-").contains("User cancelled deletion"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmed_run_deletes_every_candidate() {
        let dir = TempDir::new().unwrap();
        let script = format!("{}n\ny\nDELETE\n", ANSWERS_PREFIX);

        let finished = run_script(dir.path(), &script, ScriptedAccount::with_old_posts(3)).await;

        match &finished.result {
            Ok(RunOutcome::Completed(report)) => {
                assert_eq!(report.deleted_count, 3);
                assert_eq!(report.failed_count, 0);
            }
            other => panic!("Expected a completed run, got {:?}", other),
        }
        assert_eq!(finished.account.deleted.len(), 3);
        assert!(finished.transcript.contains("Successfully deleted: 3"));
        assert_eq!(finished.transcript.matches("Log saved to").count(), 1);

        let log = read_log(dir.path(), "deletion-");
        assert!(log.contains("Deletion complete: 3 deleted, 0 failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dry_run_then_real_run_uses_fresh_deletion_log() {
        let dir = TempDir::new().unwrap();
        let script = format!("{}y\ny\nDELETE\n", ANSWERS_PREFIX);

        let finished = run_script(dir.path(), &script, ScriptedAccount::with_old_posts(2)).await;

        assert!(matches!(finished.result, Ok(RunOutcome::Completed(_))));
        assert_eq!(finished.account.deleted.len(), 2);
        assert!(finished
            .transcript
            .contains("✓ Dry-run mode: No posts were actually deleted."));
        assert!(finished.transcript.contains("Type 'DELETE'"));

        // Only the deletion log is reported, once.
        assert_eq!(finished.transcript.matches("Log saved to").count(), 1);
        assert!(finished.transcript.contains("deletion-"));

        let dry_log = read_log(dir.path(), "dry-run-");
        assert!(dry_log.contains("Dry-run completed - no posts deleted"));
        assert!(!dry_log.contains("Deleted 1/2"));

        let real_log = read_log(dir.path(), "deletion-");
        assert!(real_log.contains("Proceeding with actual deletion after dry-run"));
        assert!(real_log.contains("Deleted 1/2"));
        assert!(real_log.contains("Deletion complete: 2 deleted, 0 failed"));
        assert_eq!(log_count(dir.path()), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dry_run_then_cancel_at_phrase_gate() {
        let dir = TempDir::new().unwrap();
        let script = format!("{}y\ny\ncancel\n", ANSWERS_PREFIX);

        let finished = run_script(dir.path(), &script, ScriptedAccount::with_old_posts(2)).await;

        assert!(matches!(finished.result, Ok(RunOutcome::Cancelled)));
        assert_eq!(exit_status(&finished.result), 0);
        assert!(finished.account.deleted.is_empty());
        assert_eq!(finished.transcript.matches("Log saved to").count(), 1);
        assert!(read_log(dir.path(), "deletion-").contains("User cancelled deletion"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dry_run_declined_follow_up_keeps_posts() {
        let dir = TempDir::new().unwrap();
        let script = format!("{}y\n\n", ANSWERS_PREFIX);

        let finished = run_script(dir.path(), &script, ScriptedAccount::with_old_posts(2)).await;

        assert!(matches!(finished.result, Ok(RunOutcome::DryRunOnly)));
        assert!(finished.account.deleted.is_empty());
        assert!(finished.transcript.contains("✓ Actual deletion skipped."));
        assert_eq!(finished.transcript.matches("Log saved to").count(), 1);
        assert_eq!(log_count(dir.path()), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_authentication_failure_exits_with_failure() {
        let dir = TempDir::new().unwrap();
        let script = format!("{}y\n", ANSWERS_PREFIX);
        let account = ScriptedAccount {
            sign_in_error: Some(CoreError::BlueskyApi(
                BlueskyApiError::AuthenticationFailed {
                    reason: "Invalid identifier or password".to_string(),
                },
            )),
            ..ScriptedAccount::with_old_posts(2)
        };

        let finished = run_script(dir.path(), &script, account).await;

        assert_eq!(exit_status(&finished.result), 1);
        let error = finished.result.unwrap_err();
        assert!(!needs_report(&error));
        assert!(error.downcast_ref::<CoreError>().is_some());
        assert!(finished
            .transcript
            .contains("✗ Authentication failed: Invalid identifier or password"));
        assert!(finished.transcript.contains("APP PASSWORD"));
        assert!(!finished.transcript.contains("Fetching your posts"));

        let log = read_log(dir.path(), "dry-run-");
        assert!(log.contains(" - ERROR - Authentication failed: Invalid identifier or password"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_exits_with_failure() {
        let dir = TempDir::new().unwrap();
        let script = format!("{}y\n", ANSWERS_PREFIX);
        let account = ScriptedAccount {
            fetch_error: Some(CoreError::BlueskyApi(BlueskyApiError::ServerError {
                status_code: 502,
            })),
            ..ScriptedAccount::with_old_posts(2)
        };

        let finished = run_script(dir.path(), &script, account).await;

        assert_eq!(exit_status(&finished.result), 1);
        assert!(!needs_report(finished.result.as_ref().unwrap_err()));
        assert!(finished.transcript.contains("✗ Error fetching posts:"));
        assert!(finished.account.deleted.is_empty());
        assert!(read_log(dir.path(), "dry-run-").contains(" - ERROR - Error fetching posts:"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_input_is_an_unreported_failure() {
        let dir = TempDir::new().unwrap();

        let finished = run_script(dir.path(), "owner.bsky.social\n", ScriptedAccount::default()).await;

        assert_eq!(exit_status(&finished.result), 1);
        assert!(needs_report(finished.result.as_ref().unwrap_err()));
        assert_eq!(log_count(dir.path()), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_account_stops_after_fetch() {
        let dir = TempDir::new().unwrap();
        let script = format!("{}y\n", ANSWERS_PREFIX);

        let finished = run_script(dir.path(), &script, ScriptedAccount::default()).await;

        assert!(matches!(finished.result, Ok(RunOutcome::NoPosts)));
        assert!(finished.transcript.contains("No posts found!"));
        assert!(read_log(dir.path(), "dry-run-").contains("No posts found for this account"));
    }

    #[test]
    fn test_blocking_runs_inline_outside_a_runtime() {
        assert_eq!(blocking(|| 7), 7);
    }
}
