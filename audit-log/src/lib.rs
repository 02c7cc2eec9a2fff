//! Append-only, human-readable log of one run.
//!
//! One file per run under the configured directory, named
//! `<mode>-<YYYY-MM-DD-HHMMSS>.log`. Each line reads
//! `<YYYY-MM-DD HH:MM:SS> - <LEVEL> - <message>`. The handle is created
//! explicitly and passed to whoever needs to record events.


use chrono::{DateTime, Local};
use skyprune_core::{
    AuditError, ClassifiedPost, DeletionOutcome, DeletionStatus, FilterCriteria, RunMode,
};
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

pub const SEPARATOR: &str =
    "================================================================================";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditLevel {
    Info,
    Warning,
    Error,
}

impl AuditLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditLevel::Info => "INFO",
            AuditLevel::Warning => "WARNING",
            AuditLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for AuditLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything worth a line in the audit trail.
#[derive(Debug, Clone)]
pub enum AuditEvent<'a> {
    Separator,
    RunStarted {
        run_id: Uuid,
        user: &'a str,
        criteria: &'a FilterCriteria,
    },
    ProceedingAfterDryRun {
        user: &'a str,
        criteria: &'a FilterCriteria,
    },
    AuthenticationFailed {
        reason: &'a str,
    },
    FetchStarted,
    FetchCompleted {
        count: usize,
    },
    FetchFailed {
        error: &'a str,
    },
    NoPosts,
    FilterCriteria(&'a FilterCriteria),
    UnparseableDate {
        uri: &'a str,
        reason: &'a str,
    },
    FilterSummary {
        keep: usize,
        delete: usize,
        skipped: usize,
    },
    WillDelete(&'a ClassifiedPost),
    RetryScheduled {
        uri: &'a str,
        delay: Duration,
        attempt: u32,
        max_attempts: u32,
    },
    Outcome {
        position: usize,
        total: usize,
        outcome: &'a DeletionOutcome,
    },
    DryRunCompleted,
    Cancelled,
    DeletionComplete {
        deleted: usize,
        failed: usize,
    },
}

impl AuditEvent<'_> {
    pub fn level(&self) -> AuditLevel {
        match self {
            AuditEvent::AuthenticationFailed { .. } | AuditEvent::FetchFailed { .. } => {
                AuditLevel::Error
            }
            AuditEvent::UnparseableDate { .. } | AuditEvent::RetryScheduled { .. } => {
                AuditLevel::Warning
            }
            AuditEvent::Outcome { outcome, .. } if !outcome.status.is_success() => {
                AuditLevel::Error
            }
            _ => AuditLevel::Info,
        }
    }

    pub fn message(&self) -> String {
        match self {
            AuditEvent::Separator => SEPARATOR.to_string(),
            AuditEvent::RunStarted {
                run_id,
                user,
                criteria,
            } => format!(
                "Starting Bluesky post cleanup (run {}) | User: {} | Parameters: {}",
                run_id, user, criteria
            ),
            AuditEvent::ProceedingAfterDryRun { user, criteria } => format!(
                "Proceeding with actual deletion after dry-run | User: {} | Parameters: {}",
                user, criteria
            ),
            AuditEvent::AuthenticationFailed { reason } => {
                format!("Authentication failed: {}", reason)
            }
            AuditEvent::FetchStarted => "Starting to fetch user posts".to_string(),
            AuditEvent::FetchCompleted { count } => format!("Fetched {} total posts", count),
            AuditEvent::FetchFailed { error } => format!("Error fetching posts: {}", error),
            AuditEvent::NoPosts => "No posts found for this account".to_string(),
            AuditEvent::FilterCriteria(criteria) => describe_criteria(criteria),
            AuditEvent::UnparseableDate { uri, reason } => {
                format!("Could not parse date for post {}: {}", uri, reason)
            }
            AuditEvent::FilterSummary {
                keep,
                delete,
                skipped,
            } => {
                let mut message = format!("Posts to keep: {}, Posts to delete: {}", keep, delete);
                if *skipped > 0 {
                    message.push_str(&format!(", Skipped (bad date): {}", skipped));
                }
                message
            }
            AuditEvent::WillDelete(classified) => format!(
                "Will delete: {} | Age: {}d | Likes: {} | Reposts: {}",
                classified.post.uri,
                classified.age_days,
                classified.post.like_count,
                classified.post.repost_count
            ),
            AuditEvent::RetryScheduled {
                uri,
                delay,
                attempt,
                max_attempts,
            } => format!(
                "Rate limit hit for {}, retrying in {}s (attempt {}/{})",
                uri,
                delay.as_secs_f64(),
                attempt,
                max_attempts
            ),
            AuditEvent::Outcome {
                position,
                total,
                outcome,
            } => match &outcome.status {
                DeletionStatus::Deleted => format!(
                    "Deleted {}/{}: {} | {}",
                    position, total, outcome.uri, outcome.text
                ),
                DeletionStatus::FailedRateLimited => format!(
                    "Rate limit exceeded for {} after {} attempts | {}",
                    outcome.uri, outcome.attempts, outcome.text
                ),
                DeletionStatus::FailedOther { reason } => format!(
                    "Failed to delete {}: {} | {}",
                    outcome.uri, reason, outcome.text
                ),
            },
            AuditEvent::DryRunCompleted => "Dry-run completed - no posts deleted".to_string(),
            AuditEvent::Cancelled => "User cancelled deletion".to_string(),
            AuditEvent::DeletionComplete { deleted, failed } => format!(
                "Deletion complete: {} deleted, {} failed",
                deleted, failed
            ),
        }
    }
}

fn describe_criteria(criteria: &FilterCriteria) -> String {
    let likes = if criteria.likes_enabled() {
        format!("likes >= {}", criteria.min_likes)
    } else {
        "likes ignored".to_string()
    };
    let reposts = if criteria.reposts_enabled() {
        format!("reposts >= {}", criteria.min_reposts)
    } else {
        "reposts ignored".to_string()
    };
    let images = if criteria.keep_images {
        "keep posts with images"
    } else {
        "images not protected"
    };
    format!(
        "Filtering criteria: age > {} days, {}, {}, {}",
        criteria.age_threshold_days, likes, reposts, images
    )
}

pub fn log_file_name(mode: RunMode, started_at: DateTime<Local>) -> String {
    format!("{}-{}.log", mode.as_str(), started_at.format("%Y-%m-%d-%H%M%S"))
}

pub fn format_line(at: DateTime<Local>, level: AuditLevel, message: &str) -> String {
    format!("{} - {} - {}", at.format("%Y-%m-%d %H:%M:%S"), level, message)
}

#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    run_id: Uuid,
    writer: Mutex<BufWriter<File>>,
}

impl AuditLog {
    /// Create the directory if needed and open a fresh log for `mode`.
    pub fn create(dir: &Path, mode: RunMode) -> Result<Self, AuditError> {
        Self::create_at(dir, mode, Local::now())
    }

    pub fn create_at(
        dir: &Path,
        mode: RunMode,
        started_at: DateTime<Local>,
    ) -> Result<Self, AuditError> {
        fs::create_dir_all(dir).map_err(|source| AuditError::CreateDir {
            path: dir.display().to_string(),
            source,
        })?;

        let path = dir.join(log_file_name(mode, started_at));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| AuditError::Open {
                path: path.display().to_string(),
                source,
            })?;

        tracing::debug!("Audit log opened at {}", path.display());
        Ok(Self {
            path,
            run_id: Uuid::new_v4(),
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Append one line and flush it.
    pub fn write_line(&self, level: AuditLevel, message: &str) -> Result<(), AuditError> {
        let line = format_line(Local::now(), level, message);
        let mut writer = self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        writeln!(writer, "{}", line).map_err(AuditError::Write)?;
        writer.flush().map_err(AuditError::Write)
    }

    /// Record an event; a failed write is reported through `tracing` and
    /// does not interrupt the run.
    pub fn record(&self, event: AuditEvent<'_>) {
        let level = event.level();
        let message = event.message();

        match level {
            AuditLevel::Info => tracing::info!(target: "audit", "{}", message),
            AuditLevel::Warning => tracing::warn!(target: "audit", "{}", message),
            AuditLevel::Error => tracing::error!(target: "audit", "{}", message),
        }

        if let Err(e) = self.write_line(level, &message) {
            tracing::error!("Audit log write failed for {}: {}", self.path.display(), e);
        }
    }
}
