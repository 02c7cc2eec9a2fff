use serde::{Deserialize, Serialize};
use std::fmt;

/// A post owned by the authenticated account, as read from the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub uri: String,
    pub author_did: String,
    /// Raw timestamp; parsed by the filter so bad values can be reported.
    pub created_at: String,
    pub text: String,
    pub like_count: u64,
    pub repost_count: u64,
    pub has_image_embed: bool,
}

impl Post {
    /// Trailing record key of an `at://` URI, used to address deletions.
    pub fn record_key(&self) -> Option<&str> {
        record_key(&self.uri)
    }
}

pub fn record_key(uri: &str) -> Option<&str> {
    uri.rsplit('/').next().filter(|rkey| !rkey.is_empty())
}

/// Operator-supplied thresholds, fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub age_threshold_days: u32,
    /// 0 disables the likes criterion.
    pub min_likes: u32,
    /// 0 disables the reposts criterion.
    pub min_reposts: u32,
    pub keep_images: bool,
    pub dry_run: bool,
}

impl FilterCriteria {
    pub fn likes_enabled(&self) -> bool {
        self.min_likes > 0
    }

    pub fn reposts_enabled(&self) -> bool {
        self.min_reposts > 0
    }

    pub fn run_mode(&self) -> RunMode {
        if self.dry_run {
            RunMode::DryRun
        } else {
            RunMode::Deletion
        }
    }

    /// Same thresholds with the destructive flag set.
    pub fn for_real_run(&self) -> Self {
        Self {
            dry_run: false,
            ..*self
        }
    }
}

impl fmt::Display for FilterCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "days={}, min_likes={}, min_reposts={}, keep_images={}, dry_run={}",
            self.age_threshold_days, self.min_likes, self.min_reposts, self.keep_images, self.dry_run
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunMode {
    DryRun,
    Deletion,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::DryRun => "dry-run",
            RunMode::Deletion => "deletion",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeepReason {
    #[serde(rename = "recent")]
    Recent,
    #[serde(rename = "likes")]
    Likes,
    #[serde(rename = "reposts")]
    Reposts,
    #[serde(rename = "hasImages")]
    HasImages,
}

impl KeepReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeepReason::Recent => "recent",
            KeepReason::Likes => "likes",
            KeepReason::Reposts => "reposts",
            KeepReason::HasImages => "hasImages",
        }
    }
}

impl fmt::Display for KeepReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Never constructed with an empty reason list.
    Keep(Vec<KeepReason>),
    Delete,
}

impl Classification {
    pub fn is_keep(&self) -> bool {
        matches!(self, Classification::Keep(_))
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Classification::Delete)
    }

    pub fn reasons(&self) -> &[KeepReason] {
        match self {
            Classification::Keep(reasons) => reasons,
            Classification::Delete => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedPost {
    pub post: Post,
    pub age_days: i64,
    pub reasons: Vec<KeepReason>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnparseablePost {
    pub post: Post,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOutcome {
    pub to_keep: Vec<ClassifiedPost>,
    pub to_delete: Vec<ClassifiedPost>,
    pub unparseable: Vec<UnparseablePost>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionStatus {
    Deleted,
    FailedRateLimited,
    FailedOther { reason: String },
}

impl DeletionStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, DeletionStatus::Deleted)
    }
}

/// Result of trying to delete one post; carries the text for the audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionOutcome {
    pub uri: String,
    pub text: String,
    pub attempts: u32,
    pub status: DeletionStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionReport {
    pub outcomes: Vec<DeletionOutcome>,
    pub deleted_count: usize,
    pub failed_count: usize,
}

impl DeletionReport {
    pub fn push(&mut self, outcome: DeletionOutcome) {
        if outcome.status.is_success() {
            self.deleted_count += 1;
        } else {
            self.failed_count += 1;
        }
        self.outcomes.push(outcome);
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// An authenticated AT Protocol session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub did: String,
    pub handle: String,
    pub access_jwt: String,
    pub refresh_jwt: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("did", &self.did)
            .field("handle", &self.handle)
            .field("access_jwt", &"<redacted>")
            .field("refresh_jwt", &"<redacted>")
            .finish()
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub identifier: String,
    pub secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}
