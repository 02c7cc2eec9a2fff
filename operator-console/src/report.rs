//! Operator-facing text: banner, criteria summary, preview and results.

use audit_log::{AuditEvent, AuditLog};
use skyprune_core::{ClassifiedPost, DeletionReport, FilterCriteria};
use std::io::{self, Write};

pub const RULE: &str = audit_log::SEPARATOR;
const THIN_RULE: &str =
    "--------------------------------------------------------------------------------";
pub const PREVIEW_TEXT_LIMIT: usize = 100;

pub fn render_banner() -> String {
    format!(
        "{}\nBluesky Post Deleter\nSelectively delete old posts based on age and engagement\n{}",
        RULE, RULE
    )
}

pub fn render_criteria_summary(criteria: &FilterCriteria) -> String {
    let mut lines = vec![
        format!("\n{}", RULE),
        "DELETION CRITERIA SUMMARY:".to_string(),
        format!(
            "  • Posts older than {} days will be considered for deletion",
            criteria.age_threshold_days
        ),
    ];

    if criteria.likes_enabled() || criteria.reposts_enabled() || criteria.keep_images {
        lines.push("  • Posts will be KEPT if they have:".to_string());
        if criteria.likes_enabled() {
            lines.push(format!("    - At least {} likes", criteria.min_likes));
        }
        if criteria.reposts_enabled() {
            lines.push(format!("    - At least {} reposts", criteria.min_reposts));
        }
        if criteria.keep_images {
            lines.push("    - Images attached".to_string());
        }
    } else {
        lines.push("  • No engagement protection (all old posts will be deleted)".to_string());
    }
    lines.push(RULE.to_string());
    lines.join("\n")
}

/// Cut to `limit` characters, marking the cut with `...`.
pub fn truncate_text(text: &str, limit: usize) -> String {
    if text.chars().count() > limit {
        let mut cut: String = text.chars().take(limit).collect();
        cut.push_str("...");
        cut
    } else {
        text.to_string()
    }
}

pub fn render_preview(posts: &[ClassifiedPost], sample: usize) -> String {
    let mut out = String::from("\n=== Deletion Preview ===\n");
    out.push_str(&format!("Total posts to delete: {}\n", posts.len()));

    if posts.is_empty() {
        out.push_str("No posts match the deletion criteria!\n");
        return out;
    }

    let shown = sample.min(posts.len());
    out.push_str(&format!("\nShowing {} sample posts:\n{}\n", shown, THIN_RULE));

    for (i, classified) in posts.iter().take(shown).enumerate() {
        let post = &classified.post;
        out.push_str(&format!(
            "\n{}. Age: {} days | Likes: {} | Reposts: {}\n",
            i + 1,
            classified.age_days,
            post.like_count,
            post.repost_count
        ));
        out.push_str(&format!(
            "   Text: {}\n",
            truncate_text(&post.text, PREVIEW_TEXT_LIMIT)
        ));
        out.push_str(&format!("   URI: {}\n", post.uri));
    }

    if posts.len() > shown {
        out.push_str(&format!("\n... and {} more posts\n", posts.len() - shown));
    }
    out.push_str(THIN_RULE);
    out.push('\n');
    out
}

/// Print the preview and record each sampled post in the audit log.
pub fn write_preview<W: Write>(
    out: &mut W,
    posts: &[ClassifiedPost],
    sample: usize,
    audit: &AuditLog,
) -> io::Result<()> {
    write!(out, "{}", render_preview(posts, sample))?;
    for classified in posts.iter().take(sample) {
        audit.record(AuditEvent::WillDelete(classified));
    }
    out.flush()
}

pub fn render_deletion_summary(report: &DeletionReport) -> String {
    let mut out = format!(
        "\n✓ Deletion complete!\n  Successfully deleted: {}",
        report.deleted_count
    );
    if report.failed_count > 0 {
        out.push_str(&format!("\n  Failed: {}", report.failed_count));
    }
    out
}

pub fn render_auth_failure(reason: &str) -> String {
    [
        format!("\n✗ Authentication failed: {}\n", reason),
        "Common issues:".to_string(),
        "  1. Make sure you're using an APP PASSWORD, not your main account password".to_string(),
        "     Generate one at: https://bsky.app/settings/app-passwords".to_string(),
        "  2. Verify your username is correct (e.g., user.bsky.social)".to_string(),
        "  3. Check for typos in your username or password".to_string(),
        "  4. Ensure the app password hasn't been revoked".to_string(),
    ]
    .join("\n")
}
