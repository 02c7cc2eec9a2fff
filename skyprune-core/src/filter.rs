//! Keep/delete partitioning of fetched posts.
//!
//! Everything here is pure: the caller captures `now` once and passes it in,
//! and unparseable timestamps are returned rather than logged.

use crate::error::DateParseError;
use crate::types::{
    Classification, ClassifiedPost, FilterCriteria, FilterOutcome, KeepReason, Post,
    UnparseablePost,
};
use chrono::{DateTime, NaiveDateTime, Utc};

const SECONDS_PER_DAY: i64 = 86_400;

/// Parse a post timestamp. RFC 3339 is expected; a value without an offset
/// is read as UTC.
pub fn parse_created_at(raw: &str) -> Result<DateTime<Utc>, DateParseError> {
    let trimmed = raw.trim();
    match DateTime::parse_from_rfc3339(trimmed) {
        Ok(parsed) => Ok(parsed.with_timezone(&Utc)),
        Err(rfc_err) => NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|_| DateParseError {
                raw: raw.to_string(),
                reason: rfc_err.to_string(),
            }),
    }
}

/// Whole days between `created_at` and `now`, rounded down.
pub fn age_in_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - created_at).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Evaluate the four keep predicates for one post of known age.
pub fn classify(post: &Post, age_days: i64, criteria: &FilterCriteria) -> Classification {
    let mut reasons = Vec::with_capacity(4);

    if age_days <= i64::from(criteria.age_threshold_days) {
        reasons.push(KeepReason::Recent);
    }
    if criteria.likes_enabled() && post.like_count >= u64::from(criteria.min_likes) {
        reasons.push(KeepReason::Likes);
    }
    if criteria.reposts_enabled() && post.repost_count >= u64::from(criteria.min_reposts) {
        reasons.push(KeepReason::Reposts);
    }
    if criteria.keep_images && post.has_image_embed {
        reasons.push(KeepReason::HasImages);
    }

    if reasons.is_empty() {
        Classification::Delete
    } else {
        Classification::Keep(reasons)
    }
}

/// Split `posts` into keep and delete sets, preserving input order.
pub fn partition_posts<I>(posts: I, criteria: &FilterCriteria, now: DateTime<Utc>) -> FilterOutcome
where
    I: IntoIterator<Item = Post>,
{
    let mut outcome = FilterOutcome::default();

    for post in posts {
        let created_at = match parse_created_at(&post.created_at) {
            Ok(created_at) => created_at,
            Err(err) => {
                outcome.unparseable.push(UnparseablePost {
                    post,
                    reason: err.to_string(),
                });
                continue;
            }
        };

        let age_days = age_in_days(created_at, now);
        match classify(&post, age_days, criteria) {
            Classification::Keep(reasons) => outcome.to_keep.push(ClassifiedPost {
                post,
                age_days,
                reasons,
            }),
            Classification::Delete => outcome.to_delete.push(ClassifiedPost {
                post,
                age_days,
                reasons: Vec::new(),
            }),
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn post(rkey: &str, age: Duration, likes: u64, reposts: u64, image: bool) -> Post {
        Post {
            uri: format!("at://did:plc:me/app.bsky.feed.post/{}", rkey),
            author_did: "did:plc:me".to_string(),
            created_at: (now() - age).to_rfc3339(),
            text: format!("post {}", rkey),
            like_count: likes,
            repost_count: reposts,
            has_image_embed: image,
        }
    }

    fn criteria(days: u32, likes: u32, reposts: u32, images: bool) -> FilterCriteria {
        FilterCriteria {
            age_threshold_days: days,
            min_likes: likes,
            min_reposts: reposts,
            keep_images: images,
            dry_run: true,
        }
    }

    #[test]
    fn test_parse_created_at_formats() {
        assert!(parse_created_at("2024-05-01T10:00:00.000Z").is_ok());
        assert!(parse_created_at("2024-05-01T10:00:00+02:00").is_ok());

        let naive = parse_created_at("2024-05-01T10:00:00").unwrap();
        assert_eq!(naive, Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());

        let err = parse_created_at("yesterday").unwrap_err();
        assert_eq!(err.raw, "yesterday");
    }

    #[test]
    fn test_age_rounds_down() {
        let created = now() - Duration::hours(47);
        assert_eq!(age_in_days(created, now()), 1);

        let future = now() + Duration::hours(1);
        assert_eq!(age_in_days(future, now()), -1);
    }

    #[test]
    fn test_reasons_follow_predicate_order() {
        let p = post("a", Duration::days(1), 10, 10, true);
        let result = classify(&p, 1, &criteria(30, 5, 5, true));
        assert_eq!(
            result.reasons(),
            &[
                KeepReason::Recent,
                KeepReason::Likes,
                KeepReason::Reposts,
                KeepReason::HasImages
            ]
        );
    }

    #[test]
    fn test_zero_threshold_disables_engagement() {
        let p = post("a", Duration::days(100), 0, 0, false);
        let result = classify(&p, 100, &criteria(30, 0, 0, false));
        assert_eq!(result, Classification::Delete);
    }

    #[test]
    fn test_zero_age_threshold_keeps_only_today() {
        let c = criteria(0, 0, 0, false);
        let today = post("today", Duration::hours(3), 0, 0, false);
        let yesterday = post("yesterday", Duration::hours(25), 0, 0, false);

        let outcome = partition_posts(vec![today, yesterday], &c, now());
        assert_eq!(outcome.to_keep.len(), 1);
        assert_eq!(outcome.to_keep[0].post.text, "post today");
        assert_eq!(outcome.to_delete.len(), 1);
        assert_eq!(outcome.to_delete[0].age_days, 1);
    }

    #[test]
    fn test_images_ignored_when_not_protected() {
        let p = post("a", Duration::days(40), 0, 0, true);
        assert!(classify(&p, 40, &criteria(30, 0, 0, false)).is_delete());
        assert!(classify(&p, 40, &criteria(30, 0, 0, true)).is_keep());
    }

    #[test]
    fn test_unparseable_posts_are_excluded() {
        let mut broken = post("broken", Duration::days(90), 0, 0, false);
        broken.created_at = "not a date".to_string();
        let fine = post("fine", Duration::days(90), 0, 0, false);

        let outcome = partition_posts(vec![broken, fine], &criteria(30, 0, 0, false), now());
        assert_eq!(outcome.unparseable.len(), 1);
        assert_eq!(outcome.unparseable[0].post.text, "post broken");
        assert_eq!(outcome.to_delete.len(), 1);
        assert!(outcome.to_keep.is_empty());
    }
}
