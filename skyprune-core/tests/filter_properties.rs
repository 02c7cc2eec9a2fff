use chrono::{DateTime, Duration, TimeZone, Utc};
use skyprune_core::{classify, partition_posts, FilterCriteria, KeepReason, Post};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 15, 9, 30, 0).unwrap()
}

fn post_aged(rkey: &str, days: i64, likes: u64, reposts: u64, image: bool) -> Post {
    Post {
        uri: format!("at://did:plc:owner/app.bsky.feed.post/{}", rkey),
        author_did: "did:plc:owner".to_string(),
        created_at: (now() - Duration::days(days) - Duration::minutes(5)).to_rfc3339(),
        text: format!("text of {}", rkey),
        like_count: likes,
        repost_count: reposts,
        has_image_embed: image,
    }
}

#[test]
fn test_end_to_end_example() {
    let posts = vec![
        post_aged("1", 5, 10, 0, false),
        post_aged("2", 40, 0, 0, true),
        post_aged("3", 40, 0, 0, false),
    ];
    let criteria = FilterCriteria {
        age_threshold_days: 30,
        min_likes: 5,
        min_reposts: 0,
        keep_images: true,
        dry_run: true,
    };

    let outcome = partition_posts(posts, &criteria, now());

    assert_eq!(outcome.to_keep.len(), 2);
    assert_eq!(outcome.to_keep[0].post.text, "text of 1");
    // Post 1 is young and liked; recency comes first.
    assert_eq!(outcome.to_keep[0].reasons[0], KeepReason::Recent);
    assert_eq!(outcome.to_keep[1].post.text, "text of 2");
    assert_eq!(outcome.to_keep[1].reasons, vec![KeepReason::HasImages]);

    assert_eq!(outcome.to_delete.len(), 1);
    assert_eq!(outcome.to_delete[0].post.text, "text of 3");
    assert!(outcome.to_delete[0].reasons.is_empty());
    assert!(outcome.unparseable.is_empty());
}

#[test]
fn test_classification_is_total_and_exclusive() {
    let mut posts = Vec::new();
    let mut id = 0;
    for days in [0_i64, 1, 29, 30, 31, 365] {
        for likes in [0_u64, 1, 5, 50] {
            for reposts in [0_u64, 2, 10] {
                for image in [false, true] {
                    id += 1;
                    posts.push(post_aged(&id.to_string(), days, likes, reposts, image));
                }
            }
        }
    }
    let total = posts.len();

    for min_likes in [0_u32, 5] {
        for min_reposts in [0_u32, 3] {
            for keep_images in [false, true] {
                let criteria = FilterCriteria {
                    age_threshold_days: 30,
                    min_likes,
                    min_reposts,
                    keep_images,
                    dry_run: true,
                };
                let outcome = partition_posts(posts.clone(), &criteria, now());
                assert_eq!(outcome.to_keep.len() + outcome.to_delete.len(), total);

                for kept in &outcome.to_keep {
                    assert!(!kept.reasons.is_empty());
                }
                for doomed in &outcome.to_delete {
                    let p = &doomed.post;
                    let recent = doomed.age_days <= 30;
                    let liked = min_likes > 0 && p.like_count >= u64::from(min_likes);
                    let reposted = min_reposts > 0 && p.repost_count >= u64::from(min_reposts);
                    let protected = keep_images && p.has_image_embed;
                    assert!(!(recent || liked || reposted || protected));
                }
            }
        }
    }
}

#[test]
fn test_zero_like_threshold_never_keeps() {
    let criteria = FilterCriteria {
        age_threshold_days: 7,
        min_likes: 0,
        min_reposts: 0,
        keep_images: false,
        dry_run: true,
    };
    for likes in [0_u64, 1, 1_000_000] {
        let p = post_aged("x", 100, likes, likes, false);
        assert!(classify(&p, 100, &criteria).is_delete());
    }
}

#[test]
fn test_unparseable_exclusion_is_idempotent() {
    let mut broken = post_aged("bad", 100, 0, 0, false);
    broken.created_at = "2024-13-45".to_string();
    let criteria = FilterCriteria {
        age_threshold_days: 30,
        min_likes: 0,
        min_reposts: 0,
        keep_images: false,
        dry_run: true,
    };

    for _ in 0..2 {
        let outcome = partition_posts(vec![broken.clone()], &criteria, now());
        assert!(outcome.to_keep.is_empty());
        assert!(outcome.to_delete.is_empty());
        assert_eq!(outcome.unparseable.len(), 1);
    }
}
