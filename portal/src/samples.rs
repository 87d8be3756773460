//! Bundled fallback data, served when GitLab is unconfigured or failing.

use gitlab::types::MergeRequest;
use serde_json::{Value, json};

/// Sample review-queue merge requests. None of them have reviewers assigned,
/// so they survive the review filter.
pub fn review_mrs() -> Vec<MergeRequest> {
    vec![
        json!({
            "id": 101,
            "iid": 11,
            "title": "Add retry budget to the deploy pipeline",
            "author": {"name": "Sample Author", "username": "sample.author"},
            "created_at": "2025-05-12T09:30:00Z",
            "web_url": "https://example.com/platform/deploy/-/merge_requests/11",
            "state": "opened",
            "reviewers": [],
        }),
        json!({
            "id": 102,
            "iid": 12,
            "title": "Fix pagination on the audit log",
            "author": {"name": "Another Author", "username": "another.author"},
            "created_at": "2025-05-13T14:05:00Z",
            "web_url": "https://example.com/platform/audit/-/merge_requests/12",
            "state": "opened",
            "reviewers": [],
        }),
        json!({
            "id": 103,
            "iid": 13,
            "title": "Bump base image for the worker fleet",
            "author": {"name": "Third Author", "username": "third.author"},
            "created_at": "2025-05-14T08:45:00Z",
            "web_url": "https://example.com/platform/workers/-/merge_requests/13",
            "state": "opened",
            "reviewers": [],
        }),
    ]
}

/// Fixed placeholder items for the my-mrs widget.
pub fn my_mrs() -> Vec<Value> {
    vec![
        json!({
            "id": 201,
            "iid": 21,
            "title": "Refactor: auth flow",
            "project": "web-portal",
            "rebase_status": "can_rebase",
            "web_url": "https://example.com/web-portal/-/merge_requests/21",
        }),
        json!({
            "id": 202,
            "iid": 22,
            "title": "Chore: bump deps",
            "project": "api",
            "rebase_status": "up_to_date",
            "web_url": "https://example.com/api/-/merge_requests/22",
        }),
    ]
}
