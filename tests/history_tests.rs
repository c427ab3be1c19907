mod common;

use common::*;
use higit_core::git::history::walk_history;
use higit_core::git::resolve::resolve_reference;
use higit_core::models::SHORT_ID_LEN;

#[test]
fn test_history_is_newest_first() {
    let (_dir, _path, repo) = create_test_repo();
    let ids = add_linear_history(&repo, 3);

    let commits = walk_history(&repo, ids[2], 10, 0).unwrap();

    let got: Vec<String> = commits.iter().map(|c| c.id.clone()).collect();
    let expected: Vec<String> = ids.iter().rev().map(|id| id.to_string()).collect();
    assert_eq!(got, expected);
}

#[test]
fn test_history_page_skips_offset() {
    let (_dir, _path, repo) = create_test_repo();
    let ids = add_linear_history(&repo, 5);

    let page = walk_history(&repo, ids[4], 2, 1).unwrap();

    assert_eq!(page.len(), 2);
    assert_eq!(page[0].id, ids[3].to_string());
    assert_eq!(page[1].id, ids[2].to_string());
}

#[test]
fn test_history_offset_past_end_is_empty() {
    let (_dir, _path, repo) = create_test_repo();
    let ids = add_linear_history(&repo, 3);

    assert!(walk_history(&repo, ids[2], 10, 3).unwrap().is_empty());
    assert!(walk_history(&repo, ids[2], 10, 50).unwrap().is_empty());
}

#[test]
fn test_history_zero_limit_is_empty() {
    let (_dir, _path, repo) = create_test_repo();
    let ids = add_linear_history(&repo, 2);

    assert!(walk_history(&repo, ids[1], 0, 0).unwrap().is_empty());
}

#[test]
fn test_commit_info_fields() {
    let (_dir, _path, repo) = create_test_repo();
    let first = add_commit(&repo, &[("a.txt", b"a")], "Subject line\n\nBody text", 0);
    let second = add_commit(&repo, &[("b.txt", b"b")], "Second", 1);

    let commits = walk_history(&repo, second, 10, 0).unwrap();
    let root = &commits[1];

    assert_eq!(root.id, first.to_string());
    assert_eq!(root.short_id.len(), SHORT_ID_LEN);
    assert!(root.id.starts_with(&root.short_id));
    assert_eq!(root.author, "Test User");
    assert_eq!(root.email, "test@example.com");
    assert_eq!(root.timestamp, BASE_TIME);
    assert_eq!(root.message, "Subject line\n\nBody text");
    assert_eq!(root.short_message, "Subject line");
    assert!(root.parent_ids.is_empty());

    assert_eq!(commits[0].parent_ids, vec![first.to_string()]);
}

#[test]
fn test_resolve_reference_order() {
    let (_dir, _path, repo) = create_test_repo();
    let ids = add_linear_history(&repo, 2);
    let branch = head_branch(&repo);

    // A remote-tracking ref with the same short name loses to the local head.
    repo.reference(&format!("refs/remotes/origin/{branch}"), ids[0], true, "test")
        .unwrap();
    assert_eq!(resolve_reference(&repo, &branch).unwrap(), ids[1]);

    repo.reference("refs/remotes/origin/feature", ids[0], true, "test")
        .unwrap();
    assert_eq!(resolve_reference(&repo, "feature").unwrap(), ids[0]);

    assert_eq!(resolve_reference(&repo, "HEAD").unwrap(), ids[1]);
    assert_eq!(resolve_reference(&repo, &ids[0].to_string()).unwrap(), ids[0]);
}

#[test]
fn test_resolve_reference_unknown() {
    let (_dir, _path, repo) = create_test_repo();
    add_linear_history(&repo, 1);

    assert!(resolve_reference(&repo, "no-such-branch").is_err());
    assert!(resolve_reference(&repo, &"ab".repeat(20)).is_err());
}
