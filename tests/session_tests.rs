mod common;

use common::*;
use git2::Repository;
use higit_core::AppError;
use higit_core::git::FetchRequest;
use higit_core::models::FetchProgress;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn full_fetch(branch: &str) -> FetchRequest {
    FetchRequest {
        depth: 0,
        ..FetchRequest::branch(branch)
    }
}

#[test]
fn test_open_missing_path() {
    let dir = TempDir::new().unwrap();
    let session = new_session();

    let result = session.open(&dir.path().join("missing"));
    assert!(matches!(result, Err(AppError::PathNotFound(_))));
    assert!(!session.is_open());
    assert!(session.last_error().contains("missing"));
}

#[test]
fn test_open_existing_repository() {
    let (_dir, path, repo) = create_test_repo();
    add_linear_history(&repo, 1);
    repo.remote("origin", "https://example.com/team/app.git").unwrap();

    let session = new_session();
    session.open(&path).unwrap();

    assert!(session.is_open());
    assert!(!session.is_connected());
    assert_eq!(session.repository_path(), Some(path));
    assert_eq!(session.remote_url().as_deref(), Some("https://example.com/team/app.git"));
    assert_eq!(session.current_branch(), Some(head_branch(&repo)));
}

#[test]
fn test_create_twice_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("work");
    let session = new_session();

    session.create(&path).unwrap();
    assert!(session.is_open());
    assert!(path.join(".git").exists());

    let again = new_session();
    assert!(matches!(again.create(&path), Err(AppError::AlreadyExists(_))));
    assert!(matches!(again.create_bare(&path), Err(AppError::AlreadyExists(_))));
}

#[test]
fn test_create_bare_reports_unborn_branch() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bare.git");
    let session = new_session();

    session.create_bare(&path).unwrap();
    assert!(Repository::open_bare(&path).unwrap().is_bare());
    assert!(session.current_branch().is_some());
}

#[test]
fn test_connect_remote_to_local_path() {
    let fixture = RemoteFixture::new();
    add_linear_history(&fixture.source, 1);

    fixture.connect();

    assert!(fixture.session.is_open());
    assert!(fixture.session.is_connected());
    assert_eq!(fixture.session.remote_url(), Some(fixture.url()));
    let mirror = Repository::open(fixture.mirror_path()).unwrap();
    assert!(mirror.is_bare());
    assert_eq!(
        mirror.find_remote("origin").unwrap().url(),
        Some(fixture.url().as_str())
    );
}

#[test]
fn test_connect_remote_twice_updates_url() {
    let fixture = RemoteFixture::new();
    add_linear_history(&fixture.source, 1);
    let (_other_dir, other_path, other) = create_test_repo();
    add_linear_history(&other, 1);

    fixture.connect();
    let other_url = other_path.to_string_lossy().into_owned();
    fixture
        .session
        .connect_remote(&other_url, &fixture.mirror_path())
        .unwrap();

    let mirror = Repository::open(fixture.mirror_path()).unwrap();
    assert_eq!(mirror.find_remote("origin").unwrap().url(), Some(other_url.as_str()));
}

#[test]
fn test_connect_remote_unreachable_keeps_repository() {
    let fixture = RemoteFixture::new();
    let missing = fixture.source_dir.path().join("does-not-exist");

    let result = fixture
        .session
        .connect_remote(&missing.to_string_lossy(), &fixture.mirror_path());

    assert!(result.is_err());
    assert!(fixture.session.is_open());
    assert!(!fixture.session.is_connected());
    assert!(!fixture.session.last_error().is_empty());
}

#[test]
fn test_fetch_creates_remote_tracking_branch() {
    let fixture = RemoteFixture::new();
    let ids = add_linear_history(&fixture.source, 3);
    let branch = head_branch(&fixture.source);
    fixture.connect();

    fixture
        .session
        .fetch(&full_fetch(&branch), None, &CancellationToken::new())
        .unwrap();

    let mirror = Repository::open(fixture.mirror_path()).unwrap();
    let tracking = mirror
        .refname_to_id(&format!("refs/remotes/origin/{branch}"))
        .unwrap();
    assert_eq!(tracking, ids[2]);
}

#[test]
fn test_fetch_does_not_download_tags() {
    let fixture = RemoteFixture::new();
    let ids = add_linear_history(&fixture.source, 2);
    let branch = head_branch(&fixture.source);
    let target = fixture.source.find_object(ids[1], None).unwrap();
    fixture
        .source
        .tag_lightweight("v1-light", &target, false)
        .unwrap();
    let sig = git2::Signature::now("Test User", "test@example.com").unwrap();
    fixture
        .source
        .tag("v1", &target, &sig, "Release 1", false)
        .unwrap();
    fixture.connect();

    fixture
        .session
        .fetch(&full_fetch(&branch), None, &CancellationToken::new())
        .unwrap();

    let mirror = Repository::open(fixture.mirror_path()).unwrap();
    assert!(mirror.refname_to_id(&format!("refs/remotes/origin/{branch}")).is_ok());
    assert!(mirror.find_reference("refs/tags/v1").is_err());
    assert!(mirror.find_reference("refs/tags/v1-light").is_err());
    assert_eq!(mirror.tag_names(None).unwrap().len(), 0);
}

#[test]
fn test_fetch_cancelled_before_transfer() {
    let fixture = RemoteFixture::new();
    add_linear_history(&fixture.source, 3);
    let branch = head_branch(&fixture.source);
    fixture.connect();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = fixture.session.fetch(&full_fetch(&branch), None, &cancel);

    assert!(matches!(result, Err(AppError::Cancelled)));
    assert_eq!(fixture.session.last_error(), "Operation cancelled");
    let mirror = Repository::open(fixture.mirror_path()).unwrap();
    assert!(mirror.refname_to_id(&format!("refs/remotes/origin/{branch}")).is_err());
}

#[test]
fn test_fetch_unadvertised_branch_fails() {
    let fixture = RemoteFixture::new();
    add_linear_history(&fixture.source, 1);
    fixture.connect();

    for branch in ["HEAD", "no-such-branch"] {
        let result = fixture
            .session
            .fetch(&full_fetch(branch), None, &CancellationToken::new());
        assert!(matches!(result, Err(AppError::ReferenceNotFound(_))), "{branch}");
        assert!(fixture.session.last_error().contains(branch));
    }
}

#[test]
fn test_fetch_progress_is_monotonic() {
    let fixture = RemoteFixture::new();
    add_linear_history(&fixture.source, 4);
    let branch = head_branch(&fixture.source);
    fixture.connect();

    let mut ticks: Vec<FetchProgress> = Vec::new();
    let mut sink = |p: FetchProgress| ticks.push(p);
    fixture
        .session
        .fetch(&full_fetch(&branch), Some(&mut sink), &CancellationToken::new())
        .unwrap();

    for pair in ticks.windows(2) {
        assert!(pair[1].received_objects > pair[0].received_objects);
    }
    for tick in &ticks {
        assert!(tick.received_objects <= tick.total_objects);
    }
}

#[test]
fn test_fetch_survives_panicking_sink() {
    let fixture = RemoteFixture::new();
    add_linear_history(&fixture.source, 2);
    let branch = head_branch(&fixture.source);
    fixture.connect();

    let mut sink = |_: FetchProgress| panic!("sink failure");
    let result = fixture
        .session
        .fetch(&full_fetch(&branch), Some(&mut sink), &CancellationToken::new());

    assert!(result.is_ok());
    let mirror = Repository::open(fixture.mirror_path()).unwrap();
    assert!(mirror.refname_to_id(&format!("refs/remotes/origin/{branch}")).is_ok());
}

#[test]
fn test_fetch_without_repository() {
    let session = new_session();
    let result = session.fetch(&FetchRequest::default(), None, &CancellationToken::new());
    assert!(matches!(result, Err(AppError::NotInitialized(_))));
}

#[test]
fn test_remote_branches() {
    let fixture = RemoteFixture::new();
    let ids = add_linear_history(&fixture.source, 2);
    let branch = head_branch(&fixture.source);
    let head = fixture.source.find_commit(ids[0]).unwrap();
    fixture.source.branch("feature", &head, false).unwrap();
    fixture.connect();

    let mut branches = fixture.session.remote_branches("origin").unwrap();
    branches.sort_by(|a, b| a.name.cmp(&b.name));

    let mut expected = vec![
        (branch.clone(), ids[1].to_string()),
        ("feature".to_string(), ids[0].to_string()),
    ];
    expected.sort();
    let got: Vec<(String, String)> = branches
        .iter()
        .map(|b| (b.name.clone(), b.target_id.clone()))
        .collect();
    assert_eq!(got, expected);
    assert!(branches.iter().all(|b| b.is_remote));
}

#[test]
fn test_remote_tags_distinguish_annotated() {
    let fixture = RemoteFixture::new();
    let ids = add_linear_history(&fixture.source, 2);
    let target = fixture.source.find_object(ids[1], None).unwrap();
    fixture
        .source
        .tag_lightweight("v1-light", &target, false)
        .unwrap();
    let sig = git2::Signature::now("Test User", "test@example.com").unwrap();
    let annotated_id = fixture
        .source
        .tag("v1", &target, &sig, "Release 1", false)
        .unwrap();
    fixture.connect();

    let tags = fixture.session.remote_tags("origin").unwrap();
    assert_eq!(tags.len(), 2);

    let light = tags.iter().find(|t| t.name == "v1-light").unwrap();
    assert!(!light.is_annotated);
    assert_eq!(light.id, ids[1].to_string());

    let annotated = tags.iter().find(|t| t.name == "v1").unwrap();
    assert!(annotated.is_annotated);
    assert_eq!(annotated.id, annotated_id.to_string());
    assert_eq!(annotated.peeled_id, ids[1].to_string());
}

#[test]
fn test_remote_tags_empty_records_reason() {
    let fixture = RemoteFixture::new();
    add_linear_history(&fixture.source, 1);
    fixture.connect();

    assert!(fixture.session.remote_tags("origin").unwrap().is_empty());
    assert!(fixture.session.last_error().contains("no tags"));
}

#[test]
fn test_unknown_remote_name() {
    let fixture = RemoteFixture::new();
    add_linear_history(&fixture.source, 1);
    fixture.connect();

    assert!(fixture.session.remote_branches("upstream").is_err());
}

#[test]
fn test_history_after_fetch() {
    let fixture = RemoteFixture::new();
    let ids = add_linear_history(&fixture.source, 5);
    let branch = head_branch(&fixture.source);
    fixture.connect();
    fixture
        .session
        .fetch(&full_fetch(&branch), None, &CancellationToken::new())
        .unwrap();

    let page = fixture.session.commit_history(&branch, 2, 1).unwrap();
    let got: Vec<String> = page.iter().map(|c| c.id.clone()).collect();
    assert_eq!(got, vec![ids[3].to_string(), ids[2].to_string()]);

    assert!(fixture.session.commit_history(&branch, 10, 5).unwrap().is_empty());
    assert!(fixture.session.last_error().contains("history"));
}

#[test]
fn test_local_branches_and_create_branch() {
    let (_dir, path, repo) = create_test_repo();
    let ids = add_linear_history(&repo, 2);
    let session = new_session();
    session.open(&path).unwrap();

    let created = session.create_branch("topic", &ids[0].to_string()).unwrap();
    assert_eq!(created.name, "topic");
    assert_eq!(created.target_id, ids[0].to_string());
    assert!(!created.is_current);

    let branches = session.local_branches().unwrap();
    assert_eq!(branches.len(), 2);
    let current = branches.iter().find(|b| b.is_current).unwrap();
    assert_eq!(current.name, head_branch(&repo));
    assert_eq!(current.target_id, ids[1].to_string());

    assert!(matches!(
        session.create_branch("bad", "not-an-id"),
        Err(AppError::InvalidArgument(_))
    ));
    assert!(matches!(
        session.create_branch("ghost", &"ab".repeat(20)),
        Err(AppError::ReferenceNotFound(_))
    ));
    assert!(session.create_branch("topic", &ids[1].to_string()).is_err());
}

#[test]
fn test_commit_details() {
    let (_dir, path, repo) = create_test_repo();
    let ids = add_linear_history(&repo, 2);
    let session = new_session();
    session.open(&path).unwrap();

    let commit = session.commit_details(&ids[1].to_string()).unwrap();
    assert_eq!(commit.short_message, "Commit 1");
    assert_eq!(commit.parent_ids, vec![ids[0].to_string()]);

    let head = session.commit_details("HEAD").unwrap();
    assert_eq!(head.id, ids[1].to_string());
}

#[test]
fn test_clone_bare() {
    let (_dir, source_path, source) = create_test_repo();
    let ids = add_linear_history(&source, 2);
    let target = TempDir::new().unwrap();
    let clone_path = target.path().join("clone.git");

    let session = new_session();
    session
        .clone_bare(&source_path.to_string_lossy(), &clone_path, 0)
        .unwrap();

    assert!(session.is_connected());
    let head = session.commit_details(&head_branch(&source)).unwrap();
    assert_eq!(head.id, ids[1].to_string());
}
