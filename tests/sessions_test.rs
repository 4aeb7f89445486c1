//! Session lifecycle integration tests: validation, ownership, terminal
//! transitions, history filters, and aggregate stats.

use focusd::error::ServiceError;
use focusd::sessions::{self, HistoryFilter};
use focusd::storage::Storage;
use tempfile::TempDir;

async fn make_storage(dir: &TempDir) -> Storage {
    Storage::new(dir.path()).await.unwrap()
}

async fn make_user_with_task(storage: &Storage, email: &str) -> (String, String) {
    let user = storage.create_user(email, "UTC").await.unwrap();
    let task = storage.create_task(&user.id, "deep work", None).await.unwrap();
    (user.id, task.id)
}

#[tokio::test]
async fn test_start_session_rejects_out_of_range_duration() {
    let dir = TempDir::new().unwrap();
    let storage = make_storage(&dir).await;
    let (user_id, task_id) = make_user_with_task(&storage, "a@example.com").await;

    for bad in [0, -5, 121, 1000] {
        let err = sessions::start_session(&storage, &user_id, &task_id, bad)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)), "duration {bad}");
    }

    for ok in [1, 25, 120] {
        let session = sessions::start_session(&storage, &user_id, &task_id, ok)
            .await
            .unwrap();
        assert_eq!(session.status, "in_progress");
        assert_eq!(session.duration, ok);
        assert!(session.end_time.is_none());
    }
}

#[tokio::test]
async fn test_start_session_requires_owned_task() {
    let dir = TempDir::new().unwrap();
    let storage = make_storage(&dir).await;
    let (_user_a, task_a) = make_user_with_task(&storage, "a@example.com").await;
    let (user_b, _task_b) = make_user_with_task(&storage, "b@example.com").await;

    let err = sessions::start_session(&storage, &user_b, &task_a, 25)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden));

    let err = sessions::start_session(&storage, &user_b, "no-such-task", 25)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn test_complete_transitions_and_sets_end_time() {
    let dir = TempDir::new().unwrap();
    let storage = make_storage(&dir).await;
    let (user_id, task_id) = make_user_with_task(&storage, "a@example.com").await;

    let session = sessions::start_session(&storage, &user_id, &task_id, 25)
        .await
        .unwrap();
    let done = sessions::complete_session(&storage, &session.id, &user_id)
        .await
        .unwrap();
    assert_eq!(done.status, "completed");
    assert!(done.end_time.is_some());
}

#[tokio::test]
async fn test_finished_session_cannot_transition_again() {
    let dir = TempDir::new().unwrap();
    let storage = make_storage(&dir).await;
    let (user_id, task_id) = make_user_with_task(&storage, "a@example.com").await;

    let session = sessions::start_session(&storage, &user_id, &task_id, 25)
        .await
        .unwrap();
    sessions::cancel_session(&storage, &session.id, &user_id)
        .await
        .unwrap();

    let err = sessions::complete_session(&storage, &session.id, &user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidState(_)));

    let err = sessions::cancel_session(&storage, &session.id, &user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidState(_)));

    // The original terminal state survives the failed attempts.
    let row = storage.get_session(&session.id).await.unwrap().unwrap();
    assert_eq!(row.status, "cancelled");
}

#[tokio::test]
async fn test_finish_requires_ownership() {
    let dir = TempDir::new().unwrap();
    let storage = make_storage(&dir).await;
    let (user_a, task_a) = make_user_with_task(&storage, "a@example.com").await;
    let (user_b, _task_b) = make_user_with_task(&storage, "b@example.com").await;

    let session = sessions::start_session(&storage, &user_a, &task_a, 25)
        .await
        .unwrap();
    let err = sessions::complete_session(&storage, &session.id, &user_b)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden));

    // Still in progress for the real owner.
    let row = storage.get_session(&session.id).await.unwrap().unwrap();
    assert_eq!(row.status, "in_progress");
}

#[tokio::test]
async fn test_history_filters_and_pagination() {
    let dir = TempDir::new().unwrap();
    let storage = make_storage(&dir).await;
    let (user_id, task_a) = make_user_with_task(&storage, "a@example.com").await;
    let task_b = storage
        .create_task(&user_id, "reading", None)
        .await
        .unwrap()
        .id;

    for _ in 0..3 {
        let s = sessions::start_session(&storage, &user_id, &task_a, 25)
            .await
            .unwrap();
        sessions::complete_session(&storage, &s.id, &user_id)
            .await
            .unwrap();
    }
    let s = sessions::start_session(&storage, &user_id, &task_b, 25)
        .await
        .unwrap();
    sessions::cancel_session(&storage, &s.id, &user_id).await.unwrap();

    let all = sessions::session_history(&storage, &user_id, HistoryFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 4);

    let completed = sessions::session_history(
        &storage,
        &user_id,
        HistoryFilter {
            status: Some("completed".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(completed.len(), 3);

    let for_task_b = sessions::session_history(
        &storage,
        &user_id,
        HistoryFilter {
            task_id: Some(task_b.clone()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(for_task_b.len(), 1);
    assert_eq!(for_task_b[0].status, "cancelled");

    let page = sessions::session_history(
        &storage,
        &user_id,
        HistoryFilter {
            limit: Some(2),
            offset: Some(2),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(page.len(), 2);

    // Limits above the cap are clamped rather than rejected.
    let capped = sessions::session_history(
        &storage,
        &user_id,
        HistoryFilter {
            limit: Some(10_000),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(capped.len(), 4);

    let err = sessions::session_history(
        &storage,
        &user_id,
        HistoryFilter {
            status: Some("paused".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[tokio::test]
async fn test_focus_stats_count_only_completed_sessions() {
    let dir = TempDir::new().unwrap();
    let storage = make_storage(&dir).await;
    let (user_id, task_id) = make_user_with_task(&storage, "a@example.com").await;

    let s1 = sessions::start_session(&storage, &user_id, &task_id, 25)
        .await
        .unwrap();
    sessions::complete_session(&storage, &s1.id, &user_id)
        .await
        .unwrap();

    let s2 = sessions::start_session(&storage, &user_id, &task_id, 50)
        .await
        .unwrap();
    sessions::complete_session(&storage, &s2.id, &user_id)
        .await
        .unwrap();

    let s3 = sessions::start_session(&storage, &user_id, &task_id, 100)
        .await
        .unwrap();
    sessions::cancel_session(&storage, &s3.id, &user_id).await.unwrap();

    // Left in progress on purpose.
    sessions::start_session(&storage, &user_id, &task_id, 100)
        .await
        .unwrap();

    let stats = sessions::focus_stats(&storage, &user_id).await.unwrap();
    assert_eq!(stats.completed_sessions, 2);
    assert_eq!(stats.total_focus_time, 75);
}
