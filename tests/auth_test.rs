//! Registration and token lifecycle tests.

use focusd::auth;
use focusd::error::ServiceError;
use focusd::storage::Storage;
use tempfile::TempDir;

async fn make_storage(dir: &TempDir) -> Storage {
    Storage::new(dir.path()).await.unwrap()
}

#[tokio::test]
async fn test_register_normalizes_email_and_issues_token() {
    let dir = TempDir::new().unwrap();
    let storage = make_storage(&dir).await;

    let (user, token) = auth::register(&storage, "  Alice@Example.COM ", Some("Europe/Berlin"))
        .await
        .unwrap();
    assert_eq!(user.email, "alice@example.com");
    assert_eq!(user.timezone, "Europe/Berlin");
    assert_eq!(token.len(), 64);

    let resolved = auth::authenticate(&storage, &token).await.unwrap();
    assert_eq!(resolved, user.id);
}

#[tokio::test]
async fn test_register_rejects_bad_and_duplicate_emails() {
    let dir = TempDir::new().unwrap();
    let storage = make_storage(&dir).await;

    for bad in ["", "   ", "not-an-email"] {
        let err = auth::register(&storage, bad, None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)), "email {bad:?}");
    }

    auth::register(&storage, "a@example.com", None).await.unwrap();
    let err = auth::register(&storage, "A@example.com", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn test_rotate_invalidates_old_token() {
    let dir = TempDir::new().unwrap();
    let storage = make_storage(&dir).await;

    let (user, old_token) = auth::register(&storage, "a@example.com", None).await.unwrap();
    let new_token = auth::rotate_token(&storage, &user.id).await.unwrap();
    assert_ne!(old_token, new_token);

    let err = auth::authenticate(&storage, &old_token).await.unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized));
    assert_eq!(auth::authenticate(&storage, &new_token).await.unwrap(), user.id);
}

#[tokio::test]
async fn test_unknown_token_is_unauthorized() {
    let dir = TempDir::new().unwrap();
    let storage = make_storage(&dir).await;

    let err = auth::authenticate(&storage, "deadbeef").await.unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized));
}
