use std::sync::Arc;

use chrono::{Duration, Utc};
use clinic_client::{
    ApiClient, ClientError, ClientRoute, DurableStorage, FileStorage, MemoryStorage, Navigation,
    Navigator, SessionStore, SessionUser, TOKEN_KEY, USER_KEY,
};
use common_auth::{JwtConfig, Role, TokenSigner, TokenSubject};
use httpmock::prelude::*;
use serde_json::{json, Value};
use uuid::Uuid;

const SECRET: &[u8] = b"client-session-test-secret-00000";

fn user(role: Role) -> SessionUser {
    SessionUser {
        id: Uuid::new_v4(),
        name: "Dr Test".into(),
        email: "doc@test.com".into(),
        role,
        center_id: role.requires_center().then(Uuid::new_v4),
    }
}

fn mint(user: &SessionUser, issued: chrono::DateTime<Utc>) -> String {
    let signer = TokenSigner::from_secret(JwtConfig::new("iss", "aud"), SECRET).unwrap();
    signer
        .issue_at(
            &TokenSubject {
                user_id: user.id,
                role: user.role,
                center_id: user.center_id,
            },
            issued,
        )
        .unwrap()
        .token
}

fn store(server: &MockServer, storage: Arc<dyn DurableStorage>) -> SessionStore {
    let api = ApiClient::with_client(reqwest::Client::new(), server.base_url());
    SessionStore::new(api, storage)
}

async fn mock_login<'a>(server: &'a MockServer, user: &SessionUser, token: &str) -> httpmock::Mock<'a> {
    let body = json!({
        "token": token,
        "tokenType": "Bearer",
        "expiresIn": 28800,
        "user": user,
    });
    server
        .mock_async(move |when, then| {
            when.method(POST).path("/api/auth/login");
            then.status(200).json_body(body);
        })
        .await
}

fn seed(storage: &dyn DurableStorage, token: &str, user: &SessionUser) {
    storage.set(TOKEN_KEY, token).unwrap();
    storage
        .set(USER_KEY, &serde_json::to_string(user).unwrap())
        .unwrap();
}

#[tokio::test]
async fn restore_after_reload_reproduces_role_and_id() {
    let server = MockServer::start_async().await;
    let doctor = user(Role::Doctor);
    let token = mint(&doctor, Utc::now());
    let login = mock_login(&server, &doctor, &token).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let first = store(&server, Arc::new(FileStorage::new(&path)));
    first.restore_from_storage().await.unwrap();
    let signed_in = first.login("doc@test.com", "password123").await.unwrap();
    assert_eq!(signed_in.role, Role::Doctor);
    login.assert_async().await;

    // A fresh process over the same file.
    let second = store(&server, Arc::new(FileStorage::new(&path)));
    let mut rx = second.subscribe();
    let restored = second.restore_from_storage().await.unwrap().expect("session restored");
    assert_eq!(restored.id, doctor.id);
    assert_eq!(restored.role, Role::Doctor);
    assert!(rx.has_changed().unwrap());
    let session = rx.borrow_and_update().clone().unwrap();
    assert_eq!(session.token, token);
    assert_eq!(session.user, doctor);
}

#[tokio::test]
async fn expired_token_is_discarded() {
    let server = MockServer::start_async().await;
    let storage = Arc::new(MemoryStorage::new());
    let lab = user(Role::Lab);
    seed(storage.as_ref(), &mint(&lab, Utc::now() - Duration::hours(9)), &lab);

    let session = store(&server, storage.clone());
    assert_eq!(session.restore_from_storage().await.unwrap(), None);
    assert!(session.current().is_none());
    assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
    assert_eq!(storage.get(USER_KEY).unwrap(), None);
}

#[tokio::test]
async fn snapshot_that_disagrees_with_token_is_discarded() {
    let server = MockServer::start_async().await;
    let storage = Arc::new(MemoryStorage::new());
    let receptionist = user(Role::Receptionist);
    let token = mint(&receptionist, Utc::now());
    let mut forged = receptionist.clone();
    forged.role = Role::SuperAdmin;
    seed(storage.as_ref(), &token, &forged);

    let session = store(&server, storage.clone());
    assert_eq!(session.restore_from_storage().await.unwrap(), None);
    assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
}

#[tokio::test]
async fn cleared_storage_empties_the_reactive_store() {
    let server = MockServer::start_async().await;
    let doctor = user(Role::Doctor);
    let token = mint(&doctor, Utc::now());
    mock_login(&server, &doctor, &token).await;

    let storage = Arc::new(MemoryStorage::new());
    let session = store(&server, storage.clone());
    session.login("doc@test.com", "password123").await.unwrap();
    assert!(session.current().is_some());

    storage.remove(TOKEN_KEY).unwrap();
    storage.remove(USER_KEY).unwrap();

    assert_eq!(session.restore_from_storage().await.unwrap(), None);
    assert!(session.current().is_none());
}

#[tokio::test]
async fn restore_runs_once() {
    let server = MockServer::start_async().await;
    let session = store(&server, Arc::new(MemoryStorage::new()));
    assert!(!session.is_restored());
    session.restore_from_storage().await.unwrap();
    assert!(session.is_restored());
    assert!(matches!(
        session.restore_from_storage().await,
        Err(ClientError::AlreadyRestored)
    ));
}

#[tokio::test]
async fn logout_clears_both_stores_even_when_server_fails() {
    let server = MockServer::start_async().await;
    let doctor = user(Role::Doctor);
    let token = mint(&doctor, Utc::now());
    mock_login(&server, &doctor, &token).await;
    let logout = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/auth/logout")
                .header_exists("authorization");
            then.status(500);
        })
        .await;

    let storage = Arc::new(MemoryStorage::new());
    let session = store(&server, storage.clone());
    session.restore_from_storage().await.unwrap();
    session.login("doc@test.com", "password123").await.unwrap();

    session.logout().await.unwrap();
    logout.assert_async().await;
    assert!(session.current().is_none());
    assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
    assert_eq!(storage.get(USER_KEY).unwrap(), None);
}

#[tokio::test]
async fn failed_login_leaves_storage_untouched() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/auth/login");
            then.status(401).json_body(json!({
                "code": "invalid_credentials",
                "message": "Invalid email or password"
            }));
        })
        .await;

    let storage = Arc::new(MemoryStorage::new());
    let session = store(&server, storage.clone());
    let err = session.login("doc@test.com", "nope").await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid email or password");
    assert!(session.current().is_none());
    assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
}

#[tokio::test]
async fn navigator_refuses_to_fetch_before_restore() {
    let server = MockServer::start_async().await;
    let fetch = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/patients");
            then.status(200).json_body(json!([]));
        })
        .await;

    let nav = Navigator::new(Arc::new(store(&server, Arc::new(MemoryStorage::new()))));
    assert!(matches!(
        nav.navigate::<Value>(ClientRoute::Patients).await,
        Err(ClientError::NotRestored)
    ));
    fetch.assert_hits_async(0).await;
}

#[tokio::test]
async fn navigator_redirects_without_fetching() {
    let server = MockServer::start_async().await;
    let fetch = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/superadmin/doctors");
            then.status(200).json_body(json!([]));
        })
        .await;

    let storage = Arc::new(MemoryStorage::new());
    let admin = user(Role::CenterAdmin);
    seed(storage.as_ref(), &mint(&admin, Utc::now()), &admin);
    let session = Arc::new(store(&server, storage));
    session.restore_from_storage().await.unwrap();

    let nav = Navigator::new(session);
    let outcome = nav.navigate::<Value>(ClientRoute::AllDoctors).await.unwrap();
    assert_eq!(outcome, Navigation::Redirected(ClientRoute::CenterAdminDashboard));
    fetch.assert_hits_async(0).await;
}

#[tokio::test]
async fn navigator_fetches_for_allowed_routes() {
    let server = MockServer::start_async().await;
    let storage = Arc::new(MemoryStorage::new());
    let doctor = user(Role::Doctor);
    let token = mint(&doctor, Utc::now());
    seed(storage.as_ref(), &token, &doctor);

    let bearer = format!("Bearer {token}");
    let fetch = server
        .mock_async(move |when, then| {
            when.method(GET)
                .path("/api/patients")
                .header("authorization", bearer.as_str());
            then.status(200).json_body(json!([{"id": "p1", "name": "Asha"}]));
        })
        .await;

    let session = Arc::new(store(&server, storage));
    session.restore_from_storage().await.unwrap();
    let nav = Navigator::new(session);

    match nav.navigate::<Vec<Value>>(ClientRoute::Patients).await.unwrap() {
        Navigation::Rendered { route, data } => {
            assert_eq!(route, ClientRoute::Patients);
            assert_eq!(data.unwrap()[0]["name"], "Asha");
        }
        other => panic!("unexpected {other:?}"),
    }
    fetch.assert_async().await;
}

#[tokio::test]
async fn rejected_token_signs_out_and_returns_to_login() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/patients");
            then.status(401).json_body(json!({"code": "unauthenticated"}));
        })
        .await;

    let storage = Arc::new(MemoryStorage::new());
    let doctor = user(Role::Doctor);
    seed(storage.as_ref(), &mint(&doctor, Utc::now()), &doctor);
    let session = Arc::new(store(&server, storage.clone()));
    session.restore_from_storage().await.unwrap();

    let nav = Navigator::new(session.clone());
    let outcome = nav.navigate::<Value>(ClientRoute::Patients).await.unwrap();
    assert_eq!(outcome, Navigation::Redirected(ClientRoute::Login));
    assert!(session.current().is_none());
    assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
}

#[tokio::test]
async fn unreadable_session_file_is_reset_on_restore() {
    let server = MockServer::start_async().await;
    let doctor = user(Role::Doctor);
    let token = mint(&doctor, Utc::now());
    mock_login(&server, &doctor, &token).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, b"{trunc").unwrap();

    let session = store(&server, Arc::new(FileStorage::new(&path)));
    assert_eq!(session.restore_from_storage().await.unwrap(), None);
    assert!(session.is_restored());
    assert!(session.current().is_none());

    let signed_in = session.login("doc@test.com", "password123").await.unwrap();
    assert_eq!(signed_in.id, doctor.id);

    let reopened = FileStorage::new(&path);
    assert_eq!(reopened.get(TOKEN_KEY).unwrap().as_deref(), Some(token.as_str()));
}

#[tokio::test]
async fn login_rejects_an_already_expired_token() {
    let server = MockServer::start_async().await;
    let doctor = user(Role::Doctor);
    let stale = mint(&doctor, Utc::now() - Duration::hours(9));
    mock_login(&server, &doctor, &stale).await;

    let storage = Arc::new(MemoryStorage::new());
    let session = store(&server, storage.clone());
    assert!(matches!(
        session.login("doc@test.com", "password123").await,
        Err(ClientError::Expired)
    ));
    assert!(session.current().is_none());
    assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
}

#[tokio::test]
async fn session_that_runs_out_goes_to_login_without_fetching() {
    let server = MockServer::start_async().await;
    let fetch = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/patients");
            then.status(200).json_body(json!([]));
        })
        .await;

    let storage = Arc::new(MemoryStorage::new());
    let doctor = user(Role::Doctor);
    // Expired an hour ago, but still valid at the restore instant.
    seed(storage.as_ref(), &mint(&doctor, Utc::now() - Duration::hours(9)), &doctor);
    let session = Arc::new(store(&server, storage.clone()));
    let restored = session.restore_at(Utc::now() - Duration::hours(2)).unwrap();
    assert_eq!(restored.map(|u| u.id), Some(doctor.id));

    let nav = Navigator::new(session.clone());
    let outcome = nav.navigate::<Value>(ClientRoute::Patients).await.unwrap();
    assert_eq!(outcome, Navigation::Redirected(ClientRoute::Login));
    fetch.assert_hits_async(0).await;
    assert!(session.current().is_none());
    assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
}
