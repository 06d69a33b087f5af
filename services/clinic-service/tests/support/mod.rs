#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use clinic_service::config::ServiceConfig;
use clinic_service::identity::{hash_password, Identity, IdentityStatus};
use clinic_service::records::Record;
use clinic_service::store::{Collection, DocumentStore, MemoryStore};
use clinic_service::{build_router, AppState};
use common_auth::{Role, TokenSubject};
use http_body_util::BodyExt;
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "password123";

// Argon2 is slow in debug builds; every seeded account shares one hash.
static PASSWORD_HASH: Lazy<String> =
    Lazy::new(|| hash_password(PASSWORD).expect("hash test password"));

pub fn test_config() -> ServiceConfig {
    ServiceConfig::from_lookup(|key| match key {
        "DATABASE_URL" => Some("memory://".into()),
        "JWT_SECRET" => Some("clinic-service-test-secret-0123456789".into()),
        _ => None,
    })
    .expect("test config")
}

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    pub center_id: Uuid,
    pub other_center_id: Uuid,
}

pub struct Response {
    pub status: StatusCode,
    pub body: Value,
    pub raw: Vec<u8>,
}

impl TestApp {
    pub async fn new() -> Self {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let state = AppState::new(test_config(), store).expect("app state");
        let router = build_router(state.clone());
        let mut app = Self {
            state,
            router,
            center_id: Uuid::nil(),
            other_center_id: Uuid::nil(),
        };
        app.center_id = app.seed_center("North Clinic").await;
        app.other_center_id = app.seed_center("South Clinic").await;
        app
    }

    pub async fn seed_center(&self, name: &str) -> Uuid {
        let now = Utc::now();
        let mut data = serde_json::Map::new();
        data.insert("name".into(), json!(name));
        let record = Record {
            id: Uuid::new_v4(),
            center_id: None,
            updated_by: Uuid::nil(),
            created_at: now,
            updated_at: now,
            data,
        };
        self.state
            .store
            .insert(Collection::Centers, record.to_document().unwrap())
            .await
            .unwrap();
        record.id
    }

    pub async fn seed_identity(&self, role: Role, email: &str, center_id: Option<Uuid>) -> Identity {
        let now = Utc::now();
        let identity = Identity {
            id: Uuid::new_v4(),
            name: format!("{role} user"),
            email: email.to_string(),
            password_hash: PASSWORD_HASH.clone(),
            role,
            center_id,
            patient_id: None,
            status: IdentityStatus::Active,
            created_at: now,
            updated_at: now,
            updated_by: None,
        };
        self.state.credentials.insert(&identity).await.unwrap();
        identity
    }

    /// Seeds an identity of `role` in the primary center and returns a token for it.
    pub async fn token_for(&self, role: Role) -> (Identity, String) {
        let center = role.requires_center().then_some(self.center_id);
        let email = format!("{}-{}@test.com", role, Uuid::new_v4().simple());
        let identity = self.seed_identity(role, &email, center).await;
        let token = self.issue(&identity);
        (identity, token)
    }

    pub fn issue(&self, identity: &Identity) -> String {
        self.state
            .token_signer
            .issue(&TokenSubject {
                user_id: identity.id,
                role: identity.role,
                center_id: identity.center_id,
            })
            .unwrap()
            .token
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let resp = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let raw = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
        let body = serde_json::from_slice(&raw).unwrap_or(Value::Null);
        Response { status, body, raw }
    }

    pub async fn get(&self, uri: &str, token: &str) -> Response {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> Response {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> Response {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Response {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    pub async fn count(&self, collection: Collection) -> usize {
        self.state
            .store
            .find(collection, &Default::default())
            .await
            .unwrap()
            .len()
    }
}
