mod support;

use axum::http::{Method, StatusCode};
use clinic_service::store::Collection;
use common_auth::Role;
use serde_json::json;
use support::TestApp;

#[tokio::test]
async fn centeradmin_deletes_receptionist() {
    let app = TestApp::new().await;
    let (_, admin) = app.token_for(Role::CenterAdmin).await;

    let created = app
        .post(
            "/api/centeradmin/receptionists",
            &admin,
            json!({"name": "Rita", "email": "rita@test.com", "password": "frontdesk1"}),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["role"], "receptionist");
    assert_eq!(created.body["centerId"], app.center_id.to_string());
    assert!(created.body.get("passwordHash").is_none());
    assert!(created.body.get("password").is_none());
    let id = created.body["id"].as_str().unwrap().to_string();

    let deleted = app
        .delete(&format!("/api/centeradmin/receptionists/{id}"), &admin)
        .await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let gone = app
        .get(&format!("/api/centeradmin/receptionists/{id}"), &admin)
        .await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    assert_eq!(gone.body["code"], "receptionist_not_found");
}

#[tokio::test]
async fn created_staff_can_log_in() {
    let app = TestApp::new().await;
    let (_, admin) = app.token_for(Role::CenterAdmin).await;

    let created = app
        .post(
            "/api/centeradmin/lab-staff",
            &admin,
            json!({"name": "Lab One", "email": "Lab@Test.com", "password": "pipette42"}),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["email"], "lab@test.com");

    let login = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"email": "lab@test.com", "password": "pipette42"})),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
    assert_eq!(login.body["user"]["role"], "lab");
    assert_eq!(login.body["user"]["centerId"], app.center_id.to_string());
}

#[tokio::test]
async fn emails_are_unique_across_roles() {
    let app = TestApp::new().await;
    let (_, admin) = app.token_for(Role::CenterAdmin).await;
    app.seed_identity(Role::Doctor, "taken@test.com", Some(app.center_id))
        .await;

    let resp = app
        .post(
            "/api/centeradmin/receptionists",
            &admin,
            json!({"name": "Dup", "email": "TAKEN@test.com", "password": "whatever1"}),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CONFLICT);
    assert_eq!(resp.body["code"], "email_taken");
    assert_eq!(app.count(Collection::Receptionists).await, 0);
}

#[tokio::test]
async fn role_cannot_be_changed_through_payload() {
    let app = TestApp::new().await;
    let (_, admin) = app.token_for(Role::CenterAdmin).await;
    let doctor = app
        .seed_identity(Role::Doctor, "doc2@test.com", Some(app.center_id))
        .await;

    let escalate = app
        .put(
            &format!("/api/centeradmin/doctors/{}", doctor.id),
            &admin,
            json!({"role": "superadmin"}),
        )
        .await;
    assert_eq!(escalate.status, StatusCode::BAD_REQUEST);
    assert_eq!(escalate.body["code"], "immutable_role");

    let create = app
        .post(
            "/api/centeradmin/doctors",
            &admin,
            json!({"name": "X", "email": "x@test.com", "password": "pw123456", "role": "centeradmin"}),
        )
        .await;
    assert_eq!(create.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_changes_profile_and_password() {
    let app = TestApp::new().await;
    let (admin_identity, admin) = app.token_for(Role::CenterAdmin).await;
    let doctor = app
        .seed_identity(Role::Doctor, "doc3@test.com", Some(app.center_id))
        .await;

    let updated = app
        .put(
            &format!("/api/centeradmin/doctors/{}", doctor.id),
            &admin,
            json!({"name": "Dr. Renamed", "password": "newsecret9"}),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["name"], "Dr. Renamed");
    assert_eq!(updated.body["email"], "doc3@test.com");
    assert_eq!(updated.body["updatedBy"], admin_identity.id.to_string());

    let login = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"email": "doc3@test.com", "password": "newsecret9"})),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
}

#[tokio::test]
async fn blank_password_on_update_keeps_the_old_one() {
    let app = TestApp::new().await;
    let (_, admin) = app.token_for(Role::CenterAdmin).await;
    let doctor = app
        .seed_identity(Role::Doctor, "doc4@test.com", Some(app.center_id))
        .await;

    let updated = app
        .put(
            &format!("/api/centeradmin/doctors/{}", doctor.id),
            &admin,
            json!({"name": "Dr. Kept", "password": ""}),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["name"], "Dr. Kept");

    let login = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"email": "doc4@test.com", "password": support::PASSWORD})),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
}

#[tokio::test]
async fn centeradmin_only_sees_own_center_staff() {
    let app = TestApp::new().await;
    let (_, admin) = app.token_for(Role::CenterAdmin).await;
    app.seed_identity(Role::Doctor, "mine@test.com", Some(app.center_id))
        .await;
    let foreign = app
        .seed_identity(Role::Doctor, "theirs@test.com", Some(app.other_center_id))
        .await;

    let list = app.get("/api/centeradmin/doctors", &admin).await;
    let emails: Vec<&str> = list
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["email"].as_str().unwrap())
        .collect();
    assert_eq!(emails, vec!["mine@test.com"]);

    let resp = app
        .delete(&format!("/api/centeradmin/doctors/{}", foreign.id), &admin)
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let (_, superadmin) = app.token_for(Role::SuperAdmin).await;
    let all = app.get("/api/superadmin/doctors", &superadmin).await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(all.body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn patient_accounts_link_to_a_patient_in_the_same_center() {
    let app = TestApp::new().await;
    let (_, receptionist) = app.token_for(Role::Receptionist).await;
    let patient = app
        .post("/api/patients", &receptionist, json!({"name": "Pia"}))
        .await;
    let patient_id = patient.body["id"].as_str().unwrap().to_string();

    let missing = app
        .post(
            "/api/patient-accounts",
            &receptionist,
            json!({"name": "Pia", "email": "pia@test.com", "password": "portal123"}),
        )
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.body["code"], "missing_patientId");

    let created = app
        .post(
            "/api/patient-accounts",
            &receptionist,
            json!({
                "name": "Pia",
                "email": "pia@test.com",
                "password": "portal123",
                "patientId": patient_id,
            }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["patientId"], patient_id.as_str());

    let (_, doctor) = app.token_for(Role::Doctor).await;
    let blocked = app
        .delete(&format!("/api/patients/{patient_id}"), &doctor)
        .await;
    assert_eq!(blocked.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn missing_fields_are_named() {
    let app = TestApp::new().await;
    let (_, admin) = app.token_for(Role::CenterAdmin).await;

    for (body, code) in [
        (json!({"email": "a@test.com", "password": "pw123456"}), "missing_name"),
        (json!({"name": "A", "password": "pw123456"}), "missing_email"),
        (json!({"name": "A", "email": "a@test.com"}), "missing_password"),
        (
            json!({"name": "A", "email": "not-an-email", "password": "pw123456"}),
            "invalid_email",
        ),
    ] {
        let resp = app.post("/api/centeradmin/doctors", &admin, body).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(resp.body["code"], code);
    }
    assert_eq!(app.count(Collection::Doctors).await, 0);
}
