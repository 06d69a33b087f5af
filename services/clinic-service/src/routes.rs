use std::sync::Arc;

use axum::{
    extract::State,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    middleware::from_fn_with_state,
    response::Response,
    routing::{get, post},
    Router,
};
use common_auth::Role;
use common_observability::track_http_errors;
use common_security::{enforce_access, AccessPolicy, Capability, RevocationList};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::auth_handlers::{current_user, login_user, logout};
use crate::metrics::ClinicMetrics;
use crate::record_handlers::{
    create_record, delete_record, get_record, list_records, update_record, ResourceState,
};
use crate::records::ResourceKind;
use crate::staff_handlers::{
    create_staff, delete_staff, get_staff, list_staff, update_staff, StaffState,
};
use crate::AppState;

async fn health() -> &'static str {
    "ok"
}

async fn metrics_endpoint(State(metrics): State<Arc<ClinicMetrics>>) -> Response {
    metrics.render()
}

struct Policies {
    state: AppState,
}

impl Policies {
    fn rule(&self, read: Capability, write: Capability) -> AccessPolicy {
        let revocations: Arc<dyn RevocationList> = Arc::new(self.state.revocations.clone());
        AccessPolicy::new(self.state.jwt_verifier.clone(), read)
            .with_write(write)
            .with_revocations(revocations)
    }

    fn only(&self, capability: Capability) -> AccessPolicy {
        self.rule(capability, capability)
    }
}

fn record_routes(state: &AppState, kind: ResourceKind, policy: AccessPolicy) -> Router {
    Router::new()
        .route("/", get(list_records).post(create_record))
        .route(
            "/:id",
            get(get_record).put(update_record).delete(delete_record),
        )
        .route_layer(from_fn_with_state(policy, enforce_access))
        .with_state(ResourceState::new(state.clone(), kind))
}

fn staff_routes(state: &AppState, role: Role, policy: AccessPolicy) -> Router {
    Router::new()
        .route("/", get(list_staff).post(create_staff))
        .route("/:id", get(get_staff).put(update_staff).delete(delete_staff))
        .route_layer(from_fn_with_state(policy, enforce_access))
        .with_state(StaffState::new(state.clone(), role))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(%origin, ?err, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            ACCEPT,
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static("x-trace-id"),
        ])
}

/// Every `/api` route except login sits behind an access policy.
pub fn build_router(state: AppState) -> Router {
    let policies = Policies {
        state: state.clone(),
    };

    let session = Router::new()
        .route("/api/auth/me", get(current_user))
        .route("/api/auth/logout", post(logout))
        .route_layer(from_fn_with_state(
            policies.only(Capability::Session),
            enforce_access,
        ))
        .with_state(state.clone());

    let public = Router::new()
        .route("/healthz", get(health))
        .route("/api/auth/login", post(login_user))
        .with_state(state.clone());

    let metrics = Router::new()
        .route("/metrics", get(metrics_endpoint))
        .with_state(state.metrics.clone());

    let all_doctors = Router::new()
        .route("/", get(list_staff))
        .route_layer(from_fn_with_state(
            policies.only(Capability::ViewAllDoctors),
            enforce_access,
        ))
        .with_state(StaffState::new(state.clone(), Role::Doctor));

    let clinical = policies.rule(
        Capability::ViewClinicalRecords,
        Capability::WriteClinicalRecords,
    );

    let mut router = Router::new()
        .merge(public)
        .merge(metrics)
        .merge(session)
        .nest(
            "/api/superadmin/centers",
            record_routes(&state, ResourceKind::Center, policies.only(Capability::ManageCenters)),
        )
        .nest(
            "/api/superadmin/centeradmins",
            staff_routes(&state, Role::CenterAdmin, policies.only(Capability::ManageCenterAdmins)),
        )
        .nest("/api/superadmin/doctors", all_doctors)
        .nest(
            "/api/centeradmin/doctors",
            staff_routes(&state, Role::Doctor, policies.only(Capability::ManageStaff)),
        )
        .nest(
            "/api/centeradmin/receptionists",
            staff_routes(&state, Role::Receptionist, policies.only(Capability::ManageStaff)),
        )
        .nest(
            "/api/centeradmin/lab-staff",
            staff_routes(&state, Role::Lab, policies.only(Capability::ManageStaff)),
        )
        .nest(
            "/api/patient-accounts",
            staff_routes(
                &state,
                Role::Patient,
                policies.only(Capability::ManagePatientAccounts),
            ),
        )
        .nest(
            "/api/patients",
            record_routes(
                &state,
                ResourceKind::Patient,
                policies.rule(Capability::ViewPatients, Capability::WritePatients),
            ),
        )
        .nest(
            "/api/prescriptions",
            record_routes(&state, ResourceKind::Prescription, clinical.clone()),
        )
        .nest(
            "/api/history",
            record_routes(
                &state,
                ResourceKind::VisitHistory,
                policies.rule(
                    Capability::ViewClinicalRecords,
                    Capability::WriteVisitHistory,
                ),
            ),
        );

    for kind in ResourceKind::FOLLOW_UPS {
        router = router.nest(
            &format!("/api/followups/{}", kind.slug()),
            record_routes(&state, kind, clinical.clone()),
        );
    }

    router
        .layer(from_fn_with_state(
            state.metrics.service().clone(),
            track_http_errors,
        ))
        .layer(cors_layer(&state.config.cors_allowed_origins))
}
