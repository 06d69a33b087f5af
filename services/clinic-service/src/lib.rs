pub mod app;
pub mod auth_handlers;
pub mod bootstrap;
pub mod config;
pub mod identity;
pub mod metrics;
pub mod record_handlers;
pub mod records;
pub mod revocation;
pub mod routes;
pub mod staff_handlers;
pub mod store;
pub mod validation;

pub use app::AppState;
pub use routes::build_router;
