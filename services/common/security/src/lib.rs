pub mod access;
pub mod context;
pub mod error;
pub mod policy;

pub use access::{enforce_access, AccessPolicy, RevocationList};
pub use context::{SecurityContext, SecurityCtxExtractor};
pub use error::SecurityError;
pub use policy::{capabilities_of, ensure_capability, role_can, Capability};
