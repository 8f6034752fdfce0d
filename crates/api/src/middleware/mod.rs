//! Authentication and authorization middleware extractors.
//!
//! - [`auth::AuthSession`] -- Builds the caller's platform session from a Bearer token.
//! - [`rbac::RequireTenantAdmin`] -- Requires the `TENANT_ADMIN` authority.

pub mod auth;
pub mod rbac;
