//! Domain logic for the aquadash water-treatment dashboard.
//!
//! Everything here is pure: widget definitions and their validation, the
//! grid placement engine, the dashboard configuration reconciler, the
//! per-user edit session, and the telemetry value model. I/O against the
//! Telemetry Platform lives in `aquadash-platform`.

pub mod dashboard;
pub mod error;
pub mod layout;
pub mod placement;
pub mod reconcile;
pub mod session;
pub mod telemetry;
pub mod types;
pub mod widget;
