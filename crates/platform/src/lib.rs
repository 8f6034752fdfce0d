//! Client side of the Telemetry Platform.
//!
//! Wraps the platform's REST API (auth, customer/user/device registry,
//! time series, alarms, entity attributes) and builds the two pieces the
//! dashboard needs on top of it: the per-user dashboard config store and
//! the widget telemetry polling layer.

pub mod api;
pub mod attributes;
pub mod config_store;
pub mod error;
pub mod models;
pub mod polling;
pub mod session;

pub use api::PlatformClient;
pub use error::PlatformError;
pub use session::{Authority, PlatformSession};
