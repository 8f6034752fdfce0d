/// Widgets are identified by client- or server-assigned v4 UUIDs.
pub type WidgetId = uuid::Uuid;

/// Platform entities (devices, users, customers) are identified by UUIDs.
pub type EntityUuid = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Telemetry timestamps are Unix epoch milliseconds, as the platform reports them.
pub type EpochMillis = i64;
