//! Widget telemetry polling.
//!
//! A widget may bind keys on several devices. [`fetch_widget_data`] issues
//! one platform read per device, concurrently, and waits for all of them to
//! settle. A device that fails contributes empty (`None`) values and a
//! warning; only an expired session fails the whole fetch, since every
//! other read would fail the same way.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;

use aquadash_core::error::CoreError;
use aquadash_core::telemetry::{
    latest_point, telemetry_requests, TelemetryPoint, TelemetrySeries, TimeRange,
};
use aquadash_core::types::{EntityUuid, EpochMillis, Timestamp, WidgetId};
use aquadash_core::widget::{Parameter, ThresholdStatus, Widget, WidgetType};

use crate::api::PlatformClient;
use crate::error::PlatformError;
use crate::models::{Alarm, PageData, PageLink};
use crate::session::PlatformSession;

/// Read side of the platform used by the polling layer.
#[async_trait]
pub trait TelemetryReader: Send + Sync {
    async fn read_series(
        &self,
        session: &PlatformSession,
        device_id: EntityUuid,
        keys: &[String],
        range: TimeRange,
    ) -> Result<TelemetrySeries, PlatformError>;

    async fn read_alarms(
        &self,
        session: &PlatformSession,
        device_id: EntityUuid,
        page: PageLink,
    ) -> Result<PageData<Alarm>, PlatformError>;
}

#[async_trait]
impl TelemetryReader for PlatformClient {
    async fn read_series(
        &self,
        session: &PlatformSession,
        device_id: EntityUuid,
        keys: &[String],
        range: TimeRange,
    ) -> Result<TelemetrySeries, PlatformError> {
        self.read_telemetry(session, device_id, keys, range).await
    }

    async fn read_alarms(
        &self,
        session: &PlatformSession,
        device_id: EntityUuid,
        page: PageLink,
    ) -> Result<PageData<Alarm>, PlatformError> {
        self.device_alarms(session, device_id, page).await
    }
}

// ---------------------------------------------------------------------------
// Widget data
// ---------------------------------------------------------------------------

/// Data for one widget at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WidgetData {
    pub widget_id: WidgetId,
    pub widget_type: WidgetType,
    pub fetched_at: Timestamp,
    #[serde(flatten)]
    pub content: WidgetContent,
}

/// Per-type widget payload. `None` marks a value whose device could not be
/// read.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WidgetContent {
    /// Card, donut and pie widgets.
    Values { values: Vec<ValueReading> },
    /// Bar and line widgets.
    Series { series: Vec<SeriesReading> },
    Locations { locations: Vec<LocationReading> },
    Table { rows: Vec<TableRow> },
    Image { image_id: String, link: String },
    Alarms { devices: Vec<AlarmReading> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueReading {
    pub device_id: EntityUuid,
    pub key: String,
    pub label: Option<String>,
    pub unit: Option<String>,
    pub ts: Option<EpochMillis>,
    pub value: Option<f64>,
    pub status: Option<ThresholdStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesReading {
    pub device_id: EntityUuid,
    pub key: String,
    pub label: Option<String>,
    pub unit: Option<String>,
    pub points: Option<Vec<TelemetryPoint>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationReading {
    pub device_id: EntityUuid,
    pub label: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub device_id: EntityUuid,
    pub name: String,
    pub values: BTreeMap<String, Option<Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlarmReading {
    pub device_id: EntityUuid,
    pub label: Option<String>,
    pub alarms: Option<Vec<Alarm>>,
}

// ---------------------------------------------------------------------------
// Fetch
// ---------------------------------------------------------------------------

/// Fetch current data for `widget`.
///
/// `range` applies to bar and line widgets; every other type shows the
/// latest values.
pub async fn fetch_widget_data<R: TelemetryReader + ?Sized>(
    reader: &R,
    session: &PlatformSession,
    widget: &Widget,
    range: TimeRange,
) -> Result<WidgetData, PlatformError> {
    range.validate()?;

    let content = match widget.widget_type {
        WidgetType::Image => image_content(widget)?,
        WidgetType::Alarms => alarm_content(reader, session, widget).await?,
        widget_type => {
            let range = if widget_type.is_time_series() {
                range
            } else {
                TimeRange::latest()
            };
            let series = read_devices(reader, session, widget, range).await?;
            telemetry_content(widget, &series)
        }
    };

    Ok(WidgetData {
        widget_id: widget.id,
        widget_type: widget.widget_type,
        fetched_at: Utc::now(),
        content,
    })
}

/// Read every device the widget binds, concurrently. Failed devices map to
/// `None`.
async fn read_devices<R: TelemetryReader + ?Sized>(
    reader: &R,
    session: &PlatformSession,
    widget: &Widget,
    range: TimeRange,
) -> Result<HashMap<EntityUuid, Option<TelemetrySeries>>, PlatformError> {
    let requests = telemetry_requests(widget);
    let results = join_all(requests.iter().map(|r| async move {
        (
            r.device_id,
            reader.read_series(session, r.device_id, &r.keys, range).await,
        )
    }))
    .await;

    settle(widget.id, results)
}

/// Keep successes, downgrade failures to `None`, and abort on an expired
/// session.
fn settle<T>(
    widget_id: WidgetId,
    results: Vec<(EntityUuid, Result<T, PlatformError>)>,
) -> Result<HashMap<EntityUuid, Option<T>>, PlatformError> {
    let mut settled = HashMap::with_capacity(results.len());
    for (device_id, result) in results {
        match result {
            Ok(value) => {
                settled.insert(device_id, Some(value));
            }
            Err(e) if e.is_unauthorized() => return Err(e),
            Err(e) => {
                tracing::warn!(
                    widget_id = %widget_id,
                    device_id = %device_id,
                    error = %e,
                    "Device read failed; showing empty values"
                );
                settled.insert(device_id, None);
            }
        }
    }
    Ok(settled)
}

fn image_content(widget: &Widget) -> Result<WidgetContent, PlatformError> {
    widget
        .parameters
        .iter()
        .find_map(|p| match p {
            Parameter::Image(b) => Some(WidgetContent::Image {
                image_id: b.image_id.clone(),
                link: b.link.clone(),
            }),
            _ => None,
        })
        .ok_or_else(|| {
            CoreError::Validation(format!(
                "image widget {} has no image parameter",
                widget.id
            ))
            .into()
        })
}

async fn alarm_content<R: TelemetryReader + ?Sized>(
    reader: &R,
    session: &PlatformSession,
    widget: &Widget,
) -> Result<WidgetContent, PlatformError> {
    let bindings: Vec<_> = widget
        .parameters
        .iter()
        .filter_map(|p| match p {
            Parameter::Alarm(b) => Some(b),
            _ => None,
        })
        .collect();

    let results = join_all(bindings.iter().map(|b| async move {
        (
            b.device_id,
            reader
                .read_alarms(session, b.device_id, PageLink::default())
                .await
                .map(|page| page.data),
        )
    }))
    .await;
    let settled = settle(widget.id, results)?;

    let devices = bindings
        .iter()
        .map(|b| AlarmReading {
            device_id: b.device_id,
            label: b.label.clone(),
            alarms: settled.get(&b.device_id).cloned().flatten(),
        })
        .collect();
    Ok(WidgetContent::Alarms { devices })
}

fn telemetry_content(
    widget: &Widget,
    series: &HashMap<EntityUuid, Option<TelemetrySeries>>,
) -> WidgetContent {
    let device = |id: &EntityUuid| series.get(id).and_then(Option::as_ref);
    let latest_numeric = |id: &EntityUuid, key: &str| {
        device(id)
            .and_then(|s| latest_point(s, key))
            .and_then(TelemetryPoint::numeric_value)
    };

    match widget.widget_type {
        WidgetType::Bar | WidgetType::Line => WidgetContent::Series {
            series: widget
                .parameters
                .iter()
                .filter_map(|p| match p {
                    Parameter::Telemetry(b) => Some(SeriesReading {
                        device_id: b.device_id,
                        key: b.key.clone(),
                        label: b.label.clone(),
                        unit: b.unit.clone().or_else(|| widget.unit.clone()),
                        points: device(&b.device_id).map(|s| {
                            let mut points = s.get(&b.key).cloned().unwrap_or_default();
                            points.sort_by_key(|p| p.ts);
                            points
                        }),
                    }),
                    _ => None,
                })
                .collect(),
        },
        WidgetType::Map => WidgetContent::Locations {
            locations: widget
                .parameters
                .iter()
                .filter_map(|p| match p {
                    Parameter::Location(b) => Some(LocationReading {
                        device_id: b.device_id,
                        label: b.label.clone(),
                        lat: latest_numeric(&b.device_id, &b.lat_key),
                        lon: latest_numeric(&b.device_id, &b.lon_key),
                    }),
                    _ => None,
                })
                .collect(),
        },
        WidgetType::Table => WidgetContent::Table {
            rows: widget
                .parameters
                .iter()
                .filter_map(|p| match p {
                    Parameter::Table(b) => Some(TableRow {
                        device_id: b.device_id,
                        name: b.name.clone(),
                        values: b
                            .keys
                            .iter()
                            .map(|k| {
                                let value = device(&b.device_id)
                                    .and_then(|s| latest_point(s, k))
                                    .map(|p| p.value.clone());
                                (k.clone(), value)
                            })
                            .collect(),
                    }),
                    _ => None,
                })
                .collect(),
        },
        _ => WidgetContent::Values {
            values: widget
                .parameters
                .iter()
                .filter_map(|p| match p {
                    Parameter::Telemetry(b) => {
                        let point = device(&b.device_id).and_then(|s| latest_point(s, &b.key));
                        let value = point.and_then(TelemetryPoint::numeric_value);
                        Some(ValueReading {
                            device_id: b.device_id,
                            key: b.key.clone(),
                            label: b.label.clone(),
                            unit: b.unit.clone().or_else(|| widget.unit.clone()),
                            ts: point.map(|p| p.ts),
                            value,
                            status: b.thresholds.zip(value).map(|(t, v)| t.evaluate(v)),
                        })
                    }
                    _ => None,
                })
                .collect(),
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use assert_matches::assert_matches;
    use serde_json::json;
    use uuid::Uuid;

    use aquadash_core::widget::{
        AlarmBinding, ImageBinding, LocationBinding, TableBinding, TelemetryBinding, Thresholds,
    };

    use super::*;
    use crate::session::Authority;

    /// Reader serving canned series per device. Devices listed in `failing`
    /// answer with a 500; `expired` makes every read a 401.
    #[derive(Default)]
    struct FakeReader {
        series: HashMap<EntityUuid, TelemetrySeries>,
        failing: Vec<EntityUuid>,
        expired: bool,
        ranges: Mutex<Vec<TimeRange>>,
    }

    impl FakeReader {
        fn with(mut self, device: EntityUuid, key: &str, points: &[(i64, Value)]) -> Self {
            self.series.entry(device).or_default().insert(
                key.to_string(),
                points
                    .iter()
                    .map(|(ts, value)| TelemetryPoint {
                        ts: *ts,
                        value: value.clone(),
                    })
                    .collect(),
            );
            self
        }

        fn check(&self, device_id: EntityUuid) -> Result<(), PlatformError> {
            if self.expired {
                return Err(PlatformError::Unauthorized("Token has expired".into()));
            }
            if self.failing.contains(&device_id) {
                return Err(PlatformError::Api {
                    status: 500,
                    body: "device unavailable".into(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl TelemetryReader for FakeReader {
        async fn read_series(
            &self,
            _session: &PlatformSession,
            device_id: EntityUuid,
            keys: &[String],
            range: TimeRange,
        ) -> Result<TelemetrySeries, PlatformError> {
            self.check(device_id)?;
            self.ranges.lock().unwrap().push(range);
            let all = self.series.get(&device_id).cloned().unwrap_or_default();
            Ok(all.into_iter().filter(|(k, _)| keys.contains(k)).collect())
        }

        async fn read_alarms(
            &self,
            _session: &PlatformSession,
            device_id: EntityUuid,
            _page: PageLink,
        ) -> Result<PageData<Alarm>, PlatformError> {
            self.check(device_id)?;
            Ok(PageData {
                data: vec![Alarm {
                    id: None,
                    alarm_type: "High turbidity".to_string(),
                    severity: "MAJOR".to_string(),
                    status: "ACTIVE_UNACK".to_string(),
                    start_ts: 1_000,
                    end_ts: None,
                    extra: Default::default(),
                }],
                total_pages: 1,
                total_elements: 1,
                has_next: false,
            })
        }
    }

    fn session() -> PlatformSession {
        PlatformSession {
            token: "t".to_string(),
            user_id: Uuid::from_u128(42),
            email: "operator@plant.example".to_string(),
            authority: Authority::CustomerUser,
            tenant_id: None,
            customer_id: None,
            expires_at: Utc::now(),
        }
    }

    fn telemetry(device_id: EntityUuid, key: &str, thresholds: Option<Thresholds>) -> Parameter {
        Parameter::Telemetry(TelemetryBinding {
            device_id,
            key: key.to_string(),
            label: None,
            unit: None,
            thresholds,
        })
    }

    fn widget(widget_type: WidgetType, parameters: Vec<Parameter>) -> Widget {
        Widget {
            id: Uuid::new_v4(),
            name: "Plant".to_string(),
            widget_type,
            unit: Some("mg/L".to_string()),
            parameters,
        }
    }

    #[tokio::test]
    async fn card_shows_latest_value_with_threshold_status() {
        let dev = Uuid::new_v4();
        let reader = FakeReader::default().with(
            dev,
            "chlorine",
            &[(100, json!("0.4")), (200, json!("0.1"))],
        );
        let thresholds = Thresholds {
            min: Some(0.2),
            max: Some(4.0),
        };
        let w = widget(WidgetType::Card, vec![telemetry(dev, "chlorine", Some(thresholds))]);

        let data = fetch_widget_data(&reader, &session(), &w, TimeRange::between(0, 10))
            .await
            .unwrap();

        let WidgetContent::Values { values } = data.content else {
            panic!("expected values content");
        };
        assert_eq!(values[0].ts, Some(200));
        assert_eq!(values[0].value, Some(0.1));
        assert_eq!(values[0].status, Some(ThresholdStatus::Low));
        assert_eq!(values[0].unit.as_deref(), Some("mg/L"));
        // Cards always read latest values, whatever range was asked for.
        assert!(reader.ranges.lock().unwrap().iter().all(TimeRange::is_latest));
    }

    #[tokio::test]
    async fn failed_device_yields_empty_values_only_for_that_device() {
        let (ok, broken) = (Uuid::new_v4(), Uuid::new_v4());
        let mut reader = FakeReader::default().with(ok, "flow", &[(1, json!(12.5))]);
        reader.failing.push(broken);

        let w = widget(
            WidgetType::Pie,
            vec![telemetry(ok, "flow", None), telemetry(broken, "flow", None)],
        );
        let data = fetch_widget_data(&reader, &session(), &w, TimeRange::latest())
            .await
            .unwrap();

        let WidgetContent::Values { values } = data.content else {
            panic!("expected values content");
        };
        assert_eq!(values[0].value, Some(12.5));
        assert_eq!(values[1].value, None);
        assert_eq!(values[1].ts, None);
    }

    #[tokio::test]
    async fn expired_session_aborts_the_fetch() {
        let reader = FakeReader {
            expired: true,
            ..FakeReader::default()
        };
        let w = widget(WidgetType::Line, vec![telemetry(Uuid::new_v4(), "level", None)]);
        let result = fetch_widget_data(&reader, &session(), &w, TimeRange::latest()).await;
        assert_matches!(result, Err(PlatformError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn line_series_use_requested_range_sorted_by_time() {
        let dev = Uuid::new_v4();
        let reader = FakeReader::default().with(
            dev,
            "level",
            &[(300, json!("2.1")), (100, json!("1.9")), (200, json!("2.0"))],
        );
        let w = widget(WidgetType::Line, vec![telemetry(dev, "level", None)]);
        let range = TimeRange::between(0, 1_000);

        let data = fetch_widget_data(&reader, &session(), &w, range).await.unwrap();
        let WidgetContent::Series { series } = data.content else {
            panic!("expected series content");
        };
        let ts: Vec<i64> = series[0].points.as_ref().unwrap().iter().map(|p| p.ts).collect();
        assert_eq!(ts, vec![100, 200, 300]);
        assert_eq!(reader.ranges.lock().unwrap().as_slice(), &[range]);
    }

    #[tokio::test]
    async fn map_and_table_read_latest_values() {
        let dev = Uuid::new_v4();
        let reader = FakeReader::default()
            .with(dev, "lat", &[(1, json!("51.5"))])
            .with(dev, "lon", &[(1, json!("-0.12"))])
            .with(dev, "ph", &[(1, json!("7.2"))]);

        let map = widget(
            WidgetType::Map,
            vec![Parameter::Location(LocationBinding {
                device_id: dev,
                lat_key: "lat".to_string(),
                lon_key: "lon".to_string(),
                label: Some("Intake".to_string()),
            })],
        );
        let data = fetch_widget_data(&reader, &session(), &map, TimeRange::latest())
            .await
            .unwrap();
        assert_matches!(
            data.content,
            WidgetContent::Locations { ref locations } if locations[0].lat == Some(51.5) && locations[0].lon == Some(-0.12)
        );

        let table = widget(
            WidgetType::Table,
            vec![Parameter::Table(TableBinding {
                device_id: dev,
                name: "Intake".to_string(),
                keys: vec!["ph".to_string(), "orp".to_string()],
            })],
        );
        let data = fetch_widget_data(&reader, &session(), &table, TimeRange::latest())
            .await
            .unwrap();
        let WidgetContent::Table { rows } = data.content else {
            panic!("expected table content");
        };
        assert_eq!(rows[0].values.get("ph"), Some(&Some(json!("7.2"))));
        assert_eq!(rows[0].values.get("orp"), Some(&None));
    }

    #[tokio::test]
    async fn image_needs_no_platform_call() {
        let reader = FakeReader {
            expired: true,
            ..FakeReader::default()
        };
        let w = widget(
            WidgetType::Image,
            vec![Parameter::Image(ImageBinding {
                image_id: "schematic".to_string(),
                link: "https://example.org/plant.png".to_string(),
            })],
        );
        let data = fetch_widget_data(&reader, &session(), &w, TimeRange::latest())
            .await
            .unwrap();
        assert_matches!(data.content, WidgetContent::Image { ref link, .. } if link.ends_with("plant.png"));
    }

    #[tokio::test]
    async fn alarms_are_listed_per_device() {
        let (ok, broken) = (Uuid::new_v4(), Uuid::new_v4());
        let reader = FakeReader {
            failing: vec![broken],
            ..FakeReader::default()
        };
        let w = widget(
            WidgetType::Alarms,
            vec![
                Parameter::Alarm(AlarmBinding {
                    device_id: ok,
                    label: None,
                }),
                Parameter::Alarm(AlarmBinding {
                    device_id: broken,
                    label: None,
                }),
            ],
        );
        let data = fetch_widget_data(&reader, &session(), &w, TimeRange::latest())
            .await
            .unwrap();
        let WidgetContent::Alarms { devices } = data.content else {
            panic!("expected alarms content");
        };
        assert_eq!(devices[0].alarms.as_ref().map(Vec::len), Some(1));
        assert_eq!(devices[1].alarms, None);
    }

    #[tokio::test]
    async fn invalid_range_is_rejected_before_any_read() {
        let reader = FakeReader::default();
        let w = widget(WidgetType::Line, vec![telemetry(Uuid::new_v4(), "level", None)]);
        let result = fetch_widget_data(&reader, &session(), &w, TimeRange::between(10, 1)).await;
        assert_matches!(result, Err(PlatformError::Core(_)));
        assert!(reader.ranges.lock().unwrap().is_empty());
    }
}
