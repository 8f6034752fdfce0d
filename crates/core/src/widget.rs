//! Widget definitions, parameter bindings, and validation.
//!
//! A widget is a configured visual element bound to one or more telemetry
//! parameters. The parameter shape depends on the widget type, so
//! [`Parameter`] is a tagged enum rather than a uniform record. The
//! per-type parameter rules are invariants of [`Widget`] itself and are
//! checked wherever a widget is built from user input.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::layout::{validate_widget_size, WidgetSize, DEFAULT_WIDGET_HEIGHT, DEFAULT_WIDGET_WIDTH};
use crate::types::{EntityUuid, WidgetId};

/// Maximum length of a widget name, in characters.
pub const MAX_WIDGET_NAME_LEN: usize = 100;

// ---------------------------------------------------------------------------
// Widget type
// ---------------------------------------------------------------------------

/// Visual kind of a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetType {
    Bar,
    Line,
    Donut,
    Pie,
    Card,
    Map,
    Table,
    Image,
    Alarms,
}

/// How many parameters a widget type accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParameterCount {
    Exactly(usize),
    AtLeast(usize),
}

impl WidgetType {
    pub fn as_str(self) -> &'static str {
        match self {
            WidgetType::Bar => "bar",
            WidgetType::Line => "line",
            WidgetType::Donut => "donut",
            WidgetType::Pie => "pie",
            WidgetType::Card => "card",
            WidgetType::Map => "map",
            WidgetType::Table => "table",
            WidgetType::Image => "image",
            WidgetType::Alarms => "alarms",
        }
    }

    /// The only parameter kind this widget type can bind.
    pub fn parameter_kind(self) -> ParameterKind {
        match self {
            WidgetType::Bar
            | WidgetType::Line
            | WidgetType::Donut
            | WidgetType::Pie
            | WidgetType::Card => ParameterKind::Telemetry,
            WidgetType::Map => ParameterKind::Location,
            WidgetType::Table => ParameterKind::Table,
            WidgetType::Image => ParameterKind::Image,
            WidgetType::Alarms => ParameterKind::Alarm,
        }
    }

    fn parameter_count(self) -> ParameterCount {
        match self {
            WidgetType::Donut | WidgetType::Image => ParameterCount::Exactly(1),
            WidgetType::Pie => ParameterCount::AtLeast(2),
            WidgetType::Bar
            | WidgetType::Line
            | WidgetType::Card
            | WidgetType::Map
            | WidgetType::Table
            | WidgetType::Alarms => ParameterCount::AtLeast(1),
        }
    }

    /// Returns `true` if widgets of this type plot a series over a time range
    /// rather than a single latest value.
    pub fn is_time_series(self) -> bool {
        matches!(self, WidgetType::Bar | WidgetType::Line)
    }
}

impl std::fmt::Display for WidgetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Discriminant of [`Parameter`], used in validation messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    Telemetry,
    Location,
    Table,
    Image,
    Alarm,
}

impl ParameterKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ParameterKind::Telemetry => "telemetry",
            ParameterKind::Location => "location",
            ParameterKind::Table => "table",
            ParameterKind::Image => "image",
            ParameterKind::Alarm => "alarm",
        }
    }
}

/// Display bounds for a single telemetry value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// Where a value sits relative to its [`Thresholds`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdStatus {
    Normal,
    Low,
    High,
}

impl Thresholds {
    /// Classify `value`. Bounds are inclusive: a value equal to `min` or
    /// `max` is still normal.
    pub fn evaluate(&self, value: f64) -> ThresholdStatus {
        match (self.min, self.max) {
            (Some(min), _) if value < min => ThresholdStatus::Low,
            (_, Some(max)) if value > max => ThresholdStatus::High,
            _ => ThresholdStatus::Normal,
        }
    }
}

/// One device/key binding for chart and card widgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryBinding {
    pub device_id: EntityUuid,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<Thresholds>,
}

/// A device position for map widgets, read from two telemetry keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationBinding {
    pub device_id: EntityUuid,
    pub lat_key: String,
    pub lon_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// One table row: a named device and the keys shown as columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableBinding {
    pub device_id: EntityUuid,
    pub name: String,
    pub keys: Vec<String>,
}

/// A static image, e.g. a plant schematic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageBinding {
    pub image_id: String,
    pub link: String,
}

/// A device whose alarms are listed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmBinding {
    pub device_id: EntityUuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A widget parameter. The JSON form carries a `"kind"` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Parameter {
    Telemetry(TelemetryBinding),
    Location(LocationBinding),
    Table(TableBinding),
    Image(ImageBinding),
    Alarm(AlarmBinding),
}

impl Parameter {
    pub fn kind(&self) -> ParameterKind {
        match self {
            Parameter::Telemetry(_) => ParameterKind::Telemetry,
            Parameter::Location(_) => ParameterKind::Location,
            Parameter::Table(_) => ParameterKind::Table,
            Parameter::Image(_) => ParameterKind::Image,
            Parameter::Alarm(_) => ParameterKind::Alarm,
        }
    }

    /// The bound device, for every kind except images.
    pub fn device_id(&self) -> Option<EntityUuid> {
        match self {
            Parameter::Telemetry(b) => Some(b.device_id),
            Parameter::Location(b) => Some(b.device_id),
            Parameter::Table(b) => Some(b.device_id),
            Parameter::Alarm(b) => Some(b.device_id),
            Parameter::Image(_) => None,
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            Parameter::Telemetry(b) => {
                require_key(&b.key, "telemetry key")?;
                if let Some(Thresholds {
                    min: Some(min),
                    max: Some(max),
                }) = b.thresholds
                {
                    if min > max {
                        return Err(format!(
                            "threshold min ({min}) must not exceed max ({max}) for key '{}'",
                            b.key
                        ));
                    }
                }
                Ok(())
            }
            Parameter::Location(b) => {
                require_key(&b.lat_key, "latitude key")?;
                require_key(&b.lon_key, "longitude key")
            }
            Parameter::Table(b) => {
                require_key(&b.name, "table row name")?;
                if b.keys.is_empty() {
                    return Err(format!("table row '{}' must list at least one key", b.name));
                }
                b.keys.iter().try_for_each(|k| require_key(k, "table key"))
            }
            Parameter::Image(b) => require_key(&b.link, "image link"),
            Parameter::Alarm(_) => Ok(()),
        }
    }
}

fn require_key(value: &str, what: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{what} must not be empty"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Widget
// ---------------------------------------------------------------------------

/// A configured dashboard widget. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub id: WidgetId,
    pub name: String,
    #[serde(rename = "type")]
    pub widget_type: WidgetType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

impl Widget {
    /// Check the name and the per-type parameter rules.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_widget_name(&self.name)?;
        validate_parameters(self.widget_type, &self.parameters)
            .map_err(|msg| CoreError::Validation(format!("widget '{}': {msg}", self.name)))
    }
}

/// Validate a widget name: non-blank and at most [`MAX_WIDGET_NAME_LEN`] characters.
pub fn validate_widget_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation(
            "widget name must not be empty".to_string(),
        ));
    }
    let len = name.chars().count();
    if len > MAX_WIDGET_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "widget name must be at most {MAX_WIDGET_NAME_LEN} characters, got {len}"
        )));
    }
    Ok(())
}

fn validate_parameters(widget_type: WidgetType, parameters: &[Parameter]) -> Result<(), String> {
    let expected = widget_type.parameter_kind();
    if let Some(wrong) = parameters.iter().find(|p| p.kind() != expected) {
        return Err(format!(
            "{widget_type} widgets take {} parameters, got a {} parameter",
            expected.as_str(),
            wrong.kind().as_str()
        ));
    }

    let count = parameters.len();
    match widget_type.parameter_count() {
        ParameterCount::Exactly(n) if count != n => {
            return Err(format!(
                "{widget_type} widgets require exactly {n} parameter(s), got {count}"
            ));
        }
        ParameterCount::AtLeast(n) if count < n => {
            return Err(format!(
                "{widget_type} widgets require at least {n} parameter(s), got {count}"
            ));
        }
        _ => {}
    }

    parameters.iter().try_for_each(Parameter::validate)
}

// ---------------------------------------------------------------------------
// Drafts
// ---------------------------------------------------------------------------

/// A widget as submitted from the configuration form.
///
/// `id` is absent for widgets added in this edit session; `w`/`h` are the
/// requested size for auto-placement and default to
/// [`DEFAULT_WIDGET_WIDTH`] × [`DEFAULT_WIDGET_HEIGHT`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<WidgetId>,
    pub name: String,
    #[serde(rename = "type")]
    pub widget_type: WidgetType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h: Option<u32>,
}

impl WidgetDraft {
    /// Requested size with defaults applied.
    pub fn size(&self) -> WidgetSize {
        WidgetSize::new(
            self.w.unwrap_or(DEFAULT_WIDGET_WIDTH),
            self.h.unwrap_or(DEFAULT_WIDGET_HEIGHT),
        )
    }

    /// Build a draft that reproduces an existing widget, e.g. when an edit
    /// session starts.
    pub fn from_widget(widget: &Widget, size: Option<WidgetSize>) -> Self {
        Self {
            id: Some(widget.id),
            name: widget.name.clone(),
            widget_type: widget.widget_type,
            unit: widget.unit.clone(),
            parameters: widget.parameters.clone(),
            w: size.map(|s| s.w),
            h: size.map(|s| s.h),
        }
    }
}

/// A draft that passed validation, with its id resolved and size defaulted.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidDraft {
    pub widget: Widget,
    pub size: WidgetSize,
}

impl ValidDraft {
    pub fn id(&self) -> WidgetId {
        self.widget.id
    }
}

/// Validate one draft and resolve it into a [`ValidDraft`].
///
/// A draft without an id is assigned a fresh v4 id here, so placement
/// itself stays deterministic.
pub fn validate_draft(draft: WidgetDraft) -> Result<ValidDraft, CoreError> {
    let size = draft.size();
    validate_widget_size(size)
        .map_err(|e| prefix_validation(e, &draft.name))?;

    let widget = Widget {
        id: draft.id.unwrap_or_else(Uuid::new_v4),
        name: draft.name,
        widget_type: draft.widget_type,
        unit: draft.unit,
        parameters: draft.parameters,
    };
    widget.validate()?;

    Ok(ValidDraft { widget, size })
}

/// Validate a whole draft list. Fails on the first invalid draft or on a
/// repeated widget id.
pub fn validate_drafts(drafts: Vec<WidgetDraft>) -> Result<Vec<ValidDraft>, CoreError> {
    let mut seen = HashSet::with_capacity(drafts.len());
    let mut valid = Vec::with_capacity(drafts.len());

    for draft in drafts {
        let draft = validate_draft(draft)?;
        if !seen.insert(draft.id()) {
            return Err(CoreError::Validation(format!(
                "widget id {} appears more than once",
                draft.id()
            )));
        }
        valid.push(draft);
    }

    Ok(valid)
}

fn prefix_validation(err: CoreError, name: &str) -> CoreError {
    match err {
        CoreError::Validation(msg) => CoreError::Validation(format!("widget '{name}': {msg}")),
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
