//! Typed projections of raw export elements.
//!
//! The reader produces [`RawElement`] attribute maps; this module parses
//! them into the three record shapes the pipeline works with: [`Sample`],
//! [`Workout`] and [`DailySummary`]. Dispatch is a closed match over
//! [`ElementKind`] rather than a registry, since the set of element kinds
//! in an export is fixed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{EtlError, EtlResult};
use crate::healthdata as hd;
use crate::pipeline::{localize_datetime_str, parse_export_datetime};

/// Tag of a direct child of the `HealthData` root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    ExportDate,
    Me,
    Record,
    Correlation,
    ClinicalRecord,
    ActivitySummary,
    Workout,
}

impl ElementKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            hd::EXPORT_DATE => Some(ElementKind::ExportDate),
            hd::ME => Some(ElementKind::Me),
            hd::RECORD => Some(ElementKind::Record),
            hd::CORRELATION => Some(ElementKind::Correlation),
            hd::CLINICAL_RECORD => Some(ElementKind::ClinicalRecord),
            hd::ACTIVITY_SUMMARY => Some(ElementKind::ActivitySummary),
            hd::WORKOUT => Some(ElementKind::Workout),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            ElementKind::ExportDate => hd::EXPORT_DATE,
            ElementKind::Me => hd::ME,
            ElementKind::Record => hd::RECORD,
            ElementKind::Correlation => hd::CORRELATION,
            ElementKind::ClinicalRecord => hd::CLINICAL_RECORD,
            ElementKind::ActivitySummary => hd::ACTIVITY_SUMMARY,
            ElementKind::Workout => hd::WORKOUT,
        }
    }
}

/// One top-level export element: its kind, its attributes, and (for
/// workouts) the key/value pairs of nested `MetadataEntry` children.
#[derive(Debug, Clone)]
pub struct RawElement {
    pub kind: ElementKind,
    pub attrs: HashMap<String, String>,
    pub metadata: Vec<(String, String)>,
}

impl RawElement {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    fn require(&self, key: &'static str) -> EtlResult<&str> {
        self.get(key).ok_or(EtlError::MissingField(key))
    }

    fn get_or_empty(&self, key: &str) -> String {
        self.get(key).unwrap_or_default().to_string()
    }

    fn opt_f64(&self, key: &'static str) -> EtlResult<f64> {
        match self.get(key) {
            None => Ok(0.0),
            Some("") => Ok(0.0),
            Some(v) => v.parse().map_err(|_| EtlError::Parse {
                field: key,
                value: v.to_string(),
            }),
        }
    }

    fn opt_u32(&self, key: &'static str) -> EtlResult<u32> {
        match self.get(key) {
            None => Ok(0),
            Some("") => Ok(0),
            Some(v) => v.parse().map_err(|_| EtlError::Parse {
                field: key,
                value: v.to_string(),
            }),
        }
    }

    fn metadata_value(&self, key: &str) -> String {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    }
}

/// A single timestamped measurement of one declared type and unit.
///
/// Timestamps are localized to the runtime timezone exactly once, here at
/// construction; the strings stored in the record are never re-localized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    #[serde(rename = "type")]
    pub record_type: String,
    pub unit: String,
    pub value: f64,
    pub source_name: String,
    pub source_version: String,
    pub device: String,
    pub creation_date: String,
    pub start_date: String,
    pub end_date: String,
}

impl Sample {
    pub fn parse(raw: &RawElement) -> EtlResult<Self> {
        let record_type = raw.require(hd::FIELD_TYPE)?.to_string();
        if !hd::is_supported_type(&record_type) {
            return Err(EtlError::UnsupportedType(record_type));
        }

        let source_name = raw.require(hd::FIELD_SOURCE_NAME)?.to_string();
        let start_raw = raw.require(hd::FIELD_START_DATE)?;
        let end_raw = raw.require(hd::FIELD_END_DATE)?;
        check_date_order(start_raw, end_raw)?;

        let value = if hd::is_quantity_type(&record_type) {
            let v = raw.require(hd::FIELD_VALUE)?;
            v.parse().map_err(|_| EtlError::Parse {
                field: hd::FIELD_VALUE,
                value: v.to_string(),
            })?
        } else {
            // Category samples carry an enum-like string; tallied as zero.
            raw.get(hd::FIELD_VALUE)
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.0)
        };

        Ok(Sample {
            record_type,
            unit: raw.get_or_empty(hd::FIELD_UNIT),
            value,
            source_name,
            source_version: raw.get_or_empty(hd::FIELD_SOURCE_VERSION),
            device: raw.get_or_empty(hd::FIELD_DEVICE),
            creation_date: localize_optional(raw.get(hd::FIELD_CREATION_DATE))?,
            start_date: localize_datetime_str(start_raw)?,
            end_date: localize_datetime_str(end_raw)?,
        })
    }
}

/// One exercise session with its duration/distance/energy totals and the
/// whitelisted metadata columns. Absent metadata keys become empty strings
/// so the output schema is stable across rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workout {
    pub workout_activity_type: String,
    pub duration: f64,
    pub duration_unit: String,
    pub total_distance: f64,
    pub total_distance_unit: String,
    pub total_energy_burned: f64,
    pub total_energy_burned_unit: String,
    pub source_name: String,
    pub source_version: String,
    pub device: String,
    pub creation_date: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(rename = "HKIndoorWorkout")]
    pub indoor_workout: String,
    #[serde(rename = "HKAverageMETs")]
    pub average_mets: String,
    #[serde(rename = "HKWeatherTemperature")]
    pub weather_temperature: String,
    #[serde(rename = "HKWeatherHumidity")]
    pub weather_humidity: String,
    #[serde(rename = "HKTimeZone")]
    pub timezone: String,
    #[serde(rename = "HKElevationAscended")]
    pub elevation_ascended: String,
}

impl Workout {
    pub fn parse(raw: &RawElement) -> EtlResult<Self> {
        let workout_activity_type = raw.require(hd::FIELD_WORKOUT_ACTIVITY)?.to_string();
        let source_name = raw.require(hd::FIELD_SOURCE_NAME)?.to_string();
        let start_raw = raw.require(hd::FIELD_START_DATE)?;
        let end_raw = raw.require(hd::FIELD_END_DATE)?;
        check_date_order(start_raw, end_raw)?;

        Ok(Workout {
            workout_activity_type,
            duration: raw.opt_f64("duration")?,
            duration_unit: raw.get_or_empty("durationUnit"),
            total_distance: raw.opt_f64("totalDistance")?,
            total_distance_unit: raw.get_or_empty("totalDistanceUnit"),
            total_energy_burned: raw.opt_f64("totalEnergyBurned")?,
            total_energy_burned_unit: raw.get_or_empty("totalEnergyBurnedUnit"),
            source_name,
            source_version: raw.get_or_empty(hd::FIELD_SOURCE_VERSION),
            device: raw.get_or_empty(hd::FIELD_DEVICE),
            creation_date: localize_optional(raw.get(hd::FIELD_CREATION_DATE))?,
            start_date: localize_datetime_str(start_raw)?,
            end_date: localize_datetime_str(end_raw)?,
            indoor_workout: raw.metadata_value("HKIndoorWorkout"),
            average_mets: raw.metadata_value("HKAverageMETs"),
            weather_temperature: raw.metadata_value("HKWeatherTemperature"),
            weather_humidity: raw.metadata_value("HKWeatherHumidity"),
            timezone: raw.metadata_value("HKTimeZone"),
            elevation_ascended: raw.metadata_value("HKElevationAscended"),
        })
    }
}

/// One calendar day's goal/actual aggregates from an `ActivitySummary`
/// element. The date has no time component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub date_components: String,
    pub active_energy_burned: f64,
    pub active_energy_burned_goal: f64,
    pub active_energy_burned_unit: String,
    pub apple_move_minutes: f64,
    pub apple_move_minutes_goal: f64,
    pub apple_exercise_time: f64,
    pub apple_exercise_time_goal: f64,
    pub apple_stand_hours: u32,
    pub apple_stand_hours_goal: u32,
}

impl DailySummary {
    pub fn parse(raw: &RawElement) -> EtlResult<Self> {
        let date_components = raw.require(hd::FIELD_DATE_COMPONENTS)?.to_string();

        Ok(DailySummary {
            date_components,
            active_energy_burned: raw.opt_f64("activeEnergyBurned")?,
            active_energy_burned_goal: raw.opt_f64("activeEnergyBurnedGoal")?,
            active_energy_burned_unit: raw.get_or_empty("activeEnergyBurnedUnit"),
            apple_move_minutes: raw.opt_f64("appleMoveMinutes")?,
            apple_move_minutes_goal: raw.opt_f64("appleMoveMinutesGoal")?,
            apple_exercise_time: raw.opt_f64("appleExerciseTime")?,
            apple_exercise_time_goal: raw.opt_f64("appleExerciseTimeGoal")?,
            apple_stand_hours: raw.opt_u32("appleStandHours")?,
            apple_stand_hours_goal: raw.opt_u32("appleStandHoursGoal")?,
        })
    }
}

/// Closed sum type over the three parsed record shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedRecord {
    Sample(Sample),
    Workout(Workout),
    DailySummary(DailySummary),
}

impl TypedRecord {
    /// Dispatch on the element kind; kinds with no tabular projection
    /// (`ExportDate`, `Me`, `Correlation`, `ClinicalRecord`) are rejected.
    pub fn parse(raw: &RawElement) -> EtlResult<Self> {
        match raw.kind {
            ElementKind::Record => Sample::parse(raw).map(TypedRecord::Sample),
            ElementKind::Workout => Workout::parse(raw).map(TypedRecord::Workout),
            ElementKind::ActivitySummary => {
                DailySummary::parse(raw).map(TypedRecord::DailySummary)
            }
            other => Err(EtlError::UnsupportedType(other.as_tag().to_string())),
        }
    }
}

fn localize_optional(value: Option<&str>) -> EtlResult<String> {
    match value {
        None | Some("") => Ok(String::new()),
        Some(v) => localize_datetime_str(v),
    }
}

fn check_date_order(start: &str, end: &str) -> EtlResult<()> {
    let start_dt = parse_export_datetime(start)?;
    let end_dt = parse_export_datetime(end)?;
    if start_dt > end_dt {
        return Err(EtlError::Range(format!(
            "startDate {start} is later than endDate {end}"
        )));
    }
    Ok(())
}
