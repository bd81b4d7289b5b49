//! Per-record normalization and filtering: timestamp localization, device
//! classification and inclusive date-range bounding.

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

use crate::error::{EtlError, EtlResult};
use crate::healthdata::{HK_DATE_FORMAT, HK_DATETIME_FORMAT};

static IPHONE_DEVICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r".+HKDevice:.+, name:iPhone,").expect("iPhone device pattern is valid")
});

/// Parse an export timestamp string (`YYYY-MM-DD HH:MM:SS ±HHMM`).
pub fn parse_export_datetime(value: &str) -> EtlResult<DateTime<FixedOffset>> {
    DateTime::parse_from_str(value, HK_DATETIME_FORMAT).map_err(|_| EtlError::Parse {
        field: "datetime",
        value: value.to_string(),
    })
}

/// Re-render an export timestamp in the runtime's local timezone, same
/// format. Callers localize each timestamp exactly once, at parse time; the
/// result is never fed back through this function.
pub fn localize_datetime_str(value: &str) -> EtlResult<String> {
    let parsed = parse_export_datetime(value)?;
    Ok(parsed
        .with_timezone(&Local)
        .format(HK_DATETIME_FORMAT)
        .to_string())
}

/// Whether the device string identifies an iPhone.
pub fn is_device_iphone(device: &str) -> bool {
    IPHONE_DEVICE_RE.is_match(device)
}

/// Anything that is not an iPhone counts as watch data. A watch can relay
/// data from exercise equipment, and third-party non-phone sources (e.g.
/// connected scales) land in this bucket too.
pub fn is_device_watch(device: &str) -> bool {
    !is_device_iphone(device)
}

/// Inclusive date range evaluated in the runtime's local timezone.
///
/// Bounds are bare calendar dates; the end bound is extended to 23:59:59 of
/// its day. `None` means "all time" on that side.
#[derive(Debug, Clone)]
pub struct DateRange {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl DateRange {
    pub fn new(start_date: Option<&str>, end_date: Option<&str>) -> EtlResult<Self> {
        let start = match start_date {
            Some(s) => parse_bound_date("startDate", s)?.and_time(NaiveTime::MIN),
            None => NaiveDateTime::default(),
        };
        let end = match end_date {
            Some(s) => parse_bound_date("endDate", s)?
                .and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)),
            None => Local::now().naive_local(),
        };

        if start > end {
            return Err(EtlError::Range(format!(
                "start_date {start} is later than end_date {end}"
            )));
        }

        Ok(DateRange { start, end })
    }

    pub fn all_time() -> Self {
        DateRange {
            start: NaiveDateTime::default(),
            end: Local::now().naive_local(),
        }
    }

    /// Test an already-localized timestamp string against the bounds.
    pub fn contains_str(&self, localized: &str) -> EtlResult<bool> {
        Ok(self.contains(&parse_export_datetime(localized)?))
    }

    /// Test a bare `YYYY-MM-DD` day (e.g. an activity summary's
    /// `dateComponents`) against the bounds.
    pub fn contains_day_str(&self, date: &str) -> EtlResult<bool> {
        let day = parse_bound_date("dateComponents", date)?;
        Ok(self.start.date() <= day && day <= self.end.date())
    }

    pub fn contains(&self, dt: &DateTime<FixedOffset>) -> bool {
        let local = dt.with_timezone(&Local).naive_local();
        self.start <= local && local <= self.end
    }
}

impl Default for DateRange {
    fn default() -> Self {
        DateRange::all_time()
    }
}

fn parse_bound_date(field: &'static str, value: &str) -> EtlResult<NaiveDate> {
    NaiveDate::parse_from_str(value, HK_DATE_FORMAT).map_err(|_| EtlError::Parse {
        field,
        value: value.to_string(),
    })
}

/// Caller-selected knobs applied to every extraction run.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    pub date_range: Option<DateRange>,
    pub watch_only: bool,
    pub sort_by_start: bool,
}
