//! Batch drivers: extraction jobs from the export document and derived
//! tables computed from previously extracted CSVs.
//!
//! Extraction skips individual malformed records (logged, counted) and
//! keeps going; everything downstream of a finished extraction is strict,
//! so a derived table is either complete or not written at all.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::aggregate::DailyAggregator;
use crate::error::EtlResult;
use crate::grouping;
use crate::healthdata as hd;
use crate::model::{DailySummary, ElementKind, RawElement, Sample, Workout};
use crate::pipeline::{self, ExtractOptions};
use crate::stream::{ElementStream, SampleTypeStream};
use crate::tables::{
    self, DailyTotalRow, DailyWorkoutTotalRow, IntervalMapRow, MonthlyTotalRow,
};

/// Outcome counters of one extraction run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractStats {
    /// Rows written to the destination table.
    pub written: usize,
    /// Malformed records logged and dropped. Records excluded by a filter
    /// are not counted here.
    pub skipped: usize,
}

/// Which figure a derived table reports per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateView {
    Sums,
    Averages,
}

/// The natural view for a sample type: point-in-time measurements
/// average, cumulative quantities sum.
pub fn view_for_type(record_type: &str) -> AggregateView {
    if hd::is_averaged_type(record_type) {
        AggregateView::Averages
    } else {
        AggregateView::Sums
    }
}

/// Extract all samples of one type into a flat CSV table.
pub fn extract_samples(
    export: &Path,
    dest: &Path,
    sample_type: &str,
    opts: &ExtractOptions,
) -> EtlResult<ExtractStats> {
    let stream = SampleTypeStream::open(export, sample_type)?;
    let (mut rows, skipped) = collect_rows(stream, Sample::parse, |s: &Sample| {
        if opts.watch_only && !pipeline::is_device_watch(&s.device) {
            return Ok(false);
        }
        match &opts.date_range {
            Some(range) => range.contains_str(&s.start_date),
            None => Ok(true),
        }
    })?;

    if opts.sort_by_start {
        rows.sort_by(|a, b| a.start_date.cmp(&b.start_date));
    }
    let written = tables::write_rows(dest, rows)?;
    tracing::info!(sample_type, written, skipped, "sample extraction finished");
    Ok(ExtractStats { written, skipped })
}

/// Extract all workouts, with their whitelisted metadata columns.
pub fn extract_workouts(
    export: &Path,
    dest: &Path,
    opts: &ExtractOptions,
) -> EtlResult<ExtractStats> {
    let stream = ElementStream::open(export, ElementKind::Workout)?;
    let (mut rows, skipped) = collect_rows(stream, Workout::parse, |w: &Workout| {
        if opts.watch_only && !pipeline::is_device_watch(&w.device) {
            return Ok(false);
        }
        match &opts.date_range {
            Some(range) => range.contains_str(&w.start_date),
            None => Ok(true),
        }
    })?;

    if opts.sort_by_start {
        rows.sort_by(|a, b| a.start_date.cmp(&b.start_date));
    }
    let written = tables::write_rows(dest, rows)?;
    tracing::info!(written, skipped, "workout extraction finished");
    Ok(ExtractStats { written, skipped })
}

/// Extract all activity summaries. Summaries carry no device attribute, so
/// the watch filter does not apply to them.
pub fn extract_activity_summaries(
    export: &Path,
    dest: &Path,
    opts: &ExtractOptions,
) -> EtlResult<ExtractStats> {
    let stream = ElementStream::open(export, ElementKind::ActivitySummary)?;
    let (mut rows, skipped) = collect_rows(stream, DailySummary::parse, |s: &DailySummary| {
        match &opts.date_range {
            Some(range) => range.contains_day_str(&s.date_components),
            None => Ok(true),
        }
    })?;

    if opts.sort_by_start {
        rows.sort_by(|a, b| a.date_components.cmp(&b.date_components));
    }
    let written = tables::write_rows(dest, rows)?;
    tracing::info!(written, skipped, "activity summary extraction finished");
    Ok(ExtractStats { written, skipped })
}

/// Daily totals of one sample table. iPhone-sourced rows are excluded so
/// phone and watch never double-count the same movement; the unit column
/// propagates from the first kept row.
pub fn daily_totals(src: &Path, dest: &Path, view: AggregateView) -> EtlResult<usize> {
    let mut agg = DailyAggregator::new();
    let mut unit = String::new();

    for row in tables::row_iter::<Sample>(src)? {
        let row = row?;
        if pipeline::is_device_iphone(&row.device) {
            continue;
        }
        if unit.is_empty() {
            unit = row.unit.clone();
        }
        agg.add(&row.start_date, row.value);
    }

    let totals = match view {
        AggregateView::Sums => agg.sums(),
        AggregateView::Averages => agg.averages(),
    };
    let rows = totals.into_iter().map(|(date, value)| DailyTotalRow {
        date,
        value,
        unit: unit.clone(),
    });
    tables::write_rows(dest, rows)
}

/// One combined monthly table over several per-type sample tables. Each
/// type contributes its natural view (see [`view_for_type`]) plus a count
/// of the distinct days that produced data in the month.
pub fn monthly_totals(sources: &[(String, PathBuf)], dest: &Path) -> EtlResult<usize> {
    let mut out = Vec::new();

    for (record_type, path) in sources {
        let mut monthly = DailyAggregator::monthly();
        let mut daily = DailyAggregator::new();
        let mut unit = String::new();

        for row in tables::row_iter::<Sample>(path)? {
            let row = row?;
            if pipeline::is_device_iphone(&row.device) {
                continue;
            }
            if unit.is_empty() {
                unit = row.unit.clone();
            }
            monthly.add(&row.start_date, row.value);
            daily.add(&row.start_date, row.value);
        }

        let mut days_per_month: BTreeMap<String, u32> = BTreeMap::new();
        for day in daily.sums().keys() {
            let month = day.get(..7).unwrap_or(day).to_string();
            *days_per_month.entry(month).or_insert(0) += 1;
        }

        let values = match view_for_type(record_type) {
            AggregateView::Sums => monthly.sums(),
            AggregateView::Averages => monthly.averages(),
        };
        for (month, value) in values {
            let days = days_per_month.get(&month).copied().unwrap_or(0);
            out.push(MonthlyTotalRow {
                record_type: record_type.clone(),
                date: month,
                value,
                unit: unit.clone(),
                days,
            });
        }
    }

    tables::write_rows(dest, out)
}

/// Per-day totals of workout duration, distance and energy across all
/// sessions of the day. Units propagate from the first row.
pub fn daily_workout_totals(src: &Path, dest: &Path) -> EtlResult<usize> {
    let mut duration = DailyAggregator::new();
    let mut distance = DailyAggregator::new();
    let mut energy = DailyAggregator::new();
    let mut units: Option<(String, String, String)> = None;

    for row in tables::row_iter::<Workout>(src)? {
        let row = row?;
        if units.is_none() {
            units = Some((
                row.duration_unit.clone(),
                row.total_distance_unit.clone(),
                row.total_energy_burned_unit.clone(),
            ));
        }
        duration.add(&row.start_date, row.duration);
        distance.add(&row.start_date, row.total_distance);
        energy.add(&row.start_date, row.total_energy_burned);
    }

    let (duration_unit, distance_unit, energy_unit) = units.unwrap_or_default();
    let distance_sums = distance.sums();
    let energy_sums = energy.sums();
    let rows: Vec<DailyWorkoutTotalRow> = duration
        .sums()
        .into_iter()
        .map(|(date, total_duration)| DailyWorkoutTotalRow {
            duration: total_duration,
            duration_unit: duration_unit.clone(),
            total_distance: distance_sums.get(&date).copied().unwrap_or(0.0),
            total_distance_unit: distance_unit.clone(),
            total_energy_burned: energy_sums.get(&date).copied().unwrap_or(0.0),
            total_energy_burned_unit: energy_unit.clone(),
            date,
        })
        .collect();
    tables::write_rows(dest, rows)
}

/// Map each activity-summary day onto the weigh-in interval it falls in.
///
/// Weigh-in days (from an extracted body-mass table, which must be sorted
/// by start date) anchor month-to-month intervals, including the trailing
/// partial month; activity days outside every interval are dropped.
pub fn weighin_interval_map(
    weights_src: &Path,
    activity_src: &Path,
    dest: &Path,
) -> EtlResult<usize> {
    let mut weigh_days = Vec::new();
    for row in tables::row_iter::<Sample>(weights_src)? {
        let row = row?;
        weigh_days.push(day_key(&row.start_date).to_string());
    }
    weigh_days.dedup();
    let intervals = grouping::month_anchored_intervals(&weigh_days, true)?;

    let mut activity_days = Vec::new();
    for row in tables::row_iter::<DailySummary>(activity_src)? {
        let row = row?;
        activity_days.push(row.date_components);
    }

    let pairs = grouping::merge_elements_to_intervals(&activity_days, &intervals)?;
    let rows = pairs.into_iter().map(|(date, interval)| IntervalMapRow {
        date,
        interval_start: interval.lower_end().clone(),
        interval_end: interval.upper_end().clone(),
    });
    tables::write_rows(dest, rows)
}

fn day_key(date: &str) -> &str {
    let end = date.len().min(10);
    date.get(..end).unwrap_or(date)
}

fn collect_rows<T>(
    elements: impl Iterator<Item = EtlResult<RawElement>>,
    parse: impl Fn(&RawElement) -> EtlResult<T>,
    keep: impl Fn(&T) -> EtlResult<bool>,
) -> EtlResult<(Vec<T>, usize)> {
    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for element in elements {
        let raw = element?;
        match parse(&raw) {
            Ok(row) => {
                if keep(&row)? {
                    rows.push(row);
                }
            }
            Err(err) if err.is_record_level() => {
                skipped += 1;
                tracing::warn!(error = %err, "skipping malformed record");
            }
            Err(err) => return Err(err),
        }
    }

    Ok((rows, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;

    const WATCH_DEVICE: &str = "<<HKDevice: 0x1>, name:Apple Watch, manufacturer:Apple Inc.>";
    const PHONE_DEVICE: &str = "<<HKDevice: 0x1>, name:iPhone, manufacturer:Apple Inc.>";

    fn sample(record_type: &str, start: &str, value: f64, unit: &str, device: &str) -> Sample {
        Sample {
            record_type: record_type.to_string(),
            unit: unit.to_string(),
            value,
            source_name: "Watch".to_string(),
            source_version: "7.0".to_string(),
            device: device.to_string(),
            creation_date: start.to_string(),
            start_date: start.to_string(),
            end_date: start.to_string(),
        }
    }

    fn write_samples(path: &Path, rows: Vec<Sample>) {
        tables::write_rows(path, rows).expect("write samples");
    }

    #[test]
    fn daily_totals_sum_per_day_and_exclude_phone_rows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("steps.csv");
        let dest = dir.path().join("daily.csv");
        write_samples(
            &src,
            vec![
                sample(
                    hd::HK_REC_TYPE_STEP_COUNT,
                    "2020-01-05 08:00:00 +0100",
                    100.0,
                    "count",
                    WATCH_DEVICE,
                ),
                sample(
                    hd::HK_REC_TYPE_STEP_COUNT,
                    "2020-01-05 12:00:00 +0100",
                    200.0,
                    "count",
                    WATCH_DEVICE,
                ),
                sample(
                    hd::HK_REC_TYPE_STEP_COUNT,
                    "2020-01-05 12:00:00 +0100",
                    300.0,
                    "count",
                    PHONE_DEVICE,
                ),
            ],
        );

        let written = daily_totals(&src, &dest, AggregateView::Sums).expect("daily totals");
        assert_eq!(written, 1);

        let rows: Vec<DailyTotalRow> = tables::row_iter(&dest)
            .expect("open")
            .collect::<EtlResult<_>>()
            .expect("rows");
        assert_eq!(rows[0].date, "2020-01-05");
        assert_eq!(rows[0].value, 300.0);
        assert_eq!(rows[0].unit, "count");
    }

    #[test]
    fn daily_totals_averages_when_asked() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("hr.csv");
        let dest = dir.path().join("daily.csv");
        write_samples(
            &src,
            vec![
                sample(
                    hd::HK_REC_TYPE_HEART_RATE,
                    "2020-01-05 08:00:00 +0100",
                    60.0,
                    "count/min",
                    WATCH_DEVICE,
                ),
                sample(
                    hd::HK_REC_TYPE_HEART_RATE,
                    "2020-01-05 09:00:00 +0100",
                    80.0,
                    "count/min",
                    WATCH_DEVICE,
                ),
            ],
        );

        daily_totals(&src, &dest, AggregateView::Averages).expect("daily averages");
        let rows: Vec<DailyTotalRow> = tables::row_iter(&dest)
            .expect("open")
            .collect::<EtlResult<_>>()
            .expect("rows");
        assert_eq!(rows[0].value, 70.0);
    }

    #[test]
    fn view_for_type_splits_measurements_from_counts() {
        assert_eq!(
            view_for_type(hd::HK_REC_TYPE_HEART_RATE),
            AggregateView::Averages
        );
        assert_eq!(
            view_for_type(hd::HK_REC_TYPE_BODY_MASS),
            AggregateView::Averages
        );
        assert_eq!(
            view_for_type(hd::HK_REC_TYPE_STEP_COUNT),
            AggregateView::Sums
        );
    }

    #[test]
    fn monthly_totals_combine_types_with_day_counts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let steps = dir.path().join("steps.csv");
        let hr = dir.path().join("hr.csv");
        let dest = dir.path().join("monthly.csv");
        write_samples(
            &steps,
            vec![
                sample(
                    hd::HK_REC_TYPE_STEP_COUNT,
                    "2020-01-05 08:00:00 +0100",
                    100.0,
                    "count",
                    WATCH_DEVICE,
                ),
                sample(
                    hd::HK_REC_TYPE_STEP_COUNT,
                    "2020-01-06 08:00:00 +0100",
                    50.0,
                    "count",
                    WATCH_DEVICE,
                ),
            ],
        );
        write_samples(
            &hr,
            vec![
                sample(
                    hd::HK_REC_TYPE_HEART_RATE,
                    "2020-01-05 08:00:00 +0100",
                    60.0,
                    "count/min",
                    WATCH_DEVICE,
                ),
                sample(
                    hd::HK_REC_TYPE_HEART_RATE,
                    "2020-01-05 09:00:00 +0100",
                    80.0,
                    "count/min",
                    WATCH_DEVICE,
                ),
            ],
        );

        let sources = vec![
            (hd::HK_REC_TYPE_STEP_COUNT.to_string(), steps),
            (hd::HK_REC_TYPE_HEART_RATE.to_string(), hr),
        ];
        monthly_totals(&sources, &dest).expect("monthly totals");

        let rows: Vec<MonthlyTotalRow> = tables::row_iter(&dest)
            .expect("open")
            .collect::<EtlResult<_>>()
            .expect("rows");
        assert_eq!(rows.len(), 2);

        let steps_row = &rows[0];
        assert_eq!(steps_row.record_type, hd::HK_REC_TYPE_STEP_COUNT);
        assert_eq!(steps_row.date, "2020-01");
        assert_eq!(steps_row.value, 150.0);
        assert_eq!(steps_row.days, 2);

        let hr_row = &rows[1];
        assert_eq!(hr_row.value, 70.0);
        assert_eq!(hr_row.days, 1);
    }

    #[test]
    fn daily_workout_totals_sum_all_three_attributes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("workouts.csv");
        let dest = dir.path().join("daily_workouts.csv");

        let workout = |start: &str, duration: f64, distance: f64, energy: f64| Workout {
            workout_activity_type: hd::WORKOUT_RUN.to_string(),
            duration,
            duration_unit: "min".to_string(),
            total_distance: distance,
            total_distance_unit: "km".to_string(),
            total_energy_burned: energy,
            total_energy_burned_unit: "Cal".to_string(),
            source_name: "Watch".to_string(),
            source_version: "7.0".to_string(),
            device: WATCH_DEVICE.to_string(),
            creation_date: start.to_string(),
            start_date: start.to_string(),
            end_date: start.to_string(),
            indoor_workout: String::new(),
            average_mets: String::new(),
            weather_temperature: String::new(),
            weather_humidity: String::new(),
            timezone: String::new(),
            elevation_ascended: String::new(),
        };
        tables::write_rows(
            &src,
            vec![
                workout("2020-01-05 08:00:00 +0100", 30.0, 5.0, 300.0),
                workout("2020-01-05 18:00:00 +0100", 20.0, 3.0, 200.0),
                workout("2020-01-07 08:00:00 +0100", 45.0, 8.0, 450.0),
            ],
        )
        .expect("write workouts");

        daily_workout_totals(&src, &dest).expect("daily workout totals");
        let rows: Vec<DailyWorkoutTotalRow> = tables::row_iter(&dest)
            .expect("open")
            .collect::<EtlResult<_>>()
            .expect("rows");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, "2020-01-05");
        assert_eq!(rows[0].duration, 50.0);
        assert_eq!(rows[0].total_distance, 8.0);
        assert_eq!(rows[0].total_energy_burned, 500.0);
        assert_eq!(rows[0].duration_unit, "min");
        assert_eq!(rows[1].date, "2020-01-07");
    }

    #[test]
    fn weighin_interval_map_assigns_activity_days() {
        let dir = tempfile::tempdir().expect("tempdir");
        let weights = dir.path().join("weights.csv");
        let activity = dir.path().join("activity.csv");
        let dest = dir.path().join("interval_map.csv");

        write_samples(
            &weights,
            vec![
                sample(
                    hd::HK_REC_TYPE_BODY_MASS,
                    "2020-01-05 08:00:00 +0100",
                    80.0,
                    "kg",
                    WATCH_DEVICE,
                ),
                sample(
                    hd::HK_REC_TYPE_BODY_MASS,
                    "2020-02-03 08:00:00 +0100",
                    79.5,
                    "kg",
                    WATCH_DEVICE,
                ),
                sample(
                    hd::HK_REC_TYPE_BODY_MASS,
                    "2020-02-20 08:00:00 +0100",
                    79.0,
                    "kg",
                    WATCH_DEVICE,
                ),
            ],
        );

        let summary = |date: &str| DailySummary {
            date_components: date.to_string(),
            active_energy_burned: 500.0,
            active_energy_burned_goal: 600.0,
            active_energy_burned_unit: "Cal".to_string(),
            apple_move_minutes: 0.0,
            apple_move_minutes_goal: 0.0,
            apple_exercise_time: 30.0,
            apple_exercise_time_goal: 30.0,
            apple_stand_hours: 10,
            apple_stand_hours_goal: 12,
        };
        tables::write_rows(
            &activity,
            vec![
                summary("2020-01-02"),
                summary("2020-01-10"),
                summary("2020-02-10"),
                summary("2020-03-01"),
            ],
        )
        .expect("write summaries");

        weighin_interval_map(&weights, &activity, &dest).expect("interval map");
        let rows: Vec<IntervalMapRow> = tables::row_iter(&dest)
            .expect("open")
            .collect::<EtlResult<_>>()
            .expect("rows");

        // Intervals: [2020-01-05, 2020-02-03) and [2020-02-03, 2020-02-20).
        // 2020-01-02 precedes the first interval, 2020-03-01 follows the
        // last; both drop.
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, "2020-01-10");
        assert_eq!(rows[0].interval_start, "2020-01-05");
        assert_eq!(rows[0].interval_end, "2020-02-03");
        assert_eq!(rows[1].date, "2020-02-10");
        assert_eq!(rows[1].interval_start, "2020-02-03");
        assert_eq!(rows[1].interval_end, "2020-02-20");
    }
}
