//! CSV table schemas and file helpers.
//!
//! Every output of the pipeline is a flat CSV file with a header row.
//! Writes go through a temp file in the destination directory and a final
//! rename, so a crashed run never leaves a truncated table behind.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{EtlError, EtlResult};

/// One `(day, total)` row of a per-type daily table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTotalRow {
    pub date: String,
    pub value: f64,
    pub unit: String,
}

/// One `(month, total)` row of the combined monthly table. `days` counts
/// the distinct days that contributed to the month's value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTotalRow {
    #[serde(rename = "type")]
    pub record_type: String,
    pub date: String,
    pub value: f64,
    pub unit: String,
    pub days: u32,
}

/// Per-day workout totals across all sessions of that day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyWorkoutTotalRow {
    pub date: String,
    pub duration: f64,
    pub duration_unit: String,
    pub total_distance: f64,
    pub total_distance_unit: String,
    pub total_energy_burned: f64,
    pub total_energy_burned_unit: String,
}

/// One element-to-interval assignment from the weigh-in merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalMapRow {
    pub date: String,
    pub interval_start: String,
    pub interval_end: String,
}

/// Serialize `rows` to `path` atomically: write a temp sibling, then
/// rename over the destination.
pub fn write_rows<S, I>(path: &Path, rows: I) -> EtlResult<usize>
where
    S: Serialize,
    I: IntoIterator<Item = S>,
{
    let tmp = tmp_path(path);
    let mut written = 0usize;

    {
        let mut writer = csv::Writer::from_path(&tmp)?;
        for row in rows {
            writer.serialize(row)?;
            written += 1;
        }
        writer.flush().map_err(EtlError::Io)?;
    }

    fs::rename(&tmp, path)?;
    Ok(written)
}

fn tmp_path(path: &Path) -> std::path::PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "table".to_string());
    name.push_str(".tmp");
    path.with_file_name(name)
}

/// Streaming reader over a previously written table. Each row deserializes
/// independently; a malformed row surfaces as an error item rather than
/// aborting the iterator.
pub fn row_iter<T>(path: &Path) -> EtlResult<impl Iterator<Item = EtlResult<T>>>
where
    T: DeserializeOwned,
{
    let reader = csv::Reader::from_path(path)?;
    Ok(reader
        .into_deserialize()
        .map(|row| row.map_err(EtlError::Csv)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips_rows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("daily.csv");

        let rows = vec![
            DailyTotalRow {
                date: "2020-01-05".to_string(),
                value: 300.0,
                unit: "count".to_string(),
            },
            DailyTotalRow {
                date: "2020-01-06".to_string(),
                value: 150.0,
                unit: "count".to_string(),
            },
        ];
        let written = write_rows(&path, rows.clone()).expect("write");
        assert_eq!(written, 2);

        let back: Vec<DailyTotalRow> = row_iter(&path)
            .expect("open")
            .collect::<EtlResult<_>>()
            .expect("rows");
        assert_eq!(back, rows);
    }

    #[test]
    fn no_temp_file_survives_a_successful_write() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("daily.csv");
        write_rows(
            &path,
            vec![DailyTotalRow {
                date: "2020-01-05".to_string(),
                value: 1.0,
                unit: "count".to_string(),
            }],
        )
        .expect("write");

        assert!(path.exists());
        assert!(!dir.path().join("daily.csv.tmp").exists());
    }

    #[test]
    fn monthly_header_uses_type_not_record_type() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("monthly.csv");
        write_rows(
            &path,
            vec![MonthlyTotalRow {
                record_type: "HKQuantityTypeIdentifierStepCount".to_string(),
                date: "2020-01".to_string(),
                value: 4.0,
                unit: "count".to_string(),
                days: 2,
            }],
        )
        .expect("write");

        let header = std::fs::read_to_string(&path)
            .expect("read")
            .lines()
            .next()
            .expect("header")
            .to_string();
        assert_eq!(header, "type,date,value,unit,days");
    }

    #[test]
    fn overwrite_replaces_previous_contents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("daily.csv");
        let row = |d: &str| DailyTotalRow {
            date: d.to_string(),
            value: 1.0,
            unit: "count".to_string(),
        };
        write_rows(&path, vec![row("2020-01-05"), row("2020-01-06")]).expect("first");
        write_rows(&path, vec![row("2020-02-01")]).expect("second");

        let back: Vec<DailyTotalRow> = row_iter(&path)
            .expect("open")
            .collect::<EtlResult<_>>()
            .expect("rows");
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].date, "2020-02-01");
    }
}
