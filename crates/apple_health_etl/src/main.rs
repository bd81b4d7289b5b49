use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};

use apple_health_export::healthdata as hd;
use apple_health_export::{AggregateView, DateRange, ExtractOptions, etl};

#[derive(Parser)]
#[command(
    name = "apple-health-etl",
    version,
    about = "Extract an Apple Health export.xml into flat CSV tables"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct FilterArgs {
    /// Keep records starting on or after this day (YYYY-MM-DD).
    #[arg(long)]
    start_date: Option<String>,
    /// Keep records starting on or before this day (YYYY-MM-DD).
    #[arg(long)]
    end_date: Option<String>,
    /// Drop iPhone-sourced records.
    #[arg(long)]
    watch_only: bool,
    /// Sort output rows by start date.
    #[arg(long)]
    sort: bool,
}

impl FilterArgs {
    fn to_options(&self) -> Result<ExtractOptions> {
        let date_range = if self.start_date.is_some() || self.end_date.is_some() {
            Some(DateRange::new(
                self.start_date.as_deref(),
                self.end_date.as_deref(),
            )?)
        } else {
            None
        };
        Ok(ExtractOptions {
            date_range,
            watch_only: self.watch_only,
            sort_by_start: self.sort,
        })
    }
}

#[derive(Subcommand)]
enum Command {
    /// Extract all samples of one type.
    Samples {
        export: PathBuf,
        /// Sample type identifier, e.g. HKQuantityTypeIdentifierStepCount.
        #[arg(long = "type")]
        sample_type: String,
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Extract all workouts with their metadata columns.
    Workouts {
        export: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Extract all per-day activity summaries.
    ActivitySummaries {
        export: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Daily totals of one extracted sample table.
    DailyTotals {
        src: PathBuf,
        #[arg(long)]
        out: PathBuf,
        /// Report per-day means instead of sums.
        #[arg(long)]
        averages: bool,
    },
    /// Combined monthly table over several extracted sample tables.
    MonthlyTotals {
        #[arg(long)]
        out: PathBuf,
        /// One per source table, as TYPE=PATH.
        #[arg(long = "source", value_parser = parse_source, required = true)]
        sources: Vec<(String, PathBuf)>,
    },
    /// Per-day workout duration/distance/energy totals.
    WorkoutTotals {
        src: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Map activity-summary days onto weigh-in anchored intervals.
    WeighinIntervals {
        /// Extracted body-mass sample table, sorted by start date.
        #[arg(long)]
        weights: PathBuf,
        /// Extracted activity-summary table.
        #[arg(long)]
        activity: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Full pipeline: every supported type, workouts, summaries and all
    /// derived tables, into one output directory.
    Run {
        export: PathBuf,
        #[arg(long)]
        out_dir: PathBuf,
        #[command(flatten)]
        filters: FilterArgs,
    },
}

fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    match cli.command {
        Command::Samples {
            export,
            sample_type,
            out,
            filters,
        } => {
            if !hd::is_supported_type(&sample_type) {
                bail!("sample type `{sample_type}` is not supported");
            }
            let stats = etl::extract_samples(&export, &out, &sample_type, &filters.to_options()?)
                .with_context(|| format!("extracting {sample_type}"))?;
            println!("{} rows written, {} skipped", stats.written, stats.skipped);
        }
        Command::Workouts {
            export,
            out,
            filters,
        } => {
            let stats = etl::extract_workouts(&export, &out, &filters.to_options()?)
                .context("extracting workouts")?;
            println!("{} rows written, {} skipped", stats.written, stats.skipped);
        }
        Command::ActivitySummaries {
            export,
            out,
            filters,
        } => {
            let stats = etl::extract_activity_summaries(&export, &out, &filters.to_options()?)
                .context("extracting activity summaries")?;
            println!("{} rows written, {} skipped", stats.written, stats.skipped);
        }
        Command::DailyTotals { src, out, averages } => {
            let view = if averages {
                AggregateView::Averages
            } else {
                AggregateView::Sums
            };
            let written = etl::daily_totals(&src, &out, view).context("building daily totals")?;
            println!("{written} rows written");
        }
        Command::MonthlyTotals { out, sources } => {
            let written =
                etl::monthly_totals(&sources, &out).context("building monthly totals")?;
            println!("{written} rows written");
        }
        Command::WorkoutTotals { src, out } => {
            let written =
                etl::daily_workout_totals(&src, &out).context("building workout totals")?;
            println!("{written} rows written");
        }
        Command::WeighinIntervals {
            weights,
            activity,
            out,
        } => {
            let written = etl::weighin_interval_map(&weights, &activity, &out)
                .context("building weigh-in interval map")?;
            println!("{written} rows written");
        }
        Command::Run {
            export,
            out_dir,
            filters,
        } => run_all(&export, &out_dir, &filters)?,
    }

    Ok(())
}

fn init_logging() {
    // `APPLE_HEALTH_ETL_LOG_LEVEL` wins, then `RUST_LOG`, default `info`.
    let log_env = std::env::var("APPLE_HEALTH_ETL_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(&log_env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
}

fn parse_source(value: &str) -> Result<(String, PathBuf), String> {
    match value.split_once('=') {
        Some((record_type, path)) if !record_type.is_empty() && !path.is_empty() => {
            Ok((record_type.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected TYPE=PATH, got `{value}`")),
    }
}

/// One run over the whole export: extract every supported sample type,
/// workouts and activity summaries, then build every derived table from
/// the extractions.
fn run_all(export: &Path, out_dir: &Path, filters: &FilterArgs) -> Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;
    // The interval map and the two-pointer merge need sorted inputs.
    let mut opts = filters.to_options()?;
    opts.sort_by_start = true;

    let mut monthly_sources = Vec::new();
    for sample_type in hd::CATEGORY_RECORD_TYPES
        .iter()
        .chain(hd::QUANTITY_RECORD_TYPES.iter())
    {
        let name = short_type_name(sample_type);
        let dest = out_dir.join(format!("{name}.csv"));
        let stats = etl::extract_samples(export, &dest, sample_type, &opts)
            .with_context(|| format!("extracting {sample_type}"))?;
        if stats.written == 0 {
            continue;
        }

        let daily_dest = out_dir.join(format!("{name}_daily.csv"));
        etl::daily_totals(&dest, &daily_dest, etl::view_for_type(sample_type))
            .with_context(|| format!("building daily totals for {sample_type}"))?;
        monthly_sources.push((sample_type.to_string(), dest));
    }

    if !monthly_sources.is_empty() {
        etl::monthly_totals(&monthly_sources, &out_dir.join("Monthly.csv"))
            .context("building monthly totals")?;
    }

    let workouts = out_dir.join("Workouts.csv");
    let stats = etl::extract_workouts(export, &workouts, &opts).context("extracting workouts")?;
    if stats.written > 0 {
        etl::daily_workout_totals(&workouts, &out_dir.join("Workouts_daily.csv"))
            .context("building workout totals")?;
    }

    let activity = out_dir.join("ActivitySummary.csv");
    let summary_stats = etl::extract_activity_summaries(export, &activity, &opts)
        .context("extracting activity summaries")?;

    let weights = out_dir.join(format!("{}.csv", short_type_name(hd::HK_REC_TYPE_BODY_MASS)));
    if summary_stats.written > 0 && weights.exists() {
        etl::weighin_interval_map(&weights, &activity, &out_dir.join("WeighinIntervals.csv"))
            .context("building weigh-in interval map")?;
    }

    tracing::info!(out_dir = %out_dir.display(), "pipeline finished");
    Ok(())
}

fn short_type_name(sample_type: &str) -> &str {
    sample_type
        .strip_prefix("HKQuantityTypeIdentifier")
        .or_else(|| sample_type.strip_prefix("HKCategoryTypeIdentifier"))
        .unwrap_or(sample_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_parser_splits_type_and_path() {
        let (t, p) = parse_source("HKQuantityTypeIdentifierStepCount=out/steps.csv")
            .expect("valid source");
        assert_eq!(t, "HKQuantityTypeIdentifierStepCount");
        assert_eq!(p, PathBuf::from("out/steps.csv"));

        assert!(parse_source("no-equals").is_err());
        assert!(parse_source("=path").is_err());
    }

    #[test]
    fn short_type_name_strips_identifier_prefixes() {
        assert_eq!(
            short_type_name("HKQuantityTypeIdentifierStepCount"),
            "StepCount"
        );
        assert_eq!(
            short_type_name("HKCategoryTypeIdentifierSleepAnalysis"),
            "SleepAnalysis"
        );
        assert_eq!(short_type_name("Custom"), "Custom");
    }

    #[test]
    fn cli_parses_run_command() {
        let cli = Cli::try_parse_from([
            "apple-health-etl",
            "run",
            "export.xml",
            "--out-dir",
            "out",
            "--watch-only",
        ])
        .expect("parse");
        match cli.command {
            Command::Run {
                export, filters, ..
            } => {
                assert_eq!(export, PathBuf::from("export.xml"));
                assert!(filters.watch_only);
            }
            _ => panic!("expected run command"),
        }
    }
}
