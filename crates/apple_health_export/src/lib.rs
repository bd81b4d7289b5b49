//! Streaming ETL over an Apple Health `export.xml` document.
//!
//! The export is read in a single forward pass with constant memory,
//! projected into typed records ([`model::Sample`], [`model::Workout`],
//! [`model::DailySummary`]) and written out as flat CSV tables. On top of
//! the extracted tables sit derived views: daily and monthly aggregates
//! and a weigh-in interval map built from the [`intervals`] primitives.

pub mod aggregate;
pub mod error;
pub mod etl;
pub mod grouping;
pub mod healthdata;
pub mod intervals;
pub mod model;
pub mod pipeline;
pub mod stream;
pub mod tables;

pub use error::{EtlError, EtlResult};
pub use etl::{AggregateView, ExtractStats};
pub use intervals::{Interval, IntervalKind};
pub use model::{DailySummary, Sample, TypedRecord, Workout};
pub use pipeline::{DateRange, ExtractOptions};
