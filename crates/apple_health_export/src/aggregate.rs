//! Running sum/count accumulators keyed by calendar day or month.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    sum: f64,
    count: u64,
}

/// Aggregation key granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// `YYYY-MM-DD`
    Day,
    /// `YYYY-MM`
    Month,
}

impl Granularity {
    fn key_len(&self) -> usize {
        match self {
            Granularity::Day => 10,
            Granularity::Month => 7,
        }
    }
}

/// Accumulates `(sum, count)` per date-derived key.
///
/// Owned by exactly one producer loop; one aggregator per table being
/// built. Size is bounded by the number of distinct days/months, not by
/// the number of samples fed in.
#[derive(Debug, Clone)]
pub struct DailyAggregator {
    granularity: Granularity,
    tally: BTreeMap<String, Tally>,
}

impl DailyAggregator {
    pub fn new() -> Self {
        Self::with_granularity(Granularity::Day)
    }

    pub fn monthly() -> Self {
        Self::with_granularity(Granularity::Month)
    }

    pub fn with_granularity(granularity: Granularity) -> Self {
        DailyAggregator {
            granularity,
            tally: BTreeMap::new(),
        }
    }

    /// Add a value under the key derived from `date`, which must start
    /// with an ISO `YYYY-MM-DD` date (a full export timestamp works).
    pub fn add(&mut self, date: &str, value: f64) {
        let end = date.len().min(self.granularity.key_len());
        let key = date.get(..end).unwrap_or(date);
        let entry = self.tally.entry(key.to_string()).or_default();
        entry.sum += value;
        entry.count += 1;
    }

    /// Snapshot of running sums per key. Later `add` calls do not mutate
    /// a previously returned snapshot.
    pub fn sums(&self) -> BTreeMap<String, f64> {
        self.tally
            .iter()
            .map(|(k, t)| (k.clone(), t.sum))
            .collect()
    }

    /// Snapshot of per-key means; an empty tally never divides by zero.
    pub fn averages(&self) -> BTreeMap<String, f64> {
        self.tally
            .iter()
            .map(|(k, t)| {
                let mean = if t.count == 0 {
                    0.0
                } else {
                    t.sum / t.count as f64
                };
                (k.clone(), mean)
            })
            .collect()
    }

    /// Reset for reuse across sequential runs.
    pub fn clear(&mut self) {
        self.tally.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.tally.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tally.len()
    }
}

impl Default for DailyAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_and_averages_per_day() {
        let mut agg = DailyAggregator::new();
        agg.add("2020-01-05", 3.0);
        agg.add("2020-01-05", 4.0);
        agg.add("2020-01-06", 1.0);

        let sums = agg.sums();
        assert_eq!(sums["2020-01-05"], 7.0);
        assert_eq!(sums["2020-01-06"], 1.0);

        let averages = agg.averages();
        assert_eq!(averages["2020-01-05"], 3.5);
        assert_eq!(averages["2020-01-06"], 1.0);
    }

    #[test]
    fn snapshots_are_detached_from_later_adds() {
        let mut agg = DailyAggregator::new();
        agg.add("2020-01-05", 3.0);
        let snapshot = agg.sums();
        agg.add("2020-01-05", 100.0);
        assert_eq!(snapshot["2020-01-05"], 3.0);
        assert_eq!(agg.sums()["2020-01-05"], 103.0);
    }

    #[test]
    fn full_timestamps_collapse_to_their_day() {
        let mut agg = DailyAggregator::new();
        agg.add("2020-01-05 08:00:00 +0100", 100.0);
        agg.add("2020-01-05 21:30:00 +0100", 200.0);
        assert_eq!(agg.sums()["2020-01-05"], 300.0);
    }

    #[test]
    fn monthly_granularity_collapses_to_month_keys() {
        let mut agg = DailyAggregator::monthly();
        agg.add("2020-01-05", 1.0);
        agg.add("2020-01-28", 2.0);
        agg.add("2020-02-01", 4.0);
        let sums = agg.sums();
        assert_eq!(sums["2020-01"], 3.0);
        assert_eq!(sums["2020-02"], 4.0);
    }

    #[test]
    fn clear_resets_state() {
        let mut agg = DailyAggregator::new();
        agg.add("2020-01-05", 3.0);
        agg.clear();
        assert!(agg.is_empty());
        assert_eq!(agg.len(), 0);
    }

    #[test]
    fn keys_come_back_sorted() {
        let mut agg = DailyAggregator::new();
        agg.add("2020-03-01", 1.0);
        agg.add("2020-01-01", 1.0);
        agg.add("2020-02-01", 1.0);
        let keys: Vec<String> = agg.sums().into_keys().collect();
        assert_eq!(keys, vec!["2020-01-01", "2020-02-01", "2020-03-01"]);
    }
}
