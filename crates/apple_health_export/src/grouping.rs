//! Calendar-month grouping and interval assignment over sorted date
//! sequences.
//!
//! Dates here are ISO `YYYY-MM-DD` strings (or longer timestamps with that
//! prefix), so lexicographic order is chronological order and the month key
//! is a prefix slice.

use std::cmp::Ordering;

use crate::error::{EtlError, EtlResult};
use crate::intervals::Interval;

/// `YYYY-MM` key of an ISO date string.
pub fn month_key(date: &str) -> &str {
    let end = date.len().min(7);
    date.get(..end).unwrap_or(date)
}

/// Streaming group-by over a pre-sorted date sequence: consecutive equal
/// month keys form one group. Unsorted input yields multiple groups for
/// the same month; sorting is the caller's responsibility.
pub fn month_groups(dates: &[String]) -> Vec<(&str, &[String])> {
    let mut groups = Vec::new();
    let mut start = 0;

    for i in 1..=dates.len() {
        if i == dates.len() || month_key(&dates[i]) != month_key(&dates[start]) {
            groups.push((month_key(&dates[start]), &dates[start..i]));
            start = i;
        }
    }

    groups
}

/// Build the month-anchored half-open interval chain from a sorted date
/// sequence: one `[this_month_first, next_month_first)` interval per
/// consecutive month pair, plus an optional trailing partial interval
/// `[last_month_first, last_month_last)` when the final month holds more
/// than one distinct date.
pub fn month_anchored_intervals(
    dates: &[String],
    include_trailing_partial: bool,
) -> EtlResult<Vec<Interval<String>>> {
    let groups = month_groups(dates);
    let mut intervals = Vec::new();

    let Some(first_group) = groups.first() else {
        return Ok(intervals);
    };

    let mut lower_first = &first_group.1[0];
    let mut lower_last = &first_group.1[first_group.1.len() - 1];

    for (_, group) in &groups[1..] {
        let upper_first = &group[0];
        intervals.push(Interval::half_open_left(
            lower_first.clone(),
            upper_first.clone(),
        )?);
        lower_first = upper_first;
        lower_last = &group[group.len() - 1];
    }

    if include_trailing_partial && lower_first < lower_last {
        intervals.push(Interval::half_open_left(
            lower_first.clone(),
            lower_last.clone(),
        )?);
    }

    Ok(intervals)
}

/// Two-pointer merge of sorted elements against sorted intervals, yielding
/// one `(element, interval)` pair per membership match.
///
/// Both inputs must be independently sorted ascending; this is checked up
/// front and violations fail with a precondition error rather than silently
/// misassigning elements. Elements matching no interval are dropped.
pub fn merge_elements_to_intervals<T: PartialOrd + Clone>(
    sorted_elements: &[T],
    sorted_intervals: &[Interval<T>],
) -> EtlResult<Vec<(T, Interval<T>)>> {
    check_sorted_elements(sorted_elements)?;
    check_sorted_intervals(sorted_intervals)?;

    let mut pairs = Vec::new();
    let mut e = 0;
    let mut i = 0;

    while e < sorted_elements.len() && i < sorted_intervals.len() {
        let elem = &sorted_elements[e];
        let interval = &sorted_intervals[i];

        if interval.contains(elem) {
            pairs.push((elem.clone(), interval.clone()));
            e += 1;
        } else if elem < interval.upper_end() {
            // Before the interval starts: no interval will ever reach back.
            e += 1;
        } else {
            // Past the current interval's end.
            i += 1;
        }
    }

    Ok(pairs)
}

fn check_sorted_elements<T: PartialOrd>(elements: &[T]) -> EtlResult<()> {
    let sorted = elements
        .windows(2)
        .all(|w| matches!(w[0].partial_cmp(&w[1]), Some(Ordering::Less | Ordering::Equal)));
    if !sorted {
        return Err(EtlError::Precondition(
            "elements must be sorted ascending".to_string(),
        ));
    }
    Ok(())
}

fn check_sorted_intervals<T: PartialOrd>(intervals: &[Interval<T>]) -> EtlResult<()> {
    for w in intervals.windows(2) {
        if w[0].try_cmp(&w[1])? == Ordering::Greater {
            return Err(EtlError::Precondition(
                "intervals must be sorted ascending".to_string(),
            ));
        }
    }
    Ok(())
}
