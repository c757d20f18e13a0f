//! Free-window computation for slot queries.
//!
//! Rows of the slot column are occupied intervals. Constraints the sender put
//! on the slot column add more: a two-sided constraint becomes an interval of
//! its own, `<` bounds everything from its value onward as occupied, and `>`
//! everything before it. The union is merged and the gaps between merged
//! intervals, when at least as long as the requested duration, are the reply.

use chrono::{Duration, NaiveDateTime};

use crate::error::Rejection;
use crate::models::{Comparator, Constraint};
use crate::temporal::{format_instant, parse_stored_instant, split_stored_interval};

/// Reply when nothing is occupied
pub const ANYTIME: &str = "anytime";

/// A half-open occupied span; `None` on either side is unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccupiedInterval {
    /// Inclusive start
    pub start: Option<NaiveDateTime>,
    /// Exclusive end
    pub end: Option<NaiveDateTime>,
}

impl OccupiedInterval {
    /// A bounded interval
    #[must_use]
    pub const fn between(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Decode a stored `start/end` cell
    pub fn from_stored(value: &str) -> Result<Self, Rejection> {
        let corrupt = || Rejection::CorruptRange(value.to_string());
        let (start, end) = split_stored_interval(value).ok_or_else(corrupt)?;
        Ok(Self::between(
            parse_stored_instant(start).ok_or_else(corrupt)?,
            parse_stored_instant(end).ok_or_else(corrupt)?,
        ))
    }

    /// True when this interval starts no later than `end` (an unbounded start
    /// is earlier than anything, an unbounded `end` later than anything)
    fn starts_by(&self, end: Option<NaiveDateTime>) -> bool {
        match (self.start, end) {
            (None, _) | (_, None) => true,
            (Some(start), Some(end)) => start <= end,
        }
    }
}

/// Later of two ends, where `None` is the latest
fn later_end(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>) -> Option<NaiveDateTime> {
    a.zip(b).map(|(a, b)| a.max(b))
}

/// Insert `interval` before the first interval starting after it
fn insert_sorted(intervals: &mut Vec<OccupiedInterval>, interval: OccupiedInterval) {
    let at = intervals
        .iter()
        .position(|existing| interval.start < existing.start)
        .unwrap_or(intervals.len());
    intervals.insert(at, interval);
}

fn parse_bound(value: &str) -> Result<NaiveDateTime, Rejection> {
    parse_stored_instant(value).ok_or_else(|| Rejection::CorruptRange(value.to_string()))
}

/// Merges occupied intervals into a free-window reply
#[derive(Debug, Clone, Copy)]
pub struct AvailabilityMerger {
    min_gap: Duration,
}

impl AvailabilityMerger {
    /// Merger reporting gaps of at least `min_gap`
    #[must_use]
    pub const fn new(min_gap: Duration) -> Self {
        Self { min_gap }
    }

    /// Fold the sender's slot-column constraints into `occupied`, which must
    /// be sorted by start.
    ///
    /// Among `<` constraints the smallest value wins, among `>` the largest.
    /// Other single comparisons (`=`, `!=` and the `>=` an interval-form `>`
    /// compiles to) carry no bound and are ignored.
    pub fn apply_constraints(
        &self,
        occupied: &mut Vec<OccupiedInterval>,
        constraints: &[Constraint],
    ) -> Result<(), Rejection> {
        let mut busy_from: Option<NaiveDateTime> = None;
        let mut busy_until: Option<NaiveDateTime> = None;

        for constraint in constraints {
            if let Some(second) = &constraint.second {
                let (start, end) = if constraint.first.comparator == Comparator::LessThan {
                    (&constraint.first.value, &second.value)
                } else {
                    (&second.value, &constraint.first.value)
                };
                insert_sorted(
                    occupied,
                    OccupiedInterval::between(parse_bound(start)?, parse_bound(end)?),
                );
                continue;
            }
            let value = parse_bound(&constraint.first.value)?;
            match constraint.first.comparator {
                Comparator::LessThan => {
                    busy_from = Some(busy_from.map_or(value, |current| current.min(value)));
                },
                Comparator::GreaterThan => {
                    busy_until = Some(busy_until.map_or(value, |current| current.max(value)));
                },
                Comparator::GreaterThanEquals | Comparator::Equals | Comparator::NotEquals => {},
            }
        }

        if let Some(until) = busy_until {
            // placed first so the merge still sees intervals in start order
            occupied.insert(
                0,
                OccupiedInterval {
                    start: None,
                    end: Some(until),
                },
            );
        }
        if let Some(from) = busy_from {
            insert_sorted(
                occupied,
                OccupiedInterval {
                    start: Some(from),
                    end: None,
                },
            );
        }
        Ok(())
    }

    /// Merge overlapping or touching intervals, in start order.
    ///
    /// Scanning stops once a merged interval runs forever.
    #[must_use]
    pub fn merge(&self, occupied: &[OccupiedInterval]) -> Vec<OccupiedInterval> {
        let mut merged: Vec<OccupiedInterval> = Vec::with_capacity(occupied.len());
        let mut iter = occupied.iter();
        let Some(first) = iter.next() else {
            return merged;
        };
        let mut current = *first;

        for next in iter {
            if current.end.is_none() {
                break;
            }
            if next.starts_by(current.end) {
                current.end = later_end(current.end, next.end);
            } else {
                merged.push(current);
                current = *next;
            }
        }
        merged.push(current);
        merged
    }

    /// Reply text for merged intervals: `before S`, `E-S` gaps and `after E`
    #[must_use]
    pub fn render(&self, merged: &[OccupiedInterval]) -> String {
        let (Some(first), Some(last)) = (merged.first(), merged.last()) else {
            return ANYTIME.to_string();
        };

        let mut segments = Vec::with_capacity(merged.len() + 1);
        if let Some(start) = first.start {
            segments.push(format!("before {}", format_instant(start)));
        }
        for pair in merged.windows(2) {
            if let (Some(free_from), Some(free_until)) = (pair[0].end, pair[1].start) {
                if free_until - free_from >= self.min_gap {
                    segments.push(format!(
                        "{}-{}",
                        format_instant(free_from),
                        format_instant(free_until)
                    ));
                }
            }
        }
        if let Some(end) = last.end {
            segments.push(format!("after {}", format_instant(end)));
        }
        segments.join(";")
    }

    /// Full computation from stored cells and the slot-column constraints
    pub fn free_windows<S: AsRef<str>>(
        &self,
        stored: &[S],
        constraints: &[Constraint],
    ) -> Result<String, Rejection> {
        let mut occupied = stored
            .iter()
            .map(|cell| OccupiedInterval::from_stored(cell.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        self.apply_constraints(&mut occupied, constraints)?;
        if occupied.is_empty() {
            return Ok(ANYTIME.to_string());
        }
        Ok(self.render(&self.merge(&occupied)))
    }
}
