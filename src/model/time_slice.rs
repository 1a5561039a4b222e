//! Time slices and the interval algebra over them.
//!
//! A [`TimeSlice`] is a half-open interval `[start, end)`. The free
//! functions in this module ([`duration`], [`before`], [`overlaps`],
//! [`iscontained`], [`overlap_duration`], [`t_lowest_resolution`],
//! [`t_highest_resolution`]) are pure and never fail.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Timestamp domain of every time slice.
pub type Timestamp = NaiveDateTime;

/// Half-open time interval `[start, end)`.
///
/// Equality, hashing and ordering look at the bounds only; the optional
/// logical duration is a weight and does not take part in identity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "TimeSliceRepr", into = "TimeSliceRepr")]
pub struct TimeSlice {
    start: Timestamp,
    end: Timestamp,
    /// Overrides `end - start` in [`TimeSlice::duration`] when set.
    logical_duration: Option<TimeDelta>,
}

impl TimeSlice {
    /// Fails with [`Error::InvalidInterval`] when `start > end`.
    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidInterval(format!("start {start} is after end {end}")));
        }
        Ok(Self { start, end, logical_duration: None })
    }

    /// A slice whose duration is reported as `duration` instead of the
    /// timestamp difference.
    pub fn with_duration(start: Timestamp, end: Timestamp, duration: TimeDelta) -> Result<Self> {
        if duration < TimeDelta::zero() {
            return Err(Error::InvalidInterval(format!("negative duration {duration}")));
        }
        let mut slice = Self::new(start, end)?;
        slice.logical_duration = Some(duration);
        Ok(slice)
    }

    /// The slice spanning the whole timestamp domain.
    pub fn all_time() -> Self {
        Self {
            start: NaiveDateTime::MIN,
            end: NaiveDateTime::MAX,
            logical_duration: None,
        }
    }

    pub fn start(&self) -> Timestamp { self.start }
    pub fn end(&self) -> Timestamp { self.end }

    pub fn duration(&self) -> TimeDelta {
        self.logical_duration
            .unwrap_or_else(|| self.end.signed_duration_since(self.start))
    }

    pub fn is_degenerate(&self) -> bool {
        self.start == self.end
    }

    /// `other` lies within `self` (bounds inclusive).
    pub fn contains(&self, other: &TimeSlice) -> bool {
        iscontained(other, self)
    }

    /// Contains `other` and differs from it in at least one bound.
    pub fn strictly_contains(&self, other: &TimeSlice) -> bool {
        self.contains(other) && self != other
    }

    pub fn overlaps(&self, other: &TimeSlice) -> bool {
        overlaps(self, other)
    }
}

impl PartialEq for TimeSlice {
    fn eq(&self, other: &Self) -> bool {
        (self.start, self.end) == (other.start, other.end)
    }
}

impl Eq for TimeSlice {}

impl Hash for TimeSlice {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.start.hash(state);
        self.end.hash(state);
    }
}

impl Ord for TimeSlice {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.start, self.end).cmp(&(other.start, other.end))
    }
}

impl PartialOrd for TimeSlice {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for TimeSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ~> {}", self.start, self.end)
    }
}

// ============================================================================
// Serde representation (validated on the way in)
// ============================================================================

#[derive(Serialize, Deserialize)]
struct TimeSliceRepr {
    start: Timestamp,
    end: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration_ms: Option<i64>,
}

impl TryFrom<TimeSliceRepr> for TimeSlice {
    type Error = Error;

    fn try_from(repr: TimeSliceRepr) -> Result<Self> {
        match repr.duration_ms {
            None => TimeSlice::new(repr.start, repr.end),
            Some(ms) => {
                let d = TimeDelta::try_milliseconds(ms)
                    .ok_or_else(|| Error::InvalidInterval(format!("duration {ms}ms out of range")))?;
                TimeSlice::with_duration(repr.start, repr.end, d)
            }
        }
    }
}

impl From<TimeSlice> for TimeSliceRepr {
    fn from(t: TimeSlice) -> Self {
        Self {
            start: t.start,
            end: t.end,
            duration_ms: t.logical_duration.map(|d| d.num_milliseconds()),
        }
    }
}

// ============================================================================
// Interval algebra
// ============================================================================

/// The duration of `t`.
pub fn duration(t: &TimeSlice) -> TimeDelta {
    t.duration()
}

/// Whether the end of `a` is exactly the start of `b`.
pub fn before(a: &TimeSlice, b: &TimeSlice) -> bool {
    a.end == b.start
}

/// Whether `a` and `b` share some interior. Touching endpoints do not count.
pub fn overlaps(a: &TimeSlice, b: &TimeSlice) -> bool {
    a.start < b.end && b.start < a.end
}

/// Whether `inner` lies within `outer`.
pub fn iscontained(inner: &TimeSlice, outer: &TimeSlice) -> bool {
    outer.start <= inner.start && inner.end <= outer.end
}

/// Length of the common part of `a` and `b`, zero when they are disjoint.
pub fn overlap_duration(a: &TimeSlice, b: &TimeSlice) -> TimeDelta {
    let start = a.start.max(b.start);
    let end = a.end.min(b.end);
    end.signed_duration_since(start).max(TimeDelta::zero())
}

/// The slices of `ts` not strictly contained in any other slice (the
/// coarsest ones). Duplicates and input order are preserved.
///
/// Pairwise comparison over the distinct bounds: O(n²) in the number of
/// distinct slices.
pub fn t_lowest_resolution(ts: &[TimeSlice]) -> Vec<TimeSlice> {
    retain_distinct(ts, |candidate, other| other.strictly_contains(candidate))
}

/// The slices of `ts` that strictly contain no other slice (the finest
/// ones). Duplicates and input order are preserved.
pub fn t_highest_resolution(ts: &[TimeSlice]) -> Vec<TimeSlice> {
    retain_distinct(ts, |candidate, other| candidate.strictly_contains(other))
}

/// Keep every slice of `ts` whose bounds are not `dominated` by any
/// other distinct slice.
fn retain_distinct(
    ts: &[TimeSlice],
    dominated: impl Fn(&TimeSlice, &TimeSlice) -> bool,
) -> Vec<TimeSlice> {
    let mut distinct: Vec<&TimeSlice> = ts.iter().collect();
    distinct.sort();
    distinct.dedup();

    let kept: Vec<&TimeSlice> = distinct
        .iter()
        .filter(|a| !distinct.iter().any(|b| dominated(a, b)))
        .copied()
        .collect();

    ts.iter()
        .filter(|t| kept.binary_search(t).is_ok())
        .copied()
        .collect()
}
