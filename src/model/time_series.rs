//! TimeSeries: values indexed by time slice.

use serde::{Deserialize, Serialize};

use super::time_slice::{t_highest_resolution, TimeSlice};
use super::Value;
use crate::{Error, Result};

/// A sequence of `(TimeSlice, Value)` entries, kept sorted by slice.
///
/// Slices are unique within a series. A value that holds "for all time"
/// is an entry keyed by [`TimeSlice::all_time`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<(TimeSlice, Value)>", into = "Vec<(TimeSlice, Value)>")]
pub struct TimeSeries {
    entries: Vec<(TimeSlice, Value)>,
}

impl TimeSeries {
    /// Fails with [`Error::MalformedIngest`] when two entries share a slice.
    pub fn new(entries: impl IntoIterator<Item = (TimeSlice, Value)>) -> Result<Self> {
        let mut entries: Vec<(TimeSlice, Value)> = entries.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        if let Some(w) = entries.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(Error::MalformedIngest(format!(
                "time series has two entries for {}", w[0].0
            )));
        }
        Ok(Self { entries })
    }

    /// A series with a single entry that applies at any time.
    pub fn constant(value: Value) -> Self {
        Self { entries: vec![(TimeSlice::all_time(), value)] }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TimeSlice, &Value)> {
        self.entries.iter().map(|(t, v)| (t, v))
    }

    /// The entry applicable to the query slice `t`.
    ///
    /// Entries whose slice contains `t` take precedence; if none does,
    /// entries overlapping `t` are considered. Among the candidates the
    /// highest-resolution ones win. More than one winner is reported as
    /// [`Error::AmbiguousTemporalMatch`]; no candidate at all as `Ok(None)`.
    ///
    /// An instant (`start == end`) lies in `[start, end)` of an entry, so
    /// on a shared boundary it belongs to the later entry.
    pub fn at(&self, t: &TimeSlice) -> Result<Option<&Value>> {
        let containing: Vec<usize> = if t.is_degenerate() {
            self.positions(|s| s == t || (s.start() <= t.start() && t.start() < s.end()))
        } else {
            self.positions(|s| s.contains(t))
        };
        let candidates = if containing.is_empty() {
            self.positions(|s| s.overlaps(t))
        } else {
            containing
        };
        if candidates.is_empty() {
            return Ok(None);
        }

        let slices: Vec<TimeSlice> = candidates.iter().map(|&i| self.entries[i].0).collect();
        let finest = t_highest_resolution(&slices);
        match finest.as_slice() {
            [only] => Ok(self
                .entries
                .iter()
                .find(|(s, _)| s == only)
                .map(|(_, v)| v)),
            _ => Err(Error::AmbiguousTemporalMatch {
                t: t.to_string(),
                candidates: finest.iter().map(ToString::to_string).collect(),
            }),
        }
    }

    fn positions(&self, pred: impl Fn(&TimeSlice) -> bool) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, (s, _))| pred(s))
            .map(|(i, _)| i)
            .collect()
    }
}

impl TryFrom<Vec<(TimeSlice, Value)>> for TimeSeries {
    type Error = Error;

    fn try_from(entries: Vec<(TimeSlice, Value)>) -> Result<Self> {
        Self::new(entries)
    }
}

impl From<TimeSeries> for Vec<(TimeSlice, Value)> {
    fn from(series: TimeSeries) -> Self {
        series.entries
    }
}
