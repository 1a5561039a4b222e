//! # Dataset Model
//!
//! Plain data shared by every layer: entities, relationship keys,
//! parameter values and the time-slice algebra.
//!
//! Design rule: no indexes, no snapshot state, no locking here.
//! This module is pure data and pure functions.

pub mod entity;
pub mod relationship;
pub mod time_slice;
pub mod time_series;
pub mod parameter_map;
pub mod value;

pub use entity::Entity;
pub use relationship::RelationshipKey;
pub use time_slice::{
    TimeSlice, Timestamp,
    duration, before, overlaps, iscontained, overlap_duration,
    t_lowest_resolution, t_highest_resolution,
};
pub use time_series::TimeSeries;
pub use parameter_map::{MapKey, ParameterMap};
pub use value::Value;
