//! AIS Tracks
//!
//! Track representation, the store that resolves updates to tracks, trail
//! history and relative motion against own ship.

mod cpa;
mod store;
mod trail;
mod types;

pub use cpa::{calculate_cpa_tcpa, relative_motion, CpaResult, RelativeMotion};
pub use store::{ApplyOutcome, Resolution, SweepReport, TargetUpdate, TrackStats, TrackStore};
pub use trail::{Trail, TrailPoint};
pub use types::{AisClass, AisTrack, ClassThresholds, TrackKind, TrackStatus, TrackerSettings};
