//! # AIS Track Core
//!
//! Platform-independent AIS target tracking: turns a stream of per-field
//! updates from a Signal K style feed into a deduplicated, confirmed and
//! aged set of tracks, plus own ship.
//!
//! This crate contains pure state and geometry with **zero I/O dependencies**.
//! Every operation takes an explicit timestamp, so it runs the same under a
//! tokio server, in tests, or replaying a recorded feed.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  aistrack-core (no tokio/async deps)                        │
//! │  ├── update/    (inbound record decoding)                   │
//! │  ├── router/    (own ship / vessel / aton / drop)           │
//! │  ├── fields/    (closed catalogue of recognised paths)      │
//! │  ├── coerce/    (tolerant value parsing)                    │
//! │  ├── tracks/    (store, indices, trails, aging, CPA)        │
//! │  ├── own_ship/  (own ship reducer)                          │
//! │  └── engine/    (single-writer composition of the above)    │
//! └─────────────────────────────────────────────────────────────┘
//!                 ▲
//!    ┌────────────┴────────────┐
//!    │  aistrack-server        │
//!    │  (tokio actor, HTTP/WS) │
//!    └─────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use aistrack_core::{AisEngine, TrackerSettings, Update};
//! use serde_json::json;
//!
//! let mut engine = AisEngine::new(TrackerSettings::default(), None);
//! let ctx = "vessels.urn:mrn:imo:mmsi:244123456";
//! engine.handle(&Update::new(ctx, "mmsi", json!("244123456"), 0));
//! engine.handle(&Update::new(
//!     ctx,
//!     "navigation.position",
//!     json!({"latitude": 52.0, "longitude": 4.0}),
//!     1_000,
//! ));
//! assert_eq!(engine.targets().len(), 1);
//! ```

pub mod coerce;
pub mod engine;
pub mod error;
pub mod fields;
pub mod geo;
pub mod own_ship;
pub mod router;
pub mod tracks;
pub mod update;

pub use engine::{AisEngine, HandleOutcome, IgnoreReason};
pub use error::UpdateError;
pub use fields::FieldId;
pub use geo::Position;
pub use own_ship::OwnShipState;
pub use router::{Route, Router};
pub use tracks::{
    AisClass, AisTrack, ApplyOutcome, ClassThresholds, RelativeMotion, Resolution, SweepReport,
    TrackKind, TrackStats, TrackStatus, TrackerSettings, Trail, TrailPoint,
};
pub use update::Update;
