//! AisEngine - single-writer state machine for the AIS picture
//!
//! Composes the router, the track store and own ship. Every mutation goes
//! through [`AisEngine::handle`] or [`AisEngine::sweep`]; the caller must
//! serialize those calls (one owner, no shared mutable access).
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  AisEngine                                           │
//! │                                                      │
//! │  Update ──► Router ──┬──► OwnShipState               │
//! │                      ├──► TrackStore (vessel/aton)   │
//! │                      └──► dropped                    │
//! │                                                      │
//! │  sweep(now) ──────────────► TrackStore               │
//! │  targets()  ◄── TrackStore + OwnShipState (relative) │
//! └──────────────────────────────────────────────────────┘
//! ```

use crate::fields::FieldId;
use crate::own_ship::OwnShipState;
use crate::router::{Route, Router};
use crate::tracks::{
    relative_motion, AisTrack, ApplyOutcome, Resolution, SweepReport, TargetUpdate, TrackStats,
    TrackStore, TrackerSettings,
};
use crate::update::Update;

/// Why an update was not applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Context is neither own ship, a vessel nor an aid to navigation
    UnroutedContext,
    /// Path is not a recognised field
    UnknownField,
}

/// What handling one update did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleOutcome {
    OwnShip { changed: bool },
    Target(ApplyOutcome),
    Ignored(IgnoreReason),
}

impl HandleOutcome {
    /// Whether the published picture needs refreshing
    pub fn changed(&self) -> bool {
        match self {
            HandleOutcome::OwnShip { changed } => *changed,
            HandleOutcome::Target(outcome) => {
                outcome.accepted || outcome.resolution != Resolution::Existing
            }
            HandleOutcome::Ignored(_) => false,
        }
    }

    /// Whether own ship changed
    pub fn own_ship_changed(&self) -> bool {
        matches!(self, HandleOutcome::OwnShip { changed: true })
    }
}

/// Router, track store and own ship behind one owner
#[derive(Debug, Default)]
pub struct AisEngine {
    router: Router,
    store: TrackStore,
    own_ship: OwnShipState,
}

impl AisEngine {
    pub fn new(settings: TrackerSettings, self_context: Option<String>) -> Self {
        AisEngine {
            router: Router::new(self_context),
            store: TrackStore::new(settings),
            own_ship: OwnShipState::new(),
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn store(&self) -> &TrackStore {
        &self.store
    }

    pub fn own_ship(&self) -> &OwnShipState {
        &self.own_ship
    }

    pub fn stats(&self) -> TrackStats {
        self.store.stats()
    }

    pub fn update_settings(&mut self, settings: TrackerSettings) {
        self.store.update_settings(settings);
    }

    /// Route and apply one update, using its own timestamp as "now".
    pub fn handle(&mut self, update: &Update) -> HandleOutcome {
        let route = self.router.route(&update.context);
        if route == Route::Drop {
            return HandleOutcome::Ignored(IgnoreReason::UnroutedContext);
        }
        let Some(field) = FieldId::from_path(&update.path) else {
            return HandleOutcome::Ignored(IgnoreReason::UnknownField);
        };

        match route {
            Route::OwnShip => HandleOutcome::OwnShip {
                changed: self
                    .own_ship
                    .apply(field, &update.value, update.timestamp_ms),
            },
            Route::Target(kind) => HandleOutcome::Target(self.store.apply(&TargetUpdate {
                context: &update.context,
                kind,
                field,
                value: &update.value,
                timestamp_ms: update.timestamp_ms,
            })),
            Route::Drop => HandleOutcome::Ignored(IgnoreReason::UnroutedContext),
        }
    }

    /// Run the aging sweep
    pub fn sweep(&mut self, now_ms: u64) -> SweepReport {
        self.store.sweep(now_ms)
    }

    /// Current tracks with relative motion against own ship, unordered
    pub fn targets(&self) -> Vec<AisTrack> {
        self.store
            .tracks()
            .map(|track| {
                let mut track = track.clone();
                track.relative = relative_motion(&self.own_ship, &track);
                track
            })
            .collect()
    }

    /// One track by id, with relative motion
    pub fn target(&self, id: &str) -> Option<AisTrack> {
        self.store.get(id).map(|track| {
            let mut track = track.clone();
            track.relative = relative_motion(&self.own_ship, &track);
            track
        })
    }
}
