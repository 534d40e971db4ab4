//! AIS Track Store
//!
//! Owns the live tracks and resolves every target update to exactly one of
//! them. Upstream contexts are transient: the same vessel can show up under a
//! new context, and a context can start describing a different object. The
//! store therefore keeps two secondary indices:
//!
//! - context -> track id (one entry per context)
//! - vessel id (MMSI) -> track ids, oldest first (forks can share an MMSI)
//!
//! A position that would require an implausible speed forks a new track
//! instead of dragging the existing one across the chart. Tracks are only
//! ever removed by [`TrackStore::sweep`].

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use super::types::*;
use crate::coerce;
use crate::fields::FieldId;
use crate::geo::{rad_to_deg, Position, MS_TO_KN};

/// Elapsed time floor for the plausibility check (one second)
const MIN_ELAPSED_MS: u64 = 1000;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Rate of turn: rad/s to degrees per minute
const RAD_S_TO_DEG_MIN: f64 = 60.0 * 180.0 / std::f64::consts::PI;

/// A routed update for a target
#[derive(Debug, Clone, Copy)]
pub struct TargetUpdate<'a> {
    pub context: &'a str,
    pub kind: TrackKind,
    pub field: FieldId,
    pub value: &'a Value,
    pub timestamp_ms: u64,
}

/// How an update was matched to a track
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Context already mapped to the track
    Existing,
    /// Brand-new track
    Created,
    /// Implausible jump, new track split off from `from`
    Forked { from: String },
    /// Unseen context adopted an existing track with the same vessel id
    Reattached,
}

/// Result of applying one update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub track_id: String,
    pub resolution: Resolution,
    /// Whether the field value was accepted
    pub accepted: bool,
}

/// What a sweep did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Tracks whose status changed
    pub status_changes: usize,
    /// Ids of removed tracks
    pub removed: Vec<String>,
}

impl SweepReport {
    pub fn changed(&self) -> bool {
        self.status_changes > 0 || !self.removed.is_empty()
    }
}

/// Session counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackStats {
    pub created: u64,
    pub forked: u64,
    pub reattached: u64,
    pub removed: u64,
}

/// The live set of AIS tracks
#[derive(Debug, Default)]
pub struct TrackStore {
    settings: TrackerSettings,
    /// Live tracks by id
    tracks: HashMap<String, AisTrack>,
    /// Context -> track id
    context_index: HashMap<String, String>,
    /// Vessel id -> track ids in creation order
    identity_index: HashMap<String, Vec<String>>,
    /// Uses of each id base so far
    id_counters: HashMap<String, u32>,
    stats: TrackStats,
}

impl TrackStore {
    pub fn new(settings: TrackerSettings) -> Self {
        TrackStore {
            settings,
            ..Default::default()
        }
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    /// Replace settings; trails are cut down if the trail length shrank
    pub fn update_settings(&mut self, settings: TrackerSettings) {
        if settings.trail_length != self.settings.trail_length {
            for track in self.tracks.values_mut() {
                track.trail.set_max_points(settings.trail_length);
            }
        }
        self.settings = settings;
    }

    pub fn stats(&self) -> TrackStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&AisTrack> {
        self.tracks.get(id)
    }

    pub fn tracks(&self) -> impl Iterator<Item = &AisTrack> {
        self.tracks.values()
    }

    /// Track a context currently resolves to
    pub fn track_for_context(&self, context: &str) -> Option<&AisTrack> {
        self.context_index
            .get(context)
            .and_then(|id| self.tracks.get(id))
    }

    /// Ids of the tracks sharing a vessel id, oldest first
    pub fn tracks_with_identity(&self, vessel_id: &str) -> &[String] {
        self.identity_index
            .get(vessel_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Clone of all tracks, unordered
    pub fn snapshot(&self) -> Vec<AisTrack> {
        self.tracks.values().cloned().collect()
    }

    /// Resolve the update to a track and apply its field.
    pub fn apply(&mut self, update: &TargetUpdate) -> ApplyOutcome {
        let (track_id, resolution) = self.resolve(update);
        let accepted = self.apply_field(&track_id, update);
        ApplyOutcome {
            track_id,
            resolution,
            accepted,
        }
    }

    /// Whether moving `track` to `candidate` at `now_ms` stays within the
    /// class speed ceiling times the plausibility factor. Tracks without a
    /// previous position fix are always plausible.
    pub fn is_plausible(&self, track: &AisTrack, candidate: &Position, now_ms: u64) -> bool {
        let (Some(from), Some(last)) = (track.position, track.last_position_at) else {
            return true;
        };
        let elapsed_ms = now_ms.saturating_sub(last).max(MIN_ELAPSED_MS);
        let implied_speed_kn = from.distance_nm(candidate) / (elapsed_ms as f64 / MS_PER_HOUR);
        let ceiling = self.settings.thresholds(track.ais_class).max_speed_kn;

        implied_speed_kn <= ceiling * self.settings.plausibility_factor
    }

    fn resolve(&mut self, update: &TargetUpdate) -> (String, Resolution) {
        if let Some(id) = self.context_index.get(update.context).cloned() {
            if update.field.is_position() && self.is_implausible_jump(&id, update) {
                let new_id = self.fork(&id, update);
                return (new_id, Resolution::Forked { from: id });
            }
            return (id, Resolution::Existing);
        }

        let identity = if update.field.is_identity() {
            coerce::text(update.value)
        } else {
            None
        };

        if let Some(vessel_id) = identity.as_deref() {
            if let Some(id) = self.reattach_candidate(vessel_id, update.timestamp_ms) {
                if let Some(track) = self.tracks.get_mut(&id) {
                    track.context = update.context.to_string();
                }
                self.context_index
                    .insert(update.context.to_string(), id.clone());
                self.stats.reattached += 1;
                return (id, Resolution::Reattached);
            }
        }

        let base = identity.as_deref().unwrap_or(update.context);
        let id = self.insert_track(base, update.context, update.kind, update.timestamp_ms);
        (id, Resolution::Created)
    }

    fn is_implausible_jump(&self, id: &str, update: &TargetUpdate) -> bool {
        let Some(track) = self.tracks.get(id) else {
            return false;
        };
        if track.position.is_none() || track.last_position_at.is_none() {
            return false;
        }
        let (latitude, longitude) = position_value(update.field, update.value);
        match track.candidate_position(latitude, longitude) {
            Some(candidate) if latitude.is_some() || longitude.is_some() => {
                !self.is_plausible(track, &candidate, update.timestamp_ms)
            }
            _ => false,
        }
    }

    /// First track with this vessel id whose current position is plausible
    fn reattach_candidate(&self, vessel_id: &str, now_ms: u64) -> Option<String> {
        self.tracks_with_identity(vessel_id)
            .iter()
            .find(|id| {
                self.tracks.get(id.as_str()).map_or(false, |track| {
                    track
                        .position
                        .map_or(true, |p| self.is_plausible(track, &p, now_ms))
                })
            })
            .cloned()
    }

    /// Split a new track off `id`, carrying its vessel id and the jumped-to
    /// position, and point the update's context at it. The old track is left
    /// as it was.
    fn fork(&mut self, id: &str, update: &TargetUpdate) -> String {
        let (latitude, longitude) = position_value(update.field, update.value);
        let (vessel_id, candidate) = match self.tracks.get(id) {
            Some(track) => (
                track.vessel_id.clone(),
                track.candidate_position(latitude, longitude),
            ),
            None => (None, None),
        };
        let base = vessel_id.as_deref().unwrap_or(update.context);
        let new_id = self.insert_track(base, update.context, update.kind, update.timestamp_ms);
        if vessel_id.is_some() {
            self.set_vessel_id(&new_id, vessel_id);
        }
        // The other coordinate comes from the old track; the update's own
        // coordinate is applied afterwards.
        if let (Some(candidate), Some(track)) = (candidate, self.tracks.get_mut(&new_id)) {
            track.set_coordinates(Some(candidate.latitude), Some(candidate.longitude));
        }
        self.stats.forked += 1;
        new_id
    }

    fn insert_track(&mut self, base: &str, context: &str, kind: TrackKind, now_ms: u64) -> String {
        let id = self.next_id(base);
        let track = AisTrack::new(
            id.clone(),
            context,
            kind,
            now_ms,
            self.settings.trail_length,
        );
        self.tracks.insert(id.clone(), track);
        self.context_index.insert(context.to_string(), id.clone());
        self.stats.created += 1;
        id
    }

    /// `base`, then `base-2`, `base-3`, ... skipping anything still live
    fn next_id(&mut self, base: &str) -> String {
        let counter = self.id_counters.entry(base.to_string()).or_insert(0);
        loop {
            *counter += 1;
            let candidate = if *counter == 1 {
                base.to_string()
            } else {
                format!("{}-{}", base, counter)
            };
            if !self.tracks.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    /// Move a track between identity sets
    fn set_vessel_id(&mut self, id: &str, vessel_id: Option<String>) {
        let Some(track) = self.tracks.get_mut(id) else {
            return;
        };
        if track.vessel_id == vessel_id {
            return;
        }
        let previous = std::mem::replace(&mut track.vessel_id, vessel_id.clone());
        if let Some(previous) = previous {
            self.unindex_identity(&previous, id);
        }
        if let Some(vessel_id) = vessel_id {
            let ids = self.identity_index.entry(vessel_id).or_default();
            if !ids.iter().any(|existing| existing == id) {
                ids.push(id.to_string());
            }
        }
    }

    fn unindex_identity(&mut self, vessel_id: &str, id: &str) {
        if let Some(ids) = self.identity_index.get_mut(vessel_id) {
            ids.retain(|existing| existing != id);
            if ids.is_empty() {
                self.identity_index.remove(vessel_id);
            }
        }
    }

    /// Apply the update's field to the resolved track
    fn apply_field(&mut self, id: &str, update: &TargetUpdate) -> bool {
        let now = update.timestamp_ms;
        let value = update.value;

        if update.field.is_identity() {
            // An empty identity never clears a known one
            let Some(vessel_id) = coerce::text(value) else {
                return false;
            };
            self.set_vessel_id(id, Some(vessel_id));
            if let Some(track) = self.tracks.get_mut(id) {
                track.last_update_at = now;
            }
            return true;
        }

        let settings = &self.settings;
        let Some(track) = self.tracks.get_mut(id) else {
            return false;
        };

        match update.field {
            FieldId::Latitude | FieldId::Longitude | FieldId::Position => {
                let (latitude, longitude) = position_value(update.field, value);
                if latitude.is_none() && longitude.is_none() {
                    return false;
                }
                track.set_coordinates(latitude, longitude);
                track.last_update_at = now;
                register_position_report(track, now, settings);
                return true;
            }
            FieldId::Name => track.name = coerce::text(value),
            FieldId::Callsign => track.callsign = coerce::text(value),
            FieldId::Destination => track.destination = coerce::text(value),
            FieldId::Beam => track.beam = coerce::number(value),
            FieldId::Length => track.length = coerce::number_or_member(value, &["overall", "hull"]),
            FieldId::Draft => {
                track.draft = coerce::number_or_member(value, &["current", "maximum"])
            }
            FieldId::Registration => track.registration = coerce::text(value),
            FieldId::NavState => track.nav_state = coerce::text_or_member(value, "value"),
            FieldId::Heading => track.heading = coerce::number(value).map(rad_to_deg),
            FieldId::CourseOverGround => {
                track.course_over_ground = coerce::number(value).map(rad_to_deg)
            }
            FieldId::SpeedOverGround => {
                track.speed_over_ground = coerce::number(value).map(|ms| ms * MS_TO_KN)
            }
            FieldId::RateOfTurn => {
                track.rate_of_turn = coerce::number(value).map(|r| r * RAD_S_TO_DEG_MIN)
            }
            FieldId::SpecialManeuver => track.special_maneuver = coerce::maneuver(value),
            FieldId::FromBow => track.from_bow = coerce::number(value),
            FieldId::FromCenter => track.from_center = coerce::number(value),
            FieldId::ShipType => track.ship_type = type_code(value),
            FieldId::AtonType => track.aton_type = type_code(value),
            FieldId::Virtual => track.is_virtual = coerce::flag(value),
            FieldId::OffPosition => track.off_position = coerce::flag(value),
            FieldId::AisClass => track.ais_class = coerce::ais_class(value),
            FieldId::Mmsi => return false,
        }
        track.last_update_at = now;
        true
    }

    /// Re-evaluate every track's status and remove those past their class
    /// removal threshold. Running it twice at the same `now_ms` is a no-op
    /// the second time.
    pub fn sweep(&mut self, now_ms: u64) -> SweepReport {
        let mut report = SweepReport::default();

        for track in self.tracks.values_mut() {
            let thresholds = self.settings.thresholds(track.ais_class);
            let age = track.age_secs(now_ms);

            let status = if age > thresholds.remove_after_secs {
                report.removed.push(track.id.clone());
                continue;
            } else if age > thresholds.lost_after_secs {
                Some(TrackStatus::Lost)
            } else {
                confirmation_status(track, age, thresholds)
            };

            if let Some(status) = status {
                if status != track.status {
                    track.status = status;
                    report.status_changes += 1;
                }
            }
        }

        for id in &report.removed {
            self.remove(id);
        }

        report
    }

    fn remove(&mut self, id: &str) {
        let Some(track) = self.tracks.remove(id) else {
            return;
        };
        // The track may have been reattached under other contexts since creation
        self.context_index.retain(|_, track_id| track_id != id);
        if let Some(vessel_id) = &track.vessel_id {
            self.unindex_identity(vessel_id, id);
        }
        self.stats.removed += 1;
    }

    /// Check that both indices only reference live tracks
    #[cfg(test)]
    fn indices_consistent(&self) -> bool {
        self.context_index
            .values()
            .all(|id| self.tracks.contains_key(id))
            && self.identity_index.iter().all(|(vessel_id, ids)| {
                !ids.is_empty()
                    && ids.iter().all(|id| {
                        self.tracks
                            .get(id)
                            .map_or(false, |t| t.vessel_id.as_deref() == Some(vessel_id))
                    })
            })
    }
}

/// Coordinates carried by a position field
fn position_value(field: FieldId, value: &Value) -> (Option<f64>, Option<f64>) {
    match field {
        FieldId::Latitude => (coerce::latitude(value), None),
        FieldId::Longitude => (None, coerce::longitude(value)),
        FieldId::Position => coerce::position(value),
        _ => (None, None),
    }
}

fn type_code(value: &Value) -> Option<u16> {
    coerce::number_or_member(value, &["id"])
        .filter(|code| *code >= 0.0 && *code <= u16::MAX as f64)
        .map(|code| code as u16)
}

/// Count the report (unless it is a rapid duplicate), extend the trail and
/// re-evaluate confirmation. Waits until both coordinates are known.
fn register_position_report(track: &mut AisTrack, now_ms: u64, settings: &TrackerSettings) {
    let Some(position) = track.position else {
        return;
    };

    let counted = track
        .last_position_report_at
        .map_or(true, |last| now_ms.saturating_sub(last) > settings.dedup_interval_ms);
    if counted {
        track.message_count += 1;
        track.last_position_report_at = Some(now_ms);
    }

    track.last_position_at = Some(now_ms);
    track.trail.add_point(super::trail::TrailPoint {
        latitude: position.latitude,
        longitude: position.longitude,
        timestamp: now_ms,
    });

    try_confirm(track, now_ms, settings.thresholds(track.ais_class));
}

fn try_confirm(track: &mut AisTrack, now_ms: u64, thresholds: &ClassThresholds) {
    let age = track.age_secs(now_ms);
    if let Some(status) = confirmation_status(track, age, thresholds) {
        track.status = status;
    }
}

/// Confirmed with enough recent reports, unconfirmed while not yet lost,
/// otherwise left alone.
fn confirmation_status(
    track: &AisTrack,
    age_secs: f64,
    thresholds: &ClassThresholds,
) -> Option<TrackStatus> {
    if track.message_count >= thresholds.confirm_after_messages
        && age_secs <= thresholds.confirm_max_age_secs
    {
        Some(TrackStatus::Confirmed)
    } else if age_secs <= thresholds.lost_after_secs {
        Some(TrackStatus::Unconfirmed)
    } else {
        None
    }
}
