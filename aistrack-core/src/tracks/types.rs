//! Track Type Definitions
//!
//! Published track representation plus the class-specific thresholds that
//! drive confirmation and aging.

use serde::{Deserialize, Serialize};

use super::cpa::RelativeMotion;
use super::trail::Trail;
use crate::geo::Position;

/// What kind of AIS object a track represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackKind {
    Vessel,
    AidToNavigation,
}

/// Track confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackStatus {
    /// Too few or too stale position reports
    Unconfirmed,
    /// Reporting regularly
    Confirmed,
    /// Silent past the lost threshold, awaiting removal
    Lost,
}

impl Default for TrackStatus {
    fn default() -> Self {
        TrackStatus::Unconfirmed
    }
}

/// AIS transceiver class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AisClass {
    A,
    B,
    #[serde(rename = "unknown")]
    Unknown,
}

impl Default for AisClass {
    fn default() -> Self {
        AisClass::Unknown
    }
}

/// Per-class confirmation, aging and plausibility limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassThresholds {
    /// Counted position reports needed for confirmation
    pub confirm_after_messages: u32,
    /// Newest report must be at most this old (s) to confirm
    pub confirm_max_age_secs: f64,
    /// Silence (s) after which a track is lost
    pub lost_after_secs: f64,
    /// Silence (s) after which a track is removed
    pub remove_after_secs: f64,
    /// Speed ceiling (kn) used by the plausibility check
    pub max_speed_kn: f64,
}

impl ClassThresholds {
    pub fn class_a() -> Self {
        ClassThresholds {
            confirm_after_messages: 2,
            confirm_max_age_secs: 30.0,
            lost_after_secs: 60.0,
            remove_after_secs: 180.0,
            max_speed_kn: 70.0,
        }
    }

    pub fn class_b() -> Self {
        ClassThresholds {
            confirm_after_messages: 3,
            confirm_max_age_secs: 90.0,
            lost_after_secs: 180.0,
            remove_after_secs: 600.0,
            max_speed_kn: 50.0,
        }
    }
}

/// Track store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackerSettings {
    /// Thresholds for class A transceivers
    pub class_a: ClassThresholds,
    /// Thresholds for class B and unknown transceivers
    pub class_b: ClassThresholds,
    /// Multiple of the class speed ceiling tolerated before forking
    pub plausibility_factor: f64,
    /// Maximum retained trail points per track
    pub trail_length: usize,
    /// Position reports closer together than this (ms) count once
    pub dedup_interval_ms: u64,
    /// Period of the aging sweep (ms)
    pub sweep_interval_ms: u64,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        TrackerSettings {
            class_a: ClassThresholds::class_a(),
            class_b: ClassThresholds::class_b(),
            plausibility_factor: 2.0,
            trail_length: 120,
            dedup_interval_ms: 500,
            sweep_interval_ms: 1000,
        }
    }
}

impl TrackerSettings {
    /// Thresholds that apply to a transceiver class
    pub fn thresholds(&self, class: AisClass) -> &ClassThresholds {
        match class {
            AisClass::A => &self.class_a,
            AisClass::B | AisClass::Unknown => &self.class_b,
        }
    }
}

/// One AIS track
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AisTrack {
    /// Stable identifier, never reused within a session
    pub id: String,
    /// Most recent upstream context resolved to this track
    pub context: String,
    pub kind: TrackKind,
    pub status: TrackStatus,
    pub ais_class: AisClass,
    /// Deduplicated position reports
    pub message_count: u32,
    /// MMSI
    pub vessel_id: Option<String>,

    pub name: Option<String>,
    pub callsign: Option<String>,
    pub destination: Option<String>,
    /// Meters
    pub beam: Option<f64>,
    /// Meters
    pub length: Option<f64>,
    /// Meters
    pub draft: Option<f64>,
    /// IMO number
    pub registration: Option<String>,
    pub nav_state: Option<String>,
    /// Degrees true
    pub heading: Option<f64>,
    /// Degrees true
    pub course_over_ground: Option<f64>,
    /// Knots
    pub speed_over_ground: Option<f64>,
    /// Degrees per minute, positive to starboard
    pub rate_of_turn: Option<f64>,
    pub special_maneuver: Option<bool>,
    /// Antenna offset from bow (m)
    pub from_bow: Option<f64>,
    /// Antenna offset from centerline (m)
    pub from_center: Option<f64>,
    pub ship_type: Option<u16>,
    pub aton_type: Option<u16>,
    #[serde(rename = "virtual")]
    pub is_virtual: Option<bool>,
    pub off_position: Option<bool>,

    /// Set once both coordinates are known
    pub position: Option<Position>,
    #[serde(skip)]
    pub(crate) latitude: Option<f64>,
    #[serde(skip)]
    pub(crate) longitude: Option<f64>,

    /// Epoch ms of creation
    pub created_at: u64,
    /// Epoch ms of the last accepted field update
    pub last_update_at: u64,
    /// Epoch ms of the last position update
    pub last_position_at: Option<u64>,
    /// Epoch ms of the last counted (deduplicated) position report
    pub last_position_report_at: Option<u64>,

    pub trail: Trail,

    /// Range, bearing and CPA relative to own ship; only filled in published copies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative: Option<RelativeMotion>,
}

impl AisTrack {
    pub(crate) fn new(
        id: String,
        context: &str,
        kind: TrackKind,
        timestamp: u64,
        trail_length: usize,
    ) -> Self {
        AisTrack {
            id,
            context: context.to_string(),
            kind,
            status: TrackStatus::Unconfirmed,
            ais_class: AisClass::Unknown,
            message_count: 0,
            vessel_id: None,
            name: None,
            callsign: None,
            destination: None,
            beam: None,
            length: None,
            draft: None,
            registration: None,
            nav_state: None,
            heading: None,
            course_over_ground: None,
            speed_over_ground: None,
            rate_of_turn: None,
            special_maneuver: None,
            from_bow: None,
            from_center: None,
            ship_type: None,
            aton_type: None,
            is_virtual: None,
            off_position: None,
            position: None,
            latitude: None,
            longitude: None,
            created_at: timestamp,
            last_update_at: timestamp,
            last_position_at: None,
            last_position_report_at: None,
            trail: Trail::new(trail_length),
            relative: None,
        }
    }

    /// Merge the given coordinates into the current ones
    pub(crate) fn set_coordinates(&mut self, latitude: Option<f64>, longitude: Option<f64>) {
        if latitude.is_some() {
            self.latitude = latitude;
        }
        if longitude.is_some() {
            self.longitude = longitude;
        }
        self.position = merged_position(self.latitude, self.longitude, None, None);
    }

    /// Position the track would have after merging the given coordinates
    pub(crate) fn candidate_position(
        &self,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Option<Position> {
        merged_position(self.latitude, self.longitude, latitude, longitude)
    }

    /// Timestamp aging is measured from
    pub fn aging_base(&self) -> u64 {
        self.last_position_at.unwrap_or(self.last_update_at)
    }

    /// Seconds since the aging base, zero if `now_ms` lies before it
    pub fn age_secs(&self, now_ms: u64) -> f64 {
        now_ms.saturating_sub(self.aging_base()) as f64 / 1000.0
    }
}

fn merged_position(
    latitude: Option<f64>,
    longitude: Option<f64>,
    new_latitude: Option<f64>,
    new_longitude: Option<f64>,
) -> Option<Position> {
    match (new_latitude.or(latitude), new_longitude.or(longitude)) {
        (Some(lat), Some(lon)) => Some(Position::new(lat, lon)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_by_class() {
        let settings = TrackerSettings::default();
        assert_eq!(settings.thresholds(AisClass::A).confirm_after_messages, 2);
        assert_eq!(settings.thresholds(AisClass::B).remove_after_secs, 600.0);
        assert_eq!(settings.thresholds(AisClass::Unknown), &settings.class_b);
    }

    #[test]
    fn test_settings_partial_json() {
        let settings: TrackerSettings =
            serde_json::from_str(r#"{"trailLength": 30, "classA": {"confirmAfterMessages": 4, "confirmMaxAgeSecs": 20, "lostAfterSecs": 40, "removeAfterSecs": 100, "maxSpeedKn": 60}}"#)
                .unwrap();
        assert_eq!(settings.trail_length, 30);
        assert_eq!(settings.class_a.confirm_after_messages, 4);
        assert_eq!(settings.class_b, ClassThresholds::class_b());
        assert_eq!(settings.dedup_interval_ms, 500);
    }

    #[test]
    fn test_coordinate_merge() {
        let mut track = AisTrack::new("t".into(), "vessels.t", TrackKind::Vessel, 0, 10);
        track.set_coordinates(Some(10.0), None);
        assert!(track.position.is_none());
        assert_eq!(
            track.candidate_position(None, Some(20.0)),
            Some(Position::new(10.0, 20.0))
        );
        track.set_coordinates(None, Some(20.0));
        assert_eq!(track.position, Some(Position::new(10.0, 20.0)));
        track.set_coordinates(Some(11.0), None);
        assert_eq!(track.position, Some(Position::new(11.0, 20.0)));
    }

    #[test]
    fn test_serialized_names() {
        let track = AisTrack::new("t".into(), "atons.t", TrackKind::AidToNavigation, 5, 10);
        let json = serde_json::to_value(&track).unwrap();
        assert_eq!(json["kind"], "aidToNavigation");
        assert_eq!(json["status"], "unconfirmed");
        assert_eq!(json["aisClass"], "unknown");
        assert!(json.get("latitude").is_none());
        assert!(json.get("relative").is_none());
        assert!(json["virtual"].is_null());
    }
}
