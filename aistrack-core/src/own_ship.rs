//! Own-Ship State
//!
//! Position, heading, course and speed of this vessel, fed from the same
//! update stream as the targets. One implicit instance, no identity
//! resolution and no aging.

use serde::Serialize;
use serde_json::Value;

use crate::coerce;
use crate::fields::FieldId;
use crate::geo::{rad_to_deg, Position, MS_TO_KN};

/// Own ship navigation state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnShipState {
    pub position: Option<Position>,
    /// Degrees true
    pub heading: Option<f64>,
    /// Degrees true
    pub course_over_ground: Option<f64>,
    /// Knots
    pub speed_over_ground: Option<f64>,
    /// Epoch ms of the last accepted update
    pub last_update_at: Option<u64>,
    #[serde(skip)]
    latitude: Option<f64>,
    #[serde(skip)]
    longitude: Option<f64>,
}

impl OwnShipState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one field. Returns whether the state changed; fields own ship
    /// does not track are ignored.
    pub fn apply(&mut self, field: FieldId, value: &Value, timestamp_ms: u64) -> bool {
        let before = self.clone();

        match field {
            FieldId::Latitude => self.merge_position(coerce::latitude(value), None),
            FieldId::Longitude => self.merge_position(None, coerce::longitude(value)),
            FieldId::Position => {
                let (latitude, longitude) = coerce::position(value);
                self.merge_position(latitude, longitude)
            }
            FieldId::Heading => self.heading = coerce::number(value).map(rad_to_deg),
            FieldId::CourseOverGround => {
                self.course_over_ground = coerce::number(value).map(rad_to_deg)
            }
            FieldId::SpeedOverGround => {
                self.speed_over_ground = coerce::number(value).map(|ms| ms * MS_TO_KN)
            }
            _ => return false,
        }

        if *self == before {
            return false;
        }
        self.last_update_at = Some(timestamp_ms);
        true
    }

    fn merge_position(&mut self, latitude: Option<f64>, longitude: Option<f64>) {
        if latitude.is_some() {
            self.latitude = latitude;
        }
        if longitude.is_some() {
            self.longitude = longitude;
        }
        if let (Some(lat), Some(lon)) = (self.latitude, self.longitude) {
            self.position = Some(Position::new(lat, lon));
        }
    }
}
