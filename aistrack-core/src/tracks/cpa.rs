//! Relative Motion and CPA/TCPA
//!
//! Range and bearing of a track from own ship, and Closest Point of Approach
//! (CPA) with Time to CPA (TCPA) by the relative velocity method.

use serde::Serialize;

use super::types::AisTrack;
use crate::geo::{local_offset_nm, Position};
use crate::own_ship::OwnShipState;

/// Track position and motion relative to own ship
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelativeMotion {
    /// Great-circle range in nautical miles
    pub range_nm: f64,
    /// True bearing from own ship in degrees (0-360)
    pub bearing_deg: f64,
    /// Closest point of approach in nautical miles
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpa_nm: Option<f64>,
    /// Time to CPA in minutes (negative = past)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tcpa_minutes: Option<f64>,
}

/// Velocity (east, north) in knots
type Velocity = (f64, f64);

fn velocity(speed_kn: Option<f64>, course_deg: Option<f64>) -> Option<Velocity> {
    let speed = speed_kn?;
    let course = course_deg?.to_radians();
    Some((speed * course.sin(), speed * course.cos()))
}

/// Result of CPA/TCPA calculation
#[derive(Debug, Clone, Copy)]
pub struct CpaResult {
    /// Closest point of approach in nautical miles
    pub cpa_nm: f64,
    /// Time to CPA in hours (negative = past)
    pub tcpa_hours: f64,
}

/// Calculate CPA and TCPA between two moving positions
pub fn calculate_cpa_tcpa(
    own: &Position,
    own_velocity: Velocity,
    target: &Position,
    target_velocity: Velocity,
) -> CpaResult {
    // Relative position (target relative to own ship at origin)
    let (rx, ry) = local_offset_nm(own, target);

    // Relative velocity (target velocity - own ship velocity)
    let rvx = target_velocity.0 - own_velocity.0;
    let rvy = target_velocity.1 - own_velocity.1;

    let rv_dot = rx * rvx + ry * rvy;
    let v_sq = rvx * rvx + rvy * rvy;

    // Same course and speed: distance never changes
    if v_sq < 1e-9 {
        return CpaResult {
            cpa_nm: (rx * rx + ry * ry).sqrt(),
            tcpa_hours: 0.0,
        };
    }

    let tcpa = -rv_dot / v_sq;
    let cpa_x = rx + rvx * tcpa;
    let cpa_y = ry + rvy * tcpa;

    CpaResult {
        cpa_nm: (cpa_x * cpa_x + cpa_y * cpa_y).sqrt(),
        tcpa_hours: tcpa,
    }
}

/// Relative motion of a track, `None` until both positions are known
pub fn relative_motion(own_ship: &OwnShipState, track: &AisTrack) -> Option<RelativeMotion> {
    let own = own_ship.position?;
    let target = track.position?;

    let danger = velocity(own_ship.speed_over_ground, own_ship.course_over_ground)
        .zip(velocity(track.speed_over_ground, track.course_over_ground))
        .map(|(own_v, target_v)| calculate_cpa_tcpa(&own, own_v, &target, target_v));

    Some(RelativeMotion {
        range_nm: own.distance_nm(&target),
        bearing_deg: own.bearing_to(&target),
        cpa_nm: danger.map(|d| d.cpa_nm),
        tcpa_minutes: danger.map(|d| d.tcpa_hours * 60.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracks::TrackKind;

    #[test]
    fn test_head_on_collision() {
        // Target 1 nm due north heading south at 10 kn, own ship north at 5 kn
        let own = Position::new(0.0, 0.0);
        let target = Position::new(1.0 / 60.0, 0.0);
        let result = calculate_cpa_tcpa(&own, (0.0, 5.0), &target, (0.0, -10.0));

        // Closing at 15 kn over 1 nm = 4 minutes
        assert!((result.tcpa_hours * 60.0 - 4.0).abs() < 0.01);
        assert!(result.cpa_nm < 0.001);
    }

    #[test]
    fn test_parallel_course() {
        let own = Position::new(0.0, 0.0);
        let target = Position::new(0.0, 0.5 / 60.0);
        let result = calculate_cpa_tcpa(&own, (0.0, 6.0), &target, (0.0, 6.0));

        assert_eq!(result.tcpa_hours, 0.0);
        assert!((result.cpa_nm - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_receding_target() {
        let own = Position::new(0.0, 0.0);
        let target = Position::new(1.0 / 60.0, 0.0);
        let result = calculate_cpa_tcpa(&own, (0.0, 0.0), &target, (0.0, 8.0));
        assert!(result.tcpa_hours < 0.0);
    }

    #[test]
    fn test_relative_motion_needs_positions() {
        let mut own_ship = OwnShipState::default();
        let mut track = AisTrack::new("t".into(), "vessels.t", TrackKind::Vessel, 0, 10);
        assert!(relative_motion(&own_ship, &track).is_none());

        own_ship.position = Some(Position::new(0.0, 0.0));
        track.set_coordinates(Some(0.0), Some(1.0 / 60.0));
        let motion = relative_motion(&own_ship, &track).unwrap();
        assert!((motion.range_nm - 1.0).abs() < 0.01);
        assert!((motion.bearing_deg - 90.0).abs() < 1e-6);
        assert!(motion.cpa_nm.is_none());
        assert!(motion.tcpa_minutes.is_none());

        own_ship.speed_over_ground = Some(0.0);
        own_ship.course_over_ground = Some(0.0);
        track.speed_over_ground = Some(6.0);
        track.course_over_ground = Some(270.0);
        let motion = relative_motion(&own_ship, &track).unwrap();
        assert!((motion.tcpa_minutes.unwrap() - 10.0).abs() < 0.1);
        assert!(motion.cpa_nm.unwrap() < 0.01);
    }
}
