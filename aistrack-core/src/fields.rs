//! Recognised update fields
//!
//! The feed identifies fields by Signal K path. Paths are mapped once onto a
//! closed enum; everything downstream dispatches on [`FieldId`] and an
//! unrecognised path simply has no `FieldId`.

use std::fmt;

/// Optional namespace prefix stripped before matching
const VALUES_PREFIX: &str = "values.";

/// A recognised field of a track or of own ship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldId {
    Mmsi,
    Name,
    Callsign,
    Destination,
    Beam,
    Length,
    Draft,
    Registration,
    NavState,
    Heading,
    CourseOverGround,
    SpeedOverGround,
    RateOfTurn,
    SpecialManeuver,
    FromBow,
    FromCenter,
    ShipType,
    AtonType,
    Virtual,
    OffPosition,
    AisClass,
    Latitude,
    Longitude,
    /// Both coordinates in one `{latitude, longitude}` object
    Position,
}

impl FieldId {
    /// Map a Signal K path onto a field, `None` for anything unrecognised.
    pub fn from_path(path: &str) -> Option<FieldId> {
        let path = path.trim();
        let path = path.strip_prefix(VALUES_PREFIX).unwrap_or(path);
        let field = match path {
            "mmsi" => FieldId::Mmsi,
            "name" => FieldId::Name,
            "communication.callsignVhf" => FieldId::Callsign,
            "navigation.destination.commonName" => FieldId::Destination,
            "design.beam" => FieldId::Beam,
            "design.length" => FieldId::Length,
            "design.draft" => FieldId::Draft,
            "registrations.imo" => FieldId::Registration,
            "navigation.state" => FieldId::NavState,
            "navigation.headingTrue" => FieldId::Heading,
            "navigation.courseOverGroundTrue" => FieldId::CourseOverGround,
            "navigation.speedOverGround" => FieldId::SpeedOverGround,
            "navigation.rateOfTurn" => FieldId::RateOfTurn,
            "navigation.specialManeuver" => FieldId::SpecialManeuver,
            "sensors.ais.fromBow" => FieldId::FromBow,
            "sensors.ais.fromCenter" => FieldId::FromCenter,
            "design.aisShipType" => FieldId::ShipType,
            "atonType" | "atonType.id" => FieldId::AtonType,
            "virtual" => FieldId::Virtual,
            "offPosition" => FieldId::OffPosition,
            "sensors.ais.class" => FieldId::AisClass,
            "navigation.position.latitude" => FieldId::Latitude,
            "navigation.position.longitude" => FieldId::Longitude,
            "navigation.position" => FieldId::Position,
            _ => return None,
        };
        Some(field)
    }

    /// Whether this field carries (part of) a position report
    pub fn is_position(&self) -> bool {
        matches!(
            self,
            FieldId::Latitude | FieldId::Longitude | FieldId::Position
        )
    }

    /// Whether this field is the vessel identity
    pub fn is_identity(&self) -> bool {
        *self == FieldId::Mmsi
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_paths() {
        assert_eq!(FieldId::from_path("mmsi"), Some(FieldId::Mmsi));
        assert_eq!(
            FieldId::from_path("navigation.position.latitude"),
            Some(FieldId::Latitude)
        );
        assert_eq!(FieldId::from_path("atonType.id"), Some(FieldId::AtonType));
        assert_eq!(FieldId::from_path("atonType"), Some(FieldId::AtonType));
        assert_eq!(
            FieldId::from_path("values.navigation.headingTrue"),
            Some(FieldId::Heading)
        );
    }

    #[test]
    fn test_unknown_paths() {
        assert_eq!(FieldId::from_path("environment.wind.speedTrue"), None);
        assert_eq!(FieldId::from_path(""), None);
        assert_eq!(FieldId::from_path("navigation.position.altitude"), None);
    }

    #[test]
    fn test_classification() {
        assert!(FieldId::Latitude.is_position());
        assert!(FieldId::Position.is_position());
        assert!(!FieldId::Heading.is_position());
        assert!(FieldId::Mmsi.is_identity());
        assert!(!FieldId::Name.is_identity());
    }
}
