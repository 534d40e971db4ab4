//! Update routing
//!
//! Classifies an update by its context: own ship, another vessel, or an aid
//! to navigation. Everything else (base stations, aircraft, ...) is dropped.

use crate::tracks::TrackKind;

const VESSELS_PREFIX: &str = "vessels.";
const ATONS_PREFIX: &str = "atons.";

/// Implicit identifiers that always denote own ship
const SELF_CONTEXTS: [&str; 2] = ["vessels.self", "self"];

/// Where an update should go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    OwnShip,
    Target(TrackKind),
    Drop,
}

/// Context classifier.
///
/// Holds only configuration: the optional fully qualified self context
/// (e.g. `vessels.urn:mrn:imo:mmsi:244000000`), which upstream may use
/// instead of `vessels.self`.
#[derive(Debug, Clone, Default)]
pub struct Router {
    self_context: Option<String>,
}

impl Router {
    pub fn new(self_context: Option<String>) -> Self {
        Router {
            self_context: self_context
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        }
    }

    pub fn self_context(&self) -> Option<&str> {
        self.self_context.as_deref()
    }

    /// Classify a context
    pub fn route(&self, context: &str) -> Route {
        let context = context.trim();
        if SELF_CONTEXTS.contains(&context) || self.self_context.as_deref() == Some(context) {
            return Route::OwnShip;
        }

        if has_id_after(context, VESSELS_PREFIX) {
            Route::Target(TrackKind::Vessel)
        } else if has_id_after(context, ATONS_PREFIX) {
            Route::Target(TrackKind::AidToNavigation)
        } else {
            Route::Drop
        }
    }
}

fn has_id_after(context: &str, prefix: &str) -> bool {
    context
        .strip_prefix(prefix)
        .map_or(false, |rest| !rest.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_contexts() {
        let router = Router::new(Some("vessels.urn:mrn:imo:mmsi:244000000".to_string()));
        assert_eq!(router.route("vessels.self"), Route::OwnShip);
        assert_eq!(router.route("self"), Route::OwnShip);
        assert_eq!(
            router.route("vessels.urn:mrn:imo:mmsi:244000000"),
            Route::OwnShip
        );
    }

    #[test]
    fn test_targets() {
        let router = Router::default();
        assert_eq!(
            router.route("vessels.urn:mrn:imo:mmsi:244123456"),
            Route::Target(TrackKind::Vessel)
        );
        assert_eq!(
            router.route("atons.urn:mrn:imo:mmsi:992446001"),
            Route::Target(TrackKind::AidToNavigation)
        );
    }

    #[test]
    fn test_dropped() {
        let router = Router::new(Some("   ".to_string()));
        assert_eq!(router.self_context(), None);
        assert_eq!(router.route("shore.basestations.urn:mrn:imo:mmsi:002442000"), Route::Drop);
        assert_eq!(router.route("aircraft.urn:mrn:imo:mmsi:111232511"), Route::Drop);
        assert_eq!(router.route("vessels."), Route::Drop);
        assert_eq!(router.route(""), Route::Drop);
    }
}
