//! Published snapshot cells.
//!
//! The tracker overwrites two latest-value cells: the target list and own
//! ship. Readers clone a [`SnapshotReceiver`] and never hold up the tracker.

use std::sync::Arc;

use aistrack_core::{AisTrack, OwnShipState, TrackStats};
use serde::Serialize;
use tokio::io::{AsyncWriteExt, Stdout};
use tokio::sync::watch;
use tokio_graceful_shutdown::SubsystemHandle;

/// Target list as last published
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSnapshot {
    /// Epoch ms of publication
    pub timestamp: u64,
    pub targets: Vec<AisTrack>,
    pub stats: TrackStats,
}

/// Combined message for stream consumers
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMessage<'a> {
    pub own_ship: &'a OwnShipState,
    pub targets: &'a [AisTrack],
    pub stats: TrackStats,
}

/// Write side, owned by the tracker
#[derive(Debug)]
pub struct SnapshotPublisher {
    targets_tx: watch::Sender<Arc<TargetSnapshot>>,
    own_ship_tx: watch::Sender<OwnShipState>,
}

/// Read side
#[derive(Debug, Clone)]
pub struct SnapshotReceiver {
    targets_rx: watch::Receiver<Arc<TargetSnapshot>>,
    own_ship_rx: watch::Receiver<OwnShipState>,
}

pub fn snapshot_channel() -> (SnapshotPublisher, SnapshotReceiver) {
    let (targets_tx, targets_rx) = watch::channel(Arc::new(TargetSnapshot::default()));
    let (own_ship_tx, own_ship_rx) = watch::channel(OwnShipState::default());
    (
        SnapshotPublisher {
            targets_tx,
            own_ship_tx,
        },
        SnapshotReceiver {
            targets_rx,
            own_ship_rx,
        },
    )
}

impl SnapshotPublisher {
    pub fn publish_targets(&self, snapshot: TargetSnapshot) {
        self.targets_tx.send_replace(Arc::new(snapshot));
    }

    pub fn publish_own_ship(&self, own_ship: OwnShipState) {
        self.own_ship_tx.send_replace(own_ship);
    }

    pub fn subscribe(&self) -> SnapshotReceiver {
        SnapshotReceiver {
            targets_rx: self.targets_tx.subscribe(),
            own_ship_rx: self.own_ship_tx.subscribe(),
        }
    }
}

impl SnapshotReceiver {
    pub fn targets(&self) -> Arc<TargetSnapshot> {
        self.targets_rx.borrow().clone()
    }

    pub fn own_ship(&self) -> OwnShipState {
        self.own_ship_rx.borrow().clone()
    }

    /// Wait until either cell is published again. Errors once the tracker
    /// is gone.
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        tokio::select! {
            r = self.targets_rx.changed() => r,
            r = self.own_ship_rx.changed() => r,
        }
    }

    /// Current state of both cells as one JSON message, marking both seen
    pub fn message_json(&mut self) -> Result<String, serde_json::Error> {
        let targets = self.targets_rx.borrow_and_update().clone();
        let own_ship = self.own_ship_rx.borrow_and_update().clone();
        serde_json::to_string(&SnapshotMessage {
            own_ship: &own_ship,
            targets: &targets.targets,
            stats: targets.stats,
        })
    }
}

/// Write every published change to stdout as one JSON line
pub async fn write_snapshots(
    mut snapshots: SnapshotReceiver,
    subsys: SubsystemHandle,
) -> Result<(), std::io::Error> {
    log::info!("Output: Starting snapshot output task");
    let mut stdout = tokio::io::stdout();

    loop {
        tokio::select! {
            _ = subsys.on_shutdown_requested() => {
                log::info!("Output: Shutdown requested");
                break;
            }
            r = snapshots.changed() => {
                if r.is_err() {
                    log::debug!("Output: Snapshot channel closed");
                    break;
                }
                write_line(&mut stdout, &mut snapshots).await?;
            }
        }
    }
    stdout.flush().await
}

async fn write_line(
    stdout: &mut Stdout,
    snapshots: &mut SnapshotReceiver,
) -> Result<(), std::io::Error> {
    let mut line = snapshots.message_json()?;
    line.push('\n');
    stdout.write_all(line.as_bytes()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use aistrack_core::geo::Position;

    #[tokio::test]
    async fn test_receiver_sees_latest_value() {
        let (publisher, mut receiver) = snapshot_channel();
        assert!(receiver.targets().targets.is_empty());

        let mut own_ship = OwnShipState::default();
        own_ship.position = Some(Position::new(52.0, 4.0));
        publisher.publish_own_ship(own_ship.clone());
        receiver.changed().await.unwrap();
        assert_eq!(receiver.own_ship(), own_ship);

        let json: serde_json::Value =
            serde_json::from_str(&receiver.message_json().unwrap()).unwrap();
        assert_eq!(json["ownShip"]["position"]["latitude"], 52.0);
        assert_eq!(json["targets"], serde_json::json!([]));
        assert_eq!(json["stats"]["created"], 0);
    }

    #[tokio::test]
    async fn test_publish_without_receivers() {
        let (publisher, receiver) = snapshot_channel();
        drop(receiver);
        publisher.publish_targets(TargetSnapshot {
            timestamp: 5,
            ..Default::default()
        });
        assert_eq!(publisher.subscribe().targets().timestamp, 5);
    }

    #[tokio::test]
    async fn test_changed_errors_when_publisher_dropped() {
        let (publisher, mut receiver) = snapshot_channel();
        drop(publisher);
        assert!(receiver.changed().await.is_err());
    }
}
