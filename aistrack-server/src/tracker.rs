//! Tracker task: the single owner of the [`AisEngine`].
//!
//! ```text
//! ┌────────────┐  TrackerCommand  ┌──────────────────────────┐
//! │ feed(s)    │ ───── mpsc ────► │ Tracker                  │
//! └────────────┘                  │  - AisEngine             │  watch
//!                 sweep interval  │  - handle / sweep        │ ──────► SnapshotReceiver
//!                ───────────────► │  - publish on change     │
//!                                 └──────────────────────────┘
//! ```
//!
//! Updates and sweeps are drained by one `select!` loop, so they never
//! interleave.

use std::time::Duration;

use aistrack_core::{
    AisEngine, HandleOutcome, Resolution, SweepReport, TrackerSettings, Update,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_graceful_shutdown::SubsystemHandle;

use crate::now_ms;
use crate::snapshot::{snapshot_channel, SnapshotPublisher, SnapshotReceiver, TargetSnapshot};

const MAILBOX_SIZE: usize = 1024;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Tracker mailbox is closed")]
    MailboxClosed,
}

#[derive(Debug)]
pub enum TrackerCommand {
    /// Apply one feed update
    Update(Update),
    /// Replace the tracker settings
    Settings(TrackerSettings),
}

/// Sender side of the tracker mailbox
#[derive(Debug, Clone)]
pub struct TrackerHandle {
    tx: mpsc::Sender<TrackerCommand>,
}

impl TrackerHandle {
    #[cfg(test)]
    pub(crate) fn from_sender(tx: mpsc::Sender<TrackerCommand>) -> Self {
        TrackerHandle { tx }
    }

    pub async fn send_update(&self, update: Update) -> Result<(), TrackerError> {
        self.send(TrackerCommand::Update(update)).await
    }

    pub async fn send(&self, command: TrackerCommand) -> Result<(), TrackerError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| TrackerError::MailboxClosed)
    }
}

/// Time base for the aging sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SweepClock {
    /// Wall clock, matching receipt-stamped updates
    Wall,
    /// Newest feed timestamp seen so far, for replayed feeds
    Source { latest_ms: u64 },
}

pub struct Tracker {
    engine: AisEngine,
    rx: mpsc::Receiver<TrackerCommand>,
    publisher: SnapshotPublisher,
    sweep_interval: Duration,
    clock: SweepClock,
}

impl Tracker {
    /// Create the tracker with its mailbox handle and snapshot receiver.
    ///
    /// With `source_time` the sweep ages tracks against the feed's own
    /// timestamps instead of the wall clock.
    pub fn new(
        settings: TrackerSettings,
        self_context: Option<String>,
        source_time: bool,
    ) -> (Tracker, TrackerHandle, SnapshotReceiver) {
        let (tx, rx) = mpsc::channel(MAILBOX_SIZE);
        let (publisher, receiver) = snapshot_channel();
        let tracker = Tracker {
            sweep_interval: Duration::from_millis(settings.sweep_interval_ms),
            engine: AisEngine::new(settings, self_context),
            rx,
            publisher,
            clock: if source_time {
                SweepClock::Source { latest_ms: 0 }
            } else {
                SweepClock::Wall
            },
        };
        (tracker, TrackerHandle { tx }, receiver)
    }

    pub fn engine(&self) -> &AisEngine {
        &self.engine
    }

    /// Run until shutdown is requested or every handle is dropped.
    pub async fn run(mut self, subsys: SubsystemHandle) -> Result<(), TrackerError> {
        log::info!("Tracker: Starting tracker task");

        let mut sweep_timer = interval(self.sweep_interval);
        sweep_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = subsys.on_shutdown_requested() => {
                    log::info!("Tracker: Shutdown requested");
                    break;
                }
                command = self.rx.recv() => match command {
                    Some(command) => {
                        self.handle_command(command);
                        if sweep_timer.period() != self.sweep_interval {
                            sweep_timer = interval(self.sweep_interval);
                            sweep_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
                        }
                    }
                    None => {
                        log::info!("Tracker: All feeds closed");
                        break;
                    }
                },
                _ = sweep_timer.tick() => {
                    let now = self.sweep_now();
                    self.sweep(now);
                }
            }
        }

        log::info!("Tracker: Tracker task finished");
        Ok(())
    }

    pub fn handle_command(&mut self, command: TrackerCommand) {
        match command {
            TrackerCommand::Update(update) => self.handle_update(&update),
            TrackerCommand::Settings(settings) => {
                log::info!("Tracker: Settings updated");
                self.sweep_interval = Duration::from_millis(settings.sweep_interval_ms);
                self.engine.update_settings(settings);
                self.publish_targets();
            }
        }
    }

    fn handle_update(&mut self, update: &Update) {
        if let SweepClock::Source { latest_ms } = &mut self.clock {
            *latest_ms = (*latest_ms).max(update.timestamp_ms);
        }

        let outcome = self.engine.handle(update);
        match &outcome {
            HandleOutcome::Target(applied) => match &applied.resolution {
                Resolution::Created => {
                    log::debug!("Tracker: New track {} for {}", applied.track_id, update.context)
                }
                Resolution::Forked { from } => log::debug!(
                    "Tracker: Implausible jump of {} under {}, forked {}",
                    from,
                    update.context,
                    applied.track_id
                ),
                Resolution::Reattached => log::debug!(
                    "Tracker: Reattached track {} to {}",
                    applied.track_id,
                    update.context
                ),
                Resolution::Existing => {}
            },
            HandleOutcome::Ignored(reason) => {
                log::trace!("Tracker: Ignored {} {}: {:?}", update.context, update.path, reason)
            }
            HandleOutcome::OwnShip { .. } => {}
        }

        if outcome.own_ship_changed() {
            self.publisher.publish_own_ship(self.engine.own_ship().clone());
        }
        if outcome.changed() {
            // Relative motion depends on own ship, so targets follow it
            self.publish_targets();
        }
    }

    /// Run one aging sweep at `now_ms`, publishing if anything changed
    pub fn sweep(&mut self, now_ms: u64) -> SweepReport {
        let report = self.engine.sweep(now_ms);
        for id in &report.removed {
            log::debug!("Tracker: Removed stale track {}", id);
        }
        log::trace!(
            "Tracker: Sweep at {}: {} status changes, {} removed, {} live",
            now_ms,
            report.status_changes,
            report.removed.len(),
            self.engine.store().len()
        );
        if report.changed() {
            self.publish_targets();
        }
        report
    }

    fn sweep_now(&self) -> u64 {
        match self.clock {
            SweepClock::Wall => now_ms(),
            SweepClock::Source { latest_ms } => latest_ms,
        }
    }

    fn publish_targets(&self) {
        self.publisher.publish_targets(TargetSnapshot {
            timestamp: now_ms(),
            targets: self.engine.targets(),
            stats: self.engine.stats(),
        });
    }
}
