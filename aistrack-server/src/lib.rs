//! # AIS Track Server
//!
//! AIS target tracking server with REST API and WebSocket support.
//!
//! This crate provides the runtime around [`aistrack_core`]:
//! - Reads Signal K style updates as line-delimited JSON (stdin, file, TCP)
//! - Feeds them through a single tracker task that owns the track store
//! - Ages tracks once per sweep interval
//! - Publishes the target list and own ship over REST and WebSocket
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    aistrack-server                      │
//! │  ┌─────────────┐  ┌─────────────┐  ┌──────────────────┐ │
//! │  │ FeedReader  │  │ FeedListener│  │ REST / WebSocket │ │
//! │  │ (stdin/file)│  │ (TCP)       │  │ (axum)           │ │
//! │  └──────┬──────┘  └──────┬──────┘  └────────▲─────────┘ │
//! │         │  TrackerCommand│                  │           │
//! │         ▼                ▼                  │ watch     │
//! │  ┌──────────────────────────────────────────┴──────────┐│
//! │  │              Tracker (owns AisEngine)               ││
//! │  │  - update handling                                  ││
//! │  │  - aging sweep                                      ││
//! │  │  - snapshot publishing                              ││
//! │  └─────────────────────────────────────────────────────┘│
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## REST API
//!
//! | Endpoint | Description |
//! |----------|-------------|
//! | `GET /v1/api/ais/targets` | All live targets |
//! | `GET /v1/api/ais/targets/{id}` | One target |
//! | `GET /v1/api/ownship` | Own ship state |
//! | `GET /v1/api/ais/settings` | Tracker settings |
//! | `PUT /v1/api/ais/settings` | Replace tracker settings |
//! | `WS /v1/api/ais/stream` | Own ship and targets on every change |
//!
//! ## Command-Line Interface
//!
//! See [`Cli`] for all available options. Key options:
//!
//! - `-p, --port` - HTTP server port (default: 6503)
//! - `-i, --input` - Feed file, `-` for stdin
//! - `-l, --listen` - Accept feed connections on a TCP address
//! - `-v` - Increase verbosity (use multiple times)

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use aistrack_core::TrackerSettings;
use clap::Parser;
use tokio_graceful_shutdown::{SubsystemBuilder, SubsystemHandle};

pub mod config;
pub mod feed;
pub mod snapshot;
pub mod tracker;

use feed::{FeedListener, FeedReader, FeedSource};
use snapshot::SnapshotReceiver;
use tracker::{Tracker, TrackerHandle};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Clone, Debug)]
#[command(version, about)]
pub struct Cli {
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,

    /// Port for webserver
    #[arg(short, long, default_value_t = 6503)]
    pub port: u16,

    /// Feed of line-delimited JSON updates, `-` for stdin
    #[arg(short, long, default_value = "-")]
    pub input: String,

    /// Also accept feed connections on this address, e.g. `0.0.0.0:10110`
    #[arg(short, long)]
    pub listen: Option<SocketAddr>,

    /// Context that denotes own ship in addition to `vessels.self`
    #[arg(short, long)]
    pub self_context: Option<String>,

    /// Settings file (default: settings.json in the user config directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Use the timestamps in the feed instead of receipt time
    #[arg(long, default_value_t = false)]
    pub source_time: bool,

    /// Write every published snapshot to stdout
    #[arg(long, default_value_t = false)]
    pub output: bool,
}

pub struct SessionInner {
    pub args: Cli,
    /// Settings the tracker currently runs with
    pub settings: TrackerSettings,
}

/// Application state shared with the web server
#[derive(Clone)]
pub struct Session {
    pub inner: Arc<RwLock<SessionInner>>,
    pub tracker: TrackerHandle,
    pub snapshots: SnapshotReceiver,
}

impl Session {
    pub fn read(
        &self,
    ) -> Result<RwLockReadGuard<'_, SessionInner>, PoisonError<RwLockReadGuard<'_, SessionInner>>>
    {
        self.inner.read()
    }

    pub fn write(
        &self,
    ) -> Result<RwLockWriteGuard<'_, SessionInner>, PoisonError<RwLockWriteGuard<'_, SessionInner>>>
    {
        self.inner.write()
    }

    /// Session without running subsystems; the tracker is returned for the
    /// caller to run or drive directly.
    pub fn new_base(args: Cli, settings: TrackerSettings) -> (Self, Tracker) {
        let (tracker, handle, snapshots) = Tracker::new(
            settings.clone(),
            args.self_context.clone(),
            args.source_time,
        );
        let session = Session {
            inner: Arc::new(RwLock::new(SessionInner { args, settings })),
            tracker: handle,
            snapshots,
        };
        (session, tracker)
    }

    /// Create the session and start the tracker, feed and output subsystems
    pub fn new(subsystem: &SubsystemHandle, args: Cli, settings: TrackerSettings) -> Self {
        let (session, tracker) = Self::new_base(args.clone(), settings);

        subsystem.start(SubsystemBuilder::new("Tracker", |subsys| tracker.run(subsys)));

        let feed = FeedReader::new(
            FeedSource::from_arg(&args.input),
            session.tracker.clone(),
            args.source_time,
        );
        subsystem.start(SubsystemBuilder::new("Feed", |subsys| feed.run(subsys)));

        if let Some(addr) = args.listen {
            let listener = FeedListener::new(addr, session.tracker.clone(), args.source_time);
            subsystem.start(SubsystemBuilder::new("Listener", |subsys| {
                listener.run(subsys)
            }));
        }

        if args.output {
            let snapshots = session.snapshots.clone();
            subsystem.start(SubsystemBuilder::new("Output", |subsys| {
                snapshot::write_snapshots(snapshots, subsys)
            }));
        }

        session
    }

    pub fn args(&self) -> Option<Cli> {
        self.read().ok().map(|inner| inner.args.clone())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Session {{ }}")
    }
}

/// Wall clock in epoch milliseconds
pub fn now_ms() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let args = Cli::parse_from(["aistrack-server"]);
        assert_eq!(args.port, 6503);
        assert_eq!(args.input, "-");
        assert!(args.listen.is_none());
        assert!(!args.source_time);
        assert!(!args.output);
    }

    #[test]
    fn test_cli_options() {
        let args = Cli::parse_from([
            "aistrack-server",
            "-p",
            "8080",
            "--input",
            "feed.ndjson",
            "--listen",
            "127.0.0.1:10110",
            "--self-context",
            "vessels.urn:mrn:imo:mmsi:244000000",
            "--source-time",
        ]);
        assert_eq!(args.port, 8080);
        assert_eq!(args.listen, Some("127.0.0.1:10110".parse().unwrap()));
        assert_eq!(
            args.self_context.as_deref(),
            Some("vessels.urn:mrn:imo:mmsi:244000000")
        );
        assert!(args.source_time);
    }

    #[test]
    fn test_session_base() {
        let (session, tracker) =
            Session::new_base(Cli::parse_from(["aistrack-server"]), TrackerSettings::default());
        assert!(tracker.engine().store().is_empty());
        assert_eq!(session.read().unwrap().settings, TrackerSettings::default());
        assert!(session.snapshots.targets().targets.is_empty());
    }
}
