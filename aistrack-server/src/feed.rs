//! Inbound feed readers.
//!
//! Newline-delimited JSON update records from stdin, a file, or TCP clients.
//! Each line is decoded into an [`Update`] and handed to the tracker.
//! Malformed lines are logged and skipped.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use aistrack_core::{Update, UpdateError};
use log::{debug, info, warn};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_graceful_shutdown::{SubsystemBuilder, SubsystemHandle};

use crate::now_ms;
use crate::tracker::{TrackerError, TrackerHandle};

/// Malformed lines logged at `warn` before going quiet
const WARN_LIMIT: u64 = 10;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Feed I/O failed")]
    Io(#[from] io::Error),
    #[error("Cannot open feed '{0}'")]
    Open(PathBuf, #[source] io::Error),
    #[error("{0}")]
    Tracker(#[from] TrackerError),
}

/// Where line-delimited updates come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    Stdin,
    File(PathBuf),
}

impl FeedSource {
    /// `-` is stdin, anything else a file path
    pub fn from_arg(arg: &str) -> Self {
        match arg.trim() {
            "-" | "" => FeedSource::Stdin,
            path => FeedSource::File(PathBuf::from(path)),
        }
    }
}

impl std::fmt::Display for FeedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedSource::Stdin => write!(f, "stdin"),
            FeedSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Line counters for one feed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineStats {
    pub accepted: u64,
    pub malformed: u64,
}

/// Decode one line, stamping it with receipt time unless `source_time`
pub fn decode_line(line: &str, received_ms: u64, source_time: bool) -> Result<Update, UpdateError> {
    let mut update = Update::from_line(line, received_ms)?;
    if !source_time {
        update.timestamp_ms = received_ms;
    }
    Ok(update)
}

/// Forward every line of `reader` to the tracker until end of input
pub async fn forward_lines<R>(
    mut reader: R,
    origin: &str,
    tracker: &TrackerHandle,
    source_time: bool,
) -> Result<LineStats, FeedError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let mut stats = LineStats::default();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let decoded = match std::str::from_utf8(&buf) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                decode_line(line, now_ms(), source_time).map_err(|e| e.to_string())
            }
            Err(e) => Err(format!("not UTF-8: {}", e)),
        };
        match decoded {
            Ok(update) => {
                tracker.send_update(update).await?;
                stats.accepted += 1;
            }
            Err(e) => {
                stats.malformed += 1;
                if stats.malformed <= WARN_LIMIT {
                    warn!("{}: skipping malformed line: {}", origin, e);
                } else {
                    debug!("{}: skipping malformed line: {}", origin, e);
                }
            }
        }
    }
    Ok(stats)
}

/// Reads one stdin or file feed
pub struct FeedReader {
    source: FeedSource,
    tracker: TrackerHandle,
    source_time: bool,
}

impl FeedReader {
    pub fn new(source: FeedSource, tracker: TrackerHandle, source_time: bool) -> Self {
        FeedReader {
            source,
            tracker,
            source_time,
        }
    }

    pub async fn run(self, subsys: SubsystemHandle) -> Result<(), FeedError> {
        info!("Feed: Reading updates from {}", self.source);
        let origin = self.source.to_string();

        let result = match &self.source {
            FeedSource::Stdin => {
                let reader = BufReader::new(tokio::io::stdin());
                tokio::select! {
                    _ = subsys.on_shutdown_requested() => None,
                    r = forward_lines(reader, &origin, &self.tracker, self.source_time) => Some(r),
                }
            }
            FeedSource::File(path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .map_err(|e| FeedError::Open(path.clone(), e))?;
                let reader = BufReader::new(file);
                tokio::select! {
                    _ = subsys.on_shutdown_requested() => None,
                    r = forward_lines(reader, &origin, &self.tracker, self.source_time) => Some(r),
                }
            }
        };

        match result {
            None => info!("Feed: Shutdown requested"),
            Some(r) => {
                let stats = r?;
                info!(
                    "Feed: End of {}, {} updates, {} malformed lines",
                    origin, stats.accepted, stats.malformed
                );
            }
        }
        Ok(())
    }
}

/// Accepts TCP clients that each stream line-delimited updates
pub struct FeedListener {
    addr: SocketAddr,
    tracker: TrackerHandle,
    source_time: bool,
}

impl FeedListener {
    pub fn new(addr: SocketAddr, tracker: TrackerHandle, source_time: bool) -> Self {
        FeedListener {
            addr,
            tracker,
            source_time,
        }
    }

    pub async fn run(self, subsys: SubsystemHandle) -> Result<(), FeedError> {
        let listener = TcpListener::bind(self.addr).await?;
        info!("Listener: Accepting feed connections on {}", self.addr);

        loop {
            tokio::select! {
                _ = subsys.on_shutdown_requested() => {
                    info!("Listener: Shutdown requested");
                    break;
                }
                r = listener.accept() => {
                    let (stream, peer) = match r {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            warn!("Listener: Accept failed: {}", e);
                            continue;
                        }
                    };
                    let tracker = self.tracker.clone();
                    let source_time = self.source_time;
                    subsys.start(SubsystemBuilder::new(
                        format!("Feed {}", peer),
                        move |s| serve_connection(stream, peer, tracker, source_time, s),
                    ));
                }
            }
        }
        Ok(())
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    tracker: TrackerHandle,
    source_time: bool,
    subsys: SubsystemHandle,
) -> Result<(), FeedError> {
    info!("Listener: Feed connection from {}", peer);
    let origin = peer.to_string();
    let reader = BufReader::new(stream);

    tokio::select! {
        _ = subsys.on_shutdown_requested() => {}
        r = forward_lines(reader, &origin, &tracker, source_time) => match r {
            Ok(stats) => info!(
                "Listener: {} disconnected after {} updates, {} malformed lines",
                peer, stats.accepted, stats.malformed
            ),
            // A broken client connection is not fatal for the server
            Err(FeedError::Io(e)) => warn!("Listener: {} failed: {}", peer, e),
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::{Tracker, TrackerCommand};
    use aistrack_core::TrackerSettings;
    use tokio::sync::mpsc;

    #[test]
    fn test_source_from_arg() {
        assert_eq!(FeedSource::from_arg("-"), FeedSource::Stdin);
        assert_eq!(
            FeedSource::from_arg("/tmp/feed.ndjson"),
            FeedSource::File(PathBuf::from("/tmp/feed.ndjson"))
        );
    }

    #[test]
    fn test_decode_line_stamping() {
        let line = r#"{"context": "vessels.a", "path": "name", "value": "A", "timestamp": 1000}"#;
        assert_eq!(decode_line(line, 5_000, true).unwrap().timestamp_ms, 1_000);
        assert_eq!(decode_line(line, 5_000, false).unwrap().timestamp_ms, 5_000);

        let line = r#"{"context": "vessels.a", "path": "name", "value": "A"}"#;
        assert_eq!(decode_line(line, 5_000, true).unwrap().timestamp_ms, 5_000);
    }

    #[tokio::test]
    async fn test_forward_lines_skips_malformed() {
        let (_tracker, handle, _snapshots) =
            Tracker::new(TrackerSettings::default(), None, true);
        let input: &[u8] = b"{\"context\": \"vessels.a\", \"path\": \"name\", \"value\": \"A\"}\n\
            not json\n\
            \n\
            {\"path\": \"name\"}\n\
            {\"context\": \"vessels.b\", \"path\": \"mmsi\", \"value\": 244123456, \"timestamp\": \"2024-05-01T12:00:00Z\"}\n";

        let stats = forward_lines(input, "test", &handle, true).await.unwrap();
        assert_eq!(
            stats,
            LineStats {
                accepted: 2,
                malformed: 2
            }
        );
    }

    #[tokio::test]
    async fn test_forward_lines_survives_invalid_utf8() {
        let (tx, mut rx) = mpsc::channel(8);
        let handle = TrackerHandle::from_sender(tx);
        let input: &[u8] = b"{\"context\": \"vessels.a\", \"path\": \"name\", \"value\": \"\xff\xfe\"}\n\
            {\"context\": \"vessels.b\", \"path\": \"name\", \"value\": \"B\", \"timestamp\": 9}\n";

        let stats = forward_lines(input, "test", &handle, true).await.unwrap();
        assert_eq!(
            stats,
            LineStats {
                accepted: 1,
                malformed: 1
            }
        );
        match rx.recv().await {
            Some(TrackerCommand::Update(update)) => assert_eq!(update.context, "vessels.b"),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_forward_lines_delivers_updates() {
        let (tx, mut rx) = mpsc::channel(8);
        let handle = TrackerHandle::from_sender(tx);
        let input: &[u8] =
            b"{\"context\": \"vessels.a\", \"path\": \"design.beam\", \"value\": 4, \"timestamp\": 7}\n";

        forward_lines(input, "test", &handle, true).await.unwrap();
        match rx.recv().await {
            Some(TrackerCommand::Update(update)) => {
                assert_eq!(update.context, "vessels.a");
                assert_eq!(update.timestamp_ms, 7);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_forward_lines_fails_when_tracker_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let handle = TrackerHandle::from_sender(tx);
        let input: &[u8] = b"{\"context\": \"vessels.a\", \"path\": \"name\", \"value\": \"A\"}\n";
        assert!(matches!(
            forward_lines(input, "test", &handle, false).await,
            Err(FeedError::Tracker(TrackerError::MailboxClosed))
        ));
    }
}
