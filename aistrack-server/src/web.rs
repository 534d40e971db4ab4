use axum::{
    debug_handler,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use log::{debug, trace};
use serde::Deserialize;
use std::{
    io,
    net::{IpAddr, Ipv4Addr, SocketAddr},
};
use thiserror::Error;
use tokio::{net::TcpListener, sync::broadcast};
use tokio_graceful_shutdown::SubsystemHandle;

use aistrack_core::TrackerSettings;
use aistrack_server::{
    config::{self, ConfigError},
    snapshot::SnapshotReceiver,
    tracker::{TrackerCommand, TrackerError},
    Session,
};

const TARGETS_URI: &str = "/v1/api/ais/targets";
const TARGET_URI: &str = "/v1/api/ais/targets/{target_id}";
const STREAM_URI: &str = "/v1/api/ais/stream";
const SETTINGS_URI: &str = "/v1/api/ais/settings";
const OWNSHIP_URI: &str = "/v1/api/ownship";

#[derive(Error, Debug)]
pub enum WebError {
    #[error("Socket operation failed")]
    Io(#[from] io::Error),
    #[error("No such target '{0}'")]
    NoSuchTarget(String),
    #[error("{0}")]
    InvalidSettings(#[from] ConfigError),
    #[error("{0}")]
    Tracker(#[from] TrackerError),
    #[error("Session state is unavailable")]
    SessionPoisoned,
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebError::NoSuchTarget(_) => StatusCode::NOT_FOUND,
            WebError::InvalidSettings(_) => StatusCode::BAD_REQUEST,
            WebError::Tracker(_) => StatusCode::SERVICE_UNAVAILABLE,
            WebError::Io(_) | WebError::SessionPoisoned => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

#[derive(Deserialize)]
struct TargetIdParam {
    target_id: String,
}

#[derive(Clone)]
pub struct Web {
    session: Session,
    shutdown_tx: broadcast::Sender<()>,
}

impl Web {
    pub fn new(session: Session) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Web {
            session,
            shutdown_tx,
        }
    }

    fn router(self) -> Router {
        Router::new()
            .route(TARGETS_URI, get(get_targets))
            .route(TARGET_URI, get(get_target))
            .route(STREAM_URI, get(stream_handler))
            .route(SETTINGS_URI, get(get_settings).put(set_settings))
            .route(OWNSHIP_URI, get(get_own_ship))
            .with_state(self)
    }

    pub async fn run(self, subsys: SubsystemHandle) -> Result<(), WebError> {
        let port = self
            .session
            .args()
            .ok_or(WebError::SessionPoisoned)?
            .port;
        let listener =
            TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), port))
                .await
                .map_err(|e| WebError::Io(e))?;

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let shutdown_tx = self.shutdown_tx.clone();
        let app = self.router();

        log::info!("Starting HTTP web server on port {}", port);

        tokio::select! { biased;
            _ = subsys.on_shutdown_requested() => {
                let _ = shutdown_tx.send(());
            },
            r = axum::serve(listener, app)
                    .with_graceful_shutdown(
                        async move {
                            _ = shutdown_rx.recv().await;
                        }
                    ) => {
                return r.map_err(|e| WebError::Io(e));
            }
        }
        Ok(())
    }
}

#[debug_handler]
async fn get_targets(State(state): State<Web>) -> Response {
    let snapshot = state.session.snapshots.targets();
    debug!("GET targets: {} live", snapshot.targets.len());
    Json(&snapshot.targets).into_response()
}

#[debug_handler]
async fn get_target(State(state): State<Web>, Path(params): Path<TargetIdParam>) -> Response {
    debug!("GET target {}", params.target_id);
    let snapshot = state.session.snapshots.targets();
    match snapshot.targets.iter().find(|t| t.id == params.target_id) {
        Some(target) => Json(target).into_response(),
        None => WebError::NoSuchTarget(params.target_id).into_response(),
    }
}

#[debug_handler]
async fn get_own_ship(State(state): State<Web>) -> Response {
    Json(state.session.snapshots.own_ship()).into_response()
}

#[debug_handler]
async fn get_settings(State(state): State<Web>) -> Response {
    match state.session.read() {
        Ok(inner) => Json(&inner.settings).into_response(),
        Err(_) => WebError::SessionPoisoned.into_response(),
    }
}

#[debug_handler]
async fn set_settings(
    State(state): State<Web>,
    Json(settings): Json<TrackerSettings>,
) -> Response {
    match apply_settings(&state.session, settings).await {
        Ok(settings) => Json(settings).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn apply_settings(
    session: &Session,
    settings: TrackerSettings,
) -> Result<TrackerSettings, WebError> {
    config::validate(&settings)?;
    session
        .tracker
        .send(TrackerCommand::Settings(settings.clone()))
        .await?;
    session
        .write()
        .map_err(|_| WebError::SessionPoisoned)?
        .settings = settings.clone();
    debug!("PUT settings: {:?}", settings);
    Ok(settings)
}

#[debug_handler]
async fn stream_handler(State(state): State<Web>, ws: WebSocketUpgrade) -> Response {
    debug!("stream request");
    let snapshots = state.session.snapshots.clone();
    let shutdown_rx = state.shutdown_tx.subscribe();
    ws.on_upgrade(move |socket| snapshot_stream(socket, snapshots, shutdown_rx))
}

/// Sends the current picture, then again after every published change
async fn snapshot_stream(
    socket: WebSocket,
    mut snapshots: SnapshotReceiver,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let (mut sender, mut receiver) = socket.split();
    let mut dirty = true;

    loop {
        if dirty {
            let message = match snapshots.message_json() {
                Ok(message) => message,
                Err(e) => {
                    log::warn!("Cannot serialize snapshot: {}", e);
                    break;
                }
            };
            let len = message.len();
            if let Err(e) = sender.send(Message::Text(message.into())).await {
                log::warn!("Error on send to websocket: {}", e);
                break;
            }
            trace!("Sent snapshot {} bytes", len);
            dirty = false;
        }

        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!("Shutdown of websocket");
                break;
            },
            r = snapshots.changed() => {
                if r.is_err() {
                    debug!("Snapshot channel closed");
                    break;
                }
                dirty = true;
            },
            message = receiver.next() => match message {
                Some(Ok(Message::Close(_))) | None => {
                    debug!("Websocket closed by client");
                    break;
                }
                Some(Err(e)) => {
                    debug!("Websocket receive error: {}", e);
                    break;
                }
                Some(Ok(_)) => {}
            },
        }
    }
}
