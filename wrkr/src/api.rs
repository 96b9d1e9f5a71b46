use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use serde::Serialize;
use tokio::net::TcpListener;

/// The run-scoped HTTP control surface: inspect status and pause/resume/stop the run in
/// progress. Grounded on the existing `axum::Router` + shared-state pattern that the teacher's
/// (otherwise unwired) web dashboard used, but with a mutation-capable surface instead of a
/// read-only view.
#[derive(Clone)]
struct ApiState {
    pause: Arc<wrkr_core::PauseGate>,
    cancel: wrkr_core::CancellationToken,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    paused: bool,
    stopping: bool,
}

async fn get_status(State(state): State<ApiState>) -> impl IntoResponse {
    Json(StatusResponse {
        paused: state.pause.is_paused(),
        stopping: state.cancel.is_cancelled(),
    })
}

async fn post_pause(State(state): State<ApiState>) -> impl IntoResponse {
    state.pause.pause();
    Json(StatusResponse {
        paused: true,
        stopping: state.cancel.is_cancelled(),
    })
}

async fn post_resume(State(state): State<ApiState>) -> impl IntoResponse {
    state.pause.resume();
    Json(StatusResponse {
        paused: false,
        stopping: state.cancel.is_cancelled(),
    })
}

async fn post_stop(State(state): State<ApiState>) -> impl IntoResponse {
    state.cancel.cancel();
    (StatusCode::ACCEPTED, Json(StatusResponse {
        paused: state.pause.is_paused(),
        stopping: true,
    }))
}

fn router(state: ApiState) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/pause", post(post_pause))
        .route("/resume", post(post_resume))
        .route("/stop", post(post_stop))
        .with_state(state)
}

/// Loopback addresses are always allowed; anything else must be explicitly requested via
/// `--address`, matching the teacher's existing `WebUiConfig::bind_addr` posture.
fn is_loopback(addr: SocketAddr) -> bool {
    addr.ip().is_loopback()
}

pub struct ControlApi {
    addr: SocketAddr,
    handle: tokio::task::JoinHandle<()>,
}

impl ControlApi {
    pub async fn bind(
        address: &str,
        pause: Arc<wrkr_core::PauseGate>,
        cancel: wrkr_core::CancellationToken,
    ) -> anyhow::Result<Self> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid --address `{address}`: {e}"))?;

        if !is_loopback(addr) {
            tracing::warn!(%addr, "binding Control API to a non-loopback address");
        }

        let listener = TcpListener::bind(addr).await?;
        let bound_addr = listener.local_addr()?;

        let app = router(ApiState { pause, cancel });
        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                tracing::warn!(%err, "Control API server stopped");
            }
        });

        tracing::info!(address = %bound_addr, "Control API listening");
        Ok(Self {
            addr: bound_addr,
            handle,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn shutdown(self) {
        self.handle.abort();
    }
}
