//! Live pool dashboard
//!
//! Runs the long-poll loop in the background and serves:
//! - `/` an HTML page drawing one Chart.js chart per pool
//! - `/api/charts` the chart configurations as of the last refresh
//! - `/api/status` the status text of the last round and the poll state
//! - `/health`

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::{Context, Result};
use axum::{
    extract::State,
    response::{Html, Json},
    routing::get,
    Router,
};
use poolwatch_client::{ChartJsSurface, Clock, HttpTransport, LongPollClient, PollOutcome, SystemClock};
use poolwatch_common::types::{Cursor, StatusReport};
use poolwatch_common::WatchConfig;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::board::{PoolBoard, PoolSummary};
use crate::config::{self, GlobalArgs, PollArgs};

/// Dashboard server state
#[derive(Clone)]
pub struct DashboardState {
    board: Arc<RwLock<PoolBoard<ChartJsSurface>>>,
    url: String,
}

#[derive(Debug, Serialize)]
struct StatusView {
    url: String,
    rounds: u64,
    polling: bool,
    error: Option<String>,
    text: String,
    pools: Vec<PoolSummary>,
}

impl DashboardState {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            board: Arc::new(RwLock::new(PoolBoard::new())),
            url: url.into(),
        }
    }

    /// Apply a status body under the write lock; record and refresh happen together
    pub fn apply(&self, now: i64, body: &Value, config: &WatchConfig) {
        let report = StatusReport::from_body(body);
        let mut board = self.board.write().unwrap_or_else(PoisonError::into_inner);
        board.apply(now, &report, config);
    }

    pub fn set_poll_error(&self, error: String) {
        let mut board = self.board.write().unwrap_or_else(PoisonError::into_inner);
        board.set_poll_error(error);
    }
}

pub fn router(state: DashboardState) -> Router {
    Router::new()
        .route("/", get(dashboard_home))
        .route("/api/charts", get(charts))
        .route("/api/status", get(status))
        .route("/health", get(health))
        .with_state(state)
}

/// GET / - Dashboard page
async fn dashboard_home() -> Html<&'static str> {
    Html(include_str!("dashboard.html"))
}

/// GET /api/charts - Chart.js configuration per pool
async fn charts(State(state): State<DashboardState>) -> Json<BTreeMap<String, Value>> {
    let board = state.board.read().unwrap_or_else(PoisonError::into_inner);
    let charts = board
        .charts()
        .iter()
        .map(|(pool, chart)| (pool.clone(), chart.surface().snapshot().clone()))
        .collect();
    Json(charts)
}

/// GET /api/status - Last status text and poll state
async fn status(State(state): State<DashboardState>) -> Json<StatusView> {
    let board = state.board.read().unwrap_or_else(PoisonError::into_inner);
    Json(StatusView {
        url: state.url.clone(),
        rounds: board.rounds(),
        polling: board.poll_error().is_none(),
        error: board.poll_error().map(str::to_string),
        text: board.text().to_string(),
        pools: board.summaries(),
    })
}

/// GET /health
async fn health() -> Json<Value> {
    Json(json!({"status": "healthy"}))
}

/// Start long-polling into `state`. The returned task records the error that
/// stopped polling; the page keeps the last charts.
fn spawn_polling(state: &DashboardState, config: WatchConfig) -> Result<(CancellationToken, JoinHandle<PollOutcome>)> {
    let transport = HttpTransport::new(config.request_timeout())?;
    let client = LongPollClient::new(config.url.clone(), transport).with_delay(config.poll_delay());

    let poll_state = state.clone();
    let clock = SystemClock;
    let handle = client.spawn(Cursor::default(), move |body| {
        poll_state.apply(clock.now_millis(), &body, &config);
    });
    let token = handle.cancellation_token();

    let error_state = state.clone();
    let task = tokio::spawn(async move {
        let outcome = handle.join().await;
        if let PollOutcome::Failed { error, .. } = &outcome {
            error_state.set_poll_error(error.to_string());
        }
        outcome
    });
    Ok((token, task))
}

pub async fn handle_serve(global: &GlobalArgs, poll: &PollArgs, bind: Option<SocketAddr>) -> Result<()> {
    let mut config = config::load(global, poll)?;
    if let Some(bind) = bind {
        config.bind = bind;
    }

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind dashboard to {}", config.bind))?;
    info!("Starting pool dashboard on http://{}", config.bind);

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, shutting down dashboard");
            signal.cancel();
        }
    });

    serve_until(listener, config, shutdown).await
}

async fn serve_until(listener: TcpListener, config: WatchConfig, shutdown: CancellationToken) -> Result<()> {
    let state = DashboardState::new(config.url.clone());
    let (poll_token, poll_task) = spawn_polling(&state, config)?;

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("Dashboard server failed")?;

    poll_token.cancel();
    match poll_task.await {
        Ok(PollOutcome::Failed { rounds, error }) => {
            warn!("Polling had stopped after {} rounds: {}", rounds, error);
        }
        Ok(PollOutcome::Cancelled { rounds }) => {
            info!("Polling cancelled after {} rounds", rounds);
        }
        Err(e) => warn!("Poll task failed: {}", e),
    }
    Ok(())
}
