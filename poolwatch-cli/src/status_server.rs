//! Local status server for exercising the poll wiring end to end

use axum::{http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

pub const FAILURE_TEXT: &str = "conductor restarting\n";

/// Serve `healthy_rounds` status bodies on `/status/`, then fail every request
/// with a 500 carrying [`FAILURE_TEXT`]. Returns the status URL.
pub async fn start(healthy_rounds: u64) -> String {
    let served = Arc::new(AtomicU64::new(0));

    let app = Router::new().route(
        "/status/",
        post(move |Json(_cursor): Json<Value>| {
            let served = served.clone();
            async move {
                let seen = served.fetch_add(1, Ordering::SeqCst) + 1;
                if seen > healthy_rounds {
                    return (StatusCode::INTERNAL_SERVER_ERROR, FAILURE_TEXT).into_response();
                }
                Json(json!({
                    "id": "9e41",
                    "seen": seen,
                    "status": {
                        "stats": {"workers": {"load": 0.5, "up": seen, "starting": 1, "desired": 4}},
                        "text": format!("Pool workers, load=0.5, actual={}, desired=4:\n", seen)
                    }
                }))
                .into_response()
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/status/", addr)
}
