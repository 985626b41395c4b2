use anyhow::{Context, Result};
use colored::Colorize;
use poolwatch_client::{
    ChartJsSurface, Clock, HttpTransport, LongPollClient, PollHandle, PollOutcome, SystemClock,
};
use poolwatch_common::types::{Cursor, StatusReport};
use poolwatch_common::WatchConfig;
use serde_json::Value;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tracing::info;

use crate::board::{PoolBoard, PoolSummary};
use crate::config::{self, GlobalArgs, PollArgs};

#[derive(Tabled)]
struct PoolRow {
    #[tabled(rename = "Pool")]
    pool: String,
    #[tabled(rename = "Load")]
    load: String,
    #[tabled(rename = "Running")]
    running: String,
    #[tabled(rename = "Starting + Running")]
    starting_and_running: String,
    #[tabled(rename = "Desired")]
    desired: String,
    #[tabled(rename = "Samples")]
    samples: usize,
    #[tabled(rename = "Window (min)")]
    window: String,
}

fn format_value(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.*}", precision, v),
        _ => "-".to_string(),
    }
}

impl From<&PoolSummary> for PoolRow {
    fn from(summary: &PoolSummary) -> Self {
        Self {
            pool: summary.pool.clone(),
            load: format_value(summary.load, 1),
            running: format_value(summary.running, 0),
            starting_and_running: format_value(summary.starting_and_running, 0),
            desired: format_value(summary.desired, 0),
            samples: summary.samples,
            window: format_value(summary.window, 1),
        }
    }
}

fn render_board(board: &PoolBoard<ChartJsSurface>, url: &str) -> String {
    let rows: Vec<PoolRow> = board.summaries().iter().map(PoolRow::from).collect();
    let mut out = String::new();

    out.push_str(&format!(
        "{} {} ({})\n",
        "Pool status".bold(),
        url,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str(&"=".repeat(60));
    out.push('\n');

    if rows.is_empty() {
        out.push_str(&"No pools reported yet".dimmed().to_string());
        out.push('\n');
    } else {
        out.push_str(&Table::new(rows).with(Style::rounded()).to_string());
        out.push('\n');
    }

    if !board.text().is_empty() {
        out.push('\n');
        out.push_str(board.text());
    }
    out
}

/// Cancel `token` on Ctrl-C
fn cancel_on_ctrl_c(token: tokio_util::sync::CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, stopping");
            token.cancel();
        }
    });
}

/// Long-poll `config.url`, applying every round to a fresh board before
/// handing it to `on_round`.
fn spawn_watch<F>(config: WatchConfig, mut on_round: F) -> Result<PollHandle>
where
    F: FnMut(&PoolBoard<ChartJsSurface>) + Send + 'static,
{
    let transport = HttpTransport::new(config.request_timeout())?;
    let client = LongPollClient::new(config.url.clone(), transport).with_delay(config.poll_delay());

    let mut board: PoolBoard<ChartJsSurface> = PoolBoard::new();
    let clock = SystemClock;
    Ok(client.spawn(Cursor::default(), move |body| {
        let report = StatusReport::from_body(&body);
        board.apply(clock.now_millis(), &report, &config);
        on_round(&board);
    }))
}

fn finish_watch(url: &str, outcome: PollOutcome) -> Result<()> {
    match outcome {
        PollOutcome::Cancelled { rounds } => {
            info!("Stopped watching {} after {} rounds", url, rounds);
            Ok(())
        }
        PollOutcome::Failed { rounds, error } => {
            Err(error).with_context(|| format!("Polling {} stopped after {} rounds", url, rounds))
        }
    }
}

pub async fn handle_watch(global: &GlobalArgs, poll: &PollArgs) -> Result<()> {
    let config = config::load(global, poll)?;
    let url = config.url.clone();

    let render_url = url.clone();
    let handle = spawn_watch(config, move |board| {
        // Clear screen and move cursor to top-left
        print!("\x1B[2J\x1B[1;1H");
        println!("{}", render_board(board, &render_url));
    })?;
    cancel_on_ctrl_c(handle.cancellation_token());

    finish_watch(&url, handle.join().await)
}

pub async fn handle_status(global: &GlobalArgs, poll: &PollArgs) -> Result<()> {
    let config = config::load(global, poll)?;
    let body = fetch_status(&config).await?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

async fn fetch_status(config: &WatchConfig) -> Result<Value> {
    let transport = HttpTransport::new(config.request_timeout())?;
    let client = LongPollClient::new(config.url.clone(), transport);

    client
        .poll_once(&Cursor::default())
        .await
        .with_context(|| format!("Failed to fetch status from {}", config.url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status_server;
    use serde_json::json;
    use tokio::sync::mpsc;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(Some(1.26), 1), "1.3");
        assert_eq!(format_value(Some(3.0), 0), "3");
        assert_eq!(format_value(Some(f64::NAN), 0), "-");
        assert_eq!(format_value(None, 1), "-");
    }

    #[test]
    fn test_render_board_lists_pools() {
        colored::control::set_override(false);
        let mut board: PoolBoard<ChartJsSurface> = PoolBoard::new();
        let report = StatusReport::from_body(&json!({
            "id": "a1",
            "seen": 2,
            "status": {
                "stats": {"workers": {"load": 0.4, "up": 1, "starting": 2, "desired": 3}},
                "text": "Pool workers, load=0.4, actual=1, desired=3:\n"
            }
        }));
        board.apply(0, &report, &WatchConfig::default());

        let out = render_board(&board, "http://conductor/status/");
        assert!(out.contains("Pool status http://conductor/status/"));
        assert!(out.contains("workers"));
        assert!(out.contains("Starting + Running"));
        assert!(out.contains("Pool workers, load=0.4"));
    }

    #[tokio::test]
    async fn test_watch_records_rounds_until_server_fails() {
        let url = status_server::start(2).await;
        let config = WatchConfig {
            url: url.clone(),
            poll_delay_ms: 10,
            ..WatchConfig::default()
        };

        let (tx, mut rounds) = mpsc::unbounded_channel();
        let handle = spawn_watch(config, move |board| {
            let _ = tx.send((board.rounds(), board.summaries(), board.text().to_string()));
        })
        .unwrap();
        let err = finish_watch(&url, handle.join().await).unwrap_err();

        let message = format!("{:#}", err);
        assert!(message.contains("stopped after 2 rounds"), "{}", message);
        assert!(message.contains(status_server::FAILURE_TEXT.trim()), "{}", message);

        let (count, first, _) = rounds.recv().await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(first[0].samples, 1);
        assert_eq!(first[0].running, Some(1.0));

        let (count, second, text) = rounds.recv().await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(second[0].pool, "workers");
        assert_eq!(second[0].samples, 2);
        assert_eq!(second[0].running, Some(2.0));
        assert_eq!(second[0].starting_and_running, Some(3.0));
        assert_eq!(second[0].desired, Some(4.0));
        assert!(text.starts_with("Pool workers, load=0.5, actual=2"));
        assert!(rounds.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_fetch_status_returns_first_body() {
        let url = status_server::start(1).await;
        let config = WatchConfig {
            url,
            ..WatchConfig::default()
        };

        let body = fetch_status(&config).await.unwrap();
        assert_eq!(body["seen"], 1);
        assert_eq!(body["status"]["stats"]["workers"]["desired"], 4);

        let err = fetch_status(&config).await.unwrap_err();
        assert!(format!("{:#}", err).contains("HTTP 500"));
    }

    #[test]
    fn test_render_empty_board() {
        colored::control::set_override(false);
        let board: PoolBoard<ChartJsSurface> = PoolBoard::new();
        let out = render_board(&board, "http://conductor/status/");
        assert!(out.contains("No pools reported yet"));
    }
}
