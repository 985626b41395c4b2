use poolwatch_client::{ChartSurface, PoolChart, SeriesKind};
use poolwatch_common::types::{StatusReport, TimestampMillis};
use poolwatch_common::WatchConfig;
use serde::Serialize;
use std::collections::BTreeMap;

/// One chart per pool, fed from status reports
#[derive(Debug)]
pub struct PoolBoard<S> {
    charts: BTreeMap<String, PoolChart<S>>,
    text: String,
    rounds: u64,
    poll_error: Option<String>,
}

/// Latest derived values of one pool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolSummary {
    pub pool: String,
    pub samples: usize,
    /// Age of the oldest sample in minutes (negative)
    pub window: Option<f64>,
    pub load: Option<f64>,
    pub running: Option<f64>,
    pub starting_and_running: Option<f64>,
    pub desired: Option<f64>,
}

impl<S: ChartSurface + Default> PoolBoard<S> {
    pub fn new() -> Self {
        Self {
            charts: BTreeMap::new(),
            text: String::new(),
            rounds: 0,
            poll_error: None,
        }
    }

    /// Record every wanted pool of `report` at `now`, then refresh all charts
    /// against the same `now`.
    pub fn apply(&mut self, now: TimestampMillis, report: &StatusReport, config: &WatchConfig) {
        for (pool, stats) in &report.stats {
            if !config.wants_pool(pool) {
                continue;
            }
            self.charts
                .entry(pool.clone())
                .or_insert_with(|| PoolChart::create(S::default()))
                .record(now, stats);
        }

        for chart in self.charts.values_mut() {
            chart.refresh(now);
        }

        self.text = report.text.clone();
        self.rounds += 1;
    }

    pub fn charts(&self) -> &BTreeMap<String, PoolChart<S>> {
        &self.charts
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    pub fn poll_error(&self) -> Option<&str> {
        self.poll_error.as_deref()
    }

    pub fn set_poll_error(&mut self, error: String) {
        self.poll_error = Some(error);
    }

    pub fn summaries(&self) -> Vec<PoolSummary> {
        self.charts
            .iter()
            .map(|(pool, chart)| {
                let last = |kind| chart.series(kind).last().map(|p| p.y);
                PoolSummary {
                    pool: pool.clone(),
                    samples: chart.samples().len(),
                    window: chart.labels().first().copied(),
                    load: last(SeriesKind::Load),
                    running: last(SeriesKind::Running),
                    starting_and_running: last(SeriesKind::StartingAndRunning),
                    desired: last(SeriesKind::Desired),
                }
            })
            .collect()
    }
}
