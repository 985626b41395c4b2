//! Pool chart adapter
//!
//! Keeps every recorded [`Sample`] of a pool and, on refresh, rebuilds four
//! series relative to a chosen "now": load, running, starting + running and
//! desired. Drawing is left to a [`ChartSurface`].

use poolwatch_common::types::{PoolStats, Sample, SeriesPoint, TimestampMillis};
use serde::Serialize;
use tracing::debug;

/// The derived series of a pool chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SeriesKind {
    Load,
    Running,
    StartingAndRunning,
    Desired,
}

impl SeriesKind {
    /// Rebuild order
    pub const ALL: [SeriesKind; 4] = [
        SeriesKind::Load,
        SeriesKind::Running,
        SeriesKind::StartingAndRunning,
        SeriesKind::Desired,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SeriesKind::Load => "load",
            SeriesKind::Running => "running",
            SeriesKind::StartingAndRunning => "starting_and_running",
            SeriesKind::Desired => "desired",
        }
    }

    /// Legend label
    pub fn label(self) -> &'static str {
        match self {
            SeriesKind::Load => "Load",
            SeriesKind::Running => "Running",
            SeriesKind::StartingAndRunning => "Starting + Running",
            SeriesKind::Desired => "Desired",
        }
    }

    /// Value this series plots for `sample`
    pub fn metric(self, sample: &Sample) -> f64 {
        match self {
            SeriesKind::Load => sample.load,
            SeriesKind::Running => sample.up,
            SeriesKind::StartingAndRunning => sample.up + sample.starting,
            SeriesKind::Desired => sample.desired,
        }
    }

    pub fn style(self) -> SeriesStyle {
        match self {
            SeriesKind::Load => SeriesStyle {
                stepped_line: SteppedLine::After,
                fill: false,
                show_line: true,
                point_radius: 3,
                border_width: 0,
                border_dash: None,
                color: "pink",
            },
            // darker green, starting is drawn lighter on top of it
            SeriesKind::Running => SeriesStyle {
                stepped_line: SteppedLine::Before,
                fill: true,
                show_line: true,
                point_radius: 0,
                border_width: 0,
                border_dash: None,
                color: "#afc",
            },
            SeriesKind::StartingAndRunning => SeriesStyle {
                stepped_line: SteppedLine::Before,
                fill: true,
                show_line: true,
                point_radius: 0,
                border_width: 0,
                border_dash: None,
                color: "#dfe",
            },
            SeriesKind::Desired => SeriesStyle {
                stepped_line: SteppedLine::Before,
                fill: false,
                show_line: true,
                point_radius: 0,
                border_width: 1,
                border_dash: Some([5, 5]),
                color: "black",
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SteppedLine {
    Before,
    After,
}

/// Visual styling of one series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesStyle {
    pub stepped_line: SteppedLine,
    pub fill: bool,
    pub show_line: bool,
    pub point_radius: u32,
    pub border_width: u32,
    pub border_dash: Option<[u32; 2]>,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AxisConfig {
    pub title: Option<&'static str>,
    pub suggested_min: f64,
    pub suggested_max: f64,
    pub step_size: Option<f64>,
    pub begin_at_zero: bool,
}

/// Declarative chart description handed to a surface on creation
#[derive(Debug, Clone, PartialEq)]
pub struct ChartConfig {
    /// Series in drawing order, bottom first
    pub series: Vec<(SeriesKind, SeriesStyle)>,
    pub x_axis: AxisConfig,
    pub y_axis: AxisConfig,
}

impl ChartConfig {
    pub fn pool_chart() -> Self {
        let series = [
            SeriesKind::Running,
            SeriesKind::StartingAndRunning,
            SeriesKind::Desired,
            SeriesKind::Load,
        ]
        .into_iter()
        .map(|kind| (kind, kind.style()))
        .collect();

        Self {
            series,
            x_axis: AxisConfig {
                title: Some("minutes ago"),
                suggested_min: -5.0,
                suggested_max: 0.0,
                step_size: None,
                begin_at_zero: false,
            },
            y_axis: AxisConfig {
                title: None,
                suggested_min: 0.0,
                suggested_max: 4.0,
                step_size: Some(0.5),
                begin_at_zero: true,
            },
        }
    }
}

/// Rendering side of a pool chart
pub trait ChartSurface {
    fn configure(&mut self, config: &ChartConfig);

    /// Replace the points of one series
    fn set_series(&mut self, kind: SeriesKind, points: &[SeriesPoint]);

    /// Replace the x labels; they mirror the load series
    fn set_labels(&mut self, _labels: &[f64]) {}

    fn redraw(&mut self);
}

/// Sample buffer plus the series derived from it
#[derive(Debug)]
pub struct PoolChart<S> {
    surface: S,
    samples: Vec<Sample>,
    labels: Vec<f64>,
    load: Vec<SeriesPoint>,
    running: Vec<SeriesPoint>,
    starting_and_running: Vec<SeriesPoint>,
    desired: Vec<SeriesPoint>,
}

impl<S: ChartSurface> PoolChart<S> {
    pub fn create(mut surface: S) -> Self {
        surface.configure(&ChartConfig::pool_chart());
        Self {
            surface,
            samples: Vec::new(),
            labels: Vec::new(),
            load: Vec::new(),
            running: Vec::new(),
            starting_and_running: Vec::new(),
            desired: Vec::new(),
        }
    }

    /// Append a snapshot taken at `now`. Nothing is pruned or deduplicated.
    pub fn record(&mut self, now: TimestampMillis, stats: &PoolStats) {
        self.samples.push(Sample::new(now, stats));
    }

    /// Rebuild every series from the full buffer relative to `now`, then redraw.
    pub fn refresh(&mut self, now: TimestampMillis) {
        for kind in SeriesKind::ALL {
            let series = match kind {
                SeriesKind::Load => &mut self.load,
                SeriesKind::Running => &mut self.running,
                SeriesKind::StartingAndRunning => &mut self.starting_and_running,
                SeriesKind::Desired => &mut self.desired,
            };

            series.clear();
            series.extend(self.samples.iter().map(|sample| SeriesPoint {
                x: sample.minutes_before(now),
                y: kind.metric(sample),
            }));

            if kind == SeriesKind::Load {
                self.labels.clear();
                self.labels.extend(series.iter().map(|p| p.x));
            }

            debug!("{} {:?}", kind.name(), series);
            self.surface.set_series(kind, series);
        }

        self.surface.set_labels(&self.labels);
        self.surface.redraw();
    }

    pub fn series(&self, kind: SeriesKind) -> &[SeriesPoint] {
        match kind {
            SeriesKind::Load => &self.load,
            SeriesKind::Running => &self.running,
            SeriesKind::StartingAndRunning => &self.starting_and_running,
            SeriesKind::Desired => &self.desired,
        }
    }

    pub fn labels(&self) -> &[f64] {
        &self.labels
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.last()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}
