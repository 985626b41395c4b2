//! Chart.js rendering surface
//!
//! Produces the `line` chart configuration a browser page feeds straight into
//! `new Chart(ctx, config)`. Datasets are updated in place on every refresh;
//! readers get the snapshot taken by the last redraw.

use poolwatch_common::types::SeriesPoint;
use serde_json::{json, Value};

use crate::chart::{AxisConfig, ChartConfig, ChartSurface, SeriesKind, SeriesStyle};

#[derive(Debug, Clone, Default)]
pub struct ChartJsSurface {
    config: Value,
    datasets: Vec<SeriesKind>,
    snapshot: Value,
    revision: u64,
}

impl ChartJsSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration as of the last redraw
    pub fn snapshot(&self) -> &Value {
        &self.snapshot
    }

    /// Number of redraws so far
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn dataset(kind: SeriesKind, style: &SeriesStyle) -> Value {
        let mut dataset = json!({
            "label": kind.label(),
            "data": [],
            "steppedLine": style.stepped_line,
            "fill": style.fill,
            "showLine": style.show_line,
            "pointRadius": style.point_radius,
            "borderWidth": style.border_width,
            "borderColor": style.color,
            "backgroundColor": style.color,
        });
        if let Some(dash) = style.border_dash {
            dataset["borderDash"] = json!(dash);
        }
        dataset
    }

    fn axis(axis: &AxisConfig) -> Value {
        let mut value = json!({
            "type": "linear",
            "display": true,
            "ticks": {
                "suggestedMin": axis.suggested_min,
                "suggestedMax": axis.suggested_max,
                "beginAtZero": axis.begin_at_zero,
            },
        });
        if let Some(step) = axis.step_size {
            value["ticks"]["stepSize"] = json!(step);
        }
        if let Some(title) = axis.title {
            value["scaleLabel"] = json!({ "display": true, "labelString": title });
        }
        value
    }
}

impl ChartSurface for ChartJsSurface {
    fn configure(&mut self, config: &ChartConfig) {
        self.datasets = config.series.iter().map(|(kind, _)| *kind).collect();
        let datasets: Vec<Value> = config
            .series
            .iter()
            .map(|(kind, style)| Self::dataset(*kind, style))
            .collect();

        self.config = json!({
            "type": "line",
            "options": {
                "responsive": false,
                "animation": { "duration": 0 },
                "legend": { "display": false },
                "scales": {
                    "xAxes": [Self::axis(&config.x_axis)],
                    "yAxes": [Self::axis(&config.y_axis)],
                },
            },
            "data": {
                "labels": [],
                "datasets": datasets,
            },
        });
        self.snapshot = self.config.clone();
    }

    fn set_series(&mut self, kind: SeriesKind, points: &[SeriesPoint]) {
        let Some(index) = self.datasets.iter().position(|k| *k == kind) else {
            return;
        };
        if let Some(dataset) = self.config.pointer_mut(&format!("/data/datasets/{}", index)) {
            dataset["data"] = json!(points);
        }
    }

    fn set_labels(&mut self, labels: &[f64]) {
        if let Some(data) = self.config.get_mut("data") {
            data["labels"] = json!(labels);
        }
    }

    fn redraw(&mut self) {
        self.revision += 1;
        self.snapshot = self.config.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::PoolChart;
    use poolwatch_common::types::PoolStats;

    #[test]
    fn test_configure_builds_line_chart() {
        let chart = PoolChart::create(ChartJsSurface::new());
        let config = chart.surface().snapshot();

        assert_eq!(config["type"], "line");
        assert_eq!(config["options"]["animation"]["duration"], 0);
        assert_eq!(config["options"]["scales"]["xAxes"][0]["scaleLabel"]["labelString"], "minutes ago");
        assert_eq!(config["options"]["scales"]["yAxes"][0]["ticks"]["stepSize"], 0.5);

        let labels: Vec<&str> = config["data"]["datasets"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["label"].as_str().unwrap())
            .collect();
        assert_eq!(labels, vec!["Running", "Starting + Running", "Desired", "Load"]);
        assert_eq!(config["data"]["datasets"][2]["borderDash"], json!([5, 5]));
        assert_eq!(config["data"]["datasets"][3]["steppedLine"], "after");
    }

    #[test]
    fn test_refresh_fills_datasets() {
        let mut chart = PoolChart::create(ChartJsSurface::new());
        chart.record(1000, &PoolStats::new(1.0, 2.0, 1.0, 3.0));
        chart.refresh(61_000);

        let config = chart.surface().snapshot();
        assert_eq!(chart.surface().revision(), 1);
        assert_eq!(config["data"]["labels"], json!([-1.0]));
        assert_eq!(config["data"]["datasets"][0]["data"], json!([{"x": -1.0, "y": 2.0}]));
        assert_eq!(config["data"]["datasets"][1]["data"], json!([{"x": -1.0, "y": 3.0}]));
        assert_eq!(config["data"]["datasets"][2]["data"], json!([{"x": -1.0, "y": 3.0}]));
        assert_eq!(config["data"]["datasets"][3]["data"], json!([{"x": -1.0, "y": 1.0}]));
    }

    #[test]
    fn test_snapshot_only_changes_on_redraw() {
        let mut surface = ChartJsSurface::new();
        surface.configure(&ChartConfig::pool_chart());
        surface.set_series(SeriesKind::Load, &[SeriesPoint { x: -0.5, y: 1.0 }]);

        assert_eq!(surface.snapshot()["data"]["datasets"][3]["data"], json!([]));
        surface.redraw();
        assert_eq!(surface.snapshot()["data"]["datasets"][3]["data"], json!([{"x": -0.5, "y": 1.0}]));
    }

    #[test]
    fn test_nan_points_serialize_as_gaps() {
        let mut surface = ChartJsSurface::new();
        surface.configure(&ChartConfig::pool_chart());
        surface.set_series(SeriesKind::Desired, &[SeriesPoint { x: 0.0, y: f64::NAN }]);
        surface.redraw();

        assert_eq!(surface.snapshot()["data"]["datasets"][2]["data"][0]["y"], Value::Null);
    }
}
