//! Historical network metrics shown on the dashboard charts

use serde::{Deserialize, Serialize};

const TOTAL_DOWNLOAD_METRIC_ID: &str = "totalDownload";
const USAGE_SUMMARY_POINTS: usize = 3;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct MetricDataPoint {
    pub time: String,
    pub value: f64,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct NetworkMetric {
    pub id: String,
    pub name: String,
    pub unit: String,
    pub data: Vec<MetricDataPoint>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct UsageSummary {
    pub total: f64,
    pub data: Vec<MetricDataPoint>,
}

#[derive(Clone, Debug)]
pub struct MetricsCatalog {
    metrics: Vec<NetworkMetric>,
}

impl Default for MetricsCatalog {
    fn default() -> Self {
        Self::new(sample_metrics())
    }
}

impl MetricsCatalog {
    pub fn new(metrics: Vec<NetworkMetric>) -> Self {
        Self { metrics }
    }

    pub fn metrics(&self) -> &[NetworkMetric] {
        &self.metrics
    }

    /// Last few days of download usage and their sum
    pub fn total_usage_summary(&self) -> UsageSummary {
        let Some(metric) = self
            .metrics
            .iter()
            .find(|m| m.id == TOTAL_DOWNLOAD_METRIC_ID)
        else {
            return UsageSummary::default();
        };

        let data = metric.data[metric.data.len().saturating_sub(USAGE_SUMMARY_POINTS)..].to_vec();
        let total = data.iter().map(|point| point.value).sum();

        UsageSummary { total, data }
    }
}

fn series(id: &str, name: &str, unit: &str, points: &[(&str, f64)]) -> NetworkMetric {
    NetworkMetric {
        id: id.to_string(),
        name: name.to_string(),
        unit: unit.to_string(),
        data: points
            .iter()
            .map(|(time, value)| MetricDataPoint {
                time: time.to_string(),
                value: *value,
            })
            .collect(),
    }
}

fn sample_metrics() -> Vec<NetworkMetric> {
    vec![
        series(
            "latency",
            "Network Latency",
            "ms",
            &[
                ("00:00", 8.0),
                ("01:00", 7.0),
                ("02:00", 6.0),
                ("03:00", 6.0),
                ("04:00", 9.0),
                ("05:00", 12.0),
                ("06:00", 10.0),
            ],
        ),
        series(
            "packetLoss",
            "Packet Loss",
            "%",
            &[
                ("00:00", 0.12),
                ("01:00", 0.05),
                ("02:00", 0.0),
                ("03:00", 0.08),
                ("04:00", 0.31),
                ("05:00", 0.22),
                ("06:00", 0.1),
            ],
        ),
        series(
            TOTAL_DOWNLOAD_METRIC_ID,
            "Total Download Usage",
            "GB",
            &[
                ("Mon", 18.0),
                ("Tue", 24.0),
                ("Wed", 21.0),
                ("Thu", 30.0),
                ("Fri", 38.0),
                ("Sat", 44.0),
                ("Sun", 35.0),
            ],
        ),
    ]
}
