//! Prometheus counters for import runs.

use metrics::describe_counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::fmt;
use std::sync::OnceLock;
use tracing::{info, warn};

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Every metric the importer records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    /// Labels: `engine`.
    ImportRuns,
    /// Labels: `engine`, `outcome` (created, updated, skipped, failed).
    ImportPosts,
    /// Labels: `engine`, `status`.
    UpstreamRequests,
}

impl MetricName {
    pub const ALL: [MetricName; 3] = [
        MetricName::ImportRuns,
        MetricName::ImportPosts,
        MetricName::UpstreamRequests,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::ImportRuns => "blog_import_runs_total",
            MetricName::ImportPosts => "blog_import_posts_total",
            MetricName::UpstreamRequests => "blog_import_upstream_requests_total",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            MetricName::ImportRuns => "Import runs that reached the per-post loop",
            MetricName::ImportPosts => "Fetched posts by import outcome",
            MetricName::UpstreamRequests => "HTTP requests sent to content sources by status",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Install the Prometheus recorder and describe every counter. Returns the
/// render handle, or `None` when a recorder is already installed elsewhere.
pub fn init() -> Option<PrometheusHandle> {
    if let Some(handle) = METRICS_HANDLE.get() {
        return Some(handle.clone());
    }

    let handle = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => handle,
        Err(e) => {
            warn!("Failed to install Prometheus recorder: {}", e);
            return None;
        }
    };

    for name in MetricName::ALL {
        describe_counter!(name.as_str(), name.description());
    }
    info!("Prometheus recorder installed");

    Some(METRICS_HANDLE.get_or_init(|| handle).clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_prometheus_conventions() {
        for name in MetricName::ALL {
            let s = name.to_string();
            assert!(s.starts_with("blog_import_"));
            assert!(s.ends_with("_total"));
        }
    }
}
