use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    pub scenarios: Vec<ScenarioSummary>,
    pub metrics: Vec<wrkr_metrics::MetricSeriesSummary>,
    /// Threshold violations observed at the final evaluation.
    pub threshold_violations: Vec<crate::ThresholdViolation>,
    /// Whether any threshold evaluation failed at any point during the run, even if later
    /// evaluations recovered. Set from `ThresholdTracker`'s persistent latch.
    pub ever_tainted: bool,
}

impl RunSummary {
    /// A run is tainted if a threshold ever failed, including mid-run and since-recovered
    /// failures, not just the final evaluation.
    pub fn tainted(&self) -> bool {
        self.ever_tainted || !self.threshold_violations.is_empty()
    }
}

#[derive(Debug, Default, Clone)]
pub struct ScenarioSummary {
    pub scenario: String,

    pub requests_total: u64,
    pub failed_requests_total: u64,
    pub bytes_received_total: u64,
    pub bytes_sent_total: u64,
    pub iterations_total: u64,

    pub checks_failed_total: u64,
    pub checks_failed: HashMap<String, u64>,

    pub latency: Option<wrkr_metrics::HistogramSummary>,
}
