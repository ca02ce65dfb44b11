use prometheus::IntCounterVec;

#[derive(prometheus_metric_storage::MetricStorage)]
#[metric(subsystem = "intents")]
pub(crate) struct Metrics {
    /// Signed orders and fills.
    #[metric(labels("kind"))]
    pub signed_artifacts: IntCounterVec,

    /// Feasibility verdicts.
    #[metric(labels("result"))]
    pub feasibility_checks: IntCounterVec,

    /// Feasibility issues found, by kind.
    #[metric(labels("kind"))]
    pub feasibility_issues: IntCounterVec,
}

impl Metrics {
    pub(crate) fn get() -> &'static Self {
        Metrics::instance(observe::metrics::get_storage_registry()).unwrap()
    }
}
