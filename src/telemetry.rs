use tracing_subscriber::EnvFilter;

pub const CYCLES_TOTAL: &str = "arbx_cycles_total";
pub const OPPORTUNITIES_TOTAL: &str = "arbx_opportunities_total";
pub const REJECTED_TOTAL: &str = "arbx_rejected_total";
pub const QUOTE_FAILURES_TOTAL: &str = "arbx_quote_failures_total";

pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .init();
}

#[cfg(feature = "metrics-exporter")]
pub fn init_metrics() -> anyhow::Result<()> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], 9000))
        .install()?;

    tracing::info!("Prometheus exporter listening on http://0.0.0.0:9000/metrics");
    metrics::gauge!("arbx_up").set(1.0);
    Ok(())
}

#[cfg(not(feature = "metrics-exporter"))]
pub fn init_metrics() -> anyhow::Result<()> {
    Ok(())
}
