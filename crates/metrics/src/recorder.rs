//! Metrics recorder initialization.

use std::net::SocketAddr;

use {anyhow::Result, tracing::info};

/// Handle to the installed recorder.
#[derive(Clone, Default)]
pub struct MetricsHandle {
    #[cfg(feature = "prometheus")]
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
}

impl MetricsHandle {
    /// Render metrics in Prometheus text format.
    ///
    /// Empty when no in-process recorder is installed (disabled, built without
    /// the `prometheus` feature, or exporting through the HTTP listener).
    #[must_use]
    pub fn render(&self) -> String {
        #[cfg(feature = "prometheus")]
        {
            self.prometheus_handle
                .as_ref()
                .map(metrics_exporter_prometheus::PrometheusHandle::render)
                .unwrap_or_default()
        }
        #[cfg(not(feature = "prometheus"))]
        {
            String::new()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MetricsRecorderConfig {
    pub enabled: bool,
    /// Serve a scrape endpoint on this address instead of rendering in-process.
    pub listen: Option<SocketAddr>,
    /// Labels added to every metric.
    pub global_labels: Vec<(String, String)>,
}

/// Install the global metrics recorder. Call once at startup.
///
/// When disabled, or when built without `prometheus`, nothing is installed
/// and the facade macros are no-ops.
pub fn init_metrics(config: MetricsRecorderConfig) -> Result<MetricsHandle> {
    if !config.enabled {
        info!("metrics collection is disabled");
        return Ok(MetricsHandle::default());
    }

    #[cfg(feature = "prometheus")]
    {
        let handle = init_prometheus(config)?;
        info!("prometheus metrics recorder installed");
        Ok(handle)
    }

    #[cfg(not(feature = "prometheus"))]
    {
        let _ = config;
        info!("metrics requested but the prometheus feature is not compiled in");
        Ok(MetricsHandle::default())
    }
}

#[cfg(feature = "prometheus")]
fn init_prometheus(config: MetricsRecorderConfig) -> Result<MetricsHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let mut builder = PrometheusBuilder::new();
    for (key, value) in config.global_labels {
        builder = builder.add_global_label(key, value);
    }

    match config.listen {
        Some(addr) => {
            builder.with_http_listener(addr).install()?;
            info!(%addr, "prometheus scrape endpoint listening");
            Ok(MetricsHandle {
                prometheus_handle: None,
            })
        },
        None => Ok(MetricsHandle {
            prometheus_handle: Some(builder.install_recorder()?),
        }),
    }
}
