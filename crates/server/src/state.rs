use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::telemetry::{prometheus_handle, PrometheusMetrics};
use metrics_exporter_prometheus::PrometheusHandle;
use prodsearch::{PipelineConfig, SearchOrchestrator, SearchYamlConfig};
use std::sync::Arc;
use std::time::Instant;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Search pipeline (shared across requests)
    pub orchestrator: Arc<SearchOrchestrator>,

    /// Paging limits enforced on inbound requests
    pub limits: SearchYamlConfig,

    /// Renders `/metrics`; `None` when metrics are disabled
    pub metrics: Option<PrometheusHandle>,

    pub started_at: Instant,
}

impl ServerState {
    /// Create new server state from the configured pipeline file (or defaults)
    /// plus environment overrides.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let pipeline = PipelineConfig::load(config.pipeline_config.as_deref())?;
        tracing::info!(
            pipeline = pipeline.name.as_deref().unwrap_or("default"),
            semantic_mode = %pipeline.semantic.mode,
            dimension = pipeline.semantic.dimension,
            "pipeline configured"
        );
        let orchestrator = SearchOrchestrator::from_config(&pipeline)?;
        Ok(Self::with_orchestrator(config, orchestrator, pipeline.search))
    }

    /// Wrap an already-built orchestrator, attaching Prometheus metrics when
    /// enabled.
    pub fn with_orchestrator(
        config: ServerConfig,
        orchestrator: SearchOrchestrator,
        limits: SearchYamlConfig,
    ) -> Self {
        let (orchestrator, metrics) = if config.metrics_enabled {
            (
                orchestrator.with_metrics(Arc::new(PrometheusMetrics)),
                Some(prometheus_handle()),
            )
        } else {
            (orchestrator, None)
        };

        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
            limits,
            metrics,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
