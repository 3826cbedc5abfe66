mod config;
mod metrics;
mod pipeline;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use config::{AppConfig, GraphBackend, LogFormat};
use extract::{ExtractionReport, ModelAssistedExtractor, OllamaClient, PatternSet, TripletExtractor};
use index::{GraphIngestor, GraphStats, GraphStore, ImportReport, MemoryGraphStore, Neo4jGraphStore};
use metrics::{Metrics, MetricsSnapshot};
use pipeline::{Pipeline, PipelineError, ProcessReport};

struct AppState {
    pipeline: Pipeline,
    store: Arc<dyn GraphStore>,
    metrics: Arc<Metrics>,
}

#[derive(Serialize)]
struct HealthResponse {
    graph: String,
}

#[derive(Deserialize)]
struct ExtractRequest {
    path: String,
}

#[derive(Deserialize)]
struct ImportRequest {
    triplet_file: String,
}

#[derive(Serialize)]
struct StatsResponse {
    graph: GraphStats,
    metrics: MetricsSnapshot,
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

async fn connect_store(config: &AppConfig) -> Result<Arc<dyn GraphStore>> {
    let store: Arc<dyn GraphStore> = match config.graph.backend {
        GraphBackend::Neo4j => Arc::new(
            Neo4jGraphStore::connect(&config.graph.uri, &config.graph.user, &config.graph.password)
                .await?,
        ),
        GraphBackend::Memory => Arc::new(MemoryGraphStore::new()),
    };
    store.init_schema().await.context("Failed to initialize graph schema")?;
    Ok(store)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config);

    let store = connect_store(&config).await?;

    let client = OllamaClient::new(
        config.llm.base_url.clone(),
        config.llm.model.clone(),
        config.model_parameters(),
        config.request_timeout(),
    )
    .context("Failed to build text-generation client")?;

    let patterns = Arc::new(PatternSet::business().context("Invalid entity or relation pattern")?);
    let extractor = TripletExtractor::new(
        patterns,
        ModelAssistedExtractor::new(client, config.model_extraction()),
    );
    let ingestor = GraphIngestor::new(store.clone(), config.graph.batch_size);
    let metrics = Metrics::new();

    let state = Arc::new(AppState {
        pipeline: Pipeline::new(
            extractor,
            ingestor,
            config.output.audit_dir.clone(),
            metrics.clone(),
        ),
        store,
        metrics,
    });

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.bind))?;

    tracing::info!(
        bind = %config.server.bind,
        backend = ?config.graph.backend,
        model = %config.llm.model,
        "Server listening"
    );

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/extract", post(extract_document))
        .route("/import", post(import_triplets))
        .route("/process", post(process_document))
        .route("/stats", get(get_stats))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

fn status_for(state: &AppState, err: PipelineError) -> StatusCode {
    state.metrics.record_failure();
    let status = match &err {
        PipelineError::NotFound(_) => StatusCode::NOT_FOUND,
        PipelineError::Document(ingest::DocumentError::Unsupported(_)) => StatusCode::BAD_REQUEST,
        PipelineError::Document(_) | PipelineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(error = ?err, "Pipeline run failed");
    } else {
        tracing::warn!(error = %err, "Rejected request");
    }
    status
}

async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, StatusCode> {
    let graph = match state.store.health_check().await {
        Ok(()) => "ok".to_string(),
        Err(e) => format!("error: {e}"),
    };

    Ok(Json(HealthResponse { graph }))
}

async fn extract_document(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExtractRequest>,
) -> Result<Json<ExtractionReport>, StatusCode> {
    state
        .pipeline
        .extract(&PathBuf::from(&req.path))
        .await
        .map(Json)
        .map_err(|e| status_for(&state, e))
}

async fn import_triplets(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ImportRequest>,
) -> Result<Json<ImportReport>, StatusCode> {
    state
        .pipeline
        .import(&PathBuf::from(&req.triplet_file))
        .await
        .map(Json)
        .map_err(|e| status_for(&state, e))
}

async fn process_document(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExtractRequest>,
) -> Result<Json<ProcessReport>, StatusCode> {
    state
        .pipeline
        .process(&PathBuf::from(&req.path))
        .await
        .map(Json)
        .map_err(|e| status_for(&state, e))
}

async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatsResponse>, StatusCode> {
    let graph = state.store.stats().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to read graph statistics");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(StatsResponse {
        graph,
        metrics: state.metrics.snapshot(),
    }))
}
