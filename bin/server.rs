// Parts Trace - Web Server
// JSON API over one shared registry snapshot

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use parts_trace::{
    init_tracing, BatchReport, CertificateRecord, EntityClassifier, EntityRegistry, MatchStrength,
    RegistryEntry, TraceConfig, TraceError, Validator,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
struct AppState {
    registry: Arc<EntityRegistry>,
    validator: Arc<Validator>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(ApiResponse {
            success: false,
            data: serde_json::Value::Null,
            error: Some(message),
        }),
    )
        .into_response()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegistryResponse<'a> {
    version: u64,
    fingerprint: String,
    snapshot_id: Option<String>,
    entries: &'a [RegistryEntry],
}

#[derive(Deserialize)]
struct LookupRequest {
    name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupResponse {
    name: String,
    entry: RegistryEntry,
    /// None when the name is not in the registry
    strength: Option<MatchStrength>,
    matched_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidateRequest {
    /// Document id → certificates
    documents: BTreeMap<String, Vec<CertificateRecord>>,
    /// Applies to every document; server default when omitted
    #[serde(default)]
    target_buyer: Option<String>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/registry - Current registry snapshot
async fn get_registry(State(state): State<AppState>) -> impl IntoResponse {
    let registry = &state.registry;
    Json(ApiResponse::ok(RegistryResponse {
        version: registry.version(),
        fingerprint: registry.fingerprint(),
        snapshot_id: registry.snapshot_id(),
        entries: registry.entries(),
    }))
    .into_response()
}

/// POST /api/lookup - Classify one entity name
async fn lookup_entity(State(state): State<AppState>, Json(request): Json<LookupRequest>) -> Response {
    let registry = &state.registry;
    let (entry, strength, matched_name) = match registry.lookup(&request.name) {
        Some(found) => (
            found.entry.clone(),
            Some(found.strength),
            Some(found.matched_name.to_string()),
        ),
        None => (RegistryEntry::unregistered(&request.name), None, None),
    };

    Json(ApiResponse::ok(LookupResponse {
        name: request.name,
        entry,
        strength,
        matched_name,
    }))
    .into_response()
}

/// POST /api/validate - Evaluate a batch of documents
async fn validate_documents(
    State(state): State<AppState>,
    Json(request): Json<ValidateRequest>,
) -> Response {
    let validator = state.validator.clone();

    let outcome = tokio::task::spawn_blocking(move || -> Result<BatchReport, TraceError> {
        let hints: BTreeMap<String, String> = match &request.target_buyer {
            Some(buyer) => request
                .documents
                .keys()
                .map(|document_id| (document_id.clone(), buyer.clone()))
                .collect(),
            None => BTreeMap::new(),
        };
        validator.validate_batch_with_hints(&request.documents, &hints)
    })
    .await;

    match outcome {
        Ok(Ok(report)) => (StatusCode::OK, Json(ApiResponse::ok(report))).into_response(),
        Ok(Err(e)) if e.is_registry_unavailable() => {
            error!(error = %e, "registry unavailable during validation");
            error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
        Ok(Err(e)) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
        Err(e) => {
            error!(error = %e, "validation task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "validation task failed".to_string())
        }
    }
}

// ============================================================================
// Main Server
// ============================================================================

fn load_state() -> Result<AppState> {
    let config = match env::var("PARTS_TRACE_CONFIG") {
        Ok(path) => TraceConfig::from_file(&path)?,
        Err(_) => TraceConfig::default(),
    };

    let registry = match env::var("PARTS_TRACE_REGISTRY") {
        Ok(path) => EntityRegistry::from_file(&path)?,
        Err(_) => EntityRegistry::with_defaults(),
    };
    let registry = Arc::new(registry.with_fuzzy_distance(config.fuzzy_distance));

    let validator = Validator::new(registry.clone(), config)?;
    Ok(AppState {
        registry,
        validator: Arc::new(validator),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let state = load_state()?;
    info!(
        version = state.registry.version(),
        entries = state.registry.len(),
        fingerprint = %state.registry.fingerprint(),
        "registry loaded"
    );

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/registry", get(get_registry))
        .route("/lookup", post(lookup_entity))
        .route("/validate", post(validate_documents))
        .with_state(state);

    let app = Router::new().nest("/api", api_routes).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    // Start server
    let addr = env::var("PARTS_TRACE_BIND").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(%addr, "server listening");
    axum::serve(listener, app)
        .await
        .context("Server terminated unexpectedly")?;

    Ok(())
}
