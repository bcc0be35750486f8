use crate::context::Context;
use crate::registry::EngineRegistry;
use crate::repository::PostRepository;
use crate::service::ImportService;
use crate::types::{ImportOptions, ImportResult};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use hyper::Server;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Deserializer, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Shared state behind every route.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<EngineRegistry>,
    pub repository: Arc<dyn PostRepository>,
    pub import_timeout: Duration,
    pub metrics: Option<PrometheusHandle>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ImportRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub update_existing: bool,
    #[serde(default)]
    pub dry_run: bool,
}

/// Article ids arrive as either `"123"` or `123`.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(match Option::<Id>::deserialize(deserializer)? {
        Some(Id::Text(s)) => s,
        Some(Id::Number(n)) => n.to_string(),
        None => String::new(),
    })
}

impl ImportRequest {
    fn into_options(self, source: String) -> ImportOptions {
        ImportOptions {
            source,
            user_id: self.user_id,
            username: self.username,
            article_url: self.url,
            article_id: self.id,
            update_existing: self.update_existing,
            dry_run: self.dry_run,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportResponse {
    pub success: bool,
    pub message: String,
    pub total_fetched: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl ImportResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ..Default::default()
        }
    }

    fn with_counts(mut self, result: &ImportResult) -> Self {
        self.total_fetched = result.total_fetched;
        self.created = result.created;
        self.updated = result.updated;
        self.skipped = result.skipped;
        self.failed = result.failed;
        self.errors = result.error_messages();
        self
    }
}

impl From<ImportResult> for ImportResponse {
    fn from(result: ImportResult) -> Self {
        Self {
            success: result.failed == 0,
            message: result.to_string(),
            ..Default::default()
        }
        .with_counts(&result)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineInfo {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnginesResponse {
    pub engines: Vec<EngineInfo>,
}

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ImportResponse::failure(message)),
    )
        .into_response()
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "blog-importer",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn list_engines(State(state): State<AppState>) -> Json<EnginesResponse> {
    Json(EnginesResponse {
        engines: state
            .registry
            .list()
            .into_iter()
            .map(|name| EngineInfo { name })
            .collect(),
    })
}

async fn import(
    State(state): State<AppState>,
    Path(engine): Path<String>,
    body: Bytes,
) -> Response {
    if engine.trim().is_empty() {
        return bad_request("engine parameter is required");
    }
    if state.registry.get(&engine).is_none() {
        return bad_request(format!(
            "unknown engine: {} (available: {:?})",
            engine,
            state.registry.list()
        ));
    }

    let request: ImportRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => return bad_request(format!("Invalid request body: {e}")),
    };
    if request.user_id.is_empty() {
        return bad_request("user_id is required");
    }
    if request.username.is_empty() && request.url.is_empty() && request.id.is_empty() {
        return bad_request("one of username, url, or id must be provided");
    }

    let opts = request.into_options(engine);
    let ctx = Context::background().with_timeout(state.import_timeout);
    let service = ImportService::new(state.registry.clone(), state.repository.clone());

    info!(engine = %opts.source, user_id = %opts.user_id, "import requested");
    match service.import(&ctx, &opts).await {
        Ok(result) => Json(ImportResponse::from(result)).into_response(),
        Err(abort) => {
            error!("Import failed: {}", abort.error);
            let mut body = ImportResponse::failure(format!("Import failed: {}", abort.error));
            if let Some(partial) = abort.partial.as_ref() {
                body = body.with_counts(partial);
            }
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

async fn metrics_endpoint(State(state): State<AppState>) -> Response {
    match state.metrics.as_ref() {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

/// Build the router. Import routes are mounted only when `enable_importer`
/// is set.
pub fn create_server(state: AppState, enable_importer: bool) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint));

    if enable_importer {
        router = router
            .route("/api/import/engines", get(list_engines))
            .route("/api/import/:engine", post(import));
    } else {
        warn!("Importer routes disabled by configuration");
    }

    router
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
}

/// Start the HTTP server on the specified port.
pub async fn start_server(state: AppState, port: u16, enable_importer: bool) -> anyhow::Result<()> {
    let app = create_server(state, enable_importer);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("HTTP server running on http://localhost:{}", port);
    info!("Import API: http://localhost:{}/api/import/engines", port);
    Server::bind(&addr).serve(app.into_make_service()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_accepts_numeric_id() {
        let req: ImportRequest =
            serde_json::from_str(r#"{"id": 777, "user_id": "u1"}"#).unwrap();
        assert_eq!(req.id, "777");
        assert!(!req.dry_run);

        let req: ImportRequest = serde_json::from_str(r#"{"id": "42"}"#).unwrap();
        assert_eq!(req.id, "42");
        assert!(req.user_id.is_empty());
    }

    #[test]
    fn response_omits_empty_errors() {
        let json = serde_json::to_value(ImportResponse::from(ImportResult::new(0))).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("errors").is_none());
    }
}
