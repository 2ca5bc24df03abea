//! HTTP shell (§4.8): three routes over the Index Manager, mirroring the
//! teacher's `RestApiServer` construction — shared `ApiState`, `TraceLayer`,
//! `CorsLayer` — but scoped to provision/reset/search.

use crate::error::LsiError;
use crate::manager::IndexManager;
use crate::query::{self, Predicate};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::Query;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
struct ApiState {
    manager: Arc<IndexManager>,
}

/// Build the service's `axum::Router` over a shared `IndexManager`.
pub fn router(manager: Arc<IndexManager>) -> Router {
    let state = ApiState { manager };
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES));

    Router::new()
        .route("/indexes", post(provision))
        .route("/indexes/{name}/reset", post(reset))
        .route("/indexes/{name}/search", get(search))
        .layer(middleware)
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ProvisionParams {
    id: String,
}

async fn provision(State(state): State<ApiState>, Query(params): Query<ProvisionParams>) -> Result<impl IntoResponse, LsiError> {
    state.manager.provision(&params.id, None)?;
    Ok(Json(json!({ "message": format!("provisioned index '{}'", params.id) })))
}

async fn reset(State(state): State<ApiState>, Path(name): Path<String>) -> Result<impl IntoResponse, LsiError> {
    state.manager.reset(&name, None)?;
    Ok(Json(json!({ "message": format!("queued reset for index '{name}'") })))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default = "default_predicate")]
    predicate: String,
    wkt: Option<String>,
    bbox: Option<String>,
    circle: Option<String>,
    #[serde(rename = "type", default)]
    types: Vec<String>,
    text: Option<String>,
    #[serde(default)]
    offset: usize,
    #[serde(default = "default_limit")]
    limit: usize,
    query: Option<String>,
}

fn default_predicate() -> String {
    "nearest".to_string()
}

fn default_limit() -> usize {
    10
}

async fn search(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Query(params): Query<SearchParams>,
    headers: HeaderMap,
) -> Result<Response, LsiError> {
    let predicate = Predicate::parse(&params.predicate)?;
    let geom = query::parse_spatial_operand(params.wkt.as_deref(), params.bbox.as_deref(), params.circle.as_deref())?;

    let rdrs = state.manager.search(
        &name,
        predicate,
        geom,
        &params.types,
        params.text.as_deref(),
        params.offset,
        params.limit,
    )?;

    if params.query.as_deref() == Some("closure") {
        let accept = headers.get(axum::http::header::ACCEPT).and_then(|v| v.to_str().ok());
        let format = query::negotiate_closure(accept)?;
        let body = query::serialize_closure(&rdrs, format)?;
        let mime = format.mime();
        return Ok(([(axum::http::header::CONTENT_TYPE, mime)], body).into_response());
    }

    Ok(Json(rdrs).into_response())
}

impl IntoResponse for LsiError {
    fn into_response(self) -> Response {
        let status = match &self {
            LsiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            LsiError::NotFound(_) => StatusCode::NOT_FOUND,
            LsiError::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            LsiError::Geometry(_) | LsiError::Rdf(_) => StatusCode::BAD_REQUEST,
            LsiError::Io(_) | LsiError::Payload(_) | LsiError::Json(_) | LsiError::Internal(_) => {
                tracing::error!(error = %self, "internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}
