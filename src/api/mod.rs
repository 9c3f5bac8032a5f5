use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, DefaultBodyLimit, Path, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    routing::{any, get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::{
    db::EntityStore,
    domain::{
        parse_body, CaptureResponse, CreateEndpointRequest, EndpointResponse, Event,
        HeaderMultiMap, NewEvent, QueryMultiMap, ReplayRequest, ReplayResult,
    },
    errors::{AppError, StoreError},
    replay::{ReplayEngine, ReplaySource},
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EntityStore>,
    pub replayer: ReplayEngine,
    pub max_webhook_size_bytes: usize,
}

pub fn router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_webhook_size_bytes);

    Router::new()
        .route("/api/endpoints", post(create_endpoint))
        .route("/api/endpoints/:id", get(get_endpoint))
        .route("/api/endpoints/:id/events", get(list_events))
        .route(
            "/api/endpoints/:id/events/:event_id/replay",
            post(replay_event),
        )
        .route("/hook/:id", any(capture).layer(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn create_endpoint(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreateEndpointRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<EndpointResponse>), AppError> {
    let Json(request) = payload?;
    if request.name.is_empty() {
        return Err(AppError::BadRequest("name is required".to_owned()));
    }

    let endpoint = state
        .store
        .create_endpoint(request.name, request.ttl_seconds);
    let url = capture_url(&headers, endpoint.id);

    Ok((StatusCode::CREATED, Json(EndpointResponse { endpoint, url })))
}

async fn get_endpoint(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<EndpointResponse>, AppError> {
    let endpoint = state
        .store
        .get_endpoint(parse_id(&id, StoreError::EndpointNotFound)?)?;
    let url = capture_url(&headers, endpoint.id);

    Ok(Json(EndpointResponse { endpoint, url }))
}

async fn list_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Event>>, AppError> {
    let id = parse_id(&id, StoreError::EndpointNotFound)?;
    Ok(Json(state.store.list_events(id)?))
}

async fn replay_event(
    State(state): State<AppState>,
    Path((endpoint_id, event_id)): Path<(String, String)>,
    payload: Result<Json<ReplayRequest>, JsonRejection>,
) -> Result<Json<ReplayResult>, AppError> {
    let event = state
        .store
        .get_event(parse_id(&event_id, StoreError::EventNotFound)?)?;
    if endpoint_id.parse::<Uuid>().ok() != Some(event.endpoint_id) {
        return Err(AppError::BadRequest(
            "Event does not belong to this endpoint".to_owned(),
        ));
    }

    let target_url = payload
        .ok()
        .and_then(|Json(request)| request.target_url)
        .filter(|target| !target.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Target URL is required".to_owned()))?;

    let source = ReplaySource {
        method: &event.method,
        headers: &event.headers,
        query_params: &event.query_params,
        body: &event.body,
    };
    let result = state.replayer.replay(source, &target_url).await;

    if result.success {
        state.store.increment_replay_count(event.id)?;
    }

    Ok(Json(result))
}

async fn capture(
    State(state): State<AppState>,
    Path(id): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<CaptureResponse>, AppError> {
    let endpoint_id = parse_id(&id, StoreError::EndpointNotFound)?;

    state.store.save_event(
        endpoint_id,
        NewEvent {
            method: method.to_string(),
            headers: headers_to_multimap(&headers),
            query_params: query_to_multimap(uri.query()),
            body: parse_body(&body),
        },
    )?;

    Ok(Json(CaptureResponse { status: "received" }))
}

/// Ids that are not UUIDs can never have been issued, so they read as unknown.
fn parse_id(raw: &str, missing: StoreError) -> Result<Uuid, StoreError> {
    raw.parse().map_err(|_| missing)
}

fn capture_url(headers: &HeaderMap, id: Uuid) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("http");
    format!("{scheme}://{host}/hook/{id}")
}

fn headers_to_multimap(headers: &HeaderMap) -> HeaderMultiMap {
    let mut map = HeaderMultiMap::new();
    for (name, value) in headers {
        map.entry(name.to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    map
}

fn query_to_multimap(query: Option<&str>) -> QueryMultiMap {
    let mut map = QueryMultiMap::new();
    for (key, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        map.entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }
    map
}
