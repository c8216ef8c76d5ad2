use axum::{
    Form, Json, Router,
    extract::{FromRequest, Path, Request, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::{
    config::{AdminConfig, ApiUser},
    error::AdminError,
    service::ZoneService,
    zone::{ResourceRecord, Zone},
};

/// HTTP admin API over the zone service
pub struct HttpServer {
    service: Arc<ZoneService>,
    users: Vec<ApiUser>,
    bind_addr: SocketAddr,
}

impl HttpServer {
    pub fn new(service: Arc<ZoneService>, users: Vec<ApiUser>, bind_addr: SocketAddr) -> Self {
        Self {
            service,
            users,
            bind_addr,
        }
    }

    pub fn from_config(config: &AdminConfig) -> Self {
        Self::new(
            Arc::new(ZoneService::system(config)),
            config.api_access.clone(),
            config.server.bind_addr,
        )
    }

    /// Start the HTTP server and serve until Ctrl-C
    pub async fn start(self) -> Result<(), Box<dyn std::error::Error>> {
        if self.users.is_empty() {
            warn!("No api_access users configured, admin API is unauthenticated");
        }

        let app = router(self.service, self.users);

        info!("Starting admin API on {}", self.bind_addr);
        let listener = tokio::net::TcpListener::bind(self.bind_addr).await?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Admin API stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[derive(Clone)]
struct AppState {
    service: Arc<ZoneService>,
    users: Arc<Vec<ApiUser>>,
    started_at: DateTime<Utc>,
}

/// Build the router: `/health` plus the zone API under `/api/v1/zones`.
/// With a non-empty `users` list every API route requires HTTP Basic
/// credentials matching one of them.
pub fn router(service: Arc<ZoneService>, users: Vec<ApiUser>) -> Router {
    let state = AppState {
        service,
        users: Arc::new(users),
        started_at: Utc::now(),
    };

    let api = Router::new()
        .route("/zones", get(list_zones).post(create_zone))
        .route(
            "/zones/{zone}",
            get(get_zone).put(update_zone).delete(delete_zone),
        )
        .route("/zones/{zone}/records", post(add_record))
        .route("/zones/{zone}/records/{name}/{type}", delete(delete_record))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_basic_auth,
        ));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Body of every non-listing API response
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Raw checker or reload output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiResponse {
    fn ok(message: &str, details: String) -> Self {
        Self {
            success: true,
            message: Some(message.to_string()),
            details: (!details.trim().is_empty()).then_some(details),
            ..Default::default()
        }
    }

    fn failure(error: String, details: Option<String>) -> Self {
        Self {
            success: false,
            error: Some(error),
            details,
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ZoneListResponse {
    pub success: bool,
    pub zones: Vec<String>,
    pub count: usize,
}

/// HTTP status for each error kind
pub fn status_for(err: &AdminError) -> StatusCode {
    match err {
        AdminError::NotFound(_) => StatusCode::NOT_FOUND,
        AdminError::Validation(_) => StatusCode::BAD_REQUEST,
        AdminError::Syntax { .. } | AdminError::Parse(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AdminError::Reload(_) => StatusCode::BAD_GATEWAY,
        AdminError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

enum ApiError {
    Admin(AdminError),
    Task(String),
}

impl From<AdminError> for ApiError {
    fn from(err: AdminError) -> Self {
        ApiError::Admin(err)
    }
}

impl ApiError {
    fn bad_request(message: String) -> Self {
        ApiError::Admin(AdminError::Validation(message))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Admin(err) => {
                let status = status_for(&err);
                if status.is_server_error() {
                    error!("Request failed: {}", err);
                } else {
                    warn!("Request rejected: {}", err);
                }
                let details = err.details().map(str::to_string);
                (status, ApiResponse::failure(err.to_string(), details))
            }
            ApiError::Task(message) => {
                error!("Worker task failed: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiResponse::failure(message, None),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Run a blocking service call off the async workers
async fn run_blocking<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&ZoneService) -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let service = state.service.clone();
    tokio::task::spawn_blocking(move || op(service.as_ref()))
        .await
        .map_err(|e| ApiError::Task(e.to_string()))?
        .map_err(ApiError::from)
}

async fn require_basic_auth(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if state.users.is_empty() || authorized(&state.users, req.headers()) {
        return next.run(req).await;
    }

    warn!("Rejected unauthenticated request to {}", req.uri());
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Basic realm=\"zonekeeper\"")],
        Json(ApiResponse::failure("Unauthorized".to_string(), None)),
    )
        .into_response()
}

fn authorized(users: &[ApiUser], headers: &HeaderMap) -> bool {
    let Some(encoded) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Basic "))
    else {
        return false;
    };

    let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
        return false;
    };
    let Ok(decoded) = String::from_utf8(decoded) else {
        return false;
    };
    let Some((username, password)) = decoded.split_once(':') else {
        return false;
    };

    users
        .iter()
        .any(|user| user.username == username && user.password == password)
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let now = Utc::now();
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "timestamp": now.to_rfc3339(),
            "uptime_seconds": (now - state.started_at).num_seconds(),
        })),
    )
}

async fn list_zones(State(state): State<AppState>) -> Result<Json<ZoneListResponse>, ApiError> {
    let zones = run_blocking(&state, |service| service.list_zones()).await?;
    Ok(Json(ZoneListResponse {
        success: true,
        count: zones.len(),
        zones,
    }))
}

async fn create_zone(
    State(state): State<AppState>,
    payload: Result<Json<Zone>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse>), ApiError> {
    let Json(zone) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let details = run_blocking(&state, move |service| service.create_zone(&zone)).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Zone created successfully", details)),
    ))
}

async fn get_zone(
    State(state): State<AppState>,
    Path(zone): Path<String>,
) -> Result<Json<Zone>, ApiError> {
    let zone = run_blocking(&state, move |service| service.get_zone(&zone)).await?;
    Ok(Json(zone))
}

#[derive(Deserialize)]
struct ZoneTextForm {
    zone_text: String,
}

/// Raw zone text, either as a `zone_text` form field or as the whole body
async fn zone_text(request: Request) -> Result<String, ApiError> {
    let is_form = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

    let text = if is_form {
        let Form(form) = Form::<ZoneTextForm>::from_request(request, &())
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        form.zone_text
    } else {
        String::from_request(request, &())
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?
    };

    if text.trim().is_empty() {
        return Err(ApiError::bad_request("zone text is required".to_string()));
    }
    Ok(text)
}

async fn update_zone(
    State(state): State<AppState>,
    Path(zone): Path<String>,
    request: Request,
) -> Result<Json<ApiResponse>, ApiError> {
    let text = zone_text(request).await?;
    let details = run_blocking(&state, move |service| service.replace_zone(&zone, &text)).await?;

    Ok(Json(ApiResponse::ok("Zone updated successfully", details)))
}

async fn delete_zone(
    State(state): State<AppState>,
    Path(zone): Path<String>,
) -> Result<Json<ApiResponse>, ApiError> {
    let details = run_blocking(&state, move |service| service.delete_zone(&zone)).await?;
    Ok(Json(ApiResponse::ok("Zone deleted successfully", details)))
}

async fn add_record(
    State(state): State<AppState>,
    Path(zone): Path<String>,
    payload: Result<Json<ResourceRecord>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse>), ApiError> {
    let Json(record) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let details = run_blocking(&state, move |service| service.add_record(&zone, record)).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Record added successfully", details)),
    ))
}

async fn delete_record(
    State(state): State<AppState>,
    Path((zone, name, rtype)): Path<(String, String, String)>,
) -> Result<Json<ApiResponse>, ApiError> {
    let details = run_blocking(&state, move |service| {
        service.delete_record(&zone, &name, &rtype)
    })
    .await?;

    Ok(Json(ApiResponse::ok("Record deleted successfully", details)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use std::io;

    fn user(username: &str, password: &str) -> ApiUser {
        ApiUser {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    fn basic(credentials: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let value = format!("Basic {}", STANDARD.encode(credentials));
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&value).unwrap(),
        );
        headers
    }

    #[test]
    fn test_basic_auth_matching() {
        let users = vec![user("admin", "s3cret:with-colon")];

        assert!(authorized(&users, &basic("admin:s3cret:with-colon")));
        assert!(!authorized(&users, &basic("admin:wrong")));
        assert!(!authorized(&users, &basic("nobody")));
        assert!(!authorized(&users, &HeaderMap::new()));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&AdminError::NotFound("zone x".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&AdminError::Validation("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&AdminError::config_syntax("bad")),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&AdminError::Reload("rndc: connect failed".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&io::Error::other("disk").into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_response_omits_empty_details() {
        let body = serde_json::to_value(ApiResponse::ok("Zone deleted successfully", String::new()))
            .unwrap();
        assert_eq!(
            body,
            json!({"success": true, "message": "Zone deleted successfully"})
        );
    }
}
