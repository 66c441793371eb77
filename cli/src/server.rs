use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::{Local, NaiveDate};
use log::{error, info};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;

use synclife_core::Error;
use synclife_core::dashboard::DashboardView;
use synclife_core::media::{MediaItem, MediaSummary};
use synclife_core::models::{
    DailyMetrics, DailyRecord, Profile, ProfileUpdate, validate_gender, validate_supplement,
};
use synclife_core::service::SyncLifeService;
use synclife_core::users::User;

const BODY_LIMIT: usize = 50 * 1024 * 1024; // 50 MB

#[derive(Clone)]
struct AppState {
    svc: Arc<Mutex<SyncLifeService>>,
    api_key: Option<String>,
}

impl AppState {
    fn svc(&self) -> MutexGuard<'_, SyncLifeService> {
        self.svc.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct UserQuery {
    #[serde(default)]
    user: String,
}

impl UserQuery {
    fn key(&self) -> String {
        self.user.trim().to_lowercase()
    }
}

#[derive(Deserialize)]
struct HistoryQuery {
    #[serde(default)]
    user: String,
    days: Option<u32>,
}

#[derive(Deserialize)]
struct MediaQuery {
    #[serde(default)]
    user: String,
    name: Option<String>,
}

#[derive(Deserialize)]
struct SaveRecordRequest {
    #[serde(flatten)]
    metrics: DailyMetrics,
    /// Left out keeps the day's saved notes.
    notes: Option<String>,
    #[serde(default)]
    profile: ProfileUpdate,
}

#[derive(Deserialize)]
struct RegisterRequest {
    email: String,
    name: String,
    password: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct MediaListing {
    count: usize,
    total_bytes: usize,
    items: Vec<MediaSummary>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Conflict(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::Internal(err) => {
                error!("internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<Error>() {
            Some(Error::Auth) => Self::Unauthorized(err.to_string()),
            Some(Error::UserExists(_)) => Self::Conflict(err.to_string()),
            Some(Error::InvalidInput(msg)) => Self::BadRequest(msg.clone()),
            Some(Error::Io { .. }) | None => Self::Internal(err),
        }
    }
}

fn parse_date(date_str: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("Invalid date '{date_str}'. Use YYYY-MM-DD")))
}

fn bad_request(err: &anyhow::Error) -> ApiError {
    ApiError::BadRequest(format!("{err:#}"))
}

// --- Middleware ---

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(ref expected_key) = state.api_key {
        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected_key);

        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Invalid or missing API key".to_string(),
                }),
            )
                .into_response();
        }
    }
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Handlers ---

async fn save_record(
    State(state): State<AppState>,
    Path(date_str): Path<String>,
    Query(q): Query<UserQuery>,
    Json(req): Json<SaveRecordRequest>,
) -> Result<Json<DailyRecord>, ApiError> {
    let date = parse_date(&date_str)?;

    let mut update = req.profile;
    update.gender = update
        .gender
        .as_deref()
        .map(validate_gender)
        .transpose()
        .map_err(|e| bad_request(&e))?;

    let mut metrics = req.metrics;
    metrics.supplements = metrics
        .supplements
        .iter()
        .map(|s| validate_supplement(s))
        .collect::<anyhow::Result<_>>()
        .map_err(|e| bad_request(&e))?;

    let user = q.key();
    let mut svc = state.svc();
    metrics.notes = match req.notes {
        Some(n) => n,
        None => svc.saved_notes(&user, date),
    };
    let record = svc.log_day(&user, date, update, metrics, Vec::new())?;
    Ok(Json(record))
}

async fn get_record(
    State(state): State<AppState>,
    Path(date_str): Path<String>,
    Query(q): Query<UserQuery>,
) -> Result<Json<DailyRecord>, ApiError> {
    let date = parse_date(&date_str)?;
    state
        .svc()
        .get_entry(&q.key(), date)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No entry for {date}")))
}

async fn get_dashboard(
    State(state): State<AppState>,
    Path(date_str): Path<String>,
    Query(q): Query<UserQuery>,
) -> Result<Json<DashboardView>, ApiError> {
    let date = parse_date(&date_str)?;
    state
        .svc()
        .dashboard(&q.key(), date)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No entry for {date}")))
}

async fn get_history(
    State(state): State<AppState>,
    Query(q): Query<HistoryQuery>,
) -> Json<Vec<DailyRecord>> {
    let user = q.user.trim().to_lowercase();
    let today = Local::now().date_naive();
    Json(state.svc().history(&user, q.days, today))
}

async fn get_profile(State(state): State<AppState>, Query(q): Query<UserQuery>) -> Json<Profile> {
    Json(state.svc().current_profile(&q.key()))
}

async fn register_user(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state.svc().register(&req.email, &req.name, &req.password)?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn login_user(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<User>, ApiError> {
    let user = state.svc().login(&req.email, &req.password)?;
    Ok(Json(user))
}

async fn attach_media(
    State(state): State<AppState>,
    Path(date_str): Path<String>,
    Query(q): Query<MediaQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<MediaListing>), ApiError> {
    let date = parse_date(&date_str)?;
    if body.is_empty() {
        return Err(ApiError::BadRequest("Empty upload".to_string()));
    }

    let user = q.user.trim().to_lowercase();
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let mut svc = state.svc();
    let name = q
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| format!("upload-{}", svc.media_for(&user, date).len() + 1));
    svc.attach_media(
        &user,
        date,
        MediaItem {
            name,
            content_type,
            bytes: body.to_vec(),
        },
    );

    Ok((StatusCode::CREATED, Json(listing(svc.media_for(&user, date)))))
}

async fn list_media(
    State(state): State<AppState>,
    Path(date_str): Path<String>,
    Query(q): Query<UserQuery>,
) -> Result<Json<MediaListing>, ApiError> {
    let date = parse_date(&date_str)?;
    Ok(Json(listing(state.svc().media_for(&q.key(), date))))
}

fn listing(items: Vec<MediaSummary>) -> MediaListing {
    MediaListing {
        count: items.len(),
        total_bytes: items.iter().map(|m| m.size_bytes).sum(),
        items,
    }
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/records/{date}", put(save_record).get(get_record))
        .route("/api/dashboard/{date}", get(get_dashboard))
        .route("/api/history", get(get_history))
        .route("/api/profile", get(get_profile))
        .route("/api/users", post(register_user))
        .route("/api/login", post(login_user))
        .route("/api/media/{date}", post(attach_media).get(list_media))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

/// First and last four characters of `key`, or a placeholder when it is too
/// short to show any of it.
fn redact_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() < 12 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

// --- Server startup ---

pub async fn start_server(
    svc: SyncLifeService,
    port: u16,
    bind: &str,
    api_key: Option<String>,
    new_api_key: bool,
) -> anyhow::Result<()> {
    let records_path = svc.records_path().display().to_string();
    let state = AppState {
        svc: Arc::new(Mutex::new(svc)),
        api_key: api_key.clone(),
    };

    let app = build_router(state);

    if let Some(ref key) = api_key {
        if !new_api_key {
            eprintln!(
                "API key: {} (see api_key file in data directory)",
                redact_key(key)
            );
        }
    } else {
        eprintln!("Warning: Authentication disabled (--no-auth). API is open to anyone.");
    }

    if bind != "127.0.0.1" && bind != "localhost" && api_key.is_none() {
        eprintln!(
            "Warning: Listening on {bind} with no authentication. Any device on your network can access this API."
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}"))
        .await
        .with_context(|| format!("failed to bind {bind}:{port}"))?;
    info!("serving records from {records_path}");
    eprintln!("Listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_app(api_key: Option<String>) -> (Router, tempfile::TempDir) {
        let tmp = tempfile::TempDir::new().unwrap();
        let state = AppState {
            svc: Arc::new(Mutex::new(SyncLifeService::open(tmp.path()))),
            api_key,
        };
        (build_router(state), tmp)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    fn put_json(uri: &str, body: &serde_json::Value) -> axum::http::Request<Body> {
        axum::http::Request::put(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn post_json(uri: &str, body: &serde_json::Value) -> axum::http::Request<Body> {
        axum::http::Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> axum::http::Request<Body> {
        axum::http::Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn auth_missing_key_returns_401() {
        let (app, _tmp) = test_app(Some("test-key-abc123".to_string()));

        let response = app.oneshot(get("/api/profile")).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Invalid or missing API key");
    }

    #[tokio::test]
    async fn auth_wrong_key_returns_401() {
        let (app, _tmp) = test_app(Some("test-key-abc123".to_string()));

        let response = app
            .oneshot(
                axum::http::Request::get("/api/profile")
                    .header("Authorization", "Bearer wrong-key")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn auth_correct_key_succeeds() {
        let (app, _tmp) = test_app(Some("test-key-abc123".to_string()));

        let response = app
            .oneshot(
                axum::http::Request::get("/api/profile")
                    .header("Authorization", "Bearer test-key-abc123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn security_headers_present() {
        let (app, _tmp) = test_app(Some("secret".to_string()));

        let response = app.oneshot(get("/api/profile")).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
        assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
        assert_eq!(
            response.headers().get("content-security-policy").unwrap(),
            "default-src 'none'"
        );
    }

    #[tokio::test]
    async fn body_size_limit_rejects_oversized() {
        let (app, _tmp) = test_app(None);

        let big_body = vec![0u8; BODY_LIMIT + 1];
        let response = app
            .oneshot(
                axum::http::Request::post("/api/media/2024-01-01")
                    .header("content-type", "image/jpeg")
                    .body(Body::from(big_body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn internal_error_does_not_leak_details() {
        let error = ApiError::Internal(anyhow::anyhow!("secret path /home/user/synclife.csv"));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["error"], "Internal server error");
    }

    #[tokio::test]
    async fn profile_defaults_without_entries() {
        let (app, _tmp) = test_app(None);

        let response = app.oneshot(get("/api/profile?user=a@x.com")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["name"], "User");
        assert_eq!(json["target_steps"], 10000);
    }

    #[tokio::test]
    async fn save_then_read_record_and_dashboard() {
        let (app, _tmp) = test_app(None);

        let body = serde_json::json!({
            "weight_kg": 70.0,
            "steps": 5000,
            "sleep_hours": 7,
            "sleep_minutes": 30,
            "calories": 1800,
            "supplements": ["omega 3 fish oil"],
            "notes": "felt good",
            "profile": { "name": "Ana", "height_cm": 175.0 }
        });
        let response = app
            .clone()
            .oneshot(put_json("/api/records/2024-03-01?user=A@x.com", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let saved = body_json(response).await;
        assert_eq!(saved["User_ID"], "a@x.com");
        assert_eq!(saved["User_Name"], "Ana");
        assert_eq!(saved["Supplements"], "Omega 3 Fish Oil");

        let response = app
            .clone()
            .oneshot(get("/api/records/2024-03-01?user=a@x.com"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["Steps"], 5000);

        let response = app
            .clone()
            .oneshot(get("/api/dashboard/2024-03-01?user=a@x.com"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let view = body_json(response).await;
        assert_eq!(view["bmi_class"], "Healthy Weight");
        assert_eq!(view["steps"]["ratio"], 0.5);
        assert_eq!(view["details"]["notes"], "felt good");

        let response = app
            .oneshot(get("/api/history?user=a@x.com"))
            .await
            .unwrap();
        let history = body_json(response).await;
        assert_eq!(history.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_record_returns_404() {
        let (app, _tmp) = test_app(None);

        let response = app
            .clone()
            .oneshot(get("/api/records/2024-03-01"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(get("/api/dashboard/2024-03-01"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn redact_key_handles_short_and_multibyte_keys() {
        assert_eq!(redact_key("0123456789abcdef"), "0123...cdef");
        assert_eq!(redact_key("abc"), "****");
        assert_eq!(redact_key(""), "****");
        assert_eq!(redact_key("ééééxxxxxxxxüüüü"), "éééé...üüüü");
    }

    #[tokio::test]
    async fn put_without_notes_keeps_saved_notes() {
        let (app, _tmp) = test_app(None);

        let first = serde_json::json!({ "steps": 100, "notes": "long walk" });
        let response = app
            .clone()
            .oneshot(put_json("/api/records/2024-03-01", &first))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let edit = serde_json::json!({ "steps": 9000 });
        let response = app
            .clone()
            .oneshot(put_json("/api/records/2024-03-01", &edit))
            .await
            .unwrap();
        let saved = body_json(response).await;
        assert_eq!(saved["Steps"], 9000);
        assert_eq!(saved["Daily_Notes"], "long walk");

        let cleared = serde_json::json!({ "steps": 9000, "notes": "" });
        let response = app
            .oneshot(put_json("/api/records/2024-03-01", &cleared))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["Daily_Notes"], "");
    }

    #[tokio::test]
    async fn invalid_date_returns_400() {
        let (app, _tmp) = test_app(None);
        let response = app.oneshot(get("/api/records/03-01-2024")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn invalid_gender_or_supplement_returns_400() {
        let (app, _tmp) = test_app(None);

        let body = serde_json::json!({ "profile": { "gender": "robot" } });
        let response = app
            .clone()
            .oneshot(put_json("/api/records/2024-03-01", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = serde_json::json!({ "supplements": ["Moon dust"] });
        let response = app
            .clone()
            .oneshot(put_json("/api/records/2024-03-01", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(get("/api/records/2024-03-01"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn register_login_and_conflict() {
        let (app, _tmp) = test_app(None);

        let body = serde_json::json!({
            "email": "ana@x.com",
            "name": "Ana",
            "password": "hunter2"
        });
        let response = app
            .clone()
            .oneshot(post_json("/api/users", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_json(response).await["email"], "ana@x.com");

        let response = app
            .clone()
            .oneshot(post_json("/api/users", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let login = serde_json::json!({ "email": "ana@x.com", "password": "hunter2" });
        let response = app
            .clone()
            .oneshot(post_json("/api/login", &login))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["name"], "Ana");

        let wrong = serde_json::json!({ "email": "ana@x.com", "password": "nope" });
        let response = app
            .oneshot(post_json("/api/login", &wrong))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn register_invalid_email_returns_400() {
        let (app, _tmp) = test_app(None);
        let body = serde_json::json!({ "email": "nope", "name": "X", "password": "pw" });
        let response = app.oneshot(post_json("/api/users", &body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn media_upload_appends_for_session() {
        let (app, _tmp) = test_app(None);

        for name in ["breakfast.jpg", "scale.png"] {
            let response = app
                .clone()
                .oneshot(
                    axum::http::Request::post(format!("/api/media/2024-03-01?user=u@x.com&name={name}"))
                        .header("content-type", "image/jpeg")
                        .body(Body::from(vec![1u8; 10]))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let response = app
            .clone()
            .oneshot(get("/api/media/2024-03-01?user=u@x.com"))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["count"], 2);
        assert_eq!(json["total_bytes"], 20);
        assert_eq!(json["items"][1]["name"], "scale.png");

        let response = app
            .oneshot(get("/api/media/2024-03-01?user=other@x.com"))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["count"], 0);
    }

    #[tokio::test]
    async fn empty_media_upload_returns_400() {
        let (app, _tmp) = test_app(None);
        let response = app
            .oneshot(
                axum::http::Request::post("/api/media/2024-03-01")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
