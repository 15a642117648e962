//! HTTP API
//!
//! Endpoints:
//! - POST /api/get-password    : issue the next credential for a vendor
//! - POST /api/typebot-webhook : chatbot variant, always answers 200
//! - POST /api/sync-typebot    : alias of typebot-webhook
//! - POST /api/reset-password  : release a credential back to the pool
//! - POST /api/refresh-sheet   : reload the table from the store
//! - GET  /api/stats           : slot counts per vendor
//! - GET  /health              : 200 when the last refresh succeeded, 503 otherwise
//! - GET  /metrics             : Prometheus text exposition
//!
//! Credential values appear in response bodies only, never in logs.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderName, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use credential_pool::{Error, Issuer, PoolHealth};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    issuer: Arc<Issuer>,
    prometheus: PrometheusHandle,
    started_at: Instant,
}

impl AppState {
    pub fn new(issuer: Arc<Issuer>, prometheus: PrometheusHandle) -> Self {
        Self {
            issuer,
            prometheus,
            started_at: Instant::now(),
        }
    }
}

/// Build the axum router with all routes and shared state.
///
/// `max_connections` bounds the number of requests handled at once.
pub fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/api/get-password", post(get_password))
        .route("/api/typebot-webhook", post(typebot_webhook))
        .route("/api/sync-typebot", post(sync_typebot))
        .route("/api/reset-password", post(reset_password))
        .route("/api/refresh-sheet", post(refresh_sheet))
        .route("/api/stats", get(stats))
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

type JsonResponse = (StatusCode, [(HeaderName, &'static str); 1], String);

fn json_response(
    route: &'static str,
    started: Instant,
    status: StatusCode,
    body: serde_json::Value,
) -> JsonResponse {
    crate::metrics::record_request(route, status.as_u16(), started.elapsed().as_secs_f64());
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// Parse a JSON body. An empty body parses as `T::default()`.
fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| format!("invalid JSON body: {e}"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn sms_status(notified: Option<bool>) -> &'static str {
    if notified == Some(true) { "sent" } else { "failed" }
}

fn request_id() -> String {
    format!("req_{}", uuid::Uuid::new_v4().as_simple())
}

#[derive(Debug, Default, Deserialize)]
struct GetPasswordRequest {
    #[serde(default)]
    vendor: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    phone_number: Option<String>,
}

/// POST /api/get-password: issue a credential and optionally text it.
///
/// 404 covers both an unknown vendor and an exhausted one; 503 means the
/// store rejected the write and nothing was issued.
async fn get_password(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    const ROUTE: &str = "/api/get-password";
    let started = Instant::now();

    let request: GetPasswordRequest = match parse_body(&body) {
        Ok(r) => r,
        Err(msg) => {
            return json_response(ROUTE, started, StatusCode::BAD_REQUEST, serde_json::json!({ "error": msg }));
        }
    };
    let Some(vendor) = non_blank(request.vendor) else {
        return json_response(
            ROUTE,
            started,
            StatusCode::BAD_REQUEST,
            serde_json::json!({ "error": "Vendor parameter is required" }),
        );
    };
    let contact = non_blank(request.phone_number);
    let request_id = request_id();

    match state
        .issuer
        .allocate_and_notify(&vendor, contact.as_deref())
        .await
    {
        Ok(issued) => {
            info!(
                request_id,
                vendor = %issued.allocation.vendor,
                user_id = request.user_id.as_deref().unwrap_or("unknown"),
                row = issued.allocation.row,
                "credential assigned"
            );
            let mut body = serde_json::json!({
                "vendor": issued.allocation.vendor,
                "password": issued.allocation.credential,
                "password_number": issued.allocation.slot,
                "row_index": issued.allocation.row,
            });
            if contact.is_some() {
                body["sms_status"] = sms_status(issued.notified).into();
            }
            json_response(ROUTE, started, StatusCode::OK, body)
        }
        Err(e) if e.is_not_found() => {
            debug!(request_id, vendor, reason = e.label(), "no credential available");
            json_response(
                ROUTE,
                started,
                StatusCode::NOT_FOUND,
                serde_json::json!({ "error": format!("No available passwords for vendor: {vendor}") }),
            )
        }
        Err(e) => {
            warn!(request_id, vendor, error = %e, "credential assignment failed");
            json_response(
                ROUTE,
                started,
                StatusCode::SERVICE_UNAVAILABLE,
                serde_json::json!({ "error": e.to_string() }),
            )
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypebotRequest {
    #[serde(default)]
    vendor: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    phone_number: Option<String>,
}

/// POST /api/typebot-webhook
async fn typebot_webhook(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let started = Instant::now();
    let reply = typebot_reply(&state, &body).await;
    json_response("/api/typebot-webhook", started, StatusCode::OK, reply)
}

/// POST /api/sync-typebot
async fn sync_typebot(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let started = Instant::now();
    let reply = typebot_reply(&state, &body).await;
    json_response("/api/sync-typebot", started, StatusCode::OK, reply)
}

fn typebot_failure(message: String) -> serde_json::Value {
    serde_json::json!({
        "success": false,
        "has_password": false,
        "message": message,
    })
}

/// Chatbot reply. Every outcome is a 200 so the bot can branch on `has_password`.
async fn typebot_reply(state: &AppState, body: &[u8]) -> serde_json::Value {
    let request: TypebotRequest = match parse_body(body) {
        Ok(r) => r,
        Err(msg) => return typebot_failure(msg),
    };
    let Some(vendor) = non_blank(request.vendor) else {
        return typebot_failure("No vendor specified".to_string());
    };
    let contact = non_blank(request.phone_number);
    let request_id = request_id();

    match state
        .issuer
        .allocate_and_notify(&vendor, contact.as_deref())
        .await
    {
        Ok(issued) => {
            let vendor = issued.allocation.vendor;
            info!(
                request_id,
                vendor = %vendor,
                user_id = request.user_id.as_deref().unwrap_or("unknown"),
                row = issued.allocation.row,
                "credential assigned via chatbot"
            );
            let mut message = format!("Senha para {vendor} enviada com sucesso!");
            let mut reply = serde_json::json!({
                "success": true,
                "has_password": true,
                "vendor": vendor,
                "password": issued.allocation.credential,
            });
            if let Some(address) = contact {
                reply["sms_status"] = sms_status(issued.notified).into();
                match issued.notified {
                    Some(true) => message.push_str(&format!(" SMS enviado para {address}.")),
                    // Only mention a failed SMS when a channel is configured.
                    Some(false) => message.push_str(&format!(" Falha ao enviar SMS para {address}.")),
                    None => {}
                }
            }
            reply["message"] = message.into();
            reply
        }
        Err(e) if e.is_not_found() => {
            debug!(request_id, vendor, reason = e.label(), "no credential available");
            typebot_failure(format!(
                "Todas as senhas para {vendor} já foram utilizadas. Por favor, contate o administrador."
            ))
        }
        Err(e) => {
            warn!(request_id, vendor, error = %e, "chatbot credential assignment failed");
            typebot_failure(format!("Erro ao processar solicitação: {e}"))
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ResetPasswordRequest {
    #[serde(default)]
    vendor: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

/// POST /api/reset-password: mark the row holding `password` as unused.
async fn reset_password(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    const ROUTE: &str = "/api/reset-password";
    let started = Instant::now();

    let request: ResetPasswordRequest = match parse_body(&body) {
        Ok(r) => r,
        Err(msg) => {
            return json_response(ROUTE, started, StatusCode::BAD_REQUEST, serde_json::json!({ "error": msg }));
        }
    };
    let (Some(vendor), Some(password)) = (non_blank(request.vendor), non_blank(request.password))
    else {
        return json_response(
            ROUTE,
            started,
            StatusCode::BAD_REQUEST,
            serde_json::json!({ "error": "Vendor and password parameters are required" }),
        );
    };

    match state.issuer.pool().try_release(&vendor, &password).await {
        Ok(release) => json_response(
            ROUTE,
            started,
            StatusCode::OK,
            serde_json::json!({
                "status": "success",
                "message": "Password reset to unused",
                "row_index": release.row,
            }),
        ),
        Err(e) => {
            match &e {
                Error::StoreUnavailable(_) => warn!(vendor, error = %e, "credential release failed"),
                _ => debug!(vendor, reason = e.label(), "credential release found nothing"),
            }
            json_response(
                ROUTE,
                started,
                StatusCode::NOT_FOUND,
                serde_json::json!({ "error": "Password not found or could not be reset" }),
            )
        }
    }
}

/// POST /api/refresh-sheet: reload the table now.
///
/// A failed reload still answers 200; the body reports the degraded state.
async fn refresh_sheet(State(state): State<AppState>) -> impl IntoResponse {
    let started = Instant::now();
    let pool = state.issuer.pool();
    let (status, message) = match pool.refresh().await {
        PoolHealth::Healthy => ("success", "Sheet data refreshed"),
        PoolHealth::Degraded { .. } => ("degraded", "Sheet refresh failed, pool is empty"),
    };
    json_response(
        "/api/refresh-sheet",
        started,
        StatusCode::OK,
        serde_json::json!({
            "status": status,
            "message": message,
            "health": pool.health().await,
        }),
    )
}

/// GET /api/stats: dashboard feed. Always renders a complete report.
async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    let started = Instant::now();
    let stats = state.issuer.pool().statistics().await;
    let body = serde_json::to_value(&stats).unwrap_or_else(|_| {
        serde_json::json!({
            "total_vendors": 0,
            "total": 0,
            "available": 0,
            "used": 0,
            "vendors": {},
        })
    });
    json_response("/api/stats", started, StatusCode::OK, body)
}

/// GET /health: pool health plus service uptime.
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let pool = state.issuer.pool();
    let notifier = state.issuer.notifier();

    let mut body = pool.health().await;
    body["notifier"] = serde_json::json!({
        "id": notifier.id(),
        "configured": notifier.is_configured(),
    });
    body["uptime_seconds"] = state.started_at.elapsed().as_secs().into();

    let status_code = if pool.pool_health().await.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        [(header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// GET /metrics: Prometheus text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use credential_pool::{PoolManager, SheetLayout};
    use notifier::{DisabledNotifier, Notifier, NotifyError};
    use pool_store::MemoryStore;
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;
    use tower::ServiceExt;

    /// Notifier that is configured and either always succeeds or always fails.
    struct StubNotifier {
        succeed: bool,
    }

    impl Notifier for StubNotifier {
        fn id(&self) -> &str {
            "stub"
        }

        fn is_configured(&self) -> bool {
            true
        }

        fn send<'a>(
            &'a self,
            _address: &'a str,
            _message: &'a str,
        ) -> Pin<Box<dyn Future<Output = notifier::Result<String>> + Send + 'a>> {
            let succeed = self.succeed;
            Box::pin(async move {
                if succeed {
                    Ok("SM1".to_string())
                } else {
                    Err(NotifyError::Http("connection refused".into()))
                }
            })
        }
    }

    fn test_prometheus_handle() -> PrometheusHandle {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .build_recorder()
            .handle()
    }

    async fn test_app_with(store: Arc<MemoryStore>, notifier: Arc<dyn Notifier>) -> Router {
        let pool = PoolManager::new(store, SheetLayout::single_slot(), Duration::from_secs(5)).await;
        let issuer = Issuer::new(Arc::new(pool), notifier);
        build_router(AppState::new(Arc::new(issuer), test_prometheus_handle()), 1000)
    }

    async fn test_app(store: Arc<MemoryStore>) -> Router {
        test_app_with(store, Arc::new(DisabledNotifier)).await
    }

    async fn send(app: &Router, method: &str, uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn get_password_issues_next_credential() {
        let app = test_app(Arc::new(MemoryStore::demo())).await;

        let (status, json) = send(&app, "POST", "/api/get-password", r#"{"vendor":"acme"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["vendor"], "Acme");
        assert_eq!(json["password"], "ACME-7431");
        assert_eq!(json["password_number"], 1);
        assert_eq!(json["row_index"], 2);
        assert!(json.get("sms_status").is_none());

        let (_, json) = send(&app, "POST", "/api/get-password", r#"{"vendor":"Acme"}"#).await;
        assert_eq!(json["password"], "ACME-2290");
        assert_eq!(json["row_index"], 3);
    }

    #[tokio::test]
    async fn get_password_requires_vendor() {
        let app = test_app(Arc::new(MemoryStore::demo())).await;

        let (status, json) = send(&app, "POST", "/api/get-password", r#"{"user_id":"u1"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Vendor parameter is required");

        let (status, _) = send(&app, "POST", "/api/get-password", "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, json) = send(&app, "POST", "/api/get-password", "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("invalid JSON"));
    }

    #[tokio::test]
    async fn get_password_not_found_for_unknown_and_exhausted() {
        let app = test_app(Arc::new(MemoryStore::demo())).await;

        let (status, json) = send(&app, "POST", "/api/get-password", r#"{"vendor":"ghost"}"#).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "No available passwords for vendor: ghost");

        // Umbrella's only row is already used.
        let (status, _) = send(&app, "POST", "/api/get-password", r#"{"vendor":"umbrella"}"#).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "POST", "/api/get-password", r#"{"vendor":"initech"}"#).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, "POST", "/api/get-password", r#"{"vendor":"initech"}"#).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn get_password_store_failure_is_503() {
        let store = Arc::new(MemoryStore::demo());
        let app = test_app(store.clone()).await;
        store.set_fail_writes(true);

        let (status, json) = send(&app, "POST", "/api/get-password", r#"{"vendor":"acme"}"#).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(json["error"].as_str().unwrap().contains("store unavailable"));
    }

    #[tokio::test]
    async fn get_password_reports_sms_status() {
        let app = test_app_with(
            Arc::new(MemoryStore::demo()),
            Arc::new(StubNotifier { succeed: true }),
        )
        .await;
        let (_, json) = send(
            &app,
            "POST",
            "/api/get-password",
            r#"{"vendor":"acme","phone_number":"5511999990000"}"#,
        )
        .await;
        assert_eq!(json["sms_status"], "sent");

        // No channel configured: the SMS is reported as failed.
        let app = test_app(Arc::new(MemoryStore::demo())).await;
        let (status, json) = send(
            &app,
            "POST",
            "/api/get-password",
            r#"{"vendor":"acme","phone_number":"5511999990000"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["sms_status"], "failed");
    }

    #[tokio::test]
    async fn typebot_webhook_success_shape() {
        let app = test_app_with(
            Arc::new(MemoryStore::demo()),
            Arc::new(StubNotifier { succeed: true }),
        )
        .await;

        let (status, json) = send(
            &app,
            "POST",
            "/api/typebot-webhook",
            r#"{"vendor":"globex","userId":"u1","phoneNumber":"+5511999990000"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["has_password"], true);
        assert_eq!(json["vendor"], "Globex");
        assert_eq!(json["password"], "GLX-8820");
        assert_eq!(json["sms_status"], "sent");
        assert_eq!(
            json["message"],
            "Senha para Globex enviada com sucesso! SMS enviado para +5511999990000."
        );
    }

    #[tokio::test]
    async fn typebot_mentions_sms_failure_only_when_configured() {
        let app = test_app_with(
            Arc::new(MemoryStore::demo()),
            Arc::new(StubNotifier { succeed: false }),
        )
        .await;
        let (_, json) = send(
            &app,
            "POST",
            "/api/sync-typebot",
            r#"{"vendor":"acme","phoneNumber":"123"}"#,
        )
        .await;
        assert_eq!(json["sms_status"], "failed");
        assert!(json["message"].as_str().unwrap().contains("Falha ao enviar SMS para 123."));

        let app = test_app(Arc::new(MemoryStore::demo())).await;
        let (_, json) = send(
            &app,
            "POST",
            "/api/sync-typebot",
            r#"{"vendor":"acme","phoneNumber":"123"}"#,
        )
        .await;
        assert_eq!(json["sms_status"], "failed");
        assert_eq!(json["message"], "Senha para Acme enviada com sucesso!");
    }

    #[tokio::test]
    async fn typebot_failures_still_answer_200() {
        let store = Arc::new(MemoryStore::demo());
        let app = test_app(store.clone()).await;

        let (status, json) = send(&app, "POST", "/api/typebot-webhook", r#"{"vendor":"umbrella"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], false);
        assert_eq!(json["has_password"], false);
        assert_eq!(
            json["message"],
            "Todas as senhas para umbrella já foram utilizadas. Por favor, contate o administrador."
        );
        assert!(json.get("password").is_none());

        let (status, json) = send(&app, "POST", "/api/typebot-webhook", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "No vendor specified");

        let (status, json) = send(&app, "POST", "/api/typebot-webhook", "[1,2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], false);

        store.set_fail_writes(true);
        let (status, json) = send(&app, "POST", "/api/typebot-webhook", r#"{"vendor":"acme"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["message"].as_str().unwrap().starts_with("Erro ao processar"));
    }

    #[tokio::test]
    async fn reset_password_releases_row() {
        let store = Arc::new(MemoryStore::demo());
        let app = test_app(store.clone()).await;

        let (status, json) = send(
            &app,
            "POST",
            "/api/reset-password",
            r#"{"vendor":"globex","password":"GLX-5512"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "success");
        assert_eq!(json["row_index"], 4);
        assert_eq!(store.cell(4, "C").await, "");

        let (_, json) = send(&app, "POST", "/api/get-password", r#"{"vendor":"globex"}"#).await;
        assert_eq!(json["password"], "GLX-5512");
    }

    #[tokio::test]
    async fn reset_password_errors() {
        let app = test_app(Arc::new(MemoryStore::demo())).await;

        let (status, json) = send(&app, "POST", "/api/reset-password", r#"{"vendor":"acme"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Vendor and password parameters are required");

        let (status, _) = send(
            &app,
            "POST",
            "/api/reset-password",
            r#"{"vendor":"acme","password":"NOPE"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn stats_reports_slot_counts() {
        let app = test_app(Arc::new(MemoryStore::demo())).await;
        send(&app, "POST", "/api/get-password", r#"{"vendor":"acme"}"#).await;

        let (status, json) = send(&app, "GET", "/api/stats", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["total_vendors"], 4);
        assert_eq!(json["total"], 6);
        assert_eq!(json["used"], 3);
        assert_eq!(json["available"], 3);
        assert_eq!(json["vendors"]["Acme"]["used"], 1);
    }

    #[tokio::test]
    async fn refresh_failure_degrades_health() {
        let store = Arc::new(MemoryStore::demo());
        let app = test_app(store.clone()).await;

        let (status, json) = send(&app, "GET", "/health", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["store"], "memory");
        assert_eq!(json["notifier"]["configured"], false);

        store.set_fail_reads(true);
        let (status, json) = send(&app, "POST", "/api/refresh-sheet", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["health"]["rows"], 0);

        let (status, json) = send(&app, "GET", "/health", "").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["status"], "degraded");

        let (_, json) = send(&app, "GET", "/api/stats", "").await;
        assert_eq!(json["total"], 0);

        store.set_fail_reads(false);
        let (_, json) = send(&app, "POST", "/api/refresh-sheet", "").await;
        assert_eq!(json["status"], "success");
        assert_eq!(json["message"], "Sheet data refreshed");
    }

    #[tokio::test]
    async fn metrics_endpoint_returns_prometheus_format() {
        let app = test_app(Arc::new(MemoryStore::demo())).await;
        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap();
        assert!(content_type.starts_with("text/plain"));
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let app = test_app(Arc::new(MemoryStore::demo())).await;
        let response = app
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
