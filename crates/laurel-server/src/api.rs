use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use laurel_engine::Orchestrator;
use laurel_shared::{
    AwardRecord, Badge, BadgeCategory, BadgeDraft, BadgeId, CategoryDraft, CategoryId,
    TriggerContext, TriggerType, UserId,
};
use laurel_store::StoreBackend;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::ServerError;

#[derive(Clone)]
pub struct AppState {
    pub store: StoreBackend,
    pub engine: Arc<Orchestrator>,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/triggers", post(fire_trigger))
        .route("/users/:user_id/badges", get(user_badges))
        .route("/users/:user_id/badges/seen", post(mark_seen))
        .route("/admin/categories", get(list_categories).post(create_category))
        .route(
            "/admin/categories/:id",
            axum::routing::put(update_category).delete(delete_category),
        )
        .route("/admin/badges", get(list_badges).post(create_badge))
        .route(
            "/admin/badges/:id",
            get(get_badge).put(update_badge).delete(delete_badge),
        )
        .route("/admin/badges/:id/grant", post(grant_badge))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─── Request / response bodies ───

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    name: String,
    version: &'static str,
}

#[derive(Deserialize)]
struct TriggerRequest {
    user_id: UserId,
    trigger_type: TriggerType,
    #[serde(default)]
    context: TriggerContext,
}

#[derive(Serialize)]
struct TriggerResponse {
    awarded: Vec<Badge>,
}

#[derive(Deserialize)]
struct SeenRequest {
    /// Omitted: acknowledge every unseen award.
    #[serde(default)]
    badge_ids: Option<Vec<BadgeId>>,
}

#[derive(Serialize)]
struct SeenResponse {
    updated: usize,
}

#[derive(Deserialize)]
struct GrantRequest {
    user_id: UserId,
}

#[derive(Serialize)]
struct DeletedResponse {
    deleted: bool,
}

// ─── Public endpoints ───

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Called by the learning and community subsystems after their own write
/// has committed. Returns the badges granted by this call only.
async fn fire_trigger(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<TriggerRequest>,
) -> Result<Json<TriggerResponse>, ServerError> {
    verify_admin_token(&headers, &state.config)?;

    let awarded = state
        .engine
        .check_and_award_badges(req.user_id, &req.trigger_type, &req.context)
        .await?;

    Ok(Json(TriggerResponse { awarded }))
}

async fn user_badges(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<Vec<AwardRecord>>, ServerError> {
    let records = state.engine.user_badges(user_id).await?;
    Ok(Json(records))
}

async fn mark_seen(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(req): Json<SeenRequest>,
) -> Result<Json<SeenResponse>, ServerError> {
    let updated = state
        .store
        .with_db(move |db| db.mark_seen(user_id, req.badge_ids.as_deref()))
        .await?;
    Ok(Json(SeenResponse { updated }))
}

// ─── Admin: categories ───

async fn list_categories(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Vec<BadgeCategory>>, ServerError> {
    verify_admin_token(&headers, &state.config)?;
    let categories = state.store.with_db(|db| db.list_categories()).await?;
    Ok(Json(categories))
}

async fn create_category(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(draft): Json<CategoryDraft>,
) -> Result<(StatusCode, Json<BadgeCategory>), ServerError> {
    verify_admin_token(&headers, &state.config)?;
    let category = state
        .store
        .with_db(move |db| db.create_category(&draft))
        .await?;
    info!(id = %category.id, slug = %category.slug, "Admin created category");
    Ok((StatusCode::CREATED, Json(category)))
}

async fn update_category(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
    Json(draft): Json<CategoryDraft>,
) -> Result<Json<BadgeCategory>, ServerError> {
    verify_admin_token(&headers, &state.config)?;
    let category = state
        .store
        .with_db(move |db| db.update_category(id, &draft))
        .await?;
    Ok(Json(category))
}

async fn delete_category(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Json<DeletedResponse>, ServerError> {
    verify_admin_token(&headers, &state.config)?;
    if !state.store.with_db(move |db| db.delete_category(id)).await? {
        return Err(ServerError::NotFound(format!("category {id}")));
    }
    info!(id = %id, "Admin deleted category");
    Ok(Json(DeletedResponse { deleted: true }))
}

// ─── Admin: badges ───

async fn list_badges(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Vec<Badge>>, ServerError> {
    verify_admin_token(&headers, &state.config)?;
    let badges = state.store.with_db(|db| db.list_badges()).await?;
    Ok(Json(badges))
}

async fn create_badge(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(draft): Json<BadgeDraft>,
) -> Result<(StatusCode, Json<Badge>), ServerError> {
    verify_admin_token(&headers, &state.config)?;
    let badge = state.store.with_db(move |db| db.create_badge(&draft)).await?;
    info!(id = %badge.id, name = %badge.name, trigger = %badge.trigger_type, "Admin created badge");
    Ok((StatusCode::CREATED, Json(badge)))
}

async fn get_badge(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<BadgeId>,
) -> Result<Json<Badge>, ServerError> {
    verify_admin_token(&headers, &state.config)?;
    let badge = state.store.with_db(move |db| db.get_badge(id)).await?;
    Ok(Json(badge))
}

async fn update_badge(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<BadgeId>,
    Json(draft): Json<BadgeDraft>,
) -> Result<Json<Badge>, ServerError> {
    verify_admin_token(&headers, &state.config)?;
    let badge = state
        .store
        .with_db(move |db| db.update_badge(id, &draft))
        .await?;
    Ok(Json(badge))
}

async fn delete_badge(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<BadgeId>,
) -> Result<Json<DeletedResponse>, ServerError> {
    verify_admin_token(&headers, &state.config)?;
    if !state.store.with_db(move |db| db.delete_badge(id)).await? {
        return Err(ServerError::NotFound(format!("badge {id}")));
    }
    info!(id = %id, "Admin deleted badge");
    Ok(Json(DeletedResponse { deleted: true }))
}

/// Manual grant. A duplicate answers 409 rather than being absorbed.
async fn grant_badge(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<BadgeId>,
    Json(req): Json<GrantRequest>,
) -> Result<(StatusCode, Json<AwardRecord>), ServerError> {
    verify_admin_token(&headers, &state.config)?;
    let record = state.engine.grant_manual(req.user_id, id).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

fn verify_admin_token(headers: &HeaderMap, config: &ServerConfig) -> Result<(), ServerError> {
    let Some(ref expected) = config.admin_token else {
        return Err(ServerError::Forbidden(
            "Admin API is disabled (no ADMIN_TOKEN configured)".into(),
        ));
    };

    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or(auth);

    use subtle::ConstantTimeEq;
    let token_bytes = token.as_bytes();
    let expected_bytes = expected.as_bytes();
    if token_bytes.len() != expected_bytes.len()
        || token_bytes.ct_eq(expected_bytes).unwrap_u8() != 1
    {
        return Err(ServerError::Forbidden("Invalid admin token".into()));
    }

    Ok(())
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request};
    use laurel_store::Database;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    const TOKEN: &str = "test-admin-token";

    struct TestApp {
        _dir: tempfile::TempDir,
        store: StoreBackend,
        router: Router,
    }

    fn test_app(admin_token: Option<&str>) -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        let store = StoreBackend::new(db);
        let shared = Arc::new(store.clone());
        let engine = Orchestrator::new(shared.clone(), shared.clone(), shared);

        let config = ServerConfig {
            admin_token: admin_token.map(str::to_string),
            ..ServerConfig::default()
        };
        let router = build_router(AppState {
            store: store.clone(),
            engine: Arc::new(engine),
            config: Arc::new(config),
        });

        TestApp {
            _dir: dir,
            store,
            router,
        }
    }

    async fn call(
        router: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(payload) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&payload).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let parsed = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, parsed)
    }

    #[tokio::test]
    async fn health_reports_instance() {
        let app = test_app(None);
        let (status, body) = call(&app.router, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["name"], "Laurel");
    }

    #[tokio::test]
    async fn admin_routes_need_configured_token() {
        let disabled = test_app(None);
        let (status, _) =
            call(&disabled.router, Method::GET, "/admin/badges", Some(TOKEN), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let app = test_app(Some(TOKEN));
        let (status, _) = call(&app.router, Method::GET, "/admin/badges", None, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) =
            call(&app.router, Method::GET, "/admin/badges", Some("wrong-admin-token"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, body) =
            call(&app.router, Method::GET, "/admin/badges", Some(TOKEN), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn trigger_awards_once_and_lists_badge() {
        let app = test_app(Some(TOKEN));
        let user = UserId::new();

        let (status, category) = call(
            &app.router,
            Method::POST,
            "/admin/categories",
            Some(TOKEN),
            Some(json!({ "name": "Community" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(category["slug"], "community");

        let (status, badge) = call(
            &app.router,
            Method::POST,
            "/admin/badges",
            Some(TOKEN),
            Some(json!({
                "name": "First post",
                "category_id": category["id"],
                "trigger_type": "community_post",
                "points": 10
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        app.store
            .with_db(move |db| db.record_post(user, Some("general")))
            .await
            .unwrap();

        let trigger = json!({ "user_id": user, "trigger_type": "community_post" });
        let (status, body) = call(
            &app.router,
            Method::POST,
            "/triggers",
            Some(TOKEN),
            Some(trigger.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["awarded"][0]["id"], badge["id"]);

        let (_, body) =
            call(&app.router, Method::POST, "/triggers", Some(TOKEN), Some(trigger)).await;
        assert_eq!(body["awarded"], json!([]));

        let uri = format!("/users/{user}/badges");
        let (status, records) = call(&app.router, Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(records.as_array().map(Vec::len), Some(1));
        assert_eq!(records[0]["badge_id"], badge["id"]);
        assert_eq!(records[0]["is_seen"], false);

        let uri = format!("/users/{user}/badges/seen");
        let (status, body) = call(&app.router, Method::POST, &uri, None, Some(json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["updated"], 1);
    }

    #[tokio::test]
    async fn unknown_trigger_is_a_no_op() {
        let app = test_app(Some(TOKEN));
        let (status, body) = call(
            &app.router,
            Method::POST,
            "/triggers",
            Some(TOKEN),
            Some(json!({
                "user_id": UserId::new(),
                "trigger_type": "quiz_passed",
                "context": { "quizId": 7 }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["awarded"], json!([]));
    }

    #[tokio::test]
    async fn manual_grant_conflicts_on_repeat() {
        let app = test_app(Some(TOKEN));
        let user = UserId::new();

        let (_, badge) = call(
            &app.router,
            Method::POST,
            "/admin/badges",
            Some(TOKEN),
            Some(json!({ "name": "Staff pick", "rarity": "legendary" })),
        )
        .await;
        assert_eq!(badge["trigger_type"], "manual");

        let uri = format!("/admin/badges/{}/grant", badge["id"].as_str().unwrap());
        let grant = json!({ "user_id": user });
        let (status, record) =
            call(&app.router, Method::POST, &uri, Some(TOKEN), Some(grant.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(record["badge_id"], badge["id"]);

        let (status, _) = call(&app.router, Method::POST, &uri, Some(TOKEN), Some(grant.clone())).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let missing = format!("/admin/badges/{}/grant", BadgeId::new());
        let (status, _) = call(&app.router, Method::POST, &missing, Some(TOKEN), Some(grant)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn badge_validation_and_lifecycle() {
        let app = test_app(Some(TOKEN));

        let (status, body) = call(
            &app.router,
            Method::POST,
            "/admin/badges",
            Some(TOKEN),
            Some(json!({
                "name": "Broken",
                "trigger_type": "course_completion",
                "requirement_count": 0
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("requirement_count"));

        let (_, badge) = call(
            &app.router,
            Method::POST,
            "/admin/badges",
            Some(TOKEN),
            Some(json!({ "name": "Graduate", "trigger_type": "course_completion" })),
        )
        .await;
        let uri = format!("/admin/badges/{}", badge["id"].as_str().unwrap());

        let (status, updated) = call(
            &app.router,
            Method::PUT,
            &uri,
            Some(TOKEN),
            Some(json!({
                "name": "Five-time graduate",
                "trigger_type": "course_completion",
                "requirement_count": 5
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["requirement_count"], 5);

        let (status, _) = call(&app.router, Method::DELETE, &uri, Some(TOKEN), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&app.router, Method::GET, &uri, Some(TOKEN), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&app.router, Method::DELETE, &uri, Some(TOKEN), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
