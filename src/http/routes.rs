//! HTTP route definitions

use axum::{
    extract::State,
    handler::HandlerWithoutStateExt,
    http::{header, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, get_service},
    Router,
};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::app::AppState;
use crate::game::gateway::GatewayError;
use crate::game::store::Standing;
use crate::http::middleware::harden_headers;
use crate::util::time::uptime_secs;
use crate::ws::protocol::Collectible;
use crate::ws::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // Any origin may load the client and open the socket
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let public_dir = ServeDir::new(&state.config.public_dir)
        .not_found_service(not_found_handler.into_service());
    let assets_dir = ServeDir::new(&state.config.assets_dir)
        .not_found_service(not_found_handler.into_service());
    let index = get_service(ServeFile::new(&state.config.index_file))
        .layer(middleware::map_response(plain_not_found));

    Router::new()
        .route("/", index)
        .nest_service("/public", public_dir)
        .nest_service("/assets", assets_dir)
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .route("/leaderboard", get(leaderboard_handler))
        .fallback(not_found_handler)
        .layer(middleware::from_fn(harden_headers))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    players: usize,
    sessions: usize,
    collectible: Collectible,
}

async fn health_handler(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    let room = state.gateway.status().await?;

    Ok(Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        players: room.players,
        sessions: state.gateway.dispatcher().session_count(),
        collectible: room.collectible,
    }))
}

// ============================================================================
// Scoreboard
// ============================================================================

#[derive(Serialize)]
struct LeaderboardResponse {
    total: usize,
    standings: Vec<Standing>,
}

async fn leaderboard_handler(
    State(state): State<AppState>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let standings = state.gateway.standings().await?;

    Ok(Json(LeaderboardResponse {
        total: standings.len(),
        standings,
    }))
}

// ============================================================================
// Fallback
// ============================================================================

async fn not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        "Not Found",
    )
}

/// `ServeFile` answers a missing file with an empty 404; swap in ours
async fn plain_not_found(response: Response) -> Response {
    if response.status() == StatusCode::NOT_FOUND {
        not_found_handler().await.into_response()
    } else {
        response
    }
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Game room unavailable")]
    Unavailable(#[from] GatewayError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = serde_json::json!({
            "error": self.to_string()
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::http::middleware::HARDENING_HEADERS;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_config(vars: &[(&str, String)]) -> Config {
        let vars: Vec<(String, String)> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        Config::from_lookup(|key| {
            vars.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        })
        .unwrap()
    }

    fn router(config: Config) -> Router {
        let (state, gateway) = AppState::new(config);
        tokio::spawn(gateway.run());
        build_router(state)
    }

    async fn get(router: Router, uri: &str) -> axum::response::Response {
        router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn health_reports_empty_room() {
        let response = get(router(test_config(&[])), "/health").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["players"], 0);
        assert_eq!(body["sessions"], 0);
        assert!(body["collectible"]["id"].is_string());
    }

    #[tokio::test]
    async fn leaderboard_is_empty_without_players() {
        let response = get(router(test_config(&[])), "/leaderboard").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["total"], 0);
        assert_eq!(body["standings"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn unknown_route_is_plain_not_found() {
        let response = get(router(test_config(&[])), "/nope").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert_eq!(body_string(response).await, "Not Found");
    }

    #[tokio::test]
    async fn every_response_is_hardened() {
        for uri in ["/health", "/missing"] {
            let response = get(router(test_config(&[])), uri).await;
            for (name, value) in HARDENING_HEADERS {
                assert_eq!(response.headers()[name], value, "{} on {}", name, uri);
            }
        }
    }

    #[tokio::test]
    async fn serves_index_and_public_files() {
        let root = std::env::temp_dir().join(format!("coin-rush-{}", uuid::Uuid::new_v4()));
        let public = root.join("public");
        std::fs::create_dir_all(&public).unwrap();
        std::fs::write(root.join("index.html"), "<canvas id=\"game-window\"></canvas>").unwrap();
        std::fs::write(public.join("game.js"), "// client").unwrap();

        let config = test_config(&[
            ("INDEX_FILE", root.join("index.html").display().to_string()),
            ("PUBLIC_DIR", public.display().to_string()),
        ]);
        let app = router(config);

        let index = get(app.clone(), "/").await;
        assert_eq!(index.status(), StatusCode::OK);
        assert!(body_string(index).await.contains("game-window"));

        let script = get(app.clone(), "/public/game.js").await;
        assert_eq!(script.status(), StatusCode::OK);
        assert_eq!(body_string(script).await, "// client");

        let missing = get(app, "/public/other.js").await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(missing).await, "Not Found");

        std::fs::remove_dir_all(root).ok();
    }

    #[tokio::test]
    async fn missing_index_is_plain_not_found() {
        let config = test_config(&[(
            "INDEX_FILE",
            std::env::temp_dir()
                .join(format!("coin-rush-{}", uuid::Uuid::new_v4()))
                .join("index.html")
                .display()
                .to_string(),
        )]);

        let response = get(router(config), "/").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        for (name, value) in HARDENING_HEADERS {
            assert_eq!(response.headers()[name], value);
        }
        assert_eq!(body_string(response).await, "Not Found");
    }
}
