use axum::{
    Router,
    routing::{get, post},
};
use http::{
    HeaderValue, Method,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{self, quotes, two_factor};
use crate::state::AppState;

/// Router の構築
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(state.config.cors_allowed_origin.as_deref());

    Router::new()
        .route("/health", get(handlers::health_check))
        // 認証
        .route("/authentication", get(handlers::current_user))
        .route("/authentication/register", post(handlers::register))
        .route("/authentication/log-in", post(handlers::log_in))
        // 二要素認証
        .route("/2fa/generate", post(two_factor::generate))
        .route("/2fa/turn-on", post(two_factor::turn_on))
        .route("/2fa/authenticate", post(two_factor::authenticate))
        // 名言
        .route("/quotes", post(quotes::create).get(quotes::find_all))
        .route(
            "/quotes/{id}",
            get(quotes::find_one)
                .put(quotes::update)
                .delete(quotes::remove),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS 設定
///
/// 許可オリジン未設定の場合はクロスオリジンを許可しない
fn cors_layer(allowed_origin: Option<&str>) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .expose_headers([AUTHORIZATION]);

    match allowed_origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => base.allow_origin(origin),
        Some(Err(e)) => {
            tracing::warn!(error = ?e, "CORS許可オリジンが不正（無視）");
            base
        }
        None => base,
    }
}
