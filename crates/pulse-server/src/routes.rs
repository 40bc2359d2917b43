//! API 라우트 정의.

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::AppState;

/// API 라우트 생성
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // 실시간 스트림 (SSE / WebSocket)
        .route("/stream", get(handlers::stream::event_stream))
        .route("/ws", get(handlers::ws::ws_stream))
        // 상태
        .route("/health", get(handlers::health::health))
        // 분석 (자리표시자)
        .route("/metrics", get(handlers::metrics::get_metrics))
        .route("/analytics", get(handlers::metrics::get_analytics))
}
