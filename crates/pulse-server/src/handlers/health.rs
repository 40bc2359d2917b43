//! 헬스 체크 핸들러.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::AppState;

/// 헬스 체크 응답
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// 현재 허브에 연결된 엔드포인트 수
    pub connected_clients: usize,
    pub emitter_running: bool,
}

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        connected_clients: state.hub.connected_clients(),
        emitter_running: state
            .emitter
            .as_ref()
            .is_some_and(|emitter| emitter.is_running()),
    })
}
