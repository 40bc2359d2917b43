//! WebSocket 실시간 스트림 핸들러.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use tracing::{debug, warn};

use super::connection_id;
use crate::hub::HubSubscription;
use crate::AppState;

/// WebSocket 엔드포인트
///
/// GET /api/ws
///
/// 허브 이벤트 하나당 텍스트 프레임 하나 (와이어 JSON).
/// 클라이언트가 보내는 텍스트는 무시한다.
pub async fn ws_stream(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let client_id = connection_id("ws");
    let (subscription, mut rx) =
        match HubSubscription::open(state.hub.clone(), &client_id, state.client_buffer) {
            Ok(opened) => opened,
            Err(e) => {
                warn!("WebSocket 엔드포인트 생성 실패: {e}");
                return;
            }
        };

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break };
                let json = match event.encode() {
                    Ok(json) => json,
                    Err(e) => {
                        debug!("WebSocket 이벤트 직렬화 실패: {e}");
                        continue;
                    }
                };
                if let Err(e) = socket.send(Message::Text(json.into())).await {
                    debug!("WebSocket 전송 실패 ({client_id}): {e}");
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket 클라이언트 종료: {client_id}");
                        break;
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket 수신 에러 ({client_id}): {e}");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    // 허브 엔드포인트 해제
    drop(subscription);
}
