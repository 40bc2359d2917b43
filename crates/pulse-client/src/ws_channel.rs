//! WebSocket 이벤트 채널.
//!
//! `tokio-tungstenite` 기반 수신 전용 연결. 텍스트 프레임 하나가 이벤트 하나.

use futures::StreamExt;
use pulse_core::error::CoreError;
use pulse_core::ports::channel::{ChannelHandle, EventCallback, EventChannel};
use std::sync::Arc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info};

use crate::remote::{Link, RemoteEndpoints, RetryPolicy};

/// WebSocket 이벤트 채널: `EventChannel` 포트 구현
pub struct WsEventChannel {
    url: String,
    policy: RetryPolicy,
    endpoints: RemoteEndpoints,
}

impl WsEventChannel {
    /// 새 WebSocket 채널 생성
    ///
    /// `http(s)://` URL도 받아서 `ws(s)://`로 바꾼다.
    pub fn new(url: &str, policy: RetryPolicy) -> Self {
        let url = url
            .trim_end_matches('/')
            .replacen("http://", "ws://", 1)
            .replacen("https://", "wss://", 1);
        Self {
            url,
            policy,
            endpoints: RemoteEndpoints::default(),
        }
    }

    /// 연결 대상 URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// 연결 한 번의 수명
    async fn session(url: Arc<str>, link: Arc<Link>) -> Result<(), CoreError> {
        info!("WebSocket 연결: {url}");
        let (ws_stream, _) = tokio_tungstenite::connect_async(url.as_ref())
            .await
            .map_err(|e| CoreError::Transport(format!("WebSocket 연결 실패: {e}")))?;
        link.mark_connected();

        let (_write, mut read) = ws_stream.split();
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    if !link.handle_text(text.as_str()) {
                        return Ok(());
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("서버가 WebSocket 종료");
                    return Ok(());
                }
                Ok(_) => {} // Ping/Pong은 자동 처리, 바이너리는 무시
                Err(e) => {
                    return Err(CoreError::Transport(format!("WebSocket 수신 에러: {e}")));
                }
            }
        }
        Ok(())
    }
}

impl EventChannel for WsEventChannel {
    fn connect(&self, client_id: &str) -> ChannelHandle {
        let url: Arc<str> = Arc::from(self.url.as_str());
        self.endpoints.spawn(client_id, self.policy, move |link| {
            Self::session(url.clone(), link)
        })
    }

    fn on_event(&self, handle: &ChannelHandle, callback: EventCallback) -> Result<(), CoreError> {
        self.endpoints.register(handle, callback)
    }

    fn disconnect(&self, handle: &ChannelHandle) {
        self.endpoints.remove(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::ports::channel::ConnectionState;
    use std::time::Duration;

    #[test]
    fn http_url_is_rewritten() {
        let ws = WsEventChannel::new("http://localhost:3001/api/ws/", RetryPolicy::default());
        assert_eq!(ws.url(), "ws://localhost:3001/api/ws");
        let wss = WsEventChannel::new("https://example.com/api/ws", RetryPolicy::default());
        assert_eq!(wss.url(), "wss://example.com/api/ws");
    }

    #[tokio::test]
    async fn unreachable_server_surfaces_as_state() {
        let policy = RetryPolicy {
            reconnect: false,
            max_delay: Duration::from_secs(1),
        };
        // 포트 1은 열려 있지 않음
        let channel = WsEventChannel::new("ws://127.0.0.1:1/api/ws", policy);
        let handle = channel.connect("unreachable");
        let mut state = handle.watch_state();
        tokio::time::timeout(
            Duration::from_secs(5),
            state.wait_for(|s| *s == ConnectionState::Disconnected),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(!handle.is_connected());
    }
}
