//! SSE(Server-Sent Events) 이벤트 채널.
//!
//! `reqwest` 바이트 스트림을 `eventsource-stream`으로 파싱한다.
//! SSE 이벤트의 `data`가 와이어 JSON 하나.

use eventsource_stream::Eventsource;
use futures::StreamExt;
use pulse_core::error::CoreError;
use pulse_core::ports::channel::{ChannelHandle, EventCallback, EventChannel};
use std::sync::Arc;
use tracing::{debug, info};

use crate::remote::{Link, RemoteEndpoints, RetryPolicy};

/// SSE 이벤트 채널: `EventChannel` 포트 구현
pub struct SseEventChannel {
    url: String,
    policy: RetryPolicy,
    http_client: reqwest::Client,
    endpoints: RemoteEndpoints,
}

impl SseEventChannel {
    /// 새 SSE 채널 생성
    pub fn new(url: &str, policy: RetryPolicy) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            policy,
            http_client: reqwest::Client::new(),
            endpoints: RemoteEndpoints::default(),
        }
    }

    /// 연결 대상 URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// 연결 한 번의 수명
    async fn session(
        http_client: reqwest::Client,
        url: Arc<str>,
        link: Arc<Link>,
    ) -> Result<(), CoreError> {
        info!("SSE 연결 시작: {url}");
        let response = http_client
            .get(url.as_ref())
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| CoreError::Transport(format!("SSE 연결 실패: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::Transport(format!("SSE 응답 상태: {status}")));
        }
        link.mark_connected();

        let mut stream = response.bytes_stream().eventsource();
        while let Some(event) = stream.next().await {
            match event {
                Ok(event) => {
                    if event.data.is_empty() {
                        continue;
                    }
                    debug!("SSE 이벤트 수신: {}", event.event);
                    if !link.handle_text(&event.data) {
                        return Ok(());
                    }
                }
                Err(e) => {
                    return Err(CoreError::Transport(format!("SSE 스트림 에러: {e}")));
                }
            }
        }
        Ok(())
    }
}

impl EventChannel for SseEventChannel {
    fn connect(&self, client_id: &str) -> ChannelHandle {
        let url: Arc<str> = Arc::from(self.url.as_str());
        let http_client = self.http_client.clone();
        self.endpoints.spawn(client_id, self.policy, move |link| {
            Self::session(http_client.clone(), url.clone(), link)
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
    use pulse_core::models::event::MetricEvent;
    use pulse_core::ports::channel::ConnectionState;
    use std::time::Duration;

    #[test]
    fn trailing_slash_is_trimmed() {
        let sse = SseEventChannel::new("http://localhost:3001/api/stream/", RetryPolicy::default());
        assert_eq!(sse.url(), "http://localhost:3001/api/stream");
    }

    #[tokio::test]
    async fn disconnect_before_connection_is_clean() {
        let channel = SseEventChannel::new("http://127.0.0.1:1/api/stream", RetryPolicy::default());
        let handle = channel.connect("early");
        channel
            .on_event(&handle, Arc::new(|_: &MetricEvent| {}))
            .unwrap();
        channel.disconnect(&handle);
        assert_eq!(handle.state(), ConnectionState::Disconnected);

        // 두 번째 해제는 무시
        channel.disconnect(&handle);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(handle.state(), ConnectionState::Disconnected);
    }
}
