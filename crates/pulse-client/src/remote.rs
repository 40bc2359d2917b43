//! 원격 채널 공통 부분: 엔드포인트 테이블과 재연결 루프.
//!
//! `WsEventChannel`, `SseEventChannel`이 공유한다. 전송 방식별 코드는
//! 연결 한 번의 수명(열기 → 수신 → 종료)만 구현한다.

use parking_lot::Mutex;
use pulse_core::config::ClientConfig;
use pulse_core::error::CoreError;
use pulse_core::models::event::MetricEvent;
use pulse_core::ports::channel::{ChannelHandle, ConnectionState, DeliverySlot, EventCallback};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 최초 재연결 대기
const INITIAL_RETRY: Duration = Duration::from_secs(1);

/// 재연결 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 끊겼을 때 재연결 여부
    pub reconnect: bool,
    /// backoff 최대 대기
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// 다음 대기 시간 (두 배, 최대값 제한)
    pub fn next_delay(&self, current: Duration) -> Duration {
        (current * 2).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

impl From<&ClientConfig> for RetryPolicy {
    fn from(config: &ClientConfig) -> Self {
        Self {
            reconnect: config.reconnect,
            max_delay: Duration::from_secs(config.max_retry_secs.max(1)),
        }
    }
}

/// 연결 한 번의 수명 동안 쓰는 컨텍스트
pub(crate) struct Link {
    pub(crate) client_id: String,
    pub(crate) slot: DeliverySlot,
    state_tx: Arc<watch::Sender<ConnectionState>>,
}

impl Link {
    /// 연결 수립 표시
    pub(crate) fn mark_connected(&self) {
        self.state_tx.send_replace(ConnectionState::Connected);
        info!("원격 채널 연결됨: {}", self.client_id);
    }

    /// 와이어 텍스트 하나 처리
    ///
    /// 디코딩 실패는 로그만 남기고 건너뛴다. 슬롯이 해제됐으면 `false`.
    pub(crate) fn handle_text(&self, text: &str) -> bool {
        match MetricEvent::decode(text) {
            Ok(event) => self.slot.deliver(&event),
            Err(e) => {
                debug!("잘못된 이벤트 무시 ({}): {e}", self.client_id);
                !self.slot.is_closed()
            }
        }
    }
}

struct RemoteEndpoint {
    slot: DeliverySlot,
    task: JoinHandle<()>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
}

/// 원격 엔드포인트 테이블
#[derive(Default)]
pub(crate) struct RemoteEndpoints {
    endpoints: Mutex<HashMap<Uuid, RemoteEndpoint>>,
}

impl RemoteEndpoints {
    /// 엔드포인트 생성 + 재연결 루프 시작
    ///
    /// `session`은 연결 한 번을 처리하는 비동기 함수. 수신이 끝나면 반환한다.
    pub(crate) fn spawn<F, Fut>(
        &self,
        client_id: &str,
        policy: RetryPolicy,
        session: F,
    ) -> ChannelHandle
    where
        F: Fn(Arc<Link>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), CoreError>> + Send + 'static,
    {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let state_tx = Arc::new(state_tx);
        let handle = ChannelHandle::new(client_id, state_rx);
        let slot = DeliverySlot::new();
        let link = Arc::new(Link {
            client_id: client_id.to_string(),
            slot: slot.clone(),
            state_tx: state_tx.clone(),
        });

        let task = tokio::spawn(reconnect_loop(link, policy, session));
        self.endpoints.lock().insert(
            handle.endpoint_id(),
            RemoteEndpoint {
                slot,
                task,
                state_tx,
            },
        );
        handle
    }

    pub(crate) fn register(
        &self,
        handle: &ChannelHandle,
        callback: EventCallback,
    ) -> Result<(), CoreError> {
        let endpoints = self.endpoints.lock();
        let endpoint = endpoints
            .get(&handle.endpoint_id())
            .ok_or_else(|| CoreError::validation("handle", "연결되지 않은 엔드포인트"))?;
        endpoint.slot.register(callback)
    }

    pub(crate) fn remove(&self, handle: &ChannelHandle) {
        let removed = self.endpoints.lock().remove(&handle.endpoint_id());
        if let Some(endpoint) = removed {
            endpoint.slot.close();
            endpoint.task.abort();
            endpoint.state_tx.send_replace(ConnectionState::Disconnected);
            info!("원격 채널 해제: {}", handle.client_id());
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.endpoints.lock().len()
    }
}

impl Drop for RemoteEndpoints {
    fn drop(&mut self) {
        for (_, endpoint) in self.endpoints.get_mut().drain() {
            endpoint.slot.close();
            endpoint.task.abort();
            endpoint.state_tx.send_replace(ConnectionState::Disconnected);
        }
    }
}

/// exponential backoff 재연결 루프
async fn reconnect_loop<F, Fut>(link: Arc<Link>, policy: RetryPolicy, session: F)
where
    F: Fn(Arc<Link>) -> Fut,
    Fut: Future<Output = Result<(), CoreError>>,
{
    let mut retry_delay = INITIAL_RETRY;

    loop {
        let result = session(link.clone()).await;
        let was_connected = *link.state_tx.borrow() == ConnectionState::Connected;

        match result {
            Ok(()) => info!("원격 스트림 종료: {}", link.client_id),
            Err(e) => warn!("원격 채널 에러 ({}): {e}", link.client_id),
        }

        if link.slot.is_closed() {
            break;
        }
        if !policy.reconnect {
            break;
        }
        if was_connected {
            // 연결 성공 후 끊긴 경우 재시도 지연 리셋
            retry_delay = INITIAL_RETRY;
        }

        link.state_tx.send_replace(ConnectionState::Reconnecting);
        warn!("재연결 대기: {}초 ({})", retry_delay.as_secs(), link.client_id);
        tokio::time::sleep(retry_delay).await;
        retry_delay = policy.next_delay(retry_delay);
    }

    link.state_tx.send_replace(ConnectionState::Disconnected);
    debug!("재연결 루프 종료: {}", link.client_id);
}
