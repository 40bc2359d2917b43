//! 이벤트 채널 포트.
//!
//! 구현: `pulse-server` crate (`EventHub`, 프로세스 내 브로드캐스트),
//! `pulse-client` crate (`WsEventChannel`, `SseEventChannel`).
//!
//! 채널은 연결된 엔드포인트마다 정확히 하나의 전달 경로만 가진다.
//! 여러 로컬 소비자로의 팬아웃은 구독 레지스트리의 몫이다.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::event::MetricEvent;

/// 채널 전달 콜백
pub type EventCallback = Arc<dyn Fn(&MetricEvent) + Send + Sync>;

/// 연결 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// 최초 연결 시도 중
    Connecting,
    Connected,
    /// 끊긴 뒤 재연결 대기 중
    Reconnecting,
    Disconnected,
}

/// 채널 핸들: 한 클라이언트의 채널 엔드포인트 식별자
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    endpoint_id: Uuid,
    client_id: String,
    state: watch::Receiver<ConnectionState>,
}

impl ChannelHandle {
    /// 새 핸들 생성 (채널 구현체 전용)
    pub fn new(client_id: &str, state: watch::Receiver<ConnectionState>) -> Self {
        Self {
            endpoint_id: Uuid::new_v4(),
            client_id: client_id.to_string(),
            state,
        }
    }

    /// 엔드포인트 ID
    pub fn endpoint_id(&self) -> Uuid {
        self.endpoint_id
    }

    /// 클라이언트 ID
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// 현재 연결 상태
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// 연결 여부
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// 상태 변화 구독
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }
}

/// 이벤트 채널 인터페이스
///
/// 전달은 최대 1회, 최선 노력(best-effort)이다. 엔드포인트가 연결되어 있지
/// 않은 시점에 발생한 이벤트는 해당 클라이언트에 대해 유실된다.
pub trait EventChannel: Send + Sync {
    /// 엔드포인트 생성
    ///
    /// 연결 실패는 에러가 아니라 핸들 상태의 `Disconnected` 전이로 표면화된다.
    /// 원격 구현체는 tokio 런타임 컨텍스트 안에서 호출해야 한다.
    fn connect(&self, client_id: &str) -> ChannelHandle;

    /// 엔드포인트의 유일한 전달 경로 등록
    ///
    /// 이미 등록된 핸들이나 해제된 핸들에는 `CoreError::Validation`.
    fn on_event(&self, handle: &ChannelHandle, callback: EventCallback) -> Result<(), CoreError>;

    /// 엔드포인트 해제
    ///
    /// 반환 이후 시작되는 전달은 콜백을 호출하지 않는다. 두 번째 호출은 무시된다.
    fn disconnect(&self, handle: &ChannelHandle);
}

#[derive(Default)]
struct SlotState {
    callback: Option<EventCallback>,
    closed: bool,
}

/// 엔드포인트 하나의 콜백 슬롯
///
/// 채널 구현체들이 공유하는 등록/전달/해제 규칙.
#[derive(Clone, Default)]
pub struct DeliverySlot {
    inner: Arc<Mutex<SlotState>>,
}

impl DeliverySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// 콜백 등록 (엔드포인트당 1회)
    pub fn register(&self, callback: EventCallback) -> Result<(), CoreError> {
        let mut state = self.inner.lock();
        if state.closed {
            return Err(CoreError::validation("handle", "이미 해제된 엔드포인트"));
        }
        if state.callback.is_some() {
            return Err(CoreError::validation("handle", "전달 경로가 이미 등록됨"));
        }
        state.callback = Some(callback);
        Ok(())
    }

    /// 이벤트 전달
    ///
    /// 콜백은 잠금 밖에서 호출된다. 콜백이 없으면 이벤트는 버려진다.
    /// 해제된 슬롯이면 `false`.
    pub fn deliver(&self, event: &MetricEvent) -> bool {
        let callback = {
            let state = self.inner.lock();
            if state.closed {
                return false;
            }
            state.callback.clone()
        };
        if let Some(callback) = callback {
            callback(event);
        }
        true
    }

    /// 슬롯 해제
    pub fn close(&self) {
        let mut state = self.inner.lock();
        state.closed = true;
        state.callback = None;
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::metric::MetricKey;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample_event() -> MetricEvent {
        MetricEvent::metric_update(MetricKey::Visitors, 10.0, chrono::Utc::now())
    }

    #[test]
    fn handle_reports_state() {
        let (tx, rx) = watch::channel(ConnectionState::Connecting);
        let handle = ChannelHandle::new("client-1", rx);
        assert_eq!(handle.client_id(), "client-1");
        assert!(!handle.is_connected());

        tx.send(ConnectionState::Connected).unwrap();
        assert!(handle.is_connected());
    }

    #[test]
    fn slot_accepts_single_registration() {
        let slot = DeliverySlot::new();
        slot.register(Arc::new(|_: &MetricEvent| {})).unwrap();
        let err = slot.register(Arc::new(|_: &MetricEvent| {})).unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));
    }

    #[test]
    fn slot_stops_delivering_after_close() {
        let slot = DeliverySlot::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        slot.register(Arc::new(move |_: &MetricEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        }))
        .unwrap();

        assert!(slot.deliver(&sample_event()));
        slot.close();
        assert!(!slot.deliver(&sample_event()));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(slot.register(Arc::new(|_: &MetricEvent| {})).is_err());
    }

    #[test]
    fn slot_without_callback_drops_events() {
        let slot = DeliverySlot::new();
        assert!(slot.deliver(&sample_event()));
        assert!(!slot.is_closed());
    }
}
