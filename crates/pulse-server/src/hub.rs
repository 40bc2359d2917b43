//! 이벤트 허브: 서버 측 이벤트 채널.
//!
//! `tokio::broadcast` 기반. 연결된 모든 엔드포인트가 발행된 이벤트의
//! 독립 사본을 받는다. 엔드포인트마다 전달 태스크 하나가 발행 순서대로
//! 콜백을 호출한다.

use parking_lot::Mutex;
use pulse_core::error::CoreError;
use pulse_core::models::event::MetricEvent;
use pulse_core::ports::channel::{
    ChannelHandle, ConnectionState, DeliverySlot, EventCallback, EventChannel,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 엔드포인트 하나의 자원
struct Endpoint {
    client_id: String,
    slot: DeliverySlot,
    task: JoinHandle<()>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
}

/// 프로세스 내 이벤트 허브
pub struct EventHub {
    tx: broadcast::Sender<MetricEvent>,
    endpoints: Mutex<HashMap<Uuid, Endpoint>>,
}

impl EventHub {
    /// 새 허브 생성
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            endpoints: Mutex::new(HashMap::new()),
        }
    }

    /// 이벤트 발행
    ///
    /// 이벤트를 받을 엔드포인트 수를 반환한다. 0이면 이벤트는 모두에게 유실된다.
    pub fn publish(&self, event: MetricEvent) -> usize {
        match self.tx.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!("연결된 엔드포인트 없음, 이벤트 유실");
                0
            }
        }
    }

    /// 현재 연결된 엔드포인트 수
    pub fn connected_clients(&self) -> usize {
        self.endpoints.lock().len()
    }

    /// 엔드포인트별 전달 루프
    async fn forward_loop(
        mut rx: broadcast::Receiver<MetricEvent>,
        slot: DeliverySlot,
        state_tx: Arc<watch::Sender<ConnectionState>>,
        client_id: String,
    ) {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if !slot.deliver(&event) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("엔드포인트 {client_id} 지연, 이벤트 {skipped}개 건너뜀");
                }
                Err(RecvError::Closed) => break,
            }
        }
        state_tx.send_replace(ConnectionState::Disconnected);
        debug!("엔드포인트 {client_id} 전달 루프 종료");
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventChannel for EventHub {
    /// tokio 런타임 컨텍스트 안에서 호출해야 한다 (전달 태스크 생성).
    fn connect(&self, client_id: &str) -> ChannelHandle {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connected);
        let state_tx = Arc::new(state_tx);
        let handle = ChannelHandle::new(client_id, state_rx);
        let slot = DeliverySlot::new();

        // 구독은 연결 시점에 즉시. 이후 발행분부터 수신
        let rx = self.tx.subscribe();
        let task = tokio::spawn(Self::forward_loop(
            rx,
            slot.clone(),
            state_tx.clone(),
            client_id.to_string(),
        ));

        self.endpoints.lock().insert(
            handle.endpoint_id(),
            Endpoint {
                client_id: client_id.to_string(),
                slot,
                task,
                state_tx,
            },
        );
        info!("클라이언트 연결: {client_id} ({})", handle.endpoint_id());
        handle
    }

    fn on_event(&self, handle: &ChannelHandle, callback: EventCallback) -> Result<(), CoreError> {
        let endpoints = self.endpoints.lock();
        let endpoint = endpoints
            .get(&handle.endpoint_id())
            .ok_or_else(|| CoreError::validation("handle", "연결되지 않은 엔드포인트"))?;
        endpoint.slot.register(callback)
    }

    fn disconnect(&self, handle: &ChannelHandle) {
        let removed = self.endpoints.lock().remove(&handle.endpoint_id());
        match removed {
            Some(endpoint) => {
                endpoint.slot.close();
                endpoint.task.abort();
                endpoint.state_tx.send_replace(ConnectionState::Disconnected);
                info!(
                    "클라이언트 연결 해제: {} ({})",
                    endpoint.client_id,
                    handle.endpoint_id()
                );
            }
            None => debug!("이미 해제된 엔드포인트: {}", handle.endpoint_id()),
        }
    }
}

/// 허브 구독 가드: 전송 계층(SSE/WebSocket)용
///
/// 엔드포인트 이벤트를 bounded `mpsc`로 옮긴다. 큐가 가득 차면 이벤트를
/// 버린다. 가드가 drop되면 엔드포인트가 해제된다.
pub struct HubSubscription {
    hub: Arc<EventHub>,
    handle: ChannelHandle,
}

impl HubSubscription {
    /// 엔드포인트 연결 + 큐 전달 경로 등록
    pub fn open(
        hub: Arc<EventHub>,
        client_id: &str,
        buffer: usize,
    ) -> Result<(Self, mpsc::Receiver<MetricEvent>), CoreError> {
        let handle = hub.connect(client_id);
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let queue_owner = client_id.to_string();
        let registered = hub.on_event(
            &handle,
            Arc::new(move |event: &MetricEvent| {
                if let Err(mpsc::error::TrySendError::Full(_)) = tx.try_send(event.clone()) {
                    warn!("엔드포인트 {queue_owner} 전송 큐 가득 참, 이벤트 드롭");
                }
            }),
        );
        if let Err(e) = registered {
            hub.disconnect(&handle);
            return Err(e);
        }
        Ok((Self { hub, handle }, rx))
    }

    /// 채널 핸들
    pub fn handle(&self) -> &ChannelHandle {
        &self.handle
    }
}

impl Drop for HubSubscription {
    fn drop(&mut self) {
        self.hub.disconnect(&self.handle);
    }
}
