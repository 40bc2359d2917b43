//! 클라이언트 세션.
//!
//! 채널 연결 하나, 구독 레지스트리 하나, 스냅샷 하나를 묶는다. 리듀서는
//! 레지스트리의 첫 번째 구독자로 등록되어 스냅샷을 갱신하고, 바뀐 스냅샷은
//! `watch` 채널로 렌더러에 전달된다.

use parking_lot::Mutex;
use pulse_core::error::CoreError;
use pulse_core::models::event::MetricEvent;
use pulse_core::models::snapshot::MetricSnapshot;
use pulse_core::ports::channel::{ChannelHandle, ConnectionState, EventChannel};
use pulse_core::ports::derivation::{MetricDerivation, RandomDerivation};
use pulse_core::reducer::apply_event;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use crate::registry::{Subscriber, SubscriptionId, SubscriptionRegistry};

/// 클라이언트 세션
pub struct ClientSession {
    channel: Arc<dyn EventChannel>,
    handle: ChannelHandle,
    registry: SubscriptionRegistry,
    snapshot_tx: Arc<watch::Sender<MetricSnapshot>>,
    reducer_id: SubscriptionId,
    closed: Mutex<bool>,
}

impl ClientSession {
    /// 세션 시작 (기본 난수 파생 전략)
    pub fn open(channel: Arc<dyn EventChannel>, client_id: &str) -> Result<Self, CoreError> {
        Self::open_with(channel, client_id, Arc::new(RandomDerivation))
    }

    /// 파생 전략을 지정해서 세션 시작
    ///
    /// 스냅샷은 시드 값으로 시작한다. 등록에 실패하면 엔드포인트를 해제하고
    /// 에러를 돌려준다.
    pub fn open_with(
        channel: Arc<dyn EventChannel>,
        client_id: &str,
        derivation: Arc<dyn MetricDerivation>,
    ) -> Result<Self, CoreError> {
        let handle = channel.connect(client_id);
        let registry = SubscriptionRegistry::new();
        if let Err(e) = registry.attach(channel.as_ref(), &handle) {
            channel.disconnect(&handle);
            return Err(e);
        }

        let (snapshot_tx, _) = watch::channel(MetricSnapshot::seeded(chrono::Utc::now()));
        let snapshot_tx = Arc::new(snapshot_tx);
        let reducer_tx = snapshot_tx.clone();
        let reducer_id = registry.subscribe(Arc::new(move |event: &MetricEvent| {
            reducer_tx.send_if_modified(|snapshot| {
                let next = apply_event(snapshot, event, derivation.as_ref());
                if next == *snapshot {
                    return false;
                }
                *snapshot = next;
                true
            });
            Ok(())
        }));

        info!("클라이언트 세션 시작: {client_id}");
        Ok(Self {
            channel,
            handle,
            registry,
            snapshot_tx,
            reducer_id,
            closed: Mutex::new(false),
        })
    }

    /// 현재 스냅샷 사본
    pub fn snapshot(&self) -> MetricSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// 스냅샷 변화 구독 (렌더러용)
    pub fn watch_snapshot(&self) -> watch::Receiver<MetricSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// 로컬 구독자 추가
    pub fn subscribe(&self, callback: Subscriber) -> SubscriptionId {
        self.registry.subscribe(callback)
    }

    /// 로컬 구독자 해제 (리듀서 구독은 해제 불가)
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        if id == self.reducer_id {
            return false;
        }
        self.registry.unsubscribe(id)
    }

    /// 구독 레지스트리
    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    /// 채널 핸들
    pub fn handle(&self) -> &ChannelHandle {
        &self.handle
    }

    /// 연결 상태
    pub fn state(&self) -> ConnectionState {
        self.handle.state()
    }

    pub fn is_connected(&self) -> bool {
        self.handle.is_connected()
    }

    /// 연결 상태 변화 구독
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.handle.watch_state()
    }

    /// 세션 종료
    ///
    /// 레지스트리를 닫고 엔드포인트를 해제한다. 이후 콜백은 호출되지 않고
    /// 스냅샷은 더 이상 갱신되지 않는다. 두 번째 호출은 무시된다.
    pub fn close(&self) {
        let mut closed = self.closed.lock();
        if *closed {
            return;
        }
        *closed = true;
        self.registry.close();
        self.channel.disconnect(&self.handle);
        info!("클라이언트 세션 종료: {}", self.handle.client_id());
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock()
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        self.close();
    }
}
