//! 클라이언트 구독 레지스트리.
//!
//! 채널 엔드포인트 하나에 붙는 유일한 전달 경로이며, 수신한 이벤트를
//! 등록된 로컬 구독자 전부에게 나눠준다. 구독자 하나의 실패(에러 반환 또는
//! 패닉)는 그 구독자에서 격리되고 나머지 구독자 전달은 계속된다.

use parking_lot::Mutex;
use pulse_core::error::CoreError;
use pulse_core::models::event::MetricEvent;
use pulse_core::ports::channel::{ChannelHandle, EventChannel};
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// 구독자 콜백
pub type Subscriber = Arc<dyn Fn(&MetricEvent) -> Result<(), CoreError> + Send + Sync>;

/// 구독 식별자
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

#[derive(Default)]
struct RegistryState {
    subscribers: BTreeMap<SubscriptionId, Subscriber>,
    next_id: u64,
    closed: bool,
}

/// 구독 레지스트리 (클라이언트 하나에 하나)
///
/// 복제본은 같은 레지스트리를 가리킨다.
#[derive(Clone, Default)]
pub struct SubscriptionRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 채널 엔드포인트의 전달 경로로 등록
    pub fn attach(&self, channel: &dyn EventChannel, handle: &ChannelHandle) -> Result<(), CoreError> {
        let registry = self.clone();
        channel.on_event(handle, Arc::new(move |event: &MetricEvent| registry.dispatch(event)))
    }

    /// 구독 등록
    ///
    /// 등록 이후 도착하는 이벤트부터 받는다. 닫힌 레지스트리에 등록한
    /// 콜백은 호출되지 않는다.
    pub fn subscribe(&self, callback: Subscriber) -> SubscriptionId {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = SubscriptionId(state.next_id);
        if state.closed {
            warn!("닫힌 레지스트리에 구독 시도: {id}");
        } else {
            state.subscribers.insert(id, callback);
            debug!("구독 등록: {id}");
        }
        id
    }

    /// 구독 해제. 이미 해제된 ID면 `false` (에러 아님).
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.state.lock().subscribers.remove(&id).is_some();
        if removed {
            debug!("구독 해제: {id}");
        }
        removed
    }

    /// 이벤트 하나를 모든 구독자에게 전달
    ///
    /// 콜백은 잠금 밖에서 호출되므로 콜백 안에서 구독/해제해도 된다.
    /// 전달 도중 해제된 구독자는 건너뛴다.
    pub fn dispatch(&self, event: &MetricEvent) {
        let targets: Vec<(SubscriptionId, Subscriber)> = {
            let state = self.state.lock();
            if state.closed {
                return;
            }
            state
                .subscribers
                .iter()
                .map(|(id, subscriber)| (*id, subscriber.clone()))
                .collect()
        };

        for (id, subscriber) in targets {
            if !self.is_active(id) {
                continue;
            }
            match catch_unwind(AssertUnwindSafe(|| subscriber(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("구독자 {id} 에러 (격리됨): {e}"),
                Err(panic) => warn!("구독자 {id} 패닉 (격리됨): {}", panic_message(&*panic)),
            }
        }
    }

    /// 레지스트리 해체: 모든 구독 무효화, 이후 콜백 없음
    pub fn close(&self) {
        let mut state = self.state.lock();
        if !state.closed {
            state.closed = true;
            state.subscribers.clear();
            debug!("구독 레지스트리 닫힘");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// 현재 구독자 수
    pub fn len(&self) -> usize {
        self.state.lock().subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_active(&self, id: SubscriptionId) -> bool {
        let state = self.state.lock();
        !state.closed && state.subscribers.contains_key(&id)
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "알 수 없는 패닉".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pulse_core::models::metric::MetricKey;

    fn event(value: f64) -> MetricEvent {
        MetricEvent::metric_update(MetricKey::Visitors, value, Utc::now())
    }

    fn recorder() -> (Subscriber, Arc<Mutex<Vec<f64>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let subscriber: Subscriber = Arc::new(move |event: &MetricEvent| {
            sink.lock().push(event.update().map(|u| u.value).unwrap_or(f64::NAN));
            Ok(())
        });
        (subscriber, seen)
    }

    #[test]
    fn subscribers_see_events_while_registered() {
        let registry = SubscriptionRegistry::new();
        let (early, early_seen) = recorder();
        let early_id = registry.subscribe(early);

        registry.dispatch(&event(1.0));
        let (late, late_seen) = recorder();
        registry.subscribe(late);
        registry.dispatch(&event(2.0));
        registry.unsubscribe(early_id);
        registry.dispatch(&event(3.0));

        assert_eq!(*early_seen.lock(), vec![1.0, 2.0]);
        assert_eq!(*late_seen.lock(), vec![2.0, 3.0]);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let registry = SubscriptionRegistry::new();
        let (a, _) = recorder();
        let (b, b_seen) = recorder();
        let a_id = registry.subscribe(a);
        registry.subscribe(b);

        assert!(registry.unsubscribe(a_id));
        assert!(!registry.unsubscribe(a_id));
        assert_eq!(registry.len(), 1);

        registry.dispatch(&event(5.0));
        assert_eq!(*b_seen.lock(), vec![5.0]);
    }

    #[test]
    fn failing_subscriber_does_not_starve_others() {
        let registry = SubscriptionRegistry::new();
        registry.subscribe(Arc::new(|event: &MetricEvent| {
            if event.update().map(|u| u.value) == Some(1.0) {
                return Err(CoreError::Subscriber("첫 이벤트 거부".to_string()));
            }
            Ok(())
        }));
        registry.subscribe(Arc::new(|event: &MetricEvent| {
            if event.update().map(|u| u.value) == Some(1.0) {
                panic!("구독자 패닉");
            }
            Ok(())
        }));
        let (healthy, seen) = recorder();
        registry.subscribe(healthy);

        registry.dispatch(&event(1.0));
        registry.dispatch(&event(2.0));

        assert_eq!(*seen.lock(), vec![1.0, 2.0]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn subscriber_can_unsubscribe_itself_during_dispatch() {
        let registry = SubscriptionRegistry::new();
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));
        let inner_registry = registry.clone();
        let inner_slot = slot.clone();
        let id = registry.subscribe(Arc::new(move |_: &MetricEvent| {
            if let Some(id) = *inner_slot.lock() {
                inner_registry.unsubscribe(id);
            }
            Ok(())
        }));
        *slot.lock() = Some(id);

        registry.dispatch(&event(1.0));
        assert!(registry.is_empty());
    }

    #[test]
    fn close_invalidates_all_subscriptions() {
        let registry = SubscriptionRegistry::new();
        let (a, seen) = recorder();
        let id = registry.subscribe(a);
        registry.close();

        registry.dispatch(&event(1.0));
        assert!(seen.lock().is_empty());
        assert!(!registry.unsubscribe(id));

        let (b, b_seen) = recorder();
        registry.subscribe(b);
        registry.dispatch(&event(2.0));
        assert!(b_seen.lock().is_empty());
        assert!(registry.is_closed());
    }

    #[test]
    fn subscription_ids_are_unique() {
        let registry = SubscriptionRegistry::new();
        let a = registry.subscribe(Arc::new(|_: &MetricEvent| Ok(())));
        let b = registry.subscribe(Arc::new(|_: &MetricEvent| Ok(())));
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "sub-1");
    }
}
