//! 알림 피드.
//!
//! 레지스트리 구독자 하나로 동작한다. 이벤트 종류와 메트릭 임계값에 따라
//! 사용자용 알림을 만들고, 최근 `max_items`개만 보관한다.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use pulse_core::config::NotificationConfig;
use pulse_core::models::event::{EventKind, MetricEvent};
use pulse_core::models::metric::MetricKey;
use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::registry::{SubscriptionId, SubscriptionRegistry};

/// 알림 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// 사용자 알림
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

/// 목록 필터
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NotificationFilter {
    #[default]
    All,
    Unread,
}

#[derive(Default)]
struct FeedState {
    /// 최신 알림이 앞
    items: VecDeque<Notification>,
    /// 현재 임계값을 넘은 상태인 메트릭 (경고 중복 방지)
    above_threshold: BTreeSet<MetricKey>,
}

/// 알림 피드
#[derive(Clone)]
pub struct NotificationFeed {
    config: Arc<NotificationConfig>,
    state: Arc<Mutex<FeedState>>,
}

impl NotificationFeed {
    pub fn new(config: NotificationConfig) -> Self {
        Self {
            config: Arc::new(config),
            state: Arc::new(Mutex::new(FeedState::default())),
        }
    }

    /// 레지스트리에 구독자로 등록
    pub fn attach(&self, registry: &SubscriptionRegistry) -> SubscriptionId {
        let feed = self.clone();
        registry.subscribe(Arc::new(move |event: &MetricEvent| {
            feed.observe(event);
            Ok(())
        }))
    }

    /// 이벤트 하나 관찰
    pub fn observe(&self, event: &MetricEvent) {
        if !self.config.enabled {
            return;
        }
        let at = event.emitted_at();
        match event.kind {
            EventKind::NewVisitor => {
                self.push(NotificationLevel::Info, "New Visitor", "새 방문자가 도착했습니다", at)
            }
            EventKind::Conversion => {
                self.push(NotificationLevel::Success, "Conversion", "전환이 발생했습니다", at)
            }
            EventKind::Error => {
                let message = event
                    .data
                    .as_str()
                    .map(str::to_string)
                    .or_else(|| event.data.get("message").and_then(|m| m.as_str()).map(str::to_string))
                    .unwrap_or_else(|| "알 수 없는 에러".to_string());
                self.push(NotificationLevel::Error, "Error", &message, at);
            }
            EventKind::MetricUpdate => self.check_threshold(event),
        }
    }

    /// 임계값 상향 돌파 시 경고 (다시 내려갔다가 넘으면 재경고)
    fn check_threshold(&self, event: &MetricEvent) {
        let Some(update) = event.update() else {
            return;
        };
        let Some(key) = update.key() else {
            return;
        };
        let Some(&threshold) = self.config.thresholds.get(&key) else {
            return;
        };

        let crossed = {
            let mut state = self.state.lock();
            if update.value > threshold {
                state.above_threshold.insert(key)
            } else {
                state.above_threshold.remove(&key);
                false
            }
        };
        if crossed {
            let message = format!(
                "{}이(가) 임계값 {threshold}을 넘었습니다: {:.1}",
                key.display_name(),
                update.value
            );
            self.push(NotificationLevel::Warning, "Threshold Exceeded", &message, event.emitted_at());
        }
    }

    fn push(&self, level: NotificationLevel, title: &str, message: &str, at: DateTime<Utc>) {
        let notification = Notification {
            id: Uuid::new_v4(),
            level,
            title: title.to_string(),
            message: message.to_string(),
            timestamp: at,
            read: false,
        };
        info!("알림: [{title}] {message}");
        let mut state = self.state.lock();
        state.items.push_front(notification);
        while state.items.len() > self.config.max_items {
            if let Some(dropped) = state.items.pop_back() {
                debug!("오래된 알림 제거: {}", dropped.id);
            }
        }
    }

    /// 알림 목록 (최신순)
    pub fn list(&self, filter: NotificationFilter) -> Vec<Notification> {
        self.state
            .lock()
            .items
            .iter()
            .filter(|n| filter == NotificationFilter::All || !n.read)
            .cloned()
            .collect()
    }

    /// 읽음 표시. 없는 ID면 `false`.
    pub fn mark_as_read(&self, id: Uuid) -> bool {
        let mut state = self.state.lock();
        match state.items.iter_mut().find(|n| n.id == id) {
            Some(notification) => {
                notification.read = true;
                true
            }
            None => false,
        }
    }

    /// 알림 하나 제거. 없는 ID면 `false`.
    pub fn remove(&self, id: Uuid) -> bool {
        let mut state = self.state.lock();
        let before = state.items.len();
        state.items.retain(|n| n.id != id);
        state.items.len() != before
    }

    pub fn clear_all(&self) {
        self.state.lock().items.clear();
    }

    pub fn unread_count(&self) -> usize {
        self.state.lock().items.iter().filter(|n| !n.read).count()
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn feed_with(max_items: usize, thresholds: &[(MetricKey, f64)]) -> NotificationFeed {
        NotificationFeed::new(NotificationConfig {
            enabled: true,
            max_items,
            thresholds: thresholds.iter().copied().collect::<BTreeMap<_, _>>(),
        })
    }

    fn kind(kind: EventKind, data: serde_json::Value) -> MetricEvent {
        MetricEvent::new(kind, data, Utc::now())
    }

    #[test]
    fn event_kinds_map_to_levels() {
        let feed = feed_with(10, &[]);
        feed.observe(&kind(EventKind::NewVisitor, serde_json::json!({})));
        feed.observe(&kind(EventKind::Conversion, serde_json::json!({})));
        feed.observe(&kind(EventKind::Error, serde_json::json!({"message": "결제 실패"})));

        let levels: Vec<_> = feed.list(NotificationFilter::All).iter().map(|n| n.level).collect();
        assert_eq!(
            levels,
            vec![NotificationLevel::Error, NotificationLevel::Success, NotificationLevel::Info]
        );
        assert_eq!(feed.list(NotificationFilter::All)[0].message, "결제 실패");
    }

    #[test]
    fn threshold_warns_once_per_crossing() {
        let feed = feed_with(10, &[(MetricKey::BounceRate, 50.0)]);
        let update = |value| MetricEvent::metric_update(MetricKey::BounceRate, value, Utc::now());

        feed.observe(&update(40.0));
        feed.observe(&update(60.0));
        feed.observe(&update(70.0));
        assert_eq!(feed.len(), 1);

        feed.observe(&update(30.0));
        feed.observe(&update(55.0));
        assert_eq!(feed.len(), 2);
        assert!(feed
            .list(NotificationFilter::All)
            .iter()
            .all(|n| n.level == NotificationLevel::Warning));

        // 임계값이 없는 메트릭은 무시
        feed.observe(&MetricEvent::metric_update(MetricKey::Revenue, 1e9, Utc::now()));
        assert_eq!(feed.len(), 2);
    }

    #[test]
    fn feed_is_bounded_newest_first() {
        let feed = feed_with(3, &[]);
        for _ in 0..5 {
            feed.observe(&kind(EventKind::NewVisitor, serde_json::json!({})));
        }
        assert_eq!(feed.len(), 3);
    }

    #[test]
    fn read_state_management() {
        let feed = feed_with(10, &[]);
        feed.observe(&kind(EventKind::NewVisitor, serde_json::json!({})));
        feed.observe(&kind(EventKind::Conversion, serde_json::json!({})));
        let items = feed.list(NotificationFilter::All);

        assert!(feed.mark_as_read(items[0].id));
        assert_eq!(feed.unread_count(), 1);
        assert_eq!(feed.list(NotificationFilter::Unread)[0].id, items[1].id);

        assert!(feed.remove(items[1].id));
        assert!(!feed.remove(items[1].id));
        assert!(!feed.mark_as_read(Uuid::new_v4()));

        feed.clear_all();
        assert!(feed.is_empty());
    }

    #[test]
    fn disabled_feed_ignores_everything() {
        let feed = NotificationFeed::new(NotificationConfig {
            enabled: false,
            ..NotificationConfig::default()
        });
        feed.observe(&kind(EventKind::Error, serde_json::json!("boom")));
        assert!(feed.is_empty());
    }

    #[test]
    fn attaches_as_registry_subscriber() {
        let registry = SubscriptionRegistry::new();
        let feed = feed_with(10, &[]);
        let id = feed.attach(&registry);
        registry.dispatch(&kind(EventKind::Conversion, serde_json::json!({})));
        assert_eq!(feed.unread_count(), 1);
        assert!(registry.unsubscribe(id));
    }
}
