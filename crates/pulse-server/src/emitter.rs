//! 메트릭 이벤트 이미터.
//!
//! 고정 주기로 무작위 `metric_update` 이벤트를 만들어 허브에 발행한다.
//! 모든 클라이언트가 하나의 이미터를 공유한다.

use chrono::Utc;
use parking_lot::Mutex;
use pulse_core::config::EmitterConfig;
use pulse_core::models::event::MetricEvent;
use pulse_core::models::metric::MetricKey;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::hub::EventHub;

/// 타이머 기반 이벤트 소스
pub struct MetricEmitter {
    config: EmitterConfig,
    hub: Arc<EventHub>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl MetricEmitter {
    pub fn new(config: EmitterConfig, hub: Arc<EventHub>) -> Self {
        Self {
            config,
            hub,
            task: Mutex::new(None),
        }
    }

    /// 발행 시작
    ///
    /// 첫 이벤트는 한 주기 뒤에 나간다. 이미 실행 중이면 아무것도 하지 않고
    /// `false`를 반환한다. tokio 런타임 컨텍스트 안에서 호출해야 한다.
    pub fn start(&self) -> bool {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            debug!("이미터 이미 실행 중");
            return false;
        }

        let period = self.config.interval();
        let config = self.config.clone();
        let hub = self.hub.clone();
        *task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let event = next_event(&config);
                let receivers = hub.publish(event);
                debug!("메트릭 이벤트 발행 (수신자 {receivers}명)");
            }
        }));
        info!("이미터 시작: 주기 {}ms", self.config.interval_ms);
        true
    }

    /// 발행 중지
    ///
    /// 반환 이후 새 이벤트는 나가지 않는다. 실행 중이 아니었으면 `false`.
    pub fn stop(&self) -> bool {
        match self.task.lock().take() {
            Some(task) => {
                task.abort();
                info!("이미터 중지");
                true
            }
            None => false,
        }
    }

    /// 실행 여부
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for MetricEmitter {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

/// 무작위 `metric_update` 이벤트 하나 생성
///
/// 키는 네 가지 중 균등 선택, 값은 `[value_min, value_max)` 균등 분포.
pub fn next_event(config: &EmitterConfig) -> MetricEvent {
    let slot = (rand::random::<f64>() * MetricKey::ALL.len() as f64) as usize;
    let key = MetricKey::ALL[slot.min(MetricKey::ALL.len() - 1)];
    let span = config.value_max - config.value_min;
    let value = config.value_min + rand::random::<f64>() * span;
    MetricEvent::metric_update(key, value, Utc::now())
}
