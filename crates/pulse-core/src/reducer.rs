//! 스냅샷 리듀서.
//!
//! 수신 이벤트를 `MetricSnapshot`으로 폴딩한다. 입력 스냅샷은 변경하지 않고
//! 새 스냅샷을 반환한다.

use tracing::debug;

use crate::models::event::MetricEvent;
use crate::models::snapshot::MetricSnapshot;
use crate::ports::derivation::MetricDerivation;

/// 이벤트 하나를 스냅샷에 적용
///
/// `metric_update`가 아니거나, 페이로드가 깨졌거나, 키를 알 수 없거나,
/// 값이 유한하지 않으면 스냅샷을 그대로 돌려준다. 그 외에는 해당 키의
/// 항목 하나만 바뀐다: `value`는 반올림(0.5는 양의 무한대 쪽),
/// `timestamp`는 이벤트의 생성 시각,
/// `change`/`trend`는 파생 전략이 계산한다.
pub fn apply_event(
    snapshot: &MetricSnapshot,
    event: &MetricEvent,
    derivation: &dyn MetricDerivation,
) -> MetricSnapshot {
    let Some(update) = event.update() else {
        return snapshot.clone();
    };
    let Some(key) = update.key() else {
        debug!("알 수 없는 메트릭 키 무시: {}", update.metric);
        return snapshot.clone();
    };
    if !update.value.is_finite() {
        debug!("유한하지 않은 값 무시: {key}");
        return snapshot.clone();
    }

    let value = round_half_up(update.value);
    let mut next = snapshot.clone();
    let entry = next.get_mut(key);
    let derived = derivation.derive(key, entry, value);
    entry.value = value;
    entry.change = derived.change;
    entry.trend = derived.trend;
    entry.timestamp = event.emitted_at();
    next
}

/// 0.5를 항상 올리는 반올림 (`-2.5` → `-2`)
fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}
