//! 메트릭 파생 전략 포트.
//!
//! 스냅샷 항목의 `change`/`trend`는 실제 기준선이 없으므로 시뮬레이션 값이다.
//! 실제 통계로 교체할 때는 이 trait만 바꾸면 되고 이벤트 분배 코어는 그대로 둔다.

use crate::models::metric::{MetricData, MetricKey, Trend};

/// `RandomDerivation`이 만드는 `change`의 절댓값 상한 (`[-10, 10)`)
pub const CHANGE_BOUND: f64 = 10.0;

/// 파생 결과
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Derived {
    pub change: f64,
    pub trend: Trend,
}

/// 메트릭 파생 전략 인터페이스
pub trait MetricDerivation: Send + Sync {
    /// 새 값이 적용될 때의 `change`/`trend` 계산
    fn derive(&self, key: MetricKey, previous: &MetricData, new_value: f64) -> Derived;
}

/// 시뮬레이션 전략: 경계 있는 난수 `change`, 그 부호로 정해지는 `trend`
///
/// 같은 이벤트를 두 번 적용해도 결과가 달라진다 (멱등성 없음).
/// `trend`는 항상 `Up`/`Down` 둘 중 하나이고 0은 `Up`으로 본다.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomDerivation;

impl MetricDerivation for RandomDerivation {
    fn derive(&self, _key: MetricKey, _previous: &MetricData, _new_value: f64) -> Derived {
        let change = (rand::random::<f64>() - 0.5) * 2.0 * CHANGE_BOUND;
        let trend = if change >= 0.0 {
            Trend::Up
        } else {
            Trend::Down
        };
        Derived { change, trend }
    }
}

/// 결정적 전략: 직전 값 대비 변화율(%)과 그 부호
#[derive(Debug, Clone, Copy, Default)]
pub struct SignDerivation;

impl MetricDerivation for SignDerivation {
    fn derive(&self, _key: MetricKey, previous: &MetricData, new_value: f64) -> Derived {
        let change = if previous.value == 0.0 {
            0.0
        } else {
            (new_value - previous.value) / previous.value.abs() * 100.0
        };
        let trend = if change > 0.0 {
            Trend::Up
        } else if change < 0.0 {
            Trend::Down
        } else {
            Trend::Stable
        };
        Derived { change, trend }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn previous(value: f64) -> MetricData {
        MetricData::seed(MetricKey::Visitors, value, 0.0, Utc::now())
    }

    #[test]
    fn random_change_is_bounded_and_trend_follows_sign() {
        let prev = previous(100.0);
        for _ in 0..1_000 {
            let derived = RandomDerivation.derive(MetricKey::Visitors, &prev, 50.0);
            assert!(derived.change >= -CHANGE_BOUND && derived.change < CHANGE_BOUND);
            let expected = if derived.change >= 0.0 {
                Trend::Up
            } else {
                Trend::Down
            };
            assert_eq!(derived.trend, expected, "change={}", derived.change);
        }
    }

    #[test]
    fn sign_derivation_uses_delta() {
        let prev = previous(200.0);
        let up = SignDerivation.derive(MetricKey::Visitors, &prev, 250.0);
        assert_eq!(up.trend, Trend::Up);
        assert!((up.change - 25.0).abs() < 1e-9);

        let down = SignDerivation.derive(MetricKey::Visitors, &prev, 100.0);
        assert_eq!(down.trend, Trend::Down);

        let flat = SignDerivation.derive(MetricKey::Visitors, &prev, 200.0);
        assert_eq!(flat.trend, Trend::Stable);
    }

    #[test]
    fn sign_derivation_from_zero_is_stable() {
        let derived = SignDerivation.derive(MetricKey::Visitors, &previous(0.0), 10.0);
        assert_eq!(derived.change, 0.0);
        assert_eq!(derived.trend, Trend::Stable);
    }
}
