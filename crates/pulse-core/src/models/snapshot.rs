//! 메트릭 스냅샷 (렌더링용 읽기 모델).
//!
//! 네 개 키를 필드로 고정하므로 항목이 빠지거나 추가되는 상태는 표현할 수 없다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::metric::{MetricData, MetricKey};

/// 키별 현재 메트릭 값
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub visitors: MetricData,
    pub revenue: MetricData,
    pub conversions: MetricData,
    #[serde(rename = "bounceRate")]
    pub bounce_rate: MetricData,
}

impl MetricSnapshot {
    /// 시드 값으로 초기화된 스냅샷
    ///
    /// 첫 이벤트 도착 전에도 UI가 정의되지 않은 메트릭을 보지 않도록 한다.
    pub fn seeded(at: DateTime<Utc>) -> Self {
        Self {
            visitors: MetricData::seed(MetricKey::Visitors, 1234.0, 12.5, at),
            revenue: MetricData::seed(MetricKey::Revenue, 45678.0, -2.3, at),
            conversions: MetricData::seed(MetricKey::Conversions, 89.0, 8.7, at),
            bounce_rate: MetricData::seed(MetricKey::BounceRate, 34.2, -1.5, at),
        }
    }

    /// 키로 항목 조회
    pub fn get(&self, key: MetricKey) -> &MetricData {
        match key {
            MetricKey::Visitors => &self.visitors,
            MetricKey::Revenue => &self.revenue,
            MetricKey::Conversions => &self.conversions,
            MetricKey::BounceRate => &self.bounce_rate,
        }
    }

    pub(crate) fn get_mut(&mut self, key: MetricKey) -> &mut MetricData {
        match key {
            MetricKey::Visitors => &mut self.visitors,
            MetricKey::Revenue => &mut self.revenue,
            MetricKey::Conversions => &mut self.conversions,
            MetricKey::BounceRate => &mut self.bounce_rate,
        }
    }

    /// `MetricKey::ALL` 순서로 순회
    pub fn iter(&self) -> impl Iterator<Item = (MetricKey, &MetricData)> {
        MetricKey::ALL.into_iter().map(move |key| (key, self.get(key)))
    }
}

impl Default for MetricSnapshot {
    fn default() -> Self {
        Self::seeded(Utc::now())
    }
}
