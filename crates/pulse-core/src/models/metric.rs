//! 메트릭 키와 스냅샷 항목 모델.
//!
//! 대시보드가 다루는 메트릭은 사전에 고정된 네 가지뿐이다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// 고정된 메트릭 키 집합
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetricKey {
    /// 활성 방문자 수
    #[serde(rename = "visitors")]
    Visitors,
    /// 매출
    #[serde(rename = "revenue")]
    Revenue,
    /// 전환 수
    #[serde(rename = "conversions")]
    Conversions,
    /// 이탈률 (`config` crate는 키를 소문자로 바꾸므로 별칭 허용)
    #[serde(rename = "bounceRate", alias = "bouncerate")]
    BounceRate,
}

impl MetricKey {
    /// 전체 키 (스냅샷 순서와 동일)
    pub const ALL: [MetricKey; 4] = [
        MetricKey::Visitors,
        MetricKey::Revenue,
        MetricKey::Conversions,
        MetricKey::BounceRate,
    ];

    /// 와이어 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKey::Visitors => "visitors",
            MetricKey::Revenue => "revenue",
            MetricKey::Conversions => "conversions",
            MetricKey::BounceRate => "bounceRate",
        }
    }

    /// 화면 표시 이름
    pub fn display_name(&self) -> &'static str {
        match self {
            MetricKey::Visitors => "Active Visitors",
            MetricKey::Revenue => "Revenue",
            MetricKey::Conversions => "Conversions",
            MetricKey::BounceRate => "Bounce Rate",
        }
    }

    /// 와이어 이름 → 키. 알 수 없는 이름은 `None`.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == name)
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| CoreError::MalformedEvent(format!("알 수 없는 메트릭 키: {s}")))
    }
}

/// 추세 방향
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

/// 스냅샷 항목: 메트릭 하나의 현재 값
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricData {
    /// 정적 식별자 (메트릭 키)
    pub id: MetricKey,
    /// 표시 이름
    pub name: String,
    /// 최신 값
    pub value: f64,
    /// 변화량 (시뮬레이션 값, 실제 기준선 대비 계산 아님)
    pub change: f64,
    /// 추세
    pub trend: Trend,
    /// 마지막 적용 이벤트 시각
    pub timestamp: DateTime<Utc>,
}

impl MetricData {
    /// 시드 항목 생성
    pub fn seed(key: MetricKey, value: f64, change: f64, at: DateTime<Utc>) -> Self {
        let trend = if change >= 0.0 { Trend::Up } else { Trend::Down };
        Self {
            id: key,
            name: key.display_name().to_string(),
            value,
            change,
            trend,
            timestamp: at,
        }
    }
}
