//! 분석 데이터 제공 포트.
//!
//! 구현: `pulse-server` crate (`PlaceholderAnalytics`, 난수 기반 자리표시자)

use chrono::{DateTime, Utc};

use crate::models::analytics::{AdvancedAnalytics, MetricOverview};

/// 분석 데이터 제공 인터페이스
pub trait AnalyticsProvider: Send + Sync {
    /// 메트릭별 개요 (`MetricKey::ALL` 순서, 과거 `history_days`일 이력 포함)
    fn overview(&self, at: DateTime<Utc>, history_days: usize) -> Vec<MetricOverview>;

    /// 예측/이상치/인사이트
    fn analytics(&self, at: DateTime<Utc>) -> AdvancedAnalytics;
}
