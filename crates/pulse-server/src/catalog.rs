//! 분석 카탈로그: 자리표시자 분석 데이터와 TTL 캐시.
//!
//! `/api/metrics`, `/api/analytics` 응답의 출처. 값은 시뮬레이션이며
//! 같은 요청은 캐시 TTL(기본 5분) 동안 동일한 응답을 돌려준다.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use pulse_core::models::analytics::{
    AdvancedAnalytics, Anomaly, HistoricalPoint, Insight, InsightKind, MetricOverview, Prediction,
    Severity,
};
use pulse_core::models::metric::{MetricData, MetricKey, Trend};
use pulse_core::ports::analytics::AnalyticsProvider;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// 기본 캐시 유지 시간
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// 메트릭별 자리표시자 범위
struct PlaceholderRange {
    /// 현재 값 `[min, min + span)`
    value_min: f64,
    value_span: f64,
    /// 변화량 진폭 (`±amplitude / 2`)
    change_amplitude: f64,
    forecast_min: f64,
    forecast_span: f64,
    target: f64,
    /// 정수 값 여부
    integral: bool,
}

fn placeholder_range(key: MetricKey) -> PlaceholderRange {
    match key {
        MetricKey::Visitors => PlaceholderRange {
            value_min: 1_000.0,
            value_span: 2_000.0,
            change_amplitude: 30.0,
            forecast_min: 1_200.0,
            forecast_span: 2_000.0,
            target: 1_500.0,
            integral: true,
        },
        MetricKey::Revenue => PlaceholderRange {
            value_min: 30_000.0,
            value_span: 50_000.0,
            change_amplitude: 25.0,
            forecast_min: 35_000.0,
            forecast_span: 55_000.0,
            target: 45_000.0,
            integral: true,
        },
        MetricKey::Conversions => PlaceholderRange {
            value_min: 50.0,
            value_span: 200.0,
            change_amplitude: 40.0,
            forecast_min: 60.0,
            forecast_span: 220.0,
            target: 150.0,
            integral: true,
        },
        MetricKey::BounceRate => PlaceholderRange {
            value_min: 25.0,
            value_span: 30.0,
            change_amplitude: 15.0,
            forecast_min: 22.0,
            forecast_span: 28.0,
            target: 30.0,
            integral: false,
        },
    }
}

fn uniform(min: f64, span: f64, integral: bool) -> f64 {
    let raw = rand::random::<f64>() * span;
    if integral {
        min + raw.floor()
    } else {
        min + raw
    }
}

/// 난수 기반 자리표시자 분석 제공자
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderAnalytics;

impl PlaceholderAnalytics {
    fn history(at: DateTime<Utc>, days: usize) -> Vec<HistoricalPoint> {
        (0..days)
            .rev()
            .map(|offset| HistoricalPoint {
                date: at - ChronoDuration::days(offset as i64),
                value: uniform(500.0, 1_000.0, true),
                events: (rand::random::<f64>() > 0.8).then(|| vec!["Campaign Launch".to_string()]),
            })
            .collect()
    }
}

impl AnalyticsProvider for PlaceholderAnalytics {
    fn overview(&self, at: DateTime<Utc>, history_days: usize) -> Vec<MetricOverview> {
        MetricKey::ALL
            .into_iter()
            .map(|key| {
                let range = placeholder_range(key);
                let change = (rand::random::<f64>() - 0.5) * range.change_amplitude;
                let rising = rand::random::<f64>() > 0.5;
                // 이탈률은 낮을수록 좋으므로 추세 방향이 반대
                let trend = if (key == MetricKey::BounceRate) ^ rising {
                    Trend::Up
                } else {
                    Trend::Down
                };
                let mut current = MetricData::seed(
                    key,
                    uniform(range.value_min, range.value_span, range.integral),
                    change,
                    at,
                );
                current.trend = trend;
                MetricOverview {
                    current,
                    history: Self::history(at, history_days),
                    forecast: uniform(range.forecast_min, range.forecast_span, range.integral),
                    target: range.target,
                }
            })
            .collect()
    }

    fn analytics(&self, at: DateTime<Utc>) -> AdvancedAnalytics {
        let tomorrow = at + ChronoDuration::days(1);
        AdvancedAnalytics {
            predictions: vec![
                Prediction {
                    metric: MetricKey::Visitors,
                    predicted_value: 1_800.0,
                    confidence: 0.85,
                    date: tomorrow,
                },
                Prediction {
                    metric: MetricKey::Revenue,
                    predicted_value: 48_000.0,
                    confidence: 0.78,
                    date: tomorrow,
                },
            ],
            anomalies: vec![Anomaly {
                metric: MetricKey::Conversions,
                value: 25.0,
                expected_value: 85.0,
                severity: Severity::High,
                timestamp: at - ChronoDuration::hours(2),
                description:
                    "Conversion rate dropped significantly compared to historical average"
                        .to_string(),
            }],
            insights: vec![
                Insight {
                    id: "1".to_string(),
                    kind: InsightKind::Trend,
                    title: "Mobile Traffic Increasing".to_string(),
                    description: "Mobile traffic has increased by 35% over the last 7 days"
                        .to_string(),
                    impact: Severity::High,
                    actionable: true,
                    timestamp: at,
                },
                Insight {
                    id: "2".to_string(),
                    kind: InsightKind::Opportunity,
                    title: "Weekend Performance".to_string(),
                    description: "Weekend conversions are 20% lower than weekdays".to_string(),
                    impact: Severity::Medium,
                    actionable: true,
                    timestamp: at,
                },
            ],
        }
    }
}

struct Cached<T> {
    stored_at: Instant,
    value: T,
}

impl<T: Clone> Cached<T> {
    fn fresh(&self, ttl: Duration) -> Option<T> {
        (self.stored_at.elapsed() < ttl).then(|| self.value.clone())
    }
}

/// 분석 제공자 + TTL 캐시
pub struct AnalyticsCatalog {
    provider: Arc<dyn AnalyticsProvider>,
    ttl: Duration,
    overviews: Mutex<HashMap<usize, Cached<Vec<MetricOverview>>>>,
    analytics: Mutex<Option<Cached<AdvancedAnalytics>>>,
}

impl AnalyticsCatalog {
    pub fn new(provider: Arc<dyn AnalyticsProvider>, ttl: Duration) -> Self {
        Self {
            provider,
            ttl,
            overviews: Mutex::new(HashMap::new()),
            analytics: Mutex::new(None),
        }
    }

    /// 메트릭 개요 (이력 `days`일). 캐시 키는 `days`.
    pub fn overview(&self, days: usize) -> Vec<MetricOverview> {
        let mut overviews = self.overviews.lock();
        if let Some(hit) = overviews.get(&days).and_then(|c| c.fresh(self.ttl)) {
            debug!("메트릭 개요 캐시 적중 ({days}일)");
            return hit;
        }
        let value = self.provider.overview(Utc::now(), days);
        overviews.insert(
            days,
            Cached {
                stored_at: Instant::now(),
                value: value.clone(),
            },
        );
        value
    }

    /// 고급 분석
    pub fn analytics(&self) -> AdvancedAnalytics {
        let mut analytics = self.analytics.lock();
        if let Some(hit) = analytics.as_ref().and_then(|c| c.fresh(self.ttl)) {
            debug!("고급 분석 캐시 적중");
            return hit;
        }
        let value = self.provider.analytics(Utc::now());
        *analytics = Some(Cached {
            stored_at: Instant::now(),
            value: value.clone(),
        });
        value
    }
}

impl Default for AnalyticsCatalog {
    fn default() -> Self {
        Self::new(Arc::new(PlaceholderAnalytics), DEFAULT_CACHE_TTL)
    }
}
