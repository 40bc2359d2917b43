//! 분석 개요/예측/이상치/인사이트 모델.
//!
//! 현재 값은 모두 시뮬레이션 자리표시자다. 실제 통계 구현은
//! `ports::analytics::AnalyticsProvider`를 교체해서 연결한다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::metric::{MetricData, MetricKey};

/// 일별 과거 데이터 포인트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPoint {
    pub date: DateTime<Utc>,
    pub value: f64,
    /// 해당 일자의 주석 이벤트 (예: "Campaign Launch")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<String>>,
}

/// 메트릭 개요: 현재 값 + 이력 + 예측 + 목표
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricOverview {
    #[serde(flatten)]
    pub current: MetricData,
    pub history: Vec<HistoricalPoint>,
    pub forecast: f64,
    pub target: f64,
}

/// 예측 값
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub metric: MetricKey,
    pub predicted_value: f64,
    /// 신뢰도 (0.0 ~ 1.0)
    pub confidence: f64,
    pub date: DateTime<Utc>,
}

/// 이상치 심각도
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// 감지된 이상치
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anomaly {
    pub metric: MetricKey,
    pub value: f64,
    pub expected_value: f64,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub description: String,
}

/// 인사이트 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Trend,
    Opportunity,
    Warning,
}

/// 인사이트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub title: String,
    pub description: String,
    pub impact: Severity,
    pub actionable: bool,
    pub timestamp: DateTime<Utc>,
}

/// 고급 분석 묶음
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvancedAnalytics {
    pub predictions: Vec<Prediction>,
    pub anomalies: Vec<Anomaly>,
    pub insights: Vec<Insight>,
}
