//! 메트릭 개요 / 고급 분석 핸들러.

use axum::extract::{Query, State};
use axum::Json;
use pulse_core::models::analytics::{AdvancedAnalytics, MetricOverview};
use serde::Deserialize;

use crate::error::ApiError;
use crate::AppState;

/// 기본 이력 기간 (일)
const DEFAULT_HISTORY_DAYS: usize = 30;

/// 최대 이력 기간 (일)
const MAX_HISTORY_DAYS: usize = 365;

/// 개요 쿼리 파라미터
#[derive(Debug, Default, Deserialize)]
pub struct OverviewQuery {
    /// 이력 기간 (일, 기본: 30)
    pub days: Option<usize>,
}

impl OverviewQuery {
    /// 검증된 이력 기간
    pub fn days_or_default(&self) -> Result<usize, ApiError> {
        match self.days {
            None => Ok(DEFAULT_HISTORY_DAYS),
            Some(days) if (1..=MAX_HISTORY_DAYS).contains(&days) => Ok(days),
            Some(days) => Err(ApiError::BadRequest(format!(
                "days는 1~{MAX_HISTORY_DAYS} 사이여야 합니다: {days}"
            ))),
        }
    }
}

/// GET /api/metrics?days=30
pub async fn get_metrics(
    State(state): State<AppState>,
    Query(query): Query<OverviewQuery>,
) -> Result<Json<Vec<MetricOverview>>, ApiError> {
    let days = query.days_or_default()?;
    Ok(Json(state.catalog.overview(days)))
}

/// GET /api/analytics
pub async fn get_analytics(State(state): State<AppState>) -> Json<AdvancedAnalytics> {
    Json(state.catalog.analytics())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn days_defaults_to_thirty() {
        assert_eq!(OverviewQuery::default().days_or_default().unwrap(), 30);
    }

    #[test]
    fn days_out_of_range_is_rejected() {
        let zero = OverviewQuery { days: Some(0) };
        assert!(matches!(zero.days_or_default(), Err(ApiError::BadRequest(_))));
        let huge = OverviewQuery { days: Some(1_000) };
        assert!(huge.days_or_default().is_err());
        let week = OverviewQuery { days: Some(7) };
        assert_eq!(week.days_or_default().unwrap(), 7);
    }
}
