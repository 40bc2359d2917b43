//! 실시간 메트릭 이벤트 모델.
//!
//! 와이어 포맷:
//!
//! ```json
//! {
//!   "type": "metric_update",
//!   "data": { "metric": "visitors", "value": 412.7, "timestamp": "2026-01-30T12:00:00Z" },
//!   "timestamp": "2026-01-30T12:00:00Z"
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::models::metric::MetricKey;

/// 이벤트 종류 태그
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// 메트릭 값 갱신 (유일하게 구조화된 페이로드를 가짐)
    MetricUpdate,
    /// 신규 방문자
    NewVisitor,
    /// 전환 발생
    Conversion,
    /// 에러
    Error,
}

impl EventKind {
    /// 와이어 이름 (SSE 이벤트 이름으로도 사용)
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::MetricUpdate => "metric_update",
            EventKind::NewVisitor => "new_visitor",
            EventKind::Conversion => "conversion",
            EventKind::Error => "error",
        }
    }
}

/// `metric_update` 페이로드
///
/// `metric`은 문자열 그대로 보존한다. 알 수 없는 키도 디코딩은 성공하고,
/// 리듀서 단계에서 무시된다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricUpdate {
    /// 메트릭 키 (와이어 이름)
    pub metric: String,
    /// 관측 값
    pub value: f64,
    /// 관측 시각
    pub timestamp: DateTime<Utc>,
}

impl MetricUpdate {
    /// 알려진 키로 변환. 알 수 없는 키는 `None`.
    pub fn key(&self) -> Option<MetricKey> {
        MetricKey::parse(&self.metric)
    }
}

/// 실시간 이벤트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEvent {
    /// 이벤트 종류
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// 종류별 페이로드 (`metric_update`만 구조가 정해져 있음)
    #[serde(default)]
    pub data: serde_json::Value,
    /// 소스가 생성 시 부여한 시각
    pub timestamp: DateTime<Utc>,
}

impl MetricEvent {
    /// 임의 종류의 이벤트 생성
    pub fn new(kind: EventKind, data: serde_json::Value, emitted_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            data,
            timestamp: emitted_at,
        }
    }

    /// `metric_update` 이벤트 생성
    pub fn metric_update(key: MetricKey, value: f64, emitted_at: DateTime<Utc>) -> Self {
        Self {
            kind: EventKind::MetricUpdate,
            data: serde_json::json!({
                "metric": key.as_str(),
                "value": value,
                "timestamp": emitted_at,
            }),
            timestamp: emitted_at,
        }
    }

    /// 생성 시각
    pub fn emitted_at(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// `metric_update` 페이로드 디코딩
    ///
    /// 다른 종류이거나 필수 필드가 빠져 있으면 `None`.
    pub fn update(&self) -> Option<MetricUpdate> {
        if self.kind != EventKind::MetricUpdate {
            return None;
        }
        serde_json::from_value(self.data.clone()).ok()
    }

    /// 와이어 텍스트 디코딩
    pub fn decode(text: &str) -> Result<Self, CoreError> {
        serde_json::from_str(text).map_err(|e| CoreError::MalformedEvent(e.to_string()))
    }

    /// 와이어 텍스트 인코딩
    pub fn encode(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_shape_matches_protocol() {
        let at = DateTime::parse_from_rfc3339("2026-01-30T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let event = MetricEvent::metric_update(MetricKey::BounceRate, 42.5, at);
        let value: serde_json::Value = serde_json::from_str(&event.encode().unwrap()).unwrap();

        assert_eq!(value["type"], "metric_update");
        assert_eq!(value["data"]["metric"], "bounceRate");
        assert_eq!(value["data"]["value"], 42.5);
        assert!(value["data"]["timestamp"].is_string());
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn decode_foreign_payload() {
        let text = r#"{
            "type": "metric_update",
            "data": {"metric": "visitors", "value": 871.3, "timestamp": "2026-01-30T12:00:03.120Z"},
            "timestamp": "2026-01-30T12:00:03.120Z"
        }"#;
        let event = MetricEvent::decode(text).unwrap();
        let update = event.update().unwrap();
        assert_eq!(update.key(), Some(MetricKey::Visitors));
    }

    #[test]
    fn unknown_metric_decodes_but_has_no_key() {
        let text = r#"{"type":"metric_update","data":{"metric":"unknown","value":1.0,"timestamp":"2026-01-30T12:00:00Z"},"timestamp":"2026-01-30T12:00:00Z"}"#;
        let event = MetricEvent::decode(text).unwrap();
        assert_eq!(event.update().unwrap().key(), None);
    }

    #[test]
    fn missing_payload_fields_yield_no_update() {
        let text = r#"{"type":"metric_update","data":{"metric":"revenue"},"timestamp":"2026-01-30T12:00:00Z"}"#;
        let event = MetricEvent::decode(text).unwrap();
        assert!(event.update().is_none());
    }

    #[test]
    fn non_update_kinds_have_no_update() {
        let event = MetricEvent::new(EventKind::Conversion, serde_json::json!({}), Utc::now());
        assert!(event.update().is_none());
    }

    #[test]
    fn unknown_type_is_malformed() {
        let text = r#"{"type":"page_view","data":{},"timestamp":"2026-01-30T12:00:00Z"}"#;
        assert!(matches!(
            MetricEvent::decode(text),
            Err(CoreError::MalformedEvent(_))
        ));
        assert!(MetricEvent::decode("not json").is_err());
    }
}
