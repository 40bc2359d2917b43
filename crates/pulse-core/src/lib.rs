//! # pulse-core
//!
//! Pulse 도메인 모델, 포트(trait) 정의, 스냅샷 리듀서, 에러 타입.
//! 서버/클라이언트 crate가 공유하는 핵심 타입과 인터페이스를 제공한다.
//!
//! ## 구조
//!
//! - [`models`]: 메트릭 키, 실시간 이벤트, 스냅샷 (serde Serialize/Deserialize)
//! - [`ports`]: 이벤트 채널, 메트릭 파생 전략 인터페이스
//! - [`reducer`]: 이벤트 → 스냅샷 폴딩 (순수 함수)
//! - [`error`]: 핵심 에러 타입 (thiserror)
//! - [`config`]: 애플리케이션 설정 구조체

pub mod config;
pub mod error;
pub mod models;
pub mod ports;
pub mod reducer;

#[cfg(test)]
mod tests {
    use crate::models::event::MetricEvent;
    use crate::models::metric::MetricKey;

    #[test]
    fn metric_event_serde_roundtrip() {
        let event = MetricEvent::metric_update(MetricKey::Revenue, 512.25, chrono::Utc::now());

        let json = serde_json::to_string(&event).unwrap();
        let decoded = MetricEvent::decode(&json).unwrap();

        assert_eq!(decoded, event);
        let update = decoded.update().unwrap();
        assert_eq!(update.metric, "revenue");
        assert!((update.value - 512.25).abs() < f64::EPSILON);
    }

    #[test]
    fn config_defaults() {
        let config = crate::config::AppConfig::default_config();
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.emitter.interval_ms, 2_000);
        assert_eq!(config.channel.capacity, 256);
        assert!(config.client.reconnect);
        assert!(config.validate().is_ok());
    }
}
