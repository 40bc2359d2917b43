//! 설정 및 와이어링 통합 테스트.
//!
//! AppConfig → 허브/이미터/서버/클라이언트 생성 검증.

use pulse_client::{NotificationFeed, RetryPolicy, SseEventChannel, WsEventChannel};
use pulse_core::config::AppConfig;
use pulse_server::{EventHub, MetricEmitter, WebServer};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn config_defaults_are_valid() {
    let config = AppConfig::default_config();
    assert!(config.validate().is_ok());

    assert_eq!(config.server.port, 3001);
    assert!(!config.server.allow_external);
    assert_eq!(config.emitter.interval(), Duration::from_secs(2));
    assert!(config.emitter.value_min < config.emitter.value_max);
    assert!(config.channel.capacity >= config.channel.client_buffer);
    assert_eq!(config.max_retry(), Duration::from_secs(30));
}

#[test]
fn retry_policy_follows_client_config() {
    let config = AppConfig::default_config();
    let policy = RetryPolicy::from(&config.client);
    assert!(policy.reconnect);
    assert_eq!(policy.max_delay, config.max_retry());
    assert_eq!(policy.next_delay(Duration::from_secs(16)), Duration::from_secs(30));
}

#[tokio::test]
async fn all_components_instantiate_from_config() {
    let config = AppConfig::default_config();

    let hub = Arc::new(EventHub::new(config.channel.capacity));
    let emitter = Arc::new(MetricEmitter::new(config.emitter.clone(), hub.clone()));
    let server = WebServer::new(hub.clone(), config.server.clone())
        .with_emitter(emitter.clone())
        .with_client_buffer(config.channel.client_buffer);
    assert_eq!(server.url(), "http://localhost:3001");
    assert!(!emitter.is_running());

    let policy = RetryPolicy::from(&config.client);
    let ws = WsEventChannel::new(&config.client.endpoint, policy);
    assert_eq!(ws.url(), "ws://localhost:3001/api/ws");
    let sse = SseEventChannel::new("http://localhost:3001/api/stream", policy);
    assert_eq!(sse.url(), "http://localhost:3001/api/stream");

    let feed = NotificationFeed::new(config.notification.clone());
    assert!(feed.is_empty());
}
