//! 애플리케이션 설정 구조체.
//!
//! 서버 포트, 이미터 주기, 채널 용량, 클라이언트 연결 설정, 알림 임계값 등
//! 런타임 설정을 정의한다. `pulse-app`에서 `config` crate를 통해 파일/환경변수에서 로드.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::CoreError;
use crate::models::metric::MetricKey;

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 웹 서버 설정
    #[serde(default)]
    pub server: ServerConfig,
    /// 이벤트 이미터 설정
    #[serde(default)]
    pub emitter: EmitterConfig,
    /// 이벤트 채널 설정
    #[serde(default)]
    pub channel: ChannelConfig,
    /// 클라이언트 연결 설정
    #[serde(default)]
    pub client: ClientConfig,
    /// 알림 설정
    #[serde(default)]
    pub notification: NotificationConfig,
}

// ============================================================
// 서버 설정
// ============================================================

/// 웹 서버 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 웹 서버 포트 (기본: 3001)
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// 외부 접근 허용 여부 (false: 127.0.0.1 only)
    #[serde(default)]
    pub allow_external: bool,
    /// CORS 허용 오리진 (`*`이면 전체 허용)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
    /// `/api/metrics`, `/api/analytics` 응답 캐시 유지 시간 (초)
    #[serde(default = "default_analytics_cache_secs")]
    pub analytics_cache_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_server_port(),
            allow_external: false,
            cors_origin: default_cors_origin(),
            analytics_cache_secs: default_analytics_cache_secs(),
        }
    }
}

impl ServerConfig {
    /// 분석 캐시 유지 시간을 Duration으로 반환
    pub fn analytics_cache(&self) -> Duration {
        Duration::from_secs(self.analytics_cache_secs)
    }
}

// ============================================================
// 이미터 설정
// ============================================================

/// 이벤트 이미터 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmitterConfig {
    /// 틱 간격 (밀리초)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// 난수 값 하한 (포함)
    #[serde(default)]
    pub value_min: f64,
    /// 난수 값 상한 (미포함)
    #[serde(default = "default_value_max")]
    pub value_max: f64,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            value_min: 0.0,
            value_max: default_value_max(),
        }
    }
}

impl EmitterConfig {
    /// 틱 간격을 Duration으로 반환
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

// ============================================================
// 채널 설정
// ============================================================

/// 이벤트 채널 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// 브로드캐스트 링 버퍼 크기
    #[serde(default = "default_channel_capacity")]
    pub capacity: usize,
    /// 엔드포인트별 전송 큐 크기 (가득 차면 이벤트 드롭)
    #[serde(default = "default_client_buffer")]
    pub client_buffer: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            capacity: default_channel_capacity(),
            client_buffer: default_client_buffer(),
        }
    }
}

// ============================================================
// 클라이언트 설정
// ============================================================

/// 푸시 연결 방식
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// WebSocket (`/api/ws`)
    #[default]
    Ws,
    /// Server-Sent Events (`/api/stream`)
    Sse,
}

/// 클라이언트 연결 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// 푸시 엔드포인트 URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// 연결 방식
    #[serde(default)]
    pub transport: Transport,
    /// 끊겼을 때 재연결 여부
    #[serde(default = "default_true")]
    pub reconnect: bool,
    /// 재연결 backoff 최대 대기 (초)
    #[serde(default = "default_max_retry_secs")]
    pub max_retry_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            transport: Transport::default(),
            reconnect: true,
            max_retry_secs: default_max_retry_secs(),
        }
    }
}

// ============================================================
// 알림 설정
// ============================================================

/// 알림 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// 알림 활성화 여부
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 보관할 최대 알림 수 (초과 시 가장 오래된 것부터 제거)
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    /// 메트릭별 경고 임계값 (값이 임계값을 넘으면 경고)
    #[serde(default)]
    pub thresholds: BTreeMap<MetricKey, f64>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_items: default_max_items(),
            thresholds: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    /// 기본 설정 생성
    pub fn default_config() -> Self {
        Self::default()
    }

    /// 설정 값 검증
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.emitter.interval_ms == 0 {
            return Err(CoreError::validation(
                "emitter.interval_ms",
                "0보다 커야 합니다",
            ));
        }
        if !(self.emitter.value_min.is_finite() && self.emitter.value_max.is_finite())
            || self.emitter.value_min >= self.emitter.value_max
        {
            return Err(CoreError::Config(format!(
                "emitter 범위가 잘못됨: value_min({})은 유한하고 value_max({})보다 작아야 합니다",
                self.emitter.value_min, self.emitter.value_max
            )));
        }
        if self.channel.capacity == 0 {
            return Err(CoreError::validation("channel.capacity", "0보다 커야 합니다"));
        }
        if self.channel.client_buffer == 0 {
            return Err(CoreError::validation(
                "channel.client_buffer",
                "0보다 커야 합니다",
            ));
        }
        if self.client.endpoint.trim().is_empty() {
            return Err(CoreError::validation("client.endpoint", "비어 있습니다"));
        }
        if self.notification.max_items == 0 {
            return Err(CoreError::validation(
                "notification.max_items",
                "0보다 커야 합니다",
            ));
        }
        Ok(())
    }

    /// 재연결 backoff 최대 대기를 Duration으로 반환
    pub fn max_retry(&self) -> Duration {
        Duration::from_secs(self.client.max_retry_secs)
    }
}

// ============================================================
// 기본값 함수
// ============================================================

fn default_true() -> bool {
    true
}

fn default_server_port() -> u16 {
    3001
}

fn default_cors_origin() -> String {
    "http://localhost:5173".to_string()
}

fn default_analytics_cache_secs() -> u64 {
    5 * 60
}

fn default_interval_ms() -> u64 {
    2_000
}

fn default_value_max() -> f64 {
    1_000.0
}

fn default_channel_capacity() -> usize {
    256
}

fn default_client_buffer() -> usize {
    64
}

fn default_endpoint() -> String {
    "ws://localhost:3001/api/ws".to_string()
}

fn default_max_retry_secs() -> u64 {
    30
}

fn default_max_items() -> usize {
    50
}
