//! # pulse-server
//!
//! 실시간 메트릭 푸시 서버.
//! Axum 기반 SSE/WebSocket 스트림 + 분석 조회 API.
//!
//! ## 구성
//! - `EventHub`: 프로세스 내 이벤트 채널 (`EventChannel` 구현)
//! - `MetricEmitter`: 주기적 `metric_update` 이벤트 소스
//! - `AnalyticsCatalog`: 자리표시자 분석 데이터 + TTL 캐시
//! - `WebServer`: `/api/stream`, `/api/ws`, `/api/health`, `/api/metrics`, `/api/analytics`

pub mod catalog;
pub mod emitter;
pub mod error;
pub mod handlers;
pub mod hub;
pub mod routes;

use axum::http::HeaderValue;
use axum::Router;
use pulse_core::config::{ChannelConfig, ServerConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub use catalog::{AnalyticsCatalog, PlaceholderAnalytics};
pub use emitter::MetricEmitter;
pub use hub::{EventHub, HubSubscription};

/// 포트 바인드 최대 시도 횟수
const MAX_PORT_ATTEMPTS: u16 = 10;

/// 웹 서버 애플리케이션 상태
#[derive(Clone)]
pub struct AppState {
    /// 이벤트 허브
    pub hub: Arc<EventHub>,
    /// 이미터 (헬스 체크 보고용, 없으면 외부에서 발행)
    pub emitter: Option<Arc<MetricEmitter>>,
    /// 분석 카탈로그
    pub catalog: Arc<AnalyticsCatalog>,
    /// 엔드포인트별 전송 큐 크기
    pub client_buffer: usize,
}

/// 실시간 메트릭 웹 서버
pub struct WebServer {
    config: ServerConfig,
    state: AppState,
}

impl WebServer {
    /// 새 웹 서버 생성
    pub fn new(hub: Arc<EventHub>, config: ServerConfig) -> Self {
        Self {
            config,
            state: AppState {
                hub,
                emitter: None,
                catalog: Arc::new(AnalyticsCatalog::default()),
                client_buffer: ChannelConfig::default().client_buffer,
            },
        }
    }

    /// 이미터 설정
    pub fn with_emitter(mut self, emitter: Arc<MetricEmitter>) -> Self {
        self.state.emitter = Some(emitter);
        self
    }

    /// 분석 카탈로그 설정
    pub fn with_analytics(mut self, catalog: Arc<AnalyticsCatalog>) -> Self {
        self.state.catalog = catalog;
        self
    }

    /// 엔드포인트별 전송 큐 크기 설정
    pub fn with_client_buffer(mut self, client_buffer: usize) -> Self {
        self.state.client_buffer = client_buffer.max(1);
        self
    }

    /// 라우터 구성
    pub fn router(&self) -> Router {
        Router::new()
            .nest("/api", routes::api_routes())
            .layer(cors_layer(&self.config.cors_origin))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// 서버 실행
    ///
    /// 기본 포트에서 시작하여, 포트가 이미 사용 중이면 다음 포트를 시도합니다.
    /// 최대 10개 포트를 시도한 후 실패하면 에러를 반환합니다.
    pub async fn run(self, shutdown_rx: watch::Receiver<bool>) -> Result<(), std::io::Error> {
        let host = if self.config.allow_external {
            "0.0.0.0"
        } else {
            "127.0.0.1"
        };

        let base_port = self.config.port;
        let mut last_error = None;

        for attempt in 0..MAX_PORT_ATTEMPTS {
            let port = base_port.saturating_add(attempt);

            // 포트 오버플로우 체크
            if port < base_port && attempt > 0 {
                break;
            }

            let addr: SocketAddr = match format!("{host}:{port}").parse() {
                Ok(a) => a,
                Err(e) => {
                    error!("잘못된 주소 {host}:{port} ({e})");
                    continue;
                }
            };

            match TcpListener::bind(addr).await {
                Ok(listener) => {
                    if attempt > 0 {
                        warn!("포트 {base_port} 사용 불가, 대체 포트 {port} 사용");
                    }
                    return self.run_with_listener(listener, shutdown_rx).await;
                }
                Err(e) => {
                    if e.kind() == std::io::ErrorKind::AddrInUse {
                        warn!("포트 {port} 이미 사용 중, 다음 포트 시도...");
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::AddrInUse,
                format!(
                    "포트 {}-{} 모두 사용 불가",
                    base_port,
                    base_port.saturating_add(MAX_PORT_ATTEMPTS - 1)
                ),
            )
        }))
    }

    /// 이미 바인드된 리스너로 서버 실행
    pub async fn run_with_listener(
        self,
        listener: TcpListener,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> Result<(), std::io::Error> {
        let app = self.router();
        info!("메트릭 푸시 서버 시작: http://{}", listener.local_addr()?);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                loop {
                    if *shutdown_rx.borrow() {
                        info!("웹 서버 종료 신호 수신");
                        break;
                    }
                    if shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
            })
            .await?;

        info!("메트릭 푸시 서버 종료");
        Ok(())
    }

    /// 서버 URL 반환
    pub fn url(&self) -> String {
        format!("http://localhost:{}", self.config.port)
    }
}

/// CORS 레이어 (`*`이면 전체 허용, 아니면 단일 오리진)
fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = if origin == "*" {
        AllowOrigin::any()
    } else {
        match HeaderValue::from_str(origin) {
            Ok(value) => AllowOrigin::exact(value),
            Err(e) => {
                warn!("잘못된 CORS 오리진 '{origin}' ({e}), 전체 허용으로 대체");
                AllowOrigin::any()
            }
        }
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}
