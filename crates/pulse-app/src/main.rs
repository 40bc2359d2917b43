//! # pulse-app
//!
//! Pulse 실행 파일 진입점.
//! 설정 로드, tracing 초기화, 모드별 와이어링(serve / watch / demo), 라이프사이클 관리.

mod lifecycle;
mod settings;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pulse_client::{
    ClientSession, NotificationFeed, RetryPolicy, SseEventChannel, WsEventChannel,
};
use pulse_core::config::{AppConfig, Transport};
use pulse_core::models::snapshot::MetricSnapshot;
use pulse_core::ports::channel::{ConnectionState, EventChannel};
use pulse_server::{
    AnalyticsCatalog, EventHub, MetricEmitter, PlaceholderAnalytics, WebServer,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::lifecycle::LifecycleManager;

/// Pulse 실시간 메트릭 대시보드 코어
#[derive(Parser, Debug)]
#[command(name = "pulse")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 설정 파일 경로 (TOML/JSON, 기본: 플랫폼 설정 디렉토리의 config.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 이미터 + 푸시 서버 실행
    Serve {
        /// 서버 포트
        #[arg(long, short = 'p')]
        port: Option<u16>,
        /// 이미터 틱 간격 (밀리초)
        #[arg(long)]
        interval_ms: Option<u64>,
        /// 외부 접근 허용 (0.0.0.0 바인드)
        #[arg(long)]
        allow_external: bool,
    },
    /// 원격 서버에 붙어 스냅샷 변화를 출력
    Watch {
        /// 푸시 엔드포인트 URL
        #[arg(long, short = 'e')]
        endpoint: Option<String>,
        /// 연결 방식
        #[arg(long, short = 't', value_enum)]
        transport: Option<TransportArg>,
        /// 끊겨도 재연결하지 않음
        #[arg(long)]
        no_reconnect: bool,
    },
    /// 소켓 없이 프로세스 내에서 이미터와 세션을 바로 연결
    Demo {
        /// 이미터 틱 간격 (밀리초)
        #[arg(long)]
        interval_ms: Option<u64>,
        /// 지정한 초가 지나면 종료 (기본: 시그널까지)
        #[arg(long)]
        duration_secs: Option<u64>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TransportArg {
    Ws,
    Sse,
}

impl From<TransportArg> for Transport {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Ws => Transport::Ws,
            TransportArg::Sse => Transport::Sse,
        }
    }
}

/// CLI 인자로 설정 오버라이드
fn apply_overrides(config: &mut AppConfig, command: &Command) {
    match command {
        Command::Serve {
            port,
            interval_ms,
            allow_external,
        } => {
            if let Some(port) = port {
                config.server.port = *port;
            }
            if let Some(interval_ms) = interval_ms {
                config.emitter.interval_ms = *interval_ms;
            }
            if *allow_external {
                config.server.allow_external = true;
            }
        }
        Command::Watch {
            endpoint,
            transport,
            no_reconnect,
        } => {
            if let Some(endpoint) = endpoint {
                config.client.endpoint = endpoint.clone();
            }
            if let Some(transport) = transport {
                config.client.transport = (*transport).into();
            }
            if *no_reconnect {
                config.client.reconnect = false;
            }
        }
        Command::Demo { interval_ms, .. } => {
            if let Some(interval_ms) = interval_ms {
                config.emitter.interval_ms = *interval_ms;
            }
        }
    }
}

/// 스냅샷 한 줄 요약
fn format_snapshot(snapshot: &MetricSnapshot) -> String {
    snapshot
        .iter()
        .map(|(key, data)| format!("{key}={} ({:+.1}%)", data.value, data.change))
        .collect::<Vec<_>>()
        .join("  ")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // tracing 초기화
    let log_filter = format!(
        "pulse={},pulse_app={},pulse_core={},pulse_server={},pulse_client={},tower_http={}",
        args.log_level, args.log_level, args.log_level, args.log_level, args.log_level, args.log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();

    // 설정 로드 + CLI 오버라이드
    let mut config = settings::load(args.config.as_deref())?;
    apply_overrides(&mut config, &args.command);
    config
        .validate()
        .map_err(|e| anyhow!("설정 검증 실패: {e}"))?;

    let lifecycle = Arc::new(LifecycleManager::new());

    match args.command {
        Command::Serve { .. } => run_serve(config, lifecycle).await,
        Command::Watch { .. } => run_watch(config, lifecycle).await,
        Command::Demo { duration_secs, .. } => {
            run_demo(config, lifecycle, duration_secs.map(Duration::from_secs)).await
        }
    }
}

/// 서버 모드: 허브 + 이미터 + 웹 서버
async fn run_serve(config: AppConfig, lifecycle: Arc<LifecycleManager>) -> Result<()> {
    info!("Pulse 서버 시작");

    let hub = Arc::new(EventHub::new(config.channel.capacity));
    let emitter = Arc::new(MetricEmitter::new(config.emitter.clone(), hub.clone()));
    emitter.start();

    let catalog = AnalyticsCatalog::new(
        Arc::new(PlaceholderAnalytics),
        config.server.analytics_cache(),
    );
    let server = WebServer::new(hub, config.server.clone())
        .with_emitter(emitter.clone())
        .with_analytics(Arc::new(catalog))
        .with_client_buffer(config.channel.client_buffer);
    info!("대시보드 엔드포인트: {}/api/stream, {}/api/ws", server.url(), server.url());

    let shutdown_rx = lifecycle.subscribe();
    let server_task = tokio::spawn(server.run(shutdown_rx));

    let signal_lifecycle = lifecycle.clone();
    tokio::spawn(async move { signal_lifecycle.wait_for_signal().await });

    match server_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("웹 서버 에러: {e}"),
        Err(e) => error!("웹 서버 태스크 실패: {e}"),
    }

    emitter.stop();
    info!("Pulse 서버 종료");
    Ok(())
}

/// 감시 모드: 원격 서버 세션
async fn run_watch(config: AppConfig, lifecycle: Arc<LifecycleManager>) -> Result<()> {
    let policy = RetryPolicy::from(&config.client);
    let channel: Arc<dyn EventChannel> = match config.client.transport {
        Transport::Ws => Arc::new(WsEventChannel::new(&config.client.endpoint, policy)),
        Transport::Sse => Arc::new(SseEventChannel::new(&config.client.endpoint, policy)),
    };
    info!(
        "원격 감시 시작: {} ({:?})",
        config.client.endpoint, config.client.transport
    );

    let session = ClientSession::open(channel, "pulse-watch")?;
    observe_session(&session, &config, lifecycle).await;
    Ok(())
}

/// 데모 모드: 소켓 없이 허브에 직접 연결
async fn run_demo(
    config: AppConfig,
    lifecycle: Arc<LifecycleManager>,
    duration: Option<Duration>,
) -> Result<()> {
    info!("데모 모드: 프로세스 내 이미터");

    let hub = Arc::new(EventHub::new(config.channel.capacity));
    let emitter = MetricEmitter::new(config.emitter.clone(), hub.clone());
    let session = ClientSession::open(hub, "pulse-demo")?;
    emitter.start();

    if let Some(duration) = duration {
        let timer_lifecycle = lifecycle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            timer_lifecycle.shutdown();
        });
    }

    observe_session(&session, &config, lifecycle).await;
    emitter.stop();
    Ok(())
}

/// 세션의 스냅샷/연결 상태 변화를 종료 신호까지 출력
async fn observe_session(
    session: &ClientSession,
    config: &AppConfig,
    lifecycle: Arc<LifecycleManager>,
) {
    let feed = NotificationFeed::new(config.notification.clone());
    feed.attach(session.registry());

    let mut snapshots = session.watch_snapshot();
    let mut states = session.watch_state();
    let mut shutdown_rx: watch::Receiver<bool> = lifecycle.subscribe();

    let signal_lifecycle = lifecycle.clone();
    tokio::spawn(async move { signal_lifecycle.wait_for_signal().await });

    println!("{}", format_snapshot(&snapshots.borrow_and_update()));

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let line = format_snapshot(&snapshots.borrow_and_update());
                println!("{line}");
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                match state {
                    ConnectionState::Connected => info!("연결됨"),
                    ConnectionState::Reconnecting => warn!("연결 끊김, 재연결 중"),
                    ConnectionState::Disconnected => {
                        warn!("연결 종료");
                        break;
                    }
                    ConnectionState::Connecting => {}
                }
            }
            _ = shutdown_rx.changed() => break,
        }
        if lifecycle.is_shutting_down() {
            break;
        }
    }

    session.close();
    info!(
        "세션 종료 (읽지 않은 알림 {}개)",
        feed.unread_count()
    );
}
