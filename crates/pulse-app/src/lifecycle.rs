//! 라이프사이클 관리.
//!
//! 종료 신호를 `watch` 채널로 모든 모드(serve / watch / demo)에 전파한다.
//! 종료 트리거는 OS 시그널, 데모 타이머, 또는 직접 호출한 `shutdown()`.

use futures::future::select_all;
use std::future::Future;
use std::io;
use std::pin::Pin;
use tokio::sync::watch;
use tracing::{info, warn};

/// 시그널 하나를 기다리는 future. 완료되면 시그널 이름을 돌려준다.
type SignalWait = Pin<Box<dyn Future<Output = &'static str> + Send>>;

/// 등록 결과가 붙은 시그널 소스
type SignalSource = (&'static str, io::Result<SignalWait>);

/// 라이프사이클 관리자
pub struct LifecycleManager {
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl LifecycleManager {
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// 종료 수신기
    ///
    /// 이미 종료 신호가 나간 뒤에 받은 수신기도 `changed()`가 바로 완료된다.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// 종료 신호 발송 (여러 번 불러도 한 번만 기록)
    pub fn shutdown(&self) {
        let first = self
            .shutdown_tx
            .send_if_modified(|stopping| !std::mem::replace(stopping, true));
        if first {
            info!("종료 신호 발송");
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// OS 종료 시그널(SIGINT, SIGTERM)을 기다렸다가 종료 신호 발송
    ///
    /// 일부 핸들러만 등록에 실패하면 남은 시그널을 기다린다. 모두 실패하면
    /// 종료를 트리거하지 않고 다른 경로의 `shutdown()`을 기다린다.
    pub async fn wait_for_signal(&self) {
        self.wait_for_sources(signal_sources()).await;
    }

    async fn wait_for_sources(&self, sources: Vec<SignalSource>) {
        match first_signal(sources).await {
            Some(name) => {
                info!("{name} 수신");
                self.shutdown();
            }
            None => {
                warn!("종료 시그널을 받을 수 없음, 명시적 종료만 대기");
                let mut rx = self.subscribe();
                let _ = rx.wait_for(|stopping| *stopping).await;
            }
        }
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}

/// 등록된 소스 중 가장 먼저 도착한 시그널. 등록된 소스가 없으면 `None`.
async fn first_signal(sources: Vec<SignalSource>) -> Option<&'static str> {
    let mut waits = Vec::with_capacity(sources.len());
    for (name, source) in sources {
        match source {
            Ok(wait) => waits.push(wait),
            Err(e) => warn!("{name} 핸들러 등록 실패: {e}"),
        }
    }
    if waits.is_empty() {
        return None;
    }
    let (name, _, _) = select_all(waits).await;
    Some(name)
}

/// Ctrl+C 대기. 등록 실패는 await 시점에 드러나므로 그때부터 영원히 대기한다.
fn ctrl_c_source() -> SignalSource {
    let wait: SignalWait = Box::pin(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "SIGINT",
            Err(e) => {
                warn!("SIGINT 핸들러 등록 실패: {e}");
                std::future::pending().await
            }
        }
    });
    ("SIGINT", Ok(wait))
}

#[cfg(unix)]
fn signal_sources() -> Vec<SignalSource> {
    use tokio::signal::unix::{signal, SignalKind};

    let sigterm = signal(SignalKind::terminate()).map(|mut stream| {
        Box::pin(async move {
            stream.recv().await;
            "SIGTERM"
        }) as SignalWait
    });
    vec![ctrl_c_source(), ("SIGTERM", sigterm)]
}

#[cfg(not(unix))]
fn signal_sources() -> Vec<SignalSource> {
    vec![ctrl_c_source()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn ready(name: &'static str) -> SignalSource {
        (name, Ok(Box::pin(async move { name }) as SignalWait))
    }

    fn failed(name: &'static str) -> SignalSource {
        (name, Err(io::Error::other("등록 불가")))
    }

    #[tokio::test]
    async fn late_subscriber_still_sees_shutdown() {
        let lm = LifecycleManager::new();
        lm.shutdown();
        let mut rx = lm.subscribe();
        tokio::time::timeout(Duration::from_secs(1), rx.changed())
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn shutdown_is_broadcast_once() {
        let lm = LifecycleManager::new();
        let mut rx = lm.subscribe();
        assert!(!lm.is_shutting_down());

        lm.shutdown();
        assert!(rx.has_changed().unwrap());
        assert!(*rx.borrow_and_update());

        lm.shutdown();
        assert!(!rx.has_changed().unwrap());
        assert!(lm.is_shutting_down());
    }

    #[tokio::test]
    async fn failed_source_falls_back_to_remaining_one() {
        let name = first_signal(vec![failed("SIGTERM"), ready("SIGINT")]).await;
        assert_eq!(name, Some("SIGINT"));
    }

    #[tokio::test]
    async fn no_registered_source_yields_none() {
        assert_eq!(first_signal(vec![failed("SIGINT"), failed("SIGTERM")]).await, None);
    }

    #[tokio::test]
    async fn delivered_signal_triggers_shutdown() {
        let lm = LifecycleManager::new();
        lm.wait_for_sources(vec![failed("SIGTERM"), ready("SIGINT")]).await;
        assert!(lm.is_shutting_down());
    }

    #[tokio::test]
    async fn registration_failure_does_not_stop_the_app() {
        let lm = Arc::new(LifecycleManager::new());
        let waiter = {
            let lm = lm.clone();
            tokio::spawn(async move {
                lm.wait_for_sources(vec![failed("SIGINT"), failed("SIGTERM")])
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!lm.is_shutting_down());
        assert!(!waiter.is_finished());

        lm.shutdown();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
