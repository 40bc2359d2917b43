//! # pulse-client
//!
//! 실시간 메트릭 클라이언트.
//!
//! - [`ws_channel`], [`sse_channel`]: 서버 스트림에 붙는 `EventChannel` 구현
//!   (자동 재연결 + exponential backoff)
//! - [`registry`]: 채널 이벤트를 로컬 구독자들에게 나눠주는 레지스트리
//! - [`session`]: 채널 + 레지스트리 + 스냅샷을 묶은 클라이언트 세션
//! - [`notifications`]: 이벤트 기반 알림 피드

pub mod notifications;
pub mod registry;
mod remote;
pub mod session;
pub mod sse_channel;
pub mod ws_channel;

pub use notifications::{Notification, NotificationFeed, NotificationFilter, NotificationLevel};
pub use registry::{Subscriber, SubscriptionId, SubscriptionRegistry};
pub use remote::RetryPolicy;
pub use session::ClientSession;
pub use sse_channel::SseEventChannel;
pub use ws_channel::WsEventChannel;
