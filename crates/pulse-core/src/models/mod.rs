//! Pulse 도메인 모델.
//!
//! 서버-클라이언트 간 공유하는 메트릭/이벤트/스냅샷 구조체를 정의한다.
//! 모든 모델은 `serde` Serialize/Deserialize를 구현한다.

pub mod analytics;
pub mod event;
pub mod metric;
pub mod snapshot;
