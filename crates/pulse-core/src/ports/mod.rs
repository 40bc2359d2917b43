//! 포트 인터페이스 (trait).
//!
//! 각 어댑터 crate가 이 trait들을 구현하며,
//! `pulse-app`에서 `Arc<dyn T>`로 와이어링한다.
//!
//! 전달 경로는 콜백 기반이므로 모든 포트는 동기 trait이다.
//! 비동기 작업(소켓 읽기 등)은 구현체가 내부 태스크로 소유한다.

pub mod analytics;
pub mod channel;
pub mod derivation;
