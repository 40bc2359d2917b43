//! API 핸들러 모듈.

pub mod health;
pub mod metrics;
pub mod stream;
pub mod ws;

/// 클라이언트 ID 생성 (연결마다 하나)
pub(crate) fn connection_id(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_ids_are_unique_and_prefixed() {
        let a = connection_id("sse");
        let b = connection_id("sse");
        assert!(a.starts_with("sse-"));
        assert_ne!(a, b);
    }
}
