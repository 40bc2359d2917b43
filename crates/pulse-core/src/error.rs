//! Pulse 핵심 에러 타입.
//!
//! 서버/클라이언트 crate는 자체 에러 타입에서 `CoreError`를 래핑하거나 그대로 전파한다.

use thiserror::Error;

/// 코어 레이어 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 여러 필드에 걸친 설정 조합 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패 ({field}): {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 채널 연결/전송 실패
    ///
    /// 전달 루프 밖으로 전파되지 않고 `ConnectionState::Disconnected` 전이로 표면화된다.
    #[error("전송 에러: {0}")]
    Transport(String),

    /// 필수 필드 누락 또는 알 수 없는 메트릭 키
    #[error("잘못된 이벤트: {0}")]
    MalformedEvent(String),

    /// 구독자 콜백 내부 실패
    #[error("구독자 에러: {0}")]
    Subscriber(String),
}

impl CoreError {
    /// 필드 유효성 검증 에러 생성 헬퍼
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display() {
        let err = CoreError::validation("emitter.interval_ms", "0보다 커야 합니다");
        let msg = err.to_string();
        assert!(msg.contains("emitter.interval_ms"));
        assert!(msg.contains("0보다 커야 합니다"));
    }

    #[test]
    fn serde_error_converts() {
        let err: CoreError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, CoreError::Serialization(_)));
    }
}
