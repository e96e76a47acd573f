//! GYMLINK 핵심 에러 타입.
//!
//! 모든 어댑터 crate는 자체 실패를 `CoreError`로 매핑해서 반환한다.

use thiserror::Error;

/// 코어 레이어 에러.
/// 네트워크, 설정, 유효성 검증 등 도메인 공통 에러를 정의한다.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패 — {field}: {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 리소스를 찾을 수 없음
    #[error("{resource_type} 미발견: {id}")]
    NotFound {
        /// 리소스 종류 (예: "Member", "Visit")
        resource_type: String,
        /// 리소스 식별자
        id: String,
    },

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),

    /// 네트워크 에러 (연결 실패, 타임아웃)
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// Rate Limit 초과 (429)
    #[error("요청 한도 초과, {retry_after_secs}초 후 재시도")]
    RateLimit {
        /// 재시도 대기 시간 (초)
        retry_after_secs: u64,
    },

    /// 서비스 일시 불가 (503)
    #[error("서비스 일시 불가: {0}")]
    ServiceUnavailable(String),
}

impl CoreError {
    /// 업스트림 쓰로틀링 신호인지 판별.
    /// 폴러는 이 신호로 Rate-Limit Guard 쿨다운을 발동한다.
    pub fn is_throttled(&self) -> bool {
        matches!(self, CoreError::RateLimit { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttled_classification() {
        assert!(CoreError::RateLimit {
            retry_after_secs: 600
        }
        .is_throttled());
        assert!(!CoreError::Network("timeout".to_string()).is_throttled());
        assert!(!CoreError::ServiceUnavailable("down".to_string()).is_throttled());
    }

    #[test]
    fn error_display_contains_context() {
        let err = CoreError::NotFound {
            resource_type: "Member".to_string(),
            id: "m_77".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("Member"));
        assert!(msg.contains("m_77"));
    }
}
