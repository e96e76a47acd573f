//! 다운스트림 알림 포트.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CoreError;

/// 다운스트림 알림 엔드포인트 (스마트홈 웹훅)
///
/// 전송은 멱등적 GET. 엔드포인트 미설정은 구현체가 무시(no-op)로 처리하고,
/// 쓰로틀링 실패는 `CoreError::RateLimit`으로 구분한다.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// 텍스트 한 줄을 전달한다. `correlation`은 다운스트림 상관용 원본 이벤트 시각.
    async fn deliver(
        &self,
        text: &str,
        correlation: Option<DateTime<Utc>>,
    ) -> Result<(), CoreError>;
}
