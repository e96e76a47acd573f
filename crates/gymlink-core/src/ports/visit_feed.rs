//! 방문 피드 포트.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CoreError;
use crate::models::visit::VisitEvent;

/// 업스트림 방문(체크인) 피드
///
/// 폴러는 `since` 이후의 이벤트만 조회한다 (exclusive lower bound).
/// 스케줄러의 집계 잡은 `until`로 닫힌 창을 지정한다.
#[async_trait]
pub trait VisitFeed: Send + Sync {
    /// `since` 이후(`check_in_time > since`)의 방문 이벤트 조회.
    ///
    /// 쓰로틀링 응답은 `CoreError::RateLimit`으로 구분해서 반환해야 한다.
    async fn fetch_visits(
        &self,
        since: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
        limit: Option<u32>,
    ) -> Result<Vec<VisitEvent>, CoreError>;
}
