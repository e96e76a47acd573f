//! 방문(체크인) 이벤트 모델.
//!
//! 업스트림 방문 피드가 생산하는 불변 이벤트. 정렬 키는 `check_in_time`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 출입 허용 상태 (tri-state)
///
/// 업스트림이 출입 결과를 명시하지 않으면 `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessState {
    /// 출입 허용
    Allowed,
    /// 출입 거부 (또는 단말 오류 코드 동반)
    Denied,
    /// 판단 불가 (피드에 필드 없음)
    Unknown,
}

impl AccessState {
    /// 출입이 정상 허용된 체크인인지 여부.
    /// `Denied`와 `Unknown` 모두 알림 태그에 `[X]` 접두가 붙는다.
    pub fn is_granted(self) -> bool {
        self == AccessState::Allowed
    }
}

/// 방문(체크인) 이벤트
///
/// 워터마크 전진 단위로 한 번만 소비된다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitEvent {
    /// 회원 식별자
    pub member_id: String,
    /// 체크인 시각
    pub check_in_time: DateTime<Utc>,
    /// 출입 허용 상태
    pub access: AccessState,
}

impl VisitEvent {
    /// 타임스탬프가 유효한 이벤트인지 여부.
    /// 결측/0 타임스탬프는 폴러에서 방어적으로 걸러낸다.
    pub fn has_valid_timestamp(&self) -> bool {
        self.check_in_time.timestamp() > 0
    }
}
