//! 회원 프로필/계약 모델.
//!
//! 보강(enrichment) 호출마다 협력자 스냅샷을 새로 조회한다 — 캐싱 없음.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// 회원 프로필
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberProfile {
    /// 회원 식별자
    pub member_id: String,
    /// 이름
    pub first_name: String,
    /// 성 (피드에 없을 수 있음)
    pub last_name: Option<String>,
    /// 생일 — 연도는 의미 없음, 월/일만 비교
    pub birth_date: Option<NaiveDate>,
    /// 등록 시각 (피드에 없을 수 있음)
    pub registration_time: Option<DateTime<Utc>>,
}

impl MemberProfile {
    /// 표시용 이름: "이름 성", 성이 없으면 이름만.
    pub fn display_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }
}

/// 회원권 계약 인스턴스
///
/// 회원당 0개 이상. 만료 판정에는 `active`이면서 종료 시각이 있는 것만 쓰인다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractInstance {
    /// 회원권 이름 (만료 알림 제외 목록과 비교)
    pub membership_name: String,
    /// 계약 종료 시각
    pub contract_end_time: Option<DateTime<Utc>>,
    /// 활성 여부
    pub active: bool,
}
