//! 보강 결과 모델.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 회원 상태 — Status Enrichment Engine의 출력
///
/// 어떤 조건도 실패 시 false/absent로 강등될 뿐, 보강 자체는 실패하지 않는다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberStatus {
    /// 표시용 이름. 프로필 조회가 완전히 실패하면 원시 식별자를 담은 대체 문자열.
    pub display_name: String,
    /// 오늘(civil timezone 기준)이 생일인지 — 연도 무시
    pub is_birthday: bool,
    /// 등록 30일 이내의 신규 회원인지
    pub is_new_member: bool,
    /// 4주 내 만료 예정인 활성 계약의 종료 시각 (존재 여부만 의미 있음)
    pub expiring_contract_end: Option<DateTime<Utc>>,
}

impl MemberStatus {
    /// 프로필 조회 실패 시의 대체 상태.
    pub fn placeholder(member_id: &str) -> Self {
        Self {
            display_name: format!("Member {member_id}"),
            is_birthday: false,
            is_new_member: false,
            expiring_contract_end: None,
        }
    }

    /// 만료 임박 계약 보유 여부.
    pub fn has_expiring_contract(&self) -> bool {
        self.expiring_contract_end.is_some()
    }
}
