//! 회원 디렉토리 포트.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::member::{ContractInstance, MemberProfile};

/// 회원 프로필/계약 조회
///
/// 두 호출은 독립적이다 — 보강 엔진은 가능하면 동시에 호출한다.
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    /// 회원 프로필 조회. 미등록 회원은 `Ok(None)`.
    async fn fetch_profile(&self, member_id: &str) -> Result<Option<MemberProfile>, CoreError>;

    /// 회원의 계약 인스턴스 목록 조회 (0개 이상).
    async fn fetch_active_contracts(
        &self,
        member_id: &str,
    ) -> Result<Vec<ContractInstance>, CoreError>;
}
