//! 회원 상태 보강 엔진.
//!
//! 체크인한 회원의 프로필/계약을 조회해 생일·신규·계약 만료 임박 플래그를 도출한다.
//! 어떤 협력자 실패도 해당 조건의 강등으로 끝난다 — 보강 자체는 실패하지 않는다.

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use chrono_tz::Tz;
use gymlink_core::config::EnrichmentConfig;
use gymlink_core::models::member::ContractInstance;
use gymlink_core::models::status::MemberStatus;
use gymlink_core::ports::MemberDirectory;
use gymlink_core::time;
use tracing::{debug, warn};

/// 상태 보강 엔진
///
/// 프로필과 계약 조회는 독립이므로 동시에 실행한다.
pub struct StatusEnricher {
    directory: Arc<dyn MemberDirectory>,
    tz: Tz,
    config: EnrichmentConfig,
}

impl StatusEnricher {
    /// 새 보강 엔진 생성
    pub fn new(directory: Arc<dyn MemberDirectory>, tz: Tz, config: EnrichmentConfig) -> Self {
        Self {
            directory,
            tz,
            config,
        }
    }

    /// 회원 상태 도출. 절대 에러를 반환하지 않는다.
    ///
    /// 프로필 조회가 완전히 실패하면 표시 이름은 원시 식별자를 담은 대체 문자열이 된다.
    pub async fn derive_status(&self, member_id: &str, now: DateTime<Utc>) -> MemberStatus {
        let (profile, contracts) = tokio::join!(
            self.directory.fetch_profile(member_id),
            self.directory.fetch_active_contracts(member_id),
        );

        let mut status = MemberStatus::placeholder(member_id);

        match profile {
            Ok(Some(profile)) => {
                status.display_name = profile.display_name();
                status.is_birthday = profile
                    .birth_date
                    .map(|birth| time::is_birthday(self.tz, birth, now))
                    .unwrap_or(false);
                status.is_new_member = profile
                    .registration_time
                    .map(|registered| {
                        now - registered < ChronoDuration::days(self.config.new_member_days)
                    })
                    .unwrap_or(false);
            }
            Ok(None) => debug!("프로필 미발견: member_id={member_id}"),
            Err(e) => warn!("프로필 조회 실패: member_id={member_id}: {e}"),
        }

        match contracts {
            Ok(list) => status.expiring_contract_end = self.expiring_contract(&list, now),
            Err(e) => warn!("계약 조회 실패: member_id={member_id}: {e}"),
        }

        status
    }

    /// 만료 임박 계약 선택: 활성이고, 종료 시각이 `(now, now + 창]` 안이며,
    /// 회원권 이름이 제외 목록에 없는 첫 번째 계약 (협력자 반환 순서).
    fn expiring_contract(
        &self,
        contracts: &[ContractInstance],
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let window = ChronoDuration::days(self.config.contract_expiry_days);
        contracts
            .iter()
            .find(|contract| {
                contract.active
                    && contract
                        .contract_end_time
                        .map(|end| now < end && end <= now + window)
                        .unwrap_or(false)
                    && !self
                        .config
                        .excluded_memberships
                        .iter()
                        .any(|name| name == &contract.membership_name)
            })
            .and_then(|contract| contract.contract_end_time)
    }
}
