//! 알림 포맷터 & 디스패처.
//!
//! 체크인 한 건을 `<플래그 접두><HH:MM> - <이름>` 한 줄로 조립해 다운스트림에 전달한다.
//! 체크인 경로는 전송 실패를 경계 밖으로 던지지 않는다 — 로그와 결과 enum으로 끝.
//! 리포트 경로는 일일 잡의 플래그 판정을 위해 Result를 그대로 돌려준다.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use gymlink_core::error::CoreError;
use gymlink_core::models::status::MemberStatus;
use gymlink_core::models::visit::AccessState;
use gymlink_core::ports::Notifier;
use gymlink_core::time;
use tracing::{info, warn};

/// 전송 결과 — 체크인 경로 전용
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// 전송 성공 (엔드포인트 미설정 no-op 포함)
    Delivered,
    /// 전송 실패 — 로그 후 폐기, 재시도 없음
    Failed,
    /// 다운스트림 쓰로틀링 — 호출자가 가드를 발동할 수 있게 구분
    Throttled,
}

/// 알림 포맷터 & 디스패처
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    tz: Tz,
}

impl NotificationDispatcher {
    /// 새 디스패처 생성
    pub fn new(notifier: Arc<dyn Notifier>, tz: Tz) -> Self {
        Self { notifier, tz }
    }

    /// 체크인 태그 조립: `[X][B][E][N]` 고정 순서 접두 + `HH:MM - 이름`.
    ///
    /// `[X]`는 출입이 허용되지 않은 경우 (거부/불명 모두).
    pub fn format_checkin_tag(
        &self,
        status: &MemberStatus,
        access: AccessState,
        check_in: DateTime<Utc>,
    ) -> String {
        let mut prefix = String::new();
        if !access.is_granted() {
            prefix.push_str("[X]");
        }
        if status.is_birthday {
            prefix.push_str("[B]");
        }
        if status.has_expiring_contract() {
            prefix.push_str("[E]");
        }
        if status.is_new_member {
            prefix.push_str("[N]");
        }

        format!(
            "{prefix}{} - {}",
            time::format_hhmm(self.tz, check_in),
            status.display_name
        )
    }

    /// 체크인 한 건 전송. 실패는 삼키고 결과만 보고한다.
    pub async fn dispatch_checkin(
        &self,
        status: &MemberStatus,
        access: AccessState,
        check_in: DateTime<Utc>,
    ) -> DeliveryOutcome {
        let tag = self.format_checkin_tag(status, access, check_in);

        match self.notifier.deliver(&tag, Some(check_in)).await {
            Ok(()) => {
                info!("체크인 알림 전송: {tag}");
                DeliveryOutcome::Delivered
            }
            Err(e) if e.is_throttled() => {
                warn!("체크인 알림 쓰로틀링: {tag}: {e}");
                DeliveryOutcome::Throttled
            }
            Err(e) => {
                warn!("체크인 알림 전송 실패 (폐기): {tag}: {e}");
                DeliveryOutcome::Failed
            }
        }
    }

    /// 리포트/집계 텍스트 전송 — 일일 잡 경로.
    /// 실패를 그대로 반환해 잡이 플래그를 세우지 않게 한다.
    pub async fn deliver_report(&self, text: &str) -> Result<(), CoreError> {
        self.notifier.deliver(text, None).await?;
        info!("리포트 전송: {text}");
        Ok(())
    }
}
