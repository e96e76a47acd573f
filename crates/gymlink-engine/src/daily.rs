//! 일일 집계 스케줄러.
//!
//! 고정 주기(기본 60초)로 civil timezone의 time-of-day를 검사해 두 잡을 구동한다:
//! 일일 고유 방문 총원(23:59), 전일 계약 만료 리포트(09:00). 각 잡은 하루 한 번
//! 게이트로 보호되고, 리포트는 회원별 7일 재포함 쿨다운 캐시를 따로 가진다.
//! Rate-Limit Guard와는 의도적으로 독립이다 — 레퍼런스 동작 보존.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use chrono_tz::Tz;
use gymlink_core::config::DailyConfig;
use gymlink_core::error::CoreError;
use gymlink_core::models::visit::VisitEvent;
use gymlink_core::ports::VisitFeed;
use gymlink_core::time;
use tracing::{debug, info, warn};

use crate::dispatch::NotificationDispatcher;
use crate::enrichment::StatusEnricher;

/// 하루 한 번 게이트
#[derive(Debug, Default)]
struct DailyGates {
    /// 오늘 총원 알림을 이미 보냈는지
    total_sent: bool,
    /// 오늘 만료 리포트를 이미 보냈는지
    report_sent: bool,
    /// 마지막으로 게이트를 리셋한 로컬 날짜 — 하루 한 번만 리셋
    last_reset_day: Option<NaiveDate>,
}

/// 일일 집계 스케줄러
pub struct DailyScheduler {
    feed: Arc<dyn VisitFeed>,
    enricher: Arc<StatusEnricher>,
    dispatcher: Arc<NotificationDispatcher>,
    tz: Tz,
    config: DailyConfig,
    gates: parking_lot::Mutex<DailyGates>,
    /// 리포트 dedup 캐시: member_id -> 마지막 포함 시각
    reported: parking_lot::Mutex<HashMap<String, DateTime<Utc>>>,
}

impl DailyScheduler {
    /// 새 스케줄러 생성
    pub fn new(
        feed: Arc<dyn VisitFeed>,
        enricher: Arc<StatusEnricher>,
        dispatcher: Arc<NotificationDispatcher>,
        tz: Tz,
        config: DailyConfig,
    ) -> Self {
        Self {
            feed,
            enricher,
            dispatcher,
            tz,
            config,
            gates: parking_lot::Mutex::new(DailyGates::default()),
            reported: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    /// 주기 체크 한 번: 게이트 리셋 → 총원 잡 → 리포트 잡.
    ///
    /// 잡 실패는 플래그를 세우지 않으므로 트리거 분이 유지되는 동안 자연 재시도된다.
    pub async fn tick(&self, now: DateTime<Utc>) {
        let (hour, minute) = time::local_hour_minute(self.tz, now);
        let today = time::local_day(self.tz, now);

        self.maybe_reset_gates(today, hour, minute);

        if hour == self.config.total_hour
            && minute == self.config.total_minute
            && !self.gates.lock().total_sent
        {
            match self.run_daily_total(now).await {
                Ok(count) => {
                    self.gates.lock().total_sent = true;
                    info!("일일 총원 잡 완료: {count}명");
                }
                Err(e) => warn!("일일 총원 잡 실패 (다음 체크에서 재시도): {e}"),
            }
        }

        if hour == self.config.report_hour
            && minute == self.config.report_minute
            && !self.gates.lock().report_sent
        {
            match self.run_expiry_report(now).await {
                Ok(included) => {
                    self.gates.lock().report_sent = true;
                    info!("만료 리포트 잡 완료: {included}명 포함");
                }
                Err(e) => warn!("만료 리포트 잡 실패 (다음 체크에서 재시도): {e}"),
            }
        }
    }

    /// 자정 직후(00:00–00:01) 창에서, 로컬 날짜당 한 번만 게이트를 리셋한다.
    fn maybe_reset_gates(&self, today: NaiveDate, hour: u32, minute: u32) {
        if hour != 0 || minute > 1 {
            return;
        }
        let mut gates = self.gates.lock();
        if gates.last_reset_day == Some(today) {
            return;
        }
        gates.total_sent = false;
        gates.report_sent = false;
        gates.last_reset_day = Some(today);
        info!("일일 게이트 리셋 ({today})");
    }

    /// 일일 총원 잡: 로컬 자정부터 지금까지의 고유 방문 회원 수를 전송.
    async fn run_daily_total(&self, now: DateTime<Utc>) -> Result<usize, CoreError> {
        let since = time::day_start(self.tz, now);
        let visits = self.feed.fetch_visits(since, Some(now), None).await?;
        let count = distinct_members(&visits).len();

        let text = format!("Daily total: {count} visitors");
        self.dispatcher.deliver_report(&text).await?;
        Ok(count)
    }

    /// 만료 리포트 잡: 전일 방문자 중 계약 만료 임박 회원을 한 문장으로 전송.
    ///
    /// 7일 내 이미 리포트된 회원은 제외. 캐시는 전송 성공 후에만 갱신한다 —
    /// 전송 실패 시 다음 재시도에서 같은 회원이 다시 후보가 되어야 하므로.
    async fn run_expiry_report(&self, now: DateTime<Utc>) -> Result<usize, CoreError> {
        let (start, end) = time::previous_day_range(self.tz, now);
        let visits = self.feed.fetch_visits(start, Some(end), None).await?;
        let members = distinct_members(&visits);
        debug!("전일 방문 회원 {}명 계약 검사", members.len());

        let mut qualifying: Vec<(String, String)> = Vec::new();
        for (index, member_id) in members.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.inter_member_delay()).await;
            }

            let status = self.enricher.derive_status(member_id, now).await;
            if !status.has_expiring_contract() {
                continue;
            }
            if !self.eligible_for_report(member_id, now) {
                debug!("리포트 쿨다운 중 — 제외: member_id={member_id}");
                continue;
            }
            qualifying.push((member_id.clone(), status.display_name));
        }

        let text = if qualifying.is_empty() {
            "No expiring contracts today.".to_string()
        } else {
            let names: Vec<String> = qualifying.iter().map(|(_, name)| name.clone()).collect();
            format!("Contracts expiring soon: {}.", join_names(&names))
        };

        self.dispatcher.deliver_report(&text).await?;

        let mut reported = self.reported.lock();
        for (member_id, _) in &qualifying {
            reported.insert(member_id.clone(), now);
        }
        Ok(qualifying.len())
    }

    /// 수동/테스트 트리거 — 총원 잡을 플래그 저장/복원 하에 실행.
    pub async fn trigger_total_manually(&self, now: DateTime<Utc>) -> Result<usize, CoreError> {
        let saved = self.gates.lock().total_sent;
        let result = self.run_daily_total(now).await;
        self.gates.lock().total_sent = saved;
        result
    }

    /// 수동/테스트 트리거 — 리포트 잡을 플래그 저장/복원 하에 실행.
    pub async fn trigger_report_manually(&self, now: DateTime<Utc>) -> Result<usize, CoreError> {
        let saved = self.gates.lock().report_sent;
        let result = self.run_expiry_report(now).await;
        self.gates.lock().report_sent = saved;
        result
    }

    /// 7일 쿨다운 판정: 리포트된 적 없거나 마지막 포함 후 쿨다운이 지났는지.
    fn eligible_for_report(&self, member_id: &str, now: DateTime<Utc>) -> bool {
        match self.reported.lock().get(member_id) {
            Some(last) => now - *last >= ChronoDuration::days(self.config.report_cooldown_days),
            None => true,
        }
    }

    /// 오늘 총원 알림을 보냈는지 (테스트 관측용)
    pub fn total_sent_today(&self) -> bool {
        self.gates.lock().total_sent
    }

    /// 오늘 리포트를 보냈는지 (테스트 관측용)
    pub fn report_sent_today(&self) -> bool {
        self.gates.lock().report_sent
    }
}

/// 첫 등장 순서를 보존한 고유 회원 목록
fn distinct_members(visits: &[VisitEvent]) -> Vec<String> {
    let mut seen = HashSet::new();
    visits
        .iter()
        .filter(|v| seen.insert(v.member_id.clone()))
        .map(|v| v.member_id.clone())
        .collect()
}

/// "A", "A and B", "A, B and C" 형태로 연결
fn join_names(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [only] => only.clone(),
        [head @ .., last] => format!("{} and {}", head.join(", "), last),
    }
}
