//! 워터마크 기반 증분 폴러.
//!
//! 워터마크 이후의 체크인만 조회해 보강·전송하고, 처리를 확인한 이벤트까지만
//! 워터마크를 전진시킨다. 볼륨 스파이크는 백로그로 간주해 알림 없이 건너뛴다.
//! `poll()`은 재진입 불가(in-flight 플래그), 경계 밖으로 아무것도 던지지 않는다.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use gymlink_core::models::visit::VisitEvent;
use gymlink_core::ports::VisitFeed;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::dispatch::{DeliveryOutcome, NotificationDispatcher};
use crate::enrichment::StatusEnricher;
use crate::guard::RateLimitGuard;

/// 폴러 동작 파라미터
#[derive(Debug, Clone)]
pub struct PollerSettings {
    /// 볼륨 스파이크 임계값 — 초과 배치는 알림 없이 워터마크만 전진
    pub spike_threshold: usize,
    /// 이벤트 간 지연 — 업스트림 rate limit 보호
    pub inter_event_delay: Duration,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            spike_threshold: 10,
            inter_event_delay: Duration::from_millis(500),
        }
    }
}

/// 증분 폴러
///
/// 워터마크는 프로세스 시작 시각으로 초기화되며 절대 뒤로 가지 않는다.
/// 이전 실행의 워터마크를 복원하지 않는다 — 인메모리 전용.
pub struct VisitPoller {
    feed: Arc<dyn VisitFeed>,
    enricher: Arc<StatusEnricher>,
    dispatcher: Arc<NotificationDispatcher>,
    guard: Arc<RateLimitGuard>,
    settings: PollerSettings,
    /// 마지막으로 완전히 처리한 이벤트의 시각 (exclusive lower bound)
    watermark: Mutex<DateTime<Utc>>,
    /// 사이클 상호 배제 플래그
    in_flight: AtomicBool,
}

impl VisitPoller {
    /// 새 폴러 생성. 워터마크는 "지금"으로 초기화된다.
    pub fn new(
        feed: Arc<dyn VisitFeed>,
        enricher: Arc<StatusEnricher>,
        dispatcher: Arc<NotificationDispatcher>,
        guard: Arc<RateLimitGuard>,
        settings: PollerSettings,
    ) -> Self {
        Self {
            feed,
            enricher,
            dispatcher,
            guard,
            settings,
            watermark: Mutex::new(Utc::now()),
            in_flight: AtomicBool::new(false),
        }
    }

    /// 워터마크를 지정 시각으로 설정 (테스트/재생용)
    pub fn with_watermark(self, watermark: DateTime<Utc>) -> Self {
        *self.watermark.lock() = watermark;
        self
    }

    /// 현재 워터마크
    pub fn watermark(&self) -> DateTime<Utc> {
        *self.watermark.lock()
    }

    /// 워터마크 전진 — 단조 비감소 보장
    fn advance_watermark(&self, to: DateTime<Utc>) {
        let mut watermark = self.watermark.lock();
        if to > *watermark {
            *watermark = to;
        }
    }

    /// 한 사이클 실행.
    ///
    /// 쿨다운 중이거나 이전 사이클이 진행 중이면 즉시 no-op.
    /// 모든 실패는 내부에서 로그로 처리되고 "이번 사이클 무진전"으로 끝난다.
    pub async fn poll(&self) {
        if self.guard.is_cooling_down() {
            debug!("쿨다운 중 — 폴링 사이클 건너뜀");
            return;
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("이전 폴링 사이클 진행 중 — 건너뜀");
            return;
        }

        self.run_cycle().await;
        self.in_flight.store(false, Ordering::SeqCst);
    }

    async fn run_cycle(&self) {
        let since = self.watermark();

        let fetched = match self.feed.fetch_visits(since, None, None).await {
            Ok(visits) => visits,
            Err(e) if e.is_throttled() => {
                self.guard.trip();
                return;
            }
            Err(e) => {
                warn!("방문 피드 조회 실패: {e}");
                return;
            }
        };

        // 결측/0 타임스탬프 방어 필터
        let mut events: Vec<VisitEvent> = fetched
            .into_iter()
            .filter(VisitEvent::has_valid_timestamp)
            .collect();

        if events.is_empty() {
            debug!("신규 체크인 없음 (watermark={since})");
            return;
        }

        // 볼륨 스파이크 가드: 임계값 초과 배치는 다운타임 이후 백로그 덤프로 간주.
        // 알림 없이 가장 최신 시각까지 워터마크만 전진시킨다.
        if events.len() > self.settings.spike_threshold {
            if let Some(newest) = events.iter().map(|v| v.check_in_time).max() {
                warn!(
                    "볼륨 스파이크: {}건 > 임계값 {} — 알림 생략, 워터마크 {newest}로 전진",
                    events.len(),
                    self.settings.spike_threshold
                );
                self.advance_watermark(newest);
            }
            return;
        }

        // 워터마크 경계는 strict `>` — 정확히 워터마크인 이벤트는 이미 처리된 것
        events.retain(|v| v.check_in_time > since);
        // 알림 순서 = 실제 체크인 순서 (오래된 것부터)
        events.sort_by_key(|v| v.check_in_time);

        for (index, visit) in events.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.settings.inter_event_delay).await;
            }

            let now = Utc::now();
            let status = self.enricher.derive_status(&visit.member_id, now).await;
            let outcome = self
                .dispatcher
                .dispatch_checkin(&status, visit.access, visit.check_in_time)
                .await;

            if outcome == DeliveryOutcome::Throttled {
                self.guard.trip();
            }

            // 성공이든 개별 실패든 워터마크는 전진한다 — 실패 이벤트는 재시도 없이 폐기
            self.advance_watermark(visit.check_in_time);
        }
    }
}
