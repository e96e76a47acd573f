//! 2-루프 러너.
//!
//! 폴링(기본 120초), 일일 스케줄 체크(60초) 오케스트레이션.
//! 두 루프는 독립 타이머로 돌고 조율되지 않는다 — 공유 상태는 각 엔진이 소유.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use gymlink_engine::daily::DailyScheduler;
use gymlink_engine::poller::VisitPoller;
use tracing::info;

/// 2-루프 러너
pub struct Runner {
    poller: Arc<VisitPoller>,
    scheduler: Arc<DailyScheduler>,
    poll_interval: Duration,
    check_interval: Duration,
}

impl Runner {
    /// 새 러너 생성
    pub fn new(
        poller: Arc<VisitPoller>,
        scheduler: Arc<DailyScheduler>,
        poll_interval: Duration,
        check_interval: Duration,
    ) -> Self {
        Self {
            poller,
            scheduler,
            poll_interval,
            check_interval,
        }
    }

    /// 모든 루프 시작, 종료 신호까지 대기
    pub async fn run(&self, mut shutdown_rx: tokio::sync::watch::Receiver<bool>) {
        info!(
            "러너 시작: 폴링={}ms, 스케줄 체크={}ms",
            self.poll_interval.as_millis(),
            self.check_interval.as_millis(),
        );

        // ============================================================
        // 1. 폴링 루프
        // ============================================================
        let poller = self.poller.clone();
        let poll_interval = self.poll_interval;
        let mut shutdown1 = shutdown_rx.clone();

        let poll_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll_interval);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        poller.poll().await;
                    }
                    _ = shutdown1.changed() => {
                        info!("폴링 루프 종료");
                        break;
                    }
                }
            }
        });

        // ============================================================
        // 2. 일일 스케줄 체크 루프
        // ============================================================
        let scheduler = self.scheduler.clone();
        let check_interval = self.check_interval;
        let mut shutdown2 = shutdown_rx.clone();

        let tick_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(check_interval);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        scheduler.tick(Utc::now()).await;
                    }
                    _ = shutdown2.changed() => {
                        info!("스케줄 체크 루프 종료");
                        break;
                    }
                }
            }
        });

        // ============================================================
        // 종료 대기
        // ============================================================
        let _ = shutdown_rx.changed().await;
        let _ = tokio::join!(poll_task, tick_task);
    }
}
