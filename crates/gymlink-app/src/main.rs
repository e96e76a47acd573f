//! # gymlink-app
//!
//! GYMLINK 서비스 바이너리 진입점.
//! DI 컨테이너 역할, 설정/로깅 초기화, 타이머 루프 오케스트레이션.

mod runner;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use gymlink_core::config::AppConfig;
use gymlink_core::ports::{MemberDirectory, Notifier, VisitFeed};
use gymlink_engine::daily::DailyScheduler;
use gymlink_engine::dispatch::NotificationDispatcher;
use gymlink_engine::enrichment::StatusEnricher;
use gymlink_engine::guard::RateLimitGuard;
use gymlink_engine::poller::{PollerSettings, VisitPoller};
use gymlink_network::{GymApiClient, WebhookNotifier};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::runner::Runner;

/// GYMLINK 서비스
///
/// 체육관 체크인 피드를 스마트홈 웹훅 알림으로 중계하는 브리지
#[derive(Parser, Debug)]
#[command(name = "gymlink")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 설정 파일 경로 (기본: ./gymlink.toml, 없으면 환경변수/기본값)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// 피드 베이스 URL 재정의
    #[arg(long, short = 's')]
    server: Option<String>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,

    /// 폴링 사이클 한 번만 실행하고 종료 (연결 점검용)
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config =
        AppConfig::load(args.config.as_deref()).context("설정 로드 실패")?;
    if let Some(server) = args.server {
        config.feed.base_url = server;
    }
    config.validate().context("설정 검증 실패")?;

    let tz = config.time.tz()?;
    info!(
        "GYMLINK 시작: club_id={}, timezone={}, 폴링 주기={}초",
        config.feed.club_id,
        config.time.timezone,
        config.poller.poll_interval_secs
    );

    // ============================================================
    // 어댑터 구성
    // ============================================================
    let api = Arc::new(GymApiClient::new(
        &config.feed.base_url,
        &config.feed.club_id,
        &config.feed.api_key,
        &config.feed.club_secret,
        config.feed.timeout(),
    )?);
    let feed: Arc<dyn VisitFeed> = api.clone();
    let directory: Arc<dyn MemberDirectory> = api;

    let notifier: Arc<dyn Notifier> = Arc::new(WebhookNotifier::new(
        config.notify.webhook_url.clone(),
        config.notify.timeout(),
    )?);

    // ============================================================
    // 엔진 구성
    // ============================================================
    let guard = Arc::new(RateLimitGuard::new(config.poller.cooldown()));
    let enricher = Arc::new(StatusEnricher::new(
        directory,
        tz,
        config.enrichment.clone(),
    ));
    let dispatcher = Arc::new(NotificationDispatcher::new(notifier, tz));

    let poller = Arc::new(VisitPoller::new(
        feed.clone(),
        enricher.clone(),
        dispatcher.clone(),
        guard,
        PollerSettings {
            spike_threshold: config.poller.spike_threshold,
            inter_event_delay: config.poller.inter_event_delay(),
        },
    ));

    let scheduler = Arc::new(DailyScheduler::new(
        feed,
        enricher,
        dispatcher,
        tz,
        config.daily.clone(),
    ));

    if args.once {
        info!("단일 폴링 사이클 실행 (--once)");
        poller.poll().await;
        return Ok(());
    }

    // ============================================================
    // 타이머 루프 + 종료 처리
    // ============================================================
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("종료 신호 수신 — 루프 정리 중");
            let _ = shutdown_tx.send(true);
        }
    });

    let runner = Runner::new(
        poller,
        scheduler,
        config.poller.poll_interval(),
        config.daily.check_interval(),
    );
    runner.run(shutdown_rx).await;

    info!("GYMLINK 종료");
    Ok(())
}
