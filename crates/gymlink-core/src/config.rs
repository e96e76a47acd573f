//! 애플리케이션 설정 구조체.
//!
//! 피드 자격증명, 폴링/쿨다운 주기, 일일 잡 트리거 시각, 보강 규칙 등
//! 런타임 설정을 정의한다. `config` crate로 TOML 파일 + `GYMLINK_` 환경변수에서 로드.

use std::path::Path;
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 업스트림 방문/회원 피드 설정
    #[serde(default)]
    pub feed: FeedConfig,
    /// 다운스트림 웹훅 설정
    #[serde(default)]
    pub notify: NotifyConfig,
    /// 폴러 설정
    #[serde(default)]
    pub poller: PollerConfig,
    /// 일일 집계 스케줄 설정
    #[serde(default)]
    pub daily: DailyConfig,
    /// 상태 보강 규칙
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    /// civil timezone 설정
    #[serde(default)]
    pub time: TimeConfig,
}

// ============================================================
// 피드 설정
// ============================================================

/// 업스트림 피드 연결 설정 — 자격증명은 쿼리 파라미터로 전달된다
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// API 베이스 URL
    #[serde(default = "default_feed_base_url")]
    pub base_url: String,
    /// 클럽 식별자
    #[serde(default)]
    pub club_id: String,
    /// API 키
    #[serde(default)]
    pub api_key: String,
    /// 클럽 시크릿
    #[serde(default)]
    pub club_secret: String,
    /// 요청 타임아웃 (초)
    #[serde(default = "default_feed_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: default_feed_base_url(),
            club_id: String::new(),
            api_key: String::new(),
            club_secret: String::new(),
            timeout_secs: default_feed_timeout_secs(),
        }
    }
}

impl FeedConfig {
    /// 요청 타임아웃
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_feed_base_url() -> String {
    "https://api.virtuagym.com".to_string()
}

fn default_feed_timeout_secs() -> u64 {
    30
}

// ============================================================
// 웹훅 설정
// ============================================================

/// 다운스트림 웹훅 설정
///
/// URL 미설정은 치명적 오류가 아니다 — 전송이 no-op이 될 뿐이다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// 웹훅 베이스 URL (예: https://webhook.example.app/<id>/checkin)
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// 요청 타임아웃 (초)
    #[serde(default = "default_notify_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: default_notify_timeout_secs(),
        }
    }
}

impl NotifyConfig {
    /// 요청 타임아웃
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_notify_timeout_secs() -> u64 {
    15
}

// ============================================================
// 폴러 설정
// ============================================================

/// 증분 폴러 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    /// 폴링 주기 (초)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// 볼륨 스파이크 임계값 — 이보다 큰 배치는 백로그로 간주, 알림 없이 워터마크만 전진
    #[serde(default = "default_spike_threshold")]
    pub spike_threshold: usize,
    /// 이벤트 간 지연 (밀리초) — 업스트림 rate limit 보호
    #[serde(default = "default_inter_event_delay_ms")]
    pub inter_event_delay_ms: u64,
    /// 쓰로틀링 감지 시 쿨다운 지속시간 (초)
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            spike_threshold: default_spike_threshold(),
            inter_event_delay_ms: default_inter_event_delay_ms(),
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

impl PollerConfig {
    /// 폴링 주기
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// 이벤트 간 지연
    pub fn inter_event_delay(&self) -> Duration {
        Duration::from_millis(self.inter_event_delay_ms)
    }

    /// 쿨다운 지속시간
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

fn default_poll_interval_secs() -> u64 {
    120
}

fn default_spike_threshold() -> usize {
    10
}

fn default_inter_event_delay_ms() -> u64 {
    500
}

fn default_cooldown_secs() -> u64 {
    600
}

// ============================================================
// 일일 집계 스케줄 설정
// ============================================================

/// 일일 집계 스케줄러 설정 — 트리거 시각은 civil timezone 기준
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyConfig {
    /// 트리거 체크 주기 (초)
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    /// 일일 총원 잡 트리거 시 (0-23)
    #[serde(default = "default_total_hour")]
    pub total_hour: u32,
    /// 일일 총원 잡 트리거 분 (0-59)
    #[serde(default = "default_total_minute")]
    pub total_minute: u32,
    /// 만료 리포트 잡 트리거 시 (0-23)
    #[serde(default = "default_report_hour")]
    pub report_hour: u32,
    /// 만료 리포트 잡 트리거 분 (0-59)
    #[serde(default)]
    pub report_minute: u32,
    /// 회원별 리포트 재포함 쿨다운 (일)
    #[serde(default = "default_report_cooldown_days")]
    pub report_cooldown_days: i64,
    /// 리포트 잡의 회원 간 지연 (밀리초)
    #[serde(default = "default_inter_member_delay_ms")]
    pub inter_member_delay_ms: u64,
}

impl Default for DailyConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval_secs(),
            total_hour: default_total_hour(),
            total_minute: default_total_minute(),
            report_hour: default_report_hour(),
            report_minute: 0,
            report_cooldown_days: default_report_cooldown_days(),
            inter_member_delay_ms: default_inter_member_delay_ms(),
        }
    }
}

impl DailyConfig {
    /// 트리거 체크 주기
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    /// 회원 간 지연
    pub fn inter_member_delay(&self) -> Duration {
        Duration::from_millis(self.inter_member_delay_ms)
    }
}

fn default_check_interval_secs() -> u64 {
    60
}

fn default_total_hour() -> u32 {
    23
}

fn default_total_minute() -> u32 {
    59
}

fn default_report_hour() -> u32 {
    9
}

fn default_report_cooldown_days() -> i64 {
    7
}

fn default_inter_member_delay_ms() -> u64 {
    500
}

// ============================================================
// 보강 규칙 설정
// ============================================================

/// 상태 보강 규칙
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// 신규 회원 판정 창 (일)
    #[serde(default = "default_new_member_days")]
    pub new_member_days: i64,
    /// 계약 만료 임박 판정 창 (일)
    #[serde(default = "default_contract_expiry_days")]
    pub contract_expiry_days: i64,
    /// 만료 알림에서 제외할 회원권 이름
    #[serde(default = "default_excluded_memberships")]
    pub excluded_memberships: Vec<String>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            new_member_days: default_new_member_days(),
            contract_expiry_days: default_contract_expiry_days(),
            excluded_memberships: default_excluded_memberships(),
        }
    }
}

fn default_new_member_days() -> i64 {
    30
}

fn default_contract_expiry_days() -> i64 {
    28
}

fn default_excluded_memberships() -> Vec<String> {
    vec!["Premium Flex".to_string(), "Student Flex".to_string()]
}

// ============================================================
// 시간 설정
// ============================================================

/// civil timezone 설정 — 모든 일 경계/표시 시각 계산의 기준
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeConfig {
    /// IANA timezone 이름
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
        }
    }
}

impl TimeConfig {
    /// 설정된 timezone 파싱
    pub fn tz(&self) -> Result<Tz, CoreError> {
        self.timezone
            .parse()
            .map_err(|_| CoreError::Config(format!("알 수 없는 timezone: {}", self.timezone)))
    }
}

fn default_timezone() -> String {
    "Europe/Amsterdam".to_string()
}

// ============================================================
// 로드/검증
// ============================================================

impl AppConfig {
    /// 기본 설정
    pub fn default_config() -> Self {
        Self::default()
    }

    /// 설정 로드: 기본값 위에 TOML 파일(옵션), 그 위에 `GYMLINK_` 환경변수를 겹친다.
    ///
    /// 환경변수 구분자는 `__` (예: `GYMLINK_FEED__API_KEY`).
    pub fn load(path: Option<&Path>) -> Result<Self, CoreError> {
        let mut builder = config::Config::builder();

        builder = match path {
            Some(p) => builder.add_source(config::File::from(p)),
            None => builder.add_source(config::File::with_name("gymlink").required(false)),
        };

        builder = builder.add_source(
            config::Environment::with_prefix("GYMLINK")
                .separator("__")
                .try_parsing(true),
        );

        let raw = builder
            .build()
            .map_err(|e| CoreError::Config(format!("설정 로드 실패: {e}")))?;

        raw.try_deserialize()
            .map_err(|e| CoreError::Config(format!("설정 파싱 실패: {e}")))
    }

    /// 필수값/범위 검증
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.feed.club_id.is_empty() {
            return Err(CoreError::Validation {
                field: "feed.club_id".to_string(),
                message: "클럽 식별자가 비어 있음".to_string(),
            });
        }
        if self.feed.api_key.is_empty() {
            return Err(CoreError::Validation {
                field: "feed.api_key".to_string(),
                message: "API 키가 비어 있음".to_string(),
            });
        }
        if self.poller.spike_threshold == 0 {
            return Err(CoreError::Validation {
                field: "poller.spike_threshold".to_string(),
                message: "스파이크 임계값은 1 이상이어야 함".to_string(),
            });
        }
        if self.daily.total_hour > 23 || self.daily.report_hour > 23 {
            return Err(CoreError::Validation {
                field: "daily".to_string(),
                message: "트리거 시(hour)는 0-23 범위여야 함".to_string(),
            });
        }
        if self.daily.total_minute > 59 || self.daily.report_minute > 59 {
            return Err(CoreError::Validation {
                field: "daily".to_string(),
                message: "트리거 분(minute)은 0-59 범위여야 함".to_string(),
            });
        }
        self.time.tz()?;
        Ok(())
    }
}
