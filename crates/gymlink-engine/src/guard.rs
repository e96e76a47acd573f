//! Rate-limit 쿨다운 가드.
//!
//! 업스트림 쓰로틀링(429 상응) 감지 시 고정 시간 동안 폴링 전체를 차단한다.
//! 타이머 태스크 없이, 상태 조회 시점에 만료를 lazy하게 판정한다.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{info, warn};

/// 가드 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// 정상 — 폴링 허용
    Normal,
    /// 쿨다운 중 — 폴링 차단
    CoolingDown,
}

impl std::fmt::Display for GuardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GuardState::Normal => write!(f, "Normal"),
            GuardState::CoolingDown => write!(f, "CoolingDown"),
        }
    }
}

/// Rate-limit 가드
///
/// `NORMAL -> COOLING_DOWN` 전이는 `trip()`, 복귀는 만료 시간 경과만으로 일어난다.
pub struct RateLimitGuard {
    /// 쿨다운 지속시간
    cooldown: Duration,
    /// 쿨다운 만료 시각 (None = NORMAL)
    until: Mutex<Option<Instant>>,
}

impl RateLimitGuard {
    /// 새 가드 생성
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            until: Mutex::new(None),
        }
    }

    /// 쓰로틀링 감지 — 쿨다운 진입.
    /// 이미 쿨다운 중이면 만료 시각을 연장한다.
    pub fn trip(&self) {
        let mut until = self.until.lock();
        *until = Some(Instant::now() + self.cooldown);
        warn!(
            "업스트림 쓰로틀링 감지 — {}초 쿨다운 진입",
            self.cooldown.as_secs()
        );
    }

    /// 현재 쿨다운 중인지. 만료가 지났으면 NORMAL로 복귀시키고 false.
    pub fn is_cooling_down(&self) -> bool {
        let mut until = self.until.lock();
        match *until {
            Some(expiry) if Instant::now() < expiry => true,
            Some(_) => {
                *until = None;
                info!("쿨다운 만료 — 폴링 재개");
                false
            }
            None => false,
        }
    }

    /// 현재 상태
    pub fn state(&self) -> GuardState {
        if self.is_cooling_down() {
            GuardState::CoolingDown
        } else {
            GuardState::Normal
        }
    }

    /// 쿨다운 잔여 시간 (NORMAL이면 None)
    pub fn remaining(&self) -> Option<Duration> {
        let until = self.until.lock();
        until.and_then(|expiry| expiry.checked_duration_since(Instant::now()))
    }
}
