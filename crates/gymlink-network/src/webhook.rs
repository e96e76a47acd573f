//! 다운스트림 웹훅 전송.
//!
//! `Notifier` 포트 구현. 조립된 텍스트를 `tag` 쿼리 파라미터로 percent-encode해
//! 멱등 GET으로 전달한다. 원본 이벤트 시각은 상관용 `timestamp` 파라미터로 동행.
//! URL 미설정은 프로세스 치명 오류가 아니라 1회 경고 후 no-op이다.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gymlink_core::error::CoreError;
use gymlink_core::ports::Notifier;
use tracing::{debug, warn};

/// 웹훅 쓰로틀링 시 기본 대기 시간 (초)
const DEFAULT_RETRY_AFTER_SECS: u64 = 600;

/// 웹훅 전송 클라이언트
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: Option<String>,
    /// URL 미설정 경고를 한 번만 남기기 위한 플래그
    missing_warned: AtomicBool,
}

impl WebhookNotifier {
    /// 새 웹훅 클라이언트 생성. `url`이 None이면 모든 전송이 no-op.
    pub fn new(url: Option<String>, timeout: Duration) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {e}")))?;

        Ok(Self {
            client,
            url: url.filter(|u| !u.is_empty()),
            missing_warned: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn deliver(
        &self,
        text: &str,
        correlation: Option<DateTime<Utc>>,
    ) -> Result<(), CoreError> {
        let Some(base) = &self.url else {
            if !self.missing_warned.swap(true, Ordering::Relaxed) {
                warn!("웹훅 URL 미설정 — 알림 전송을 건너뜀");
            }
            return Ok(());
        };

        let mut url = format!("{base}?tag={}", urlencoding::encode(text));
        if let Some(instant) = correlation {
            url.push_str(&format!("&timestamp={}", instant.timestamp_millis()));
        }

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("웹훅 요청 실패: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            debug!("웹훅 전송 성공: {text}");
            return Ok(());
        }

        if status.as_u16() == 429 {
            return Err(CoreError::RateLimit {
                retry_after_secs: DEFAULT_RETRY_AFTER_SECS,
            });
        }

        Err(CoreError::Network(format!("웹훅 응답 오류 ({status})")))
    }
}
