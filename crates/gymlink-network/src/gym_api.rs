//! 방문/회원 피드 REST 클라이언트.
//!
//! `VisitFeed` + `MemberDirectory` 포트 구현. 자격증명은 쿼리 파라미터로 전달하고,
//! 회원 엔드포인트는 `with=active_memberships`로 프로필과 계약을 한 번에 받아
//! 포트별로 투영한다. 429는 `CoreError::RateLimit`으로 구분해 가드가 쓸 수 있게 한다.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use gymlink_core::error::CoreError;
use gymlink_core::models::member::{ContractInstance, MemberProfile};
use gymlink_core::models::visit::{AccessState, VisitEvent};
use gymlink_core::ports::{MemberDirectory, VisitFeed};
use serde::Deserialize;
use tracing::{debug, warn};

/// Retry-After 헤더가 없거나 못 읽을 때의 기본 대기 시간 (초)
const DEFAULT_RETRY_AFTER_SECS: u64 = 600;

/// 방문/회원 피드 REST 클라이언트
pub struct GymApiClient {
    client: reqwest::Client,
    base_url: String,
    club_id: String,
    api_key: String,
    club_secret: String,
}

impl GymApiClient {
    /// 새 클라이언트 생성
    pub fn new(
        base_url: &str,
        club_id: &str,
        api_key: &str,
        club_secret: &str,
        timeout: Duration,
    ) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            club_id: club_id.to_string(),
            api_key: api_key.to_string(),
            club_secret: club_secret.to_string(),
        })
    }

    fn credentials(&self) -> [(&'static str, &str); 2] {
        [
            ("api_key", self.api_key.as_str()),
            ("club_secret", self.club_secret.as_str()),
        ]
    }

    /// 응답 상태 코드 확인 및 에러 매핑
    async fn check_response(&self, resp: reqwest::Response) -> Result<reqwest::Response, CoreError> {
        let status = resp.status();

        if status.is_success() {
            return Ok(resp);
        }

        let status_code = status.as_u16();
        let retry_after = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());
        let text = resp.text().await.unwrap_or_else(|e| {
            warn!("응답 본문 읽기 실패: {e}");
            String::new()
        });

        match status_code {
            404 => Err(CoreError::NotFound {
                resource_type: "API".to_string(),
                id: text,
            }),
            429 => Err(CoreError::RateLimit {
                retry_after_secs: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
            }),
            503 => Err(CoreError::ServiceUnavailable(text)),
            _ => Err(CoreError::Network(format!("API 에러 ({status}): {text}"))),
        }
    }

    /// 회원 상세 조회 (계약 포함). 미등록은 `Ok(None)`.
    async fn get_member(&self, member_id: &str) -> Result<Option<MemberDto>, CoreError> {
        let url = format!(
            "{}/api/v1/club/{}/member/{}",
            self.base_url, self.club_id, member_id
        );

        let resp = self
            .client
            .get(&url)
            .query(&self.credentials())
            .query(&[("with", "active_memberships")])
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("회원 조회 요청 실패: {e}")))?;

        let resp = match self.check_response(resp).await {
            Ok(resp) => resp,
            Err(CoreError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        let envelope: MemberEnvelope = resp
            .json()
            .await
            .map_err(|e| CoreError::Internal(format!("회원 응답 파싱 실패: {e}")))?;

        Ok(envelope.into_first())
    }
}

#[async_trait]
impl VisitFeed for GymApiClient {
    async fn fetch_visits(
        &self,
        since: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
        limit: Option<u32>,
    ) -> Result<Vec<VisitEvent>, CoreError> {
        let url = format!("{}/api/v1/club/{}/visits", self.base_url, self.club_id);

        let mut request = self
            .client
            .get(&url)
            .query(&self.credentials())
            .query(&[("sync_from", since.timestamp_millis())]);
        if let Some(until) = until {
            request = request.query(&[("sync_to", until.timestamp_millis())]);
        }
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("방문 조회 요청 실패: {e}")))?;

        let resp = self.check_response(resp).await?;
        let envelope: VisitsEnvelope = resp
            .json()
            .await
            .map_err(|e| CoreError::Internal(format!("방문 응답 파싱 실패: {e}")))?;

        let events: Vec<VisitEvent> = envelope.result.into_iter().map(VisitDto::into_event).collect();
        debug!("방문 {}건 수신 (sync_from={since})", events.len());
        Ok(events)
    }
}

#[async_trait]
impl MemberDirectory for GymApiClient {
    async fn fetch_profile(&self, member_id: &str) -> Result<Option<MemberProfile>, CoreError> {
        Ok(self
            .get_member(member_id)
            .await?
            .map(|dto| dto.into_profile(member_id)))
    }

    async fn fetch_active_contracts(
        &self,
        member_id: &str,
    ) -> Result<Vec<ContractInstance>, CoreError> {
        Ok(self
            .get_member(member_id)
            .await?
            .map(|dto| dto.into_contracts())
            .unwrap_or_default())
    }
}

// ============================================================
// 와이어 DTO
// ============================================================

#[derive(Debug, Deserialize)]
struct VisitsEnvelope {
    #[serde(default)]
    result: Vec<VisitDto>,
}

/// 방문 레코드 — 피드에 따라 id가 숫자/문자열, 출입 결과 필드가 생략될 수 있다
#[derive(Debug, Deserialize)]
struct VisitDto {
    #[serde(deserialize_with = "string_or_number")]
    member_id: String,
    #[serde(default)]
    check_in_timestamp: i64,
    #[serde(default)]
    access_allowed: Option<bool>,
    #[serde(default)]
    error_code: Option<serde_json::Value>,
}

impl VisitDto {
    fn into_event(self) -> VisitEvent {
        let access = match (self.access_allowed, &self.error_code) {
            (Some(false), _) | (_, Some(_)) => AccessState::Denied,
            (Some(true), None) => AccessState::Allowed,
            (None, None) => AccessState::Unknown,
        };

        VisitEvent {
            member_id: self.member_id,
            check_in_time: Utc
                .timestamp_millis_opt(self.check_in_timestamp)
                .single()
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            access,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MemberEnvelope {
    #[serde(default)]
    result: Option<MemberPayload>,
}

/// 일부 배포는 단일 객체, 일부는 단일 원소 배열을 돌려준다
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MemberPayload {
    One(Box<MemberDto>),
    Many(Vec<MemberDto>),
}

impl MemberEnvelope {
    fn into_first(self) -> Option<MemberDto> {
        match self.result {
            Some(MemberPayload::One(dto)) => Some(*dto),
            Some(MemberPayload::Many(list)) => list.into_iter().next(),
            None => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MemberDto {
    #[serde(default)]
    firstname: Option<String>,
    #[serde(default)]
    lastname: Option<String>,
    #[serde(default)]
    birthday: Option<NaiveDate>,
    #[serde(default)]
    member_since: Option<MemberSince>,
    #[serde(default)]
    memberships: Vec<MembershipDto>,
}

impl MemberDto {
    fn into_profile(self, member_id: &str) -> MemberProfile {
        let registration_time = self.member_since.as_ref().and_then(MemberSince::to_instant);
        MemberProfile {
            member_id: member_id.to_string(),
            first_name: self.firstname.unwrap_or_default(),
            last_name: self.lastname,
            birth_date: self.birthday,
            registration_time,
        }
    }

    fn into_contracts(self) -> Vec<ContractInstance> {
        self.memberships
            .into_iter()
            .map(|m| ContractInstance {
                membership_name: m.membership_name,
                contract_end_time: m
                    .contract_end_date
                    .map(|date| date.and_time(NaiveTime::MIN).and_utc()),
                active: m.active,
            })
            .collect()
    }
}

/// 등록 시각 — 피드에 따라 epoch 밀리초 또는 `YYYY-MM-DD` 문자열
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MemberSince {
    Millis(i64),
    Date(String),
}

impl MemberSince {
    fn to_instant(&self) -> Option<DateTime<Utc>> {
        match self {
            MemberSince::Millis(ms) => Utc.timestamp_millis_opt(*ms).single(),
            MemberSince::Date(s) => s
                .parse::<NaiveDate>()
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN).and_utc()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MembershipDto {
    #[serde(default)]
    membership_name: String,
    #[serde(default)]
    contract_end_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "int_or_bool")]
    active: bool,
}

/// 숫자/문자열 양쪽을 문자열 id로 수용
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n.to_string(),
        Raw::Text(s) => s,
    })
}

/// `active`가 bool 또는 0/1 정수로 오는 피드를 모두 수용
fn int_or_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Flag(bool),
        Number(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Flag(b) => b,
        Raw::Number(n) => n != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> GymApiClient {
        GymApiClient::new(base_url, "777", "key", "secret", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn client_normalizes_base_url() {
        let client = client("http://localhost:8000/");
        assert_eq!(client.base_url, "http://localhost:8000");
    }

    #[tokio::test]
    async fn fetch_visits_parses_access_states() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/club/777/visits")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"result":[
                    {"member_id":1001,"check_in_timestamp":1770000000000,"access_allowed":true},
                    {"member_id":"1002","check_in_timestamp":1770000060000,"access_allowed":false},
                    {"member_id":1003,"check_in_timestamp":1770000120000,"error_code":"TURNSTILE_DENIED"},
                    {"member_id":1004,"check_in_timestamp":1770000180000}
                ]}"#,
            )
            .create_async()
            .await;

        let client = client(&server.url());
        let visits = client
            .fetch_visits(DateTime::<Utc>::UNIX_EPOCH, None, None)
            .await
            .unwrap();

        assert_eq!(visits.len(), 4);
        assert_eq!(visits[0].member_id, "1001");
        assert_eq!(visits[0].access, AccessState::Allowed);
        assert_eq!(visits[1].access, AccessState::Denied);
        assert_eq!(visits[2].access, AccessState::Denied);
        assert_eq!(visits[3].access, AccessState::Unknown);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn fetch_visits_sends_sync_from_and_credentials() {
        let mut server = mockito::Server::new_async().await;
        let since: DateTime<Utc> = "2026-07-15T10:00:00Z".parse().unwrap();
        let mock = server
            .mock("GET", "/api/v1/club/777/visits")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("api_key".into(), "key".into()),
                mockito::Matcher::UrlEncoded("club_secret".into(), "secret".into()),
                mockito::Matcher::UrlEncoded(
                    "sync_from".into(),
                    since.timestamp_millis().to_string(),
                ),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"result":[]}"#)
            .create_async()
            .await;

        let client = client(&server.url());
        let visits = client.fetch_visits(since, None, None).await.unwrap();
        assert!(visits.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn fetch_visits_maps_429_to_rate_limit() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/club/777/visits")
            .match_query(mockito::Matcher::Any)
            .with_status(429)
            .with_header("Retry-After", "120")
            .with_body("Too Many Requests")
            .create_async()
            .await;

        let client = client(&server.url());
        let err = client
            .fetch_visits(DateTime::<Utc>::UNIX_EPOCH, None, None)
            .await
            .unwrap_err();

        assert!(err.is_throttled());
        assert!(matches!(err, CoreError::RateLimit { retry_after_secs: 120 }));
    }

    #[tokio::test]
    async fn fetch_visits_maps_503_to_service_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/club/777/visits")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let client = client(&server.url());
        let err = client
            .fetch_visits(DateTime::<Utc>::UNIX_EPOCH, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn fetch_profile_normalizes_member_since_date_string() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/club/777/member/1001")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"result":{"firstname":"Anna","lastname":"de Vries",
                    "birthday":"2001-03-15","member_since":"2026-07-01"}}"#,
            )
            .create_async()
            .await;

        let client = client(&server.url());
        let profile = client.fetch_profile("1001").await.unwrap().unwrap();

        assert_eq!(profile.display_name(), "Anna de Vries");
        assert_eq!(
            profile.birth_date,
            Some(NaiveDate::from_ymd_opt(2001, 3, 15).unwrap())
        );
        assert_eq!(
            profile.registration_time,
            Some("2026-07-01T00:00:00Z".parse().unwrap())
        );
    }

    #[tokio::test]
    async fn fetch_profile_normalizes_member_since_millis() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/club/777/member/1001")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"result":{"firstname":"Anna","member_since":1751328000000}}"#)
            .create_async()
            .await;

        let client = client(&server.url());
        let profile = client.fetch_profile("1001").await.unwrap().unwrap();
        assert_eq!(
            profile.registration_time,
            Some("2025-07-01T00:00:00Z".parse().unwrap())
        );
    }

    #[tokio::test]
    async fn fetch_profile_unwraps_single_element_array() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/club/777/member/1001")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"result":[{"firstname":"Anna"}]}"#)
            .create_async()
            .await;

        let client = client(&server.url());
        let profile = client.fetch_profile("1001").await.unwrap().unwrap();
        assert_eq!(profile.first_name, "Anna");
    }

    #[tokio::test]
    async fn fetch_profile_404_is_none() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/club/777/member/9999")
            .match_query(mockito::Matcher::Any)
            .with_status(404)
            .with_body("not found")
            .create_async()
            .await;

        let client = client(&server.url());
        assert!(client.fetch_profile("9999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn fetch_contracts_projects_memberships() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/club/777/member/1001")
            .match_query(mockito::Matcher::AllOf(vec![mockito::Matcher::UrlEncoded(
                "with".into(),
                "active_memberships".into(),
            )]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"result":{"firstname":"Anna","memberships":[
                    {"membership_name":"Basic","contract_end_date":"2026-08-20","active":1},
                    {"membership_name":"Day Pass","active":0}
                ]}}"#,
            )
            .create_async()
            .await;

        let client = client(&server.url());
        let contracts = client.fetch_active_contracts("1001").await.unwrap();

        assert_eq!(contracts.len(), 2);
        assert!(contracts[0].active);
        assert_eq!(
            contracts[0].contract_end_time,
            Some("2026-08-20T00:00:00Z".parse().unwrap())
        );
        assert!(!contracts[1].active);
        assert!(contracts[1].contract_end_time.is_none());
    }

    #[test]
    fn zero_timestamp_visit_maps_to_epoch() {
        let dto = VisitDto {
            member_id: "1".to_string(),
            check_in_timestamp: 0,
            access_allowed: None,
            error_code: None,
        };
        let event = dto.into_event();
        // 폴러의 방어 필터가 걸러내는 형태
        assert!(!event.has_valid_timestamp());
    }
}
