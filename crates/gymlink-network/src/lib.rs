//! # gymlink-network
//!
//! `gymlink-core` 포트의 HTTP 어댑터 구현.
//!
//! - [`gym_api`] — 방문/회원 피드 REST 클라이언트 (`VisitFeed` + `MemberDirectory`)
//! - [`webhook`] — 다운스트림 웹훅 전송 (`Notifier`)

pub mod gym_api;
pub mod webhook;

pub use gym_api::GymApiClient;
pub use webhook::WebhookNotifier;
