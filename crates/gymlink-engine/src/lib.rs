//! # gymlink-engine
//!
//! 증분 동기화/알림 엔진. 저장소 없는 인메모리 상태로 동작한다:
//! 워터마크, 쿨다운, 일일 게이트, 리포트 dedup 캐시 모두 프로세스 수명과 같다.
//!
//! ## 구조
//!
//! - [`poller`] — 워터마크 기반 증분 폴러 (스파이크 가드 포함)
//! - [`enrichment`] — 회원 상태 보강 엔진 (생일/신규/계약 만료)
//! - [`dispatch`] — 알림 포맷터 & 디스패처
//! - [`guard`] — rate-limit 쿨다운 가드
//! - [`daily`] — 일일 집계 스케줄러 (총원/만료 리포트)

pub mod daily;
pub mod dispatch;
pub mod enrichment;
pub mod guard;
pub mod poller;
