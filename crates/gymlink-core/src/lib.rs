//! # gymlink-core
//!
//! GYMLINK 도메인 모델, 포트(trait) 정의, 에러 타입.
//! 모든 크레이트가 공유하는 핵심 타입과 인터페이스를 제공한다.
//!
//! ## 구조
//!
//! - [`models`] — 도메인 데이터 구조체 (serde Serialize/Deserialize)
//! - [`ports`] — Hexagonal Architecture 포트 인터페이스 (async_trait)
//! - [`error`] — 핵심 에러 타입 (thiserror)
//! - [`config`] — 애플리케이션 설정 구조체 (`config` crate 로드)
//! - [`time`] — civil timezone 기준 일 경계/표시 시각 유틸리티

pub mod config;
pub mod error;
pub mod models;
pub mod ports;
pub mod time;
