//! # Hookbot Core
//!
//! 웹훅 트레이딩 봇의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 시스템 전반에서 사용되는 기본 타입을 제공합니다:
//! - 거래(Trade) 기록 및 상태 전이
//! - 거래소 포지션 표현
//! - 주문 방향 및 체결 타입
//! - 인바운드 시그널 및 멱등성 키
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
