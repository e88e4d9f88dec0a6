//! 도메인 모델.
//!
//! 트레이딩 봇의 핵심 엔티티를 정의합니다:
//! - [`order`]: 주문 방향 및 체결 타입
//! - [`trade`]: 원장에 기록되는 거래 엔티티
//! - [`position`]: 거래소가 보고하는 포지션 및 청산 액션
//! - [`signal`]: 인바운드 웹훅 시그널

pub mod order;
pub mod position;
pub mod signal;
pub mod trade;

pub use order::*;
pub use position::*;
pub use signal::*;
pub use trade::*;
