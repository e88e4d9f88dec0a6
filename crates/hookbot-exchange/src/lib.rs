//! 거래소 연결.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - [`ExchangeClient`] trait: 주문 제출 및 포지션 조회 인터페이스
//! - Bybit 커넥터 (REST, HMAC-SHA256 서명)
//! - 시뮬레이션 거래소 (테스트 및 모의투자용)
//! - 일시적 오류에 대한 재시도 유틸리티
//! - 실시간 포지션 WebSocket 스트림 (수동적 소비)

pub mod bybit;
pub mod error;
pub mod retry;
pub mod simulated;
pub mod stream;
pub mod traits;

pub use bybit::{BybitClient, BybitConfig};
pub use error::*;
pub use retry::{with_retry, RetryConfig};
pub use simulated::SimulatedExchange;
pub use stream::{BybitPositionStream, PositionStreamEvent};
pub use traits::*;
