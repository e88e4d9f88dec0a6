//! 주문 실행 및 포지션 정합.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - [`OrderEngine`]: 멱등성 보장과 재시도가 포함된 주문 실행 엔진
//! - [`PositionReconciler`]: 거래소 실포지션 기반 청산 및 PnL 계산
//! - 심볼 단위 직렬화 락

pub mod engine;
pub mod error;
pub mod reconciler;
pub mod symbol_lock;

pub use engine::{ExecutionOutcome, OrderEngine};
pub use error::{ExecutionError, ExecutionResult};
pub use reconciler::{PositionReconciler, TradeCloseReport};
pub use symbol_lock::SymbolLocks;
