//! 실행 에러 타입.

use hookbot_core::{BotError, Side};
use hookbot_exchange::ExchangeError;
use hookbot_ledger::LedgerError;
use rust_decimal::Decimal;
use thiserror::Error;

/// 실행 작업을 위한 Result 타입.
pub type ExecutionResult<T> = Result<T, ExecutionError>;

/// 실행 오류 유형.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// 거래소 에러 (재시도 소진 후 또는 거절)
    #[error("Exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    /// 장부 에러
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// 체결은 확인되었으나 장부 기록에 실패.
    ///
    /// 가장 위험한 실패 상태입니다. 실제 포지션이 존재하지만 장부에
    /// 없으므로, 에러를 삼키지 않고 체결 내용 전체를 포함해 상위로
    /// 격상합니다.
    #[error(
        "CRITICAL: fill confirmed but not recorded (order {order_id}, {symbol} {side} {quantity} @ {price}): {source}"
    )]
    UnrecordedFill {
        order_id: String,
        symbol: String,
        side: Side,
        quantity: Decimal,
        price: Decimal,
        source: LedgerError,
    },
}

impl ExecutionError {
    /// 운영자 개입이 필요한 치명적 상태인지 확인.
    pub fn is_critical(&self) -> bool {
        matches!(self, ExecutionError::UnrecordedFill { .. })
    }
}

impl From<ExecutionError> for BotError {
    fn from(err: ExecutionError) -> Self {
        match err {
            ExecutionError::Exchange(e) => e.into(),
            ExecutionError::Ledger(e) => e.into(),
            e @ ExecutionError::UnrecordedFill { .. } => BotError::Persistence(e.to_string()),
        }
    }
}
