//! 원장 에러 타입.

use hookbot_core::{BotError, TradeId};
use thiserror::Error;

/// 원장 작업 에러.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// 저장소 I/O 실패. 작업에 치명적이며 항상 에스컬레이션됩니다.
    #[error("Storage error: {0}")]
    Storage(String),

    /// 해당 ID의 거래가 없음.
    #[error("Trade not found: {0}")]
    NotFound(TradeId),

    /// 거래가 이미 종료됨. 멱등적 호출자는 no-op으로 취급할 수 있지만,
    /// 관측성을 위해 첫 종료와 구분해서 보고합니다.
    #[error("Trade already closed: {0}")]
    AlreadyClosed(TradeId),
}

/// 원장 작업을 위한 Result 타입.
pub type LedgerResult<T> = Result<T, LedgerError>;

impl LedgerError {
    /// 작업을 중단시켜야 하는 에러인지 확인합니다.
    ///
    /// `AlreadyClosed`는 멱등적 재시도에서 발생할 수 있어 비치명적입니다.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LedgerError::Storage(_))
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        LedgerError::Storage(err.to_string())
    }
}

impl From<LedgerError> for BotError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Storage(msg) => BotError::Persistence(msg),
            LedgerError::NotFound(id) => BotError::NotFound(format!("trade {}", id)),
            LedgerError::AlreadyClosed(id) => BotError::AlreadyClosed(format!("trade {}", id)),
        }
    }
}
