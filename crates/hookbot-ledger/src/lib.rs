//! 거래 원장.
//!
//! 이 크레이트는 거래와 그 상태의 영속 기록을 제공합니다.
//! 원장은 포지션 상태의 단일 진실 공급원(source of truth)입니다.
//!
//! 제공 기능:
//! - [`TradeLedger`] trait: 인메모리/영속 구현이 공유하는 인터페이스
//! - [`MemoryLedger`]: 프로세스 수명의 인메모리 저장소
//! - [`PgLedger`]: PostgreSQL 기반 영속 저장소
//!
//! 모든 쓰기는 행 단위로 원자적이며, 거래는 삭제되지 않습니다
//! (감사 추적). Open → Closed 전이는 정확히 한 번만 허용됩니다.

pub mod error;
pub mod memory;
pub mod postgres;

pub use error::{LedgerError, LedgerResult};
pub use memory::MemoryLedger;
pub use postgres::PgLedger;

use async_trait::async_trait;
use hookbot_core::{NewTrade, Trade, TradeId};

/// 거래 원장 인터페이스.
///
/// 인메모리(휘발성)와 데이터베이스(영속) 구현이 같은 계약을 따릅니다.
#[async_trait]
pub trait TradeLedger: Send + Sync {
    /// 체결 확인된 거래를 기록하고 할당된 ID를 반환합니다.
    ///
    /// # Errors
    /// 저장소에 접근할 수 없으면 `LedgerError::Storage`를 반환합니다.
    /// 거래가 조용히 유실되는 일은 없으며, 호출자가 재시도하거나
    /// 상위로 에스컬레이션할 수 있습니다.
    async fn insert(&self, trade: NewTrade) -> LedgerResult<TradeId>;

    /// 거래를 Closed로 전이시키고 종료된 행을 반환합니다.
    ///
    /// # Errors
    /// - `LedgerError::NotFound`: 해당 ID의 거래가 없음
    /// - `LedgerError::AlreadyClosed`: 이미 종료됨 (첫 종료와 구분됨)
    async fn mark_closed(&self, id: TradeId) -> LedgerResult<Trade>;

    /// ID로 거래를 조회합니다.
    ///
    /// # Errors
    /// 해당 거래가 없으면 `LedgerError::NotFound`를 반환합니다.
    async fn get(&self, id: TradeId) -> LedgerResult<Trade>;

    /// 모든 오픈 거래를 조회합니다.
    async fn open_trades(&self) -> LedgerResult<Vec<Trade>>;

    /// 심볼의 오픈 거래를 조회합니다 (오래된 것부터).
    async fn open_trades_for_symbol(&self, symbol: &str) -> LedgerResult<Vec<Trade>>;

    /// 전체 거래 이력을 조회합니다 (ID 순).
    async fn all_trades(&self) -> LedgerResult<Vec<Trade>>;
}
