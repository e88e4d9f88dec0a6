//! 인메모리 원장 구현.
//!
//! 프로세스 수명 동안만 유지되는 휘발성 저장소입니다.
//! 개발/테스트 및 `DATABASE_URL` 미설정 환경에서 사용됩니다.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use hookbot_core::{NewTrade, Trade, TradeId, TradeStatus};
use tokio::sync::RwLock;
use tracing::debug;

use crate::{LedgerError, LedgerResult, TradeLedger};

#[derive(Debug, Default)]
struct MemoryInner {
    next_id: TradeId,
    trades: BTreeMap<TradeId, Trade>,
    /// 다음 insert 호출에서 반환할 에러 (저장 실패 시나리오용).
    #[cfg(any(test, feature = "test-util"))]
    fail_next_insert: Option<LedgerError>,
}

impl MemoryInner {
    #[cfg(any(test, feature = "test-util"))]
    fn take_scripted_failure(&mut self) -> Option<LedgerError> {
        self.fail_next_insert.take()
    }

    #[cfg(not(any(test, feature = "test-util")))]
    fn take_scripted_failure(&mut self) -> Option<LedgerError> {
        None
    }
}

/// 인메모리 거래 원장.
///
/// 단일 RwLock으로 쓰기를 직렬화하므로, 동시 독자는 부분 필드
/// 업데이트를 관찰하지 않습니다.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    inner: RwLock<MemoryInner>,
}

impl MemoryLedger {
    /// 새 인메모리 원장을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 다음 insert 호출을 지정된 에러로 실패시킵니다.
    ///
    /// `test-util` feature로만 노출되는 실패 주입 훅입니다.
    /// 운영 빌드에는 포함되지 않습니다.
    #[cfg(any(test, feature = "test-util"))]
    pub async fn fail_next_insert(&self, error: LedgerError) {
        self.inner.write().await.fail_next_insert = Some(error);
    }
}

#[async_trait]
impl TradeLedger for MemoryLedger {
    async fn insert(&self, trade: NewTrade) -> LedgerResult<TradeId> {
        let mut inner = self.inner.write().await;
        if let Some(err) = inner.take_scripted_failure() {
            return Err(err);
        }
        inner.next_id += 1;
        let id = inner.next_id;

        let row = Trade {
            id,
            symbol: trade.symbol,
            side: trade.side,
            quantity: trade.quantity,
            entry_price: trade.entry_price,
            status: TradeStatus::Open,
            opened_at: Utc::now(),
            closed_at: None,
        };

        debug!(trade_id = id, symbol = %row.symbol, side = %row.side, "거래 기록됨");
        inner.trades.insert(id, row);
        Ok(id)
    }

    async fn mark_closed(&self, id: TradeId) -> LedgerResult<Trade> {
        let mut inner = self.inner.write().await;
        let trade = inner.trades.get_mut(&id).ok_or(LedgerError::NotFound(id))?;

        if trade.status == TradeStatus::Closed {
            return Err(LedgerError::AlreadyClosed(id));
        }

        trade.status = TradeStatus::Closed;
        trade.closed_at = Some(Utc::now());
        debug!(trade_id = id, symbol = %trade.symbol, "거래 종료됨");
        Ok(trade.clone())
    }

    async fn get(&self, id: TradeId) -> LedgerResult<Trade> {
        let inner = self.inner.read().await;
        inner
            .trades
            .get(&id)
            .cloned()
            .ok_or(LedgerError::NotFound(id))
    }

    async fn open_trades(&self) -> LedgerResult<Vec<Trade>> {
        let inner = self.inner.read().await;
        Ok(inner
            .trades
            .values()
            .filter(|t| t.is_open())
            .cloned()
            .collect())
    }

    async fn open_trades_for_symbol(&self, symbol: &str) -> LedgerResult<Vec<Trade>> {
        let inner = self.inner.read().await;
        Ok(inner
            .trades
            .values()
            .filter(|t| t.is_open() && t.symbol == symbol)
            .cloned()
            .collect())
    }

    async fn all_trades(&self) -> LedgerResult<Vec<Trade>> {
        let inner = self.inner.read().await;
        Ok(inner.trades.values().cloned().collect())
    }
}
