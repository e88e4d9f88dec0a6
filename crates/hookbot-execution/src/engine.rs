//! 주문 실행 엔진.
//!
//! 제공 기능:
//! - 멱등성 키 기반 중복 주문 차단
//! - 일시적 장애에 대한 한정 재시도
//! - 체결 확인 후 장부 기록 (진입 주문당 정확히 1건)
//! - 심볼 단위 실행 직렬화

use std::collections::HashMap;
use std::sync::Arc;

use hookbot_core::{NewTrade, OrderFill, Side, TradeId};
use hookbot_exchange::{with_retry, ExchangeClient, RetryConfig};
use hookbot_ledger::TradeLedger;
use rust_decimal::Decimal;
use tokio::sync::{OwnedMutexGuard, RwLock};
use tracing::{error, info};

use crate::error::{ExecutionError, ExecutionResult};
use crate::symbol_lock::SymbolLocks;

/// 진입 주문 실행 결과.
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    /// 주문이 제출되고 장부에 기록됨
    Placed { fill: OrderFill, trade_id: TradeId },
    /// 이미 처리된 멱등성 키. 주문이 제출되지 않음
    Duplicate { fill: OrderFill },
}

impl ExecutionOutcome {
    /// 주문이 실제로 제출되었는지 확인.
    pub fn is_placed(&self) -> bool {
        matches!(self, ExecutionOutcome::Placed { .. })
    }

    /// 체결 정보 반환.
    pub fn fill(&self) -> &OrderFill {
        match self {
            ExecutionOutcome::Placed { fill, .. } => fill,
            ExecutionOutcome::Duplicate { fill } => fill,
        }
    }
}

/// 주문 실행 엔진.
///
/// 멱등성 캐시는 프로세스 수명 동안 유지됩니다. 같은 멱등성 키로
/// 재호출되면 거래소 호출 없이 이전 체결 결과를 반환합니다.
pub struct OrderEngine {
    exchange: Arc<dyn ExchangeClient>,
    ledger: Arc<dyn TradeLedger>,
    retry: RetryConfig,
    recent_fills: RwLock<HashMap<String, OrderFill>>,
    locks: SymbolLocks,
}

impl OrderEngine {
    pub fn new(
        exchange: Arc<dyn ExchangeClient>,
        ledger: Arc<dyn TradeLedger>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            exchange,
            ledger,
            retry,
            recent_fills: RwLock::new(HashMap::new()),
            locks: SymbolLocks::new(),
        }
    }

    /// 진입 주문 실행.
    ///
    /// 처리 순서:
    /// 1. 심볼 락 획득 (같은 심볼 동시 실행 방지)
    /// 2. 멱등성 키 조회. 기처리 키면 주문 없이 반환
    /// 3. 시장가 주문 제출 (일시적 장애는 한정 재시도)
    /// 4. 확인된 체결을 장부에 기록 (체결당 정확히 1건)
    ///
    /// 체결 후 장부 기록에 실패하면 [`ExecutionError::UnrecordedFill`]로
    /// 격상합니다. 이 에러는 절대 무시되어서는 안 됩니다.
    pub async fn execute_entry(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
        idempotency_key: &str,
    ) -> ExecutionResult<ExecutionOutcome> {
        let _guard = self.locks.acquire(symbol).await;

        // 멱등성 검사: 같은 키는 주문을 다시 제출하지 않음
        if let Some(fill) = self.recent_fills.read().await.get(idempotency_key) {
            info!(
                idempotency_key,
                order_id = %fill.order_id,
                "중복 신호, 주문 생략"
            );
            return Ok(ExecutionOutcome::Duplicate { fill: fill.clone() });
        }

        let fill = with_retry(&self.retry, || {
            self.exchange
                .place_market_order(symbol, side, quantity, idempotency_key)
        })
        .await?;

        info!(
            symbol,
            %side,
            order_id = %fill.order_id,
            price = %fill.price,
            "주문 체결 확인"
        );

        // 체결가 기준으로 장부 기록. 실패 시 체결 내용과 함께 격상
        let trade = NewTrade::new(fill.symbol.clone(), fill.side, fill.quantity, fill.price);
        let trade_id = match self.ledger.insert(trade).await {
            Ok(id) => id,
            Err(e) => {
                error!(
                    order_id = %fill.order_id,
                    symbol = %fill.symbol,
                    error = %e,
                    "체결 확인 후 장부 기록 실패"
                );
                return Err(ExecutionError::UnrecordedFill {
                    order_id: fill.order_id,
                    symbol: fill.symbol,
                    side: fill.side,
                    quantity: fill.quantity,
                    price: fill.price,
                    source: e,
                });
            }
        };

        self.recent_fills
            .write()
            .await
            .insert(idempotency_key.to_string(), fill.clone());

        Ok(ExecutionOutcome::Placed { fill, trade_id })
    }

    /// 심볼 락을 획득합니다.
    ///
    /// 청산 주문 제출과 장부 종결처럼 여러 단계를 하나의 임계 구역으로
    /// 묶어야 할 때 사용합니다. 가드를 보유하는 동안 같은 심볼의
    /// `execute_entry`는 대기합니다.
    pub async fn lock_symbol(&self, symbol: &str) -> OwnedMutexGuard<()> {
        self.locks.acquire(symbol).await
    }

    /// 청산 주문 실행.
    ///
    /// 장부에 새 거래를 생성하지 않습니다. 청산에 따른 거래 종결은
    /// 호출자(reconciler)가 처리하며, 호출자는 [`lock_symbol`]로 청산과
    /// 종결 전체를 직렬화해야 합니다.
    ///
    /// [`lock_symbol`]: OrderEngine::lock_symbol
    pub async fn place_close_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
        client_order_id: &str,
    ) -> ExecutionResult<OrderFill> {
        let fill = with_retry(&self.retry, || {
            self.exchange
                .place_market_order(symbol, side, quantity, client_order_id)
        })
        .await?;

        info!(
            symbol,
            %side,
            order_id = %fill.order_id,
            price = %fill.price,
            "청산 주문 체결 확인"
        );

        Ok(fill)
    }

    /// 거래소 오픈 포지션 실시간 조회.
    pub async fn list_positions(&self) -> ExecutionResult<Vec<hookbot_core::Position>> {
        let positions = with_retry(&self.retry, || self.exchange.list_positions()).await?;
        Ok(positions)
    }

    /// 장부 참조 반환.
    pub fn ledger(&self) -> &Arc<dyn TradeLedger> {
        &self.ledger
    }

    /// 멱등성 캐시 크기 반환 (진단용).
    pub async fn cached_key_count(&self) -> usize {
        self.recent_fills.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookbot_exchange::{ExchangeError, SimulatedExchange};
    use hookbot_ledger::{LedgerError, MemoryLedger};
    use rust_decimal_macros::dec;

    fn engine_with(
        exchange: Arc<SimulatedExchange>,
        ledger: Arc<MemoryLedger>,
    ) -> OrderEngine {
        OrderEngine::new(exchange, ledger, RetryConfig::fast())
    }

    #[tokio::test]
    async fn test_entry_inserts_exactly_one_trade() {
        let exchange = Arc::new(SimulatedExchange::new());
        let ledger = Arc::new(MemoryLedger::new());
        let engine = engine_with(exchange.clone(), ledger.clone());

        exchange.set_price("BTCUSD", dec!(50000));

        let outcome = engine
            .execute_entry("BTCUSD", Side::Buy, dec!(1), "sig-1:BTCUSD:BUY")
            .await
            .unwrap();

        assert!(outcome.is_placed());
        assert_eq!(exchange.order_count(), 1);
        assert_eq!(ledger.open_trades().await.unwrap().len(), 1);

        let trade = &ledger.open_trades().await.unwrap()[0];
        assert_eq!(trade.entry_price, dec!(50000));
    }

    #[tokio::test]
    async fn test_duplicate_key_places_no_second_order() {
        let exchange = Arc::new(SimulatedExchange::new());
        let ledger = Arc::new(MemoryLedger::new());
        let engine = engine_with(exchange.clone(), ledger.clone());

        let first = engine
            .execute_entry("BTCUSD", Side::Buy, dec!(1), "sig-1:BTCUSD:BUY")
            .await
            .unwrap();
        let second = engine
            .execute_entry("BTCUSD", Side::Buy, dec!(1), "sig-1:BTCUSD:BUY")
            .await
            .unwrap();

        assert!(first.is_placed());
        assert!(!second.is_placed());
        assert_eq!(second.fill().order_id, first.fill().order_id);
        // 주문 1건, 장부 기록 1건
        assert_eq!(exchange.order_count(), 1);
        assert_eq!(ledger.all_trades().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried_then_succeeds() {
        let exchange = Arc::new(SimulatedExchange::new());
        let ledger = Arc::new(MemoryLedger::new());
        let engine = engine_with(exchange.clone(), ledger.clone());

        exchange.push_failure(ExchangeError::Timeout("scripted".into()));

        let outcome = engine
            .execute_entry("BTCUSD", Side::Buy, dec!(1), "sig-2:BTCUSD:BUY")
            .await
            .unwrap();

        assert!(outcome.is_placed());
        assert_eq!(ledger.open_trades().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rejection_surfaces_without_ledger_write() {
        let exchange = Arc::new(SimulatedExchange::new());
        let ledger = Arc::new(MemoryLedger::new());
        let engine = engine_with(exchange.clone(), ledger.clone());

        exchange.push_failure(ExchangeError::OrderRejected("bad qty".into()));

        let result = engine
            .execute_entry("BTCUSD", Side::Buy, dec!(0), "sig-3:BTCUSD:BUY")
            .await;

        assert!(matches!(
            result,
            Err(ExecutionError::Exchange(ExchangeError::OrderRejected(_)))
        ));
        assert!(ledger.all_trades().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ledger_failure_escalates_as_unrecorded_fill() {
        let exchange = Arc::new(SimulatedExchange::new());
        let ledger = Arc::new(MemoryLedger::new());
        ledger.fail_next_insert(LedgerError::Storage("db down".into())).await;
        let engine = engine_with(exchange.clone(), ledger.clone());

        exchange.set_price("BTCUSD", dec!(50000));

        let result = engine
            .execute_entry("BTCUSD", Side::Buy, dec!(1), "sig-4:BTCUSD:BUY")
            .await;

        match result {
            Err(ExecutionError::UnrecordedFill {
                symbol,
                price,
                quantity,
                ..
            }) => {
                // 체결 내용이 그대로 격상되어야 함
                assert_eq!(symbol, "BTCUSD");
                assert_eq!(price, dec!(50000));
                assert_eq!(quantity, dec!(1));
            }
            other => panic!("expected UnrecordedFill, got {:?}", other.map(|_| ())),
        }

        // 주문은 나갔지만 장부는 비어 있음: 캐시에 넣지 않아 재시도 경로 유지
        assert_eq!(exchange.order_count(), 1);
        assert_eq!(engine.cached_key_count().await, 0);
    }

    #[tokio::test]
    async fn test_close_order_does_not_create_trade() {
        let exchange = Arc::new(SimulatedExchange::new());
        let ledger = Arc::new(MemoryLedger::new());
        let engine = engine_with(exchange.clone(), ledger.clone());

        let fill = engine
            .place_close_order("BTCUSD", Side::Sell, dec!(1), "close-1")
            .await
            .unwrap();

        assert_eq!(fill.symbol, "BTCUSD");
        assert!(ledger.all_trades().await.unwrap().is_empty());
    }
}
