//! 포지션 정합 (reconciliation).
//!
//! 장부가 아니라 거래소의 실제 포지션을 기준으로 청산 계획을 세웁니다.
//! 장부는 기록이고, 포지션의 진실 원천은 거래소입니다.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use hookbot_core::{CloseAction, Position, Side, TradeId};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use crate::engine::OrderEngine;
use crate::error::ExecutionResult;

/// 청산된 거래 보고서.
///
/// PnL은 저장되지 않고 진입가/청산가에서 파생 계산됩니다.
#[derive(Debug, Clone, Serialize)]
pub struct TradeCloseReport {
    pub trade_id: TradeId,
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub pnl: Decimal,
    pub closed_at: DateTime<Utc>,
}

/// 포지션 reconciler.
///
/// 청산 주문은 엔진의 실행 경로(재시도 포함)를 그대로 사용합니다.
pub struct PositionReconciler {
    engine: Arc<OrderEngine>,
}

impl PositionReconciler {
    pub fn new(engine: Arc<OrderEngine>) -> Self {
        Self { engine }
    }

    /// 거래소의 현재 오픈 포지션을 실시간 조회합니다.
    pub async fn list_open_positions(&self) -> ExecutionResult<Vec<Position>> {
        self.engine.list_positions().await
    }

    /// 포지션 목록에서 청산 계획을 생성합니다.
    ///
    /// 각 포지션에 대해 반대 방향, 동일 수량의 시장가 주문을 계획합니다.
    /// 네트워크나 저장소를 건드리지 않는 순수 계산입니다.
    pub fn plan_closures(positions: &[Position]) -> Vec<CloseAction> {
        positions
            .iter()
            .filter(|p| !p.is_flat())
            .map(CloseAction::flatten)
            .collect()
    }

    /// 모든 오픈 포지션을 청산하고 장부를 종결합니다.
    ///
    /// 처리 순서 (포지션별):
    /// 1. 반대 방향 시장가 주문 제출 및 체결 확인
    /// 2. 해당 심볼의 오픈 거래를 장부에서 종결
    /// 3. 체결가 기준으로 실현 PnL 계산
    ///
    /// 이미 종결된 거래는 경고만 남기고 건너뜁니다. 청산 주문 자체의
    /// 실패는 즉시 반환됩니다.
    pub async fn flatten_all(&self, reason_key: &str) -> ExecutionResult<Vec<TradeCloseReport>> {
        let positions = self.list_open_positions().await?;

        if positions.is_empty() {
            info!(reason_key, "청산할 오픈 포지션 없음");
            return Ok(Vec::new());
        }

        let actions = Self::plan_closures(&positions);
        info!(
            reason_key,
            position_count = actions.len(),
            "포지션 청산 시작"
        );

        let mut reports = Vec::new();

        for action in actions {
            // 청산 주문과 장부 종결을 하나의 임계 구역으로 묶는다.
            // 락을 풀고 정산하면 그 사이에 끼어든 같은 심볼의 진입
            // 거래까지 종결시켜 버린다.
            let _guard = self.engine.lock_symbol(&action.symbol).await;

            let client_order_id = format!("{}:{}", reason_key, action.symbol);
            let fill = self
                .engine
                .place_close_order(
                    &action.symbol,
                    action.side,
                    action.quantity,
                    &client_order_id,
                )
                .await?;

            // 청산된 심볼의 오픈 거래를 장부에서 종결
            let open_trades = self
                .engine
                .ledger()
                .open_trades_for_symbol(&action.symbol)
                .await?;

            if open_trades.is_empty() {
                warn!(
                    symbol = %action.symbol,
                    "거래소 포지션은 청산됐으나 장부에 대응하는 오픈 거래 없음"
                );
            }

            for trade in open_trades {
                match self.engine.ledger().mark_closed(trade.id).await {
                    Ok(closed) => {
                        let pnl = closed.realized_pnl(fill.price);
                        info!(
                            trade_id = closed.id,
                            symbol = %closed.symbol,
                            entry_price = %closed.entry_price,
                            exit_price = %fill.price,
                            %pnl,
                            "거래 종결"
                        );
                        reports.push(TradeCloseReport {
                            trade_id: closed.id,
                            symbol: closed.symbol.clone(),
                            side: closed.side,
                            quantity: closed.quantity,
                            entry_price: closed.entry_price,
                            exit_price: fill.price,
                            pnl,
                            closed_at: closed.closed_at.unwrap_or(fill.filled_at),
                        });
                    }
                    Err(hookbot_ledger::LedgerError::AlreadyClosed(id)) => {
                        // 경합으로 이미 종결된 거래는 치명적이지 않음
                        warn!(trade_id = id, "거래가 이미 종결되어 있음, 건너뜀");
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use hookbot_core::{NewTrade, Trade};
    use hookbot_exchange::{ExchangeClient, ExchangeError, RetryConfig, SimulatedExchange};
    use hookbot_ledger::{LedgerResult, MemoryLedger, TradeLedger};
    use rust_decimal_macros::dec;

    fn setup() -> (Arc<SimulatedExchange>, Arc<MemoryLedger>, PositionReconciler) {
        let exchange = Arc::new(SimulatedExchange::new());
        let ledger = Arc::new(MemoryLedger::new());
        let engine = Arc::new(OrderEngine::new(
            exchange.clone(),
            ledger.clone(),
            RetryConfig::fast(),
        ));
        (exchange, ledger, PositionReconciler::new(engine))
    }

    #[test]
    fn test_plan_closures_inverts_sides() {
        let positions = vec![
            Position {
                symbol: "BTCUSD".into(),
                side: Side::Buy,
                size: dec!(2),
                entry_price: dec!(50000),
            },
            Position {
                symbol: "ETHUSD".into(),
                side: Side::Sell,
                size: dec!(10),
                entry_price: dec!(3000),
            },
        ];

        let actions = PositionReconciler::plan_closures(&positions);
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].side, Side::Sell);
        assert_eq!(actions[0].quantity, dec!(2));
        assert_eq!(actions[1].side, Side::Buy);
        assert_eq!(actions[1].quantity, dec!(10));
    }

    #[test]
    fn test_plan_closures_skips_flat() {
        let positions = vec![Position {
            symbol: "BTCUSD".into(),
            side: Side::Buy,
            size: dec!(0),
            entry_price: dec!(0),
        }];
        assert!(PositionReconciler::plan_closures(&positions).is_empty());
    }

    #[tokio::test]
    async fn test_flatten_all_closes_positions_and_ledger() {
        let (exchange, ledger, reconciler) = setup();

        // 포지션 2개 + 대응하는 장부 거래
        exchange.seed_position(Position {
            symbol: "BTCUSD".into(),
            side: Side::Buy,
            size: dec!(1),
            entry_price: dec!(50000),
        });
        exchange.seed_position(Position {
            symbol: "ETHUSD".into(),
            side: Side::Sell,
            size: dec!(5),
            entry_price: dec!(3000),
        });
        ledger
            .insert(NewTrade::new("BTCUSD", Side::Buy, dec!(1), dec!(50000)))
            .await
            .unwrap();
        ledger
            .insert(NewTrade::new("ETHUSD", Side::Sell, dec!(5), dec!(3000)))
            .await
            .unwrap();

        exchange.set_price("BTCUSD", dec!(55000));
        exchange.set_price("ETHUSD", dec!(2900));

        let reports = reconciler.flatten_all("sig-9").await.unwrap();

        // 포지션당 청산 주문 1건
        assert_eq!(exchange.order_count(), 2);
        assert_eq!(reports.len(), 2);

        // 롱 +5000, 숏 +500 (파생 계산, 저장 안 함)
        let btc = reports.iter().find(|r| r.symbol == "BTCUSD").unwrap();
        assert_eq!(btc.pnl, dec!(5000));
        let eth = reports.iter().find(|r| r.symbol == "ETHUSD").unwrap();
        assert_eq!(eth.pnl, dec!(500));

        // 거래소와 장부 모두 비어야 함
        assert!(exchange.list_positions().await.unwrap().is_empty());
        assert!(ledger.open_trades().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_flatten_with_no_positions_is_noop() {
        let (exchange, _ledger, reconciler) = setup();
        let reports = reconciler.flatten_all("sig-10").await.unwrap();
        assert!(reports.is_empty());
        assert_eq!(exchange.order_count(), 0);
    }

    #[tokio::test]
    async fn test_already_closed_trade_is_skipped() {
        let (exchange, ledger, reconciler) = setup();

        exchange.seed_position(Position {
            symbol: "BTCUSD".into(),
            side: Side::Buy,
            size: dec!(1),
            entry_price: dec!(50000),
        });
        let id = ledger
            .insert(NewTrade::new("BTCUSD", Side::Buy, dec!(1), dec!(50000)))
            .await
            .unwrap();
        // 정합 직전에 다른 경로로 이미 종결됨
        ledger.mark_closed(id).await.unwrap();

        let reports = reconciler.flatten_all("sig-11").await.unwrap();

        // 청산 주문은 나가지만 이미 종결된 거래는 보고서에 없음
        assert_eq!(exchange.order_count(), 1);
        assert!(reports.is_empty());
    }

    /// 정산 읽기를 지연시키는 원장 래퍼. 임계 구역 검증용.
    struct SlowSettlementLedger {
        inner: Arc<MemoryLedger>,
        delay: Duration,
    }

    #[async_trait]
    impl TradeLedger for SlowSettlementLedger {
        async fn insert(&self, trade: NewTrade) -> LedgerResult<TradeId> {
            self.inner.insert(trade).await
        }

        async fn mark_closed(&self, id: TradeId) -> LedgerResult<Trade> {
            self.inner.mark_closed(id).await
        }

        async fn get(&self, id: TradeId) -> LedgerResult<Trade> {
            self.inner.get(id).await
        }

        async fn open_trades(&self) -> LedgerResult<Vec<Trade>> {
            self.inner.open_trades().await
        }

        async fn open_trades_for_symbol(&self, symbol: &str) -> LedgerResult<Vec<Trade>> {
            tokio::time::sleep(self.delay).await;
            self.inner.open_trades_for_symbol(symbol).await
        }

        async fn all_trades(&self) -> LedgerResult<Vec<Trade>> {
            self.inner.all_trades().await
        }
    }

    #[tokio::test]
    async fn test_concurrent_entry_waits_for_settlement() {
        let exchange = Arc::new(SimulatedExchange::new());
        let memory = Arc::new(MemoryLedger::new());
        let ledger = Arc::new(SlowSettlementLedger {
            inner: memory.clone(),
            delay: Duration::from_millis(50),
        });
        let engine = Arc::new(OrderEngine::new(
            exchange.clone(),
            ledger,
            RetryConfig::fast(),
        ));
        let reconciler = Arc::new(PositionReconciler::new(engine.clone()));

        exchange.seed_position(Position {
            symbol: "BTCUSD".into(),
            side: Side::Buy,
            size: dec!(1),
            entry_price: dec!(50000),
        });
        memory
            .insert(NewTrade::new("BTCUSD", Side::Buy, dec!(1), dec!(50000)))
            .await
            .unwrap();
        exchange.set_price("BTCUSD", dec!(55000));

        let flatten = {
            let reconciler = reconciler.clone();
            tokio::spawn(async move { reconciler.flatten_all("sig-13").await })
        };

        // 청산 체결 후 정산 읽기가 지연되는 동안 같은 심볼 진입 시도
        tokio::time::sleep(Duration::from_millis(10)).await;
        let entry = {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .execute_entry("BTCUSD", Side::Buy, dec!(1), "sig-14:BTCUSD:BUY")
                    .await
            })
        };

        let reports = flatten.await.unwrap().unwrap();
        let outcome = entry.await.unwrap().unwrap();

        // 청산 보고서는 원래 거래 1건만 포함해야 함
        assert_eq!(reports.len(), 1);
        assert!(outcome.is_placed());

        // 새 진입은 청산 이후에 실행되어 거래소 포지션과 장부 모두
        // 오픈 상태로 남아야 함
        let open = memory.open_trades().await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(exchange.list_positions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_close_order_failure_propagates() {
        let (exchange, ledger, reconciler) = setup();

        exchange.seed_position(Position {
            symbol: "BTCUSD".into(),
            side: Side::Buy,
            size: dec!(1),
            entry_price: dec!(50000),
        });
        ledger
            .insert(NewTrade::new("BTCUSD", Side::Buy, dec!(1), dec!(50000)))
            .await
            .unwrap();

        exchange.push_failure(ExchangeError::OrderRejected("reduce only".into()));

        let result = reconciler.flatten_all("sig-12").await;

        // 에러는 삼켜지지 않고 전파되며 장부는 오픈 상태를 유지
        assert!(matches!(
            result,
            Err(crate::ExecutionError::Exchange(
                ExchangeError::OrderRejected(_)
            ))
        ));
        assert_eq!(ledger.open_trades().await.unwrap().len(), 1);
    }
}
