//! 시뮬레이션 거래소.
//!
//! 실거래 없이 주문 체결과 포지션을 메모리에서 모의합니다.
//! 테스트와 모의투자 모드에서 사용합니다.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use hookbot_core::{OrderFill, Position, Side};
use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;

use crate::traits::{ExchangeClient, ExchangeResult};
use crate::ExchangeError;

/// 기록된 주문.
#[derive(Debug, Clone)]
pub struct RecordedOrder {
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub client_order_id: String,
}

#[derive(Debug, Default)]
struct SimulatedInner {
    /// 심볼별 현재 시장가. 미설정 심볼은 기본가로 체결.
    prices: HashMap<String, Decimal>,
    /// 심볼별 순 포지션.
    positions: HashMap<String, Position>,
    /// 제출된 주문 이력.
    orders: Vec<RecordedOrder>,
    /// 다음 호출에서 순서대로 반환할 에러 (실패 시나리오 스크립팅용).
    scripted_failures: VecDeque<ExchangeError>,
    next_order_seq: u64,
}

/// 메모리 기반 시뮬레이션 거래소.
///
/// 주문은 설정된 시장가에 즉시 전량 체결됩니다. 반대 방향 주문은
/// 기존 포지션을 상계합니다.
pub struct SimulatedExchange {
    inner: RwLock<SimulatedInner>,
    default_price: Decimal,
}

impl Default for SimulatedExchange {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedExchange {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(SimulatedInner::default()),
            default_price: Decimal::from(100),
        }
    }

    /// 심볼의 시장가 설정.
    pub fn set_price(&self, symbol: &str, price: Decimal) {
        let mut inner = self.inner.write().unwrap();
        inner.prices.insert(symbol.to_string(), price);
    }

    /// 포지션을 직접 주입합니다 (정합 시나리오 구성용).
    pub fn seed_position(&self, position: Position) {
        let mut inner = self.inner.write().unwrap();
        inner.positions.insert(position.symbol.clone(), position);
    }

    /// 다음 주문/조회 호출에서 반환할 에러를 예약합니다.
    ///
    /// 예약된 에러는 한 번 소비되면 사라집니다. 여러 개를 예약하면
    /// 호출 순서대로 소비됩니다.
    pub fn push_failure(&self, error: ExchangeError) {
        let mut inner = self.inner.write().unwrap();
        inner.scripted_failures.push_back(error);
    }

    /// 지금까지 제출된 주문 이력 반환.
    pub fn placed_orders(&self) -> Vec<RecordedOrder> {
        self.inner.read().unwrap().orders.clone()
    }

    /// 제출된 주문 수 반환.
    pub fn order_count(&self) -> usize {
        self.inner.read().unwrap().orders.len()
    }

    fn take_scripted_failure(&self) -> Option<ExchangeError> {
        self.inner.write().unwrap().scripted_failures.pop_front()
    }

    /// 체결을 포지션에 반영합니다. 반대 방향 체결은 기존 수량을 상계합니다.
    fn apply_fill(inner: &mut SimulatedInner, fill: &OrderFill) {
        match inner.positions.get_mut(&fill.symbol) {
            Some(pos) if pos.side == fill.side => {
                // 같은 방향: 평균 진입가로 합산
                let total_cost = pos.entry_price * pos.size + fill.price * fill.quantity;
                pos.size += fill.quantity;
                if pos.size > Decimal::ZERO {
                    pos.entry_price = total_cost / pos.size;
                }
            }
            Some(pos) => {
                // 반대 방향: 상계
                if fill.quantity >= pos.size {
                    let remaining = fill.quantity - pos.size;
                    if remaining > Decimal::ZERO {
                        pos.side = fill.side;
                        pos.size = remaining;
                        pos.entry_price = fill.price;
                    } else {
                        inner.positions.remove(&fill.symbol);
                    }
                } else {
                    pos.size -= fill.quantity;
                }
            }
            None => {
                inner.positions.insert(
                    fill.symbol.clone(),
                    Position {
                        symbol: fill.symbol.clone(),
                        side: fill.side,
                        size: fill.quantity,
                        entry_price: fill.price,
                    },
                );
            }
        }
    }
}

#[async_trait]
impl ExchangeClient for SimulatedExchange {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn place_market_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
        client_order_id: &str,
    ) -> ExchangeResult<OrderFill> {
        if let Some(err) = self.take_scripted_failure() {
            return Err(err);
        }

        let mut inner = self.inner.write().unwrap();
        let price = inner
            .prices
            .get(symbol)
            .copied()
            .unwrap_or(self.default_price);

        inner.next_order_seq += 1;
        let order_id = format!("sim-{}-{}", inner.next_order_seq, Uuid::new_v4());

        let fill = OrderFill {
            order_id,
            client_order_id: client_order_id.to_string(),
            symbol: symbol.to_string(),
            side,
            quantity,
            price,
            filled_at: Utc::now(),
        };

        inner.orders.push(RecordedOrder {
            symbol: symbol.to_string(),
            side,
            quantity,
            client_order_id: client_order_id.to_string(),
        });

        Self::apply_fill(&mut inner, &fill);

        debug!(symbol, %side, %quantity, %price, "모의 주문 체결");
        Ok(fill)
    }

    async fn list_positions(&self) -> ExchangeResult<Vec<Position>> {
        if let Some(err) = self.take_scripted_failure() {
            return Err(err);
        }

        let inner = self.inner.read().unwrap();
        let mut positions: Vec<Position> = inner
            .positions
            .values()
            .filter(|p| !p.is_flat())
            .cloned()
            .collect();
        positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_order_fills_at_configured_price() {
        let exchange = SimulatedExchange::new();
        exchange.set_price("BTCUSD", dec!(50000));

        let fill = exchange
            .place_market_order("BTCUSD", Side::Buy, dec!(2), "key-1")
            .await
            .unwrap();

        assert_eq!(fill.price, dec!(50000));
        assert_eq!(fill.quantity, dec!(2));
        assert_eq!(exchange.order_count(), 1);
    }

    #[tokio::test]
    async fn test_opposite_order_nets_position() {
        let exchange = SimulatedExchange::new();
        exchange.set_price("BTCUSD", dec!(50000));

        exchange
            .place_market_order("BTCUSD", Side::Buy, dec!(3), "k1")
            .await
            .unwrap();
        exchange
            .place_market_order("BTCUSD", Side::Sell, dec!(3), "k2")
            .await
            .unwrap();

        let positions = exchange.list_positions().await.unwrap();
        assert!(positions.is_empty());
    }

    #[tokio::test]
    async fn test_partial_netting_keeps_remainder() {
        let exchange = SimulatedExchange::new();
        exchange
            .place_market_order("ETHUSD", Side::Buy, dec!(5), "k1")
            .await
            .unwrap();
        exchange
            .place_market_order("ETHUSD", Side::Sell, dec!(2), "k2")
            .await
            .unwrap();

        let positions = exchange.list_positions().await.unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].side, Side::Buy);
        assert_eq!(positions[0].size, dec!(3));
    }

    #[tokio::test]
    async fn test_scripted_failures_consumed_in_order() {
        let exchange = SimulatedExchange::new();
        exchange.push_failure(ExchangeError::Timeout("scripted".into()));
        exchange.push_failure(ExchangeError::NetworkError("scripted".into()));

        let first = exchange
            .place_market_order("BTCUSD", Side::Buy, dec!(1), "k1")
            .await;
        assert!(matches!(first, Err(ExchangeError::Timeout(_))));

        let second = exchange.list_positions().await;
        assert!(matches!(second, Err(ExchangeError::NetworkError(_))));

        // 예약된 에러 소진 후에는 정상 동작
        let third = exchange
            .place_market_order("BTCUSD", Side::Buy, dec!(1), "k2")
            .await;
        assert!(third.is_ok());
    }

    #[tokio::test]
    async fn test_seeded_positions_visible() {
        let exchange = SimulatedExchange::new();
        exchange.seed_position(Position {
            symbol: "BTCUSD".to_string(),
            side: Side::Buy,
            size: dec!(1),
            entry_price: dec!(48000),
        });

        let positions = exchange.list_positions().await.unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].entry_price, dec!(48000));
    }
}
