//! 거래소가 보고하는 포지션.
//!
//! 이 모듈은 포지션 정합 관련 타입을 정의합니다:
//! - `Position` - 거래소 조회 결과 (이 시스템에서는 읽기 전용)
//! - `CloseAction` - 포지션을 상쇄하는 청산 주문 계획

use crate::domain::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 거래소가 보고하는 오픈 포지션.
///
/// 정합(reconciliation) 입력으로만 사용하며, 원장의 거래 상태에 대해
/// 권위를 갖지 않습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// 거래 심볼
    pub symbol: String,
    /// 포지션 방향 (롱 = Buy, 숏 = Sell)
    pub side: Side,
    /// 포지션 크기 (계약 수)
    pub size: Decimal,
    /// 거래소가 보고한 평균 진입 가격
    pub entry_price: Decimal,
}

impl Position {
    /// 포지션이 비어있는지 확인합니다.
    pub fn is_flat(&self) -> bool {
        self.size.is_zero()
    }
}

/// 오픈 포지션 하나를 정확히 상쇄하는 청산 주문 계획.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseAction {
    /// 거래 심볼
    pub symbol: String,
    /// 청산 주문 방향 (포지션의 반대)
    pub side: Side,
    /// 청산 수량 (포지션 크기와 동일)
    pub quantity: Decimal,
}

impl CloseAction {
    /// 포지션을 상쇄하는 청산 액션을 생성합니다.
    ///
    /// Buy 포지션에는 같은 크기의 Sell을, Sell 포지션에는 같은 크기의
    /// Buy를 발행합니다.
    pub fn flatten(position: &Position) -> Self {
        Self {
            symbol: position.symbol.clone(),
            side: position.side.opposite(),
            quantity: position.size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_flatten_long_position() {
        let position = Position {
            symbol: "BTCUSD".to_string(),
            side: Side::Buy,
            size: dec!(3),
            entry_price: dec!(50000),
        };

        let action = CloseAction::flatten(&position);
        assert_eq!(action.side, Side::Sell);
        assert_eq!(action.quantity, dec!(3));
        assert_eq!(action.symbol, "BTCUSD");
    }

    #[test]
    fn test_flatten_short_position() {
        let position = Position {
            symbol: "ETHUSD".to_string(),
            side: Side::Sell,
            size: dec!(2),
            entry_price: dec!(3000),
        };

        let action = CloseAction::flatten(&position);
        assert_eq!(action.side, Side::Buy);
        assert_eq!(action.quantity, dec!(2));
    }
}
