//! 원장에 기록되는 거래 엔티티.
//!
//! 이 모듈은 거래 기록 관련 타입을 정의합니다:
//! - `Trade` - 오픈/종료된 거래 한 건
//! - `TradeStatus` - 거래 상태 (Open/Closed)
//! - `NewTrade` - 원장 삽입 입력

use crate::domain::Side;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 원장이 할당하는 거래 ID (단조 증가).
pub type TradeId = i64;

/// 거래 상태.
///
/// Open에서 Closed로 정확히 한 번 전이하며, Closed는 종료 상태입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    /// 오픈 상태 (청산 대기)
    Open,
    /// 종료됨 (재오픈 불가)
    Closed,
}

impl TradeStatus {
    /// 문자열로 변환.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TradeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            _ => Err(format!("Unknown trade status: {}", s)),
        }
    }
}

/// 체결 확인 후 원장에 기록되는 거래 한 건.
///
/// `entry_price`는 거래소가 확인한 체결 가격이며 생성 후 불변입니다.
/// 손익은 저장하지 않고 진입가/청산가에서 파생합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    /// 원장 할당 ID
    pub id: TradeId,
    /// 거래 심볼
    pub symbol: String,
    /// 오픈 액션의 방향
    pub side: Side,
    /// 계약 수량
    pub quantity: Decimal,
    /// 진입 가격 (거래소 확인 체결가)
    pub entry_price: Decimal,
    /// 거래 상태
    pub status: TradeStatus,
    /// 오픈 타임스탬프
    pub opened_at: DateTime<Utc>,
    /// 종료 타임스탬프 (오픈 상태면 None)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl Trade {
    /// 거래가 오픈 상태인지 확인합니다.
    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }

    /// 주어진 청산 가격에 대한 실현 손익을 계산합니다.
    ///
    /// - 매수(롱) 거래: `(청산가 - 진입가) * 수량`
    /// - 매도(숏) 거래: `(진입가 - 청산가) * 수량`
    pub fn realized_pnl(&self, exit_price: Decimal) -> Decimal {
        let price_diff = match self.side {
            Side::Buy => exit_price - self.entry_price,
            Side::Sell => self.entry_price - exit_price,
        };
        price_diff * self.quantity
    }

    /// 진입 시점의 명목 가치를 반환합니다.
    pub fn entry_notional_value(&self) -> Decimal {
        self.entry_price * self.quantity
    }
}

/// 원장 삽입을 위한 새 거래 입력.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTrade {
    /// 거래 심볼
    pub symbol: String,
    /// 오픈 액션의 방향
    pub side: Side,
    /// 계약 수량
    pub quantity: Decimal,
    /// 진입 가격 (거래소 확인 체결가)
    pub entry_price: Decimal,
}

impl NewTrade {
    /// 새 거래 입력을 생성합니다.
    pub fn new(
        symbol: impl Into<String>,
        side: Side,
        quantity: Decimal,
        entry_price: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            quantity,
            entry_price,
        }
    }
}
