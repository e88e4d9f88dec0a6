//! 거래 원장 조회 endpoint.
//!
//! GET /api/v1/trades?status=open|closed

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use hookbot_core::{Trade, TradeStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// 거래 조회 쿼리 파라미터.
#[derive(Debug, Deserialize)]
pub struct TradesQuery {
    /// 상태 필터 ("open" | "closed")
    pub status: Option<String>,
}

/// 거래 응답.
#[derive(Debug, Serialize)]
pub struct TradeResponse {
    pub id: i64,
    pub symbol: String,
    pub side: String,
    pub quantity: Decimal,
    pub entry_price: Decimal,
    /// 진입 시점 명목 가치 (진입가 * 수량)
    pub entry_notional: Decimal,
    pub status: String,
    pub opened_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl From<Trade> for TradeResponse {
    fn from(trade: Trade) -> Self {
        let entry_notional = trade.entry_notional_value();
        Self {
            id: trade.id,
            symbol: trade.symbol,
            side: trade.side.to_string(),
            quantity: trade.quantity,
            entry_price: trade.entry_price,
            entry_notional,
            status: trade.status.to_string(),
            opened_at: trade.opened_at,
            closed_at: trade.closed_at,
        }
    }
}

/// 거래 목록 응답.
#[derive(Debug, Serialize)]
pub struct TradesListResponse {
    pub trades: Vec<TradeResponse>,
    pub total: usize,
}

/// 거래 목록 조회.
pub async fn list_trades(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TradesQuery>,
) -> ApiResult<Json<TradesListResponse>> {
    let trades = match query.status.as_deref() {
        None => state.ledger.all_trades().await,
        Some(raw) => {
            let status: TradeStatus = raw.parse().map_err(|_| {
                ApiError::bad_request(
                    "INVALID_STATUS",
                    format!("지원하지 않는 status 필터: {}", raw),
                )
            })?;
            match status {
                TradeStatus::Open => state.ledger.open_trades().await,
                TradeStatus::Closed => state.ledger.all_trades().await.map(|trades| {
                    trades
                        .into_iter()
                        .filter(|t| t.status == TradeStatus::Closed)
                        .collect()
                }),
            }
        }
    }
    .map_err(|e| ApiError::from(hookbot_core::BotError::from(e)))?;

    let trades: Vec<TradeResponse> = trades.into_iter().map(TradeResponse::from).collect();
    let total = trades.len();

    Ok(Json(TradesListResponse { trades, total }))
}

/// 거래 조회 라우터 생성.
pub fn trades_router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(list_trades))
}
