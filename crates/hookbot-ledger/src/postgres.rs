//! PostgreSQL 원장 구현.
//!
//! 거래 생성과 상태 전이를 위한 데이터베이스 작업을 처리합니다.
//! 행 단위 원자성은 단일 UPDATE 문의 상태 가드로 보장합니다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use tracing::{debug, info};

use hookbot_core::{NewTrade, Trade, TradeId, TradeStatus};

use crate::{LedgerError, LedgerResult, TradeLedger};

/// trades 테이블의 데이터베이스 표현.
#[derive(Debug, Clone, FromRow)]
struct TradeRow {
    id: i64,
    symbol: String,
    side: String,
    quantity: Decimal,
    entry_price: Decimal,
    status: String,
    opened_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
}

impl TryFrom<TradeRow> for Trade {
    type Error = LedgerError;

    fn try_from(row: TradeRow) -> Result<Self, Self::Error> {
        let side = row
            .side
            .parse()
            .map_err(|e: String| LedgerError::Storage(format!("corrupt side column: {}", e)))?;
        let status: TradeStatus = row
            .status
            .parse()
            .map_err(|e: String| LedgerError::Storage(format!("corrupt status column: {}", e)))?;

        Ok(Trade {
            id: row.id,
            symbol: row.symbol,
            side,
            quantity: row.quantity,
            entry_price: row.entry_price,
            status,
            opened_at: row.opened_at,
            closed_at: row.closed_at,
        })
    }
}

/// PostgreSQL 기반 거래 원장.
///
/// ID는 BIGSERIAL로 단조 증가하며, 거래 행은 삭제되지 않습니다.
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    /// 기존 연결 풀로 원장을 생성합니다.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// trades 테이블이 없으면 생성합니다.
    pub async fn migrate(&self) -> LedgerResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trades (
                id          BIGSERIAL PRIMARY KEY,
                symbol      TEXT NOT NULL,
                side        TEXT NOT NULL,
                quantity    NUMERIC NOT NULL,
                entry_price NUMERIC NOT NULL,
                status      TEXT NOT NULL DEFAULT 'open',
                opened_at   TIMESTAMPTZ NOT NULL DEFAULT now(),
                closed_at   TIMESTAMPTZ
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_trades_open_symbol
             ON trades (symbol) WHERE status = 'open'",
        )
        .execute(&self.pool)
        .await?;

        info!("trades 테이블 마이그레이션 완료");
        Ok(())
    }
}

#[async_trait]
impl TradeLedger for PgLedger {
    async fn insert(&self, trade: NewTrade) -> LedgerResult<TradeId> {
        let row = sqlx::query_as::<_, TradeRow>(
            r#"
            INSERT INTO trades (symbol, side, quantity, entry_price, status)
            VALUES ($1, $2, $3, $4, 'open')
            RETURNING *
            "#,
        )
        .bind(&trade.symbol)
        .bind(trade.side.to_string())
        .bind(trade.quantity)
        .bind(trade.entry_price)
        .fetch_one(&self.pool)
        .await?;

        debug!(trade_id = row.id, symbol = %row.symbol, "거래 기록됨");
        Ok(row.id)
    }

    async fn mark_closed(&self, id: TradeId) -> LedgerResult<Trade> {
        // 상태 가드가 포함된 단일 UPDATE로 첫 종료만 성공시킨다
        let updated = sqlx::query_as::<_, TradeRow>(
            r#"
            UPDATE trades
            SET status = 'closed', closed_at = now()
            WHERE id = $1 AND status = 'open'
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = updated {
            debug!(trade_id = id, "거래 종료됨");
            return row.try_into();
        }

        // 갱신 실패: 존재하지 않는지, 이미 종료됐는지 구분
        let existing = sqlx::query_as::<_, TradeRow>("SELECT * FROM trades WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match existing {
            Some(_) => Err(LedgerError::AlreadyClosed(id)),
            None => Err(LedgerError::NotFound(id)),
        }
    }

    async fn get(&self, id: TradeId) -> LedgerResult<Trade> {
        let row = sqlx::query_as::<_, TradeRow>("SELECT * FROM trades WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(LedgerError::NotFound(id))?;

        row.try_into()
    }

    async fn open_trades(&self) -> LedgerResult<Vec<Trade>> {
        let rows = sqlx::query_as::<_, TradeRow>(
            "SELECT * FROM trades WHERE status = 'open' ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Trade::try_from).collect()
    }

    async fn open_trades_for_symbol(&self, symbol: &str) -> LedgerResult<Vec<Trade>> {
        let rows = sqlx::query_as::<_, TradeRow>(
            "SELECT * FROM trades WHERE status = 'open' AND symbol = $1 ORDER BY id",
        )
        .bind(symbol)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Trade::try_from).collect()
    }

    async fn all_trades(&self) -> LedgerResult<Vec<Trade>> {
        let rows = sqlx::query_as::<_, TradeRow>("SELECT * FROM trades ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Trade::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_conversion_rejects_corrupt_side() {
        let row = TradeRow {
            id: 1,
            symbol: "BTCUSD".to_string(),
            side: "HOLD".to_string(),
            quantity: Decimal::ONE,
            entry_price: Decimal::new(50000, 0),
            status: "open".to_string(),
            opened_at: Utc::now(),
            closed_at: None,
        };

        assert!(matches!(
            Trade::try_from(row),
            Err(LedgerError::Storage(_))
        ));
    }

    #[test]
    fn test_row_conversion_roundtrip() {
        let row = TradeRow {
            id: 7,
            symbol: "ETHUSD".to_string(),
            side: "SELL".to_string(),
            quantity: Decimal::TWO,
            entry_price: Decimal::new(3000, 0),
            status: "closed".to_string(),
            opened_at: Utc::now(),
            closed_at: Some(Utc::now()),
        };

        let trade = Trade::try_from(row).unwrap();
        assert_eq!(trade.id, 7);
        assert_eq!(trade.status, TradeStatus::Closed);
    }
}
