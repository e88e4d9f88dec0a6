//! 거래소 trait 정의.

use async_trait::async_trait;
use hookbot_core::{OrderFill, Position, Side};
use rust_decimal::Decimal;

use crate::ExchangeError;

/// 거래소 작업을 위한 Result 타입.
pub type ExchangeResult<T> = Result<T, ExchangeError>;

/// 주문 제출 및 포지션 조회 인터페이스.
///
/// 자격증명을 가진 클라이언트는 공유되어 재사용됩니다.
/// 요청마다 새로 생성하지 않습니다.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// 거래소 이름 반환.
    fn name(&self) -> &str;

    /// 시장가 주문을 제출하고 확인된 체결을 반환합니다.
    ///
    /// `client_order_id`는 멱등성 추적을 위해 거래소로 전달됩니다.
    /// 반환되는 체결 가격은 요청 가격이 아니라 거래소가 확인한
    /// 실제 체결 가격입니다.
    async fn place_market_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
        client_order_id: &str,
    ) -> ExchangeResult<OrderFill>;

    /// 현재 오픈 포지션을 실시간 조회합니다.
    ///
    /// 캐시된 데이터를 실시간인 것처럼 반환하지 않습니다.
    /// 조회 실패는 그대로 에러로 보고됩니다.
    async fn list_positions(&self) -> ExchangeResult<Vec<Position>>;
}
