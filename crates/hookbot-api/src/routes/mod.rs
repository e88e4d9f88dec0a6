//! API 라우트.
//!
//! 모든 REST API 엔드포인트를 정의하고 라우터를 구성합니다.
//!
//! # 라우트 구조
//!
//! - `/health` - 헬스 체크 (liveness)
//! - `/health/ready` - 상세 헬스 체크 (readiness)
//! - `/webhook` - 인바운드 시그널 수신
//! - `/api/v1/trades` - 거래 원장 조회

pub mod health;
pub mod trades;
pub mod webhook;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

pub use health::{health_router, ComponentHealth, ComponentStatus, HealthResponse};
pub use trades::{trades_router, TradeResponse, TradesListResponse};
pub use webhook::{webhook_router, WebhookResponse};

/// 전체 API 라우터 생성.
pub fn create_api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/health", health_router())
        .merge(webhook_router())
        .nest("/api/v1/trades", trades_router())
        .with_state(state)
}
