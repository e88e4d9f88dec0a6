//! 웹훅 시그널 라우터 및 REST API 서버.
//!
//! 외부 알림 소스의 매매 지시를 수신해 주문 실행/포지션 정합
//! 컴포넌트로 라우팅하고, 거래 원장 조회와 헬스 체크 엔드포인트를
//! 제공합니다.

pub mod error;
pub mod routes;
pub mod services;
pub mod state;

pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use routes::create_api_router;
pub use state::AppState;
