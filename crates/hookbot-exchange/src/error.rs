//! 거래소 에러 타입.

use hookbot_core::BotError;
use thiserror::Error;

/// 거래소 관련 에러.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// 네트워크/연결 에러
    #[error("Network error: {0}")]
    NetworkError(String),

    /// 타임아웃
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// 거래소 연결 끊김
    #[error("Disconnected: {0}")]
    Disconnected(String),

    /// 요청 한도 초과 (비즈니스 거절로 취급, 재시도하지 않음)
    #[error("Rate limit exceeded")]
    RateLimited,

    /// 인증/권한 에러
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// API 에러 코드
    #[error("API error {code}: {message}")]
    ApiError { code: i64, message: String },

    /// 주문 거부됨 (잘못된 심볼, 수량 등)
    #[error("Order rejected: {0}")]
    OrderRejected(String),

    /// 잔고/증거금 부족
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    /// 파싱/역직렬화 에러
    #[error("Parse error: {0}")]
    ParseError(String),

    /// WebSocket 에러
    #[error("WebSocket error: {0}")]
    WebSocket(String),
}

impl ExchangeError {
    /// 재시도 가능한 일시적 에러인지 확인.
    ///
    /// 전송 계층 장애만 재시도합니다. 거절(rate limit 포함)은
    /// 즉시 상위로 보고됩니다.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExchangeError::NetworkError(_)
                | ExchangeError::Timeout(_)
                | ExchangeError::Disconnected(_)
                | ExchangeError::WebSocket(_)
        )
    }

    /// 거래소의 비즈니스 거절인지 확인.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ExchangeError::RateLimited
                | ExchangeError::OrderRejected(_)
                | ExchangeError::InsufficientBalance(_)
                | ExchangeError::ApiError { .. }
        )
    }

    /// 권장 재시도 대기 시간(밀리초) 반환.
    pub fn retry_delay_ms(&self) -> Option<u64> {
        match self {
            ExchangeError::NetworkError(_) => Some(1000),
            ExchangeError::Timeout(_) => Some(500),
            ExchangeError::Disconnected(_) => Some(5000),
            ExchangeError::WebSocket(_) => Some(2000),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExchangeError::Timeout(err.to_string())
        } else {
            ExchangeError::NetworkError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        ExchangeError::ParseError(err.to_string())
    }
}

impl From<ExchangeError> for BotError {
    fn from(err: ExchangeError) -> Self {
        if err.is_rejection() {
            BotError::ExchangeRejected(err.to_string())
        } else {
            // 전송/인증 장애는 모두 연결 불가로 분류
            BotError::ExchangeUnavailable(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_are_retryable() {
        assert!(ExchangeError::NetworkError("refused".into()).is_retryable());
        assert!(ExchangeError::Timeout("5s".into()).is_retryable());
    }

    #[test]
    fn test_rejections_are_not_retryable() {
        assert!(!ExchangeError::RateLimited.is_retryable());
        assert!(!ExchangeError::OrderRejected("bad symbol".into()).is_retryable());
        assert!(!ExchangeError::Unauthorized("bad key".into()).is_retryable());
    }

    #[test]
    fn test_bot_error_mapping() {
        let rejected: BotError = ExchangeError::InsufficientBalance("margin".into()).into();
        assert!(matches!(rejected, BotError::ExchangeRejected(_)));

        let unavailable: BotError = ExchangeError::Timeout("5s".into()).into();
        assert!(matches!(unavailable, BotError::ExchangeUnavailable(_)));
    }
}
