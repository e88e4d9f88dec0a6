//! 통합 API 에러 응답 타입.
//!
//! 모든 API 엔드포인트에서 일관된 에러 형식을 제공합니다.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hookbot_core::BotError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 통합 API 에러 응답.
///
/// # 예시
///
/// ```json
/// {
///   "code": "UNKNOWN_TOPIC",
///   "message": "알 수 없는 webhook topic: order.create",
///   "timestamp": 1738300800
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// 에러 코드 (예: "UNKNOWN_TOPIC", "INVALID_SIGNAL", "EXECUTION_FAILED")
    pub code: String,
    /// 사람이 읽을 수 있는 에러 메시지
    pub message: String,
    /// 추가 에러 상세 정보 (선택적)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// 에러 발생 타임스탬프 (Unix timestamp)
    pub timestamp: i64,
}

impl ApiErrorResponse {
    /// 기본 에러 생성 (타임스탬프 포함).
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    /// 상세 정보 포함 에러 생성.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Value,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// HTTP 응답으로 변환 가능한 API 에러.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ApiErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ApiErrorResponse::new(code, message),
        }
    }

    pub fn bad_request(code: &str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn internal(code: &str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, code, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<BotError> for ApiError {
    fn from(err: BotError) -> Self {
        let (status, code) = match &err {
            BotError::InvalidSignal(_) => (StatusCode::BAD_REQUEST, "INVALID_SIGNAL"),
            BotError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            BotError::AlreadyClosed(_) => (StatusCode::CONFLICT, "ALREADY_CLOSED"),
            BotError::ExchangeRejected(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "EXCHANGE_REJECTED")
            }
            BotError::ExchangeUnavailable(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "EXCHANGE_UNAVAILABLE")
            }
            BotError::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_ERROR"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };
        Self::new(status, code, err.to_string())
    }
}

/// API 핸들러용 Result 타입.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bot_error_status_mapping() {
        let err: ApiError = BotError::InvalidSignal("missing symbol".into()).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.body.code, "INVALID_SIGNAL");

        let err: ApiError = BotError::ExchangeUnavailable("timeout".into()).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);

        let err: ApiError = BotError::Persistence("db down".into()).into();
        assert_eq!(err.body.code, "PERSISTENCE_ERROR");
    }

    #[test]
    fn test_error_response_serializes_without_empty_details() {
        let response = ApiErrorResponse::new("TEST", "message");
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("details"));
    }
}
