//! 트레이딩 봇의 에러 타입.
//!
//! 이 모듈은 시스템 전반에서 사용되는 에러 분류를 정의합니다.
//! 각 컴포넌트는 자체 에러 타입을 가지며, 상위 계층에서 이 분류로 수렴합니다.

use thiserror::Error;

/// 핵심 봇 에러.
#[derive(Debug, Error)]
pub enum BotError {
    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 잘못된 인바운드 시그널 (클라이언트 입력 오류)
    #[error("잘못된 시그널: {0}")]
    InvalidSignal(String),

    /// 거래소가 주문을 거부함 (비즈니스 거절, 재시도 불가)
    #[error("거래소 거부: {0}")]
    ExchangeRejected(String),

    /// 거래소 연결 불가 (일시적 장애)
    #[error("거래소 연결 불가: {0}")]
    ExchangeUnavailable(String),

    /// 원장 저장소 I/O 에러
    #[error("원장 에러: {0}")]
    Persistence(String),

    /// 거래를 찾을 수 없음
    #[error("찾을 수 없음: {0}")]
    NotFound(String),

    /// 이미 종료된 거래
    #[error("이미 종료됨: {0}")]
    AlreadyClosed(String),

    /// 알림 전송 에러
    #[error("알림 에러: {0}")]
    Notification(String),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),

    /// 내부 에러
    #[error("내부 에러: {0}")]
    Internal(String),
}

/// 봇 작업을 위한 Result 타입.
pub type BotResult<T> = Result<T, BotError>;

impl BotError {
    /// 재시도 가능한 에러인지 확인합니다.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BotError::ExchangeUnavailable(_))
    }

    /// 클라이언트 입력 에러인지 확인합니다 (HTTP 4xx 대응).
    pub fn is_client_error(&self) -> bool {
        matches!(self, BotError::InvalidSignal(_))
    }

    /// 치명적인 에러인지 확인합니다.
    ///
    /// 체결 후 원장 기록 실패는 기록되지 않은 체결로 이어질 수 있어
    /// 가장 위험한 실패 유형입니다.
    pub fn is_critical(&self) -> bool {
        matches!(self, BotError::Persistence(_))
    }
}

impl From<serde_json::Error> for BotError {
    fn from(err: serde_json::Error) -> Self {
        BotError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_retryable() {
        let transient = BotError::ExchangeUnavailable("timeout".to_string());
        assert!(transient.is_retryable());

        let rejected = BotError::ExchangeRejected("insufficient margin".to_string());
        assert!(!rejected.is_retryable());
    }

    #[test]
    fn test_error_critical() {
        let persistence = BotError::Persistence("connection lost".to_string());
        assert!(persistence.is_critical());

        let not_found = BotError::NotFound("trade 42".to_string());
        assert!(!not_found.is_critical());
    }

    #[test]
    fn test_error_client() {
        let invalid = BotError::InvalidSignal("unknown topic".to_string());
        assert!(invalid.is_client_error());
        assert!(!invalid.is_retryable());
    }
}
