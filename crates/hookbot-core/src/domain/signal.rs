//! 인바운드 웹훅 시그널.
//!
//! 이 모듈은 외부 알림 소스가 보내는 매매 지시 관련 타입을 정의합니다:
//! - `Signal` - 검증된 시그널 엔티티
//! - `SignalState` - 시그널 처리 상태 기계
//! - `SignalRejection` - 검증 실패 분류

use crate::domain::Side;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 검증을 통과한 인바운드 시그널.
///
/// 전략/지표 내용은 해석하지 않습니다. 시그널은 불투명한 매수/매도
/// 지시로만 취급됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// 시그널 ID (웹훅이 제공하지 않으면 생성됨)
    pub id: String,
    /// 시그널 topic
    pub topic: String,
    /// 거래 심볼
    pub symbol: String,
    /// 시그널 방향
    pub side: Side,
}

impl Signal {
    /// 새 시그널을 생성합니다.
    ///
    /// `id`가 없으면 새 UUID를 생성합니다. 이 경우 재전송된 동일
    /// 웹훅을 중복으로 식별할 수 없습니다 (호출자가 id를 제공해야
    /// 중복 제거가 가능).
    pub fn new(
        topic: impl Into<String>,
        symbol: impl Into<String>,
        side: Side,
        id: Option<String>,
    ) -> Self {
        Self {
            id: id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            topic: topic.into(),
            symbol: symbol.into(),
            side,
        }
    }

    /// 시그널 정체성에서 파생한 멱등성 키를 반환합니다.
    ///
    /// 동일한 시그널이 재전송되어도 같은 키가 나오므로, 주문 실행
    /// 엔진이 중복 주문을 차단할 수 있습니다.
    pub fn idempotency_key(&self) -> String {
        format!("{}:{}:{}", self.id, self.symbol, self.side)
    }
}

/// 시그널 검증 실패 분류.
///
/// 인식되지 않은 topic과 형식 오류는 둘 다 실패지만 서로 다른
/// 상세로 보고됩니다. 어느 쪽도 no-op 성공으로 처리하지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalRejection {
    /// 인식되지 않은 topic
    UnknownTopic { topic: String },
    /// 심볼 누락 또는 비어있음
    MissingSymbol,
    /// 파싱 불가능한 방향
    InvalidRecommendation { value: String },
}

impl std::fmt::Display for SignalRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalRejection::UnknownTopic { topic } => {
                write!(f, "인식되지 않은 topic: {}", topic)
            }
            SignalRejection::MissingSymbol => write!(f, "심볼 누락"),
            SignalRejection::InvalidRecommendation { value } => {
                write!(f, "파싱 불가능한 recommendation: {}", value)
            }
        }
    }
}

/// 시그널 하나의 처리 상태.
///
/// 전이: `Received → Validated → Dispatched → Completed | Failed`.
/// Validated 이전의 실패도 Failed로 전이합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalState {
    /// 수신됨 (검증 전)
    Received,
    /// 검증 통과
    Validated,
    /// 실행 컴포넌트로 전달됨
    Dispatched,
    /// 처리 완료
    Completed,
    /// 처리 실패 (종료 상태)
    Failed,
}

impl SignalState {
    /// 주어진 상태로의 전이가 유효한지 확인합니다.
    pub fn can_transition_to(&self, next: SignalState) -> bool {
        matches!(
            (self, next),
            (SignalState::Received, SignalState::Validated)
                | (SignalState::Received, SignalState::Failed)
                | (SignalState::Validated, SignalState::Dispatched)
                | (SignalState::Validated, SignalState::Failed)
                | (SignalState::Dispatched, SignalState::Completed)
                | (SignalState::Dispatched, SignalState::Failed)
        )
    }

    /// 종료 상태인지 확인합니다.
    pub fn is_final(&self) -> bool {
        matches!(self, SignalState::Completed | SignalState::Failed)
    }
}

impl std::fmt::Display for SignalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalState::Received => write!(f, "RECEIVED"),
            SignalState::Validated => write!(f, "VALIDATED"),
            SignalState::Dispatched => write!(f, "DISPATCHED"),
            SignalState::Completed => write!(f, "COMPLETED"),
            SignalState::Failed => write!(f, "FAILED"),
        }
    }
}
