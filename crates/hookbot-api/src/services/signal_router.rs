//! 시그널 라우터.
//!
//! 웹훅 페이로드를 검증해 시그널로 변환하고, 방향에 따라 실행
//! 컴포넌트로 라우팅합니다:
//! - BUY → 주문 실행 엔진 (기본 수량 시장가 진입)
//! - SELL → 포지션 reconciler (전체 청산)
//!
//! 시그널은 `Received → Validated → Dispatched → Completed | Failed`
//! 상태를 순서대로 거칩니다.

use std::sync::Arc;

use hookbot_core::config::TradingConfig;
use hookbot_core::{Side, Signal, SignalRejection, SignalState};
use hookbot_execution::{ExecutionError, ExecutionOutcome, OrderEngine, PositionReconciler, TradeCloseReport};
use hookbot_notification::{
    notify_in_background, Notification, NotificationEvent, NotificationManager,
    NotificationPriority,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// 인바운드 웹훅 페이로드.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub topic: String,
    pub data: WebhookData,
}

/// 웹훅 페이로드 본문.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookData {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub recommendation: Option<String>,
    /// 소스가 제공하는 시그널 ID (중복 제거용)
    #[serde(default)]
    pub id: Option<String>,
}

/// 시그널 처리 결과.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SignalOutcome {
    /// 진입 주문 체결
    Entered {
        trade_id: i64,
        symbol: String,
        quantity: rust_decimal::Decimal,
        price: rust_decimal::Decimal,
        order_id: String,
    },
    /// 중복 시그널, 주문 생략
    DuplicateIgnored { order_id: String },
    /// 포지션 청산 (0건일 수 있음)
    Flattened { reports: Vec<TradeCloseReport> },
}

/// 시그널 라우터.
pub struct SignalRouter {
    engine: Arc<OrderEngine>,
    reconciler: Arc<PositionReconciler>,
    notifier: Arc<NotificationManager>,
    trading: TradingConfig,
}

impl SignalRouter {
    pub fn new(
        engine: Arc<OrderEngine>,
        reconciler: Arc<PositionReconciler>,
        notifier: Arc<NotificationManager>,
        trading: TradingConfig,
    ) -> Self {
        Self {
            engine,
            reconciler,
            notifier,
            trading,
        }
    }

    /// 페이로드를 검증해 시그널로 변환합니다.
    ///
    /// 인식되지 않은 topic과 형식 오류는 서로 다른 거부 사유로
    /// 보고됩니다. 어느 쪽도 조용히 무시되지 않습니다.
    pub fn validate(&self, payload: &WebhookPayload) -> Result<Signal, SignalRejection> {
        if payload.topic != self.trading.webhook_topic {
            return Err(SignalRejection::UnknownTopic {
                topic: payload.topic.clone(),
            });
        }

        let symbol = match payload.data.symbol.as_deref() {
            Some(s) if !s.trim().is_empty() => s.trim().to_string(),
            _ => return Err(SignalRejection::MissingSymbol),
        };

        let recommendation = payload.data.recommendation.as_deref().unwrap_or("");
        let side: Side = recommendation.parse().map_err(|_| {
            SignalRejection::InvalidRecommendation {
                value: recommendation.to_string(),
            }
        })?;

        Ok(Signal::new(
            payload.topic.clone(),
            symbol,
            side,
            payload.data.id.clone(),
        ))
    }

    /// 검증된 시그널을 실행 컴포넌트로 라우팅합니다.
    pub async fn dispatch(&self, signal: &Signal) -> Result<SignalOutcome, ExecutionError> {
        let mut state = SignalState::Validated;
        debug_assert!(state.can_transition_to(SignalState::Dispatched));
        state = SignalState::Dispatched;
        info!(signal_id = %signal.id, symbol = %signal.symbol, %state, "시그널 전달");

        let result = match signal.side {
            Side::Buy => self.dispatch_entry(signal).await,
            Side::Sell => self.dispatch_flatten(signal).await,
        };

        match &result {
            Ok(_) => {
                state = SignalState::Completed;
                info!(signal_id = %signal.id, %state, "시그널 처리 완료");
            }
            Err(e) => {
                state = SignalState::Failed;
                error!(signal_id = %signal.id, %state, error = %e, "시그널 처리 실패");
                self.notify_failure(signal, e);
            }
        }

        result
    }

    /// BUY: 기본 수량 시장가 진입.
    async fn dispatch_entry(&self, signal: &Signal) -> Result<SignalOutcome, ExecutionError> {
        let outcome = self
            .engine
            .execute_entry(
                &signal.symbol,
                Side::Buy,
                self.trading.default_quantity,
                &signal.idempotency_key(),
            )
            .await?;

        match outcome {
            ExecutionOutcome::Placed { fill, trade_id } => {
                notify_in_background(
                    &self.notifier,
                    Notification::new(NotificationEvent::OrderFilled {
                        symbol: fill.symbol.clone(),
                        side: fill.side.to_string(),
                        quantity: fill.quantity,
                        price: fill.price,
                        order_id: fill.order_id.clone(),
                    }),
                );
                Ok(SignalOutcome::Entered {
                    trade_id,
                    symbol: fill.symbol,
                    quantity: fill.quantity,
                    price: fill.price,
                    order_id: fill.order_id,
                })
            }
            ExecutionOutcome::Duplicate { fill } => {
                warn!(
                    signal_id = %signal.id,
                    order_id = %fill.order_id,
                    "중복 시그널 무시됨"
                );
                Ok(SignalOutcome::DuplicateIgnored {
                    order_id: fill.order_id,
                })
            }
        }
    }

    /// SELL: 거래소 실포지션 기준 전체 청산.
    async fn dispatch_flatten(&self, signal: &Signal) -> Result<SignalOutcome, ExecutionError> {
        let reports = self.reconciler.flatten_all(&signal.idempotency_key()).await?;

        for report in &reports {
            notify_in_background(
                &self.notifier,
                Notification::new(NotificationEvent::PositionClosed {
                    symbol: report.symbol.clone(),
                    side: report.side.to_string(),
                    quantity: report.quantity,
                    entry_price: report.entry_price,
                    exit_price: report.exit_price,
                    pnl: report.pnl,
                })
                .with_priority(if report.pnl.is_sign_negative() {
                    NotificationPriority::High
                } else {
                    NotificationPriority::Normal
                }),
            );
        }

        Ok(SignalOutcome::Flattened { reports })
    }

    /// 실패 알림 (최선 노력, 처리 결과에 영향 없음).
    fn notify_failure(&self, signal: &Signal, error: &ExecutionError) {
        let priority = if error.is_critical() {
            NotificationPriority::Critical
        } else {
            NotificationPriority::High
        };

        notify_in_background(
            &self.notifier,
            Notification::new(NotificationEvent::SignalFailed {
                signal_id: signal.id.clone(),
                symbol: signal.symbol.clone(),
                reason: error.to_string(),
            })
            .with_priority(priority),
        );
    }
}
