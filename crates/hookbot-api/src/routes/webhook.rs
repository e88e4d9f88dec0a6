//! 웹훅 수신 endpoint.
//!
//! 외부 시그널 소스(알림 서비스)가 보내는 매매 지시를 수신합니다.
//! POST /webhook

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::ApiError;
use crate::services::{SignalOutcome, SignalRouter, WebhookPayload};
use crate::state::AppState;

/// 웹훅 처리 응답.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// 처리된 시그널 ID
    pub signal_id: String,
    /// 최종 시그널 상태 ("COMPLETED")
    pub state: String,
    /// 실행 결과
    pub outcome: SignalOutcome,
}

/// 인바운드 시그널 처리.
///
/// - 200: 처리 완료 (청산 대상 0건 포함)
/// - 400: 인식되지 않은 topic 또는 형식 오류
/// - 500: 실행 실패 (거래소/장부 장애)
///
/// 주문/장부 작업은 별도 태스크에서 실행됩니다. 업스트림 타임아웃
/// 등으로 요청 future가 중간에 drop되어도 제출된 주문의 장부 기록은
/// 중단되지 않고 완료됩니다.
pub async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<WebhookPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    // 파싱 불가능한 본문은 topic 오류와 구분해 보고
    let Json(payload) = payload.map_err(|rejection| {
        warn!(error = %rejection, "웹훅 본문 파싱 실패");
        ApiError::bad_request("MALFORMED_PAYLOAD", rejection.body_text())
    })?;

    info!(topic = %payload.topic, "웹훅 수신");

    let router = SignalRouter::new(
        state.engine.clone(),
        state.reconciler.clone(),
        state.notifier.clone(),
        state.trading.clone(),
    );

    let signal = router.validate(&payload).map_err(|rejection| {
        warn!(%rejection, "시그널 거부됨");
        ApiError::bad_request("SIGNAL_REJECTED", rejection.to_string())
    })?;

    // 요청이 취소되어도 실행이 살아남도록 spawn 후 JoinHandle을 기다림
    let dispatch = {
        let signal = signal.clone();
        tokio::spawn(async move { router.dispatch(&signal).await })
    };

    let outcome = dispatch
        .await
        .map_err(|e| {
            error!(error = %e, "시그널 처리 태스크가 비정상 종료됨");
            ApiError::internal("DISPATCH_FAILED", "signal dispatch task aborted")
        })?
        .map_err(|e| {
            let api_err: ApiError = hookbot_core::BotError::from(e).into();
            api_err
        })?;

    Ok((
        StatusCode::OK,
        Json(WebhookResponse {
            signal_id: signal.id,
            state: "COMPLETED".to_string(),
            outcome,
        }),
    ))
}

/// 웹훅 라우터 생성.
pub fn webhook_router() -> Router<Arc<AppState>> {
    Router::new().route("/webhook", post(receive_webhook))
}
