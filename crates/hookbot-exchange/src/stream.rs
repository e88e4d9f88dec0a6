//! Bybit 실시간 포지션 WebSocket 스트림.
//!
//! 프라이빗 WebSocket 채널을 통해 포지션 변경 이벤트를 수신합니다.
//! 수신된 이벤트는 관측용으로만 소비됩니다. 주문/기록 결정은 항상
//! REST 실시간 조회를 기준으로 합니다.

use std::time::{SystemTime, UNIX_EPOCH};

use futures::{SinkExt, StreamExt};
use hmac::{Hmac, Mac};
use hookbot_core::{Position, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, info};

use crate::bybit::BybitConfig;
use crate::traits::ExchangeResult;
use crate::ExchangeError;

type HmacSha256 = Hmac<Sha256>;

// ============================================================================
// WebSocket 메시지 타입
// ============================================================================

/// Bybit WebSocket 요청 메시지 (인증/구독 공용).
#[derive(Debug, Serialize)]
struct WsRequest {
    op: String,
    args: Vec<String>,
}

/// Bybit 토픽 푸시 메시지.
#[derive(Debug, Deserialize)]
struct WsTopicMessage {
    topic: String,
    data: Vec<WsPositionData>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct WsPositionData {
    symbol: String,
    side: String,
    size: Decimal,
    entry_price: Decimal,
}

/// 포지션 스트림 이벤트.
#[derive(Debug, Clone)]
pub enum PositionStreamEvent {
    /// 연결 성립 및 구독 완료
    Connected,
    /// 서버 또는 네트워크에 의한 연결 종료
    Disconnected,
    /// 포지션 변경 푸시
    PositionUpdate(Vec<Position>),
    /// 스트림 에러
    Error(String),
}

// ============================================================================
// Bybit 포지션 스트림
// ============================================================================

/// Bybit 프라이빗 포지션 스트림.
pub struct BybitPositionStream {
    config: BybitConfig,
    ws: Option<WebSocketStream<MaybeTlsStream<TcpStream>>>,
    event_rx: Option<mpsc::Receiver<PositionStreamEvent>>,
    event_tx: Option<mpsc::Sender<PositionStreamEvent>>,
}

impl BybitPositionStream {
    /// 새 포지션 스트림을 생성합니다.
    pub fn new(config: BybitConfig) -> Self {
        let (tx, rx) = mpsc::channel(100);
        Self {
            config,
            ws: None,
            event_rx: Some(rx),
            event_tx: Some(tx),
        }
    }

    /// WebSocket 서버에 연결하고 인증합니다.
    pub async fn connect(&mut self) -> ExchangeResult<()> {
        let url = self.config.ws_base_url();
        info!("Connecting to Bybit WebSocket: {}", url);

        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| ExchangeError::WebSocket(e.to_string()))?;

        self.ws = Some(ws_stream);
        self.authenticate().await?;
        self.subscribe_positions().await?;

        info!("Connected to Bybit WebSocket");
        Ok(())
    }

    /// 연결을 해제합니다.
    pub async fn disconnect(&mut self) -> ExchangeResult<()> {
        if let Some(mut ws) = self.ws.take() {
            ws.close(None)
                .await
                .map_err(|e| ExchangeError::WebSocket(e.to_string()))?;
        }
        info!("Disconnected from Bybit WebSocket");
        Ok(())
    }

    /// 프라이빗 채널 인증 메시지를 전송합니다.
    ///
    /// 서명 대상은 `GET/realtime{expires}` 문자열입니다.
    async fn authenticate(&mut self) -> ExchangeResult<()> {
        let expires = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
            + 5000;

        let payload = format!("GET/realtime{}", expires);
        let mut mac = HmacSha256::new_from_slice(self.config.api_secret.as_bytes())
            .map_err(|e| ExchangeError::Unauthorized(format!("invalid api secret: {}", e)))?;
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        let msg = WsRequest {
            op: "auth".to_string(),
            args: vec![
                self.config.api_key.clone(),
                expires.to_string(),
                signature,
            ],
        };

        self.send_request(&msg).await
    }

    /// 포지션 토픽을 구독합니다.
    async fn subscribe_positions(&mut self) -> ExchangeResult<()> {
        let msg = WsRequest {
            op: "subscribe".to_string(),
            args: vec!["position".to_string()],
        };
        info!("Subscribing to position topic");
        self.send_request(&msg).await
    }

    async fn send_request(&mut self, msg: &WsRequest) -> ExchangeResult<()> {
        let json = serde_json::to_string(msg)
            .map_err(|e| ExchangeError::ParseError(e.to_string()))?;

        if let Some(ws) = &mut self.ws {
            ws.send(Message::Text(json.into()))
                .await
                .map_err(|e| ExchangeError::WebSocket(e.to_string()))?;
            Ok(())
        } else {
            Err(ExchangeError::Disconnected("Not connected".to_string()))
        }
    }

    /// 토픽 푸시 메시지를 이벤트로 파싱합니다.
    fn parse_message(text: &str) -> Option<PositionStreamEvent> {
        let msg = serde_json::from_str::<WsTopicMessage>(text).ok()?;
        if msg.topic != "position" {
            return None;
        }

        let positions = msg
            .data
            .into_iter()
            .filter(|d| d.size > Decimal::ZERO && d.side != "None")
            .filter_map(|d| {
                let side = match d.side.as_str() {
                    "Buy" => Side::Buy,
                    "Sell" => Side::Sell,
                    _ => return None,
                };
                Some(Position {
                    symbol: d.symbol,
                    side,
                    size: d.size,
                    entry_price: d.entry_price,
                })
            })
            .collect();

        Some(PositionStreamEvent::PositionUpdate(positions))
    }

    /// 메시지 처리 루프를 시작합니다.
    pub async fn run(&mut self) -> ExchangeResult<()> {
        let tx = self
            .event_tx
            .take()
            .ok_or_else(|| ExchangeError::WebSocket("Event sender not available".to_string()))?;

        let ws = self
            .ws
            .take()
            .ok_or_else(|| ExchangeError::Disconnected("Not connected".to_string()))?;

        let (_write, mut read) = ws.split();

        let _ = tx.send(PositionStreamEvent::Connected).await;

        // 수신 메시지를 처리하는 태스크 생성
        tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        if let Some(event) = Self::parse_message(&text) {
                            if tx.send(event).await.is_err() {
                                error!("Failed to send event to channel");
                                break;
                            }
                        }
                    }
                    Ok(Message::Ping(_)) => {
                        debug!("Received ping");
                        // Pong은 tungstenite에서 자동으로 처리됨
                    }
                    Ok(Message::Close(_)) => {
                        info!("WebSocket closed by server");
                        let _ = tx.send(PositionStreamEvent::Disconnected).await;
                        break;
                    }
                    Err(e) => {
                        error!("WebSocket error: {}", e);
                        let _ = tx.send(PositionStreamEvent::Error(e.to_string())).await;
                        break;
                    }
                    _ => {}
                }
            }
        });

        Ok(())
    }

    /// 다음 이벤트를 수신합니다. 스트림 종료 시 `None`을 반환합니다.
    pub async fn next_event(&mut self) -> Option<PositionStreamEvent> {
        if let Some(rx) = &mut self.event_rx {
            rx.recv().await
        } else {
            None
        }
    }
}
