//! 텔레그램 알림 서비스.
//!
//! Telegram Bot API를 통해 거래 이벤트 알림을 전송합니다.
//! 전송은 최선 노력(best-effort)이며, 실패해도 거래 처리를 막지 않습니다.

use crate::types::{
    Notification, NotificationError, NotificationEvent, NotificationPriority, NotificationResult,
    NotificationSender,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

/// 텔레그램 알림 전송 설정.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// @BotFather에서 받은 봇 토큰
    pub bot_token: String,
    /// 메시지를 보낼 채팅 ID
    pub chat_id: String,
    /// 전송 활성화 여부
    pub enabled: bool,
    /// 파싱 모드 (HTML 또는 MarkdownV2)
    pub parse_mode: String,
    /// API 기본 URL 재정의 (테스트용)
    pub api_base_override: Option<String>,
}

impl TelegramConfig {
    /// 새 텔레그램 설정을 생성합니다.
    pub fn new(bot_token: String, chat_id: String) -> Self {
        Self {
            bot_token,
            chat_id,
            enabled: true,
            parse_mode: "HTML".to_string(),
            api_base_override: None,
        }
    }

    /// 환경 변수에서 설정을 생성합니다.
    pub fn from_env() -> Option<Self> {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN").ok()?;
        let chat_id = std::env::var("TELEGRAM_CHAT_ID").ok()?;
        let enabled = std::env::var("TELEGRAM_ENABLED")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(true);

        let mut config = Self::new(bot_token, chat_id);
        config.enabled = enabled;
        Some(config)
    }

    fn api_base(&self) -> &str {
        self.api_base_override
            .as_deref()
            .unwrap_or("https://api.telegram.org")
    }
}

/// 텔레그램 알림 전송기.
pub struct TelegramSender {
    config: TelegramConfig,
    client: reqwest::Client,
}

impl TelegramSender {
    /// 새 텔레그램 전송기를 생성합니다.
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// 환경 변수에서 전송기를 생성합니다.
    pub fn from_env() -> Option<Self> {
        TelegramConfig::from_env().map(Self::new)
    }

    /// 알림을 텔레그램 메시지로 포맷합니다.
    fn format_message(&self, notification: &Notification) -> String {
        let priority_emoji = match notification.priority {
            NotificationPriority::Low => "ℹ️",
            NotificationPriority::Normal => "📊",
            NotificationPriority::High => "⚠️",
            NotificationPriority::Critical => "🚨",
        };

        let content = match &notification.event {
            NotificationEvent::SignalReceived {
                signal_id,
                symbol,
                side,
            } => {
                format!(
                    "📡 <b>신호 수신</b>\n\n\
                     심볼: <code>{symbol}</code>\n\
                     방향: {side}\n\
                     신호ID: <code>{signal_id}</code>"
                )
            }

            NotificationEvent::OrderFilled {
                symbol,
                side,
                quantity,
                price,
                order_id,
            } => {
                let side_emoji = if side.to_lowercase() == "buy" {
                    "🟢"
                } else {
                    "🔴"
                };
                format!(
                    "{side_emoji} <b>주문 체결</b>\n\n\
                     심볼: <code>{symbol}</code>\n\
                     방향: {side}\n\
                     수량: {quantity}\n\
                     가격: {price}\n\
                     주문ID: <code>{order_id}</code>"
                )
            }

            NotificationEvent::PositionClosed {
                symbol,
                side,
                quantity,
                entry_price,
                exit_price,
                pnl,
            } => {
                let pnl_emoji = if *pnl >= Decimal::ZERO {
                    "💰"
                } else {
                    "📉"
                };
                let pnl_sign = if *pnl >= Decimal::ZERO { "+" } else { "" };
                format!(
                    "{pnl_emoji} <b>포지션 청산</b>\n\n\
                     심볼: <code>{symbol}</code>\n\
                     방향: {side}\n\
                     수량: {quantity}\n\
                     진입가: {entry_price}\n\
                     청산가: {exit_price}\n\
                     손익: <b>{pnl_sign}{pnl}</b>"
                )
            }

            NotificationEvent::SignalFailed {
                signal_id,
                symbol,
                reason,
            } => {
                format!(
                    "🛑 <b>신호 처리 실패</b>\n\n\
                     심볼: <code>{symbol}</code>\n\
                     신호ID: <code>{signal_id}</code>\n\
                     사유: {reason}"
                )
            }

            NotificationEvent::SystemError {
                error_code,
                message,
            } => {
                format!(
                    "🚨 <b>시스템 오류</b>\n\n\
                     코드: <code>{error_code}</code>\n\
                     메시지: {message}"
                )
            }

            NotificationEvent::Custom { title, message } => {
                format!("{priority_emoji} <b>{title}</b>\n\n{message}")
            }
        };

        let timestamp = notification.timestamp.format("%Y-%m-%d %H:%M:%S UTC");
        format!("{content}\n\n<i>🕐 {timestamp}</i>")
    }

    /// 텔레그램에 원시 메시지를 전송합니다.
    async fn send_message(&self, text: &str) -> NotificationResult<()> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.config.api_base(),
            self.config.bot_token
        );

        let params = serde_json::json!({
            "chat_id": self.config.chat_id,
            "text": text,
            "parse_mode": self.config.parse_mode,
            "disable_web_page_preview": true,
        });

        debug!(
            "Sending Telegram message to chat_id: {}",
            self.config.chat_id
        );

        let response = self
            .client
            .post(&url)
            .json(&params)
            .send()
            .await
            .map_err(NotificationError::NetworkError)?;

        if response.status().is_success() {
            info!("Telegram notification sent successfully");
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            // 요청 한도 제한 확인
            if status.as_u16() == 429 {
                warn!("Telegram rate limited");
                return Err(NotificationError::RateLimited(60));
            }

            error!("Failed to send Telegram message: {} - {}", status, body);
            Err(NotificationError::SendFailed(format!(
                "HTTP {}: {}",
                status, body
            )))
        }
    }
}

#[async_trait]
impl NotificationSender for TelegramSender {
    async fn send(&self, notification: &Notification) -> NotificationResult<()> {
        if !self.is_enabled() {
            debug!("Telegram notifications are disabled, skipping");
            return Ok(());
        }

        let message = self.format_message(notification);
        self.send_message(&message).await
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled && !self.config.bot_token.is_empty() && !self.config.chat_id.is_empty()
    }

    fn name(&self) -> &str {
        "telegram"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_sender() -> TelegramSender {
        let config = TelegramConfig::new("test_token".to_string(), "123456".to_string());
        TelegramSender::new(config)
    }

    #[test]
    fn test_format_order_filled() {
        let sender = test_sender();
        let notification = Notification::new(NotificationEvent::OrderFilled {
            symbol: "BTCUSD".to_string(),
            side: "buy".to_string(),
            quantity: dec!(1),
            price: dec!(50000),
            order_id: "ord-1".to_string(),
        });

        let message = sender.format_message(&notification);
        assert!(message.contains("주문 체결"));
        assert!(message.contains("BTCUSD"));
        assert!(message.contains("50000"));
    }

    #[test]
    fn test_format_position_closed_loss() {
        let sender = test_sender();
        let notification = Notification::new(NotificationEvent::PositionClosed {
            symbol: "ETHUSD".to_string(),
            side: "buy".to_string(),
            quantity: dec!(1),
            entry_price: dec!(3000),
            exit_price: dec!(2900),
            pnl: dec!(-100),
        });

        let message = sender.format_message(&notification);
        assert!(message.contains("포지션 청산"));
        assert!(message.contains("📉"));
        assert!(message.contains("-100"));
    }

    #[test]
    fn test_disabled_sender_is_noop() {
        let mut config = TelegramConfig::new("token".to_string(), "123".to_string());
        config.enabled = false;
        let sender = TelegramSender::new(config);
        assert!(!sender.is_enabled());
    }

    #[tokio::test]
    async fn test_send_posts_to_api() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/bottest_token/sendMessage")
            .with_status(200)
            .with_body(r#"{"ok": true}"#)
            .create_async()
            .await;

        let mut config = TelegramConfig::new("test_token".to_string(), "123".to_string());
        config.api_base_override = Some(server.url());
        let sender = TelegramSender::new(config);

        let notification = Notification::new(NotificationEvent::Custom {
            title: "테스트".to_string(),
            message: "내용".to_string(),
        });

        sender.send(&notification).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limit_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/bottest_token/sendMessage")
            .with_status(429)
            .with_body(r#"{"ok": false}"#)
            .create_async()
            .await;

        let mut config = TelegramConfig::new("test_token".to_string(), "123".to_string());
        config.api_base_override = Some(server.url());
        let sender = TelegramSender::new(config);

        let notification = Notification::new(NotificationEvent::Custom {
            title: "t".to_string(),
            message: "m".to_string(),
        });

        let result = sender.send(&notification).await;
        assert!(matches!(result, Err(NotificationError::RateLimited(_))));
    }
}
