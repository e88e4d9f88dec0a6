//! 설정 관리.
//!
//! 애플리케이션 설정을 정의하고 환경 변수에서 로드합니다.
//! 거래소/알림 자격증명은 해당 크레이트의 설정 타입에서 관리합니다.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// HTTP 서버 설정
    pub server: ServerConfig,
    /// 트레이딩 설정
    pub trading: TradingConfig,
    /// 데이터베이스 설정
    pub database: DatabaseConfig,
}

impl AppConfig {
    /// 환경 변수에서 전체 설정을 로드합니다.
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig::from_env(),
            trading: TradingConfig::from_env(),
            database: DatabaseConfig::from_env(),
        }
    }
}

/// HTTP 서버 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// 리스닝할 포트
    pub port: u16,
    /// 웹훅 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            request_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    /// 환경 변수에서 설정 로드.
    ///
    /// - `API_HOST`: 바인딩 호스트 (기본값: 127.0.0.1)
    /// - `API_PORT`: 포트 (기본값: 3000)
    /// - `REQUEST_TIMEOUT_SECS`: 요청 타임아웃 (기본값: 30)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(defaults.request_timeout_secs),
        }
    }
}

/// 트레이딩 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TradingConfig {
    /// 매수 시그널에 사용할 기본 주문 수량 (계약 수)
    pub default_quantity: Decimal,
    /// 허용할 웹훅 topic
    pub webhook_topic: String,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            default_quantity: Decimal::ONE,
            webhook_topic: "notification.create".to_string(),
        }
    }
}

impl TradingConfig {
    /// 환경 변수에서 설정 로드.
    ///
    /// - `DEFAULT_ORDER_QUANTITY`: 기본 주문 수량 (기본값: 1)
    /// - `WEBHOOK_TOPIC`: 허용 topic (기본값: "notification.create")
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_quantity: std::env::var("DEFAULT_ORDER_QUANTITY")
                .ok()
                .and_then(|q| q.parse().ok())
                .unwrap_or(defaults.default_quantity),
            webhook_topic: std::env::var("WEBHOOK_TOPIC").unwrap_or(defaults.webhook_topic),
        }
    }
}

/// 데이터베이스 설정.
///
/// `url`이 없으면 인메모리 원장을 사용합니다.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// PostgreSQL 연결 URL (없으면 인메모리 원장 사용)
    pub url: Option<String>,
    /// 최대 연결 수
    pub max_connections: u32,
    /// 연결 타임아웃 (초)
    pub connection_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            connection_timeout_secs: 30,
        }
    }
}

impl DatabaseConfig {
    /// 환경 변수에서 설정 로드.
    ///
    /// - `DATABASE_URL`: PostgreSQL URL (선택)
    /// - `DATABASE_MAX_CONNECTIONS`: 최대 연결 수 (기본값: 10)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: std::env::var("DATABASE_URL").ok(),
            max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.max_connections),
            connection_timeout_secs: defaults.connection_timeout_secs,
        }
    }
}
