//! 트레이딩 웹훅 봇 API 서버.
//!
//! Axum 기반 REST API 서버를 시작합니다.
//! 웹훅 수신, 헬스 체크, 거래 원장 조회 엔드포인트를 제공합니다.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use hookbot_api::routes::create_api_router;
use hookbot_api::state::AppState;
use hookbot_core::config::AppConfig;
use hookbot_core::logging::init_logging_from_env;
use hookbot_exchange::{
    BybitClient, BybitConfig, BybitPositionStream, ExchangeClient, PositionStreamEvent,
    RetryConfig, SimulatedExchange,
};
use hookbot_execution::{OrderEngine, PositionReconciler};
use hookbot_ledger::{MemoryLedger, PgLedger, TradeLedger};
use hookbot_notification::{NotificationManager, TelegramSender};

/// 거래소 클라이언트 생성.
///
/// Bybit 자격증명이 환경변수에 있으면 실거래 클라이언트를, 없으면
/// 시뮬레이션 거래소를 사용합니다.
fn create_exchange() -> Arc<dyn ExchangeClient> {
    match BybitClient::from_env() {
        Some(client) => {
            info!("Bybit client created from environment");
            Arc::new(client)
        }
        None => {
            warn!(
                "Bybit API not configured. Set BYBIT_API_KEY, BYBIT_API_SECRET to enable. \
                 Using simulated exchange."
            );
            Arc::new(SimulatedExchange::new())
        }
    }
}

/// 거래 원장 생성.
///
/// `DATABASE_URL`이 설정되어 있으면 PostgreSQL 원장을, 없으면
/// 인메모리 원장을 사용합니다. 반환되는 풀은 readiness probe에서
/// 재사용됩니다.
async fn create_ledger(config: &AppConfig) -> (Arc<dyn TradeLedger>, Option<sqlx::PgPool>) {
    let Some(database_url) = &config.database.url else {
        warn!("DATABASE_URL not set, trades will not survive restarts");
        return (Arc::new(MemoryLedger::new()), None);
    };

    match PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(config.database.connection_timeout_secs))
        .connect(database_url)
        .await
    {
        Ok(pool) => {
            let ledger = PgLedger::new(pool.clone());
            match ledger.migrate().await {
                Ok(()) => {
                    info!("Connected to PostgreSQL, trades table ready");
                    (Arc::new(ledger), Some(pool))
                }
                Err(e) => {
                    error!(error = %e, "Failed to run ledger migration, falling back to memory");
                    (Arc::new(MemoryLedger::new()), None)
                }
            }
        }
        Err(e) => {
            error!(error = %e, "Failed to connect to database, falling back to memory");
            (Arc::new(MemoryLedger::new()), None)
        }
    }
}

/// 알림 관리자 생성.
fn create_notifier() -> Arc<NotificationManager> {
    let mut manager = NotificationManager::new();

    match TelegramSender::from_env() {
        Some(sender) => {
            info!("Telegram notifications enabled");
            manager.add_sender(sender);
        }
        None => {
            warn!("TELEGRAM_BOT_TOKEN/TELEGRAM_CHAT_ID not set, notifications disabled");
        }
    }

    Arc::new(manager)
}

/// 실시간 포지션 스트림 시작 (관측용).
///
/// 스트림 이벤트는 로그로만 소비됩니다. 주문/기록 결정은 항상
/// REST 실시간 조회를 기준으로 합니다.
fn start_position_stream() {
    let Some(config) = BybitConfig::from_env() else {
        return;
    };

    tokio::spawn(async move {
        let mut stream = BybitPositionStream::new(config);

        if let Err(e) = stream.connect().await {
            warn!(error = %e, "Position stream connection failed");
            return;
        }
        if let Err(e) = stream.run().await {
            warn!(error = %e, "Position stream startup failed");
            return;
        }

        while let Some(event) = stream.next_event().await {
            match event {
                PositionStreamEvent::Connected => info!("Position stream connected"),
                PositionStreamEvent::Disconnected => {
                    warn!("Position stream disconnected");
                    break;
                }
                PositionStreamEvent::PositionUpdate(positions) => {
                    info!(count = positions.len(), "Position update received");
                }
                PositionStreamEvent::Error(e) => {
                    warn!(error = %e, "Position stream error");
                    break;
                }
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    // tracing 초기화
    init_logging_from_env()?;

    info!("Starting hookbot API server...");

    // 설정 로드
    let config = AppConfig::from_env();
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| {
            error!(
                host = %config.server.host,
                port = config.server.port,
                "소켓 주소 설정이 유효하지 않습니다. API_HOST, API_PORT 환경변수를 확인하세요."
            );
            e
        })?;

    // 컴포넌트 초기화
    let exchange = create_exchange();
    let (ledger, db_pool) = create_ledger(&config).await;
    let notifier = create_notifier();

    let engine = Arc::new(OrderEngine::new(
        exchange,
        ledger.clone(),
        RetryConfig::default(),
    ));
    let reconciler = Arc::new(PositionReconciler::new(engine.clone()));

    let mut state = AppState::new(
        engine,
        reconciler,
        ledger,
        notifier,
        config.trading.clone(),
    );
    if let Some(pool) = db_pool {
        state = state.with_db_pool(pool);
    }
    let state = Arc::new(state);

    info!(
        version = %state.version,
        has_db = state.db_pool.is_some(),
        notifier_count = state.notifier.enabled_count(),
        webhook_topic = %state.trading.webhook_topic,
        "Application state initialized"
    );

    // 실시간 포지션 스트림 (Bybit 설정 시)
    start_position_stream();

    // 라우터 생성
    let app = create_api_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )));

    // 서버 시작
    info!(%addr, "API server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped gracefully");

    Ok(())
}

/// Graceful shutdown 시그널 대기.
///
/// Ctrl+C 또는 SIGTERM 시그널을 수신하면 새 요청 수락을 중단하고
/// 진행 중인 요청 완료를 기다립니다.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
