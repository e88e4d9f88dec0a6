//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! AppState는 모든 API 핸들러에서 공유되는 상태를 관리합니다.
//! Arc로 래핑되어 여러 요청 간에 안전하게 공유됩니다.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use hookbot_core::config::TradingConfig;
use hookbot_execution::{OrderEngine, PositionReconciler};
use hookbot_ledger::TradeLedger;
use hookbot_notification::NotificationManager;

/// 애플리케이션 공유 상태.
///
/// 이 구조체는 모든 API 핸들러에서 접근할 수 있는 공유 리소스를 포함합니다.
/// Axum의 State extractor를 통해 핸들러에 주입됩니다.
#[derive(Clone)]
pub struct AppState {
    /// 주문 실행 엔진 - 멱등성, 재시도, 장부 기록
    pub engine: Arc<OrderEngine>,

    /// 포지션 reconciler - 청산 계획 및 실행
    pub reconciler: Arc<PositionReconciler>,

    /// 거래 원장 - 조회용 직접 참조
    pub ledger: Arc<dyn TradeLedger>,

    /// 알림 관리자 - 최선 노력 전송
    pub notifier: Arc<NotificationManager>,

    /// 거래 설정 (기본 수량, webhook topic)
    pub trading: TradingConfig,

    /// 데이터베이스 연결 풀 (readiness probe용)
    pub db_pool: Option<sqlx::PgPool>,

    /// API 버전
    pub version: String,

    /// 서버 시작 시각
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// 새 애플리케이션 상태를 생성합니다.
    pub fn new(
        engine: Arc<OrderEngine>,
        reconciler: Arc<PositionReconciler>,
        ledger: Arc<dyn TradeLedger>,
        notifier: Arc<NotificationManager>,
        trading: TradingConfig,
    ) -> Self {
        Self {
            engine,
            reconciler,
            ledger,
            notifier,
            trading,
            db_pool: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Utc::now(),
        }
    }

    /// 데이터베이스 풀을 설정합니다.
    pub fn with_db_pool(mut self, pool: sqlx::PgPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    /// 서버 업타임(초)을 반환합니다.
    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }

    /// 데이터베이스 연결 상태를 확인합니다.
    pub async fn is_db_healthy(&self) -> bool {
        match &self.db_pool {
            Some(pool) => sqlx::query("SELECT 1").fetch_one(pool).await.is_ok(),
            None => false,
        }
    }
}

/// 테스트용 상태 생성.
///
/// 시뮬레이션 거래소와 인메모리 원장을 사용합니다. 시나리오 구성을
/// 위해 거래소와 원장 핸들을 함께 반환합니다.
pub fn create_test_state() -> (
    AppState,
    Arc<hookbot_exchange::SimulatedExchange>,
    Arc<hookbot_ledger::MemoryLedger>,
) {
    use hookbot_exchange::{RetryConfig, SimulatedExchange};
    use hookbot_ledger::MemoryLedger;

    let exchange = Arc::new(SimulatedExchange::new());
    let ledger = Arc::new(MemoryLedger::new());
    let engine = Arc::new(OrderEngine::new(
        exchange.clone(),
        ledger.clone(),
        RetryConfig::fast(),
    ));
    let reconciler = Arc::new(PositionReconciler::new(engine.clone()));
    let notifier = Arc::new(NotificationManager::new());

    let state = AppState::new(
        engine,
        reconciler,
        ledger.clone(),
        notifier,
        TradingConfig::default(),
    );

    (state, exchange, ledger)
}
