//! 심볼 단위 직렬화 락.
//!
//! 같은 심볼에 대한 주문 실행을 직렬화해 경합 상태를 방지합니다.
//! 서로 다른 심볼은 동시에 진행할 수 있습니다.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// 심볼별 비동기 락 레지스트리.
#[derive(Default)]
pub struct SymbolLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl SymbolLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 심볼 락을 획득합니다. 반환된 가드가 drop될 때까지 같은 심볼의
    /// 다른 호출자는 대기합니다.
    pub async fn acquire(&self, symbol: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap();
            locks
                .entry(symbol.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
