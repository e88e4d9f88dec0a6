//! 최선 노력(best-effort) 알림.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - [`NotificationSender`] trait 및 텔레그램 구현
//! - 여러 전송기를 묶는 [`NotificationManager`]
//! - 거래 처리를 차단하지 않는 백그라운드 전송 헬퍼
//!
//! 알림 실패는 절대 거래 파이프라인의 결과에 영향을 주지 않습니다.

pub mod telegram;
pub mod types;

use std::sync::Arc;

use tracing::{debug, error};

pub use telegram::{TelegramConfig, TelegramSender};
pub use types::{
    Notification, NotificationError, NotificationEvent, NotificationPriority, NotificationResult,
    NotificationSender,
};

/// 여러 전송기를 관리하는 알림 관리자.
pub struct NotificationManager {
    senders: Vec<Box<dyn NotificationSender>>,
}

impl NotificationManager {
    /// 새 알림 관리자를 생성합니다.
    pub fn new() -> Self {
        Self {
            senders: Vec::new(),
        }
    }

    /// 알림 전송기를 추가합니다.
    pub fn add_sender<S: NotificationSender + 'static>(&mut self, sender: S) {
        self.senders.push(Box::new(sender));
    }

    /// 등록된 활성 전송기 수를 반환합니다.
    pub fn enabled_count(&self) -> usize {
        self.senders.iter().filter(|s| s.is_enabled()).count()
    }

    /// 활성화된 모든 전송기를 통해 알림을 전송합니다.
    ///
    /// 개별 전송기의 실패는 로그로 남기고 계속 진행합니다.
    pub async fn notify(&self, notification: &Notification) {
        for sender in &self.senders {
            if !sender.is_enabled() {
                continue;
            }
            if let Err(e) = sender.send(notification).await {
                error!(
                    sender = sender.name(),
                    error = %e,
                    "알림 전송 실패 (거래 처리에는 영향 없음)"
                );
            }
        }
    }
}

impl Default for NotificationManager {
    fn default() -> Self {
        Self::new()
    }
}

/// 알림을 백그라운드 태스크로 전송합니다.
///
/// 호출자는 전송 완료를 기다리지 않습니다. 활성 전송기가 없으면
/// 태스크를 생성하지 않습니다.
pub fn notify_in_background(manager: &Arc<NotificationManager>, notification: Notification) {
    if manager.enabled_count() == 0 {
        debug!("활성 알림 전송기 없음, 전송 생략");
        return;
    }

    let manager = manager.clone();
    tokio::spawn(async move {
        manager.notify(&notification).await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct RecordingSender {
        sent: Arc<AtomicU32>,
        fail: bool,
        enabled: bool,
    }

    #[async_trait]
    impl NotificationSender for RecordingSender {
        async fn send(&self, _notification: &Notification) -> NotificationResult<()> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(NotificationError::SendFailed("scripted".into()))
            } else {
                Ok(())
            }
        }

        fn is_enabled(&self) -> bool {
            self.enabled
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_other_senders() {
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));

        let mut manager = NotificationManager::new();
        manager.add_sender(RecordingSender {
            sent: first.clone(),
            fail: true,
            enabled: true,
        });
        manager.add_sender(RecordingSender {
            sent: second.clone(),
            fail: false,
            enabled: true,
        });

        let notification = Notification::new(NotificationEvent::Custom {
            title: "t".into(),
            message: "m".into(),
        });
        manager.notify(&notification).await;

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disabled_sender_is_skipped() {
        let sent = Arc::new(AtomicU32::new(0));
        let mut manager = NotificationManager::new();
        manager.add_sender(RecordingSender {
            sent: sent.clone(),
            fail: false,
            enabled: false,
        });

        assert_eq!(manager.enabled_count(), 0);

        let notification = Notification::new(NotificationEvent::Custom {
            title: "t".into(),
            message: "m".into(),
        });
        manager.notify(&notification).await;

        assert_eq!(sent.load(Ordering::SeqCst), 0);
    }
}
