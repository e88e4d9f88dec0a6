//! 내부 서비스.

pub mod signal_router;

pub use signal_router::{SignalOutcome, SignalRouter, WebhookData, WebhookPayload};
