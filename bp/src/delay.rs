//! Delay provider
//!
//! Exploration, ticket issuance and the service phase all stand in for real
//! work with a blocking-for-duration call. The core only depends on the
//! [`Delay`] trait so tests can swap the clock out.

use std::time::Duration;

use async_trait::async_trait;

/// Blocks the calling actor for a duration
#[async_trait]
pub trait Delay: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real delay backed by the tokio timer.
///
/// Under a paused test clock this advances virtual time instead of waiting.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Zero-duration delay
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDelay;

#[async_trait]
impl Delay for NoDelay {
    async fn sleep(&self, _duration: Duration) {
        tokio::task::yield_now().await;
    }
}
