//! API server probe controller
//!
//! Verifies the Kubernetes API server is reachable before the broker
//! reports `Initialized`, then polls `/version` on a fixed interval while
//! started. Failures during polling are logged and exported as a gauge;
//! they never fail the broker.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use kube::Client;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

use super::Controller;
use crate::broker::BrokerContext;
use crate::metrics;

/// Tunables for [`ApiProbe`]
#[derive(Debug, Clone)]
pub struct ApiProbeSettings {
    /// Attempts made during `init` before giving up
    pub init_attempts: u32,
    /// First retry delay during `init`; doubles per attempt
    pub base_delay: Duration,
    /// Upper bound for the retry delay
    pub max_delay: Duration,
    /// Poll interval between `start` and `stop`
    pub interval: Duration,
}

impl Default for ApiProbeSettings {
    fn default() -> Self {
        Self {
            init_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            interval: Duration::from_secs(30),
        }
    }
}

pub struct ApiProbe {
    ctx: BrokerContext,
    settings: ApiProbeSettings,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

impl ApiProbe {
    pub const NAME: &'static str = "api-probe";

    pub fn new(ctx: BrokerContext, settings: ApiProbeSettings) -> Self {
        Self {
            ctx,
            settings,
            cancel: None,
            task: None,
        }
    }

    pub fn is_polling(&self) -> bool {
        self.task.is_some()
    }
}

#[async_trait]
impl Controller for ApiProbe {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn init(&mut self) -> anyhow::Result<()> {
        let client = self.ctx.client()?;
        let attempts = self.settings.init_attempts.max(1);

        let mut attempt = 0;
        loop {
            match client.apiserver_version().await {
                Ok(version) => {
                    info!(
                        "Kubernetes API server reachable (v{}.{}, {})",
                        version.major, version.minor, version.git_version
                    );
                    metrics::set_api_reachable(self.ctx.broker_name(), true);
                    return Ok(());
                }
                Err(e) if attempt + 1 < attempts => {
                    let delay =
                        calculate_backoff(attempt, self.settings.base_delay, self.settings.max_delay);
                    warn!(
                        "API server not reachable (attempt {}/{}): {}; retrying in {:?}",
                        attempt + 1,
                        attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    metrics::set_api_reachable(self.ctx.broker_name(), false);
                    return Err(e).with_context(|| {
                        format!("API server unreachable after {} attempt(s)", attempts)
                    });
                }
            }
        }
    }

    async fn start(&mut self) -> anyhow::Result<()> {
        if self.task.is_some() {
            debug!("API probe already polling");
            return Ok(());
        }

        let client = self.ctx.client()?;
        let span = self.ctx.logger_for(Self::NAME)?;
        let cancel = CancellationToken::new();
        let task = tokio::spawn(
            poll(
                client,
                self.ctx.broker_name().to_string(),
                self.settings.interval,
                cancel.clone(),
            )
            .instrument(span),
        );

        info!("API probe polling every {:?}", self.settings.interval);
        self.cancel = Some(cancel);
        self.task = Some(task);
        Ok(())
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        if let Some(task) = self.task.take() {
            task.await.context("API probe task panicked")?;
        }
        info!("API probe stopped");
        Ok(())
    }
}

async fn poll(client: Client, broker: String, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                match client.apiserver_version().await {
                    Ok(version) => {
                        debug!("API server healthy ({})", version.git_version);
                        metrics::set_api_reachable(&broker, true);
                    }
                    Err(e) => {
                        warn!("API server probe failed: {}", e);
                        metrics::set_api_reachable(&broker, false);
                    }
                }
            }
        }
    }
}

/// Calculate exponential backoff delay for retry attempts
///
/// `base * 2^attempt`, with the exponent capped at 5 and the result capped
/// at `max`.
pub fn calculate_backoff(attempt: u32, base: Duration, max: Duration) -> Duration {
    let factor = 2_u32.saturating_pow(attempt.min(5));
    base.saturating_mul(factor).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::Broker;
    use crate::client::testing::LocalClientFactory;

    fn fast_settings() -> ApiProbeSettings {
        ApiProbeSettings {
            init_attempts: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            interval: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_backoff_calculation() {
        let base = Duration::from_secs(1);
        let max = Duration::from_secs(30);
        assert_eq!(calculate_backoff(0, base, max), Duration::from_secs(1));
        assert_eq!(calculate_backoff(1, base, max), Duration::from_secs(2));
        assert_eq!(calculate_backoff(4, base, max), Duration::from_secs(16));
        // Capped at max
        assert_eq!(calculate_backoff(5, base, max), Duration::from_secs(30));
        assert_eq!(calculate_backoff(40, base, max), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_init_requires_client() {
        let broker = Broker::new("probe-test", LocalClientFactory::default());
        let mut probe = ApiProbe::new(broker.context(), fast_settings());

        let err = probe.init().await.unwrap_err();
        assert!(err.to_string().contains("client unavailable"));
    }

    #[tokio::test]
    async fn test_init_fails_when_unreachable() {
        let mut broker = Broker::new("probe-test", LocalClientFactory::unreachable());
        broker.init().await.unwrap();

        let mut probe = ApiProbe::new(broker.context(), fast_settings());
        let err = probe.init().await.unwrap_err();
        assert!(err.to_string().contains("after 2 attempt(s)"));
    }

    #[tokio::test]
    async fn test_start_stop_polling() {
        let mut broker = Broker::new("probe-test", LocalClientFactory::unreachable());
        broker.init().await.unwrap();

        let mut probe = ApiProbe::new(broker.context(), fast_settings());
        probe.start().await.unwrap();
        assert!(probe.is_polling());

        tokio::time::sleep(Duration::from_millis(25)).await;
        probe.stop().await.unwrap();
        assert!(!probe.is_polling());
    }
}
