//! Kubernetes client construction
//!
//! The broker never builds its client directly; it asks an injected
//! [`ClientFactory`] exactly once, during `init`.

use async_trait::async_trait;
use kube::config::KubeConfigOptions;
use kube::{Client, Config};
use tracing::{info, Span};

use crate::error::{Error, Result};

/// Produces the handle to the Kubernetes API server
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// `logger` is the broker's span; implementations log through it
    async fn create_client(&self, logger: &Span) -> Result<Client>;
}

/// Default factory: in-cluster config or kubeconfig, with an optional
/// context override
#[derive(Debug, Clone, Default)]
pub struct KubeClientFactory {
    context: Option<String>,
}

impl KubeClientFactory {
    pub fn new(context: Option<String>) -> Self {
        Self { context }
    }

    async fn load_config(&self) -> Result<Config> {
        match &self.context {
            Some(context) => {
                let options = KubeConfigOptions {
                    context: Some(context.clone()),
                    ..Default::default()
                };
                Config::from_kubeconfig(&options)
                    .await
                    .map_err(|e| Error::KubeConfigError(format!("context {}: {}", context, e)))
            }
            None => Config::infer()
                .await
                .map_err(|e| Error::KubeConfigError(e.to_string())),
        }
    }
}

#[async_trait]
impl ClientFactory for KubeClientFactory {
    async fn create_client(&self, logger: &Span) -> Result<Client> {
        let config = self.load_config().await?;
        info!(
            parent: logger,
            "Connecting to Kubernetes API server at {}", config.cluster_url
        );
        Client::try_from(config).map_err(Error::KubeError)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Factories for tests; clients are built lazily and never dial out
    //! unless a request is made.

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[derive(Clone, Default)]
    pub(crate) struct LocalClientFactory {
        calls: Arc<AtomicUsize>,
        fail_first: Arc<AtomicUsize>,
    }

    impl LocalClientFactory {
        /// Client pointing at a closed local port
        pub(crate) fn unreachable() -> Self {
            Self::default()
        }

        /// Fails the first `n` calls with a configuration error
        pub(crate) fn failing(n: usize) -> Self {
            let factory = Self::default();
            factory.fail_first.store(n, Ordering::SeqCst);
            factory
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ClientFactory for LocalClientFactory {
        async fn create_client(&self, _logger: &Span) -> Result<Client> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first.load(Ordering::SeqCst) {
                return Err(Error::KubeConfigError("no kubeconfig in test".to_string()));
            }
            let uri = "http://127.0.0.1:1"
                .parse()
                .map_err(|e| Error::ConfigError(format!("bad test uri: {}", e)))?;
            Client::try_from(Config::new(uri)).map_err(Error::KubeError)
        }
    }
}
