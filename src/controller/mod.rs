//! Controller capability
//!
//! Every pluggable unit driven by the broker implements [`Controller`].
//! A controller receives a [`BrokerContext`](crate::BrokerContext) when its
//! factory runs and may use it, once `init` has been called, to reach the
//! shared Kubernetes client and a child logger span.
//!
//! Built-in controllers live in submodules; [`builtin_catalog`] exposes them
//! to discovery.

mod api_probe;

pub use api_probe::{calculate_backoff, ApiProbe, ApiProbeSettings};

use async_trait::async_trait;

use crate::discovery::ControllerCatalog;

/// Three-phase lifecycle contract.
///
/// The broker calls each method once per phase, in registration order,
/// and awaits it before moving to the next controller. An `Err` aborts the
/// rest of the phase.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use operator_broker::{BrokerContext, Controller};
///
/// struct Noop {
///     ctx: BrokerContext,
/// }
///
/// #[async_trait]
/// impl Controller for Noop {
///     fn name(&self) -> &str { "noop" }
///
///     async fn init(&mut self) -> anyhow::Result<()> {
///         let _client = self.ctx.client()?;
///         Ok(())
///     }
///
///     async fn start(&mut self) -> anyhow::Result<()> { Ok(()) }
///
///     async fn stop(&mut self) -> anyhow::Result<()> { Ok(()) }
/// }
/// ```
#[async_trait]
pub trait Controller: Send + Sync {
    /// Stable name used in logs, metrics and the status API
    fn name(&self) -> &str;

    async fn init(&mut self) -> anyhow::Result<()>;

    async fn start(&mut self) -> anyhow::Result<()>;

    async fn stop(&mut self) -> anyhow::Result<()>;
}

/// Catalog containing every controller compiled into this crate
pub fn builtin_catalog() -> ControllerCatalog {
    ControllerCatalog::new().with(ApiProbe::NAME, |ctx| {
        Ok(ApiProbe::new(ctx, ApiProbeSettings::default()))
    })
}
