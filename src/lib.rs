//! operator-broker
//!
//! Drives a registry of pluggable Kubernetes controllers through a strict
//! `init` → `start` → `stop` lifecycle in front of one shared `kube::Client`.
//!
//! - [`Controller`]: the async contract every controller implements.
//! - [`ControllerCatalog`]: compiled table of controller factories;
//!   discovery selects entries by file stem.
//! - [`Broker`]: owns the registry and the lifecycle state machine.
//!
//! ```no_run
//! use operator_broker::{builtin_catalog, Broker, KubeClientFactory};
//!
//! # async fn run() -> operator_broker::Result<()> {
//! let mut broker = Broker::new("example", KubeClientFactory::default())
//!     .with_catalog(builtin_catalog());
//! broker.load_controllers("ctrls/*.ctrl")?;
//! broker.start().await?;
//! // ...
//! broker.stop(true).await?;
//! # Ok(())
//! # }
//! ```

pub mod broker;
pub mod client;
pub mod config;
pub mod controller;
pub mod discovery;
pub mod error;
pub mod metrics;
pub mod rest_api;
pub mod shutdown;
pub mod telemetry;

pub use broker::{
    Broker, BrokerContext, BrokerSnapshot, BrokerStatus, LifecycleState, Phase,
    RegisteredController,
};
pub use client::{ClientFactory, KubeClientFactory};
pub use config::{BrokerConfig, LogConfig, LogFormat};
pub use controller::{builtin_catalog, ApiProbe, ApiProbeSettings, Controller};
pub use discovery::{ControllerCatalog, ControllerFactory};
pub use error::{Error, Result};
