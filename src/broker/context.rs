//! Handles given out by the broker
//!
//! [`BrokerContext`] is the non-owning back-reference each controller
//! receives at construction. [`BrokerStatus`] is a read-only view used by
//! the REST API; it reads the lifecycle through watch receivers and keeps
//! the last published values once the broker is gone.

use std::sync::{Arc, Weak};

use kube::Client;
use serde::Serialize;
use tokio::sync::{watch, OnceCell};
use tracing::{error, Span};

use super::state::LifecycleState;
use crate::error::{Error, Result};
use crate::telemetry;

/// State shared between the broker, its controllers and status observers
pub(crate) struct Shared {
    pub(crate) name: String,
    /// Root span for this broker; controller spans hang off it
    pub(crate) base_logger: Span,
    /// Span used for the broker's own events (`caller = "broker"`)
    pub(crate) logger: Span,
    pub(crate) client: OnceCell<Client>,
    pub(crate) state: watch::Sender<LifecycleState>,
    pub(crate) controllers: watch::Sender<Vec<String>>,
}

impl Shared {
    pub(crate) fn new(name: String) -> Arc<Self> {
        let base_logger = telemetry::broker_span(&name);
        let logger = telemetry::child_span(&base_logger, "broker");
        let (state, _) = watch::channel(LifecycleState::Uninitialized);
        let (controllers, _) = watch::channel(Vec::new());

        Arc::new(Self {
            name,
            base_logger,
            logger,
            client: OnceCell::new(),
            state,
            controllers,
        })
    }

    pub(crate) fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    pub(crate) fn client(&self) -> Result<Client> {
        self.client.get().cloned().ok_or(Error::ClientUnavailable)
    }

    /// Log `err` at error severity in the broker span and hand it back
    pub(crate) fn fail(&self, err: Error) -> Error {
        error!(parent: &self.logger, "{}", err);
        err
    }
}

/// Back-reference from a controller to the broker that owns it.
///
/// Holds a `Weak` pointer: a controller never keeps the broker alive.
/// Accessors fail with [`Error::BrokerDropped`] once the broker is gone.
#[derive(Clone)]
pub struct BrokerContext {
    name: String,
    shared: Weak<Shared>,
}

impl BrokerContext {
    pub(crate) fn new(shared: &Arc<Shared>) -> Self {
        Self {
            name: shared.name.clone(),
            shared: Arc::downgrade(shared),
        }
    }

    fn upgrade(&self) -> Result<Arc<Shared>> {
        self.shared
            .upgrade()
            .ok_or_else(|| Error::BrokerDropped(self.name.clone()))
    }

    /// Name of the owning broker
    pub fn broker_name(&self) -> &str {
        &self.name
    }

    /// The shared Kubernetes client; only available after `init` created it
    pub fn client(&self) -> Result<Client> {
        self.upgrade()?.client()
    }

    /// The broker's own logger span
    pub fn logger(&self) -> Result<Span> {
        Ok(self.upgrade()?.logger.clone())
    }

    /// A child logger span tagged with `caller`
    pub fn logger_for(&self, caller: &str) -> Result<Span> {
        Ok(telemetry::child_span(&self.upgrade()?.base_logger, caller))
    }

    pub fn state(&self) -> Result<LifecycleState> {
        Ok(self.upgrade()?.state())
    }
}

impl std::fmt::Debug for BrokerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerContext")
            .field("broker", &self.name)
            .field("alive", &(self.shared.strong_count() > 0))
            .finish()
    }
}

/// Read-only, cloneable view of a broker for observers.
///
/// Does not keep the broker alive: once it is dropped, [`BrokerContext`]
/// handles fail with [`Error::BrokerDropped`] regardless of how many
/// status handles remain.
#[derive(Clone)]
pub struct BrokerStatus {
    name: String,
    shared: Weak<Shared>,
    state: watch::Receiver<LifecycleState>,
    controllers: watch::Receiver<Vec<String>>,
}

/// Point-in-time snapshot served by the REST API
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerSnapshot {
    pub name: String,
    pub state: LifecycleState,
    pub client_ready: bool,
    pub controllers: Vec<String>,
}

impl BrokerStatus {
    pub(crate) fn new(shared: &Arc<Shared>) -> Self {
        Self {
            name: shared.name.clone(),
            shared: Arc::downgrade(shared),
            state: shared.state.subscribe(),
            controllers: shared.controllers.subscribe(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last published lifecycle state
    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// False once the broker has been dropped
    pub fn is_alive(&self) -> bool {
        self.shared.strong_count() > 0
    }

    /// Registered controller names, in registration order
    pub fn controllers(&self) -> Vec<String> {
        self.controllers.borrow().clone()
    }

    /// Receiver notified on every lifecycle transition
    pub fn watch(&self) -> watch::Receiver<LifecycleState> {
        match self.shared.upgrade() {
            Some(shared) => shared.state.subscribe(),
            None => self.state.clone(),
        }
    }

    pub fn snapshot(&self) -> BrokerSnapshot {
        let client_ready = self
            .shared
            .upgrade()
            .is_some_and(|shared| shared.client.initialized());

        BrokerSnapshot {
            name: self.name.clone(),
            state: self.state(),
            client_ready,
            controllers: self.controllers(),
        }
    }
}
