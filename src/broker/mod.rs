//! Broker: controller registry plus lifecycle driver
//!
//! The [`Broker`] owns an order-preserving [`ControllerRegistry`], the
//! shared Kubernetes client and the broker's logger span. Controllers are
//! registered during configuration (through discovery, a built-in name or
//! directly) and then driven, in registration order, through
//! `init` → `start` → `stop`.
//!
//! ```text
//! load_controllers(glob) ─► discovery::resolve ─► catalog.resolve(path)
//!                                                      │ factory(ctx)
//!                                                      ▼
//!                                               ControllerRegistry
//!                                                      │
//! init / start / stop ─► Transition ─► lifecycle::run_phase (sequential)
//! ```
//!
//! Lifecycle methods take `&mut self`, so one broker can never run two
//! phases at once.

mod context;
mod lifecycle;
mod registry;
mod state;

pub use context::{BrokerContext, BrokerSnapshot, BrokerStatus};
pub use registry::{ControllerRegistry, RegisteredController};
pub use state::{LifecycleState, Phase};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use kube::Client;
use tracing::{debug, info, instrument, Span};

use crate::client::ClientFactory;
use crate::controller::Controller;
use crate::discovery::{self, ControllerCatalog};
use crate::error::{Error, Result};
use crate::metrics;
use crate::telemetry;

use context::Shared;
use state::Transition;

pub struct Broker {
    shared: Arc<Shared>,
    registry: ControllerRegistry,
    catalog: ControllerCatalog,
    client_factory: Box<dyn ClientFactory>,
}

impl Broker {
    /// Create an uninitialized broker with an empty catalog
    pub fn new(name: impl Into<String>, client_factory: impl ClientFactory + 'static) -> Self {
        let shared = Shared::new(name.into());
        metrics::set_lifecycle_state(&shared.name, LifecycleState::Uninitialized);
        metrics::set_controllers_registered(&shared.name, 0);

        Self {
            shared,
            registry: ControllerRegistry::new(),
            catalog: ControllerCatalog::new(),
            client_factory: Box::new(client_factory),
        }
    }

    /// Replace the catalog used to resolve discovered paths
    pub fn with_catalog(mut self, catalog: ControllerCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn catalog_mut(&mut self) -> &mut ControllerCatalog {
        &mut self.catalog
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn state(&self) -> LifecycleState {
        self.shared.state()
    }

    /// A back-reference suitable for constructing controllers
    pub fn context(&self) -> BrokerContext {
        BrokerContext::new(&self.shared)
    }

    pub fn status(&self) -> BrokerStatus {
        BrokerStatus::new(&self.shared)
    }

    /// The shared Kubernetes client; fails before `init` created it
    pub fn client(&self) -> Result<Client> {
        self.shared.client()
    }

    pub fn logger(&self) -> &Span {
        &self.shared.logger
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Registered controller names, in registration order
    pub fn controller_names(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn controllers(&self) -> impl Iterator<Item = &RegisteredController> {
        self.registry.iter()
    }

    /// Create the client and run `init` on every controller.
    ///
    /// Fails with [`Error::AlreadyInitialized`] unless the broker is
    /// `Uninitialized`. Seals the registry. On a controller failure the
    /// remaining controllers are skipped and the state stays `Uninitialized`.
    pub async fn init(&mut self) -> Result<()> {
        let result = self.init_registry().await;
        self.publish_state();
        result
    }

    /// Run `start` on every controller, running `init` first if needed.
    ///
    /// Fails with [`Error::AlreadyStarted`] if the broker is `Started`.
    pub async fn start(&mut self) -> Result<()> {
        let result = self.start_registry().await;
        self.publish_state();
        result
    }

    /// Run `stop` on every controller, in registration order.
    ///
    /// When the broker is not started this fails with
    /// [`Error::NotStarted`], or returns `Ok(())` without side effects if
    /// `pass_without_error` is set.
    pub async fn stop(&mut self, pass_without_error: bool) -> Result<()> {
        let result = self.stop_registry(pass_without_error).await;
        self.publish_state();
        result
    }

    #[instrument(name = "init", parent = &self.shared.logger, skip_all)]
    async fn init_registry(&mut self) -> Result<()> {
        if self.state() != LifecycleState::Uninitialized {
            return Err(self.shared.fail(Error::AlreadyInitialized));
        }

        info!("Initializing broker");
        self.registry.seal();
        let transition = Transition::begin(&self.shared.state, LifecycleState::Initializing);

        let shared = &self.shared;
        let factory = &self.client_factory;
        shared
            .client
            .get_or_try_init(|| factory.create_client(&shared.logger))
            .await
            .map_err(|e| shared.fail(e))?;

        info!("Initializing controllers");
        lifecycle::run_phase(&self.shared.name, &mut self.registry, Phase::Init)
            .await
            .map_err(|e| self.shared.fail(e))?;
        info!("Controllers initialized");

        transition.commit(LifecycleState::Initialized);
        info!("Broker initialized");
        Ok(())
    }

    #[instrument(name = "start", parent = &self.shared.logger, skip_all)]
    async fn start_registry(&mut self) -> Result<()> {
        match self.state() {
            LifecycleState::Started => return Err(self.shared.fail(Error::AlreadyStarted)),
            LifecycleState::Uninitialized => self.init_registry().await?,
            _ => {}
        }

        info!("Starting broker");
        let transition = Transition::begin(&self.shared.state, LifecycleState::Starting);

        info!("Starting controllers");
        lifecycle::run_phase(&self.shared.name, &mut self.registry, Phase::Start)
            .await
            .map_err(|e| self.shared.fail(e))?;
        info!("Controllers started");

        transition.commit(LifecycleState::Started);
        info!("Broker started");
        Ok(())
    }

    #[instrument(name = "stop", parent = &self.shared.logger, skip(self))]
    async fn stop_registry(&mut self, pass_without_error: bool) -> Result<()> {
        if !self.state().is_started() {
            if pass_without_error {
                debug!("Broker not started, nothing to stop");
                return Ok(());
            }
            return Err(self.shared.fail(Error::NotStarted));
        }

        info!("Stopping broker");
        let transition = Transition::begin(&self.shared.state, LifecycleState::Stopping);

        info!("Stopping controllers");
        lifecycle::run_phase(&self.shared.name, &mut self.registry, Phase::Stop)
            .await
            .map_err(|e| self.shared.fail(e))?;
        info!("Controllers stopped");

        transition.commit(LifecycleState::StoppedButInitialized);
        info!("Broker stopped");
        Ok(())
    }

    /// Discover controllers matching `pattern` and register each one.
    ///
    /// Paths are registered in sorted order. Returns the number of paths
    /// processed; stops at the first path that fails to load.
    pub fn load_controllers(&mut self, pattern: &str) -> Result<usize> {
        info!(parent: &self.shared.logger, "Loading controllers with glob {}", pattern);

        let paths = discovery::resolve(pattern).map_err(|e| self.shared.fail(e))?;
        for path in &paths {
            self.load_controller(path)?;
        }
        Ok(paths.len())
    }

    /// Instantiate the catalog entry selected by `path` and register it
    pub fn load_controller(&mut self, path: impl AsRef<Path>) -> Result<&dyn Controller> {
        let path = path.as_ref();
        info!(parent: &self.shared.logger, "Loading controller from {}", path.display());

        let factory = self
            .catalog
            .resolve(path)
            .map_err(|e| self.shared.fail(e))?
            .clone();
        self.instantiate(&factory, path.to_path_buf())
    }

    /// Instantiate a catalog entry by name, without discovery
    pub fn load_builtin(&mut self, name: &str) -> Result<&dyn Controller> {
        info!(parent: &self.shared.logger, "Loading built-in controller {}", name);

        let factory = match self.catalog.get(name) {
            Some(factory) => factory.clone(),
            None => {
                return Err(self.shared.fail(Error::ControllerNotFound {
                    path: PathBuf::from(name),
                    name: name.to_string(),
                }))
            }
        };
        self.instantiate(&factory, PathBuf::from(name))
    }

    /// Register an already constructed controller
    pub fn register(&mut self, controller: Box<dyn Controller>) -> Result<&dyn Controller> {
        self.push(controller, None)
    }

    fn instantiate(
        &mut self,
        factory: &discovery::ControllerFactory,
        source: PathBuf,
    ) -> Result<&dyn Controller> {
        if self.registry.is_sealed() {
            return Err(self.shared.fail(Error::RegistrySealed {
                what: source.display().to_string(),
            }));
        }

        let controller = factory(self.context()).map_err(|e| {
            self.shared.fail(Error::ControllerConstruction {
                path: source.clone(),
                source: e,
            })
        })?;
        info!(
            parent: &self.shared.logger,
            "Successfully loaded controller({}) from {}",
            controller.name(),
            source.display()
        );

        self.push(controller, Some(source))
    }

    fn push(
        &mut self,
        controller: Box<dyn Controller>,
        source: Option<PathBuf>,
    ) -> Result<&dyn Controller> {
        let span = telemetry::child_span(&self.shared.base_logger, controller.name());
        let entry = self
            .registry
            .push(controller, source, span)
            .map_err(|e| self.shared.fail(e))?;

        self.shared
            .controllers
            .send_modify(|names| names.push(entry.name().to_string()));
        metrics::set_controllers_registered(
            &self.shared.name,
            self.shared.controllers.borrow().len(),
        );

        Ok(entry.controller())
    }

    fn publish_state(&self) {
        metrics::set_lifecycle_state(&self.shared.name, self.state());
    }
}
