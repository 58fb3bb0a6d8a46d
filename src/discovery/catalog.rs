//! Compiled controller catalog
//!
//! Maps a logical controller name to a typed factory. Discovered paths are
//! resolved through the catalog by file stem, so `ctrls/api-probe.ctrl`
//! instantiates the factory registered as `api-probe`. Nothing is loaded
//! from disk at run time; the file only selects an entry.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::broker::BrokerContext;
use crate::controller::Controller;
use crate::error::{Error, Result};

/// Builds one controller instance for a broker
pub type ControllerFactory =
    Arc<dyn Fn(BrokerContext) -> anyhow::Result<Box<dyn Controller>> + Send + Sync>;

#[derive(Clone, Default)]
pub struct ControllerCatalog {
    factories: BTreeMap<String, ControllerFactory>,
}

impl ControllerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `name`, replacing any previous entry
    pub fn register<F, C>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(BrokerContext) -> anyhow::Result<C> + Send + Sync + 'static,
        C: Controller + 'static,
    {
        let factory: ControllerFactory =
            Arc::new(move |ctx| factory(ctx).map(|c| Box::new(c) as Box<dyn Controller>));
        self.factories.insert(name.into(), factory);
        self
    }

    /// Builder-style [`register`](Self::register)
    pub fn with<F, C>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(BrokerContext) -> anyhow::Result<C> + Send + Sync + 'static,
        C: Controller + 'static,
    {
        self.register(name, factory);
        self
    }

    /// Merge another catalog; entries in `other` win on conflict
    pub fn merge(mut self, other: ControllerCatalog) -> Self {
        self.factories.extend(other.factories);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ControllerFactory> {
        self.factories.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Look up the factory selected by a discovered path
    pub fn resolve(&self, path: &Path) -> Result<&ControllerFactory> {
        let name = logical_name(path);
        self.factories
            .get(&name)
            .ok_or_else(|| Error::ControllerNotFound {
                path: path.to_path_buf(),
                name,
            })
    }
}

impl fmt::Debug for ControllerCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

/// Catalog name selected by a path: its file stem
pub fn logical_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use async_trait::async_trait;

    use super::*;

    struct Dummy;

    #[async_trait]
    impl Controller for Dummy {
        fn name(&self) -> &str {
            "dummy"
        }

        async fn init(&mut self) -> anyhow::Result<()> {
            Ok(())
        }

        async fn start(&mut self) -> anyhow::Result<()> {
            Ok(())
        }

        async fn stop(&mut self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_logical_name() {
        assert_eq!(logical_name(Path::new("ctrls/api-probe.ctrl")), "api-probe");
        assert_eq!(logical_name(Path::new("ctrls/plain")), "plain");
        assert_eq!(logical_name(Path::new("/")), "");
    }

    #[test]
    fn test_resolve_by_stem() {
        let catalog = ControllerCatalog::new().with("dummy", |_ctx| Ok(Dummy));
        assert!(catalog.resolve(Path::new("a/b/dummy.mod")).is_ok());

        let err = catalog.resolve(Path::new("a/b/other.mod")).err().unwrap();
        match err {
            Error::ControllerNotFound { path, name } => {
                assert_eq!(path, PathBuf::from("a/b/other.mod"));
                assert_eq!(name, "other");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_merge_overrides() {
        let base = ControllerCatalog::new().with("a", |_ctx| Ok(Dummy));
        let extra = ControllerCatalog::new()
            .with("a", |_ctx| Ok(Dummy))
            .with("b", |_ctx| Ok(Dummy));
        let merged = base.merge(extra);
        assert_eq!(merged.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(merged.len(), 2);
    }
}
