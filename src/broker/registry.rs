//! Order-preserving controller registry
//!
//! Controllers are appended during configuration and never reordered or
//! removed. The broker seals the registry when the first lifecycle call
//! begins; after that, [`ControllerRegistry::push`] rejects new entries.

use std::path::{Path, PathBuf};

use tracing::Span;

use crate::controller::Controller;
use crate::error::{Error, Result};

/// A controller together with its registration metadata
pub struct RegisteredController {
    name: String,
    source: Option<PathBuf>,
    span: Span,
    pub(crate) controller: Box<dyn Controller>,
}

impl RegisteredController {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path the controller was discovered at, if it came from discovery
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub(crate) fn span(&self) -> &Span {
        &self.span
    }

    pub fn controller(&self) -> &dyn Controller {
        self.controller.as_ref()
    }
}

#[derive(Default)]
pub struct ControllerRegistry {
    entries: Vec<RegisteredController>,
    sealed: bool,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a controller at the end of the registration order
    pub fn push(
        &mut self,
        controller: Box<dyn Controller>,
        source: Option<PathBuf>,
        span: Span,
    ) -> Result<&mut RegisteredController> {
        let name = controller.name().to_string();
        if self.sealed {
            return Err(Error::RegistrySealed { what: name });
        }

        self.entries.push(RegisteredController {
            name,
            source,
            span,
            controller,
        });
        let index = self.entries.len() - 1;
        Ok(&mut self.entries[index])
    }

    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredController> {
        self.entries.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut RegisteredController> {
        self.entries.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    struct Named(&'static str);

    #[async_trait]
    impl Controller for Named {
        fn name(&self) -> &str {
            self.0
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
    fn test_push_preserves_order() {
        let mut registry = ControllerRegistry::new();
        for name in ["c", "a", "b"] {
            registry
                .push(Box::new(Named(name)), None, Span::none())
                .unwrap();
        }
        assert_eq!(registry.names(), vec!["c", "a", "b"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_sealed_registry_rejects_push() {
        let mut registry = ControllerRegistry::new();
        registry
            .push(Box::new(Named("a")), Some(PathBuf::from("ctrls/a.mod")), Span::none())
            .unwrap();
        registry.seal();

        let err = registry
            .push(Box::new(Named("b")), None, Span::none())
            .err()
            .unwrap();
        assert!(matches!(err, Error::RegistrySealed { ref what } if what == "b"));
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.iter().next().unwrap().source(),
            Some(Path::new("ctrls/a.mod"))
        );
    }
}
