//! Central error types for the operator broker
//!
//! Uses `thiserror` for ergonomic, type-safe error handling with
//! automatic `Display` and `Error` trait implementations. Controllers
//! report their own failures with `anyhow`; the broker wraps them in
//! [`Error::ControllerPhase`] so the failing controller and phase are
//! always named.

use std::path::PathBuf;

use thiserror::Error;

use crate::broker::Phase;

/// Central error type for the operator broker
#[derive(Error, Debug)]
pub enum Error {
    /// `init` called on a broker that already left `Uninitialized`
    #[error("Broker already initialized")]
    AlreadyInitialized,

    /// `start` called on a broker that is already running
    #[error("Broker already started")]
    AlreadyStarted,

    /// `stop` called on a broker that is not running
    #[error("Broker not started")]
    NotStarted,

    /// Registration attempted after the first lifecycle call
    #[error("Controller registry is sealed; cannot register {what} once the broker left Uninitialized")]
    RegistrySealed { what: String },

    /// The discovery pattern could not be parsed
    #[error("Invalid controller pattern {pattern}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// A path matched by the discovery pattern could not be read
    #[error("Controller discovery failed: {0}")]
    Discovery(#[from] glob::GlobError),

    /// No catalog entry exists for a discovered path
    #[error("Unable to load controller from {}: no controller registered as {name:?}", .path.display())]
    ControllerNotFound { path: PathBuf, name: String },

    /// The catalog factory failed to build the controller
    #[error("Unable to construct controller from {}: {source}", .path.display())]
    ControllerConstruction {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// A controller rejected one of its lifecycle calls
    #[error("Controller {controller} failed to {phase}: {source}")]
    ControllerPhase {
        controller: String,
        phase: Phase,
        #[source]
        source: anyhow::Error,
    },

    /// Kubernetes API error from kube-rs
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    /// Kubeconfig could not be inferred or loaded
    #[error("Kubernetes configuration error: {0}")]
    KubeConfigError(String),

    /// The client is requested before `init` created it
    #[error("Kubernetes client unavailable: broker has not been initialized")]
    ClientUnavailable,

    /// A controller outlived the broker that created it
    #[error("Broker {0} has been dropped")]
    BrokerDropped(String),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type alias for broker operations
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// True for errors caused by calling lifecycle operations out of order
    pub fn is_lifecycle_violation(&self) -> bool {
        matches!(
            self,
            Error::AlreadyInitialized
                | Error::AlreadyStarted
                | Error::NotStarted
                | Error::RegistrySealed { .. }
        )
    }

    /// Convert to a short human-readable message for status endpoints
    pub fn status_message(&self) -> String {
        match self {
            Error::ControllerPhase {
                controller, phase, ..
            } => format!("{} failed during {}", controller, phase),
            Error::ControllerNotFound { path, .. } => {
                format!("No controller for {}", path.display())
            }
            Error::KubeError(e) => format!("Kubernetes error: {}", e),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_violations() {
        assert!(Error::AlreadyInitialized.is_lifecycle_violation());
        assert!(Error::AlreadyStarted.is_lifecycle_violation());
        assert!(Error::NotStarted.is_lifecycle_violation());
        assert!(!Error::ClientUnavailable.is_lifecycle_violation());
    }

    #[test]
    fn test_not_found_names_path() {
        let err = Error::ControllerNotFound {
            path: PathBuf::from("ctrls/missing.mod"),
            name: "missing".to_string(),
        };
        assert!(err.to_string().contains("ctrls/missing.mod"));
        assert_eq!(err.status_message(), "No controller for ctrls/missing.mod");
    }

    #[test]
    fn test_phase_error_message() {
        let err = Error::ControllerPhase {
            controller: "b".to_string(),
            phase: Phase::Init,
            source: anyhow::anyhow!("boom"),
        };
        assert_eq!(err.to_string(), "Controller b failed to init: boom");
        assert_eq!(err.status_message(), "b failed during init");
    }
}
