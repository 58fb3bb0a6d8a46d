//! Prometheus metrics for the operator broker

use once_cell::sync::Lazy;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use std::sync::atomic::AtomicI64;

use crate::broker::{LifecycleState, Phase};

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct BrokerLabels {
    pub broker: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct PhaseLabels {
    pub broker: String,
    pub controller: String,
    pub phase: String,
}

/// Lifecycle state code per broker (see `LifecycleState::as_i64`)
pub static LIFECYCLE_STATE: Lazy<Family<BrokerLabels, Gauge<i64, AtomicI64>>> =
    Lazy::new(Family::default);

/// Number of registered controllers per broker
pub static CONTROLLERS_REGISTERED: Lazy<Family<BrokerLabels, Gauge<i64, AtomicI64>>> =
    Lazy::new(Family::default);

/// Controller phase calls that returned an error
pub static PHASE_FAILURES: Lazy<Family<PhaseLabels, Counter>> = Lazy::new(Family::default);

/// 1 when the last API server probe succeeded
pub static API_REACHABLE: Lazy<Family<BrokerLabels, Gauge<i64, AtomicI64>>> =
    Lazy::new(Family::default);

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let mut registry = Registry::default();
    registry.register(
        "broker_lifecycle_state",
        "Current lifecycle state code of the broker",
        LIFECYCLE_STATE.clone(),
    );
    registry.register(
        "broker_controllers_registered",
        "Number of controllers in the broker registry",
        CONTROLLERS_REGISTERED.clone(),
    );
    registry.register(
        "broker_controller_phase_failures",
        "Controller lifecycle calls that failed",
        PHASE_FAILURES.clone(),
    );
    registry.register(
        "broker_api_server_reachable",
        "Whether the last Kubernetes API server probe succeeded",
        API_REACHABLE.clone(),
    );
    registry
});

fn broker_labels(broker: &str) -> BrokerLabels {
    BrokerLabels {
        broker: broker.to_string(),
    }
}

pub fn set_lifecycle_state(broker: &str, state: LifecycleState) {
    LIFECYCLE_STATE
        .get_or_create(&broker_labels(broker))
        .set(state.as_i64());
}

pub fn set_controllers_registered(broker: &str, count: usize) {
    CONTROLLERS_REGISTERED
        .get_or_create(&broker_labels(broker))
        .set(count as i64);
}

pub fn record_phase_failure(broker: &str, controller: &str, phase: Phase) {
    let labels = PhaseLabels {
        broker: broker.to_string(),
        controller: controller.to_string(),
        phase: phase.as_str().to_string(),
    };
    PHASE_FAILURES.get_or_create(&labels).inc();
}

pub fn set_api_reachable(broker: &str, reachable: bool) {
    API_REACHABLE
        .get_or_create(&broker_labels(broker))
        .set(i64::from(reachable));
}

/// Encode the registry in OpenMetrics text format
pub fn encode() -> Result<String, std::fmt::Error> {
    let mut buffer = String::new();
    prometheus_client::encoding::text::encode(&mut buffer, &REGISTRY)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_contains_families() {
        set_lifecycle_state("metrics-test", LifecycleState::Started);
        set_controllers_registered("metrics-test", 3);
        record_phase_failure("metrics-test", "metrics-test-ctrl", Phase::Init);

        let text = encode().unwrap();
        assert!(text.contains("broker_lifecycle_state{broker=\"metrics-test\"} 4"));
        assert!(text.contains("broker_controllers_registered{broker=\"metrics-test\"} 3"));
        assert!(text.contains(
            "broker=\"metrics-test\",controller=\"metrics-test-ctrl\",phase=\"init\""
        ));
    }
}
