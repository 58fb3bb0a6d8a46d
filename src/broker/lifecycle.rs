//! Sequential phase driver
//!
//! Walks the registry in registration order and awaits each controller
//! before calling the next. The first failure aborts the phase; controllers
//! already processed are left as they are.

use tracing::{debug, Instrument};

use super::registry::ControllerRegistry;
use super::state::Phase;
use crate::error::{Error, Result};
use crate::metrics;

pub(crate) async fn run_phase(
    broker: &str,
    registry: &mut ControllerRegistry,
    phase: Phase,
) -> Result<()> {
    for entry in registry.iter_mut() {
        let span = entry.span().clone();
        let name = entry.name().to_string();
        debug!("Running {} on controller {}", phase, name);

        let controller = entry.controller.as_mut();
        let outcome = match phase {
            Phase::Init => controller.init().instrument(span).await,
            Phase::Start => controller.start().instrument(span).await,
            Phase::Stop => controller.stop().instrument(span).await,
        };

        if let Err(source) = outcome {
            metrics::record_phase_failure(broker, &name, phase);
            return Err(Error::ControllerPhase {
                controller: name,
                phase,
                source,
            });
        }
    }

    Ok(())
}
