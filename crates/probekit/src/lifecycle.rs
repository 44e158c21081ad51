//! Starting a component for the duration of a case

use crate::runner::{CaseResult, TestCase};
use anyhow::Context;
use std::sync::Arc;
use tracing::debug;

/// Component that must be started before use
pub trait Starter {
    fn start(&self) -> anyhow::Result<()>;
}

/// Component that must be stopped once done
pub trait Stopper {
    fn stop(&self) -> anyhow::Result<()>;
}

/// Something a case can start and stop
///
/// Both capabilities are optional; a component without one of them is a
/// no-op for that phase.
pub trait Component: Send + Sync + 'static {
    fn starter(&self) -> Option<&dyn Starter> {
        None
    }

    fn stopper(&self) -> Option<&dyn Stopper> {
        None
    }
}

/// Start `component` now and stop it when `case` ends
///
/// A start failure is fatal. A stop failure is recorded on the case and
/// does not prevent other cleanups.
pub fn start_stop<C: Component + ?Sized>(case: &TestCase, component: Arc<C>) -> CaseResult {
    if let Some(starter) = component.starter() {
        starter
            .start()
            .map_err(|e| case.fatal(format!("Start() error:\n{:#}", e)))?;
        debug!("{}: component started", case.name());
    }
    case.cleanup(move || match component.stopper() {
        Some(stopper) => stopper.stop().context("Stop() error"),
        None => Ok(()),
    });
    Ok(())
}
