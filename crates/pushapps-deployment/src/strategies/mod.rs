//! Deployment strategy implementations

pub mod blue_green;
pub mod executor;
pub mod standard;

pub use blue_green::{BlueGreenDeploymentExecutor, CutoverState};
pub use executor::DeploymentExecutor;
pub use standard::StandardDeploymentExecutor;

use pushapps_types::AppConfig;
use std::sync::Arc;

/// Pick the executor an application asks for
pub fn create_executor(app: &AppConfig) -> Arc<dyn DeploymentExecutor> {
    if app.blue_green_deploy {
        Arc::new(BlueGreenDeploymentExecutor::new())
    } else {
        Arc::new(StandardDeploymentExecutor)
    }
}
