//! Operation logging and diagnostic log retrieval

use async_trait::async_trait;
use pushapps_platform::PlatformClient;
use pushapps_scheduler::LogSource;
use pushapps_types::LogLine;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Run `operation`, logging `<description>: STARTED`, `SUCCESS` or `ERROR`
pub async fn logged<T, E, F>(description: &str, operation: F) -> Result<T, E>
where
    E: Display,
    F: Future<Output = Result<T, E>>,
{
    debug!("{description}: STARTED");
    let result = operation.await;
    match &result {
        Ok(_) => info!("{description}: SUCCESS"),
        Err(e) => error!(error = %e, "{description}: ERROR"),
    }
    result
}

/// Recent application logs fetched from the platform
pub struct PlatformLogs {
    platform: Arc<dyn PlatformClient>,
}

impl PlatformLogs {
    pub fn new(platform: Arc<dyn PlatformClient>) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl LogSource for PlatformLogs {
    async fn recent_logs(&self, identifier: &str) -> Vec<LogLine> {
        match self.platform.recent_logs(identifier).await {
            Ok(lines) => lines,
            Err(e) => {
                warn!(app = %identifier, error = %e, "Unable to fetch recent logs");
                Vec::new()
            }
        }
    }
}
