//! Deployment context shared by every stage of the application phase

use pushapps_platform::PlatformClient;
use std::collections::HashSet;
use std::sync::Arc;

/// Concurrency and retry settings applied to every scheduler in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub max_in_flight: usize,
    pub retries: u32,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            max_in_flight: 2,
            retries: 3,
        }
    }
}

/// Platform snapshot taken once before applications are deployed
pub struct DeploymentContext {
    platform: Arc<dyn PlatformClient>,
    available_services: HashSet<String>,
    stacks: Vec<String>,
    existing_applications: HashSet<String>,
    settings: SchedulerSettings,
}

impl DeploymentContext {
    pub fn new(
        platform: Arc<dyn PlatformClient>,
        available_services: HashSet<String>,
        stacks: Vec<String>,
        existing_applications: HashSet<String>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            platform,
            available_services,
            stacks,
            existing_applications,
            settings,
        }
    }

    pub fn platform(&self) -> &Arc<dyn PlatformClient> {
        &self.platform
    }

    pub fn settings(&self) -> SchedulerSettings {
        self.settings
    }

    /// Whether a service was created in this run or already existed
    pub fn is_service_available(&self, name: &str) -> bool {
        self.available_services.contains(name)
    }

    /// Whether an application existed before the application phase began
    pub fn application_exists(&self, name: &str) -> bool {
        self.existing_applications.contains(name)
    }

    /// First preferred stack the platform offers; `None` means platform default
    pub fn select_stack(&self, priority: &[String]) -> Option<String> {
        priority
            .iter()
            .find(|stack| self.stacks.contains(stack))
            .cloned()
    }
}
