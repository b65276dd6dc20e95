//! Application state management

use std::sync::Arc;

use tracing::info;

use crate::app::options::AppOptions;
use crate::cache::service::CachedService;
use crate::deploy::cleanup::ChannelCleaner;
use crate::deploy::lifecycle::LifecycleValidator;
use crate::deploy::orchestrator::JobOrchestrator;
use crate::deploy::reporter::Reporter;
use crate::deploy::resolver::PackageResolver;
use crate::errors::OrchestratorError;
use crate::http::client::HttpClient;
use crate::http::service::DeploymentService;

/// Components wired around one shared service client
pub struct AppState {
    /// Cached platform client shared by every component
    pub service: Arc<dyn DeploymentService>,

    pub reporter: Arc<dyn Reporter>,

    pub validator: LifecycleValidator,

    pub resolver: PackageResolver,

    pub orchestrator: JobOrchestrator,

    pub cleaner: ChannelCleaner,
}

impl AppState {
    /// Build the HTTP client and the components on top of it
    pub fn init(options: &AppOptions, reporter: Arc<dyn Reporter>) -> Result<Self, OrchestratorError> {
        info!("Connecting to {}", options.server.base_url);
        let http_client = HttpClient::with_timeout(
            &options.server.base_url,
            options.server.api_key.clone(),
            options.server.timeout,
        )?;
        let service: Arc<dyn DeploymentService> =
            Arc::new(CachedService::new(Arc::new(http_client), options.cache_ttl));

        Ok(Self::with_service(options, service, reporter))
    }

    /// Wire the components around an existing service
    pub fn with_service(
        options: &AppOptions,
        service: Arc<dyn DeploymentService>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            validator: LifecycleValidator::new(service.clone()),
            resolver: PackageResolver::new(
                service.clone(),
                reporter.clone(),
                options.resolver.clone(),
            ),
            orchestrator: JobOrchestrator::new(
                service.clone(),
                reporter.clone(),
                options.orchestrator.clone(),
            ),
            cleaner: ChannelCleaner::new(service.clone(), reporter.clone(), options.cleaner.clone()),
            service,
            reporter,
        }
    }
}
