use crate::cache::{CacheSweeper, TaskCache};
use crate::collaborators::{
    AuditSink, DefaultManifestMatcher, InMemoryTopologyDirectory, InMemoryTransport,
    ManifestMatcher, TopologyDirectory, TracingAuditSink, Transport,
};
use crate::config::ConfigManager;
use crate::distribution::TaskDistributor;
use crate::error::{TaskmeshError, TaskmeshResult};
use crate::registry::{PublisherRegistry, SubscriptionRegistry};
use crate::resilience::{FocusStrategyRegistry, ResilienceCoordinator};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// External services the core is wired to
pub struct Collaborators {
    pub topology: Arc<dyn TopologyDirectory>,
    pub transport: Arc<dyn Transport>,
    pub audit: Arc<dyn AuditSink>,
    /// Defaults to [`DefaultManifestMatcher`] with the configured wildcard
    pub matcher: Option<Arc<dyn ManifestMatcher>>,
    pub focus_strategies: FocusStrategyRegistry,
}

impl Collaborators {
    pub fn new(
        topology: Arc<dyn TopologyDirectory>,
        transport: Arc<dyn Transport>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            topology,
            transport,
            audit,
            matcher: None,
            focus_strategies: FocusStrategyRegistry::default(),
        }
    }

    /// In-memory topology and transport with tracing-backed audit
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryTopologyDirectory::new()),
            Arc::new(InMemoryTransport::new()),
            Arc::new(TracingAuditSink),
        )
    }

    pub fn with_matcher(mut self, matcher: Arc<dyn ManifestMatcher>) -> Self {
        self.matcher = Some(matcher);
        self
    }

    pub fn with_focus_strategies(mut self, strategies: FocusStrategyRegistry) -> Self {
        self.focus_strategies = strategies;
        self
    }
}

/// Shared core components, created once per process
///
/// This serves as the dependency container providing access to:
/// - Configuration manager
/// - Task cache
/// - Subscription and publisher registries
/// - Resilience coordinator
/// - Task distributor
pub struct SystemContext {
    /// System instance ID
    pub system_id: Uuid,
    pub config_manager: Arc<ConfigManager>,
    pub cache: Arc<TaskCache>,
    pub publishers: Arc<PublisherRegistry>,
    pub subscriptions: Arc<SubscriptionRegistry>,
    pub coordinator: Arc<ResilienceCoordinator>,
    pub distributor: Arc<TaskDistributor>,
}

impl std::fmt::Debug for SystemContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemContext")
            .field("system_id", &self.system_id)
            .field("environment", &self.config_manager.environment())
            .field("cached_parcels", &self.cache.len())
            .field("coordinator", &"Arc<ResilienceCoordinator>")
            .field("distributor", &"Arc<TaskDistributor>")
            .finish()
    }
}

impl SystemContext {
    /// Create SystemContext with environment-aware configuration loading
    pub fn new(collaborators: Collaborators) -> TaskmeshResult<Self> {
        info!("🔧 Initializing SystemContext with auto-detected environment configuration");
        let config_manager = ConfigManager::load().map_err(|e| {
            TaskmeshError::Configuration(format!("Failed to load configuration: {e}"))
        })?;
        Self::from_config(config_manager, collaborators)
    }

    pub fn from_config(
        config_manager: Arc<ConfigManager>,
        collaborators: Collaborators,
    ) -> TaskmeshResult<Self> {
        let config = config_manager.config();
        config.validate()?;

        let system_id = Uuid::new_v4();
        let cache = Arc::new(TaskCache::new(&config.cache)?);
        let matcher: Arc<dyn ManifestMatcher> = match collaborators.matcher {
            Some(matcher) => matcher,
            None => Arc::new(DefaultManifestMatcher::new(
                config.distribution.wildcard_target.clone(),
            )),
        };
        let publishers = Arc::new(PublisherRegistry::new());
        let subscriptions = Arc::new(SubscriptionRegistry::new(matcher, Arc::clone(&publishers)));

        let coordinator = Arc::new(ResilienceCoordinator::new(
            Arc::clone(&cache),
            collaborators.topology,
            collaborators.focus_strategies,
            Arc::clone(&collaborators.audit),
        ));
        let distributor = Arc::new(TaskDistributor::new(
            Arc::clone(&cache),
            Arc::clone(&subscriptions),
            collaborators.transport,
            collaborators.audit,
        ));

        info!(
            system_id = %system_id,
            environment = %config_manager.environment(),
            max_parcel_age_seconds = config.cache.max_parcel_age_seconds,
            "✅ SystemContext initialized"
        );

        Ok(Self {
            system_id,
            config_manager,
            cache,
            publishers,
            subscriptions,
            coordinator,
            distributor,
        })
    }

    /// Spawn the periodic cache sweep; must be called inside a tokio runtime
    pub fn start_housekeeping(&self) -> SweeperHandle {
        let mut sweeper = CacheSweeper::new(Arc::clone(&self.cache), &self.config_manager.config().cache);
        sweeper.start();
        SweeperHandle { sweeper }
    }
}

/// Running cache sweep; dropping the handle also stops it
#[derive(Debug)]
pub struct SweeperHandle {
    sweeper: CacheSweeper,
}

impl SweeperHandle {
    pub fn is_running(&self) -> bool {
        self.sweeper.is_running()
    }

    pub fn shutdown(mut self) {
        self.sweeper.stop();
    }
}
