//! Test fixtures for wiring an in-memory mesh.

#![allow(dead_code)] // Not every test binary uses every fixture

use std::sync::Arc;
use taskmesh_core::collaborators::{
    InMemoryTopologyDirectory, InMemoryTransport, RecordingAuditSink, WupTopology,
};
use taskmesh_core::config::{ConfigManager, TaskmeshConfig};
use taskmesh_core::models::{ActionableTask, DataManifest, UnitOfWork, UoWPayload};
use taskmesh_core::resilience::{ConcurrencyMode, ResilienceMode};
use taskmesh_core::system_context::{Collaborators, SystemContext};
use taskmesh_core::Fdn;
use uuid::Uuid;

/// A system context plus handles on its in-memory collaborators
pub struct TestMesh {
    pub context: SystemContext,
    pub topology: Arc<InMemoryTopologyDirectory>,
    pub transport: Arc<InMemoryTransport>,
    pub audit: Arc<RecordingAuditSink>,
}

impl TestMesh {
    pub fn new() -> Self {
        Self::with_config(TaskmeshConfig::default())
    }

    pub fn with_config(config: TaskmeshConfig) -> Self {
        let topology = Arc::new(InMemoryTopologyDirectory::new());
        let transport = Arc::new(InMemoryTransport::new());
        let audit = Arc::new(RecordingAuditSink::new());
        let collaborators = Collaborators::new(topology.clone(), transport.clone(), audit.clone());
        let manager = ConfigManager::from_config(config).expect("valid test configuration");
        let context =
            SystemContext::from_config(manager, collaborators).expect("system context builds");
        Self {
            context,
            topology,
            transport,
            audit,
        }
    }

    /// Deploy a WUP instance of `function` in the given modes
    pub fn deploy_wup(
        &self,
        instance: &str,
        function: &str,
        resilience: ResilienceMode,
        concurrency: ConcurrencyMode,
    ) -> Fdn {
        let instance_id = Fdn::from_token(&format!("[site=a][wup={function}][instance={instance}]"))
            .expect("valid instance token");
        self.topology.register(
            instance_id.clone(),
            WupTopology {
                resilience_mode: resilience,
                concurrency_mode: concurrency,
                function_id: function_id(function),
            },
        );
        instance_id
    }
}

pub fn function_id(function: &str) -> Fdn {
    Fdn::new("wup", function)
        .expect("valid function id")
        .with_version("1.0")
}

pub fn observation_manifest() -> DataManifest {
    DataManifest::new(
        Fdn::from_token("[resource=Observation][format=json]").expect("valid content type"),
        "4.0",
    )
}

/// A unit of work with a unique instance id and routable ingress
pub fn unique_uow(manifest: DataManifest) -> UnitOfWork {
    UnitOfWork::with_instance_id(
        Fdn::new("uow", Uuid::new_v4().to_string()).expect("valid uow id"),
        Fdn::new("uow-type", "observation").expect("valid uow type"),
        Some(UoWPayload::new(manifest, "{\"code\":\"8867-4\"}")),
    )
}

pub fn actionable_task(manifest: DataManifest) -> ActionableTask {
    ActionableTask::new(
        Fdn::new("task", Uuid::new_v4().to_string()).expect("valid task id"),
        unique_uow(manifest),
    )
    .with_wup_function(function_id("ingest"))
}
