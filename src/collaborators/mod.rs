//! # Collaborator Interfaces
//!
//! The orchestration core consumes four external services:
//!
//! - [`TopologyDirectory`]: which resilience and concurrency mode a WUP instance runs in
//! - [`Transport`]: one-way, best-effort delivery of a fulfillment task to an ingress endpoint
//! - [`AuditSink`]: fire-and-forget activity records
//! - [`ManifestMatcher`]: compatibility predicate between data manifests
//!
//! In-memory implementations live in [`in_memory`] for embedding hosts that do
//! not need real infrastructure and for tests.

pub mod in_memory;

use crate::constants::WILDCARD_TARGET;
use crate::error::TaskmeshError;
use crate::identity::Fdn;
use crate::models::{DataManifest, FulfillmentTask, Task};
use crate::resilience::{ConcurrencyMode, ResilienceMode};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

pub use in_memory::{
    InMemoryTopologyDirectory, InMemoryTransport, RecordingAuditSink, TracingAuditSink,
};

/// Deployment facts the topology directory holds for a WUP instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WupTopology {
    pub resilience_mode: ResilienceMode,
    pub concurrency_mode: ConcurrencyMode,
    /// Versioned WUP-function identifier
    pub function_id: Fdn,
}

#[async_trait]
pub trait TopologyDirectory: Send + Sync {
    /// Look up a WUP instance; `None` when the directory does not know it
    async fn resolve_wup(&self, wup_instance_id: &Fdn) -> Option<WupTopology>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Endpoint unreachable: {endpoint}")]
    Unreachable { endpoint: String },
    #[error("Delivery to {endpoint} rejected: {reason}")]
    Rejected { endpoint: String, reason: String },
}

impl From<TransportError> for TaskmeshError {
    fn from(err: TransportError) -> Self {
        TaskmeshError::Transport(err.to_string())
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Hand a task to the endpoint's inbound queue without waiting for processing
    async fn send(&self, endpoint: &str, task: FulfillmentTask) -> Result<(), TransportError>;
}

/// One audit-trail entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    pub event: String,
    pub task: Task,
    pub recorded_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(event: impl Into<String>, task: impl Into<Task>) -> Self {
        Self {
            event: event.into(),
            task: task.into(),
            recorded_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuditError {
    #[error("Audit sink unavailable: {0}")]
    Unavailable(String),
    #[error("Audit record could not be encoded: {0}")]
    Encoding(String),
}

impl From<AuditError> for TaskmeshError {
    fn from(err: AuditError) -> Self {
        TaskmeshError::Audit(err.to_string())
    }
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn log_activity(&self, record: AuditRecord) -> Result<(), AuditError>;
}

/// Write an audit record, logging rather than propagating failures
pub async fn log_activity_isolated(sink: &dyn AuditSink, record: AuditRecord) {
    let event = record.event.clone();
    let task_id = record.task.id().clone();
    if let Err(e) = sink.log_activity(record).await {
        warn!(
            event = %event,
            task_id = %task_id,
            error = %e,
            "Audit sink rejected activity record"
        );
    }
}

pub trait ManifestMatcher: Send + Sync {
    /// Whether a payload described by `offered` satisfies a `subscribed` manifest
    fn matches(&self, subscribed: &DataManifest, offered: &DataManifest) -> bool;

    /// Reserved value meaning "any" for versions and intended targets
    fn wildcard(&self) -> &str;
}

/// Content-type equality with version equality or wildcard
#[derive(Debug, Clone)]
pub struct DefaultManifestMatcher {
    wildcard: String,
}

impl DefaultManifestMatcher {
    pub fn new(wildcard: impl Into<String>) -> Self {
        Self {
            wildcard: wildcard.into(),
        }
    }
}

impl Default for DefaultManifestMatcher {
    fn default() -> Self {
        Self::new(WILDCARD_TARGET)
    }
}

impl ManifestMatcher for DefaultManifestMatcher {
    fn matches(&self, subscribed: &DataManifest, offered: &DataManifest) -> bool {
        subscribed.content_type == offered.content_type
            && (subscribed.content_version == offered.content_version
                || subscribed.content_version == self.wildcard
                || offered.content_version == self.wildcard)
    }

    fn wildcard(&self) -> &str {
        &self.wildcard
    }
}
