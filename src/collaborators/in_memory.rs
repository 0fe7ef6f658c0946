//! In-memory collaborator implementations.

use super::{
    AuditError, AuditRecord, AuditSink, TopologyDirectory, Transport, TransportError, WupTopology,
};
use crate::identity::Fdn;
use crate::models::FulfillmentTask;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use tracing::{debug, info};

/// Topology directory backed by a concurrent map
#[derive(Debug, Default)]
pub struct InMemoryTopologyDirectory {
    entries: DashMap<Fdn, WupTopology>,
}

impl InMemoryTopologyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, wup_instance_id: Fdn, topology: WupTopology) {
        self.entries.insert(wup_instance_id, topology);
    }

    pub fn remove(&self, wup_instance_id: &Fdn) -> Option<WupTopology> {
        self.entries.remove(wup_instance_id).map(|(_, t)| t)
    }
}

#[async_trait]
impl TopologyDirectory for InMemoryTopologyDirectory {
    async fn resolve_wup(&self, wup_instance_id: &Fdn) -> Option<WupTopology> {
        self.entries.get(wup_instance_id).map(|e| e.value().clone())
    }
}

/// A task handed to [`InMemoryTransport`]
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub endpoint: String,
    pub task: FulfillmentTask,
    pub sent_at: DateTime<Utc>,
}

/// Transport that records every delivery instead of sending it
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    deliveries: Mutex<Vec<Delivery>>,
    unreachable: DashSet<String>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends to `endpoint` fail
    pub fn mark_unreachable(&self, endpoint: impl Into<String>) {
        self.unreachable.insert(endpoint.into());
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().clone()
    }

    pub fn deliveries_to(&self, endpoint: &str) -> Vec<Delivery> {
        self.deliveries
            .lock()
            .iter()
            .filter(|d| d.endpoint == endpoint)
            .cloned()
            .collect()
    }

    pub fn delivery_count(&self) -> usize {
        self.deliveries.lock().len()
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn send(&self, endpoint: &str, task: FulfillmentTask) -> Result<(), TransportError> {
        if self.unreachable.contains(endpoint) {
            return Err(TransportError::Unreachable {
                endpoint: endpoint.to_string(),
            });
        }
        debug!(endpoint = %endpoint, task_id = %task.id(), "Recording in-memory delivery");
        self.deliveries.lock().push(Delivery {
            endpoint: endpoint.to_string(),
            task,
            sent_at: Utc::now(),
        });
        Ok(())
    }
}

/// Audit sink that writes JSON records to the `taskmesh::audit` tracing target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn log_activity(&self, record: AuditRecord) -> Result<(), AuditError> {
        let payload =
            serde_json::to_string(&record).map_err(|e| AuditError::Encoding(e.to_string()))?;
        info!(
            target: "taskmesh::audit",
            event = %record.event,
            task_id = %record.task.id(),
            record = %payload,
            "📋 AUDIT"
        );
        Ok(())
    }
}

/// Audit sink that keeps records in memory
#[derive(Debug, Default)]
pub struct RecordingAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl RecordingAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().clone()
    }

    pub fn events(&self) -> Vec<String> {
        self.records.lock().iter().map(|r| r.event.clone()).collect()
    }
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn log_activity(&self, record: AuditRecord) -> Result<(), AuditError> {
        self.records.lock().push(record);
        Ok(())
    }
}
