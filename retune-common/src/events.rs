//! Job lifecycle events
//!
//! Events are broadcast over a tokio channel and forwarded to SSE clients.
//! Emission never fails the emitting job: with no subscribers the event is dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Pipeline stage reported in events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    Created,
    Downloading,
    Analyzing,
    Planning,
    Transforming,
    Transcribing,
    Publishing,
    Success,
    Partial,
    Failed,
}

impl JobStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStage::Success | JobStage::Partial | JobStage::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStage::Created => "created",
            JobStage::Downloading => "downloading",
            JobStage::Analyzing => "analyzing",
            JobStage::Planning => "planning",
            JobStage::Transforming => "transforming",
            JobStage::Transcribing => "transcribing",
            JobStage::Publishing => "publishing",
            JobStage::Success => "success",
            JobStage::Partial => "partial",
            JobStage::Failed => "failed",
        }
    }
}

/// Job lifecycle event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JobEvent {
    /// Job entered a new stage
    StageChanged {
        job_id: String,
        stage: JobStage,
        timestamp: DateTime<Utc>,
    },

    /// A non-fatal stage failure was recorded
    StageDegraded {
        job_id: String,
        stage: JobStage,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Job reached a terminal state
    JobCompleted {
        job_id: String,
        status: JobStage,
        timestamp: DateTime<Utc>,
    },

    /// Job workspace removed from disk
    WorkspaceReleased {
        job_id: String,
        timestamp: DateTime<Utc>,
    },
}

impl JobEvent {
    /// Event type name for SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            JobEvent::StageChanged { .. } => "StageChanged",
            JobEvent::StageDegraded { .. } => "StageDegraded",
            JobEvent::JobCompleted { .. } => "JobCompleted",
            JobEvent::WorkspaceReleased { .. } => "WorkspaceReleased",
        }
    }

    pub fn job_id(&self) -> &str {
        match self {
            JobEvent::StageChanged { job_id, .. }
            | JobEvent::StageDegraded { job_id, .. }
            | JobEvent::JobCompleted { job_id, .. }
            | JobEvent::WorkspaceReleased { job_id, .. } => job_id,
        }
    }
}

/// Broadcast bus for job events
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<JobEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.tx.subscribe()
    }

    /// Emit an event; returns the number of subscribers that received it
    pub fn emit(&self, event: JobEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
