//! Domain events emitted by the engines.
//!
//! Events describe completed state changes; they are emitted after the
//! store write succeeds, never before.

use std::sync::Mutex;

use credex_core::{EquivalenceStatus, GroupType};

/// A completed state change.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    EquivalenceRequested {
        index: String,
        source_subject_id: String,
        target_subject_id: String,
        target_institution: String,
    },
    EquivalenceAnalyzed {
        index: String,
        contract_address: String,
        percent: String,
        status: EquivalenceStatus,
        analysis_hash: String,
    },
    EquivalenceReanalyzed {
        index: String,
        previous_status: EquivalenceStatus,
        new_status: EquivalenceStatus,
        reason: String,
    },
    BatchRequested {
        total: u64,
        successful: u64,
        failed: u64,
    },
    SubjectCreated {
        index: String,
        institution: String,
        course_id: String,
        code: String,
    },
    SubjectContentUpdated {
        index: String,
        content_hash: String,
        content_locator: String,
    },
    PrerequisiteGroupAdded {
        id: String,
        subject_id: String,
        group_type: GroupType,
    },
}

/// Sink for domain events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: DomainEvent);
}

/// Default sink: structured log lines via `tracing`.
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: DomainEvent) {
        match &event {
            DomainEvent::EquivalenceRequested {
                index,
                source_subject_id,
                target_subject_id,
                target_institution,
            } => {
                tracing::info!(
                    %index,
                    %source_subject_id,
                    %target_subject_id,
                    %target_institution,
                    "equivalence requested"
                );
            }
            DomainEvent::EquivalenceAnalyzed {
                index,
                contract_address,
                percent,
                status,
                analysis_hash,
            } => {
                tracing::info!(
                    %index,
                    %contract_address,
                    %percent,
                    status = status.as_str(),
                    %analysis_hash,
                    "equivalence analyzed"
                );
            }
            DomainEvent::EquivalenceReanalyzed {
                index,
                previous_status,
                new_status,
                reason,
            } => {
                tracing::info!(
                    %index,
                    previous_status = previous_status.as_str(),
                    new_status = new_status.as_str(),
                    %reason,
                    "equivalence reanalyzed"
                );
            }
            DomainEvent::BatchRequested {
                total,
                successful,
                failed,
            } => {
                tracing::info!(total, successful, failed, "batch equivalence requested");
            }
            DomainEvent::SubjectCreated {
                index,
                institution,
                course_id,
                code,
            } => {
                tracing::info!(%index, %institution, %course_id, %code, "subject created");
            }
            DomainEvent::SubjectContentUpdated {
                index,
                content_hash,
                content_locator,
            } => {
                tracing::info!(
                    %index,
                    %content_hash,
                    %content_locator,
                    "subject content updated"
                );
            }
            DomainEvent::PrerequisiteGroupAdded {
                id,
                subject_id,
                group_type,
            } => {
                tracing::info!(
                    %id,
                    %subject_id,
                    group_type = group_type.as_str(),
                    "prerequisite group added"
                );
            }
        }
    }
}

/// Sink that records events for inspection in tests.
#[derive(Default)]
pub struct CollectingEventSink {
    events: Mutex<Vec<DomainEvent>>,
}

impl CollectingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events emitted so far.
    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Drain the recorded events.
    pub fn take(&self) -> Vec<DomainEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

impl EventSink for CollectingEventSink {
    fn emit(&self, event: DomainEvent) {
        self.events.lock().unwrap().push(event);
    }
}
