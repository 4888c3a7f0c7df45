//! The subject-content engine: hybrid storage and prerequisite groups.
//!
//! Essential fields live in the record store; the extended curriculum
//! payload goes to the content-addressed blob store. The blob is written
//! *before* the record so a failed put can never leave a record pointing
//! at content that was never stored.

use std::sync::Arc;

use credex_core::{
    dim, evaluate_group, missing_subjects, CompletedSubjects, CreditsPolicy, ExtendedContent,
    ExtendedContentPatch, GroupType, PrerequisiteGroup, Sha256Hash, SubjectContent, SubjectType,
};
use credex_cas::{ContentStore, StoredBlob};
use credex_store::{PageRequest, PageResponse, RecordStore};

use crate::error::{EngineError, Result};
use crate::events::{DomainEvent, EventSink, TracingEventSink};

/// Page size used when a query has to walk a dimension to exhaustion.
const SCAN_PAGE: u64 = 256;

/// Input for creating a subject.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubject {
    pub institution: String,
    pub course_id: String,
    pub title: String,
    pub code: String,
    pub credits: u32,
    pub workload_hours: u32,
    pub subject_type: SubjectType,
    pub knowledge_area: String,
}

/// Result of a prerequisite eligibility check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityReport {
    /// Whether every prerequisite group of the subject is satisfied.
    pub eligible: bool,
    /// Listed subjects the student has not completed, across all
    /// unsatisfied groups.
    pub missing_subjects: Vec<String>,
}

/// Hybrid storage engine for subject content.
pub struct SubjectContentEngine<S, C> {
    store: Arc<S>,
    content: C,
    events: Arc<dyn EventSink>,
}

impl<S: RecordStore, C: ContentStore> SubjectContentEngine<S, C> {
    /// Create an engine over the given record and content stores.
    pub fn new(store: Arc<S>, content: C) -> Self {
        Self {
            store,
            content,
            events: Arc::new(TracingEventSink),
        }
    }

    /// Replace the event sink.
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Subject Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a subject, optionally with extended content.
    ///
    /// The extended payload is pushed to the blob store first; only a
    /// successful put is referenced from the record. A failed put aborts
    /// the whole operation with nothing persisted.
    pub async fn set_subject(
        &self,
        new: NewSubject,
        extended: Option<&ExtendedContent>,
    ) -> Result<SubjectContent> {
        let mut subject = SubjectContent {
            index: String::new(),
            subject_id: String::new(),
            institution: new.institution,
            course_id: new.course_id,
            title: new.title,
            code: new.code,
            credits: new.credits,
            workload_hours: new.workload_hours,
            subject_type: new.subject_type,
            knowledge_area: new.knowledge_area,
            content_hash: String::new(),
            content_locator: String::new(),
        };
        subject
            .validate()
            .map_err(|e| EngineError::InvalidRequest(e.to_string()))?;

        if let Some(extended) = extended.filter(|e| !e.is_empty()) {
            let bytes = extended
                .to_bytes()
                .map_err(|e| EngineError::Encoding(e.to_string()))?;
            let blob = self.content.put(&bytes).await?;
            subject.content_hash = blob.content_hash;
            subject.content_locator = blob.locator;
        }

        let stored = self.store.append(subject).await?;
        self.events.emit(DomainEvent::SubjectCreated {
            index: stored.index.clone(),
            institution: stored.institution.clone(),
            course_id: stored.course_id.clone(),
            code: stored.code.clone(),
        });
        Ok(stored)
    }

    /// Get a subject's essential fields.
    pub async fn get_subject(&self, index: &str) -> Result<SubjectContent> {
        self.store
            .get(index)
            .await?
            .ok_or_else(|| EngineError::NotFound("subject", index.to_string()))
    }

    /// Get a subject together with its extended content.
    ///
    /// An unreachable blob store is an error, not a silent empty default;
    /// a blob that does not hash to the stored `content_hash` is an
    /// integrity failure.
    pub async fn get_subject_full(
        &self,
        index: &str,
    ) -> Result<(SubjectContent, Option<ExtendedContent>)> {
        let subject = self.get_subject(index).await?;
        if !subject.has_extended_content() {
            return Ok((subject, None));
        }

        let bytes = self.content.get(&subject.content_locator).await?;

        let calculated = Sha256Hash::hash(&bytes).to_hex();
        if calculated != subject.content_hash {
            return Err(EngineError::IntegrityFailure {
                index: subject.index.clone(),
                stored: subject.content_hash.clone(),
                calculated,
            });
        }

        let extended = ExtendedContent::from_bytes(&bytes)
            .map_err(|e| EngineError::Encoding(e.to_string()))?;
        Ok((subject, Some(extended)))
    }

    /// Merge a partial extended-content update into a subject.
    ///
    /// Existing extended content is fetched best-effort as the merge base;
    /// the merged payload is re-stored and the subject's hash/locator are
    /// updated in one record write.
    pub async fn update_content(
        &self,
        index: &str,
        patch: ExtendedContentPatch,
    ) -> Result<StoredBlob> {
        if patch.is_empty() {
            return Err(EngineError::InvalidRequest(
                "no content updates provided".to_string(),
            ));
        }

        let mut subject = self.get_subject(index).await?;

        let mut extended = if subject.has_extended_content() {
            match self.content.get(&subject.content_locator).await {
                Ok(bytes) => ExtendedContent::from_bytes(&bytes).unwrap_or_default(),
                Err(_) => ExtendedContent::default(),
            }
        } else {
            ExtendedContent::default()
        };
        extended.apply(patch);

        let bytes = extended
            .to_bytes()
            .map_err(|e| EngineError::Encoding(e.to_string()))?;
        let blob = self.content.put(&bytes).await?;

        subject.content_hash = blob.content_hash.clone();
        subject.content_locator = blob.locator.clone();
        self.store.update(&subject).await?;

        self.events.emit(DomainEvent::SubjectContentUpdated {
            index: subject.index.clone(),
            content_hash: blob.content_hash.clone(),
            content_locator: blob.locator.clone(),
        });
        Ok(blob)
    }

    /// Subjects of an institution.
    pub async fn list_by_institution(
        &self,
        institution_id: &str,
        page: &PageRequest,
    ) -> Result<(Vec<SubjectContent>, PageResponse)> {
        Ok(self
            .store
            .list_by_prefix(dim::INSTITUTION, institution_id, page)
            .await?)
    }

    /// Subjects of a course.
    pub async fn list_by_course(
        &self,
        course_id: &str,
        page: &PageRequest,
    ) -> Result<(Vec<SubjectContent>, PageResponse)> {
        Ok(self.store.list_by_prefix(dim::COURSE, course_id, page).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Prerequisite Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Attach a prerequisite group to a subject.
    ///
    /// The owning subject and every referenced subject must exist.
    pub async fn add_prerequisite_group(
        &self,
        subject_id: &str,
        group_type: GroupType,
        minimum_credits: u64,
        minimum_completed_subjects: u64,
        subject_ids: Vec<String>,
    ) -> Result<PrerequisiteGroup> {
        if subject_id.is_empty() {
            return Err(EngineError::InvalidRequest(
                "subject id cannot be empty".to_string(),
            ));
        }
        self.get_subject(subject_id).await?;

        for prereq_id in &subject_ids {
            if prereq_id.is_empty() {
                return Err(EngineError::InvalidRequest(
                    "prerequisite subject id cannot be empty".to_string(),
                ));
            }
            if self.store.get::<SubjectContent>(prereq_id).await?.is_none() {
                return Err(EngineError::NotFound(
                    "prerequisite subject",
                    prereq_id.clone(),
                ));
            }
        }

        let group = PrerequisiteGroup {
            id: String::new(),
            subject_id: subject_id.to_string(),
            group_type,
            minimum_credits,
            minimum_completed_subjects,
            subject_ids,
        };
        let stored = self.store.append(group).await?;

        self.events.emit(DomainEvent::PrerequisiteGroupAdded {
            id: stored.id.clone(),
            subject_id: stored.subject_id.clone(),
            group_type: stored.group_type,
        });
        Ok(stored)
    }

    /// All prerequisite groups of a subject.
    pub async fn groups_for_subject(&self, subject_id: &str) -> Result<Vec<PrerequisiteGroup>> {
        let mut groups = Vec::new();
        let mut page = PageRequest::with_limit(SCAN_PAGE);
        loop {
            let (batch, info) = self
                .store
                .list_by_prefix::<PrerequisiteGroup>(dim::SUBJECT, subject_id, &page)
                .await?;
            groups.extend(batch);
            match info.next_cursor {
                Some(cursor) => page = PageRequest::from_cursor(cursor, SCAN_PAGE),
                None => break,
            }
        }
        Ok(groups)
    }

    /// Evaluate a student's eligibility for a subject.
    ///
    /// Every prerequisite group must be satisfied; missing subjects are
    /// aggregated across unsatisfied groups for reporting.
    pub async fn check_eligibility(
        &self,
        subject_id: &str,
        completed: &CompletedSubjects,
        policy: CreditsPolicy,
    ) -> Result<EligibilityReport> {
        self.get_subject(subject_id).await?;
        let groups = self.groups_for_subject(subject_id).await?;

        let mut eligible = true;
        let mut missing = Vec::new();
        for group in &groups {
            if !evaluate_group(group, completed, policy) {
                eligible = false;
                for subject in missing_subjects(group, completed, policy) {
                    if !missing.contains(&subject) {
                        missing.push(subject);
                    }
                }
            }
        }

        Ok(EligibilityReport {
            eligible,
            missing_subjects: missing,
        })
    }
}
