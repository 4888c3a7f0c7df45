//! The equivalence engine: request lifecycle, analysis execution, and
//! multi-dimensional queries.
//!
//! State machine over [`EquivalenceStatus`]: records enter as `Pending`
//! and move to `Approved`/`Rejected` (or `Error`) through analysis; any
//! state is re-enterable through reanalysis. Provider failure leaves the
//! record exactly as it was.

use std::sync::Arc;

use credex_core::{analysis_digest, dim, EquivalenceRecord, EquivalenceStatus, Percent};
use credex_store::keys::{decode_cursor, encode_cursor};
use credex_store::{PageRequest, PageResponse, RecordStore};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::events::{DomainEvent, EventSink, TracingEventSink};
use crate::provider::{AnalysisOutcome, AnalysisProvider};

/// Page size used when a query has to walk a dimension to exhaustion.
const SCAN_PAGE: u64 = 256;

/// One item of a batch request.
#[derive(Debug, Clone, PartialEq)]
pub struct EquivalenceRequest {
    pub source_subject_id: String,
    pub target_subject_id: String,
    pub target_institution: String,
}

/// Per-item result of a batch request.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem {
    pub source_subject_id: String,
    pub target_subject_id: String,
    pub outcome: BatchItemOutcome,
}

/// Whether a batch item was created or rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchItemOutcome {
    Created { index: String },
    Failed { error: String },
}

/// Aggregate result of a batch request.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub results: Vec<BatchItem>,
    pub successful: u64,
    pub failed: u64,
}

/// Aggregate statistics over all equivalence records.
#[derive(Debug, Clone, PartialEq)]
pub struct EquivalenceStats {
    pub total: u64,
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
    pub error: u64,
    /// Mean over records that carry a percent; `None` when there are none.
    pub average_percent: Option<Percent>,
    pub institutions: u64,
    pub subjects: u64,
    /// Sum of analysis executions across all records.
    pub total_analyses: u64,
    /// Distinct contract versions seen, sorted.
    pub contract_versions: Vec<String>,
}

/// The equivalence-record state machine.
pub struct EquivalenceEngine<S, P> {
    store: Arc<S>,
    provider: P,
    config: EngineConfig,
    events: Arc<dyn EventSink>,
}

impl<S: RecordStore, P: AnalysisProvider> EquivalenceEngine<S, P> {
    /// Create an engine over the given store and provider.
    pub fn new(store: Arc<S>, provider: P, config: EngineConfig) -> Self {
        Self {
            store,
            provider,
            config,
            events: Arc::new(TracingEventSink),
        }
    }

    /// Replace the event sink.
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Request Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a new equivalence request, returning the assigned index.
    ///
    /// A pending record is appended with `analysis_count = 0`. If a record
    /// for the same (source, target) pair already exists the request is
    /// rejected, unless `force_recalculation` is set, in which case the
    /// existing record is reset to a fresh pending evaluation.
    pub async fn create_request(
        &self,
        source_subject_id: &str,
        target_subject_id: &str,
        target_institution: &str,
        force_recalculation: bool,
    ) -> Result<String> {
        let record = EquivalenceRecord::new_request(
            source_subject_id,
            target_subject_id,
            target_institution,
            now_millis(),
        );
        record
            .validate_request()
            .map_err(|e| EngineError::InvalidRequest(e.to_string()))?;

        if let Some(existing) = self.check_status(source_subject_id, target_subject_id).await? {
            if !force_recalculation {
                return Err(EngineError::InvalidRequest(
                    "equivalence already exists between subjects".to_string(),
                ));
            }

            // Reset to a fresh evaluation; counts and contract identity
            // survive so reanalysis can reuse the previous provider.
            let mut reset = existing;
            reset.status = EquivalenceStatus::Pending;
            reset.equivalence_percent = None;
            reset.analysis_metadata = serde_json::Value::Null;
            reset.analysis_hash = String::new();
            reset.last_update_timestamp = now_millis();
            self.store.update(&reset).await?;

            self.events.emit(DomainEvent::EquivalenceRequested {
                index: reset.index.clone(),
                source_subject_id: source_subject_id.to_string(),
                target_subject_id: target_subject_id.to_string(),
                target_institution: target_institution.to_string(),
            });
            return Ok(reset.index);
        }

        let stored = self.store.append(record).await?;
        self.events.emit(DomainEvent::EquivalenceRequested {
            index: stored.index.clone(),
            source_subject_id: source_subject_id.to_string(),
            target_subject_id: target_subject_id.to_string(),
            target_institution: target_institution.to_string(),
        });
        Ok(stored.index)
    }

    /// Process a batch of requests, isolating per-item failures.
    ///
    /// One malformed item never blocks the rest; the aggregate result
    /// separates successes from failures instead of raising.
    pub async fn batch_request(
        &self,
        requests: &[EquivalenceRequest],
        force_recalculation: bool,
    ) -> Result<BatchOutcome> {
        if requests.is_empty() {
            return Err(EngineError::InvalidRequest(
                "no requests provided".to_string(),
            ));
        }

        let mut results = Vec::with_capacity(requests.len());
        let mut successful = 0u64;
        let mut failed = 0u64;

        for request in requests {
            let outcome = match self
                .create_request(
                    &request.source_subject_id,
                    &request.target_subject_id,
                    &request.target_institution,
                    force_recalculation,
                )
                .await
            {
                Ok(index) => {
                    successful += 1;
                    BatchItemOutcome::Created { index }
                }
                Err(e) => {
                    failed += 1;
                    BatchItemOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            results.push(BatchItem {
                source_subject_id: request.source_subject_id.clone(),
                target_subject_id: request.target_subject_id.clone(),
                outcome,
            });
        }

        self.events.emit(DomainEvent::BatchRequested {
            total: requests.len() as u64,
            successful,
            failed,
        });

        Ok(BatchOutcome {
            results,
            successful,
            failed,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Analysis Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Execute the external analysis for a record.
    ///
    /// On provider failure the record is left unchanged. On success the
    /// result fields are overwritten, the integrity hash is recomputed,
    /// the analysis count is incremented, and the status becomes
    /// `Approved` or `Rejected` against the configured threshold.
    pub async fn execute_analysis(
        &self,
        index: &str,
        contract_address: &str,
    ) -> Result<EquivalenceRecord> {
        if contract_address.is_empty() {
            return Err(EngineError::InvalidRequest(
                "contract address cannot be empty".to_string(),
            ));
        }

        let mut record = self.get(index).await?;
        let outcome = self
            .run_analysis(&record.source_subject_id, &record.target_subject_id)
            .await?;

        self.apply_outcome(&mut record, contract_address, outcome);
        self.store.update(&record).await?;

        self.events.emit(DomainEvent::EquivalenceAnalyzed {
            index: record.index.clone(),
            contract_address: contract_address.to_string(),
            percent: record
                .equivalence_percent
                .as_ref()
                .map(|p| p.as_str().to_string())
                .unwrap_or_default(),
            status: record.status,
            analysis_hash: record.analysis_hash.clone(),
        });

        Ok(record)
    }

    /// Re-run the analysis for a record, regardless of its current status.
    ///
    /// When no contract address is given the record's existing one is
    /// reused; with neither available the request fails.
    pub async fn reanalyze(
        &self,
        index: &str,
        contract_address: Option<&str>,
        reason: &str,
    ) -> Result<EquivalenceRecord> {
        let mut record = self.get(index).await?;

        let address = match contract_address {
            Some(address) if !address.is_empty() => address.to_string(),
            _ => {
                if record.contract_address.is_empty() {
                    return Err(EngineError::InvalidContractAddress);
                }
                record.contract_address.clone()
            }
        };

        let previous_status = record.status;
        let mut outcome = self
            .run_analysis(&record.source_subject_id, &record.target_subject_id)
            .await?;

        if !reason.is_empty() {
            if let serde_json::Value::Object(map) = &mut outcome.metadata {
                map.insert("reanalysis_reason".to_string(), reason.into());
            }
        }

        self.apply_outcome(&mut record, &address, outcome);
        self.store.update(&record).await?;

        self.events.emit(DomainEvent::EquivalenceReanalyzed {
            index: record.index.clone(),
            previous_status,
            new_status: record.status,
            reason: reason.to_string(),
        });

        Ok(record)
    }

    /// Call the provider with the configured timeout and bounded retries.
    async fn run_analysis(&self, source: &str, target: &str) -> Result<AnalysisOutcome> {
        let attempts = self.config.max_analysis_retries.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match tokio::time::timeout(
                self.config.analysis_timeout,
                self.provider.analyze(source, target),
            )
            .await
            {
                Ok(Ok(outcome)) => return Ok(outcome),
                Ok(Err(e)) => {
                    last_error = e.to_string();
                    tracing::warn!(attempt, error = %last_error, "analysis attempt failed");
                }
                Err(_) => {
                    last_error =
                        format!("timed out after {:?}", self.config.analysis_timeout);
                    tracing::warn!(attempt, error = %last_error, "analysis attempt failed");
                }
            }
        }

        Err(EngineError::AnalysisFailed(last_error))
    }

    /// Fold a provider outcome into a record.
    fn apply_outcome(
        &self,
        record: &mut EquivalenceRecord,
        contract_address: &str,
        outcome: AnalysisOutcome,
    ) {
        record.status = if outcome.percent.at_least(&self.config.approval_threshold) {
            EquivalenceStatus::Approved
        } else {
            EquivalenceStatus::Rejected
        };
        record.analysis_hash =
            analysis_digest(&outcome.metadata, outcome.percent.as_str(), contract_address)
                .to_hex();
        record.equivalence_percent = Some(outcome.percent);
        record.analysis_metadata = outcome.metadata;
        record.contract_address = contract_address.to_string();
        record.contract_version = outcome.contract_version;
        record.analysis_count += 1;
        record.last_update_timestamp = now_millis();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Query Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a record by index.
    pub async fn get(&self, index: &str) -> Result<EquivalenceRecord> {
        self.store
            .get(index)
            .await?
            .ok_or_else(|| EngineError::NotFound("equivalence", index.to_string()))
    }

    /// The current record for a (source, target) pair, if one exists.
    ///
    /// When the pair has been requested more than once, the most recent
    /// record wins.
    pub async fn check_status(
        &self,
        source_subject_id: &str,
        target_subject_id: &str,
    ) -> Result<Option<EquivalenceRecord>> {
        let mut best: Option<EquivalenceRecord> = None;
        let mut page = PageRequest::with_limit(SCAN_PAGE);

        loop {
            let (records, info) = self
                .store
                .list_by_prefix::<EquivalenceRecord>(dim::SOURCE, source_subject_id, &page)
                .await?;

            for record in records {
                if record.target_subject_id != target_subject_id {
                    continue;
                }
                let newer = match &best {
                    Some(current) => index_value(&record.index) > index_value(&current.index),
                    None => true,
                };
                if newer {
                    best = Some(record);
                }
            }

            match info.next_cursor {
                Some(cursor) => page = PageRequest::from_cursor(cursor, SCAN_PAGE),
                None => break,
            }
        }

        Ok(best)
    }

    /// List all records in insertion order.
    pub async fn list(
        &self,
        page: &PageRequest,
    ) -> Result<(Vec<EquivalenceRecord>, PageResponse)> {
        Ok(self.store.list(page).await?)
    }

    /// Records whose source is the given subject.
    pub async fn list_by_source(
        &self,
        source_subject_id: &str,
        status_filter: Option<EquivalenceStatus>,
        page: &PageRequest,
    ) -> Result<(Vec<EquivalenceRecord>, PageResponse)> {
        self.list_dimension(dim::SOURCE, source_subject_id, status_filter, page)
            .await
    }

    /// Records whose target is the given subject.
    pub async fn list_by_target(
        &self,
        target_subject_id: &str,
        status_filter: Option<EquivalenceStatus>,
        page: &PageRequest,
    ) -> Result<(Vec<EquivalenceRecord>, PageResponse)> {
        self.list_dimension(dim::TARGET, target_subject_id, status_filter, page)
            .await
    }

    /// Records targeting the given institution.
    pub async fn list_by_institution(
        &self,
        institution_id: &str,
        status_filter: Option<EquivalenceStatus>,
        page: &PageRequest,
    ) -> Result<(Vec<EquivalenceRecord>, PageResponse)> {
        self.list_dimension(dim::INSTITUTION, institution_id, status_filter, page)
            .await
    }

    /// Records in the given status.
    pub async fn list_by_status(
        &self,
        status: EquivalenceStatus,
        page: &PageRequest,
    ) -> Result<(Vec<EquivalenceRecord>, PageResponse)> {
        Ok(self
            .store
            .list_by_prefix(dim::STATUS, status.as_str(), page)
            .await?)
    }

    /// Records analyzed by the given contract.
    pub async fn list_by_contract(
        &self,
        contract_address: &str,
        page: &PageRequest,
    ) -> Result<(Vec<EquivalenceRecord>, PageResponse)> {
        Ok(self
            .store
            .list_by_prefix(dim::CONTRACT, contract_address, page)
            .await?)
    }

    /// Records analyzed by the given contract version.
    pub async fn list_by_contract_version(
        &self,
        contract_version: &str,
        page: &PageRequest,
    ) -> Result<(Vec<EquivalenceRecord>, PageResponse)> {
        Ok(self
            .store
            .list_by_prefix(dim::CONTRACT_VERSION, contract_version, page)
            .await?)
    }

    /// Aggregate statistics over all records.
    pub async fn stats(&self) -> Result<EquivalenceStats> {
        use std::collections::BTreeSet;

        let mut stats = EquivalenceStats {
            total: 0,
            pending: 0,
            approved: 0,
            rejected: 0,
            error: 0,
            average_percent: None,
            institutions: 0,
            subjects: 0,
            total_analyses: 0,
            contract_versions: Vec::new(),
        };

        let mut institutions = BTreeSet::new();
        let mut subjects = BTreeSet::new();
        let mut versions = BTreeSet::new();
        let mut percent_sum = 0.0f64;
        let mut percent_count = 0u64;

        let mut page = PageRequest::with_limit(SCAN_PAGE);
        loop {
            let (records, info) = self.store.list::<EquivalenceRecord>(&page).await?;
            for record in records {
                stats.total += 1;
                match record.status {
                    EquivalenceStatus::Pending => stats.pending += 1,
                    EquivalenceStatus::Approved => stats.approved += 1,
                    EquivalenceStatus::Rejected => stats.rejected += 1,
                    EquivalenceStatus::Error => stats.error += 1,
                }

                institutions.insert(record.target_institution);
                subjects.insert(record.source_subject_id);
                subjects.insert(record.target_subject_id);
                if !record.contract_version.is_empty() {
                    versions.insert(record.contract_version);
                }
                if let Some(percent) = &record.equivalence_percent {
                    percent_sum += percent.value();
                    percent_count += 1;
                }
                stats.total_analyses += record.analysis_count;
            }

            match info.next_cursor {
                Some(cursor) => page = PageRequest::from_cursor(cursor, SCAN_PAGE),
                None => break,
            }
        }

        stats.institutions = institutions.len() as u64;
        stats.subjects = subjects.len() as u64;
        stats.contract_versions = versions.into_iter().collect();
        if percent_count > 0 {
            let mean = percent_sum / percent_count as f64;
            stats.average_percent = Percent::parse(&format!("{:.2}", mean)).ok();
        }

        Ok(stats)
    }

    /// Dimension listing with an optional status filter.
    ///
    /// The unfiltered path is a plain index range scan. With a filter the
    /// dimension is walked to exhaustion first so that `total` and the
    /// page walk both describe the *filtered* set exactly.
    async fn list_dimension(
        &self,
        dimension: &'static str,
        key: &str,
        status_filter: Option<EquivalenceStatus>,
        page: &PageRequest,
    ) -> Result<(Vec<EquivalenceRecord>, PageResponse)> {
        let Some(status) = status_filter else {
            return Ok(self.store.list_by_prefix(dimension, key, page).await?);
        };

        let mut matching = Vec::new();
        let mut scan = PageRequest::with_limit(SCAN_PAGE);
        loop {
            let (records, info) = self
                .store
                .list_by_prefix::<EquivalenceRecord>(dimension, key, &scan)
                .await?;
            matching.extend(records.into_iter().filter(|r| r.status == status));
            match info.next_cursor {
                Some(cursor) => scan = PageRequest::from_cursor(cursor, SCAN_PAGE),
                None => break,
            }
        }

        paginate_in_place(matching, page)
    }
}

/// Page an already-materialized record list by position.
///
/// Cursors over filtered sets are positional: the encoded continuation is
/// the next start offset.
fn paginate_in_place(
    records: Vec<EquivalenceRecord>,
    page: &PageRequest,
) -> Result<(Vec<EquivalenceRecord>, PageResponse)> {
    let total = records.len() as u64;
    let limit = page.effective_limit();

    let start = match &page.cursor {
        Some(cursor) => decode_cursor(cursor)?
            .parse::<u64>()
            .map_err(|_| credex_store::StoreError::InvalidCursor(cursor.clone()))?,
        None => page.offset,
    };

    let end = (start + limit).min(total);
    let items: Vec<EquivalenceRecord> = records
        .into_iter()
        .skip(start as usize)
        .take(limit as usize)
        .collect();

    let next_cursor = if end < total {
        Some(encode_cursor(&end.to_string()))
    } else {
        None
    };

    Ok((items, PageResponse { next_cursor, total }))
}

/// Numeric value behind a primary index, for recency comparison.
fn index_value(index: &str) -> u64 {
    index.parse().unwrap_or(0)
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingEventSink;
    use crate::provider::ProviderError;
    use async_trait::async_trait;
    use credex_store::MemoryStore;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Provider that replays a script of outcomes, then falls back to a
    /// fixed approval-grade result.
    struct ScriptedProvider {
        script: Mutex<VecDeque<std::result::Result<AnalysisOutcome, ProviderError>>>,
    }

    impl ScriptedProvider {
        fn approving() -> Self {
            Self {
                script: Mutex::new(VecDeque::new()),
            }
        }

        fn with_script(
            script: Vec<std::result::Result<AnalysisOutcome, ProviderError>>,
        ) -> Self {
            Self {
                script: Mutex::new(script.into()),
            }
        }

        fn default_outcome() -> AnalysisOutcome {
            AnalysisOutcome {
                percent: Percent::parse("85.50").unwrap(),
                metadata: serde_json::json!({
                    "analysis_method": "content_comparison",
                    "confidence_level": "high",
                    "similarity_score": 85.5,
                }),
                contract_version: "v1.0.0".to_string(),
            }
        }
    }

    #[async_trait]
    impl AnalysisProvider for ScriptedProvider {
        async fn analyze(
            &self,
            _source: &str,
            _target: &str,
        ) -> std::result::Result<AnalysisOutcome, ProviderError> {
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Self::default_outcome()))
        }
    }

    fn engine(provider: ScriptedProvider) -> EquivalenceEngine<MemoryStore, ScriptedProvider> {
        EquivalenceEngine::new(
            Arc::new(MemoryStore::new()),
            provider,
            EngineConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_create_request_pending_with_zero_count() {
        let engine = engine(ScriptedProvider::approving());
        let index = engine
            .create_request("A", "B", "inst1", false)
            .await
            .unwrap();
        assert_eq!(index, "1");

        let record = engine.get(&index).await.unwrap();
        assert_eq!(record.status, EquivalenceStatus::Pending);
        assert_eq!(record.analysis_count, 0);
        assert!(record.equivalence_percent.is_none());
    }

    #[tokio::test]
    async fn test_create_request_validation() {
        let engine = engine(ScriptedProvider::approving());

        assert!(matches!(
            engine.create_request("", "B", "inst1", false).await,
            Err(EngineError::InvalidRequest(_))
        ));
        assert!(matches!(
            engine.create_request("A", "A", "inst1", false).await,
            Err(EngineError::InvalidRequest(_))
        ));
        assert!(matches!(
            engine.create_request("A", "B", "", false).await,
            Err(EngineError::InvalidRequest(_))
        ));

        // Nothing was written.
        let (records, _) = engine.list(&PageRequest::default()).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_request_rejected_unless_forced() {
        let engine = engine(ScriptedProvider::approving());
        let index = engine
            .create_request("A", "B", "inst1", false)
            .await
            .unwrap();

        assert!(matches!(
            engine.create_request("A", "B", "inst1", false).await,
            Err(EngineError::InvalidRequest(_))
        ));

        // Forced: the same record resets rather than duplicating.
        engine.execute_analysis(&index, "contract-c1").await.unwrap();
        let again = engine
            .create_request("A", "B", "inst1", true)
            .await
            .unwrap();
        assert_eq!(again, index);

        let record = engine.get(&index).await.unwrap();
        assert_eq!(record.status, EquivalenceStatus::Pending);
        assert!(record.equivalence_percent.is_none());
        assert_eq!(record.analysis_count, 1, "execution count is preserved");
    }

    #[tokio::test]
    async fn test_execute_analysis_approves_above_threshold() {
        let engine = engine(ScriptedProvider::approving());
        let index = engine
            .create_request("A", "B", "inst1", false)
            .await
            .unwrap();

        let record = engine.execute_analysis(&index, "contract-c1").await.unwrap();
        assert_eq!(record.status, EquivalenceStatus::Approved);
        assert_eq!(record.analysis_count, 1);
        assert_eq!(
            record.equivalence_percent.as_ref().unwrap().as_str(),
            "85.50"
        );
        assert_eq!(record.contract_address, "contract-c1");
        assert_eq!(record.contract_version, "v1.0.0");

        // The stored hash matches a fresh recomputation.
        let expected = analysis_digest(&record.analysis_metadata, "85.50", "contract-c1");
        assert_eq!(record.analysis_hash, expected.to_hex());
    }

    #[tokio::test]
    async fn test_execute_analysis_rejects_below_threshold() {
        let provider = ScriptedProvider::with_script(vec![Ok(AnalysisOutcome {
            percent: Percent::parse("40.00").unwrap(),
            metadata: serde_json::json!({"analysis_method": "content_comparison"}),
            contract_version: "v1.0.0".to_string(),
        })]);
        let engine = engine(provider);
        let index = engine
            .create_request("A", "B", "inst1", false)
            .await
            .unwrap();

        let record = engine.execute_analysis(&index, "contract-c1").await.unwrap();
        assert_eq!(record.status, EquivalenceStatus::Rejected);
    }

    #[tokio::test]
    async fn test_provider_failure_leaves_record_unchanged() {
        let provider = ScriptedProvider::with_script(vec![
            Err(ProviderError("contract unreachable".to_string())),
            Err(ProviderError("contract unreachable".to_string())),
            Err(ProviderError("contract unreachable".to_string())),
        ]);
        let engine = engine(provider);
        let index = engine
            .create_request("A", "B", "inst1", false)
            .await
            .unwrap();
        let before = engine.get(&index).await.unwrap();

        let err = engine
            .execute_analysis(&index, "contract-c1")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::AnalysisFailed(_)));

        let after = engine.get(&index).await.unwrap();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn test_provider_retry_recovers() {
        let provider = ScriptedProvider::with_script(vec![
            Err(ProviderError("transient".to_string())),
            Ok(ScriptedProvider::default_outcome()),
        ]);
        let engine = engine(provider);
        let index = engine
            .create_request("A", "B", "inst1", false)
            .await
            .unwrap();

        let record = engine.execute_analysis(&index, "contract-c1").await.unwrap();
        assert_eq!(record.status, EquivalenceStatus::Approved);
    }

    #[tokio::test]
    async fn test_execute_analysis_unknown_index() {
        let engine = engine(ScriptedProvider::approving());
        assert!(matches!(
            engine.execute_analysis("42", "contract-c1").await,
            Err(EngineError::NotFound(_, _))
        ));
    }

    #[tokio::test]
    async fn test_reanalyze_reuses_stored_contract() {
        let engine = engine(ScriptedProvider::approving());
        let index = engine
            .create_request("A", "B", "inst1", false)
            .await
            .unwrap();
        engine.execute_analysis(&index, "contract-c1").await.unwrap();

        let record = engine
            .reanalyze(&index, None, "periodic revalidation")
            .await
            .unwrap();
        assert_eq!(record.contract_address, "contract-c1");
        assert_eq!(record.analysis_count, 2);
        assert_eq!(
            record.analysis_metadata["reanalysis_reason"],
            "periodic revalidation"
        );
    }

    #[tokio::test]
    async fn test_reanalyze_without_any_contract_fails() {
        let engine = engine(ScriptedProvider::approving());
        let index = engine
            .create_request("A", "B", "inst1", false)
            .await
            .unwrap();

        assert!(matches!(
            engine.reanalyze(&index, None, "").await,
            Err(EngineError::InvalidContractAddress)
        ));
    }

    #[tokio::test]
    async fn test_batch_isolates_failures() {
        let engine = engine(ScriptedProvider::approving());
        let requests = vec![
            EquivalenceRequest {
                source_subject_id: "A".to_string(),
                target_subject_id: "B".to_string(),
                target_institution: "inst1".to_string(),
            },
            EquivalenceRequest {
                source_subject_id: String::new(),
                target_subject_id: "C".to_string(),
                target_institution: "inst1".to_string(),
            },
            EquivalenceRequest {
                source_subject_id: "D".to_string(),
                target_subject_id: "E".to_string(),
                target_institution: "inst1".to_string(),
            },
        ];

        let outcome = engine.batch_request(&requests, false).await.unwrap();
        assert_eq!(outcome.successful, 2);
        assert_eq!(outcome.failed, 1);
        assert!(matches!(
            &outcome.results[1].outcome,
            BatchItemOutcome::Failed { error } if !error.is_empty()
        ));

        // Successful items are retrievable through the normal lookup path.
        assert!(engine.check_status("A", "B").await.unwrap().is_some());
        assert!(engine.check_status("D", "E").await.unwrap().is_some());
        assert!(engine.check_status("", "C").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_status_listing_tracks_transitions() {
        let engine = engine(ScriptedProvider::approving());
        let index = engine
            .create_request("A", "B", "inst1", false)
            .await
            .unwrap();

        let (pending, _) = engine
            .list_by_status(EquivalenceStatus::Pending, &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);

        engine.execute_analysis(&index, "contract-c1").await.unwrap();

        let (pending, info) = engine
            .list_by_status(EquivalenceStatus::Pending, &PageRequest::default())
            .await
            .unwrap();
        assert!(pending.is_empty());
        assert_eq!(info.total, 0);

        let (approved, _) = engine
            .list_by_status(EquivalenceStatus::Approved, &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(approved.len(), 1);
    }

    #[tokio::test]
    async fn test_filtered_listing_totals_describe_filtered_set() {
        let engine = engine(ScriptedProvider::approving());
        for i in 0..6 {
            let index = engine
                .create_request(&format!("S{i}"), "T", "inst1", false)
                .await
                .unwrap();
            if i % 2 == 0 {
                engine.execute_analysis(&index, "contract-c1").await.unwrap();
            }
        }

        let (records, info) = engine
            .list_by_target(
                "T",
                Some(EquivalenceStatus::Approved),
                &PageRequest::with_limit(2),
            )
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(info.total, 3);

        let (rest, info) = engine
            .list_by_target(
                "T",
                Some(EquivalenceStatus::Approved),
                &PageRequest::from_cursor(info.next_cursor.unwrap(), 2),
            )
            .await
            .unwrap();
        assert_eq!(rest.len(), 1);
        assert!(info.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_stats_aggregation() {
        let engine = engine(ScriptedProvider::approving());
        for i in 0..3 {
            let index = engine
                .create_request(&format!("S{i}"), &format!("T{i}"), "inst1", false)
                .await
                .unwrap();
            if i < 2 {
                engine.execute_analysis(&index, "contract-c1").await.unwrap();
            }
        }

        let stats = engine.stats().await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.approved, 2);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.institutions, 1);
        assert_eq!(stats.subjects, 6);
        assert_eq!(stats.total_analyses, 2);
        assert_eq!(stats.contract_versions, vec!["v1.0.0".to_string()]);
        assert_eq!(stats.average_percent.unwrap().as_str(), "85.50");
    }

    #[tokio::test]
    async fn test_events_emitted() {
        let sink = Arc::new(CollectingEventSink::new());
        let engine = engine(ScriptedProvider::approving())
            .with_event_sink(sink.clone() as Arc<dyn EventSink>);

        let index = engine
            .create_request("A", "B", "inst1", false)
            .await
            .unwrap();
        engine.execute_analysis(&index, "contract-c1").await.unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            DomainEvent::EquivalenceRequested { index, .. } if index == "1"
        ));
        assert!(matches!(
            &events[1],
            DomainEvent::EquivalenceAnalyzed { status: EquivalenceStatus::Approved, .. }
        ));
    }
}
