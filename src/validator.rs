// ✅ Validator Facade - certificates in, verdicts per part out
//
// Groups a document's certificates by part number, builds one chain per part,
// evaluates each chain and hands back the mapping. Batches fan out over
// scoped worker threads that share one read-only registry snapshot.

use crate::certificate::CertificateRecord;
use crate::chain::{ChainBuilder, UNKNOWN_PART};
use crate::compliance::{ComplianceEvaluator, ComplianceVerdict};
use crate::config::TraceConfig;
use crate::entities::{EntityClassifier, EntityRegistry};
use crate::error::TraceError;
use crate::report::{BatchReport, DocumentReport, PartResult};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

pub struct Validator {
    classifier: Arc<dyn EntityClassifier>,
    config: TraceConfig,
}

impl Validator {
    pub fn new(classifier: Arc<dyn EntityClassifier>, config: TraceConfig) -> Result<Self, TraceError> {
        config.validate()?;
        Ok(Validator { classifier, config })
    }

    /// Validator over an in-memory registry snapshot, with default settings
    pub fn with_registry(registry: EntityRegistry) -> Self {
        Validator {
            classifier: Arc::new(registry),
            config: TraceConfig::default(),
        }
    }

    /// Registry snapshot tuned by the config's fuzzy distance
    pub fn from_config(registry: EntityRegistry, config: TraceConfig) -> Result<Self, TraceError> {
        let registry = registry.with_fuzzy_distance(config.fuzzy_distance);
        Validator::new(Arc::new(registry), config)
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    pub fn classifier(&self) -> &dyn EntityClassifier {
        self.classifier.as_ref()
    }

    /// Part number → verdict, anchored on the configured target buyer
    pub fn validate_document(
        &self,
        certificates: &[CertificateRecord],
        document_id: &str,
    ) -> Result<BTreeMap<String, ComplianceVerdict>, TraceError> {
        self.validate_document_for(certificates, document_id, Some(self.config.target_buyer.as_str()))
    }

    pub fn validate_document_for(
        &self,
        certificates: &[CertificateRecord],
        document_id: &str,
        target_buyer: Option<&str>,
    ) -> Result<BTreeMap<String, ComplianceVerdict>, TraceError> {
        Ok(self
            .inspect_document(certificates, document_id, target_buyer)?
            .verdicts())
    }

    /// Chains and verdicts for every part of one document
    pub fn inspect_document(
        &self,
        certificates: &[CertificateRecord],
        document_id: &str,
        target_buyer: Option<&str>,
    ) -> Result<DocumentReport, TraceError> {
        let mut parts = BTreeMap::new();

        if certificates.is_empty() {
            warn!(document = %document_id, "document has no certificate records");
            parts.insert(
                UNKNOWN_PART.to_string(),
                PartResult {
                    chain: None,
                    verdict: ComplianceVerdict::empty_input(document_id),
                },
            );
        } else {
            let classifier = self.classifier.as_ref();
            let builder = ChainBuilder::new(classifier)?.with_max_hops(self.config.max_hops);
            let evaluator = ComplianceEvaluator::new(classifier);

            for chain in builder.build_chains(certificates, target_buyer)? {
                let verdict = evaluator.evaluate(&chain)?;
                info!(
                    document = %document_id,
                    part = %chain.part_number,
                    compliant = verdict.is_compliant,
                    source = %verdict.final_source_type,
                    name = %verdict.final_source_name,
                    "part evaluated"
                );
                parts.insert(
                    chain.part_number.clone(),
                    PartResult {
                        chain: Some(chain),
                        verdict,
                    },
                );
            }
        }

        Ok(DocumentReport {
            document_id: document_id.to_string(),
            target_buyer: target_buyer.map(str::to_string),
            parts,
        })
    }

    /// Evaluate many documents against the configured target buyer
    pub fn validate_batch(
        &self,
        documents: &BTreeMap<String, Vec<CertificateRecord>>,
    ) -> Result<BatchReport, TraceError> {
        self.validate_batch_with_hints(documents, &BTreeMap::new())
    }

    /// Evaluate many documents; `hints` overrides the target buyer per document.
    ///
    /// Work is split across `config.workers` scoped threads. The first failing
    /// document (in document order) fails the batch.
    pub fn validate_batch_with_hints(
        &self,
        documents: &BTreeMap<String, Vec<CertificateRecord>>,
        hints: &BTreeMap<String, String>,
    ) -> Result<BatchReport, TraceError> {
        let entries: Vec<(&String, &Vec<CertificateRecord>)> = documents.iter().collect();
        let workers = self.config.workers.clamp(1, entries.len().max(1));
        let chunk_size = entries.len().div_ceil(workers).max(1);
        let default_hint = self.config.target_buyer.as_str();
        // Reported snapshot is the one the batch started against
        let snapshot = self.classifier.snapshot_id();

        info!(documents = entries.len(), workers, "starting batch validation");

        let results: Vec<Vec<(String, Result<DocumentReport, TraceError>)>> = std::thread::scope(|scope| {
            let handles: Vec<_> = entries
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move || {
                        chunk
                            .iter()
                            .map(|(document_id, certificates)| {
                                let hint = hints
                                    .get(document_id.as_str())
                                    .map(String::as_str)
                                    .unwrap_or(default_hint);
                                (
                                    (*document_id).clone(),
                                    self.inspect_document(certificates, document_id, Some(hint)),
                                )
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(results) => results,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });

        let mut reports = BTreeMap::new();
        for (document_id, result) in results.into_iter().flatten() {
            reports.insert(document_id, result?);
        }

        let report = BatchReport::new(reports, snapshot);
        info!(
            run = %report.run_id,
            compliant = report.summary.compliant_documents,
            total = report.summary.total_documents,
            "batch validation finished"
        );
        Ok(report)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Validator::with_registry(EntityRegistry::with_defaults())
    }
}

// ============================================================================
// TESTS
// ============================================================================
