// 📊 Reports - per-document results and batch summaries
//
// Verdicts stay deterministic; run metadata (id, timestamp, registry snapshot)
// lives only on the batch report wrapped around them.

use crate::chain::{AnchorKind, TraceabilityChain};
use crate::compliance::{ComplianceVerdict, SourceType};
use anyhow::{Context as AnyhowContext, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use uuid::Uuid;

// ============================================================================
// DOCUMENT REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartResult {
    /// None when there was nothing to build a chain from
    pub chain: Option<TraceabilityChain>,
    pub verdict: ComplianceVerdict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentReport {
    pub document_id: String,
    pub target_buyer: Option<String>,
    pub parts: BTreeMap<String, PartResult>,
}

impl DocumentReport {
    /// The part whose chain anchored on the target buyer (lowest part number
    /// first), else the first part.
    pub fn part_of_interest(&self) -> Option<(&str, &PartResult)> {
        self.parts
            .iter()
            .find(|(_, result)| {
                result
                    .chain
                    .as_ref()
                    .map(|chain| chain.anchor == AnchorKind::BuyerHint)
                    .unwrap_or(false)
            })
            .or_else(|| self.parts.iter().next())
            .map(|(part, result)| (part.as_str(), result))
    }

    /// True iff every part is compliant (and there is at least one)
    pub fn is_compliant(&self) -> bool {
        !self.parts.is_empty() && self.parts.values().all(|result| result.verdict.is_compliant)
    }

    /// Part number → verdict
    pub fn verdicts(&self) -> BTreeMap<String, ComplianceVerdict> {
        self.parts
            .iter()
            .map(|(part, result)| (part.clone(), result.verdict.clone()))
            .collect()
    }
}

// ============================================================================
// BATCH SUMMARY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceSummary {
    pub total_documents: usize,
    pub compliant_documents: usize,
    pub compliance_rate: f64,
    pub total_parts: usize,
    pub compliant_parts: usize,
    pub complete_chains: usize,
    pub declared_links: usize,
    /// Final source type of each document's part of interest
    pub source_types: BTreeMap<String, usize>,
    pub compliance_levels: BTreeMap<String, usize>,
    pub fraudulent_entities: BTreeSet<String>,
    pub non_compliant_documents: Vec<String>,
    /// "document/part" for every chain that did not terminate cleanly
    pub incomplete_chains: Vec<String>,
}

impl ComplianceSummary {
    pub fn from_documents(documents: &BTreeMap<String, DocumentReport>) -> Self {
        let mut summary = ComplianceSummary {
            total_documents: documents.len(),
            compliant_documents: 0,
            compliance_rate: 0.0,
            total_parts: 0,
            compliant_parts: 0,
            complete_chains: 0,
            declared_links: 0,
            source_types: BTreeMap::new(),
            compliance_levels: BTreeMap::new(),
            fraudulent_entities: BTreeSet::new(),
            non_compliant_documents: Vec::new(),
            incomplete_chains: Vec::new(),
        };

        for (document_id, report) in documents {
            if report.is_compliant() {
                summary.compliant_documents += 1;
            } else {
                summary.non_compliant_documents.push(document_id.clone());
            }

            if let Some((_, result)) = report.part_of_interest() {
                *summary
                    .source_types
                    .entry(result.verdict.final_source_type.as_str().to_string())
                    .or_insert(0) += 1;
                *summary
                    .compliance_levels
                    .entry(result.verdict.compliance_level.as_str().to_string())
                    .or_insert(0) += 1;
            }

            for (part, result) in &report.parts {
                summary.total_parts += 1;
                if result.verdict.is_compliant {
                    summary.compliant_parts += 1;
                }
                if result.verdict.final_source_type == SourceType::Fraudulent {
                    summary
                        .fraudulent_entities
                        .insert(result.verdict.final_source_name.clone());
                }
                match &result.chain {
                    Some(chain) if chain.chain_complete => {
                        summary.complete_chains += 1;
                        summary.declared_links += chain.declared_links().count();
                    }
                    Some(chain) => {
                        summary.declared_links += chain.declared_links().count();
                        summary.incomplete_chains.push(format!("{}/{}", document_id, part));
                    }
                    None => summary.incomplete_chains.push(format!("{}/{}", document_id, part)),
                }
            }
        }

        if summary.total_documents > 0 {
            summary.compliance_rate =
                summary.compliant_documents as f64 / summary.total_documents as f64;
        }
        summary
    }
}

// ============================================================================
// BATCH REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    /// Registry snapshot the verdicts were computed against ("v3-1a2b3c4d5e6f")
    pub registry_snapshot: Option<String>,
    pub summary: ComplianceSummary,
    pub documents: BTreeMap<String, DocumentReport>,
}

impl BatchReport {
    pub fn new(documents: BTreeMap<String, DocumentReport>, registry_snapshot: Option<String>) -> Self {
        BatchReport {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            registry_snapshot,
            summary: ComplianceSummary::from_documents(&documents),
            documents,
        }
    }

    /// Write the report as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize batch report")?;
        fs::write(path.as_ref(), json)
            .with_context(|| format!("Failed to write batch report: {:?}", path.as_ref()))?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read batch report: {:?}", path.as_ref()))?;
        serde_json::from_str(&content).context("Failed to parse batch report JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::{CertificateRecord, CertificateType};
    use crate::validator::Validator;

    fn sale(pn: &str, doc: &str, seller: &str, buyer: &str) -> CertificateRecord {
        CertificateRecord::new(CertificateType::Faa8130_3, pn, doc)
            .with_seller(seller)
            .with_buyer(buyer)
    }

    fn documents() -> BTreeMap<String, DocumentReport> {
        let validator = Validator::default();
        let mut documents = BTreeMap::new();

        let good = vec![sale("P-1", "good", "Honeywell", "Skylink")];
        let fraud = vec![
            sale("P-2", "fraud", "Logistica Aeroespacial", "Skylink"),
            sale("P-3", "fraud", "AvAir", "Skylink"),
        ];
        documents.insert("good".to_string(), validator.inspect_document(&good, "good", Some("Skylink")).unwrap());
        documents.insert("fraud".to_string(), validator.inspect_document(&fraud, "fraud", Some("Skylink")).unwrap());
        documents.insert("empty".to_string(), validator.inspect_document(&[], "empty", Some("Skylink")).unwrap());
        documents
    }

    #[test]
    fn test_part_of_interest_prefers_hint_anchor() {
        let validator = Validator::default();
        let certs = vec![
            sale("A-1", "d", "Honeywell", "Somebody Else"),
            sale("B-2", "d", "AAR", "Skylink"),
        ];
        let report = validator.inspect_document(&certs, "d", Some("Skylink")).unwrap();

        let (part, result) = report.part_of_interest().unwrap();
        assert_eq!(part, "B-2");
        assert_eq!(result.verdict.final_source_name, "AAR");
        assert!(report.is_compliant());
    }

    #[test]
    fn test_summary_counts() {
        let summary = ComplianceSummary::from_documents(&documents());

        assert_eq!(summary.total_documents, 3);
        assert_eq!(summary.compliant_documents, 1);
        assert!((summary.compliance_rate - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(summary.total_parts, 4);
        assert_eq!(summary.compliant_parts, 1);
        assert_eq!(
            summary.fraudulent_entities.iter().collect::<Vec<_>>(),
            vec!["Logistica Aeroespacial S.A. de C.V."]
        );
        assert_eq!(summary.non_compliant_documents, vec!["empty".to_string(), "fraud".to_string()]);
        assert_eq!(summary.incomplete_chains, vec!["empty/UNKNOWN".to_string()]);
        assert_eq!(summary.source_types.get("ERROR"), Some(&1));
        assert_eq!(summary.source_types.get("OEM"), Some(&1));
    }

    #[test]
    fn test_save_and_load() {
        let report = BatchReport::new(documents(), Some("v1-abc".to_string()));
        let path = std::env::temp_dir().join(format!("parts-trace-report-{}.json", Uuid::new_v4()));

        report.save(&path).unwrap();
        let loaded = BatchReport::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.run_id, report.run_id);
        assert_eq!(loaded.documents, report.documents);
        assert_eq!(loaded.registry_snapshot.as_deref(), Some("v1-abc"));
    }
}
