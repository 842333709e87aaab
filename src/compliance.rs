// ⚖️ Compliance Evaluator - does the custody chain reach a regulated source?
//
// Rules, in order:
// 1. Any fraudulent entity anywhere in the chain → FRAUDULENT, non-compliant.
// 2. Complete chain ending at OEM / 121 / 129 / 135 / 145 → compliant.
// 3. Anything else → UNREGULATED, non-compliant.
//
// Distributors are transparent: they may sit anywhere in the chain but can
// never be where it ends.

use crate::asa100::PartClass;
use crate::chain::{StopReason, TraceabilityChain, UNKNOWN_PART};
use crate::entities::{EntityCategory, EntityClassifier, RegistryEntry};
use crate::error::TraceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceType {
    #[serde(rename = "OEM")]
    Oem,
    #[serde(rename = "121")]
    Part121,
    #[serde(rename = "129")]
    Part129,
    #[serde(rename = "135")]
    Part135,
    #[serde(rename = "145")]
    Part145,
    #[serde(rename = "FRAUDULENT")]
    Fraudulent,
    #[serde(rename = "UNREGULATED")]
    Unregulated,
    /// Input could not be evaluated at all
    #[serde(rename = "ERROR")]
    Error,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Oem => "OEM",
            SourceType::Part121 => "121",
            SourceType::Part129 => "129",
            SourceType::Part135 => "135",
            SourceType::Part145 => "145",
            SourceType::Fraudulent => "FRAUDULENT",
            SourceType::Unregulated => "UNREGULATED",
            SourceType::Error => "ERROR",
        }
    }

    /// Source type a terminal of this category reports
    pub fn from_category(category: EntityCategory) -> SourceType {
        match category {
            EntityCategory::Oem => SourceType::Oem,
            EntityCategory::Airline121 => SourceType::Part121,
            EntityCategory::Airline129 => SourceType::Part129,
            EntityCategory::Operator135 => SourceType::Part135,
            EntityCategory::RepairStation145 => SourceType::Part145,
            EntityCategory::Fraudulent => SourceType::Fraudulent,
            EntityCategory::PartsDistributor | EntityCategory::Unregulated => SourceType::Unregulated,
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComplianceLevel {
    /// Traced to the manufacturer
    Highest,
    /// Traced to a certified airline, operator or repair station
    High,
    Low,
}

impl ComplianceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceLevel::Highest => "Highest",
            ComplianceLevel::High => "High",
            ComplianceLevel::Low => "Low",
        }
    }
}

/// Outcome for one part of one document. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceVerdict {
    pub part_number: String,
    pub serial_number: Option<String>,
    pub is_compliant: bool,
    pub final_source_type: SourceType,
    pub final_source_name: String,
    pub compliance_level: ComplianceLevel,
    pub chain_complete: bool,
    pub asa100_class: PartClass,
    pub violations: Vec<String>,
    pub notes: Vec<String>,
}

impl ComplianceVerdict {
    /// Verdict for a document that carried no certificates
    pub fn empty_input(document_id: &str) -> Self {
        ComplianceVerdict {
            part_number: UNKNOWN_PART.to_string(),
            serial_number: None,
            is_compliant: false,
            final_source_type: SourceType::Error,
            final_source_name: String::new(),
            compliance_level: ComplianceLevel::Low,
            chain_complete: false,
            asa100_class: PartClass::Unknown,
            violations: vec!["no certificates to evaluate".to_string()],
            notes: vec![format!(
                "Empty input: document {} contains no certificate records",
                document_id
            )],
        }
    }
}

pub struct ComplianceEvaluator<'a> {
    classifier: &'a dyn EntityClassifier,
}

impl<'a> ComplianceEvaluator<'a> {
    pub fn new(classifier: &'a dyn EntityClassifier) -> Self {
        ComplianceEvaluator { classifier }
    }

    pub fn evaluate(&self, chain: &TraceabilityChain) -> Result<ComplianceVerdict, TraceError> {
        let names = chain.entities();
        let mut classified: Vec<RegistryEntry> = Vec::with_capacity(names.len());
        for name in &names {
            let entry = self
                .classifier
                .classify(name)
                .map_err(|err| TraceError::registry(name, err))?;
            classified.push(entry);
        }

        let terminal = classified
            .last()
            .cloned()
            .unwrap_or_else(|| RegistryEntry::unregistered(&chain.terminal_entity));
        let fraud = classified.iter().find(|entry| entry.category.is_fraudulent());

        let mut violations = Vec::new();
        let (is_compliant, final_source_type, final_source_name, compliance_level) = if let Some(fraud) = fraud {
            violations.push(format!(
                "fraudulent entity broke the chain: {}",
                fraud.canonical_name
            ));
            (false, SourceType::Fraudulent, fraud.canonical_name.clone(), ComplianceLevel::Low)
        } else if terminal.category.is_regulated() && chain.chain_complete && !chain.links.is_empty() {
            let level = if terminal.category == EntityCategory::Oem {
                ComplianceLevel::Highest
            } else {
                ComplianceLevel::High
            };
            (
                true,
                SourceType::from_category(terminal.category),
                terminal.canonical_name.clone(),
                level,
            )
        } else {
            if !chain.chain_complete {
                violations.push(format!(
                    "chain incomplete: {}",
                    stop_description(chain.stop_reason)
                ));
            }
            if chain.links.is_empty() {
                violations.push(format!(
                    "no prior holder documented for {}",
                    chain.start_entity
                ));
            } else if terminal.category.is_distributor() {
                violations.push(format!(
                    "chain ends at parts distributor {}; a distributor cannot originate a compliant chain",
                    terminal.canonical_name
                ));
            } else if terminal.category == EntityCategory::Unregulated {
                violations.push(format!(
                    "chain terminates at unregulated entity: {}",
                    terminal.canonical_name
                ));
            }

            // Earliest point of failure behind the owner; a regulated entity is never named
            let failing = classified
                .iter()
                .skip(1)
                .find(|entry| entry.category == EntityCategory::Unregulated)
                .or_else(|| terminal.category.is_distributor().then_some(&terminal))
                .or_else(|| classified.first().filter(|owner| !owner.category.is_regulated()))
                .map(|entry| entry.canonical_name.clone())
                .unwrap_or_else(|| format!("Unresolved ({})", stop_description(chain.stop_reason)));
            (false, SourceType::Unregulated, failing, ComplianceLevel::Low)
        };

        let mut notes = Vec::new();
        notes.push(if is_compliant {
            "Chain integrity intact: every entity is a regulated source or an acceptable intermediate"
                .to_string()
        } else {
            format!("Chain integrity BROKEN by: {}", final_source_name)
        });
        notes.push(if chain.chain_complete {
            format!(
                "Chain complete: terminates at {} ({})",
                terminal.canonical_name,
                terminal.category.source_code()
            )
        } else {
            format!("Chain incomplete: {}", stop_description(chain.stop_reason))
        });
        notes.push(format!("Chain: {}", chain.render()));
        for (name, entry) in names.iter().zip(&classified) {
            notes.push(format!(
                "Entity {} → {} ({})",
                name,
                entry.category.source_code(),
                entry.evidence
            ));
        }
        if let Some(breaking) = &chain.breaking_entity {
            notes.push(format!("Breaking entity: {}", breaking));
        }
        for link in chain.declared_links() {
            notes.push(format!(
                "Declared link (lower evidentiary weight): {} ← {} per {}",
                link.from_entity, link.to_entity, link.supporting_document_id
            ));
        }
        notes.extend(chain.notes.iter().cloned());
        notes.push(format!("ASA-100 part class: {}", chain.asa100_class.as_str()));
        notes.extend(
            chain
                .documentation_findings
                .iter()
                .map(|finding| format!("ASA-100: {}", finding)),
        );

        debug!(
            part = %chain.part_number,
            compliant = is_compliant,
            source = %final_source_type,
            name = %final_source_name,
            "verdict"
        );

        Ok(ComplianceVerdict {
            part_number: chain.part_number.clone(),
            serial_number: chain.serial_number.clone(),
            is_compliant,
            final_source_type,
            final_source_name,
            compliance_level,
            chain_complete: chain.chain_complete,
            asa100_class: chain.asa100_class,
            violations,
            notes,
        })
    }
}

/// Convenience wrapper over [`ComplianceEvaluator::evaluate`]
pub fn evaluate(
    chain: &TraceabilityChain,
    classifier: &dyn EntityClassifier,
) -> Result<ComplianceVerdict, TraceError> {
    ComplianceEvaluator::new(classifier).evaluate(chain)
}

fn stop_description(reason: StopReason) -> &'static str {
    match reason {
        StopReason::Terminal => "no further backward link",
        StopReason::CycleDetected => "cycle detected",
        StopReason::DepthExceeded => "maximum hop count exceeded",
        StopReason::NoAnchor => "no certificate names a buyer or seller",
    }
}

// ============================================================================
// TESTS
// ============================================================================
