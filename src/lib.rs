// Parts Trace - Core Library
// Traceability chains and source compliance for aviation part certificates.
// Exposes all modules for use in the CLI, the API server, and tests.

pub mod asa100;      // ASA-100 part classes and receipt documentation
pub mod certificate; // Certificate records + extraction/CSV loaders
pub mod chain;       // Chain Builder: owner → origin walk per part
pub mod compliance;  // Compliance Evaluator: chain → verdict
pub mod config;
pub mod db;          // SQLite registry store (append-only snapshots)
pub mod declared;    // Declared-source statements → entity names
pub mod entities;    // Entity Registry: categories, name matching, snapshots
pub mod error;
pub mod logging;
pub mod report;      // Document and batch reports
pub mod validator;   // Facade: documents in, verdicts out

// Re-export commonly used types
pub use asa100::{classify_part, documentation_findings, PartClass, Requirements};
pub use certificate::{
    load_certificates_csv, load_documents, load_extraction_results, CertificateRecord,
    CertificateType,
};
pub use chain::{
    AnchorKind, ChainBuilder, ChainLink, LinkKind, StopReason, TraceabilityChain, UNKNOWN_PART,
};
pub use compliance::{evaluate, ComplianceEvaluator, ComplianceLevel, ComplianceVerdict, SourceType};
pub use config::TraceConfig;
pub use db::{RegistryStore, StoreClassifier, StoredVersion};
pub use declared::{DeclaredSource, DeclaredSourceResolver, ResolutionMethod};
pub use entities::{
    EntityCategory, EntityClassifier, EntityRegistry, MatchStrength, RegistryEntry,
    RegistrySnapshot,
};
pub use error::{RegistryError, TraceError};
pub use logging::init_tracing;
pub use report::{BatchReport, ComplianceSummary, DocumentReport, PartResult};
pub use validator::Validator;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
