// ⚠️ Error Types - what the core refuses to paper over
//
// Malformed certificate data never becomes an error: it becomes a note on a
// (possibly non-compliant) verdict. Only infrastructure failures surface here.

use thiserror::Error;

/// Failure reported by a registry backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The backing store could not answer the lookup.
    #[error("registry unavailable: {0}")]
    Unavailable(String),
}

/// Errors returned by the chain builder, evaluator and validator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceError {
    /// Compliance cannot be determined without the registry. Kept distinct
    /// from an `Unregulated` finding.
    #[error("registry unavailable while classifying `{name}`: {reason}")]
    RegistryUnavailable { name: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl TraceError {
    pub(crate) fn registry(name: &str, err: RegistryError) -> Self {
        match err {
            RegistryError::Unavailable(reason) => TraceError::RegistryUnavailable {
                name: name.to_string(),
                reason,
            },
        }
    }

    pub fn is_registry_unavailable(&self) -> bool {
        matches!(self, TraceError::RegistryUnavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_maps_to_distinct_variant() {
        let err = TraceError::registry("ACME", RegistryError::Unavailable("disk I/O".to_string()));

        assert!(err.is_registry_unavailable());
        assert_eq!(
            err.to_string(),
            "registry unavailable while classifying `ACME`: disk I/O"
        );
    }

    #[test]
    fn test_invalid_config_is_not_registry_failure() {
        let err = TraceError::InvalidConfig("max_hops must be at least 1".to_string());
        assert!(!err.is_registry_unavailable());
    }
}
