// Entity Layer - who holds the part, and how much we trust them
//
// - category:  trust classes (OEM, 121, 129, 135, 145, distributor, fraudulent, unregulated)
// - normalize: name keys that survive punctuation, suffixes and typos
// - registry:  versioned, immutable lookup table + the classifier seam

pub mod category;
pub mod normalize;
pub mod registry;

pub use category::EntityCategory;
pub use normalize::{levenshtein_distance, name_tokens, normalize_entity_name};
pub use registry::{
    EntityClassifier, EntityRegistry, MatchStrength, RegistryEntry, RegistryMatch,
    RegistrySnapshot, NOT_FOUND_EVIDENCE,
};
