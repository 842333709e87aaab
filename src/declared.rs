// 🗣️ Declared Source Resolver - entity names out of sworn origin statements
//
// "Purchased from ExpressJet Airlines, Inc. via Bill of Sale Dec 29, 2016"
// → "ExpressJet Airlines, Inc."
//
// All of the fuzziness of bridging a missing certificate lives here. The
// chain walk only ever sees an entity name (or nothing).

use crate::entities::normalize::{find_token_run, is_corporate_suffix, name_tokens, normalize_entity_name};
use crate::entities::EntityClassifier;
use crate::error::TraceError;
use serde::{Deserialize, Serialize};

/// Phrases that introduce the prior holder, most specific first
const ORIGIN_CUES: &[&str] = &[
    "purchased from",
    "acquired from",
    "obtained from",
    "received from",
    "sourced from",
    "originally from",
    "bought from",
    "traceable to",
    "traced to",
    "traceability to",
    "manufactured by",
    "overhauled by",
    "repaired by",
    "released by",
    "origin:",
    "source:",
    "from",
];

/// Where the entity name stops
const NAME_TERMINATORS: &[&str] = &[
    " via ", " per ", " under ", " dated ", " on ", " with ", " to ", " for ", " as ",
    " (", "(", ";", "\n", " - ", " – ",
];

/// Statements that describe condition, not a holder
const NON_ENTITY_STATEMENTS: &[&str] = &[
    "new", "new surplus", "overhauled", "serviceable", "as removed", "repaired", "inspected",
    "unknown", "n a", "none", "see attached", "not applicable",
];

/// Free-text statements longer than this are never taken whole as a name
const MAX_BARE_NAME_WORDS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionMethod {
    /// A registry name (canonical or alias) appears in the statement
    RegistryName,
    /// Text following an origin cue such as "purchased from"
    CuePhrase,
    /// The whole (short) statement is a name
    BareName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredSource {
    pub entity: String,
    pub method: ResolutionMethod,
}

#[derive(Debug, Clone)]
struct KnownName {
    display: String,
    tokens: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DeclaredSourceResolver {
    known: Vec<KnownName>,
}

impl DeclaredSourceResolver {
    /// Resolver without registry knowledge (cue phrases and bare names only)
    pub fn new() -> Self {
        DeclaredSourceResolver { known: Vec::new() }
    }

    pub fn with_known_names<I>(names: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut known: Vec<KnownName> = names
            .into_iter()
            .filter_map(|display| {
                let tokens = name_tokens(&display);
                let specific = tokens.len() >= 2
                    || tokens.first().map(|t| t.chars().count() >= 3).unwrap_or(false);
                specific.then_some(KnownName { display, tokens })
            })
            .collect();
        known.sort_by(|a, b| a.display.cmp(&b.display));
        known.dedup_by(|a, b| a.display == b.display);

        DeclaredSourceResolver { known }
    }

    /// Resolver seeded with every name the classifier knows
    pub fn from_classifier(classifier: &dyn EntityClassifier) -> Result<Self, TraceError> {
        let names = classifier
            .known_names()
            .map_err(|err| TraceError::registry("<known names>", err))?;
        Ok(DeclaredSourceResolver::with_known_names(names))
    }

    /// Extract the prior holder named by `statement`.
    ///
    /// When an origin cue is present only the text after it is read; other
    /// names in the statement (aircraft types, end users) are ignored. Names
    /// that normalize to `current_entity` are ignored: a seller declaring
    /// itself as origin adds no link.
    pub fn resolve(&self, statement: &str, current_entity: &str) -> Option<DeclaredSource> {
        let current_key = normalize_entity_name(current_entity);

        if let Some(start) = cue_end(statement) {
            let entity = name_after(statement, start)?;
            if normalize_entity_name(&entity) == current_key {
                return None;
            }
            return Some(match self.known_display(&entity) {
                Some(display) => DeclaredSource {
                    entity: display,
                    method: ResolutionMethod::RegistryName,
                },
                None => DeclaredSource {
                    entity,
                    method: ResolutionMethod::CuePhrase,
                },
            });
        }

        if let Some(entity) = self.registry_name_in(statement, current_entity) {
            return Some(DeclaredSource {
                entity,
                method: ResolutionMethod::RegistryName,
            });
        }

        bare_name(statement)
            .filter(|entity| normalize_entity_name(entity) != current_key)
            .map(|entity| DeclaredSource {
                entity,
                method: ResolutionMethod::BareName,
            })
    }

    /// Registry spelling of `name` when it is exactly a known name
    fn known_display(&self, name: &str) -> Option<String> {
        let tokens = name_tokens(name);
        self.known
            .iter()
            .find(|known| known.tokens == tokens)
            .map(|known| known.display.clone())
    }

    /// Earliest registry name in the statement; longer names win at the same position.
    /// Names that are part of the current holder's own name are skipped.
    fn registry_name_in(&self, statement: &str, current_entity: &str) -> Option<String> {
        let tokens = name_tokens(statement);
        if tokens.is_empty() {
            return None;
        }
        let own_tokens = name_tokens(current_entity);

        self.known
            .iter()
            .filter(|known| find_token_run(&own_tokens, &known.tokens).is_none())
            .filter_map(|known| {
                find_token_run(&tokens, &known.tokens).map(|position| (position, known))
            })
            .min_by(|(pos_a, a), (pos_b, b)| {
                pos_a
                    .cmp(pos_b)
                    .then(b.tokens.len().cmp(&a.tokens.len()))
                    .then(a.display.cmp(&b.display))
            })
            .map(|(_, known)| known.display.clone())
    }
}

/// Byte offset just past the first origin cue (in cue order), if any.
fn cue_end(statement: &str) -> Option<usize> {
    // ASCII lowercasing keeps byte offsets aligned with the original
    let lower = statement.to_ascii_lowercase();
    ORIGIN_CUES
        .iter()
        .find_map(|cue| find_word(&lower, cue).map(|position| position + cue.len()))
}

/// Text from `start` up to the first terminator.
fn name_after(statement: &str, start: usize) -> Option<String> {
    let rest = &statement[start..];
    let rest_lower = rest.to_ascii_lowercase();

    let end = NAME_TERMINATORS
        .iter()
        .filter_map(|terminator| rest_lower.find(terminator))
        .min()
        .unwrap_or(rest.len());

    clean_name(&rest[..end])
}

/// Cue position that starts at a word boundary ("from" but not "therefrom")
fn find_word(haystack: &str, cue: &str) -> Option<usize> {
    let mut offset = 0;
    while let Some(found) = haystack[offset..].find(cue) {
        let position = offset + found;
        let boundary_before = position == 0
            || !haystack[..position]
                .chars()
                .next_back()
                .map(char::is_alphanumeric)
                .unwrap_or(false);
        let after = position + cue.len();
        let boundary_after = cue.ends_with(':')
            || !haystack[after..]
                .chars()
                .next()
                .map(char::is_alphanumeric)
                .unwrap_or(false);
        if boundary_before && boundary_after {
            return Some(position);
        }
        offset = after;
    }
    None
}

/// Keep the first comma segment plus any trailing corporate-suffix segments
/// ("ExpressJet Airlines, Inc., Dec 29 2016" → "ExpressJet Airlines, Inc.").
fn clean_name(raw: &str) -> Option<String> {
    let mut segments = raw.split(',');
    let mut name = segments.next()?.trim().to_string();

    for segment in segments {
        let lowered = segment.to_ascii_lowercase();
        let tokens: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();
        let suffix_only = !tokens.is_empty() && tokens.iter().all(|t| is_corporate_suffix(t));
        if !suffix_only {
            break;
        }
        name.push(',');
        name.push_str(segment);
    }

    let name = name
        .trim()
        .trim_start_matches(|c: char| c == ':' || c == '-' || c.is_whitespace())
        .trim_end_matches(|c: char| c == ',' || c == ':' || c.is_whitespace())
        .to_string();

    let has_letters = name.chars().any(char::is_alphabetic);
    let words = name.split_whitespace().count();
    if has_letters && words <= MAX_BARE_NAME_WORDS * 2 && !is_non_entity(&name) {
        Some(name)
    } else {
        None
    }
}

/// A short statement that is itself a name
fn bare_name(statement: &str) -> Option<String> {
    let trimmed = statement.trim();
    let words = trimmed.split_whitespace().count();
    if words == 0 || words > MAX_BARE_NAME_WORDS {
        return None;
    }
    let capitalized = trimmed
        .split_whitespace()
        .any(|word| word.chars().next().map(char::is_uppercase).unwrap_or(false));
    if !capitalized {
        return None;
    }
    clean_name(trimmed)
}

fn is_non_entity(name: &str) -> bool {
    let key = normalize_entity_name(name);
    key.is_empty() || NON_ENTITY_STATEMENTS.contains(&key.as_str())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::EntityRegistry;

    fn resolver() -> DeclaredSourceResolver {
        DeclaredSourceResolver::from_classifier(&EntityRegistry::with_defaults()).unwrap()
    }

    #[test]
    fn test_registry_name_found_in_statement() {
        let source = resolver()
            .resolve(
                "Purchased from ExpressJet Airlines, Inc. via Bill of Sale Dec 29, 2016",
                "Aventure International Aviation Services",
            )
            .unwrap();

        assert_eq!(source.method, ResolutionMethod::RegistryName);
        assert_eq!(normalize_entity_name(&source.entity), "expressjet airlines");
    }

    #[test]
    fn test_longest_registry_name_wins_at_same_position() {
        let source = resolver()
            .resolve("Overhauled by Lufthansa Technik AG", "DSC Trading")
            .unwrap();
        assert_eq!(source.entity, "Lufthansa Technik");
    }

    #[test]
    fn test_current_entity_is_skipped() {
        let source = resolver()
            .resolve(
                "Aventure Int'l Aviation Services purchased from ExpressJet Airlines",
                "Aventure International Aviation Services",
            )
            .unwrap();
        assert_eq!(normalize_entity_name(&source.entity), "expressjet airlines");

        assert_eq!(resolver().resolve("DSC Trading, LLC", "DSC Trading"), None);
    }

    #[test]
    fn test_cue_phrase_for_unknown_entity() {
        let source = DeclaredSourceResolver::new()
            .resolve(
                "Part was purchased from Bizjet International, Inc., Dec 29 2016 per PO 4471",
                "DSC Trading",
            )
            .unwrap();

        assert_eq!(source.method, ResolutionMethod::CuePhrase);
        assert_eq!(source.entity, "Bizjet International, Inc.");
    }

    #[test]
    fn test_cue_phrase_beats_other_registry_names_in_statement() {
        let source = resolver()
            .resolve("Purchased from Gray Market Parts for Boeing 737 fleet", "DSC Trading")
            .unwrap();
        assert_eq!(source.method, ResolutionMethod::CuePhrase);
        assert_eq!(source.entity, "Gray Market Parts");

        let source = resolver()
            .resolve("Removed from Delta Air Lines aircraft N901DL, sold to Honeywell", "AvAir")
            .unwrap();
        assert_eq!(source.entity, "Delta Air Lines aircraft N901DL");
    }

    #[test]
    fn test_cue_name_mapped_to_registry_spelling() {
        let source = resolver()
            .resolve("Traceable to AAR Corp. per teardown report", "DSC Trading")
            .unwrap();
        assert_eq!(source.method, ResolutionMethod::RegistryName);
        assert_eq!(normalize_entity_name(&source.entity), "aar");
    }

    #[test]
    fn test_cue_without_usable_name_does_not_scan_statement() {
        assert_eq!(resolver().resolve("Purchased from unknown for Boeing", "DSC Trading"), None);
    }

    #[test]
    fn test_cue_requires_word_boundary() {
        assert_eq!(find_word("obtained therefrom acme", "from"), None);
        assert_eq!(find_word("acquired from acme", "from"), Some(9));
    }

    #[test]
    fn test_bare_name_statement() {
        let source = DeclaredSourceResolver::new()
            .resolve("Bizjet Intl", "DSC Trading")
            .unwrap();

        assert_eq!(source.method, ResolutionMethod::BareName);
        assert_eq!(source.entity, "Bizjet Intl");
    }

    #[test]
    fn test_condition_statements_are_not_entities() {
        let resolver = DeclaredSourceResolver::new();

        assert_eq!(resolver.resolve("New Surplus", "DSC Trading"), None);
        assert_eq!(resolver.resolve("   ", "DSC Trading"), None);
        assert_eq!(
            resolver.resolve(
                "the parts listed herein were inspected and found to be in serviceable condition by our staff",
                "DSC Trading"
            ),
            None
        );
    }

    #[test]
    fn test_claims_do_not_become_regulated_names() {
        // The claim text is returned as a name only; classification happens elsewhere
        let source = resolver()
            .resolve("Repaired by Logistica Aeroespacial (FAA 145)", "Aircraft Parts Logistic")
            .unwrap();
        assert_eq!(source.entity, "Logistica Aeroespacial");
    }
}
