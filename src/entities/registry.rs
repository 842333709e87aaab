// 📒 Entity Registry - who is actually regulated
//
// The registry is the only authority on an entity's trust category. It is an
// immutable, versioned snapshot: updates produce a new snapshot (copy-on-write)
// and every evaluation run is handed the snapshot it should use.
//
// Problem solved:
// - "APPLIED AVIONICS, INC.", "Applied Avionics" → same OEM entry
// - "Logistica Aeroespacial S.A. de C.V. (FAA 145)" → Fraudulent, whatever it claims
// - "Some Broker LLC" → Unregulated ("not found in registry"), never an error

use super::category::EntityCategory;
use super::normalize::{
    find_token_run, is_corporate_suffix, levenshtein_match, name_tokens, normalize_entity_name,
};
use crate::error::RegistryError;
use anyhow::Context as AnyhowContext;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tracing::warn;

/// Evidence attached to names the registry does not know
pub const NOT_FOUND_EVIDENCE: &str = "not found in registry";

/// Normalized keys shorter than this never match fuzzily
const FUZZY_MIN_CHARS: usize = 8;

// ============================================================================
// REGISTRY ENTRY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    /// Official name used in verdicts
    pub canonical_name: String,

    /// Alternative spellings that map to this entity
    #[serde(default)]
    pub aliases: BTreeSet<String>,

    pub category: EntityCategory,

    /// Audit trail: why this entity has this category
    #[serde(default)]
    pub evidence: String,
}

impl RegistryEntry {
    pub fn new(canonical_name: &str, category: EntityCategory, evidence: &str) -> Self {
        RegistryEntry {
            canonical_name: canonical_name.trim().to_string(),
            aliases: BTreeSet::new(),
            category,
            evidence: evidence.to_string(),
        }
    }

    /// Builder form of [`RegistryEntry::add_alias`]
    pub fn with_alias(mut self, alias: &str) -> Self {
        self.add_alias(alias.to_string());
        self
    }

    /// Add an alias (duplicates and the canonical name itself are ignored)
    pub fn add_alias(&mut self, alias: String) {
        let alias = alias.trim().to_string();
        if !alias.is_empty() && alias != self.canonical_name {
            self.aliases.insert(alias);
        }
    }

    /// Canonical name followed by aliases
    pub fn all_names(&self) -> Vec<&str> {
        std::iter::once(self.canonical_name.as_str())
            .chain(self.aliases.iter().map(String::as_str))
            .collect()
    }

    /// Placeholder returned for names the registry does not know
    pub fn unregistered(name: &str) -> Self {
        let trimmed = name.trim();
        let canonical = if trimmed.is_empty() { "Unknown" } else { trimmed };
        RegistryEntry::new(canonical, EntityCategory::Unregulated, NOT_FOUND_EVIDENCE)
    }

    pub fn is_registered(&self) -> bool {
        self.evidence != NOT_FOUND_EVIDENCE
    }
}

// ============================================================================
// CLASSIFIER SEAM
// ============================================================================

/// Anything that can answer "what category is this entity?".
///
/// Implementations must be deterministic per name and must report backend
/// failures as [`RegistryError`] instead of guessing `Unregulated`.
pub trait EntityClassifier: Send + Sync {
    fn classify(&self, name: &str) -> Result<RegistryEntry, RegistryError>;

    /// Every canonical name and alias, for locating entities inside free text
    fn known_names(&self) -> Result<Vec<String>, RegistryError>;

    /// Identifies the registry content a verdict was computed against
    fn snapshot_id(&self) -> Option<String> {
        None
    }
}

// ============================================================================
// MATCHING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MatchStrength {
    /// Normalized keys are equal
    Exact,
    /// One name appears as a whole-word run inside the other
    Contained,
    /// Within the configured Levenshtein distance
    Fuzzy,
}

#[derive(Debug, Clone)]
pub struct RegistryMatch<'a> {
    pub entry: &'a RegistryEntry,
    pub strength: MatchStrength,
    pub matched_name: &'a str,
}

#[derive(Debug, Clone)]
struct IndexedName {
    key: String,
    tokens: Vec<String>,
    original: String,
    entry: usize,
}

impl IndexedName {
    /// Single short tokens ("AA", "GE") are too ambiguous to match inside longer names
    fn is_specific(&self) -> bool {
        self.tokens.len() >= 2 || self.key.chars().count() >= 3
    }
}

// ============================================================================
// ENTITY REGISTRY
// ============================================================================

/// Serialized form of a registry snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub version: u64,
    pub entries: Vec<RegistryEntry>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RegistryFile {
    Snapshot(RegistrySnapshot),
    Entries(Vec<RegistryEntry>),
}

#[derive(Debug, Clone)]
pub struct EntityRegistry {
    version: u64,
    entries: Vec<RegistryEntry>,
    names: Vec<IndexedName>,
    fuzzy_distance: usize,
}

impl EntityRegistry {
    /// Empty registry: every name classifies as Unregulated
    pub fn new() -> Self {
        EntityRegistry::from_entries(1, Vec::new())
    }

    /// Registry pre-loaded with the verified aviation entities
    pub fn with_defaults() -> Self {
        EntityRegistry::from_entries(1, default_entries())
    }

    /// Build a snapshot. Entries are sorted so that the snapshot (and its
    /// fingerprint) does not depend on insertion order.
    pub fn from_entries(version: u64, mut entries: Vec<RegistryEntry>) -> Self {
        entries.sort_by(|a, b| {
            normalize_entity_name(&a.canonical_name)
                .cmp(&normalize_entity_name(&b.canonical_name))
                .then(a.category.cmp(&b.category))
                .then(a.canonical_name.cmp(&b.canonical_name))
        });

        let mut names = Vec::new();
        for (index, entry) in entries.iter().enumerate() {
            let mut seen = BTreeSet::new();
            for name in entry.all_names() {
                let tokens = name_tokens(name);
                let key = tokens.join(" ");
                if key.is_empty() || !seen.insert(key.clone()) {
                    continue;
                }
                names.push(IndexedName {
                    key,
                    tokens,
                    original: name.to_string(),
                    entry: index,
                });
            }
        }

        EntityRegistry {
            version,
            entries,
            names,
            fuzzy_distance: 2,
        }
    }

    /// Load a snapshot from JSON: either `{"version": n, "entries": [...]}` or a bare entry list.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read registry file: {:?}", path.as_ref()))?;

        let file: RegistryFile =
            serde_json::from_str(&content).context("Failed to parse registry JSON")?;

        let registry = match file {
            RegistryFile::Snapshot(snapshot) => {
                EntityRegistry::from_entries(snapshot.version, snapshot.entries)
            }
            RegistryFile::Entries(entries) => EntityRegistry::from_entries(1, entries),
        };
        registry.warn_on_conflicts();
        Ok(registry)
    }

    /// Log every name claimed by several categories (priority order will decide)
    pub fn warn_on_conflicts(&self) {
        for (key, categories) in self.conflicts() {
            warn!(
                name = %key,
                categories = ?categories,
                version = self.version,
                "registry name maps to several categories; priority order decides"
            );
        }
    }

    /// Write this snapshot as pretty JSON
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.snapshot())
            .context("Failed to serialize registry")?;
        fs::write(path.as_ref(), json)
            .with_context(|| format!("Failed to write registry file: {:?}", path.as_ref()))?;
        Ok(())
    }

    pub fn with_fuzzy_distance(mut self, distance: usize) -> Self {
        self.fuzzy_distance = distance;
        self
    }

    /// New snapshot with `entry` added (replacing any entry with the same
    /// normalized canonical name). The receiver is left untouched.
    pub fn with_entry(&self, entry: RegistryEntry) -> EntityRegistry {
        let key = normalize_entity_name(&entry.canonical_name);
        let mut entries: Vec<RegistryEntry> = self
            .entries
            .iter()
            .filter(|existing| normalize_entity_name(&existing.canonical_name) != key)
            .cloned()
            .collect();
        entries.push(entry);

        EntityRegistry::from_entries(self.version + 1, entries).with_fuzzy_distance(self.fuzzy_distance)
    }

    /// New snapshot without the entry whose canonical name normalizes like `name`
    pub fn without_entry(&self, name: &str) -> EntityRegistry {
        let key = normalize_entity_name(name);
        let entries = self
            .entries
            .iter()
            .filter(|existing| normalize_entity_name(&existing.canonical_name) != key)
            .cloned()
            .collect();

        EntityRegistry::from_entries(self.version + 1, entries).with_fuzzy_distance(self.fuzzy_distance)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            version: self.version,
            entries: self.entries.clone(),
        }
    }

    /// SHA-256 over the canonical entry list; identifies snapshot content in reports
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for entry in &self.entries {
            hasher.update(entry.canonical_name.as_bytes());
            hasher.update([0u8]);
            hasher.update(entry.category.as_str().as_bytes());
            hasher.update([0u8]);
            for alias in &entry.aliases {
                hasher.update(alias.as_bytes());
                hasher.update([1u8]);
            }
            hasher.update(entry.evidence.as_bytes());
            hasher.update([0xffu8]);
        }
        format!("{:x}", hasher.finalize())
    }

    /// Entries of one category
    pub fn by_category(&self, category: EntityCategory) -> Vec<&RegistryEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.category == category)
            .collect()
    }

    /// Normalized names claimed by more than one category
    pub fn conflicts(&self) -> BTreeMap<String, BTreeSet<EntityCategory>> {
        let mut by_key: BTreeMap<String, BTreeSet<EntityCategory>> = BTreeMap::new();
        for indexed in &self.names {
            by_key
                .entry(indexed.key.clone())
                .or_default()
                .insert(self.entries[indexed.entry].category);
        }
        by_key.retain(|_, categories| categories.len() > 1);
        by_key
    }

    /// Best registry match for a name, if any.
    ///
    /// Candidates are ranked by category priority first (so a Fraudulent
    /// listing always wins), then by match strength, then by name.
    pub fn lookup(&self, name: &str) -> Option<RegistryMatch<'_>> {
        let tokens = name_tokens(name);
        if tokens.is_empty() {
            return None;
        }
        let key = tokens.join(" ");
        let key_chars = key.chars().count();

        let mut best: Option<(u8, MatchStrength, &IndexedName)> = None;

        for indexed in &self.names {
            let category = self.entries[indexed.entry].category;
            let strength = if indexed.key == key {
                Some(MatchStrength::Exact)
            } else if indexed.is_specific()
                && contained_match(&tokens, &indexed.tokens, category)
            {
                Some(MatchStrength::Contained)
            } else if tokens.len() >= 2
                && tokens.len() * 2 >= indexed.tokens.len()
                && contained_match(&indexed.tokens, &tokens, category)
            {
                Some(MatchStrength::Contained)
            } else if self.fuzzy_distance > 0
                && key_chars >= FUZZY_MIN_CHARS
                && indexed.key.chars().count() >= FUZZY_MIN_CHARS
                && levenshtein_match(&key, &indexed.key, self.fuzzy_distance)
            {
                Some(MatchStrength::Fuzzy)
            } else {
                None
            };

            let Some(strength) = strength else { continue };
            let priority = category.priority();

            let better = match &best {
                None => true,
                Some((best_priority, best_strength, best_name)) => {
                    let best_entry = &self.entries[best_name.entry];
                    let entry = &self.entries[indexed.entry];
                    (priority, strength, entry.category, &entry.canonical_name)
                        < (
                            *best_priority,
                            *best_strength,
                            best_entry.category,
                            &best_entry.canonical_name,
                        )
                }
            };
            if better {
                best = Some((priority, strength, indexed));
            }
        }

        best.map(|(_, strength, indexed)| RegistryMatch {
            entry: &self.entries[indexed.entry],
            strength,
            matched_name: indexed.original.as_str(),
        })
    }

    /// Infallible classification against this snapshot
    pub fn classify_name(&self, name: &str) -> RegistryEntry {
        self.lookup(name)
            .map(|found| found.entry.clone())
            .unwrap_or_else(|| RegistryEntry::unregistered(name))
    }

    pub fn category_of(&self, name: &str) -> EntityCategory {
        self.lookup(name)
            .map(|found| found.entry.category)
            .unwrap_or(EntityCategory::Unregulated)
    }
}

/// `shorter` appears as a token run inside `longer`.
///
/// Regulated categories only match when every token outside the run is a
/// corporate suffix: "Boeing Parts Liquidators" is not Boeing, while a
/// blacklisted or distributor name still matches inside longer text.
fn contained_match(longer: &[String], shorter: &[String], category: EntityCategory) -> bool {
    let Some(start) = find_token_run(longer, shorter) else {
        return false;
    };
    if !category.is_regulated() {
        return true;
    }
    longer[..start]
        .iter()
        .chain(&longer[start + shorter.len()..])
        .all(|token| token == "the" || is_corporate_suffix(token))
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl EntityClassifier for EntityRegistry {
    fn classify(&self, name: &str) -> Result<RegistryEntry, RegistryError> {
        Ok(self.classify_name(name))
    }

    fn known_names(&self) -> Result<Vec<String>, RegistryError> {
        Ok(self
            .entries
            .iter()
            .flat_map(|entry| entry.all_names())
            .map(str::to_string)
            .collect())
    }

    fn snapshot_id(&self) -> Option<String> {
        Some(format!("v{}-{}", self.version, &self.fingerprint()[..12]))
    }
}

// ============================================================================
// DEFAULT TABLE
// ============================================================================

/// Verified entities (FAA / CAGE lookups); distributors and known bad actors included.
fn default_entries() -> Vec<RegistryEntry> {
    use EntityCategory::*;

    let table: &[(&str, EntityCategory, &str, &[&str])] = &[
        // OEM manufacturers
        ("Applied Avionics, Inc.", Oem, "Legitimate OEM manufacturer - CAGE 32245, Fort Worth, TX", &["Applied Avionics", "AppliedAvionics"]),
        ("Moeller Manufacturing", Oem, "Legitimate OEM manufacturer", &["Moeller Mfg"]),
        ("Anillo Industries", Oem, "Legitimate OEM manufacturer", &[]),
        ("AHG Ateliers Haute-Garonne", Oem, "Legitimate OEM manufacturer", &["AHG Ateliers", "Ateliers Haute-Garonne"]),
        ("The Boeing Company", Oem, "Type certificate / production approval holder", &["Boeing"]),
        ("Boeing Distribution Services", Oem, "OEM distribution arm of The Boeing Company", &["Boeing Distribution Services Inc"]),
        ("Airbus", Oem, "Type certificate / production approval holder", &["Airbus S.A.S."]),
        ("Honeywell", Oem, "Production approval holder", &["Honeywell International", "Honeywell Aerospace"]),
        ("Collins Aerospace", Oem, "Production approval holder", &["Rockwell Collins"]),
        // Part 121 domestic airlines
        ("US Airways, Inc.", Airline121, "Legitimate 121 domestic airline", &["US Airways", "USAirways"]),
        ("Endeavor Air", Airline121, "Legitimate 121 domestic airline", &[]),
        ("ExpressJet Airlines, Inc.", Airline121, "Legitimate 121 domestic airline", &["ExpressJet Airlines", "ExpressJet"]),
        ("Delta Air Lines", Airline121, "Legitimate 121 domestic airline", &["Delta Airlines"]),
        ("American Airlines", Airline121, "Legitimate 121 domestic airline", &[]),
        ("United Airlines", Airline121, "Legitimate 121 domestic airline", &[]),
        ("Southwest Airlines", Airline121, "Legitimate 121 domestic airline", &[]),
        // Part 129 foreign airlines operating in the US
        ("Japan Airlines", Airline129, "Foreign air carrier operating in USA", &["JAL"]),
        ("China Airlines", Airline129, "Foreign air carrier operating in USA", &[]),
        ("Lufthansa", Airline129, "Foreign air carrier operating in USA", &["Deutsche Lufthansa"]),
        ("Air France", Airline129, "Foreign air carrier operating in USA", &[]),
        // Part 135 charter / cargo
        ("FedEx", Operator135, "Cargo operator", &["Federal Express"]),
        ("UPS", Operator135, "Cargo operator", &["United Parcel Service"]),
        ("DHL", Operator135, "Cargo operator", &[]),
        // Part 145 repair stations
        ("B & W Aviation Corp", RepairStation145, "Legitimate FAA 145 repair station - FAA #6BWR787B, EASA #145.6498", &["B&W Aviation Corp", "B&W Aviation"]),
        ("AAR", RepairStation145, "Legitimate FAA 145 repair station", &["AAR Corp"]),
        ("Lufthansa Technik", RepairStation145, "Legitimate FAA 145 repair station", &[]),
        ("Delta TechOps", RepairStation145, "Legitimate FAA 145 repair station", &["Delta Tech Ops"]),
        // Parts distributors (pass-through links)
        ("Aircraft Parts Logistic", PartsDistributor, "Parts distributor - acceptable as intermediate link with proper documentation", &["Aircraft Parts Logistics"]),
        ("DSC Trading, LLC", PartsDistributor, "Parts distributor - acceptable as intermediate link with proper documentation", &["DSC Trading", "DSCTrading"]),
        ("Aventure International Aviation Services", PartsDistributor, "Parts distributor - purchased from ExpressJet Airlines, Inc. (121) via Bill of Sale Dec 29, 2016", &["Aventure Int'l Aviation Services", "Aventure Intl", "Aventure International"]),
        ("AvAir, LLC", PartsDistributor, "Parts distributor - acceptable as intermediate link with proper documentation", &["AvAir"]),
        ("A&E Parts, Inc.", PartsDistributor, "Parts distributor - acceptable as intermediate link with proper documentation", &["A&E Parts"]),
        ("MJ Aerospace", PartsDistributor, "Parts distributor - acceptable as intermediate link with proper documentation", &[]),
        // Known bad actors
        ("Logistica Aeroespacial S.A. de C.V.", Fraudulent, "Claims to be a 145 repair station but is ONLY Mexican AFAC certified (Shop Repair AFAC 358), NOT FAA-regulated", &["Logistica Aeroespacial", "LogisticaAeroespacial"]),
        ("ATO Aviation Group LLC", Unregulated, "Repair shop with no FAA certification found", &["ATO Aviation Group", "ATOAviationGroup"]),
    ];

    table
        .iter()
        .map(|(name, category, evidence, aliases)| {
            aliases
                .iter()
                .fold(RegistryEntry::new(name, *category, evidence), |entry, alias| {
                    entry.with_alias(alias)
                })
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_add_alias() {
        let mut entry = RegistryEntry::new("Applied Avionics, Inc.", EntityCategory::Oem, "CAGE 32245");

        entry.add_alias("Applied Avionics".to_string());
        entry.add_alias("Applied Avionics".to_string()); // Duplicate - should not add
        entry.add_alias("Applied Avionics, Inc.".to_string()); // Canonical - should not add
        entry.add_alias("   ".to_string());

        assert_eq!(entry.aliases.len(), 1);
        assert_eq!(entry.all_names(), vec!["Applied Avionics, Inc.", "Applied Avionics"]);
    }

    #[test]
    fn test_classify_canonical_and_aliases() {
        let registry = EntityRegistry::with_defaults();

        let oem = registry.classify_name("APPLIED AVIONICS, INC.");
        assert_eq!(oem.category, EntityCategory::Oem);
        assert_eq!(oem.canonical_name, "Applied Avionics, Inc.");

        assert_eq!(registry.category_of("AppliedAvionics"), EntityCategory::Oem);
        assert_eq!(registry.category_of("Aventure Int'l Aviation Services"), EntityCategory::PartsDistributor);
        assert_eq!(registry.category_of("EXPRESSJET AIRLINES, INC."), EntityCategory::Airline121);
        assert_eq!(registry.category_of("B&W Aviation Corp"), EntityCategory::RepairStation145);
    }

    #[test]
    fn test_unknown_name_is_unregulated_not_error() {
        let registry = EntityRegistry::with_defaults();
        let entry = registry.classify("Bizjet International").unwrap();

        assert_eq!(entry.category, EntityCategory::Unregulated);
        assert_eq!(entry.canonical_name, "Bizjet International");
        assert_eq!(entry.evidence, NOT_FOUND_EVIDENCE);
        assert!(!entry.is_registered());

        assert_eq!(registry.classify_name("   ").canonical_name, "Unknown");
    }

    #[test]
    fn test_self_declared_145_is_not_trusted() {
        let registry = EntityRegistry::with_defaults();

        assert_eq!(
            registry.category_of("Acme Aero FAA Part 145 Repair Station"),
            EntityCategory::Unregulated
        );
        assert_eq!(
            registry.category_of("Logistica Aeroespacial S.A. de C.V. - FAA 145 Repair Station"),
            EntityCategory::Fraudulent
        );
    }

    #[test]
    fn test_fraudulent_wins_over_regulated_match() {
        let registry = EntityRegistry::with_defaults().with_entry(
            RegistryEntry::new("Sky Repair Co", EntityCategory::RepairStation145, "self-listed")
                .with_alias("Sky Repair"),
        );
        let registry = registry.with_entry(RegistryEntry::new(
            "Sky Repair Mexico",
            EntityCategory::Fraudulent,
            "blacklisted",
        ));

        // Matches "sky repair" (145, contained) and "sky repair mexico" (fraud, exact)
        let entry = registry.classify_name("Sky Repair Mexico");
        assert_eq!(entry.category, EntityCategory::Fraudulent);
    }

    #[test]
    fn test_exact_match_beats_contained_within_tier() {
        let registry = EntityRegistry::with_defaults();

        assert_eq!(registry.category_of("Lufthansa Technik"), EntityCategory::RepairStation145);
        assert_eq!(registry.category_of("Lufthansa"), EntityCategory::Airline129);
    }

    #[test]
    fn test_fuzzy_match_handles_typos() {
        let registry = EntityRegistry::with_defaults();

        assert_eq!(registry.category_of("Expresjet Airlines"), EntityCategory::Airline121);
        assert_eq!(
            registry.lookup("Expresjet Airlines").unwrap().strength,
            MatchStrength::Fuzzy
        );

        let strict = EntityRegistry::with_defaults().with_fuzzy_distance(0);
        assert_eq!(strict.category_of("Expresjet Airlines"), EntityCategory::Unregulated);
    }

    #[test]
    fn test_short_names_do_not_match_inside_words() {
        let registry = EntityRegistry::with_defaults();
        assert_eq!(registry.category_of("Aaron Parts Depot"), EntityCategory::Unregulated);
        assert_eq!(registry.category_of("AAR Corp"), EntityCategory::RepairStation145);
    }

    #[test]
    fn test_regulated_name_inside_unknown_name_is_not_inherited() {
        let registry = EntityRegistry::with_defaults();

        assert_eq!(registry.category_of("Honeywell Surplus Brokers"), EntityCategory::Unregulated);
        assert_eq!(registry.category_of("Boeing Parts Liquidators LLC"), EntityCategory::Unregulated);
        assert_eq!(registry.category_of("UPS Store 4412"), EntityCategory::Unregulated);
        assert_eq!(registry.category_of("W Aviation"), EntityCategory::Unregulated);
        assert_eq!(registry.category_of("Delta Parts Exchange"), EntityCategory::Unregulated);

        // Suffix-only differences still match
        assert_eq!(registry.category_of("The Boeing Co."), EntityCategory::Oem);
        assert_eq!(registry.category_of("Honeywell International Inc"), EntityCategory::Oem);
    }

    #[test]
    fn test_blacklisted_and_distributor_names_match_inside_text() {
        let registry = EntityRegistry::with_defaults();

        assert_eq!(
            registry.lookup("Logistica Aeroespacial Mexico Sucursal").unwrap().strength,
            MatchStrength::Contained
        );
        assert_eq!(registry.category_of("AvAir Warehouse 3"), EntityCategory::PartsDistributor);
    }

    #[test]
    fn test_with_entry_is_copy_on_write() {
        let v1 = EntityRegistry::with_defaults();
        let v2 = v1.with_entry(RegistryEntry::new("Bizjet International", EntityCategory::RepairStation145, "FAA certificate verified"));

        assert_eq!(v2.version(), v1.version() + 1);
        assert_eq!(v1.category_of("Bizjet International"), EntityCategory::Unregulated);
        assert_eq!(v2.category_of("Bizjet International"), EntityCategory::RepairStation145);
        assert_ne!(v1.fingerprint(), v2.fingerprint());

        let v3 = v2.without_entry("BIZJET INTERNATIONAL");
        assert_eq!(v3.category_of("Bizjet International"), EntityCategory::Unregulated);
        assert_eq!(v3.len(), v1.len());
    }

    #[test]
    fn test_fingerprint_independent_of_insertion_order() {
        let a = RegistryEntry::new("Alpha Aero", EntityCategory::Oem, "");
        let b = RegistryEntry::new("Beta Parts", EntityCategory::PartsDistributor, "");

        let first = EntityRegistry::from_entries(1, vec![a.clone(), b.clone()]);
        let second = EntityRegistry::from_entries(1, vec![b, a]);

        assert_eq!(first.fingerprint(), second.fingerprint());
    }

    #[test]
    fn test_conflicts_reported() {
        let registry = EntityRegistry::from_entries(
            1,
            vec![
                RegistryEntry::new("Gray Aero", EntityCategory::RepairStation145, "self-declared"),
                RegistryEntry::new("Gray Aero LLC", EntityCategory::Fraudulent, "blacklist"),
            ],
        );

        let conflicts = registry.conflicts();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(registry.category_of("GRAY AERO"), EntityCategory::Fraudulent);
    }

    #[test]
    fn test_known_names_include_aliases() {
        let registry = EntityRegistry::with_defaults();
        let names = registry.known_names().unwrap();

        assert!(names.contains(&"ExpressJet Airlines, Inc.".to_string()));
        assert!(names.contains(&"Aventure Int'l Aviation Services".to_string()));
    }

    #[test]
    fn test_file_round_trip_accepts_bare_list() {
        let path = std::env::temp_dir().join(format!("parts-trace-registry-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"[{"canonicalName": "Bizjet International", "category": "RepairStation145", "aliases": ["Bizjet Intl"]}]"#,
        )
        .unwrap();

        let registry = EntityRegistry::from_file(&path).unwrap();
        assert_eq!(registry.version(), 1);
        assert_eq!(registry.category_of("BizjetIntl"), EntityCategory::Unregulated);
        assert_eq!(registry.category_of("Bizjet Intl"), EntityCategory::RepairStation145);

        registry.save_to_file(&path).unwrap();
        let reloaded = EntityRegistry::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(reloaded.fingerprint(), registry.fingerprint());
    }
}
