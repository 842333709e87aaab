// 🔗 Chain Builder - reconstruct custody backward from the current owner
//
// Certificates for one part form a graph: every certificate is an edge
// seller → buyer. Starting at the owner the paperwork was issued to, the walk
// follows "who sold it to them?" until nobody did. Where a certificate is
// missing, a sworn origin statement may bridge the gap (a Declared link).
//
// Termination is guaranteed by a visited set and a hop cap.

use crate::asa100::{classify_part, documentation_findings, PartClass};
use crate::certificate::CertificateRecord;
use crate::config::DEFAULT_MAX_HOPS;
use crate::declared::DeclaredSourceResolver;
use crate::entities::normalize::{find_token_run, name_tokens, normalize_entity_name};
use crate::entities::{EntityCategory, EntityClassifier, RegistryEntry};
use crate::error::TraceError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Grouping key for certificates with a blank part number
pub const UNKNOWN_PART: &str = "UNKNOWN";

/// Separator used when rendering a chain from origin to owner
pub const CHAIN_ARROW: &str = " → ";

// ============================================================================
// CHAIN TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkKind {
    /// Seller/buyer match on a certificate
    Direct,
    /// Bridged by a free-text origin statement (lower evidentiary weight)
    Declared,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainLink {
    /// Buyer side (closer to the current owner)
    pub from_entity: String,
    /// Prior holder
    pub to_entity: String,
    pub supporting_document_id: String,
    pub link_kind: LinkKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_statement: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// No further backward link
    Terminal,
    CycleDetected,
    DepthExceeded,
    /// No certificate names a buyer or a seller
    NoAnchor,
}

/// How the walk picked its starting owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnchorKind {
    BuyerHint,
    LatestCertificate,
    FirstCertificate,
    SellerOnly,
    None,
}

impl AnchorKind {
    pub fn is_fallback(&self) -> bool {
        *self != AnchorKind::BuyerHint
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceabilityChain {
    pub part_number: String,
    pub serial_number: Option<String>,
    pub start_entity: String,
    /// Ordered from the current owner backward
    pub links: Vec<ChainLink>,
    pub terminal_entity: String,
    pub terminal_category: EntityCategory,
    /// True iff the walk ended because no further backward link exists
    pub chain_complete: bool,
    /// First fraudulent entity, else an unregulated terminal
    pub breaking_entity: Option<String>,
    pub stop_reason: StopReason,
    pub anchor: AnchorKind,
    pub anchor_document_id: Option<String>,
    pub certificate_count: usize,
    pub asa100_class: PartClass,
    pub documentation_findings: Vec<String>,
    pub notes: Vec<String>,
}

impl TraceabilityChain {
    /// Entities from the current owner back to the terminal
    pub fn entities(&self) -> Vec<&str> {
        std::iter::once(self.start_entity.as_str())
            .chain(self.links.iter().map(|link| link.to_entity.as_str()))
            .collect()
    }

    /// "Origin → ... → Owner"
    pub fn render(&self) -> String {
        let mut names = self.entities();
        names.reverse();
        names.join(CHAIN_ARROW)
    }

    pub fn declared_links(&self) -> impl Iterator<Item = &ChainLink> {
        self.links
            .iter()
            .filter(|link| link.link_kind == LinkKind::Declared)
    }
}

/// Grouping key: trimmed, uppercased part number
pub fn part_key(part_number: &str) -> String {
    let trimmed = part_number.trim();
    if trimmed.is_empty() {
        UNKNOWN_PART.to_string()
    } else {
        trimmed.to_uppercase()
    }
}

// ============================================================================
// CHAIN BUILDER
// ============================================================================

pub struct ChainBuilder<'a> {
    classifier: &'a dyn EntityClassifier,
    resolver: DeclaredSourceResolver,
    max_hops: usize,
}

struct Anchor {
    kind: AnchorKind,
    cert: Option<usize>,
    entity: String,
}

struct Step {
    entity: String,
    cert: usize,
    kind: LinkKind,
    statement: Option<String>,
}

impl<'a> ChainBuilder<'a> {
    pub fn new(classifier: &'a dyn EntityClassifier) -> Result<Self, TraceError> {
        Ok(ChainBuilder {
            classifier,
            resolver: DeclaredSourceResolver::from_classifier(classifier)?,
            max_hops: DEFAULT_MAX_HOPS,
        })
    }

    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops;
        self
    }

    /// One chain per distinct part number, ordered by part number.
    pub fn build_chains(
        &self,
        certificates: &[CertificateRecord],
        target_buyer: Option<&str>,
    ) -> Result<Vec<TraceabilityChain>, TraceError> {
        let mut by_part: BTreeMap<String, Vec<CertificateRecord>> = BTreeMap::new();
        for cert in certificates {
            by_part
                .entry(part_key(&cert.part_number))
                .or_default()
                .push(cert.clone());
        }

        by_part
            .iter()
            .map(|(part, certs)| self.build_part_chain(part, certs, target_buyer))
            .collect()
    }

    /// Build the chain for certificates already known to share a part number.
    pub fn build_part_chain(
        &self,
        part_number: &str,
        certificates: &[CertificateRecord],
        target_buyer: Option<&str>,
    ) -> Result<TraceabilityChain, TraceError> {
        let mut certs: Vec<&CertificateRecord> = certificates.iter().collect();
        certs.sort_by(|a, b| canonical_order(a, b));

        let mut notes = Vec::new();
        for cert in &certs {
            if cert.seller().is_none() {
                notes.push(format!(
                    "Missing seller on {} ({})",
                    cert.document_id,
                    cert.certificate_type.as_str()
                ));
            }
            if cert.buyer().is_none() {
                notes.push(format!(
                    "Missing buyer on {} ({})",
                    cert.document_id,
                    cert.certificate_type.as_str()
                ));
            }
        }

        let anchor = select_anchor(&certs, target_buyer);
        if let Some(note) = anchor_note(&anchor, &certs, target_buyer) {
            warn!(part = %part_number, anchor = ?anchor.kind, "{}", note);
            notes.push(note);
        }

        let serial_number = anchor
            .cert
            .and_then(|i| certs[i].serial_number.clone())
            .or_else(|| certs.iter().find_map(|c| c.serial_number.clone()))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let index = BuyerIndex::new(&certs);
        let mut links: Vec<ChainLink> = Vec::new();
        let mut stop_reason = StopReason::NoAnchor;

        if anchor.kind != AnchorKind::None {
            let mut current = anchor.entity.clone();
            let mut visited: BTreeSet<String> = BTreeSet::new();
            visited.insert(normalize_entity_name(&current));
            let mut used: BTreeSet<usize> = BTreeSet::new();

            let (mut via, mut preferred) = match anchor.kind {
                AnchorKind::SellerOnly => (anchor.cert, None),
                _ => (None, anchor.cert),
            };

            stop_reason = loop {
                let walk = Walk {
                    certs: &certs,
                    index: &index,
                    serial: serial_number.as_deref(),
                    used: &used,
                    visited: &visited,
                };
                let Some(step) = self.next_step(&walk, &current, via, preferred, &mut notes) else {
                    break StopReason::Terminal;
                };

                if links.len() >= self.max_hops {
                    let note = format!(
                        "Depth bound of {} hops exceeded at {}; chain left incomplete",
                        self.max_hops, current
                    );
                    warn!(part = %part_number, max_hops = self.max_hops, "{}", note);
                    notes.push(note);
                    break StopReason::DepthExceeded;
                }

                let next_key = normalize_entity_name(&step.entity);
                if visited.contains(&next_key) {
                    let note = format!(
                        "Cycle detected: {} → {} revisits an entity already in the chain ({})",
                        current, step.entity, certs[step.cert].document_id
                    );
                    warn!(part = %part_number, entity = %step.entity, "{}", note);
                    notes.push(note);
                    break StopReason::CycleDetected;
                }

                debug!(
                    part = %part_number,
                    from = %current,
                    to = %step.entity,
                    kind = ?step.kind,
                    document = %certs[step.cert].document_id,
                    "chain hop"
                );

                links.push(ChainLink {
                    from_entity: current.clone(),
                    to_entity: step.entity.clone(),
                    supporting_document_id: certs[step.cert].document_id.clone(),
                    link_kind: step.kind,
                    declared_statement: step.statement,
                });
                used.insert(step.cert);
                visited.insert(next_key);
                via = match step.kind {
                    LinkKind::Direct => Some(step.cert),
                    LinkKind::Declared => None,
                };
                preferred = None;
                current = step.entity;
            };
        } else {
            let note = "No certificate names a buyer or a seller; no chain can be built".to_string();
            warn!(part = %part_number, "{}", note);
            notes.push(note);
        }

        let start_entity = anchor.entity;
        let terminal_entity = links
            .last()
            .map(|link| link.to_entity.clone())
            .unwrap_or_else(|| start_entity.clone());

        // Classify every entity once; the first fraudulent one breaks the chain
        let mut classified: BTreeMap<String, RegistryEntry> = BTreeMap::new();
        let names: Vec<String> = std::iter::once(start_entity.clone())
            .chain(links.iter().map(|link| link.to_entity.clone()))
            .collect();
        for name in &names {
            if !classified.contains_key(name) {
                let entry = self
                    .classifier
                    .classify(name)
                    .map_err(|err| TraceError::registry(name, err))?;
                classified.insert(name.clone(), entry);
            }
        }

        let terminal = classified
            .get(&terminal_entity)
            .cloned()
            .unwrap_or_else(|| RegistryEntry::unregistered(&terminal_entity));

        let breaking_entity = names
            .iter()
            .filter_map(|name| classified.get(name))
            .find(|entry| entry.category.is_fraudulent())
            .or_else(|| (terminal.category == EntityCategory::Unregulated).then_some(&terminal))
            .map(|entry| entry.canonical_name.clone());

        let owned: Vec<CertificateRecord> = certs.iter().map(|c| (*c).clone()).collect();
        let asa100_class = classify_part(&owned);
        let findings = documentation_findings(asa100_class, &owned);

        Ok(TraceabilityChain {
            part_number: part_number.to_string(),
            serial_number,
            start_entity,
            links,
            terminal_entity,
            terminal_category: terminal.category,
            chain_complete: stop_reason == StopReason::Terminal,
            breaking_entity,
            stop_reason,
            anchor: anchor.kind,
            anchor_document_id: anchor.cert.map(|i| certs[i].document_id.clone()),
            certificate_count: certs.len(),
            asa100_class,
            documentation_findings: findings,
            notes,
        })
    }

    /// The next backward hop from `current`, if any.
    ///
    /// Direct links win over declared ones. `via` is the certificate on which
    /// `current` appeared as seller; its origin statement speaks for `current`.
    fn next_step(
        &self,
        walk: &Walk<'_>,
        current: &str,
        via: Option<usize>,
        preferred: Option<usize>,
        notes: &mut Vec<String>,
    ) -> Option<Step> {
        let current_key = normalize_entity_name(current);
        let bought = walk.index.certs_bought_by(current);

        let sells_onward = |i: usize| {
            walk.certs[i]
                .seller()
                .map(|seller| normalize_entity_name(seller) != current_key)
                .unwrap_or(false)
        };

        let direct = bought
            .iter()
            .copied()
            .filter(|&i| sells_onward(i))
            .min_by_key(|&i| {
                let seller_key = walk.certs[i].seller().map(normalize_entity_name).unwrap_or_default();
                (
                    Some(i) != preferred,
                    walk.used.contains(&i),
                    serial_mismatch(walk.certs[i], walk.serial),
                    walk.visited.contains(&seller_key),
                    i,
                )
            });

        if let Some(i) = direct {
            if let Some(seller) = walk.certs[i].seller() {
                return Some(Step {
                    entity: seller.to_string(),
                    cert: i,
                    kind: LinkKind::Direct,
                    statement: None,
                });
            }
        }

        // Origin statements: the certificate we arrived by, then any of
        // current's own purchase certificates that named no other seller
        let mut sellerless: Vec<usize> = bought
            .iter()
            .copied()
            .filter(|&i| !sells_onward(i) && !walk.used.contains(&i) && Some(i) != via)
            .collect();
        sellerless.sort_by_key(|&i| (Some(i) != preferred, i));
        let statements = via.into_iter().chain(sellerless);

        let mut unresolved = Vec::new();
        for i in statements {
            let Some(statement) = walk.certs[i].declared_source() else {
                continue;
            };
            match self.resolver.resolve(statement, current) {
                Some(source) => {
                    return Some(Step {
                        entity: source.entity,
                        cert: i,
                        kind: LinkKind::Declared,
                        statement: Some(statement.to_string()),
                    })
                }
                None => unresolved.push(format!(
                    "Traceability statement on {} names no prior holder of {}: \"{}\"",
                    walk.certs[i].document_id, current, statement
                )),
            }
        }
        notes.extend(unresolved);
        None
    }
}

struct Walk<'w> {
    certs: &'w [&'w CertificateRecord],
    index: &'w BuyerIndex,
    serial: Option<&'w str>,
    used: &'w BTreeSet<usize>,
    visited: &'w BTreeSet<String>,
}

// ============================================================================
// BUYER INDEX
// ============================================================================

/// Certificates indexed by normalized buyer name
struct BuyerIndex {
    by_key: BTreeMap<String, (Vec<String>, Vec<usize>)>,
}

impl BuyerIndex {
    fn new(certs: &[&CertificateRecord]) -> Self {
        let mut by_key: BTreeMap<String, (Vec<String>, Vec<usize>)> = BTreeMap::new();
        for (i, cert) in certs.iter().enumerate() {
            if let Some(buyer) = cert.buyer() {
                let tokens = name_tokens(buyer);
                let key = tokens.join(" ");
                if key.is_empty() {
                    continue;
                }
                by_key.entry(key).or_insert_with(|| (tokens, Vec::new())).1.push(i);
            }
        }
        BuyerIndex { by_key }
    }

    /// Certificates whose buyer is `entity`: exact key first, else buyer names
    /// where one is a multi-word run of the other ("Aventure Intl" ~ "Aventure
    /// International Aviation Services").
    fn certs_bought_by(&self, entity: &str) -> Vec<usize> {
        let tokens = name_tokens(entity);
        let key = tokens.join(" ");
        if let Some((_, certs)) = self.by_key.get(&key) {
            return certs.clone();
        }
        if tokens.is_empty() {
            return Vec::new();
        }

        let mut found: Vec<usize> = self
            .by_key
            .values()
            .filter(|(buyer_tokens, _)| {
                let (shorter, longer) = if buyer_tokens.len() <= tokens.len() {
                    (buyer_tokens, &tokens)
                } else {
                    (&tokens, buyer_tokens)
                };
                shorter.len() >= 2 && find_token_run(longer, shorter).is_some()
            })
            .flat_map(|(_, certs)| certs.iter().copied())
            .collect();
        found.sort_unstable();
        found.dedup();
        found
    }
}

// ============================================================================
// ANCHOR SELECTION
// ============================================================================

/// First certificate whose buyer contains the hint (case-insensitive), else
/// the chronologically last certificate with a buyer, else the first one.
fn select_anchor(certs: &[&CertificateRecord], target_buyer: Option<&str>) -> Anchor {
    let hint = target_buyer
        .map(str::trim)
        .filter(|hint| !hint.is_empty())
        .map(str::to_lowercase);

    let buyer_anchor = |kind: AnchorKind, i: usize| Anchor {
        kind,
        cert: Some(i),
        entity: certs[i].buyer().unwrap_or_default().to_string(),
    };

    if let Some(hint) = &hint {
        let matched = certs.iter().position(|cert| {
            cert.buyer()
                .map(|buyer| buyer.to_lowercase().contains(hint.as_str()))
                .unwrap_or(false)
        });
        if let Some(i) = matched {
            return buyer_anchor(AnchorKind::BuyerHint, i);
        }
    }

    let latest = certs
        .iter()
        .enumerate()
        .filter(|(_, cert)| cert.buyer().is_some())
        .filter_map(|(i, cert)| cert.certified_on().map(|date| (date, i)))
        .max();
    if let Some((_, i)) = latest {
        return buyer_anchor(AnchorKind::LatestCertificate, i);
    }

    if let Some(i) = certs.iter().position(|cert| cert.buyer().is_some()) {
        return buyer_anchor(AnchorKind::FirstCertificate, i);
    }

    if let Some(i) = certs.iter().position(|cert| cert.seller().is_some()) {
        return Anchor {
            kind: AnchorKind::SellerOnly,
            cert: Some(i),
            entity: certs[i].seller().unwrap_or_default().to_string(),
        };
    }

    Anchor {
        kind: AnchorKind::None,
        cert: None,
        entity: "Unknown".to_string(),
    }
}

fn anchor_note(anchor: &Anchor, certs: &[&CertificateRecord], target_buyer: Option<&str>) -> Option<String> {
    let hint_part = match target_buyer.map(str::trim).filter(|hint| !hint.is_empty()) {
        Some(hint) => format!("No certificate buyer matches target buyer \"{}\"", hint),
        None => "No target buyer given".to_string(),
    };
    let document = anchor.cert.map(|i| certs[i].document_id.as_str()).unwrap_or("-");

    match anchor.kind {
        AnchorKind::BuyerHint | AnchorKind::None => None,
        AnchorKind::LatestCertificate => Some(format!(
            "{}; fallback anchor: chronologically last certificate {} (buyer {})",
            hint_part, document, anchor.entity
        )),
        AnchorKind::FirstCertificate => Some(format!(
            "{}; fallback anchor: first certificate {} (buyer {}, no certification dates)",
            hint_part, document, anchor.entity
        )),
        AnchorKind::SellerOnly => Some(format!(
            "{}; no certificate names a buyer, walking back from seller {} on {}",
            hint_part, anchor.entity, document
        )),
    }
}

// ============================================================================
// ORDERING HELPERS
// ============================================================================

fn serial_mismatch(cert: &CertificateRecord, serial: Option<&str>) -> bool {
    match (cert.serial_number.as_deref().map(str::trim), serial) {
        (Some(own), Some(wanted)) if !own.is_empty() => !own.eq_ignore_ascii_case(wanted),
        _ => false,
    }
}

/// Total order over certificates so that input order never leaks into a chain
fn canonical_order(a: &CertificateRecord, b: &CertificateRecord) -> Ordering {
    let key = |name: Option<&str>| name.map(normalize_entity_name).unwrap_or_default();

    a.certified_on()
        .cmp(&b.certified_on())
        .then_with(|| a.document_id.cmp(&b.document_id))
        .then_with(|| key(a.seller()).cmp(&key(b.seller())))
        .then_with(|| key(a.buyer()).cmp(&key(b.buyer())))
        .then_with(|| a.certificate_type.cmp(&b.certificate_type))
        .then_with(|| a.serial_number.cmp(&b.serial_number))
        .then_with(|| a.seller_name.cmp(&b.seller_name))
        .then_with(|| a.buyer_name.cmp(&b.buyer_name))
        .then_with(|| a.traceability_source.cmp(&b.traceability_source))
        .then_with(|| a.manufacturer.cmp(&b.manufacturer))
        .then_with(|| a.description.cmp(&b.description))
        .then_with(|| a.condition_code.cmp(&b.condition_code))
        .then_with(|| a.quantity.cmp(&b.quantity))
        .then_with(|| a.certification_date.cmp(&b.certification_date))
        .then_with(|| a.part_number.cmp(&b.part_number))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::CertificateType;
    use crate::entities::EntityRegistry;

    fn sale(doc: &str, seller: &str, buyer: &str) -> CertificateRecord {
        CertificateRecord::new(CertificateType::Faa8130_3, "4100-01", doc)
            .with_seller(seller)
            .with_buyer(buyer)
    }

    fn build(certs: &[CertificateRecord], hint: Option<&str>) -> TraceabilityChain {
        let registry = EntityRegistry::with_defaults();
        let builder = ChainBuilder::new(&registry).unwrap();
        let mut chains = builder.build_chains(certs, hint).unwrap();
        assert_eq!(chains.len(), 1);
        chains.remove(0)
    }

    #[test]
    fn test_links_ordered_from_owner_back() {
        let chain = build(
            &[
                sale("d2", "Aircraft Parts Logistic", "Skylink"),
                sale("d1", "Applied Avionics, Inc.", "Aircraft Parts Logistic"),
            ],
            Some("Skylink"),
        );

        assert_eq!(chain.start_entity, "Skylink");
        assert_eq!(chain.entities(), vec!["Skylink", "Aircraft Parts Logistic", "Applied Avionics, Inc."]);
        assert_eq!(chain.links[0].supporting_document_id, "d2");
        assert!(chain.links.iter().all(|l| l.link_kind == LinkKind::Direct));
        assert!(chain.chain_complete);
        assert_eq!(chain.stop_reason, StopReason::Terminal);
        assert_eq!(chain.terminal_category, EntityCategory::Oem);
        assert_eq!(chain.breaking_entity, None);
        assert_eq!(
            chain.render(),
            "Applied Avionics, Inc. → Aircraft Parts Logistic → Skylink"
        );
    }

    #[test]
    fn test_anchor_falls_back_to_latest_certificate() {
        let chain = build(
            &[
                sale("a", "Applied Avionics", "DSC Trading").with_date("2019-03-01"),
                sale("b", "DSC Trading", "Acme Air").with_date("2021-06-15"),
            ],
            Some("Skylink"),
        );

        assert_eq!(chain.anchor, AnchorKind::LatestCertificate);
        assert_eq!(chain.start_entity, "Acme Air");
        assert!(chain.anchor.is_fallback());
        assert!(chain.notes.iter().any(|n| n.contains("fallback anchor")));
        assert_eq!(chain.links.len(), 2);
    }

    #[test]
    fn test_anchor_first_certificate_without_dates() {
        let chain = build(&[sale("b", "DSC Trading", "Acme Air"), sale("a", "AvAir", "Zeta Air")], None);

        assert_eq!(chain.anchor, AnchorKind::FirstCertificate);
        assert_eq!(chain.anchor_document_id.as_deref(), Some("a"));
        assert!(chain.notes.iter().any(|n| n.contains("No target buyer given")));
    }

    #[test]
    fn test_hint_is_case_insensitive_substring() {
        let chain = build(
            &[sale("x", "AvAir, LLC", "SKYLINK AVIATION SERVICES")],
            Some("skylink"),
        );
        assert_eq!(chain.anchor, AnchorKind::BuyerHint);
        assert_eq!(chain.start_entity, "SKYLINK AVIATION SERVICES");
        assert!(chain.notes.is_empty());
    }

    #[test]
    fn test_missing_seller_is_noted_not_fatal() {
        let cert = CertificateRecord::new(CertificateType::Coc, "4100-01", "d9").with_buyer("Skylink");
        let chain = build(&[cert], Some("Skylink"));

        assert!(chain.notes.iter().any(|n| n.contains("Missing seller on d9")));
        assert!(chain.links.is_empty());
        assert!(chain.chain_complete);
        assert_eq!(chain.terminal_entity, "Skylink");
        assert_eq!(chain.breaking_entity.as_deref(), Some("Skylink"));
    }

    #[test]
    fn test_self_reference_is_not_a_hop() {
        let chain = build(
            &[
                sale("a", "Skylink", "Skylink"),
                sale("b", "DSC Trading", "Skylink"),
            ],
            Some("Skylink"),
        );
        assert_eq!(chain.entities(), vec!["Skylink", "DSC Trading"]);
    }

    #[test]
    fn test_declared_link_bridges_missing_certificate() {
        let chain = build(
            &[
                sale("d1", "DSC Trading", "Skylink")
                    .with_traceability_source("Purchased from Bizjet Intl per PO 5511"),
                sale("d0", "Applied Avionics", "Bizjet International"),
            ],
            Some("Skylink"),
        );

        assert_eq!(chain.links.len(), 3);
        assert_eq!(chain.links[1].link_kind, LinkKind::Declared);
        assert_eq!(chain.links[1].to_entity, "Bizjet Intl");
        assert_eq!(chain.links[1].supporting_document_id, "d1");
        assert_eq!(chain.links[2].to_entity, "Applied Avionics");
        assert_eq!(chain.declared_links().count(), 1);
    }

    #[test]
    fn test_sellerless_certificate_statement_is_used() {
        let cert = CertificateRecord::new(CertificateType::Coc, "4100-01", "d1")
            .with_buyer("Skylink")
            .with_traceability_source("Traceable to US Airways, Inc.");
        let chain = build(&[cert], Some("Skylink"));

        assert_eq!(chain.links.len(), 1);
        assert_eq!(chain.links[0].link_kind, LinkKind::Declared);
        assert_eq!(chain.terminal_category, EntityCategory::Airline121);
    }

    #[test]
    fn test_cycle_detected_and_incomplete() {
        let chain = build(
            &[
                sale("a", "Acme Air", "Skylink"),
                sale("b", "Beta Parts", "Acme Air"),
                sale("c", "Acme Air", "Beta Parts"),
            ],
            Some("Skylink"),
        );

        assert_eq!(chain.stop_reason, StopReason::CycleDetected);
        assert!(!chain.chain_complete);
        assert!(chain.notes.iter().any(|n| n.starts_with("Cycle detected")));
        assert_eq!(chain.links.len(), 2);
    }

    #[test]
    fn test_declared_cycle_terminates() {
        let chain = build(
            &[
                sale("a", "Acme Air", "Skylink").with_traceability_source("Purchased from Beta Parts"),
                CertificateRecord::new(CertificateType::Coc, "4100-01", "b")
                    .with_buyer("Beta Parts")
                    .with_traceability_source("Purchased from Acme Air"),
            ],
            Some("Skylink"),
        );

        assert_eq!(chain.stop_reason, StopReason::CycleDetected);
        assert!(!chain.chain_complete);
    }

    #[test]
    fn test_depth_bound() {
        let certs: Vec<CertificateRecord> = (0..6)
            .map(|i| sale(&format!("d{}", i), &format!("Holder {}", i + 1), &format!("Holder {}", i)))
            .collect();
        let registry = EntityRegistry::with_defaults();
        let builder = ChainBuilder::new(&registry).unwrap().with_max_hops(3);
        let chain = builder.build_chains(&certs, Some("Holder 0")).unwrap().remove(0);

        assert_eq!(chain.links.len(), 3);
        assert_eq!(chain.stop_reason, StopReason::DepthExceeded);
        assert!(!chain.chain_complete);
    }

    #[test]
    fn test_serial_number_guides_candidate_choice() {
        let chain = build(
            &[
                sale("a", "DSC Trading", "Skylink").with_serial("SN-1"),
                sale("b", "AvAir", "DSC Trading").with_serial("SN-2"),
                sale("c", "Endeavor Air", "DSC Trading").with_serial("SN-1"),
            ],
            Some("Skylink"),
        );
        assert_eq!(chain.serial_number.as_deref(), Some("SN-1"));
        assert_eq!(chain.terminal_entity, "Endeavor Air");
    }

    #[test]
    fn test_groups_by_part_number() {
        let registry = EntityRegistry::with_defaults();
        let builder = ChainBuilder::new(&registry).unwrap();
        let certs = vec![
            CertificateRecord::new(CertificateType::Coc, " b-2 ", "d").with_buyer("Skylink"),
            CertificateRecord::new(CertificateType::Coc, "B-2", "d").with_buyer("Skylink"),
            CertificateRecord::new(CertificateType::Coc, "", "d").with_buyer("Skylink"),
            CertificateRecord::new(CertificateType::Coc, "A-1", "d").with_buyer("Skylink"),
        ];

        let chains = builder.build_chains(&certs, None).unwrap();
        let parts: Vec<&str> = chains.iter().map(|c| c.part_number.as_str()).collect();
        assert_eq!(parts, vec!["A-1", "B-2", UNKNOWN_PART]);
        assert_eq!(chains[1].certificate_count, 2);
    }

    #[test]
    fn test_no_anchor() {
        let chain = build(&[CertificateRecord::new(CertificateType::Coc, "4100-01", "d")], Some("Skylink"));
        assert_eq!(chain.stop_reason, StopReason::NoAnchor);
        assert!(!chain.chain_complete);
        assert_eq!(chain.start_entity, "Unknown");
    }
}
