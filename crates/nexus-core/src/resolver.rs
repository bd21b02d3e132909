//! Drug Identity Resolver
//!
//! Normalizes a free-text medication name and resolves it to a canonical drug
//! token. Resolution never fails: unrecognised input passes through as its
//! normalized form with confidence 0.0.
//!
//! Lookup order:
//! 1. Brand alias (confidence 1.0)
//! 2. Already-canonical token (confidence 1.0)
//! 3. Pharmacological suffix (confidence 0.9)
//! 4. Fuzzy match against class members (confidence = similarity, ≥ 0.6)
//! 5. Unknown passthrough (confidence 0.0)

use crate::cache::BoundedCache;
use crate::knowledge::{DrugClass, KnowledgeBase};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Confidence assigned to suffix-pattern matches
pub const SUFFIX_CONFIDENCE: f64 = 0.9;

/// Minimum similarity for a fuzzy candidate to be considered
pub const FUZZY_CUTOFF: f64 = 0.6;

static DOSAGE_WITH_UNIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\d+\s*(mg|mcg|g|ml).*$").expect("dosage pattern compiles"));

static TRAILING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\d+$").expect("trailing number pattern compiles"));

/// Which resolution tier produced the canonical token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    Alias,
    Suffix,
    Fuzzy,
    Direct,
    Unknown,
}

/// Result of resolving one free-text name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    /// Input after lowercasing and dosage stripping
    pub normalized: String,
    /// Canonical drug token
    pub canonical: String,
    /// In [0, 1]
    pub confidence: f64,
    pub source: MatchSource,
    pub drug_class: Option<DrugClass>,
}

impl Resolution {
    pub fn is_known(&self) -> bool {
        self.source != MatchSource::Unknown
    }
}

/// Lowercase, trim and strip trailing dosage text
///
/// Applied until the string stops changing, so the result is a fixed point:
/// `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(raw: &str) -> String {
    let mut current = raw.trim().to_lowercase();
    loop {
        let stripped = DOSAGE_WITH_UNIT.replace(&current, "");
        let stripped = TRAILING_NUMBER.replace(&stripped, "");
        let next = stripped.trim().to_lowercase();
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Resolves free-text names against the knowledge base
pub struct DrugResolver {
    knowledge: Arc<KnowledgeBase>,
    cache: BoundedCache<String, Resolution>,
}

impl DrugResolver {
    pub fn new(knowledge: Arc<KnowledgeBase>, cache_capacity: u64) -> Self {
        DrugResolver {
            knowledge,
            cache: BoundedCache::new(cache_capacity),
        }
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    /// Resolve a raw name to its canonical token
    pub fn resolve(&self, raw: &str) -> Resolution {
        let normalized = normalize(raw);
        if let Some(hit) = self.cache.get(&normalized) {
            return hit;
        }
        let resolution = self.resolve_normalized(normalized.clone());
        self.cache.insert(normalized, resolution.clone());
        resolution
    }

    /// Resolve many names, preserving order
    pub fn resolve_all<S: AsRef<str>>(&self, raw: &[S]) -> Vec<Resolution> {
        raw.iter().map(|name| self.resolve(name.as_ref())).collect()
    }

    /// Canonical token only
    pub fn canonical(&self, raw: &str) -> String {
        self.resolve(raw).canonical
    }

    fn resolve_normalized(&self, normalized: String) -> Resolution {
        let kb = &self.knowledge;

        if let Some(generic) = kb.alias_target(&normalized) {
            return Resolution {
                canonical: generic.to_string(),
                confidence: 1.0,
                source: MatchSource::Alias,
                drug_class: DrugClass::of_member(generic),
                normalized,
            };
        }

        if kb.is_canonical(&normalized) {
            return Resolution {
                canonical: normalized.clone(),
                confidence: 1.0,
                source: MatchSource::Direct,
                drug_class: DrugClass::of_member(&normalized),
                normalized,
            };
        }

        if let Some((_, class)) = kb.suffix_class(&normalized) {
            return Resolution {
                canonical: normalized.clone(),
                confidence: SUFFIX_CONFIDENCE,
                source: MatchSource::Suffix,
                drug_class: Some(class),
                normalized,
            };
        }

        if let Some((member, class, score)) = fuzzy_match(&normalized) {
            return Resolution {
                canonical: member.to_string(),
                confidence: score,
                source: MatchSource::Fuzzy,
                drug_class: Some(class),
                normalized,
            };
        }

        Resolution {
            canonical: normalized.clone(),
            confidence: 0.0,
            source: MatchSource::Unknown,
            drug_class: None,
            normalized,
        }
    }
}

impl std::fmt::Debug for DrugResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrugResolver")
            .field("cache", &self.cache)
            .finish()
    }
}

/// Best class member by normalized Levenshtein similarity
///
/// Strictly-greater comparison keeps the earliest class on ties.
fn fuzzy_match(token: &str) -> Option<(&'static str, DrugClass, f64)> {
    if token.is_empty() {
        return None;
    }
    let mut best: Option<(&'static str, DrugClass, f64)> = None;
    for class in DrugClass::ALL {
        for &member in class.profile().members {
            let score = strsim::normalized_levenshtein(token, member);
            if score < FUZZY_CUTOFF {
                continue;
            }
            if best.map_or(true, |(_, _, top)| score > top) {
                best = Some((member, class, score));
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn resolver() -> DrugResolver {
        DrugResolver::new(Arc::new(KnowledgeBase::builtin()), 64)
    }

    #[test]
    fn test_normalize_strips_dosage() {
        assert_eq!(normalize("Dolo 650 mg"), "dolo");
        assert_eq!(normalize("Dolo 650"), "dolo");
        assert_eq!(normalize("  Amoxicillin 500mg tablets "), "amoxicillin");
        assert_eq!(normalize("Aspirin"), "aspirin");
    }

    #[test]
    fn test_dolo_resolves_through_alias() {
        let r = resolver().resolve("Dolo 650 mg");
        assert_eq!(r.normalized, "dolo");
        assert_eq!(r.canonical, "acetaminophen");
        assert_eq!(r.source, MatchSource::Alias);
        assert!((r.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_direct_match() {
        let r = resolver().resolve("Warfarin");
        assert_eq!(r.canonical, "warfarin");
        assert_eq!(r.source, MatchSource::Direct);
        assert_eq!(r.drug_class, Some(DrugClass::Anticoagulant));
    }

    #[test]
    fn test_suffix_match() {
        let r = resolver().resolve("benazepril");
        assert_eq!(r.canonical, "benazepril");
        assert_eq!(r.source, MatchSource::Suffix);
        assert_eq!(r.drug_class, Some(DrugClass::AceInhibitor));
        assert!((r.confidence - SUFFIX_CONFIDENCE).abs() < 1e-9);
    }

    #[test]
    fn test_fuzzy_match_misspelling() {
        let r = resolver().resolve("ibuprofin");
        assert_eq!(r.source, MatchSource::Fuzzy);
        assert_eq!(r.canonical, "ibuprofen");
        assert_eq!(r.drug_class, Some(DrugClass::Nsaid));
        assert!(r.confidence >= FUZZY_CUTOFF && r.confidence < 1.0);
    }

    #[test]
    fn test_unknown_passthrough() {
        let r = resolver().resolve("Zzyzx 10");
        assert_eq!(r.canonical, "zzyzx");
        assert_eq!(r.source, MatchSource::Unknown);
        assert_eq!(r.confidence, 0.0);
        assert!(!r.is_known());
    }

    #[test]
    fn test_empty_input_is_unknown() {
        let r = resolver().resolve("   ");
        assert_eq!(r.canonical, "");
        assert_eq!(r.source, MatchSource::Unknown);
    }

    #[test]
    fn test_cache_returns_same_resolution() {
        let resolver = resolver();
        let first = resolver.resolve("Advil 200mg");
        let second = resolver.resolve("advil");
        assert_eq!(first, second);
        assert_eq!(first.canonical, "ibuprofen");
    }

    proptest! {
        #[test]
        fn prop_resolution_is_idempotent(name in "[A-Za-z]{1,12}( [0-9]{1,4}( ?(mg|ml|mcg))?)?") {
            let resolver = resolver();
            let first = resolver.resolve(&name);
            let second = resolver.resolve(&first.canonical);
            prop_assert_eq!(&second.canonical, &first.canonical);
            prop_assert!(second.confidence >= first.confidence);
        }

        #[test]
        fn prop_normalize_is_fixed_point(name in "\\PC{0,24}") {
            let once = normalize(&name);
            prop_assert_eq!(normalize(&once), once);
        }
    }
}
