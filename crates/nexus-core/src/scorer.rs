//! Region-Impact Scorer
//!
//! Maps drugs to the body regions they affect and turns region overlap into
//! severity:
//!
//! - pair severity is banded on the count of shared regions
//!   (≥ 3 → 0.8, 1–2 → 0.5, 0 → 0.2)
//! - a region's aggregate severity is the max over every pair touching it
//!   (×1.3, capped at 1.0, when both drugs of the pair share it) and a flat
//!   0.3 per-drug baseline
//! - global risk is the max aggregate severity

use crate::cache::BoundedCache;
use crate::knowledge::{DrugClass, KnowledgeBase, DEFAULT_BASE_SEVERITY, DEFAULT_REGIONS};
use crate::regions::RegionKey;
use crate::resolver::DrugResolver;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Severity when the pair shares three or more regions
pub const MAJOR_OVERLAP_SEVERITY: f64 = 0.8;
/// Severity when the pair shares one or two regions
pub const MODERATE_OVERLAP_SEVERITY: f64 = 0.5;
/// Severity when the pair shares nothing
pub const MINOR_OVERLAP_SEVERITY: f64 = 0.2;
/// Shared-region count at which a pair becomes Major
pub const MAJOR_OVERLAP_COUNT: usize = 3;
/// Multiplier for regions both drugs of a pair affect
pub const OVERLAP_AMPLIFICATION: f64 = 1.3;
/// Floor severity of any region a single drug affects
pub const SINGLE_DRUG_BASELINE: f64 = 0.3;
/// Confidence of the default-region fallback
pub const FALLBACK_CONFIDENCE: f64 = 0.3;

/// Symptoms reported for an affected region with no specific entry
pub const GENERIC_SYMPTOMS: [&str; 2] = ["Potential side effects", "Monitor for changes"];

// ============================================================================
// Severity Bands
// ============================================================================

/// Categorical severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SeverityBand {
    Unknown,
    Minor,
    Moderate,
    Major,
}

impl SeverityBand {
    /// Band a numeric severity
    pub fn from_score(score: f64) -> Self {
        if score >= 0.7 {
            SeverityBand::Major
        } else if score >= 0.4 {
            SeverityBand::Moderate
        } else if score > 0.0 {
            SeverityBand::Minor
        } else {
            SeverityBand::Unknown
        }
    }

    /// Parse a catalog label, case-insensitively; anything unrecognised is Unknown
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "major" => SeverityBand::Major,
            "moderate" => SeverityBand::Moderate,
            "minor" => SeverityBand::Minor,
            _ => SeverityBand::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityBand::Unknown => "Unknown",
            SeverityBand::Minor => "Minor",
            SeverityBand::Moderate => "Moderate",
            SeverityBand::Major => "Major",
        }
    }
}

impl fmt::Display for SeverityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Which lookup tier produced a drug's regions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "tier", content = "class")]
pub enum LookupSource {
    Direct,
    Partial,
    Class(DrugClass),
    Fallback,
}

/// Regions affected by one drug, with provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionLookup {
    pub regions: Vec<RegionKey>,
    pub source: LookupSource,
    pub confidence: f64,
    pub base_severity: f64,
}

impl RegionLookup {
    pub fn region_set(&self) -> BTreeSet<RegionKey> {
        self.regions.iter().copied().collect()
    }
}

/// Severity of one drug pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairScore {
    pub severity: f64,
    pub overlap: BTreeSet<RegionKey>,
}

impl PairScore {
    pub fn band(&self) -> SeverityBand {
        SeverityBand::from_score(self.severity)
    }
}

/// Aggregate impact on one region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateEntry {
    pub severity: f64,
    /// Deduplicated, first-seen order
    pub symptoms: Vec<String>,
    /// Drugs affecting this region, first-seen order
    pub drugs: Vec<String>,
}

impl AggregateEntry {
    fn with_severity(severity: f64) -> Self {
        AggregateEntry {
            severity,
            symptoms: Vec::new(),
            drugs: Vec::new(),
        }
    }

    fn raise(&mut self, severity: f64) {
        if severity > self.severity {
            self.severity = severity;
        }
    }
}

/// Whole-list aggregation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionAggregate {
    pub per_region: BTreeMap<RegionKey, AggregateEntry>,
    pub global_risk: f64,
}

impl RegionAggregate {
    pub fn severity_of(&self, region: RegionKey) -> f64 {
        self.per_region.get(&region).map_or(0.0, |e| e.severity)
    }
}

// ============================================================================
// Scorer
// ============================================================================

/// Region-impact scorer over the static knowledge tables
pub struct RegionScorer {
    knowledge: Arc<KnowledgeBase>,
    resolver: Arc<DrugResolver>,
    pair_cache: BoundedCache<(String, String), PairScore>,
}

impl RegionScorer {
    pub fn new(knowledge: Arc<KnowledgeBase>, resolver: Arc<DrugResolver>, cache_capacity: u64) -> Self {
        RegionScorer {
            knowledge,
            resolver,
            pair_cache: BoundedCache::new(cache_capacity),
        }
    }

    /// Regions a drug affects: direct, partial, class, then default fallback
    pub fn affected_regions(&self, drug: &str) -> RegionLookup {
        let token = drug.trim().to_lowercase();

        if let Some(regions) = self.knowledge.direct_regions(&token) {
            return RegionLookup {
                regions: regions.to_vec(),
                source: LookupSource::Direct,
                confidence: 1.0,
                base_severity: DEFAULT_BASE_SEVERITY,
            };
        }

        if let Some((_, regions)) = self.knowledge.partial_regions(&token) {
            return RegionLookup {
                regions: regions.to_vec(),
                source: LookupSource::Partial,
                confidence: 1.0,
                base_severity: DEFAULT_BASE_SEVERITY,
            };
        }

        let resolution = self.resolver.resolve(&token);
        if let Some(class) = resolution.drug_class {
            let profile = class.profile();
            return RegionLookup {
                regions: profile.regions.to_vec(),
                source: LookupSource::Class(class),
                confidence: resolution.confidence,
                base_severity: profile.base_severity,
            };
        }

        RegionLookup {
            regions: DEFAULT_REGIONS.to_vec(),
            source: LookupSource::Fallback,
            confidence: FALLBACK_CONFIDENCE,
            base_severity: DEFAULT_BASE_SEVERITY,
        }
    }

    /// Symptoms of `drug` in `region`; empty if the drug does not affect it
    pub fn region_symptoms(&self, drug: &str, region: RegionKey) -> Vec<String> {
        let token = drug.trim().to_lowercase();
        if !self.affected_regions(&token).regions.contains(&region) {
            return Vec::new();
        }
        match self.knowledge.symptoms(&token, region) {
            Some(symptoms) => symptoms.iter().map(|s| s.to_string()).collect(),
            None => GENERIC_SYMPTOMS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Pair severity from the count of shared regions
    pub fn score_pair(&self, drug_a: &str, drug_b: &str) -> PairScore {
        let a = drug_a.trim().to_lowercase();
        let b = drug_b.trim().to_lowercase();
        let key = if a <= b { (a, b) } else { (b, a) };

        if let Some(hit) = self.pair_cache.get(&key) {
            return hit;
        }
        let regions_a = self.affected_regions(&key.0).region_set();
        let regions_b = self.affected_regions(&key.1).region_set();
        let score = score_overlap(&regions_a, &regions_b);
        self.pair_cache.insert(key, score.clone());
        score
    }

    /// Aggregate region impact over a drug list
    ///
    /// Duplicate tokens are collapsed before pairing.
    pub fn aggregate<S: AsRef<str>>(&self, drugs: &[S]) -> RegionAggregate {
        let drugs = dedup_tokens(drugs);
        let lookups: Vec<BTreeSet<RegionKey>> = drugs
            .iter()
            .map(|d| self.affected_regions(d).region_set())
            .collect();

        let mut per_region: BTreeMap<RegionKey, AggregateEntry> = BTreeMap::new();

        for i in 0..drugs.len() {
            for j in (i + 1)..drugs.len() {
                let pair = self.score_pair(&drugs[i], &drugs[j]);
                for &region in lookups[i].union(&lookups[j]) {
                    let severity = if pair.overlap.contains(&region) {
                        (pair.severity * OVERLAP_AMPLIFICATION).min(1.0)
                    } else {
                        pair.severity
                    };
                    per_region
                        .entry(region)
                        .and_modify(|e| e.raise(severity))
                        .or_insert_with(|| AggregateEntry::with_severity(severity));
                }
            }
        }

        for (drug, regions) in drugs.iter().zip(&lookups) {
            for &region in regions {
                let entry = per_region
                    .entry(region)
                    .or_insert_with(|| AggregateEntry::with_severity(SINGLE_DRUG_BASELINE));
                entry.raise(SINGLE_DRUG_BASELINE);
                if !entry.drugs.contains(drug) {
                    entry.drugs.push(drug.clone());
                }
                for symptom in self.region_symptoms(drug, region) {
                    if !entry.symptoms.contains(&symptom) {
                        entry.symptoms.push(symptom);
                    }
                }
            }
        }

        let global_risk = per_region.values().map(|e| e.severity).fold(0.0, f64::max);

        RegionAggregate {
            per_region,
            global_risk,
        }
    }
}

impl fmt::Debug for RegionScorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionScorer")
            .field("pair_cache", &self.pair_cache)
            .finish()
    }
}

/// Band two region sets on their intersection size
pub fn score_overlap(a: &BTreeSet<RegionKey>, b: &BTreeSet<RegionKey>) -> PairScore {
    let overlap: BTreeSet<RegionKey> = a.intersection(b).copied().collect();
    let severity = if overlap.len() >= MAJOR_OVERLAP_COUNT {
        MAJOR_OVERLAP_SEVERITY
    } else if !overlap.is_empty() {
        MODERATE_OVERLAP_SEVERITY
    } else {
        MINOR_OVERLAP_SEVERITY
    };
    PairScore { severity, overlap }
}

pub(crate) fn dedup_tokens<S: AsRef<str>>(drugs: &[S]) -> Vec<String> {
    let mut seen = Vec::with_capacity(drugs.len());
    for drug in drugs {
        let token = drug.as_ref().trim().to_lowercase();
        if !token.is_empty() && !seen.contains(&token) {
            seen.push(token);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use RegionKey::*;

    fn scorer() -> RegionScorer {
        let knowledge = Arc::new(KnowledgeBase::builtin());
        let resolver = Arc::new(DrugResolver::new(knowledge.clone(), 64));
        RegionScorer::new(knowledge, resolver, 64)
    }

    #[test]
    fn test_lookup_tiers() {
        let s = scorer();
        assert_eq!(s.affected_regions("Warfarin").source, LookupSource::Direct);
        assert_eq!(s.affected_regions("aspirin-ec").source, LookupSource::Partial);

        let class = s.affected_regions("propranolol");
        assert_eq!(class.source, LookupSource::Class(DrugClass::BetaBlocker));
        assert!((class.base_severity - 0.6).abs() < 1e-9);

        let fallback = s.affected_regions("zzyzx");
        assert_eq!(fallback.source, LookupSource::Fallback);
        assert_eq!(fallback.regions, vec![Liver, Kidneys, Stomach]);
        assert!((fallback.confidence - FALLBACK_CONFIDENCE).abs() < 1e-9);
    }

    #[test]
    fn test_warfarin_aspirin_is_major() {
        let pair = scorer().score_pair("warfarin", "aspirin");
        assert!((pair.severity - MAJOR_OVERLAP_SEVERITY).abs() < 1e-9);
        assert_eq!(pair.band(), SeverityBand::Major);
        assert_eq!(pair.overlap, [Blood, Brain, Stomach].into_iter().collect());
    }

    #[test]
    fn test_pair_bands() {
        let s = scorer();
        // ibuprofen {kidneys, stomach, liver} vs acetaminophen {liver}
        let moderate = s.score_pair("ibuprofen", "acetaminophen");
        assert!((moderate.severity - MODERATE_OVERLAP_SEVERITY).abs() < 1e-9);

        // albuterol {lungs, heart, chest_wall} vs acetaminophen {liver}
        let minor = s.score_pair("albuterol", "acetaminophen");
        assert!((minor.severity - MINOR_OVERLAP_SEVERITY).abs() < 1e-9);
        assert!(minor.overlap.is_empty());
    }

    #[test]
    fn test_region_symptoms() {
        let s = scorer();
        assert_eq!(
            s.region_symptoms("furosemide", Ears),
            vec!["Hearing loss risk".to_string(), "Tinnitus".to_string()]
        );
        assert_eq!(
            s.region_symptoms("naproxen", Stomach),
            GENERIC_SYMPTOMS.iter().map(|s| s.to_string()).collect::<Vec<_>>()
        );
        assert!(s.region_symptoms("acetaminophen", Heart).is_empty());
    }

    #[test]
    fn test_aggregate_amplifies_shared_regions() {
        let agg = scorer().aggregate(&["warfarin", "aspirin"]);
        // shared region: 0.8 * 1.3 capped at 1.0
        assert!((agg.severity_of(Blood) - 1.0).abs() < 1e-9);
        // touched by one drug only: unamplified pair score
        assert!((agg.severity_of(Liver) - 0.8).abs() < 1e-9);
        assert!((agg.global_risk - 1.0).abs() < 1e-9);

        let blood = &agg.per_region[&Blood];
        assert_eq!(blood.drugs, vec!["warfarin".to_string(), "aspirin".to_string()]);
        assert!(blood.symptoms.contains(&"Bleeding risk".to_string()));
        // duplicates merged across drugs
        assert_eq!(blood.symptoms.iter().filter(|s| *s == "Bleeding risk").count(), 1);
    }

    #[test]
    fn test_aggregate_single_drug_baseline() {
        let agg = scorer().aggregate(&["acetaminophen"]);
        assert_eq!(agg.per_region.len(), 1);
        assert!((agg.severity_of(Liver) - SINGLE_DRUG_BASELINE).abs() < 1e-9);
        assert!((agg.global_risk - SINGLE_DRUG_BASELINE).abs() < 1e-9);
    }

    #[test]
    fn test_aggregate_empty() {
        let agg = scorer().aggregate::<&str>(&[]);
        assert!(agg.per_region.is_empty());
        assert_eq!(agg.global_risk, 0.0);
    }

    #[test]
    fn test_aggregate_collapses_duplicates() {
        let s = scorer();
        assert_eq!(s.aggregate(&["aspirin", "Aspirin "]), s.aggregate(&["aspirin"]));
    }

    #[test]
    fn test_band_thresholds() {
        assert_eq!(SeverityBand::from_score(0.8), SeverityBand::Major);
        assert_eq!(SeverityBand::from_score(0.5), SeverityBand::Moderate);
        assert_eq!(SeverityBand::from_score(0.2), SeverityBand::Minor);
        assert_eq!(SeverityBand::from_score(0.0), SeverityBand::Unknown);
        assert_eq!(SeverityBand::from_label(" MAJOR"), SeverityBand::Major);
        assert_eq!(SeverityBand::from_label("severe?"), SeverityBand::Unknown);
    }

    fn drug_name() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("warfarin".to_string()),
            Just("aspirin".to_string()),
            Just("ibuprofen".to_string()),
            Just("propranolol".to_string()),
            Just("benazepril".to_string()),
            "[a-z]{3,10}",
        ]
    }

    proptest! {
        #[test]
        fn prop_score_pair_is_symmetric(a in drug_name(), b in drug_name()) {
            let s = scorer();
            prop_assert_eq!(s.score_pair(&a, &b), s.score_pair(&b, &a));
        }

        #[test]
        fn prop_aggregate_bounded(drugs in proptest::collection::vec(drug_name(), 0..5)) {
            let agg = scorer().aggregate(&drugs);
            for entry in agg.per_region.values() {
                prop_assert!(entry.severity >= SINGLE_DRUG_BASELINE && entry.severity <= 1.0);
            }
            prop_assert!(agg.global_risk <= 1.0);
        }
    }
}
