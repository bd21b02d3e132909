//! Risk assessment assembly
//!
//! Combines pair scores and the region aggregate into the per-request
//! [`RiskAssessment`], then applies the fixed threshold rules for side-effect
//! spread, alternatives and the urgent advisory.

use crate::regions::RegionKey;
use crate::scorer::{dedup_tokens, AggregateEntry, RegionScorer, SeverityBand};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A region's aggregate must exceed this to spread
pub const SPREAD_THRESHOLD: f64 = 0.6;
/// Global risk above which alternatives are suggested
pub const ALTERNATIVES_THRESHOLD: f64 = 0.7;
/// Global risk above which the urgent advisory is attached
pub const ADVISORY_THRESHOLD: f64 = 0.8;

pub const URGENT_ADVISORY: &str =
    "High-risk interaction detected. Immediate medical consultation recommended.";

/// Regions a high-severity region is expected to spread to
const SPREAD_RULES: &[(RegionKey, &[RegionKey])] = &[
    (RegionKey::Liver, &[RegionKey::KidneyLeft, RegionKey::KidneyRight, RegionKey::Stomach]),
    (RegionKey::Stomach, &[RegionKey::Liver, RegionKey::Intestines]),
    (RegionKey::Heart, &[RegionKey::Lungs, RegionKey::Brain, RegionKey::ChestWall]),
];

const ALTERNATIVES: &[(&str, &str)] = &[
    ("Clopidogrel", "Lower GI bleed risk"),
    ("Acetaminophen", "Lower interaction potential"),
];

/// One scored drug pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairwiseInteraction {
    pub drug_a: String,
    pub drug_b: String,
    pub severity: f64,
    pub band: SeverityBand,
    pub overlap: Vec<RegionKey>,
    pub mechanism: String,
}

/// Suggested substitute medication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alternative {
    pub drug: String,
    pub reason: String,
}

/// Everything computed for one checked drug list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub drugs: Vec<String>,
    /// Every pair, Minor included
    pub interactions: Vec<PairwiseInteraction>,
    pub region_impacts: BTreeMap<RegionKey, AggregateEntry>,
    pub global_risk: f64,
    pub side_effect_spread: BTreeMap<RegionKey, Vec<RegionKey>>,
    pub alternatives: Vec<Alternative>,
    pub advisory: Option<String>,
}

/// Payload appended to the audit ledger for each assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub drugs: Vec<String>,
    pub interaction_count: usize,
    pub global_risk: f64,
}

impl RiskAssessment {
    /// Score every pair and aggregate regions for a list of canonical tokens
    pub fn assess<S: AsRef<str>>(scorer: &RegionScorer, drugs: &[S]) -> Self {
        let drugs = dedup_tokens(drugs);

        let mut interactions = Vec::new();
        for i in 0..drugs.len() {
            for j in (i + 1)..drugs.len() {
                let pair = scorer.score_pair(&drugs[i], &drugs[j]);
                let overlap: Vec<RegionKey> = pair.overlap.iter().copied().collect();
                interactions.push(PairwiseInteraction {
                    drug_a: drugs[i].clone(),
                    drug_b: drugs[j].clone(),
                    severity: pair.severity,
                    band: pair.band(),
                    mechanism: mechanism_text(&overlap),
                    overlap,
                });
            }
        }

        let aggregate = scorer.aggregate(&drugs);
        let global_risk = aggregate.global_risk;

        let side_effect_spread = SPREAD_RULES
            .iter()
            .filter(|(region, _)| aggregate.severity_of(*region) > SPREAD_THRESHOLD)
            .map(|(region, targets)| (*region, targets.to_vec()))
            .collect();

        let alternatives = if global_risk > ALTERNATIVES_THRESHOLD {
            ALTERNATIVES
                .iter()
                .map(|(drug, reason)| Alternative {
                    drug: drug.to_string(),
                    reason: reason.to_string(),
                })
                .collect()
        } else {
            Vec::new()
        };

        let advisory = (global_risk > ADVISORY_THRESHOLD).then(|| URGENT_ADVISORY.to_string());

        RiskAssessment {
            drugs,
            interactions,
            region_impacts: aggregate.per_region,
            global_risk,
            side_effect_spread,
            alternatives,
            advisory,
        }
    }

    /// Highest pairwise band, Unknown when fewer than two drugs
    pub fn max_band(&self) -> SeverityBand {
        self.interactions
            .iter()
            .map(|i| i.band)
            .max()
            .unwrap_or(SeverityBand::Unknown)
    }

    pub fn ledger_summary(&self) -> LedgerSummary {
        LedgerSummary {
            drugs: self.drugs.clone(),
            interaction_count: self.interactions.len(),
            global_risk: self.global_risk,
        }
    }
}

/// Sentence naming up to three shared regions
pub fn mechanism_text(overlap: &[RegionKey]) -> String {
    let affected = if overlap.is_empty() {
        "different systems".to_string()
    } else {
        overlap
            .iter()
            .take(3)
            .map(|r| r.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!("Both medications affect: {}. Consult healthcare provider.", affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::KnowledgeBase;
    use crate::resolver::DrugResolver;
    use std::sync::Arc;

    fn scorer() -> RegionScorer {
        let knowledge = Arc::new(KnowledgeBase::builtin());
        let resolver = Arc::new(DrugResolver::new(knowledge.clone(), 64));
        RegionScorer::new(knowledge, resolver, 64)
    }

    #[test]
    fn test_warfarin_aspirin_ibuprofen() {
        let assessment = RiskAssessment::assess(&scorer(), &["warfarin", "aspirin", "ibuprofen"]);

        assert_eq!(assessment.interactions.len(), 3);
        assert_eq!(assessment.max_band(), SeverityBand::Major);
        assert!(assessment.region_impacts.contains_key(&RegionKey::Liver));
        assert!(assessment.region_impacts.contains_key(&RegionKey::Stomach));
        assert!(assessment.global_risk >= 0.5);

        assert!(assessment.side_effect_spread.contains_key(&RegionKey::Liver));
        assert!(assessment.side_effect_spread.contains_key(&RegionKey::Stomach));
        assert_eq!(assessment.alternatives.len(), 2);
        assert_eq!(assessment.advisory.as_deref(), Some(URGENT_ADVISORY));
    }

    #[test]
    fn test_minor_pairs_are_reported() {
        let assessment = RiskAssessment::assess(&scorer(), &["albuterol", "acetaminophen"]);
        assert_eq!(assessment.interactions.len(), 1);

        let pair = &assessment.interactions[0];
        assert_eq!(pair.band, SeverityBand::Minor);
        assert_eq!(
            pair.mechanism,
            "Both medications affect: different systems. Consult healthcare provider."
        );
        assert!(assessment.alternatives.is_empty());
        assert!(assessment.advisory.is_none());
    }

    #[test]
    fn test_mechanism_names_at_most_three_regions() {
        let text = mechanism_text(&[
            RegionKey::Stomach,
            RegionKey::Liver,
            RegionKey::Blood,
            RegionKey::Brain,
        ]);
        assert_eq!(
            text,
            "Both medications affect: stomach, liver, blood. Consult healthcare provider."
        );
    }

    #[test]
    fn test_single_drug_has_no_interactions() {
        let assessment = RiskAssessment::assess(&scorer(), &["metformin"]);
        assert!(assessment.interactions.is_empty());
        assert_eq!(assessment.max_band(), SeverityBand::Unknown);
        assert!((assessment.global_risk - 0.3).abs() < 1e-9);
        assert!(assessment.side_effect_spread.is_empty());
    }

    #[test]
    fn test_ledger_summary() {
        let assessment = RiskAssessment::assess(&scorer(), &["warfarin", "aspirin"]);
        let summary = assessment.ledger_summary();
        assert_eq!(summary.drugs, vec!["warfarin", "aspirin"]);
        assert_eq!(summary.interaction_count, 1);
        assert_eq!(summary.global_risk, assessment.global_risk);
    }
}
