//! Static Drug Knowledge
//!
//! Read-only tables the resolver and scorer consult:
//! - drug classes with member drugs, affected regions and base severity
//! - brand → generic aliases
//! - pharmacological suffix patterns
//! - drug → region and drug → region → symptom tables
//!
//! The tables are compiled in. `KnowledgeBase::builtin()` indexes them once
//! and the result is shared read-only for the life of the process.

use crate::regions::RegionKey;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use RegionKey::*;

// ============================================================================
// Drug Classes
// ============================================================================

/// Pharmacological drug class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrugClass {
    Nsaid,
    Antibiotic,
    BetaBlocker,
    AceInhibitor,
    Arb,
    Statin,
    Ssri,
    Benzodiazepine,
    Ppi,
    Diuretic,
    CalciumBlocker,
    Anticoagulant,
    Antiplatelet,
}

/// Fixed record carried by every drug class
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassProfile {
    pub members: &'static [&'static str],
    pub regions: &'static [RegionKey],
    pub base_severity: f64,
}

impl DrugClass {
    /// All classes in table order; fuzzy-match ties resolve to the earlier class
    pub const ALL: [DrugClass; 13] = [
        DrugClass::Nsaid,
        DrugClass::Antibiotic,
        DrugClass::BetaBlocker,
        DrugClass::AceInhibitor,
        DrugClass::Arb,
        DrugClass::Statin,
        DrugClass::Ssri,
        DrugClass::Benzodiazepine,
        DrugClass::Ppi,
        DrugClass::Diuretic,
        DrugClass::CalciumBlocker,
        DrugClass::Anticoagulant,
        DrugClass::Antiplatelet,
    ];

    pub fn profile(&self) -> ClassProfile {
        match self {
            DrugClass::Nsaid => ClassProfile {
                members: &["ibuprofen", "naproxen", "diclofenac", "indomethacin", "celecoxib"],
                regions: &[Stomach, Kidneys, Liver, Heart],
                base_severity: 0.5,
            },
            DrugClass::Antibiotic => ClassProfile {
                members: &["amoxicillin", "azithromycin", "ciprofloxacin", "doxycycline", "cephalexin"],
                regions: &[Liver, Kidneys, Intestines, Stomach],
                base_severity: 0.4,
            },
            DrugClass::BetaBlocker => ClassProfile {
                members: &["metoprolol", "atenolol", "propranolol", "carvedilol"],
                regions: &[Heart, Lungs, Brain, Blood],
                base_severity: 0.6,
            },
            DrugClass::AceInhibitor => ClassProfile {
                members: &["lisinopril", "enalapril", "ramipril", "captopril"],
                regions: &[Kidneys, Heart, Blood],
                base_severity: 0.5,
            },
            DrugClass::Arb => ClassProfile {
                members: &["losartan", "valsartan", "irbesartan", "candesartan"],
                regions: &[Kidneys, Heart, Blood],
                base_severity: 0.5,
            },
            DrugClass::Statin => ClassProfile {
                members: &["atorvastatin", "simvastatin", "rosuvastatin", "pravastatin"],
                regions: &[Liver, Muscles, Arms, Legs],
                base_severity: 0.5,
            },
            DrugClass::Ssri => ClassProfile {
                members: &["sertraline", "fluoxetine", "escitalopram", "paroxetine"],
                regions: &[Brain, Liver, Stomach],
                base_severity: 0.4,
            },
            DrugClass::Benzodiazepine => ClassProfile {
                members: &["alprazolam", "diazepam", "lorazepam", "clonazepam"],
                regions: &[Brain, Liver],
                base_severity: 0.6,
            },
            DrugClass::Ppi => ClassProfile {
                members: &["omeprazole", "pantoprazole", "esomeprazole", "lansoprazole"],
                regions: &[Stomach, Liver, Intestines],
                base_severity: 0.3,
            },
            DrugClass::Diuretic => ClassProfile {
                members: &["furosemide", "hydrochlorothiazide", "spironolactone"],
                regions: &[Kidneys, Blood, Heart],
                base_severity: 0.5,
            },
            DrugClass::CalciumBlocker => ClassProfile {
                members: &["amlodipine", "diltiazem", "verapamil", "nifedipine"],
                regions: &[Heart, Liver, Legs, Feet],
                base_severity: 0.5,
            },
            DrugClass::Anticoagulant => ClassProfile {
                members: &["warfarin", "heparin", "enoxaparin", "rivaroxaban"],
                regions: &[Blood, Liver, Brain, Stomach],
                base_severity: 0.7,
            },
            DrugClass::Antiplatelet => ClassProfile {
                members: &["aspirin", "clopidogrel", "ticagrelor"],
                regions: &[Blood, Stomach, Kidneys],
                base_severity: 0.6,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DrugClass::Nsaid => "nsaid",
            DrugClass::Antibiotic => "antibiotic",
            DrugClass::BetaBlocker => "beta_blocker",
            DrugClass::AceInhibitor => "ace_inhibitor",
            DrugClass::Arb => "arb",
            DrugClass::Statin => "statin",
            DrugClass::Ssri => "ssri",
            DrugClass::Benzodiazepine => "benzodiazepine",
            DrugClass::Ppi => "ppi",
            DrugClass::Diuretic => "diuretic",
            DrugClass::CalciumBlocker => "calcium_blocker",
            DrugClass::Anticoagulant => "anticoagulant",
            DrugClass::Antiplatelet => "antiplatelet",
        }
    }

    /// Class whose member list contains `drug`
    pub fn of_member(drug: &str) -> Option<DrugClass> {
        Self::ALL
            .iter()
            .copied()
            .find(|class| class.profile().members.contains(&drug))
    }
}

// ============================================================================
// Tables
// ============================================================================

/// Brand and regional names mapped to generics
const DRUG_ALIASES: &[(&str, &str)] = &[
    // Pain relievers
    ("tylenol", "acetaminophen"),
    ("panadol", "acetaminophen"),
    ("crocin", "acetaminophen"),
    ("dolo", "acetaminophen"),
    ("advil", "ibuprofen"),
    ("motrin", "ibuprofen"),
    ("brufen", "ibuprofen"),
    ("aleve", "naproxen"),
    // Antibiotics
    ("augmentin", "amoxicillin"),
    ("zithromax", "azithromycin"),
    ("cipro", "ciprofloxacin"),
    ("monocef", "cefotaxime"),
    // Cardiovascular
    ("coumadin", "warfarin"),
    ("plavix", "clopidogrel"),
    ("norvasc", "amlodipine"),
    ("lopressor", "metoprolol"),
    ("cozaar", "losartan"),
    // Statins
    ("lipitor", "atorvastatin"),
    ("zocor", "simvastatin"),
    ("crestor", "rosuvastatin"),
    // Diabetes
    ("glucophage", "metformin"),
    // PPIs
    ("prilosec", "omeprazole"),
    ("nexium", "esomeprazole"),
    ("protonix", "pantoprazole"),
    // Psychiatric
    ("xanax", "alprazolam"),
    ("valium", "diazepam"),
    ("ativan", "lorazepam"),
    ("zoloft", "sertraline"),
    ("prozac", "fluoxetine"),
    ("lexapro", "escitalopram"),
];

/// Suffix patterns, checked in order; first match wins
const DRUG_SUFFIXES: &[(&str, DrugClass)] = &[
    ("pril", DrugClass::AceInhibitor),
    ("sartan", DrugClass::Arb),
    ("statin", DrugClass::Statin),
    ("olol", DrugClass::BetaBlocker),
    ("dipine", DrugClass::CalciumBlocker),
    ("prazole", DrugClass::Ppi),
    ("cillin", DrugClass::Antibiotic),
    ("mycin", DrugClass::Antibiotic),
    ("cycline", DrugClass::Antibiotic),
    ("floxacin", DrugClass::Antibiotic),
    ("pam", DrugClass::Benzodiazepine),
    ("lam", DrugClass::Benzodiazepine),
];

/// Drug → affected regions, in insertion order (partial matches pick the first hit)
const DRUG_REGIONS: &[(&str, &[RegionKey])] = &[
    // Antibiotics
    ("cefotaxime", &[Kidneys, Liver, Intestines]),
    ("erythromycin", &[Liver, Stomach, Intestines, Heart]),
    ("azithromycin", &[Heart, Liver, Stomach, Intestines]),
    ("amoxicillin", &[Kidneys, Liver, Stomach, Intestines]),
    ("ciprofloxacin", &[Kidneys, Tendons, Legs, Arms]),
    ("doxycycline", &[Stomach, Liver, Teeth]),
    // Pain & anti-inflammatory
    ("aspirin", &[Blood, Stomach, Kidneys, Brain]),
    ("ibuprofen", &[Kidneys, Stomach, Liver]),
    ("naproxen", &[Stomach, Kidneys, Liver]),
    ("acetaminophen", &[Liver]),
    ("paracetamol", &[Liver]),
    ("tramadol", &[Brain, Liver, Stomach]),
    ("morphine", &[Brain, Intestines, Stomach]),
    // Cardiovascular
    ("warfarin", &[Blood, Liver, Brain, Stomach]),
    ("clopidogrel", &[Blood, Liver, Stomach]),
    ("lisinopril", &[Kidneys, Heart, Blood]),
    ("losartan", &[Kidneys, Heart, Blood]),
    ("amlodipine", &[Heart, Liver, Legs, Feet]),
    ("metoprolol", &[Heart, Lungs, Brain]),
    ("atenolol", &[Heart, Lungs, Hands, Feet]),
    ("diltiazem", &[Heart, Liver]),
    // Cholesterol
    ("simvastatin", &[Liver, Muscles, Arms, Legs]),
    ("atorvastatin", &[Liver, Muscles, Arms, Legs]),
    ("rosuvastatin", &[Liver, Muscles, Kidneys]),
    // Diabetes
    ("metformin", &[Kidneys, Liver, Intestines, Stomach]),
    ("glipizide", &[Liver, Pancreas]),
    ("insulin", &[Blood, Liver, Muscles]),
    // Respiratory
    ("albuterol", &[Lungs, Heart, ChestWall]),
    ("montelukast", &[Lungs, Brain, ChestWall]),
    ("fluticasone", &[Lungs, Throat, ChestWall]),
    ("budesonide", &[Lungs, Throat]),
    // Gastrointestinal
    ("omeprazole", &[Stomach, Liver, Intestines]),
    ("pantoprazole", &[Stomach, Liver]),
    ("ranitidine", &[Stomach, Kidneys]),
    ("metoclopramide", &[Brain, Stomach, Intestines]),
    // Neurological / psychiatric
    ("gabapentin", &[Brain, Kidneys, Eyes]),
    ("pregabalin", &[Brain, Kidneys, Eyes]),
    ("sertraline", &[Brain, Liver, Stomach]),
    ("fluoxetine", &[Brain, Liver, Stomach]),
    ("escitalopram", &[Brain, Liver]),
    ("alprazolam", &[Brain, Liver]),
    ("clonazepam", &[Brain, Liver]),
    ("diazepam", &[Brain, Liver, Muscles]),
    ("amitriptyline", &[Brain, Heart, Eyes, Mouth]),
    // Thyroid
    ("levothyroxine", &[Thyroid, Heart, Brain]),
    ("methimazole", &[Thyroid, Liver, Blood]),
    // Diuretics
    ("furosemide", &[Kidneys, Blood, Ears]),
    ("hydrochlorothiazide", &[Kidneys, Blood]),
    ("spironolactone", &[Kidneys, Blood, Breasts]),
    // Steroids
    ("prednisone", &[ImmuneSystem, Bones, Stomach, Eyes]),
    ("prednisolone", &[ImmuneSystem, Bones, Stomach, Eyes]),
    ("dexamethasone", &[ImmuneSystem, Bones, Brain]),
    // Anticoagulants
    ("heparin", &[Blood, Liver]),
    ("enoxaparin", &[Blood, Kidneys]),
    // Others
    ("allopurinol", &[Liver, Kidneys, Joints, Feet]),
    ("colchicine", &[Intestines, Liver, Kidneys]),
];

type SymptomRow = (&'static str, &'static [(RegionKey, &'static [&'static str])]);

/// Drug → region → symptoms
const DRUG_SYMPTOMS: &[SymptomRow] = &[
    ("cefotaxime", &[
        (Kidneys, &["Kidney strain", "Reduced urine output"]),
        (Liver, &["Elevated liver enzymes", "Mild jaundice risk"]),
        (Intestines, &["Diarrhea", "Cramping"]),
    ]),
    ("erythromycin", &[
        (Liver, &["Liver enzyme elevation", "Hepatotoxicity risk"]),
        (Stomach, &["Nausea", "Vomiting", "Abdominal pain"]),
        (Intestines, &["Diarrhea", "Cramping"]),
        (Heart, &["QT prolongation", "Arrhythmia risk"]),
    ]),
    ("azithromycin", &[
        (Heart, &["Irregular heartbeat", "Palpitations"]),
        (Liver, &["Liver stress", "Enzyme elevation"]),
        (Stomach, &["Nausea", "Stomach pain"]),
        (Intestines, &["Diarrhea"]),
    ]),
    ("amoxicillin", &[
        (Kidneys, &["Kidney stress"]),
        (Liver, &["Rare liver issues"]),
        (Stomach, &["Nausea", "Upset stomach"]),
        (Intestines, &["Diarrhea", "Yeast infection risk"]),
    ]),
    ("ciprofloxacin", &[
        (Kidneys, &["Kidney damage risk"]),
        (Tendons, &["Tendon rupture risk", "Tendonitis"]),
        (Legs, &["Leg pain", "Weakness"]),
        (Arms, &["Arm pain", "Tendon inflammation"]),
    ]),
    ("aspirin", &[
        (Blood, &["Bleeding risk", "Thinning"]),
        (Stomach, &["Gastric bleeding", "Ulcer risk", "Heartburn"]),
        (Kidneys, &["Kidney damage", "Reduced function"]),
        (Brain, &["Stroke prevention (benefit)", "Bleeding risk"]),
    ]),
    ("ibuprofen", &[
        (Kidneys, &["Kidney damage", "Fluid retention"]),
        (Stomach, &["Stomach ulcers", "Bleeding", "Nausea"]),
        (Liver, &["Elevated enzymes", "Hepatotoxicity"]),
    ]),
    ("acetaminophen", &[
        (Liver, &["Liver damage", "Hepatotoxicity", "Overdose risk"]),
    ]),
    ("paracetamol", &[
        (Liver, &["Liver damage", "Hepatotoxicity", "Overdose risk"]),
    ]),
    ("tramadol", &[
        (Brain, &["Dizziness", "Drowsiness", "Confusion", "Seizure risk"]),
        (Liver, &["Liver metabolism stress"]),
        (Stomach, &["Nausea", "Vomiting", "Constipation"]),
    ]),
    ("warfarin", &[
        (Blood, &["Bleeding risk", "Clotting prevention"]),
        (Liver, &["Liver metabolism"]),
        (Brain, &["Stroke prevention", "Bleeding risk"]),
        (Stomach, &["Gastrointestinal bleeding risk"]),
    ]),
    ("lisinopril", &[
        (Kidneys, &["Kidney function changes", "Potassium retention"]),
        (Heart, &["Blood pressure reduction", "Heart protection"]),
        (Blood, &["Electrolyte imbalance"]),
    ]),
    ("amlodipine", &[
        (Heart, &["Heart rate reduction", "Blood pressure lowering"]),
        (Liver, &["Liver metabolism"]),
        (Legs, &["Swelling", "Edema"]),
        (Feet, &["Ankle swelling"]),
    ]),
    ("metoprolol", &[
        (Heart, &["Slowed heart rate", "Blood pressure reduction"]),
        (Lungs, &["Breathing difficulty", "Bronchospasm risk"]),
        (Brain, &["Dizziness", "Fatigue"]),
    ]),
    ("simvastatin", &[
        (Liver, &["Liver enzyme elevation", "Hepatotoxicity"]),
        (Muscles, &["Muscle pain", "Myopathy", "Rhabdomyolysis risk"]),
        (Arms, &["Muscle weakness", "Pain"]),
        (Legs, &["Muscle cramps", "Weakness"]),
    ]),
    ("atorvastatin", &[
        (Liver, &["Liver stress", "Enzyme changes"]),
        (Muscles, &["Muscle pain", "Weakness"]),
        (Arms, &["Muscle aches"]),
        (Legs, &["Muscle cramps"]),
    ]),
    ("metformin", &[
        (Kidneys, &["Kidney stress", "Lactic acidosis risk"]),
        (Liver, &["Liver metabolism"]),
        (Intestines, &["Diarrhea", "Gas"]),
        (Stomach, &["Nausea", "Upset stomach", "Loss of appetite"]),
    ]),
    ("insulin", &[
        (Blood, &["Low blood sugar risk", "Hypoglycemia"]),
        (Liver, &["Glucose regulation"]),
        (Muscles, &["Glucose uptake"]),
    ]),
    ("albuterol", &[
        (Lungs, &["Bronchodilation (benefit)", "Tremors"]),
        (Heart, &["Rapid heartbeat", "Palpitations"]),
        (ChestWall, &["Chest tightness relief"]),
    ]),
    ("montelukast", &[
        (Lungs, &["Asthma control", "Breathing improvement"]),
        (Brain, &["Mood changes", "Sleep disturbances"]),
        (ChestWall, &["Reduced inflammation"]),
    ]),
    ("omeprazole", &[
        (Stomach, &["Acid reduction", "Ulcer healing"]),
        (Liver, &["Liver metabolism"]),
        (Intestines, &["Diarrhea", "Constipation"]),
    ]),
    ("gabapentin", &[
        (Brain, &["Dizziness", "Drowsiness", "Mood changes"]),
        (Kidneys, &["Kidney excretion"]),
        (Eyes, &["Blurred vision", "Double vision"]),
    ]),
    ("sertraline", &[
        (Brain, &["Mood improvement", "Anxiety reduction", "Sleep changes"]),
        (Liver, &["Liver metabolism"]),
        (Stomach, &["Nausea", "Appetite changes"]),
    ]),
    ("alprazolam", &[
        (Brain, &["Drowsiness", "Memory impairment", "Dependence risk"]),
        (Liver, &["Liver metabolism"]),
    ]),
    ("furosemide", &[
        (Kidneys, &["Increased urination", "Electrolyte loss"]),
        (Blood, &["Dehydration risk", "Low potassium"]),
        (Ears, &["Hearing loss risk", "Tinnitus"]),
    ]),
];

/// Regions assumed for a drug nothing else recognises
pub const DEFAULT_REGIONS: &[RegionKey] = &[Liver, Kidneys, Stomach];

/// Base severity for table-driven and fallback lookups
pub const DEFAULT_BASE_SEVERITY: f64 = 0.4;

// ============================================================================
// Knowledge Base
// ============================================================================

/// A drug the knowledge base can name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalDrug {
    /// Lowercase canonical token
    pub name: String,
    /// Brand/alternate names mapping to this drug
    pub aliases: BTreeSet<String>,
    pub drug_class: Option<DrugClass>,
    /// Ordered, duplicate-free
    pub affected_regions: Vec<RegionKey>,
    /// In [0, 1]
    pub base_severity: f64,
}

/// Indexed, immutable view over the static tables
#[derive(Debug)]
pub struct KnowledgeBase {
    drugs: BTreeMap<String, CanonicalDrug>,
    aliases: HashMap<&'static str, &'static str>,
    region_index: HashMap<&'static str, usize>,
    symptom_index: HashMap<&'static str, usize>,
}

impl KnowledgeBase {
    /// Index the compiled-in tables
    pub fn builtin() -> Self {
        let aliases: HashMap<&'static str, &'static str> = DRUG_ALIASES.iter().copied().collect();
        let region_index = DRUG_REGIONS
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (*name, i))
            .collect();
        let symptom_index = DRUG_SYMPTOMS
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (*name, i))
            .collect();

        let mut names: BTreeSet<&'static str> = DRUG_REGIONS.iter().map(|(name, _)| *name).collect();
        names.extend(aliases.values().copied());
        for class in DrugClass::ALL {
            names.extend(class.profile().members.iter().copied());
        }

        let mut drugs = BTreeMap::new();
        for name in names {
            let drug_class = DrugClass::of_member(name);
            let affected_regions: Vec<RegionKey> = match DRUG_REGIONS.iter().find(|(n, _)| *n == name) {
                Some((_, regions)) => regions.to_vec(),
                None => drug_class.map(|c| c.profile().regions.to_vec()).unwrap_or_default(),
            };
            let base_severity = drug_class
                .map(|c| c.profile().base_severity)
                .unwrap_or(DEFAULT_BASE_SEVERITY);
            let drug_aliases = DRUG_ALIASES
                .iter()
                .filter(|(_, generic)| *generic == name)
                .map(|(brand, _)| brand.to_string())
                .collect();

            drugs.insert(
                name.to_string(),
                CanonicalDrug {
                    name: name.to_string(),
                    aliases: drug_aliases,
                    drug_class,
                    affected_regions,
                    base_severity,
                },
            );
        }

        log::debug!(
            "Knowledge base indexed: {} canonical drugs, {} aliases, {} classes",
            drugs.len(),
            aliases.len(),
            DrugClass::ALL.len()
        );

        KnowledgeBase {
            drugs,
            aliases,
            region_index,
            symptom_index,
        }
    }

    /// Generic name for a brand alias
    pub fn alias_target(&self, token: &str) -> Option<&'static str> {
        self.aliases.get(token).copied()
    }

    /// Canonical drug record, if `token` is already canonical
    pub fn canonical(&self, token: &str) -> Option<&CanonicalDrug> {
        self.drugs.get(token)
    }

    pub fn is_canonical(&self, token: &str) -> bool {
        self.drugs.contains_key(token)
    }

    /// Iterate all canonical drugs in name order
    pub fn drugs(&self) -> impl Iterator<Item = &CanonicalDrug> {
        self.drugs.values()
    }

    /// First suffix pattern `token` ends with
    pub fn suffix_class(&self, token: &str) -> Option<(&'static str, DrugClass)> {
        DRUG_SUFFIXES
            .iter()
            .copied()
            .find(|(suffix, _)| token.ends_with(suffix))
    }

    /// Exact region-table hit
    pub fn direct_regions(&self, token: &str) -> Option<&'static [RegionKey]> {
        self.region_index.get(token).map(|&i| DRUG_REGIONS[i].1)
    }

    /// First region-table entry whose key contains, or is contained by, `token`
    pub fn partial_regions(&self, token: &str) -> Option<(&'static str, &'static [RegionKey])> {
        if token.is_empty() {
            return None;
        }
        DRUG_REGIONS
            .iter()
            .copied()
            .find(|(known, _)| known.contains(token) || token.contains(known))
    }

    /// Specific symptoms for a drug/region, by exact then partial key match
    pub fn symptoms(&self, token: &str, region: RegionKey) -> Option<&'static [&'static str]> {
        if let Some(&i) = self.symptom_index.get(token) {
            if let Some(found) = lookup_region(DRUG_SYMPTOMS[i].1, region) {
                return Some(found);
            }
        }
        if token.is_empty() {
            return None;
        }
        DRUG_SYMPTOMS
            .iter()
            .filter(|(known, _)| known.contains(token) || token.contains(known))
            .find_map(|(_, rows)| lookup_region(rows, region))
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::builtin()
    }
}

fn lookup_region(
    rows: &'static [(RegionKey, &'static [&'static str])],
    region: RegionKey,
) -> Option<&'static [&'static str]> {
    rows.iter().find(|(r, _)| *r == region).map(|(_, s)| *s)
}
