//! Body Regions
//!
//! The closed vocabulary of body regions used as the unit of impact
//! aggregation. Every region referenced by the knowledge tables, the scorer
//! and the assessment output is a `RegionKey`, so the closed-set invariant
//! holds by construction.
//!
//! The set has two layers:
//! - 29 anatomical regions rendered by body-map consumers (`kidney_left`,
//!   `leg_right`, ...)
//! - organ-level and systemic regions the knowledge tables speak in
//!   (`kidneys`, `blood`, `muscles`, ...)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Grouping of regions for display and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionCategory {
    HeadSensory,
    Torso,
    Limbs,
    Abdomen,
    Reproductive,
    /// Whole-body systems (blood, musculoskeletal, immune)
    Systemic,
}

/// A body region identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionKey {
    // Head & sensory
    Head,
    Brain,
    Eyes,
    Ears,
    Neck,
    Throat,
    Mouth,
    Teeth,
    Thyroid,
    // Torso
    ChestWall,
    Heart,
    Lungs,
    UpperBack,
    LowerBack,
    Breasts,
    // Limbs
    Shoulders,
    ArmLeft,
    ArmRight,
    HandLeft,
    HandRight,
    LegLeft,
    LegRight,
    FootLeft,
    FootRight,
    Arms,
    Legs,
    Hands,
    Feet,
    // Abdomen
    Abdomen,
    Stomach,
    Liver,
    KidneyLeft,
    KidneyRight,
    Kidneys,
    Intestines,
    Pancreas,
    Pelvis,
    // Reproductive
    Uterus,
    OvaryLeft,
    OvaryRight,
    // Systemic
    Blood,
    Muscles,
    Bones,
    Joints,
    Tendons,
    ImmuneSystem,
}

impl RegionKey {
    /// Every member of the closed set, in declaration order
    pub const ALL: [RegionKey; 46] = [
        RegionKey::Head,
        RegionKey::Brain,
        RegionKey::Eyes,
        RegionKey::Ears,
        RegionKey::Neck,
        RegionKey::Throat,
        RegionKey::Mouth,
        RegionKey::Teeth,
        RegionKey::Thyroid,
        RegionKey::ChestWall,
        RegionKey::Heart,
        RegionKey::Lungs,
        RegionKey::UpperBack,
        RegionKey::LowerBack,
        RegionKey::Breasts,
        RegionKey::Shoulders,
        RegionKey::ArmLeft,
        RegionKey::ArmRight,
        RegionKey::HandLeft,
        RegionKey::HandRight,
        RegionKey::LegLeft,
        RegionKey::LegRight,
        RegionKey::FootLeft,
        RegionKey::FootRight,
        RegionKey::Arms,
        RegionKey::Legs,
        RegionKey::Hands,
        RegionKey::Feet,
        RegionKey::Abdomen,
        RegionKey::Stomach,
        RegionKey::Liver,
        RegionKey::KidneyLeft,
        RegionKey::KidneyRight,
        RegionKey::Kidneys,
        RegionKey::Intestines,
        RegionKey::Pancreas,
        RegionKey::Pelvis,
        RegionKey::Uterus,
        RegionKey::OvaryLeft,
        RegionKey::OvaryRight,
        RegionKey::Blood,
        RegionKey::Muscles,
        RegionKey::Bones,
        RegionKey::Joints,
        RegionKey::Tendons,
        RegionKey::ImmuneSystem,
    ];

    /// Snake-case identifier, identical to the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            RegionKey::Head => "head",
            RegionKey::Brain => "brain",
            RegionKey::Eyes => "eyes",
            RegionKey::Ears => "ears",
            RegionKey::Neck => "neck",
            RegionKey::Throat => "throat",
            RegionKey::Mouth => "mouth",
            RegionKey::Teeth => "teeth",
            RegionKey::Thyroid => "thyroid",
            RegionKey::ChestWall => "chest_wall",
            RegionKey::Heart => "heart",
            RegionKey::Lungs => "lungs",
            RegionKey::UpperBack => "upper_back",
            RegionKey::LowerBack => "lower_back",
            RegionKey::Breasts => "breasts",
            RegionKey::Shoulders => "shoulders",
            RegionKey::ArmLeft => "arm_left",
            RegionKey::ArmRight => "arm_right",
            RegionKey::HandLeft => "hand_left",
            RegionKey::HandRight => "hand_right",
            RegionKey::LegLeft => "leg_left",
            RegionKey::LegRight => "leg_right",
            RegionKey::FootLeft => "foot_left",
            RegionKey::FootRight => "foot_right",
            RegionKey::Arms => "arms",
            RegionKey::Legs => "legs",
            RegionKey::Hands => "hands",
            RegionKey::Feet => "feet",
            RegionKey::Abdomen => "abdomen",
            RegionKey::Stomach => "stomach",
            RegionKey::Liver => "liver",
            RegionKey::KidneyLeft => "kidney_left",
            RegionKey::KidneyRight => "kidney_right",
            RegionKey::Kidneys => "kidneys",
            RegionKey::Intestines => "intestines",
            RegionKey::Pancreas => "pancreas",
            RegionKey::Pelvis => "pelvis",
            RegionKey::Uterus => "uterus",
            RegionKey::OvaryLeft => "ovary_left",
            RegionKey::OvaryRight => "ovary_right",
            RegionKey::Blood => "blood",
            RegionKey::Muscles => "muscles",
            RegionKey::Bones => "bones",
            RegionKey::Joints => "joints",
            RegionKey::Tendons => "tendons",
            RegionKey::ImmuneSystem => "immune_system",
        }
    }

    /// Category this region belongs to
    pub fn category(&self) -> RegionCategory {
        use RegionKey::*;
        match self {
            Head | Brain | Eyes | Ears | Neck | Throat | Mouth | Teeth | Thyroid => {
                RegionCategory::HeadSensory
            }
            ChestWall | Heart | Lungs | UpperBack | LowerBack | Breasts => RegionCategory::Torso,
            Shoulders | ArmLeft | ArmRight | HandLeft | HandRight | LegLeft | LegRight
            | FootLeft | FootRight | Arms | Legs | Hands | Feet => RegionCategory::Limbs,
            Abdomen | Stomach | Liver | KidneyLeft | KidneyRight | Kidneys | Intestines
            | Pancreas | Pelvis => RegionCategory::Abdomen,
            Uterus | OvaryLeft | OvaryRight => RegionCategory::Reproductive,
            Blood | Muscles | Bones | Joints | Tendons | ImmuneSystem => RegionCategory::Systemic,
        }
    }

    /// Whether the region is one of the 29 anatomical regions a body map renders
    pub fn is_anatomical(&self) -> bool {
        use RegionKey::*;
        matches!(
            self,
            Head | Brain | Eyes | Ears | Neck
                | ChestWall | Heart | Lungs | UpperBack | LowerBack
                | Shoulders | ArmLeft | ArmRight | HandLeft | HandRight
                | Abdomen | Stomach | Liver | KidneyLeft | KidneyRight | Intestines | Pelvis
                | LegLeft | LegRight | FootLeft | FootRight
                | Uterus | OvaryLeft | OvaryRight
        )
    }

    /// All regions in a category
    pub fn in_category(category: RegionCategory) -> Vec<RegionKey> {
        Self::ALL
            .iter()
            .copied()
            .filter(|r| r.category() == category)
            .collect()
    }
}

impl fmt::Display for RegionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a member of the region vocabulary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRegion(pub String);

impl fmt::Display for UnknownRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown body region: '{}'", self.0)
    }
}

impl std::error::Error for UnknownRegion {}

impl FromStr for RegionKey {
    type Err = UnknownRegion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == needle)
            .ok_or(UnknownRegion(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_all_regions_unique() {
        let names: HashSet<&str> = RegionKey::ALL.iter().map(|r| r.as_str()).collect();
        assert_eq!(names.len(), RegionKey::ALL.len());
    }

    #[test]
    fn test_anatomical_subset_size() {
        let anatomical = RegionKey::ALL.iter().filter(|r| r.is_anatomical()).count();
        assert_eq!(anatomical, 29);
    }

    #[test]
    fn test_parse_matches_serde() {
        for region in RegionKey::ALL {
            let parsed: RegionKey = region.as_str().parse().unwrap();
            assert_eq!(parsed, region);

            let json = serde_json::to_string(&region).unwrap();
            assert_eq!(json, format!("\"{}\"", region.as_str()));
        }
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!("spleen".parse::<RegionKey>().is_err());
        assert_eq!(" Liver ".parse::<RegionKey>().unwrap(), RegionKey::Liver);
    }

    #[test]
    fn test_categories() {
        assert_eq!(RegionKey::KidneyLeft.category(), RegionCategory::Abdomen);
        assert_eq!(RegionKey::Blood.category(), RegionCategory::Systemic);
        assert_eq!(
            RegionKey::in_category(RegionCategory::Reproductive),
            vec![RegionKey::Uterus, RegionKey::OvaryLeft, RegionKey::OvaryRight]
        );
    }
}
