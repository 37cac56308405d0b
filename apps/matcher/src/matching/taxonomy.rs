//! Taxonomy: the fixed 22-variable, 4-category schema shared by job and candidate profiles.
//!
//! Category sizes are part of the type: a `StructuredProfile` holds one array per
//! category (5 / 8 / 4 / 5), so a profile with the wrong cardinality cannot be built.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::MatchError;

pub const TOTAL_VARIABLES: usize = 22;
/// 14 / 22 = 63.6% of variables matched, p < 0.05.
pub const SIGNIFICANCE_THRESHOLD: usize = 14;
/// 16 / 22 = 72.7% of variables matched, p < 0.01.
pub const STRONG_EVIDENCE_THRESHOLD: usize = 16;
/// 18 / 22 = 81.8% of variables matched, p < 0.001.
pub const EXCELLENT_EVIDENCE_THRESHOLD: usize = 18;

pub const CRITICAL_COUNT: usize = 5;
pub const COMPETENCY_COUNT: usize = 8;
pub const EXPERIENCE_COUNT: usize = 4;
pub const PREFERRED_COUNT: usize = 5;

const WEIGHT_TOLERANCE: f64 = 1e-6;

// ────────────────────────────────────────────────────────────────────────────
// Categories and levels
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    CriticalRequirements,
    CoreCompetencies,
    ExperienceFactors,
    PreferredQualifications,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::CriticalRequirements,
        Category::CoreCompetencies,
        Category::ExperienceFactors,
        Category::PreferredQualifications,
    ];

    /// Key used in the structured extraction payload.
    pub fn key(self) -> &'static str {
        match self {
            Category::CriticalRequirements => "critical_requirements",
            Category::CoreCompetencies => "core_competencies",
            Category::ExperienceFactors => "experience_factors",
            Category::PreferredQualifications => "preferred_qualifications",
        }
    }

    /// Per-variable key prefix (`req_1`, `comp_1`, ...).
    pub fn slot_prefix(self) -> &'static str {
        match self {
            Category::CriticalRequirements => "req",
            Category::CoreCompetencies => "comp",
            Category::ExperienceFactors => "exp",
            Category::PreferredQualifications => "pref",
        }
    }

    pub fn expected_count(self) -> usize {
        match self {
            Category::CriticalRequirements => CRITICAL_COUNT,
            Category::CoreCompetencies => COMPETENCY_COUNT,
            Category::ExperienceFactors => EXPERIENCE_COUNT,
            Category::PreferredQualifications => PREFERRED_COUNT,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Graded skill level. Ordering is meaningful: `Expert > Advanced > Intermediate > Beginner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProficiencyLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl ProficiencyLevel {
    /// Lenient parse of collaborator text such as "Advanced" or "expert-level".
    pub fn parse_loose(text: &str) -> Option<Self> {
        let text = text.to_lowercase();
        if text.contains("expert") {
            Some(ProficiencyLevel::Expert)
        } else if text.contains("advanced") {
            Some(ProficiencyLevel::Advanced)
        } else if text.contains("intermediate") {
            Some(ProficiencyLevel::Intermediate)
        } else if text.contains("beginner") {
            Some(ProficiencyLevel::Beginner)
        } else {
            None
        }
    }
}

impl fmt::Display for ProficiencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProficiencyLevel::Beginner => "beginner",
            ProficiencyLevel::Intermediate => "intermediate",
            ProficiencyLevel::Advanced => "advanced",
            ProficiencyLevel::Expert => "expert",
        })
    }
}

/// Value a preferred qualification adds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusValue {
    Low,
    Medium,
    High,
}

impl BonusValue {
    pub fn parse_loose(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "low" => Some(BonusValue::Low),
            "medium" => Some(BonusValue::Medium),
            "high" => Some(BonusValue::High),
            _ => None,
        }
    }
}

/// Which side of the comparison a profile describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    Job,
    Candidate,
}

impl ProfileKind {
    pub fn document_name(self) -> &'static str {
        match self {
            ProfileKind::Job => "job posting",
            ProfileKind::Candidate => "resume",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Records and profiles
// ────────────────────────────────────────────────────────────────────────────

/// One extracted attribute of a job posting or a resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableRecord {
    pub name: String,
    pub category: Category,
    /// Candidate: the attribute was found in the resume. Job: the attribute is required.
    pub present: bool,
    /// Candidate: quoted evidence. Job: what to look for in a resume.
    pub evidence: String,
    pub description: Option<String>,
    /// Core competencies: required (job) or demonstrated (candidate) level.
    pub proficiency: Option<ProficiencyLevel>,
    /// Experience factors: minimum threshold (job) or measurement (candidate).
    pub threshold: Option<String>,
    /// Experience factors, candidate side only.
    pub meets_threshold: Option<bool>,
    /// Preferred qualifications.
    pub bonus_value: Option<BonusValue>,
}

impl VariableRecord {
    pub fn new(name: impl Into<String>, category: Category, present: bool) -> Self {
        Self {
            name: name.into(),
            category,
            present,
            evidence: String::new(),
            description: None,
            proficiency: None,
            threshold: None,
            meets_threshold: None,
            bonus_value: None,
        }
    }
}

/// Fixed 22-variable extraction result for either a job or a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredProfile {
    pub kind: ProfileKind,
    /// Free-form header the collaborator returns (industry, seniority, ...).
    #[serde(default)]
    pub overview: Map<String, Value>,
    pub critical_requirements: [VariableRecord; CRITICAL_COUNT],
    pub core_competencies: [VariableRecord; COMPETENCY_COUNT],
    pub experience_factors: [VariableRecord; EXPERIENCE_COUNT],
    pub preferred_qualifications: [VariableRecord; PREFERRED_COUNT],
}

impl StructuredProfile {
    pub fn records(&self, category: Category) -> &[VariableRecord] {
        match category {
            Category::CriticalRequirements => &self.critical_requirements,
            Category::CoreCompetencies => &self.core_competencies,
            Category::ExperienceFactors => &self.experience_factors,
            Category::PreferredQualifications => &self.preferred_qualifications,
        }
    }

    /// All 22 records in category order.
    pub fn iter(&self) -> impl Iterator<Item = &VariableRecord> {
        Category::ALL
            .into_iter()
            .flat_map(move |category| self.records(category).iter())
    }

    /// Checks that each record sits in the slot of its own category.
    pub fn validate(&self) -> Result<(), MatchError> {
        for category in Category::ALL {
            if let Some(record) = self
                .records(category)
                .iter()
                .find(|r| r.category != category)
            {
                return Err(MatchError::Validation(format!(
                    "{} profile: variable '{}' is tagged {} but stored under {}",
                    self.kind.document_name(),
                    record.name,
                    record.category,
                    category
                )));
            }
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Weights
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryWeights {
    pub critical_requirements: f64,
    pub core_competencies: f64,
    pub experience_factors: f64,
    pub preferred_qualifications: f64,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            critical_requirements: 0.40,
            core_competencies: 0.35,
            experience_factors: 0.15,
            preferred_qualifications: 0.10,
        }
    }
}

impl CategoryWeights {
    pub fn weight(&self, category: Category) -> f64 {
        match category {
            Category::CriticalRequirements => self.critical_requirements,
            Category::CoreCompetencies => self.core_competencies,
            Category::ExperienceFactors => self.experience_factors,
            Category::PreferredQualifications => self.preferred_qualifications,
        }
    }

    pub fn sum(&self) -> f64 {
        Category::ALL.iter().map(|c| self.weight(*c)).sum()
    }

    /// Weights must be finite, non-negative and sum to 1 (±1e-6).
    pub fn validate(&self) -> Result<(), MatchError> {
        if let Some(category) = Category::ALL
            .into_iter()
            .find(|c| !self.weight(*c).is_finite() || self.weight(*c) < 0.0)
        {
            return Err(MatchError::Validation(format!(
                "weight for {category} must be a finite non-negative number, got {}",
                self.weight(category)
            )));
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(MatchError::Validation(format!(
                "category weights must sum to 1.0, got {sum}"
            )));
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Test fixtures
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    use std::array::from_fn;

    /// Job profile whose variables are named `<prefix>_<n>`.
    pub(crate) fn job_profile() -> StructuredProfile {
        let job = |category: Category, i: usize| {
            let mut r = VariableRecord::new(
                format!("{}_{}", category.slot_prefix(), i + 1),
                category,
                category != Category::PreferredQualifications,
            );
            r.evidence = format!("evidence for {}_{}", category.slot_prefix(), i + 1);
            if category == Category::CoreCompetencies {
                r.proficiency = Some(ProficiencyLevel::Intermediate);
            }
            if category == Category::ExperienceFactors {
                r.threshold = Some("3+ years".to_string());
            }
            r
        };
        StructuredProfile {
            kind: ProfileKind::Job,
            overview: Map::new(),
            critical_requirements: from_fn(|i| job(Category::CriticalRequirements, i)),
            core_competencies: from_fn(|i| job(Category::CoreCompetencies, i)),
            experience_factors: from_fn(|i| job(Category::ExperienceFactors, i)),
            preferred_qualifications: from_fn(|i| job(Category::PreferredQualifications, i)),
        }
    }

    /// Candidate profile where the first `n` variables of each category match.
    pub(crate) fn candidate_profile(
        critical: usize,
        competency: usize,
        experience: usize,
        preferred: usize,
    ) -> StructuredProfile {
        let candidate = |category: Category, i: usize, matched: bool| {
            let mut r = VariableRecord::new(
                format!("{}_{}", category.slot_prefix(), i + 1),
                category,
                matched,
            );
            r.evidence = if matched {
                format!("resume line for {}_{}", category.slot_prefix(), i + 1)
            } else {
                "Not found".to_string()
            };
            if category == Category::CoreCompetencies {
                r.proficiency = Some(ProficiencyLevel::Advanced);
            }
            if category == Category::ExperienceFactors {
                r.meets_threshold = Some(matched);
            }
            r
        };
        StructuredProfile {
            kind: ProfileKind::Candidate,
            overview: Map::new(),
            critical_requirements: from_fn(|i| candidate(Category::CriticalRequirements, i, i < critical)),
            core_competencies: from_fn(|i| candidate(Category::CoreCompetencies, i, i < competency)),
            experience_factors: from_fn(|i| candidate(Category::ExperienceFactors, i, i < experience)),
            preferred_qualifications: from_fn(|i| candidate(Category::PreferredQualifications, i, i < preferred)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_counts_sum_to_total_variables() {
        let total: usize = Category::ALL.iter().map(|c| c.expected_count()).sum();
        assert_eq!(total, TOTAL_VARIABLES);
    }

    #[test]
    fn test_thresholds_match_percentages() {
        let pct = |n: usize| n as f64 / TOTAL_VARIABLES as f64;
        assert!((pct(SIGNIFICANCE_THRESHOLD) - 0.636).abs() < 0.001);
        assert!((pct(STRONG_EVIDENCE_THRESHOLD) - 0.727).abs() < 0.001);
        assert!((pct(EXCELLENT_EVIDENCE_THRESHOLD) - 0.818).abs() < 0.001);
    }

    #[test]
    fn test_proficiency_display_matches_wire_name() {
        for level in [
            ProficiencyLevel::Beginner,
            ProficiencyLevel::Intermediate,
            ProficiencyLevel::Advanced,
            ProficiencyLevel::Expert,
        ] {
            let wire = serde_json::to_value(level).unwrap();
            assert_eq!(wire, serde_json::Value::String(level.to_string()));
            assert_eq!(ProficiencyLevel::parse_loose(&level.to_string()), Some(level));
        }
    }

    #[test]
    fn test_default_weights_are_valid() {
        let weights = CategoryWeights::default();
        assert!(weights.validate().is_ok());
        assert!((weights.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_weights_off_by_more_than_tolerance_rejected() {
        let weights = CategoryWeights {
            preferred_qualifications: 0.2,
            ..CategoryWeights::default()
        };
        assert!(matches!(weights.validate(), Err(MatchError::Validation(_))));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let weights = CategoryWeights {
            critical_requirements: 0.6,
            preferred_qualifications: -0.1,
            ..CategoryWeights::default()
        };
        assert!(weights.validate().is_err());
    }

    #[test]
    fn test_category_serializes_snake_case() {
        let json = serde_json::to_string(&Category::CoreCompetencies).unwrap();
        assert_eq!(json, "\"core_competencies\"");
    }

    #[test]
    fn test_proficiency_ordering_and_parse() {
        assert!(ProficiencyLevel::Expert > ProficiencyLevel::Advanced);
        assert!(ProficiencyLevel::Intermediate > ProficiencyLevel::Beginner);
        assert_eq!(
            ProficiencyLevel::parse_loose("Advanced (5 yrs)"),
            Some(ProficiencyLevel::Advanced)
        );
        assert_eq!(ProficiencyLevel::parse_loose("n/a"), None);
    }

    #[test]
    fn test_profile_iterates_22_records_in_category_order() {
        let profile = fixtures::job_profile();
        let names: Vec<&str> = profile.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names.len(), TOTAL_VARIABLES);
        assert_eq!(names[0], "req_1");
        assert_eq!(names[5], "comp_1");
        assert_eq!(names[21], "pref_5");
    }

    #[test]
    fn test_validate_rejects_misfiled_record() {
        let mut profile = fixtures::job_profile();
        profile.core_competencies[2].category = Category::ExperienceFactors;
        let err = profile.validate().unwrap_err();
        assert!(err.to_string().contains("comp_3"));
    }

    #[test]
    fn test_profile_round_trips_through_json() {
        let profile = fixtures::candidate_profile(5, 4, 2, 1);
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["core_competencies"].as_array().unwrap().len(), 8);
        let back: StructuredProfile = serde_json::from_value(json).unwrap();
        assert_eq!(back, profile);
    }
}
