//! Statistical Comparator: deterministic scoring of a candidate profile against a job profile.
//!
//! Per-variable match rules:
//! - critical requirement: candidate `present`
//! - core competency: candidate `present` and demonstrated level ≥ required level
//! - experience factor: candidate `meets_threshold`
//! - preferred qualification: candidate `present`
//!
//! Category scores are the matched fraction of each category; the total score is their
//! weighted sum. Significance is a step function of the total match count (14 / 16 / 18
//! of 22). Chi-square, Cohen's d and the 95% interval use an assumed population of
//! mean 0.5 and standard deviation 0.2.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};
use tracing::debug;

use crate::errors::MatchError;
use crate::matching::taxonomy::{
    Category, CategoryWeights, ProfileKind, StructuredProfile, VariableRecord,
    EXCELLENT_EVIDENCE_THRESHOLD, SIGNIFICANCE_THRESHOLD, STRONG_EVIDENCE_THRESHOLD,
    TOTAL_VARIABLES,
};

pub const POPULATION_MEAN: f64 = 0.5;
pub const POPULATION_STD: f64 = 0.2;
/// Per-category probability of a >50% match under the null hypothesis.
const NULL_MATCH_RATE: f64 = 0.5;
const ALPHA: f64 = 0.05;
const Z_95: f64 = 1.96;

// ────────────────────────────────────────────────────────────────────────────
// Result types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignificanceLevel {
    None,
    Significant,
    Strong,
    Excellent,
}

impl SignificanceLevel {
    /// Buckets a total match count. Boundaries belong to the upper bucket.
    pub fn from_matches(total_matches: usize) -> Self {
        if total_matches >= EXCELLENT_EVIDENCE_THRESHOLD {
            SignificanceLevel::Excellent
        } else if total_matches >= STRONG_EVIDENCE_THRESHOLD {
            SignificanceLevel::Strong
        } else if total_matches >= SIGNIFICANCE_THRESHOLD {
            SignificanceLevel::Significant
        } else {
            SignificanceLevel::None
        }
    }

    /// Confidence level in percent.
    pub fn confidence_level(self) -> f64 {
        match self {
            SignificanceLevel::None => 0.0,
            SignificanceLevel::Significant => 95.0,
            SignificanceLevel::Strong => 99.0,
            SignificanceLevel::Excellent => 99.9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectMagnitude {
    Small,
    Medium,
    Large,
    VeryLarge,
}

impl EffectMagnitude {
    pub fn from_cohens_d(d: f64) -> Self {
        let d = d.abs();
        if d < 0.2 {
            EffectMagnitude::Small
        } else if d < 0.5 {
            EffectMagnitude::Medium
        } else if d < 0.8 {
            EffectMagnitude::Large
        } else {
            EffectMagnitude::VeryLarge
        }
    }
}

/// Ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HiringDecision {
    Reject,
    WeakMaybe,
    Maybe,
    Recommend,
    StrongRecommend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub category: Category,
    pub matched: usize,
    pub total: usize,
    pub score: f64,
    pub weight: f64,
    pub weighted_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChiSquareTest {
    pub statistic: f64,
    pub p_value: f64,
    pub significant: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectSize {
    pub cohens_d: f64,
    pub interpretation: EffectMagnitude,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    pub level: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatisticalAnalysis {
    pub chi_square: ChiSquareTest,
    pub effect_size: EffectSize,
    pub confidence_interval: ConfidenceInterval,
}

/// Full comparison outcome. `total_score` is a fraction in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingResult {
    pub total_score: f64,
    pub total_matches: usize,
    pub match_percentage: f64,
    pub significance_level: SignificanceLevel,
    pub confidence_level: f64,
    pub statistical_significance: bool,
    pub category_scores: BTreeMap<Category, f64>,
    pub category_breakdown: Vec<CategoryBreakdown>,
    pub variable_matches: BTreeMap<String, bool>,
    pub missing_critical: Vec<String>,
    pub recommendations: Vec<String>,
    pub evidence_summary: BTreeMap<String, String>,
    pub statistical_analysis: StatisticalAnalysis,
    pub hiring_decision: HiringDecision,
    pub summary: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Comparison
// ────────────────────────────────────────────────────────────────────────────

/// Compares a candidate profile against a job profile.
///
/// Pure: the result depends only on the two profiles and the weights. Fails with
/// `MatchError::Validation` on misfiled records, swapped profile kinds, or weights
/// that do not sum to 1.
pub fn compare(
    job_profile: &StructuredProfile,
    candidate_profile: &StructuredProfile,
    weights: &CategoryWeights,
) -> Result<MatchingResult, MatchError> {
    weights.validate()?;
    if job_profile.kind != ProfileKind::Job || candidate_profile.kind != ProfileKind::Candidate {
        return Err(MatchError::Validation(format!(
            "expected (job, candidate) profiles, got ({:?}, {:?})",
            job_profile.kind, candidate_profile.kind
        )));
    }
    job_profile.validate()?;
    candidate_profile.validate()?;

    let mut category_scores = BTreeMap::new();
    let mut category_breakdown = Vec::with_capacity(Category::ALL.len());
    let mut variable_matches = BTreeMap::new();
    let mut evidence_summary = BTreeMap::new();
    let mut missing_critical = Vec::new();
    let mut gaps: Vec<(&VariableRecord, &VariableRecord)> = Vec::new();
    let mut total_matches = 0;
    let mut total_score = 0.0;

    for category in Category::ALL {
        let job_records = job_profile.records(category);
        let candidate_records = candidate_profile.records(category);
        if job_records.len() != candidate_records.len() {
            return Err(MatchError::Validation(format!(
                "{category}: job has {} variables, candidate has {}",
                job_records.len(),
                candidate_records.len()
            )));
        }

        let mut matched = 0;
        for (job, candidate) in job_records.iter().zip(candidate_records) {
            let is_match = variable_matches_requirement(category, job, candidate);
            if is_match {
                matched += 1;
            } else {
                gaps.push((job, candidate));
            }
            if category == Category::CriticalRequirements && !candidate.present {
                missing_critical.push(job.name.clone());
            }

            let key = unique_key(&variable_matches, &job.name, category);
            let evidence = if candidate.evidence.trim().is_empty() {
                "Not found".to_string()
            } else {
                candidate.evidence.clone()
            };
            evidence_summary.insert(key.clone(), evidence);
            variable_matches.insert(key, is_match);
        }

        let total = job_records.len();
        let score = if total == 0 {
            0.0
        } else {
            matched as f64 / total as f64
        };
        let weight = weights.weight(category);
        total_matches += matched;
        total_score += score * weight;
        category_scores.insert(category, score);
        category_breakdown.push(CategoryBreakdown {
            category,
            matched,
            total,
            score,
            weight,
            weighted_score: score * weight,
        });
    }

    let total_score = total_score.clamp(0.0, 1.0);
    let significance_level = SignificanceLevel::from_matches(total_matches);
    let scores: Vec<f64> = category_scores.values().copied().collect();
    let statistical_analysis = StatisticalAnalysis {
        chi_square: chi_square_test(&scores),
        effect_size: effect_size(total_score),
        confidence_interval: confidence_interval(total_score, scores.len()),
    };
    let hiring_decision = hiring_decision(significance_level, total_score, &missing_critical);
    let summary = match_summary(
        total_score,
        statistical_analysis.chi_square.p_value,
        statistical_analysis.effect_size.cohens_d,
    );

    debug!(
        "Compared profiles: {}/{} matches, score={:.4}, level={:?}",
        total_matches, TOTAL_VARIABLES, total_score, significance_level
    );

    Ok(MatchingResult {
        total_score,
        total_matches,
        match_percentage: total_matches as f64 / TOTAL_VARIABLES as f64,
        significance_level,
        confidence_level: significance_level.confidence_level(),
        statistical_significance: significance_level != SignificanceLevel::None,
        category_scores,
        category_breakdown,
        variable_matches,
        recommendations: build_recommendations(&gaps),
        missing_critical,
        evidence_summary,
        statistical_analysis,
        hiring_decision,
        summary,
    })
}

/// Applies the per-category match rule to one (job, candidate) variable pair.
fn variable_matches_requirement(
    category: Category,
    job: &VariableRecord,
    candidate: &VariableRecord,
) -> bool {
    match category {
        Category::CriticalRequirements | Category::PreferredQualifications => candidate.present,
        Category::CoreCompetencies => {
            // An unrated candidate level is taken as adequate; an unrated job level accepts any.
            let level_ok = match (job.proficiency, candidate.proficiency) {
                (Some(required), Some(demonstrated)) => demonstrated >= required,
                _ => true,
            };
            candidate.present && level_ok
        }
        Category::ExperienceFactors => candidate.meets_threshold.unwrap_or(false),
    }
}

fn unique_key(existing: &BTreeMap<String, bool>, name: &str, category: Category) -> String {
    if existing.contains_key(name) {
        format!("{name} ({category})")
    } else {
        name.to_string()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Statistics
// ────────────────────────────────────────────────────────────────────────────

/// 1-dof chi-square test of "categories scoring above 0.5" against a 50% null rate.
/// Returns statistic 0 and p-value 1 when there are no categories.
pub fn chi_square_test(category_scores: &[f64]) -> ChiSquareTest {
    let observed = category_scores.iter().filter(|s| **s > 0.5).count() as f64;
    let expected = category_scores.len() as f64 * NULL_MATCH_RATE;

    if expected <= 0.0 {
        return ChiSquareTest {
            statistic: 0.0,
            p_value: 1.0,
            significant: false,
        };
    }

    let statistic = (observed - expected).powi(2) / expected;
    let p_value = match ChiSquared::new(1.0) {
        Ok(dist) => (1.0 - dist.cdf(statistic)).clamp(0.0, 1.0),
        Err(_) => 1.0,
    };
    ChiSquareTest {
        statistic,
        p_value,
        significant: p_value < ALPHA,
    }
}

/// Cohen's d of the observed score against the assumed population.
pub fn effect_size(score: f64) -> EffectSize {
    let cohens_d = (score - POPULATION_MEAN) / POPULATION_STD;
    EffectSize {
        cohens_d,
        interpretation: EffectMagnitude::from_cohens_d(cohens_d),
    }
}

/// 95% interval `score ± 1.96 · σ/√n`. Collapses to the point score when `n == 0`.
pub fn confidence_interval(score: f64, num_categories: usize) -> ConfidenceInterval {
    let margin = if num_categories == 0 {
        0.0
    } else {
        Z_95 * POPULATION_STD / (num_categories as f64).sqrt()
    };
    ConfidenceInterval {
        lower: score - margin,
        upper: score + margin,
        level: 0.95,
    }
}

fn hiring_decision(
    level: SignificanceLevel,
    total_score: f64,
    missing_critical: &[String],
) -> HiringDecision {
    let decision = match level {
        SignificanceLevel::Excellent => HiringDecision::StrongRecommend,
        SignificanceLevel::Strong => HiringDecision::Recommend,
        SignificanceLevel::Significant => HiringDecision::Maybe,
        SignificanceLevel::None if total_score >= POPULATION_MEAN => HiringDecision::WeakMaybe,
        SignificanceLevel::None => HiringDecision::Reject,
    };
    if missing_critical.is_empty() {
        decision
    } else {
        decision.min(HiringDecision::Maybe)
    }
}

/// One-line verdict combining score, p-value and effect size.
pub fn match_summary(score: f64, p_value: f64, cohens_d: f64) -> String {
    let pct = score * 100.0;
    if p_value < 0.001 && cohens_d > 0.8 {
        format!("EXCELLENT match (score: {pct:.1}%) - Highly significant with large effect size")
    } else if p_value < 0.01 && cohens_d > 0.5 {
        format!("GOOD match (score: {pct:.1}%) - Significant with medium+ effect size")
    } else if p_value < 0.05 && cohens_d > 0.2 {
        format!("MODERATE match (score: {pct:.1}%) - Significant with small+ effect size")
    } else if score > 0.6 {
        format!("POTENTIAL match (score: {pct:.1}%) - High score but low statistical significance")
    } else {
        format!("WEAK match (score: {pct:.1}%) - Not statistically significant")
    }
}

/// Builds recommendations from the unmatched (job, candidate) pairs.
fn build_recommendations(gaps: &[(&VariableRecord, &VariableRecord)]) -> Vec<String> {
    let mut recommendations = Vec::new();
    let mut preferred_missing = Vec::new();

    for (job, candidate) in gaps {
        match job.category {
            Category::CriticalRequirements => recommendations.push(format!(
                "Missing critical requirement: {}. This is normally disqualifying.",
                job.name
            )),
            Category::CoreCompetencies => match (candidate.present, job.proficiency, candidate.proficiency) {
                (true, Some(required), Some(demonstrated)) => recommendations.push(format!(
                    "Develop {} from {} to {} proficiency.",
                    job.name, demonstrated, required
                )),
                _ => recommendations.push(format!(
                    "Show evidence of core competency: {}.",
                    job.name
                )),
            },
            Category::ExperienceFactors => recommendations.push(match &job.threshold {
                Some(threshold) => format!("Experience gap: {} (requires {}).", job.name, threshold),
                None => format!("Experience gap: {}.", job.name),
            }),
            Category::PreferredQualifications => preferred_missing.push(job.name.as_str()),
        }
    }

    if !preferred_missing.is_empty() {
        recommendations.push(format!(
            "Preferred qualifications not shown: {}.",
            preferred_missing.join(", ")
        ));
    }
    if recommendations.is_empty() {
        recommendations
            .push("Candidate meets every assessed requirement; proceed to interview.".to_string());
    }
    recommendations
}
