//! Matching Orchestrator: composes extraction and comparison into one report.
//!
//! Flow: extract job profile → extract candidate profile → compare → assemble report.
//!
//! Fail-fast: any stage error is returned unchanged and no partial report is built.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::MatchError;
use crate::llm_client::StructuredExtractor;
use crate::matching::extraction::{extract_profile, overview_summary, DocumentContext};
use crate::matching::power::{statistical_power, PowerAnalysis};
use crate::matching::statistics::{compare, MatchingResult};
use crate::matching::taxonomy::{
    CategoryWeights, StructuredProfile, EXCELLENT_EVIDENCE_THRESHOLD, SIGNIFICANCE_THRESHOLD,
    STRONG_EVIDENCE_THRESHOLD, TOTAL_VARIABLES,
};

/// Effect size the framework is sized for.
const FRAMEWORK_EFFECT_SIZE: f64 = 0.3;
const FRAMEWORK_ALPHA: f64 = 0.05;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// Input for a single job/resume analysis.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchRequest {
    pub job_description: String,
    pub job_title: String,
    pub company: String,
    pub resume_text: String,
    /// Pre-parsed resume fields, forwarded to the resume extraction prompt.
    #[serde(default)]
    pub resume_data: Option<Value>,
}

/// Fixed constants of the 22-variable framework, echoed into every report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameworkConstants {
    pub total_variables: usize,
    pub significance_threshold: usize,
    pub strong_evidence_threshold: usize,
    pub excellent_evidence_threshold: usize,
    pub category_weights: CategoryWeights,
    pub power_analysis: PowerAnalysis,
}

impl FrameworkConstants {
    pub fn new(weights: CategoryWeights) -> Result<Self, MatchError> {
        Ok(Self {
            total_variables: TOTAL_VARIABLES,
            significance_threshold: SIGNIFICANCE_THRESHOLD,
            strong_evidence_threshold: STRONG_EVIDENCE_THRESHOLD,
            excellent_evidence_threshold: EXCELLENT_EVIDENCE_THRESHOLD,
            category_weights: weights,
            power_analysis: statistical_power(
                TOTAL_VARIABLES,
                FRAMEWORK_EFFECT_SIZE,
                FRAMEWORK_ALPHA,
            )?,
        })
    }
}

/// Complete, timestamped result of one analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReport {
    pub analysis_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub job_title: String,
    pub company: String,
    pub job_profile: StructuredProfile,
    pub candidate_profile: StructuredProfile,
    pub matching_result: MatchingResult,
    pub framework_constants: FrameworkConstants,
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Runs the full matching analysis for one job posting and one resume.
///
/// Steps:
/// 1. extract_profile(job posting) → job StructuredProfile
/// 2. extract_profile(resume, aligned to the job variables) → candidate StructuredProfile
/// 3. compare() → MatchingResult
/// 4. assemble MatchReport
pub async fn run_matching_analysis(
    extractor: &dyn StructuredExtractor,
    request: &MatchRequest,
    weights: &CategoryWeights,
) -> Result<MatchReport, MatchError> {
    weights.validate()?;
    info!(
        "Starting matching analysis for: {} at {}",
        request.job_title, request.company
    );

    // Step 1: Job profile
    let job_profile = extract_profile(
        extractor,
        &request.job_description,
        &DocumentContext::JobPosting {
            title: &request.job_title,
            company: &request.company,
        },
    )
    .await?;
    debug!("Job overview: {}", overview_summary(&job_profile.overview));

    // Step 2: Candidate profile
    let candidate_profile = extract_profile(
        extractor,
        &request.resume_text,
        &DocumentContext::Resume {
            resume_data: request.resume_data.as_ref(),
            job_profile: Some(&job_profile),
        },
    )
    .await?;
    debug!(
        "Candidate overview: {}",
        overview_summary(&candidate_profile.overview)
    );

    // Step 3: Compare
    let matching_result = compare(&job_profile, &candidate_profile, weights)?;

    // Step 4: Report
    let report = MatchReport {
        analysis_id: Uuid::new_v4(),
        timestamp: Utc::now(),
        job_title: request.job_title.clone(),
        company: request.company.clone(),
        job_profile,
        candidate_profile,
        framework_constants: FrameworkConstants::new(*weights)?,
        matching_result,
    };

    info!(
        "Analysis {} complete: score={:.3}, confidence={}%, decision={:?}",
        report.analysis_id,
        report.matching_result.total_score,
        report.matching_result.confidence_level,
        report.matching_result.hiring_decision
    );
    Ok(report)
}
