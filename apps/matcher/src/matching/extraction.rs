//! Variable Extraction Adapter: turns a job posting or a resume into a `StructuredProfile`.
//!
//! Text understanding is delegated to a `StructuredExtractor`. This module owns the
//! prompt assembly, strips incidental wrapping from the collaborator output, parses it
//! and enforces the 5 / 8 / 4 / 5 cardinality. Failures are not retried here.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::errors::MatchError;
use crate::llm_client::prompts::{fill_template, GROUNDING_INSTRUCTION, JSON_ONLY_INSTRUCTION};
use crate::llm_client::StructuredExtractor;
use crate::matching::prompts::{
    CANDIDATE_EXTRACTION_SYSTEM, CANDIDATE_EXTRACTION_TEMPLATE, JOB_EXTRACTION_SYSTEM,
    JOB_EXTRACTION_TEMPLATE, OPEN_VARIABLES_HINT,
};
use crate::matching::taxonomy::{
    BonusValue, Category, ProficiencyLevel, ProfileKind, StructuredProfile, VariableRecord,
};

/// What the document is, plus whatever side information the prompt can use.
#[derive(Debug, Clone, Copy)]
pub enum DocumentContext<'a> {
    JobPosting {
        title: &'a str,
        company: &'a str,
    },
    Resume {
        /// Pre-parsed resume fields, if the caller has them.
        resume_data: Option<&'a Value>,
        /// Job profile whose variables the candidate slots should line up with.
        job_profile: Option<&'a StructuredProfile>,
    },
}

impl DocumentContext<'_> {
    pub fn kind(&self) -> ProfileKind {
        match self {
            DocumentContext::JobPosting { .. } => ProfileKind::Job,
            DocumentContext::Resume { .. } => ProfileKind::Candidate,
        }
    }
}

/// One variable as the collaborator emits it. Job and candidate payloads share
/// `variable` and differ in the remaining keys, so everything else is optional.
#[derive(Debug, Deserialize)]
struct RawVariable {
    variable: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    evidence: Option<String>,
    #[serde(default)]
    evidence_needed: Option<String>,
    #[serde(default)]
    present: Option<Value>,
    #[serde(default)]
    disqualifier: Option<Value>,
    #[serde(default)]
    proficiency_level: Option<String>,
    #[serde(default)]
    minimum_threshold: Option<Value>,
    #[serde(default)]
    measurement: Option<Value>,
    #[serde(default)]
    meets_threshold: Option<Value>,
    #[serde(default)]
    bonus_value: Option<String>,
    #[serde(default)]
    value_level: Option<String>,
}

/// Extracts a structured profile from `document_text` via the collaborator.
pub async fn extract_profile(
    extractor: &dyn StructuredExtractor,
    document_text: &str,
    context: &DocumentContext<'_>,
) -> Result<StructuredProfile, MatchError> {
    let kind = context.kind();
    if document_text.trim().is_empty() {
        return Err(MatchError::Validation(format!(
            "{} text cannot be empty",
            kind.document_name()
        )));
    }

    let (system, prompt) = build_extraction_prompt(document_text, context);
    info!("Extracting structured variables from {}", kind.document_name());

    let raw = extractor
        .extract_structured(&system, &prompt)
        .await
        .map_err(|e| MatchError::collaborator(format!("{} extraction", kind.document_name()), e))?;

    let profile = parse_profile(&raw, kind)?;
    debug!(
        "Parsed {} profile with {} variables",
        kind.document_name(),
        profile.iter().count()
    );
    Ok(profile)
}

/// Builds the (system, user) prompt pair for a document.
fn build_extraction_prompt(document_text: &str, context: &DocumentContext<'_>) -> (String, String) {
    match context {
        DocumentContext::JobPosting { title, company } => (
            format!("{JOB_EXTRACTION_SYSTEM} {JSON_ONLY_INSTRUCTION}"),
            fill_template(
                JOB_EXTRACTION_TEMPLATE,
                &[
                    ("job_title", *title),
                    ("company", *company),
                    ("job_description", document_text),
                ],
            ),
        ),
        DocumentContext::Resume {
            resume_data,
            job_profile,
        } => {
            let job_variables = job_profile
                .map(describe_job_variables)
                .unwrap_or_else(|| OPEN_VARIABLES_HINT.to_string());
            let resume_data = resume_data
                .and_then(|d| serde_json::to_string_pretty(d).ok())
                .unwrap_or_else(|| "{}".to_string());
            (
                format!("{CANDIDATE_EXTRACTION_SYSTEM} {GROUNDING_INSTRUCTION} {JSON_ONLY_INSTRUCTION}"),
                fill_template(
                    CANDIDATE_EXTRACTION_TEMPLATE,
                    &[
                        ("job_variables", job_variables.as_str()),
                        ("resume_data", resume_data.as_str()),
                        ("resume_text", document_text),
                    ],
                ),
            )
        }
    }
}

fn describe_job_variables(profile: &StructuredProfile) -> String {
    let mut lines = Vec::new();
    for category in Category::ALL {
        for (i, record) in profile.records(category).iter().enumerate() {
            lines.push(format!(
                "- {}.{}_{}: {}",
                category.key(),
                category.slot_prefix(),
                i + 1,
                record.name
            ));
        }
    }
    lines.join("\n")
}

// ────────────────────────────────────────────────────────────────────────────
// Parsing
// ────────────────────────────────────────────────────────────────────────────

/// Parses collaborator output into a profile, enforcing per-category cardinality.
pub fn parse_profile(raw: &str, kind: ProfileKind) -> Result<StructuredProfile, MatchError> {
    let fail = |message: String| MatchError::Extraction {
        document: kind.document_name().to_string(),
        message,
        raw: raw.to_string(),
    };

    let cleaned = strip_wrapping(raw);
    let root: Value =
        serde_json::from_str(cleaned).map_err(|e| fail(format!("malformed JSON: {e}")))?;
    let root = root
        .as_object()
        .ok_or_else(|| fail("top-level value is not a JSON object".to_string()))?;

    let overview_key = match kind {
        ProfileKind::Job => "job_analysis",
        ProfileKind::Candidate => "candidate_analysis",
    };
    let overview = root
        .get(overview_key)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let mut parsed: Vec<Vec<VariableRecord>> = Vec::with_capacity(Category::ALL.len());
    for category in Category::ALL {
        let section = root
            .get(category.key())
            .ok_or_else(|| fail(format!("missing category '{}'", category.key())))?;
        let slots = ordered_slots(section)
            .ok_or_else(|| fail(format!("category '{}' is not an object or array", category.key())))?;

        if slots.len() != category.expected_count() {
            return Err(fail(format!(
                "expected {} {}, found {}",
                category.expected_count(),
                category.key(),
                slots.len()
            )));
        }

        let mut records = Vec::with_capacity(slots.len());
        for (slot, value) in slots {
            let variable: RawVariable = serde_json::from_value(value.clone())
                .map_err(|e| fail(format!("{}.{slot}: {e}", category.key())))?;
            let record = into_record(variable, category, kind)
                .map_err(|msg| fail(format!("{}.{slot}: {msg}", category.key())))?;
            records.push(record);
        }
        parsed.push(records);
    }

    let mut sections = parsed.into_iter();
    let mut next = || sections.next().unwrap_or_default();
    let (critical, competencies, experience, preferred) = (next(), next(), next(), next());

    // Lengths were checked above; a mismatch here means the count table drifted.
    let wrong_size = |category: Category| fail(format!("wrong number of {}", category.key()));
    Ok(StructuredProfile {
        kind,
        overview,
        critical_requirements: critical
            .try_into()
            .map_err(|_| wrong_size(Category::CriticalRequirements))?,
        core_competencies: competencies
            .try_into()
            .map_err(|_| wrong_size(Category::CoreCompetencies))?,
        experience_factors: experience
            .try_into()
            .map_err(|_| wrong_size(Category::ExperienceFactors))?,
        preferred_qualifications: preferred
            .try_into()
            .map_err(|_| wrong_size(Category::PreferredQualifications))?,
    })
}

/// Returns `(slot label, value)` pairs. Objects are ordered by the numeric suffix of
/// their keys (`req_2` before `req_10`); arrays keep their order.
fn ordered_slots(section: &Value) -> Option<Vec<(String, &Value)>> {
    match section {
        Value::Object(map) => {
            let mut slots: Vec<(String, &Value)> =
                map.iter().map(|(k, v)| (k.clone(), v)).collect();
            slots.sort_by_key(|(k, _)| slot_index(k));
            Some(slots)
        }
        Value::Array(items) => Some(
            items
                .iter()
                .enumerate()
                .map(|(i, v)| (format!("[{i}]"), v))
                .collect(),
        ),
        _ => None,
    }
}

fn slot_index(key: &str) -> (usize, String) {
    let index = key
        .rsplit('_')
        .next()
        .and_then(|n| n.parse::<usize>().ok())
        .unwrap_or(usize::MAX);
    (index, key.to_string())
}

fn into_record(
    raw: RawVariable,
    category: Category,
    kind: ProfileKind,
) -> Result<VariableRecord, String> {
    let name = raw.variable.trim().to_string();
    if name.is_empty() {
        return Err("variable name is empty".to_string());
    }

    let present = match kind {
        ProfileKind::Candidate => loose_bool(raw.present.as_ref(), "present")?.unwrap_or(false),
        ProfileKind::Job => loose_bool(raw.disqualifier.as_ref(), "disqualifier")?
            .unwrap_or(category != Category::PreferredQualifications),
    };
    let (evidence, threshold, meets_threshold) = match kind {
        ProfileKind::Candidate => (
            raw.evidence,
            raw.measurement.as_ref().and_then(loose_text),
            loose_bool(raw.meets_threshold.as_ref(), "meets_threshold")?,
        ),
        ProfileKind::Job => (
            raw.evidence_needed,
            raw.minimum_threshold.as_ref().and_then(loose_text),
            None,
        ),
    };

    Ok(VariableRecord {
        name,
        category,
        present,
        evidence: evidence.unwrap_or_default(),
        description: raw.description.or(raw.details),
        proficiency: raw
            .proficiency_level
            .as_deref()
            .and_then(ProficiencyLevel::parse_loose),
        threshold,
        meets_threshold,
        bonus_value: raw
            .bonus_value
            .or(raw.value_level)
            .as_deref()
            .and_then(BonusValue::parse_loose),
    })
}

/// Accepts JSON booleans and the string forms models sometimes emit ("true", "yes").
fn loose_bool(value: Option<&Value>, field: &str) -> Result<Option<bool>, String> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" => Ok(Some(true)),
            "false" | "no" => Ok(Some(false)),
            other => Err(format!("'{field}' is not a boolean: '{other}'")),
        },
        Some(other) => Err(format!("'{field}' is not a boolean: {other}")),
    }
}

fn loose_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences, then any prose around the
/// outermost JSON object.
fn strip_wrapping(text: &str) -> &str {
    let text = text.trim();
    let unfenced = if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    };

    match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => &unfenced[start..=end],
        _ => unfenced,
    }
}

/// Serializes a profile header map for prompts and logs.
pub fn overview_summary(overview: &Map<String, Value>) -> String {
    overview
        .iter()
        .filter_map(|(k, v)| loose_text(v).map(|t| format!("{k}={t}")))
        .collect::<Vec<_>>()
        .join(", ")
}
