// Prompt constants for structured variable extraction.
// Placeholders are replaced by `matching::extraction` before sending; document
// text is always substituted last.

/// System prompt for job posting extraction.
pub const JOB_EXTRACTION_SYSTEM: &str = "You are an expert HR analyst and job requirements specialist. \
    Extract exactly 22 structured variables from a job description for systematic candidate matching: \
    5 critical requirements (must-haves that disqualify if missing), \
    8 core competencies (key skills and abilities for job success), \
    4 experience factors (experience-related requirements) and \
    5 preferred qualifications (nice-to-haves). \
    Be specific and measurable, and only extract requirements that can be verified from a resume.";

/// Job extraction prompt. Replace `{job_title}`, `{company}` and `{job_description}`.
pub const JOB_EXTRACTION_TEMPLATE: &str = r#"Analyze this job posting and extract exactly 22 variables for candidate matching.

JOB TITLE: {job_title}
COMPANY: {company}

Return a JSON object with this EXACT shape:
{
  "job_analysis": {
    "title": "job title",
    "company": "company",
    "industry": "detected industry",
    "seniority_level": "entry/mid/senior/executive",
    "job_type": "technical/business/creative/etc"
  },
  "critical_requirements": {
    "req_1": {"variable": "requirement name", "description": "details", "evidence_needed": "what to look for in a resume", "disqualifier": true}
    // req_1 .. req_5
  },
  "core_competencies": {
    "comp_1": {"variable": "skill name", "description": "details", "evidence_needed": "what to look for", "proficiency_level": "beginner/intermediate/advanced/expert"}
    // comp_1 .. comp_8
  },
  "experience_factors": {
    "exp_1": {"variable": "experience requirement", "description": "details", "evidence_needed": "what to look for", "minimum_threshold": "specific measurement"}
    // exp_1 .. exp_4
  },
  "preferred_qualifications": {
    "pref_1": {"variable": "preferred qualification", "description": "details", "evidence_needed": "what to look for", "bonus_value": "low/medium/high"}
    // pref_1 .. pref_5
  }
}

Each variable must be specific, verifiable from resume content, relevant to job success and distinct from the others.

JOB DESCRIPTION:
{job_description}"#;

/// System prompt for resume extraction.
pub const CANDIDATE_EXTRACTION_SYSTEM: &str = "You are an expert resume analyzer. \
    Extract exactly 22 structured variables from a candidate resume that correspond to job requirements: \
    5 critical requirements, 8 core competencies, 4 experience factors and 5 preferred qualifications. \
    Provide specific evidence from the resume for each variable and be honest about missing qualifications.";

/// Resume extraction prompt. Replace `{job_variables}`, `{resume_data}` and `{resume_text}`.
pub const CANDIDATE_EXTRACTION_TEMPLATE: &str = r#"Analyze this candidate's resume and extract exactly 22 variables for job matching.

VARIABLES TO ASSESS (slot N of each category must assess job variable N):
{job_variables}

STRUCTURED RESUME DATA:
{resume_data}

Return a JSON object with this EXACT shape:
{
  "candidate_analysis": {
    "name": "candidate name",
    "years_total_experience": "calculated total years",
    "current_level": "entry/mid/senior/executive",
    "primary_expertise": "main area of expertise",
    "industry_background": "industry experience"
  },
  "critical_requirements": {
    "req_1": {"variable": "education/certification/license", "present": true, "evidence": "quote from resume or 'Not found'", "details": "details"}
    // req_1 .. req_5
  },
  "core_competencies": {
    "comp_1": {"variable": "skill", "present": true, "evidence": "quote or 'Not found'", "proficiency_level": "beginner/intermediate/advanced/expert", "years_experience": "estimated years"}
    // comp_1 .. comp_8
  },
  "experience_factors": {
    "exp_1": {"variable": "experience type", "present": true, "evidence": "quote or 'Not found'", "measurement": "years/projects/etc", "meets_threshold": true}
    // exp_1 .. exp_4
  },
  "preferred_qualifications": {
    "pref_1": {"variable": "qualification", "present": false, "evidence": "quote or 'Not found'", "value_level": "low/medium/high"}
    // pref_1 .. pref_5
  }
}

RESUME TEXT:
{resume_text}"#;

/// Used in place of `{job_variables}` when no job profile is available.
pub const OPEN_VARIABLES_HINT: &str =
    "No job variables supplied. Choose the 22 variables that best describe this candidate.";
