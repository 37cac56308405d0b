// Prompt constants for resume rewriting.
// `{current_score}` is the running best similarity, formatted to 4 decimals.

/// Resume rewrite prompt. Replace `{current_score}`, `{job_description}`,
/// `{job_keywords}` and `{resume_text}`.
pub const IMPROVEMENT_PROMPT_TEMPLATE: &str = r#"You are an expert resume editor and talent acquisition specialist. Revise the resume below so that it aligns as closely as possible with the job description and the extracted job keywords, maximizing the cosine similarity between the resume and the job keywords.

Instructions:
- Review the job description and the list of extracted job keywords.
- Emphasize relevant skills and experience, and weave the job keywords into the resume where they fit naturally.
- Rewrite, add or remove content as needed to match the job requirements.
- Keep a natural, professional tone. Do not stuff keywords.
- Prefer quantifiable achievements and action verbs.
- The current cosine similarity score is {current_score}. Revise the resume to increase it.
- Output ONLY the improved resume in Markdown, with no commentary before or after it.

Job Description:
```
{job_description}
```

Extracted Job Keywords:
```
{job_keywords}
```

Resume:
```
{resume_text}
```"#;
