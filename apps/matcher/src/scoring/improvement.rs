//! Resume Improvement Loop and the end-to-end resume scoring pipeline.
//!
//! Flow: extract job keywords → embed resume and keyword list → cosine score →
//!       best-of-N rewrite loop → suggestions → `ScoringResult`.
//!
//! The loop is the one place that recovers locally: a failed rewrite or embedding
//! skips that attempt, and the best variant seen so far (possibly the original) is
//! always returned.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::MatchError;
use crate::llm_client::prompts::fill_template;
use crate::llm_client::{Embedder, SamplingConfig, TextGenerator};
use crate::scoring::keywords::extract_keywords;
use crate::scoring::prompts::IMPROVEMENT_PROMPT_TEMPLATE;
use crate::scoring::similarity::{cosine_similarity, EmbeddingComparator};

/// Number of keywords echoed in the "key skills" suggestion.
const HIGHLIGHT_KEYWORDS: usize = 10;
const WEAK_MATCH: f64 = 0.7;
const POOR_MATCH: f64 = 0.5;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// Inputs for one improvement run. Borrowed: the loop owns nothing but its best state.
#[derive(Debug, Clone, Copy)]
pub struct ImprovementRequest<'a> {
    pub resume_text: &'a str,
    pub job_description: &'a str,
    pub job_keywords: &'a [String],
    pub current_score: f64,
    pub job_keyword_embedding: &'a [f32],
    pub max_attempts: u32,
}

/// Outcome of scoring (and trying to improve) a resume against a job description.
/// Scores are cosine similarities in [-1, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringResult {
    pub original_score: f64,
    pub improved_score: f64,
    pub improved_resume: String,
    pub suggestions: Vec<String>,
    pub job_keywords: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Improvement loop
// ────────────────────────────────────────────────────────────────────────────

/// Bounded best-of-N resume rewriting.
pub struct ResumeImprover<'a> {
    generator: &'a dyn TextGenerator,
    comparator: EmbeddingComparator<'a>,
    sampling: SamplingConfig,
}

impl<'a> ResumeImprover<'a> {
    pub fn new(generator: &'a dyn TextGenerator, embedder: &'a dyn Embedder) -> Self {
        Self {
            generator,
            comparator: EmbeddingComparator::new(embedder),
            sampling: SamplingConfig::default(),
        }
    }

    /// Returns `(best_resume, best_score)` with `best_score >= request.current_score`.
    ///
    /// Each attempt rewrites the best resume so far, with the best score as feedback.
    /// Attempts run sequentially and a candidate replaces the best only when its
    /// score is strictly greater.
    pub async fn improve(&self, request: ImprovementRequest<'_>) -> (String, f64) {
        let mut best_resume = request.resume_text.to_string();
        let mut best_score = request.current_score;

        for attempt in 1..=request.max_attempts {
            match self.attempt(&request, &best_resume, best_score).await {
                Ok((candidate, score)) if score > best_score => {
                    info!(
                        "Attempt {attempt}/{}: improved score from {best_score:.4} to {score:.4}",
                        request.max_attempts
                    );
                    best_resume = candidate;
                    best_score = score;
                }
                Ok((_, score)) => {
                    info!(
                        "Attempt {attempt}/{}: score {score:.4} did not beat {best_score:.4}",
                        request.max_attempts
                    );
                }
                Err(e) => {
                    warn!("Improvement attempt {attempt} failed, skipping: {e}");
                }
            }
        }

        (best_resume, best_score)
    }

    async fn attempt(
        &self,
        request: &ImprovementRequest<'_>,
        resume_text: &str,
        score: f64,
    ) -> Result<(String, f64), MatchError> {
        let current_score = format!("{score:.4}");
        let job_keywords = request.job_keywords.join(", ");
        let prompt = fill_template(
            IMPROVEMENT_PROMPT_TEMPLATE,
            &[
                ("current_score", current_score.as_str()),
                ("job_description", request.job_description),
                ("job_keywords", job_keywords.as_str()),
                ("resume_text", resume_text),
            ],
        );

        let rewritten = self
            .generator
            .generate(&prompt, &self.sampling)
            .await
            .map_err(|e| MatchError::collaborator("resume rewrite", e))?;
        let rewritten = strip_code_fence(&rewritten).to_string();
        if rewritten.is_empty() {
            return Err(MatchError::Validation(
                "resume rewrite returned empty text".to_string(),
            ));
        }

        let embedding = self
            .comparator
            .embed(&rewritten, "rewritten resume embedding")
            .await?;
        let score = cosine_similarity(&embedding, request.job_keyword_embedding);
        Ok((rewritten, score))
    }
}

/// Removes a surrounding ```markdown / ```md / ``` fence from generated text.
fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest
        .strip_prefix("markdown")
        .or_else(|| rest.strip_prefix("md"))
        .unwrap_or(rest);
    rest.trim_end()
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}

// ────────────────────────────────────────────────────────────────────────────
// Scoring pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Scores a resume against a job description and tries to improve it.
pub struct ResumeScorer<'a> {
    improver: ResumeImprover<'a>,
    max_attempts: u32,
}

impl<'a> ResumeScorer<'a> {
    pub fn new(
        generator: &'a dyn TextGenerator,
        embedder: &'a dyn Embedder,
        max_attempts: u32,
    ) -> Self {
        Self {
            improver: ResumeImprover::new(generator, embedder),
            max_attempts,
        }
    }

    /// Steps:
    /// 1. extract_keywords(job_description)
    /// 2. embed the resume and the comma-joined keyword list
    /// 3. original score = cosine(resume, keywords)
    /// 4. improvement loop
    /// 5. suggestions
    ///
    /// Embedding failures in step 2 are returned; the loop in step 4 never fails.
    pub async fn score_resume(
        &self,
        resume_text: &str,
        job_description: &str,
    ) -> Result<ScoringResult, MatchError> {
        if resume_text.trim().is_empty() {
            return Err(MatchError::Validation("resume text cannot be empty".to_string()));
        }
        if job_description.trim().is_empty() {
            return Err(MatchError::Validation(
                "job description cannot be empty".to_string(),
            ));
        }

        // Step 1: Keywords
        let job_keywords = extract_keywords(job_description);
        info!("Extracted {} job keywords", job_keywords.len());
        let keyword_text = if job_keywords.is_empty() {
            warn!("No keywords in job description; embedding the full text instead");
            job_description.to_string()
        } else {
            job_keywords.join(", ")
        };

        // Step 2: Embeddings
        let comparator = &self.improver.comparator;
        let resume_embedding = comparator.embed(resume_text, "resume embedding").await?;
        let job_embedding = comparator
            .embed(&keyword_text, "job keyword embedding")
            .await?;

        // Step 3: Baseline
        let original_score = cosine_similarity(&resume_embedding, &job_embedding);
        info!("Original resume similarity: {original_score:.4}");

        // Step 4: Improvement loop
        let (improved_resume, improved_score) = self
            .improver
            .improve(ImprovementRequest {
                resume_text,
                job_description,
                job_keywords: &job_keywords,
                current_score: original_score,
                job_keyword_embedding: &job_embedding,
                max_attempts: self.max_attempts,
            })
            .await;

        // Step 5: Suggestions
        let suggestions = generate_suggestions(original_score, improved_score, &job_keywords);

        Ok(ScoringResult {
            original_score,
            improved_score,
            improved_resume,
            suggestions,
            job_keywords,
        })
    }
}

/// Human-readable suggestions from the before/after scores and job keywords.
pub fn generate_suggestions(
    original_score: f64,
    improved_score: f64,
    job_keywords: &[String],
) -> Vec<String> {
    let mut suggestions = Vec::new();

    if improved_score > original_score {
        suggestions.push(format!(
            "Resume improved from {} to {} match",
            percent(original_score),
            percent(improved_score)
        ));
    } else {
        suggestions.push(format!("Current resume match: {}", percent(original_score)));
    }

    let highlights: Vec<&str> = job_keywords
        .iter()
        .take(HIGHLIGHT_KEYWORDS)
        .map(String::as_str)
        .collect();
    suggestions.push(format!("Key skills to highlight: {}", highlights.join(", ")));

    if improved_score < WEAK_MATCH {
        suggestions.push(
            "Consider adding more specific technical skills mentioned in the job description"
                .to_string(),
        );
    }
    if improved_score < POOR_MATCH {
        suggestions
            .push("Resume may need significant restructuring to match job requirements".to_string());
    }

    suggestions
}

fn percent(score: f64) -> String {
    format!("{:.1}%", score * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::LlmError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Returns scripted rewrites in order and records every prompt.
    struct ScriptedGenerator {
        outputs: Mutex<VecDeque<Result<String, LlmError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn new(outputs: Vec<Result<&str, LlmError>>) -> Self {
            Self {
                outputs: Mutex::new(
                    outputs
                        .into_iter()
                        .map(|o| o.map(str::to_string))
                        .collect(),
                ),
                prompts: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, prompt: &str, sampling: &SamplingConfig) -> Result<String, LlmError> {
            assert_eq!(sampling.max_tokens, 4000);
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.outputs
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(LlmError::EmptyContent))
        }
    }

    /// "score:X" embeds to a unit vector whose cosine with `[1, 0]` is X;
    /// "fail..." errors; anything else embeds to `[1, 0]`.
    struct ScoreEmbedder;

    #[async_trait]
    impl Embedder for ScoreEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
            if text.starts_with("fail") {
                return Err(LlmError::Api {
                    status: 503,
                    message: "unavailable".to_string(),
                });
            }
            match text.strip_prefix("score:") {
                Some(rest) => {
                    let x: f32 = rest.split_whitespace().next().unwrap().parse().unwrap();
                    Ok(vec![x, (1.0 - x * x).sqrt()])
                }
                None => Ok(vec![1.0, 0.0]),
            }
        }
    }

    const JOB_EMBEDDING: [f32; 2] = [1.0, 0.0];

    fn request<'a>(keywords: &'a [String], current_score: f64, max_attempts: u32) -> ImprovementRequest<'a> {
        ImprovementRequest {
            resume_text: "score:0.5 original",
            job_description: "Rust engineer",
            job_keywords: keywords,
            current_score,
            job_keyword_embedding: &JOB_EMBEDDING,
            max_attempts,
        }
    }

    #[tokio::test]
    async fn test_best_of_n_selection() {
        let generator = ScriptedGenerator::new(vec![Ok("score:0.6"), Ok("score:0.9"), Ok("score:0.7")]);
        let improver = ResumeImprover::new(&generator, &ScoreEmbedder);
        let keywords = vec!["rust".to_string()];

        let (resume, score) = improver.improve(request(&keywords, 0.5, 3)).await;

        assert_eq!(resume, "score:0.9");
        assert!((score - 0.9).abs() < 1e-6, "score={score}");
    }

    #[tokio::test]
    async fn test_never_regresses() {
        let generator = ScriptedGenerator::new(vec![Ok("score:0.2"), Ok("score:0.4"), Ok("score:0.5")]);
        let improver = ResumeImprover::new(&generator, &ScoreEmbedder);
        let keywords: Vec<String> = vec![];

        let (resume, score) = improver.improve(request(&keywords, 0.55, 3)).await;

        assert_eq!(resume, "score:0.5 original");
        assert_eq!(score, 0.55);
    }

    #[tokio::test]
    async fn test_all_attempts_failing_returns_original() {
        let generator = ScriptedGenerator::new(vec![
            Err(LlmError::RateLimited { retries: 3 }),
            Ok("fail to embed"),
            Ok("   "),
        ]);
        let improver = ResumeImprover::new(&generator, &ScoreEmbedder);
        let keywords: Vec<String> = vec![];

        let (resume, score) = improver.improve(request(&keywords, 0.5, 3)).await;

        assert_eq!(resume, "score:0.5 original");
        assert_eq!(score, 0.5);
        assert_eq!(generator.prompts.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_placeholder_text_in_job_description_stays_literal() {
        let generator = ScriptedGenerator::new(vec![Ok("score:0.6")]);
        let improver = ResumeImprover::new(&generator, &ScoreEmbedder);
        let keywords = vec!["rust".to_string()];
        let request = ImprovementRequest {
            job_description: "Paste {resume_text} here",
            ..request(&keywords, 0.5, 1)
        };

        improver.improve(request).await;

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts[0].matches("score:0.5 original").count(), 1);
        assert!(prompts[0].contains("Paste {resume_text} here"));
    }

    #[tokio::test]
    async fn test_failed_attempt_is_skipped_not_fatal() {
        let generator = ScriptedGenerator::new(vec![
            Err(LlmError::EmptyContent),
            Ok("score:0.8"),
        ]);
        let improver = ResumeImprover::new(&generator, &ScoreEmbedder);
        let keywords: Vec<String> = vec![];

        let (resume, score) = improver.improve(request(&keywords, 0.5, 2)).await;

        assert_eq!(resume, "score:0.8");
        assert!(score > 0.79);
    }

    #[tokio::test]
    async fn test_feedback_uses_running_best() {
        let generator = ScriptedGenerator::new(vec![Ok("score:0.6"), Ok("score:0.55")]);
        let improver = ResumeImprover::new(&generator, &ScoreEmbedder);
        let keywords = vec!["rust".to_string(), "tokio".to_string()];

        improver.improve(request(&keywords, 0.5, 2)).await;

        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].contains("score is 0.5000"));
        assert!(prompts[0].contains("score:0.5 original"));
        assert!(prompts[0].contains("rust, tokio"));
        assert!(prompts[1].contains("score is 0.6000"));
        assert!(prompts[1].contains("```\nscore:0.6\n```"));
    }

    #[tokio::test]
    async fn test_zero_attempts_makes_no_calls() {
        let generator = ScriptedGenerator::new(vec![]);
        let improver = ResumeImprover::new(&generator, &ScoreEmbedder);
        let keywords: Vec<String> = vec![];

        let (resume, score) = improver.improve(request(&keywords, 0.1, 0)).await;

        assert_eq!((resume.as_str(), score), ("score:0.5 original", 0.1));
        assert!(generator.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fenced_rewrite_is_unwrapped() {
        let generator = ScriptedGenerator::new(vec![Ok("```markdown\nscore:0.95\n```")]);
        let improver = ResumeImprover::new(&generator, &ScoreEmbedder);
        let keywords: Vec<String> = vec![];

        let (resume, _) = improver.improve(request(&keywords, 0.5, 1)).await;

        assert_eq!(resume, "score:0.95");
    }

    #[tokio::test]
    async fn test_score_resume_end_to_end() {
        let generator = ScriptedGenerator::new(vec![Ok("score:0.8")]);
        let scorer = ResumeScorer::new(&generator, &ScoreEmbedder, 1);

        let result = scorer
            .score_resume("score:0.3 Jane Doe", "Python Python Python Java Java")
            .await
            .unwrap();

        assert_eq!(result.job_keywords, vec!["python", "java"]);
        assert!((result.original_score - 0.3).abs() < 1e-6);
        assert!((result.improved_score - 0.8).abs() < 1e-6);
        assert_eq!(result.improved_resume, "score:0.8");
        assert_eq!(
            result.suggestions,
            vec![
                "Resume improved from 30.0% to 80.0% match".to_string(),
                "Key skills to highlight: python, java".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_score_resume_surfaces_embedding_failure() {
        let generator = ScriptedGenerator::new(vec![]);
        let scorer = ResumeScorer::new(&generator, &ScoreEmbedder, 3);

        let err = scorer
            .score_resume("fail resume", "Rust engineer")
            .await
            .unwrap_err();

        assert!(matches!(err, MatchError::Collaborator { ref stage, .. } if stage == "resume embedding"));
    }

    #[tokio::test]
    async fn test_score_resume_rejects_empty_inputs() {
        let generator = ScriptedGenerator::new(vec![]);
        let scorer = ResumeScorer::new(&generator, &ScoreEmbedder, 3);
        assert!(scorer.score_resume("", "job").await.is_err());
        assert!(scorer.score_resume("resume", "  ").await.is_err());
    }

    #[test]
    fn test_suggestions_for_unimproved_weak_match() {
        let keywords: Vec<String> = (0..15).map(|i| format!("kw{i}")).collect();
        let suggestions = generate_suggestions(0.42, 0.42, &keywords);

        assert_eq!(suggestions[0], "Current resume match: 42.0%");
        assert_eq!(
            suggestions[1],
            "Key skills to highlight: kw0, kw1, kw2, kw3, kw4, kw5, kw6, kw7, kw8, kw9"
        );
        assert_eq!(suggestions.len(), 4);
        assert!(suggestions[3].contains("significant restructuring"));
    }

    #[test]
    fn test_suggestions_for_strong_match() {
        let suggestions = generate_suggestions(0.75, 0.8, &["rust".to_string()]);
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0], "Resume improved from 75.0% to 80.0% match");
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```md\n# Jane\n```"), "# Jane");
        assert_eq!(strip_code_fence("```\n# Jane\n```"), "# Jane");
        assert_eq!(strip_code_fence("  # Jane  "), "# Jane");
    }
}
