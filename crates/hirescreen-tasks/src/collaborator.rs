//! External analysis collaborator: a black box that scores one candidate
//! against one job from a structured prompt.

use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use hirescreen_core::{AppConfig, CandidateRecord, JobRequirement, MatchResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::CollaboratorError;
use crate::response::parse_analysis_response;
use crate::retry::Backoff;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);
const MAX_ERROR_BODY_CHARS: usize = 512;

const SYSTEM_PROMPT: &str = "You are a recruiting analyst. Score how well the candidate fits \
the job on a 0-100 scale. Reply with a single JSON object with the fields: \
score (integer 0-100), recommendation (one of strong_match, match, weak_match, no_match), \
breakdown (object of non-negative integer points per dimension: skill, experience, \
education, location, industry; the points must add up to score), \
matched_skills (array of strings), matched_companies (array of strings), \
summary (one or two sentences).";

#[async_trait]
pub trait AnalysisCollaborator: Send + Sync {
    /// Scores `candidate` against `job`, labelling the result with `scope_key`.
    async fn analyze(
        &self,
        job: &JobRequirement,
        candidate: &CandidateRecord,
        scope_key: &str,
    ) -> Result<MatchResult, CollaboratorError>;
}

/// Collaborator backed by an OpenAI-compatible chat-completions endpoint.
pub struct ChatCompletionsCollaborator {
    client: Client,
    api_key: String,
    endpoint: Url,
    model: String,
    backoff: Backoff,
}

impl std::fmt::Debug for ChatCompletionsCollaborator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsCollaborator")
            .field("endpoint", &self.endpoint.as_str())
            .field("model", &self.model)
            .field("api_key", &"[redacted]")
            .field("retries", &self.backoff.retries)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionsCollaborator {
    /// Creates a collaborator pointed at the default endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`CollaboratorError::Http`] if the HTTP client cannot be built.
    pub fn new(api_key: &str, model: &str, timeout_secs: u64) -> Result<Self, CollaboratorError> {
        Self::with_base_url(api_key, model, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a collaborator with a custom base URL (e.g. a wiremock server).
    ///
    /// # Errors
    ///
    /// Returns [`CollaboratorError::Http`] if the HTTP client cannot be built,
    /// or [`CollaboratorError::Config`] if `base_url` is not a valid URL.
    pub fn with_base_url(
        api_key: &str,
        model: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, CollaboratorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("hirescreen/0.1 (candidate-screening)")
            .build()?;

        // Exactly one trailing slash so `join` appends instead of replacing
        // the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&normalised)
            .and_then(|base| base.join("chat/completions"))
            .map_err(|e| CollaboratorError::Config(format!("invalid base URL '{base_url}': {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            endpoint,
            model: model.to_owned(),
            backoff: Backoff {
                retries: 3,
                base: DEFAULT_BACKOFF_BASE,
            },
        })
    }

    /// Builds the collaborator from application config. Returns `Ok(None)`
    /// when no API key is configured.
    ///
    /// # Errors
    ///
    /// Same as [`ChatCompletionsCollaborator::with_base_url`].
    pub fn from_config(config: &AppConfig) -> Result<Option<Self>, CollaboratorError> {
        let Some(api_key) = config
            .analysis_api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
        else {
            return Ok(None);
        };
        let collaborator = Self::with_base_url(
            api_key,
            &config.analysis_model,
            config.analysis_timeout_secs,
            &config.analysis_base_url,
        )?
        .with_retries(config.analysis_max_retries, DEFAULT_BACKOFF_BASE);
        Ok(Some(collaborator))
    }

    #[must_use]
    pub fn with_retries(mut self, retries: u32, base: Duration) -> Self {
        self.backoff = Backoff { retries, base };
        self
    }

    async fn complete_once(&self, prompt: &str) -> Result<String, CollaboratorError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.2,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| CollaboratorError::Unparseable("reply has no message content".into()))
    }
}

#[async_trait]
impl AnalysisCollaborator for ChatCompletionsCollaborator {
    async fn analyze(
        &self,
        job: &JobRequirement,
        candidate: &CandidateRecord,
        scope_key: &str,
    ) -> Result<MatchResult, CollaboratorError> {
        let prompt = build_prompt(job, candidate);
        let reply = self.backoff.run(|| self.complete_once(&prompt)).await?;
        parse_analysis_response(&reply, candidate.id, scope_key)
    }
}

fn push_field(out: &mut String, label: &str, value: Option<&str>) {
    if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
        let _ = writeln!(out, "{label}: {value}");
    }
}

/// Renders the user prompt for one job/candidate pair.
#[must_use]
pub fn build_prompt(job: &JobRequirement, candidate: &CandidateRecord) -> String {
    let mut out = String::new();

    out.push_str("## Job\n");
    let _ = writeln!(out, "Title: {}", job.title.trim());
    if !job.keywords().is_empty() {
        let _ = writeln!(out, "Keywords: {}", job.keywords().join(", "));
    }
    if !job.target_locations().is_empty() {
        let _ = writeln!(out, "Locations: {}", job.target_locations().join(", "));
    }
    push_field(&mut out, "Requirements", Some(&job.requirement_text));

    let c = &candidate.content;
    out.push_str("\n## Candidate\n");
    push_field(&mut out, "Intention", c.intention.as_deref());
    push_field(&mut out, "Experience", c.experience.as_deref());
    push_field(&mut out, "Education", c.education.as_deref());
    push_field(&mut out, "Location", c.location.as_deref());
    push_field(&mut out, "Expected salary", c.expected_salary.as_deref());
    push_field(&mut out, "Self introduction", c.self_intro.as_deref());
    if !c.work_history.is_empty() {
        out.push_str("Work history:\n");
        for entry in &c.work_history {
            let parts: Vec<&str> = [
                entry.company.as_deref(),
                entry.title.as_deref(),
                entry.period.as_deref(),
                entry.description.as_deref(),
            ]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
            if !parts.is_empty() {
                let _ = writeln!(out, "- {}", parts.join(" | "));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use chrono::Utc;
    use hirescreen_core::{CandidateContent, WorkHistoryEntry};
    use uuid::Uuid;

    use super::*;

    fn candidate() -> CandidateRecord {
        let now = Utc::now();
        CandidateRecord {
            id: Uuid::new_v4(),
            external_id: "ext-1".into(),
            identity_key: "ext-1".into(),
            content: CandidateContent {
                intention: Some("销售经理".into()),
                experience: Some("5年".into()),
                education: Some("  ".into()),
                work_history: vec![WorkHistoryEntry {
                    company: Some("阿里巴巴".into()),
                    title: Some("销售".into()),
                    period: None,
                    description: None,
                }],
                ..CandidateContent::default()
            },
            content_hash: String::new(),
            structured: None,
            tags: BTreeSet::new(),
            analyses: BTreeMap::new(),
            crawled_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn prompt_includes_job_and_non_blank_candidate_fields() {
        let job = JobRequirement::from_keywords("Sales lead", vec!["销售".into()], vec!["上海".into()]);
        let prompt = build_prompt(&job, &candidate());
        assert!(prompt.contains("Title: Sales lead"));
        assert!(prompt.contains("Keywords: 销售"));
        assert!(prompt.contains("Locations: 上海"));
        assert!(prompt.contains("Experience: 5年"));
        assert!(prompt.contains("- 阿里巴巴 | 销售"));
        assert!(!prompt.contains("Education:"));
        assert!(!prompt.contains("Requirements:"));
    }

    #[test]
    fn rejects_invalid_base_url() {
        let err = ChatCompletionsCollaborator::with_base_url("k", "m", 5, "not a url").unwrap_err();
        assert!(matches!(err, CollaboratorError::Config(_)));
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = ChatCompletionsCollaborator::with_base_url("secret-key", "m", 5, "http://localhost:9")
            .unwrap();
        let rendered = format!("{c:?}");
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("http://localhost:9/chat/completions"));
    }
}
