//! Field Extraction Agents: one LLM call per CV section.
//!
//! Every agent receives the full CV text and returns a schema-validated section.
//! Agents never see each other's output and hold no state between calls, so the
//! orchestrator is free to run all five concurrently.
//!
//! Schema enforcement lives in the output types: a reply missing the section's
//! top-level key, or whose top level is not an object, fails deserialization and
//! surfaces as `AgentError::Schema`. List items are cleaned on the way in.

use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::extraction::cleaning::de_string_list;
use crate::extraction::prompts::{
    CERTIFICATIONS_PROMPT, EDUCATION_PROMPT, EXPERIENCE_PROMPT, IDENTITY_PROMPT, PROJECTS_PROMPT,
};
use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, NO_INVENTION_INSTRUCTION};
use crate::llm_client::{complete_json, LlmError, StructuredCompletion};
use crate::models::cv::{EducationEntry, ExperienceEntry, IdentityRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Identity,
    Experience,
    Education,
    Projects,
    Certifications,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Identity => "identity",
            Section::Experience => "experience",
            Section::Education => "education",
            Section::Projects => "projects",
            Section::Certifications => "certifications",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("{section} agent: completion failed: {source}")]
    Completion {
        section: Section,
        #[source]
        source: LlmError,
    },

    #[error("{section} agent: reply does not match the section schema: {detail}")]
    Schema { section: Section, detail: String },

    #[error("{section} agent: no reply within {}s", .timeout.as_secs())]
    Timeout { section: Section, timeout: Duration },
}

impl AgentError {
    pub fn section(&self) -> Section {
        match self {
            AgentError::Completion { section, .. }
            | AgentError::Schema { section, .. }
            | AgentError::Timeout { section, .. } => *section,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Section outputs
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ExperienceOutput {
    pub experiences: Vec<ExperienceEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EducationOutput {
    pub education: Vec<EducationEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectsOutput {
    #[serde(deserialize_with = "de_string_list")]
    pub projects: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CertificationsOutput {
    #[serde(deserialize_with = "de_string_list")]
    pub certifications: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Agents
// ────────────────────────────────────────────────────────────────────────────

/// A stateless extractor for one CV section.
pub trait FieldAgent {
    type Output: DeserializeOwned + Send;
    const SECTION: Section;
    const TEMPLATE: &'static str;
}

pub struct IdentityAgent;

impl FieldAgent for IdentityAgent {
    type Output = IdentityRecord;
    const SECTION: Section = Section::Identity;
    const TEMPLATE: &'static str = IDENTITY_PROMPT;
}

pub struct ExperienceAgent;

impl FieldAgent for ExperienceAgent {
    type Output = ExperienceOutput;
    const SECTION: Section = Section::Experience;
    const TEMPLATE: &'static str = EXPERIENCE_PROMPT;
}

pub struct EducationAgent;

impl FieldAgent for EducationAgent {
    type Output = EducationOutput;
    const SECTION: Section = Section::Education;
    const TEMPLATE: &'static str = EDUCATION_PROMPT;
}

pub struct ProjectsAgent;

impl FieldAgent for ProjectsAgent {
    type Output = ProjectsOutput;
    const SECTION: Section = Section::Projects;
    const TEMPLATE: &'static str = PROJECTS_PROMPT;
}

pub struct CertificationsAgent;

impl FieldAgent for CertificationsAgent {
    type Output = CertificationsOutput;
    const SECTION: Section = Section::Certifications;
    const TEMPLATE: &'static str = CERTIFICATIONS_PROMPT;
}

/// Fills a template with the CV text. The CV text goes in last so it cannot
/// inject the `{no_invention}` placeholder.
pub fn build_prompt(template: &str, cv_text: &str) -> String {
    template
        .replace("{no_invention}", NO_INVENTION_INSTRUCTION)
        .replace("{cv_text}", cv_text)
}

/// Runs agent `A` once over the full CV text, bounded by `timeout`.
/// No retry happens here: transport retries belong to the completion backend.
pub async fn run_agent<A: FieldAgent>(
    llm: &dyn StructuredCompletion,
    cv_text: &str,
    timeout: Duration,
) -> Result<A::Output, AgentError> {
    let section = A::SECTION;
    let prompt = build_prompt(A::TEMPLATE, cv_text);

    let outcome = tokio::time::timeout(
        timeout,
        complete_json::<A::Output>(llm, &prompt, JSON_ONLY_SYSTEM),
    )
    .await;

    match outcome {
        Ok(Ok(output)) => {
            debug!("{section} agent succeeded");
            Ok(output)
        }
        Ok(Err(LlmError::Parse(e))) => {
            warn!("{section} agent returned an invalid reply: {e}");
            Err(AgentError::Schema {
                section,
                detail: e.to_string(),
            })
        }
        Ok(Err(LlmError::EmptyContent)) => {
            warn!("{section} agent returned an empty reply");
            Err(AgentError::Schema {
                section,
                detail: LlmError::EmptyContent.to_string(),
            })
        }
        Ok(Err(source)) => Err(AgentError::Completion { section, source }),
        Err(_) => {
            warn!("{section} agent timed out after {}s", timeout.as_secs());
            Err(AgentError::Timeout { section, timeout })
        }
    }
}
