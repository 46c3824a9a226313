//! CV Extraction Orchestrator: PDF bytes to a complete `CvRecord`.
//!
//! Flow: decode text → five field agents (concurrent) → resolve roles →
//!       select skills → assemble.
//!
//! Text decoding is CPU-bound and runs on the blocking pool. The five agents only
//! read the CV text, so they run concurrently; the record is assembled after all
//! of them settle. The skill reference is loaded at most once per call, and only
//! when the skill stages need it.

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{AgentFailurePolicy, PipelineConfig};
use crate::extraction::agents::{
    run_agent, AgentError, CertificationsAgent, EducationAgent, ExperienceAgent, IdentityAgent,
    ProjectsAgent, Section,
};
use crate::extraction::cleaning::block_key;
use crate::llm_client::StructuredCompletion;
use crate::models::cv::{
    CvRecord, EducationEntry, ExperienceEntry, ExtractionMetadata, IdentityRecord, SkillsAnalysis,
};
use crate::pdf::{TextExtractionError, TextExtractor};
use crate::skills::reference::{ReferenceError, ReferenceStore};
use crate::skills::selector::analyze_skills;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error(transparent)]
    Text(#[from] TextExtractionError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// The five agent outputs, before skills are attached.
#[derive(Debug, Default)]
struct FieldSections {
    identity: IdentityRecord,
    experience: Vec<ExperienceEntry>,
    education: Vec<EducationEntry>,
    projects: Vec<String>,
    certifications: Vec<String>,
    failed: Vec<Section>,
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Runs the full pipeline over an uploaded PDF.
pub async fn extract_cv_from_pdf(
    pdf: Bytes,
    extractor: Arc<TextExtractor>,
    llm: &dyn StructuredCompletion,
    config: &PipelineConfig,
) -> Result<CvRecord, ExtractionError> {
    // Stage 1: decode text
    let raw_text = tokio::task::spawn_blocking(move || extractor.extract(&pdf)).await??;
    info!("Extracted {} characters of CV text", raw_text.len());

    extract_cv_from_text(&raw_text, llm, config).await
}

/// Runs every stage after text decoding.
pub async fn extract_cv_from_text(
    raw_text: &str,
    llm: &dyn StructuredCompletion,
    config: &PipelineConfig,
) -> Result<CvRecord, ExtractionError> {
    // Stage 2: field agents
    let sections = run_field_agents(raw_text, llm, config).await?;
    info!(
        "Field agents finished: {} experience, {} education, {} projects, {} certifications",
        sections.experience.len(),
        sections.education.len(),
        sections.projects.len(),
        sections.certifications.len()
    );

    // Stages 3 and 4: resolve roles, select skills
    let skills_analysis = resolve_skills(&sections.experience, raw_text, config).await?;

    // Stage 5: assemble
    Ok(assemble(sections, skills_analysis, Local::now()))
}

async fn run_field_agents(
    raw_text: &str,
    llm: &dyn StructuredCompletion,
    config: &PipelineConfig,
) -> Result<FieldSections, ExtractionError> {
    let timeout = config.agent_timeout;

    match config.failure_policy {
        AgentFailurePolicy::AllOrNothing => {
            let (identity, experience, education, projects, certifications) = tokio::try_join!(
                run_agent::<IdentityAgent>(llm, raw_text, timeout),
                run_agent::<ExperienceAgent>(llm, raw_text, timeout),
                run_agent::<EducationAgent>(llm, raw_text, timeout),
                run_agent::<ProjectsAgent>(llm, raw_text, timeout),
                run_agent::<CertificationsAgent>(llm, raw_text, timeout),
            )?;
            Ok(FieldSections {
                identity,
                experience: experience.experiences,
                education: education.education,
                projects: projects.projects,
                certifications: certifications.certifications,
                failed: Vec::new(),
            })
        }
        AgentFailurePolicy::Degrade => {
            let (identity, experience, education, projects, certifications) = tokio::join!(
                run_agent::<IdentityAgent>(llm, raw_text, timeout),
                run_agent::<ExperienceAgent>(llm, raw_text, timeout),
                run_agent::<EducationAgent>(llm, raw_text, timeout),
                run_agent::<ProjectsAgent>(llm, raw_text, timeout),
                run_agent::<CertificationsAgent>(llm, raw_text, timeout),
            );

            let mut failed = Vec::new();
            let identity = settle(identity, &mut failed);
            let experience = settle(experience.map(|o| o.experiences), &mut failed);
            let education = settle(education.map(|o| o.education), &mut failed);
            let projects = settle(projects.map(|o| o.projects), &mut failed);
            let certifications = settle(certifications.map(|o| o.certifications), &mut failed);

            Ok(FieldSections {
                identity,
                experience,
                education,
                projects,
                certifications,
                failed,
            })
        }
    }
}

/// Unwraps a section result, falling back to the empty value and recording the section.
fn settle<T: Default>(result: Result<T, AgentError>, failed: &mut Vec<Section>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!("Degrading section after agent failure: {e}");
            failed.push(e.section());
            T::default()
        }
    }
}

/// Matches experience roles against the reference and selects skills.
/// The reference is not touched when there is nothing to match and no scan was asked for.
async fn resolve_skills(
    experience: &[ExperienceEntry],
    raw_text: &str,
    config: &PipelineConfig,
) -> Result<SkillsAnalysis, ExtractionError> {
    let roles = ExperienceEntry::roles(experience);

    if roles.is_empty() && !config.scan_skills_without_role {
        info!("No experience roles extracted, skipping skill analysis");
        return Ok(SkillsAnalysis::default());
    }

    let dir = config.reference_data_dir.clone();
    let store = tokio::task::spawn_blocking(move || ReferenceStore::load_dir(&dir)).await??;

    let analysis = analyze_skills(&store, &roles, raw_text, config.scan_skills_without_role);
    info!(
        "Matched {} of {} roles, {} job-related and {} explicit skills",
        analysis.related_roles.len(),
        roles.len(),
        analysis.job_related_skills.len(),
        analysis.explicit_skills.len()
    );
    Ok(analysis)
}

fn assemble(
    sections: FieldSections,
    skills_analysis: SkillsAnalysis,
    at: DateTime<Local>,
) -> CvRecord {
    let FieldSections {
        identity,
        experience,
        education,
        projects,
        certifications,
        failed,
    } = sections;

    let projects = detach_from_education(projects, &education, |e| &e.academic_projects);
    let certifications = detach_from_education(certifications, &education, |e| &e.certifications);

    let mut metadata = ExtractionMetadata::stamped(at);
    metadata.failed_sections = failed.iter().map(|s| s.as_str().to_string()).collect();

    CvRecord {
        metadata,
        identity,
        experience,
        education,
        projects,
        certifications,
        skills_analysis,
    }
}

/// Drops top-level items that already appear under an education entry.
/// An item listed under a degree belongs there and nowhere else.
fn detach_from_education<F>(items: Vec<String>, education: &[EducationEntry], nested: F) -> Vec<String>
where
    F: Fn(&EducationEntry) -> &Vec<String>,
{
    let owned: HashSet<String> = education
        .iter()
        .flat_map(|e| nested(e).iter())
        .map(|item| block_key(item))
        .collect();

    if owned.is_empty() {
        return items;
    }

    items
        .into_iter()
        .filter(|item| !owned.contains(&block_key(item)))
        .collect()
}
