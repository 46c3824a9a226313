//! Skill Selector. Bounded, deterministic skill inference from matched roles.

use crate::models::cv::SkillsAnalysis;
use crate::skills::matcher::match_roles;
use crate::skills::reference::ReferenceStore;

/// Upper bound on both skill lists of a `SkillsAnalysis`.
pub const MAX_SKILLS: usize = 20;

/// Union of the matched titles' skills, sorted ascending, first `MAX_SKILLS` kept.
/// The same cap applies however many roles matched.
pub fn job_related_skills<S: AsRef<str>>(store: &ReferenceStore, matched_titles: &[S]) -> Vec<String> {
    store
        .skills_for_jobs(matched_titles)
        .into_iter()
        .take(MAX_SKILLS)
        .collect()
}

/// Reference skills that appear verbatim (case-insensitive) in the CV text,
/// in reference order, first `MAX_SKILLS` kept.
pub fn explicit_skills(raw_text: &str, reference_skills: &[String]) -> Vec<String> {
    let haystack = raw_text.to_lowercase();
    reference_skills
        .iter()
        .filter(|skill| !skill.is_empty() && haystack.contains(skill.to_lowercase().as_str()))
        .take(MAX_SKILLS)
        .cloned()
        .collect()
}

/// Resolves roles and selects skills.
///
/// With no matched role both skill lists stay empty unless `scan_without_role` is set,
/// in which case explicit-skill scanning still runs.
pub fn analyze_skills<S: AsRef<str>>(
    store: &ReferenceStore,
    experience_roles: &[S],
    raw_text: &str,
    scan_without_role: bool,
) -> SkillsAnalysis {
    let related_roles = match_roles(experience_roles, &store.job_titles());

    if related_roles.is_empty() && !scan_without_role {
        return SkillsAnalysis::default();
    }

    let job_related_skills = job_related_skills(store, &related_roles);
    let explicit_skills = explicit_skills(raw_text, &store.all_skills());

    SkillsAnalysis {
        explicit_skills,
        related_roles,
        job_related_skills,
    }
}
