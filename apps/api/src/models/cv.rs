use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::extraction::cleaning::{de_headline, de_string_list};

/// When the record was produced, plus any sections that degraded to empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    /// YYYYMMDD
    pub extraction_date: String,
    /// HHMMSS
    pub extraction_time: String,
    /// ISO-8601
    pub extraction_datetime: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_sections: Vec<String>,
}

impl ExtractionMetadata {
    pub fn stamped(at: DateTime<Local>) -> Self {
        Self {
            extraction_date: at.format("%Y%m%d").to_string(),
            extraction_time: at.format("%H%M%S").to_string(),
            extraction_datetime: at.to_rfc3339(),
            failed_sections: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "de_headline")]
    pub headline: Option<String>,
    #[serde(default)]
    pub introduction: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "de_string_list")]
    pub responsibilities: Vec<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

impl ExperienceEntry {
    /// Non-empty roles in order of appearance. Duplicates are kept.
    pub fn roles(entries: &[ExperienceEntry]) -> Vec<String> {
        entries
            .iter()
            .filter_map(|e| e.role.as_deref())
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(String::from)
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EducationEntry {
    #[serde(default)]
    pub institution: Option<String>,
    #[serde(default)]
    pub degree: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default, deserialize_with = "de_string_list")]
    pub certifications: Vec<String>,
    #[serde(default, deserialize_with = "de_string_list")]
    pub academic_projects: Vec<String>,
}

/// Skill inference attached to a CV. Both skill lists hold at most `MAX_SKILLS` entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillsAnalysis {
    #[serde(default)]
    pub explicit_skills: Vec<String>,
    #[serde(default)]
    pub related_roles: Vec<String>,
    #[serde(default)]
    pub job_related_skills: Vec<String>,
}

/// The full structured CV as persisted to storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvRecord {
    pub metadata: ExtractionMetadata,
    #[serde(default)]
    pub identity: IdentityRecord,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default)]
    pub education: Vec<EducationEntry>,
    #[serde(default)]
    pub projects: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
    #[serde(default)]
    pub skills_analysis: SkillsAnalysis,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_metadata_stamp_formats() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let meta = ExtractionMetadata::stamped(at);
        assert_eq!(meta.extraction_date, "20240309");
        assert_eq!(meta.extraction_time, "070501");
        assert!(meta.extraction_datetime.starts_with("2024-03-09T07:05:01"));
        assert!(DateTime::parse_from_rfc3339(&meta.extraction_datetime).is_ok());
    }

    #[test]
    fn test_failed_sections_omitted_when_empty() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let json = serde_json::to_value(ExtractionMetadata::stamped(at)).unwrap();
        assert!(json.get("failed_sections").is_none());
    }

    #[test]
    fn test_absent_scalars_serialize_as_null() {
        let json = serde_json::to_value(IdentityRecord::default()).unwrap();
        assert!(json["email"].is_null());
        assert!(json["headline"].is_null());
    }

    #[test]
    fn test_experience_entry_defaults_missing_list() {
        let entry: ExperienceEntry =
            serde_json::from_str(r#"{"company": "Acme", "role": "Data Engineer"}"#).unwrap();
        assert!(entry.responsibilities.is_empty());
        assert_eq!(entry.start_date, None);
    }

    #[test]
    fn test_experience_roles_skips_blank_and_keeps_duplicates() {
        let experience = vec![
            ExperienceEntry {
                role: Some(" Data Engineer ".into()),
                ..Default::default()
            },
            ExperienceEntry {
                role: Some("  ".into()),
                ..Default::default()
            },
            ExperienceEntry::default(),
            ExperienceEntry {
                role: Some("Data Engineer".into()),
                ..Default::default()
            },
        ];
        assert_eq!(
            ExperienceEntry::roles(&experience),
            vec!["Data Engineer", "Data Engineer"]
        );
    }

    #[test]
    fn test_record_round_trips_through_storage_json() {
        let at = Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let record = CvRecord {
            metadata: ExtractionMetadata::stamped(at),
            identity: IdentityRecord {
                full_name: Some("Jane Doe".into()),
                ..Default::default()
            },
            experience: vec![],
            education: vec![],
            projects: vec!["Realtime dashboard".into()],
            certifications: vec![],
            skills_analysis: SkillsAnalysis::default(),
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: CvRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
