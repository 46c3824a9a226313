//! Partial update of the latest parsed CV.
//!
//! The stored document is edited as JSON so every key this update does not name,
//! including keys unknown to `CvRecord`, comes back out exactly as it went in.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::storage::{CvStore, ObjectKind};

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("No fields provided for update")]
    Empty,

    #[error("No parsed CVs found for user {0}")]
    NotFound(Uuid),

    #[error("Stored CV {key} is not a JSON object")]
    InvalidDocument { key: String },

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Sparse identity edit plus an optional replacement for the explicit skills.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CvUpdate {
    pub full_name: Option<String>,
    pub headline: Option<String>,
    pub introduction: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub selected_skills: Option<Vec<String>>,
}

impl CvUpdate {
    fn identity_fields(&self) -> [(&'static str, Option<&String>); 6] {
        [
            ("full_name", self.full_name.as_ref()),
            ("headline", self.headline.as_ref()),
            ("introduction", self.introduction.as_ref()),
            ("email", self.email.as_ref()),
            ("phone", self.phone.as_ref()),
            ("location", self.location.as_ref()),
        ]
    }

    /// Names of the fields this update sets.
    pub fn provided_fields(&self) -> Vec<&'static str> {
        let mut fields: Vec<&'static str> = self
            .identity_fields()
            .into_iter()
            .filter_map(|(name, value)| value.map(|_| name))
            .collect();
        if self.selected_skills.is_some() {
            fields.push("selected_skills");
        }
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.provided_fields().is_empty()
    }
}

/// Applies `update` to a stored CV document.
///
/// Provided identity keys are overwritten, absent ones left alone. A provided skill
/// list replaces `skills_analysis.explicit_skills` and nothing else. Missing
/// `identity` or `skills_analysis` objects are created.
pub fn apply_update(document: &mut Map<String, Value>, update: &CvUpdate) {
    let provided: Vec<_> = update
        .identity_fields()
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect();

    if !provided.is_empty() {
        edit_object(document, "identity", |identity| {
            for (name, value) in provided {
                identity.insert(name.to_string(), Value::String(value.clone()));
            }
        });
    }

    if let Some(skills) = &update.selected_skills {
        edit_object(document, "skills_analysis", |analysis| {
            analysis.insert(
                "explicit_skills".to_string(),
                Value::Array(skills.iter().cloned().map(Value::String).collect()),
            );
        });
    }
}

/// Runs `edit` on the object at `key`, replacing a missing or non-object value first.
fn edit_object<F>(document: &mut Map<String, Value>, key: &str, edit: F)
where
    F: FnOnce(&mut Map<String, Value>),
{
    if !matches!(document.get(key), Some(Value::Object(_))) {
        document.insert(key.to_string(), Value::Object(Map::new()));
    }
    if let Some(Value::Object(map)) = document.get_mut(key) {
        edit(map);
    }
}

/// Loads the user's latest parsed CV, applies `update` and writes it back in place.
/// Returns the storage key of the updated document.
pub async fn update_latest_cv(
    store: &dyn CvStore,
    user_id: Uuid,
    update: &CvUpdate,
) -> Result<String, UpdateError> {
    if update.is_empty() {
        return Err(UpdateError::Empty);
    }

    let latest = store
        .latest(user_id, ObjectKind::Parsed)
        .await?
        .ok_or(UpdateError::NotFound(user_id))?;

    let mut document = match serde_json::from_slice::<Value>(&latest.bytes) {
        Ok(Value::Object(map)) => map,
        _ => return Err(UpdateError::InvalidDocument { key: latest.key }),
    };

    apply_update(&mut document, update);
    store.overwrite(&latest.key, &Value::Object(document)).await?;

    info!("CV updated: {:?}", update.provided_fields());
    Ok(latest.key)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use serde_json::json;

    use super::*;
    use crate::storage::MemoryCvStore;

    fn stored_cv() -> Map<String, Value> {
        let value = json!({
            "metadata": {"extraction_date": "20240101", "extraction_time": "120000",
                         "extraction_datetime": "2024-01-01T12:00:00+00:00"},
            "identity": {"full_name": "Jane Doe", "headline": "Engineer", "phone": "123",
                         "email": null, "introduction": null, "location": null},
            "experience": [{"company": "Acme", "role": "Data Engineer",
                            "responsibilities": ["Built pipelines"]}],
            "education": [],
            "projects": [],
            "certifications": [],
            "skills_analysis": {"explicit_skills": ["sql"], "related_roles": ["data engineer"],
                                "job_related_skills": ["python", "sql"]},
            "reviewer_notes": "kept as-is"
        });
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_headline_update_preserves_everything_else() {
        let original = stored_cv();
        let mut document = original.clone();
        let update = CvUpdate {
            headline: Some("X".into()),
            ..Default::default()
        };

        apply_update(&mut document, &update);

        assert_eq!(document["identity"]["headline"], "X");
        assert_eq!(document["identity"]["phone"], "123");
        assert_eq!(document["experience"], original["experience"]);
        assert_eq!(document["skills_analysis"], original["skills_analysis"]);
        assert_eq!(document["reviewer_notes"], "kept as-is");
    }

    #[test]
    fn test_key_order_is_preserved() {
        let original = stored_cv();
        let mut document = original.clone();
        apply_update(
            &mut document,
            &CvUpdate {
                email: Some("jane@example.com".into()),
                ..Default::default()
            },
        );
        let before: Vec<_> = original.keys().collect();
        let after: Vec<_> = document.keys().collect();
        assert_eq!(before, after);
        let identity_keys: Vec<_> = document["identity"]
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(
            identity_keys,
            vec!["full_name", "headline", "phone", "email", "introduction", "location"]
        );
    }

    #[test]
    fn test_selected_skills_replace_only_explicit_skills() {
        let mut document = stored_cv();
        apply_update(
            &mut document,
            &CvUpdate {
                selected_skills: Some(vec!["rust".into(), "kafka".into()]),
                ..Default::default()
            },
        );
        assert_eq!(
            document["skills_analysis"]["explicit_skills"],
            json!(["rust", "kafka"])
        );
        assert_eq!(
            document["skills_analysis"]["job_related_skills"],
            json!(["python", "sql"])
        );
        assert_eq!(document["identity"]["full_name"], "Jane Doe");
    }

    #[test]
    fn test_missing_sections_are_created() {
        let mut document = Map::new();
        apply_update(
            &mut document,
            &CvUpdate {
                full_name: Some("Jane".into()),
                selected_skills: Some(vec![]),
                ..Default::default()
            },
        );
        assert_eq!(document["identity"], json!({"full_name": "Jane"}));
        assert_eq!(document["skills_analysis"], json!({"explicit_skills": []}));
    }

    #[test]
    fn test_empty_update_detection() {
        assert!(CvUpdate::default().is_empty());
        let update: CvUpdate = serde_json::from_str(r#"{"phone": null}"#).unwrap();
        assert!(update.is_empty());
        let update: CvUpdate = serde_json::from_str(r#"{"selected_skills": []}"#).unwrap();
        assert_eq!(update.provided_fields(), vec!["selected_skills"]);
    }

    #[tokio::test]
    async fn test_update_latest_rewrites_newest_document_in_place() {
        let store = MemoryCvStore::new();
        let user = Uuid::new_v4();
        store
            .put_parsed(user, "old", "20240101_000000", &Value::Object(stored_cv()))
            .await
            .unwrap();
        let newest = store
            .put_parsed(user, "new", "20240201_000000", &Value::Object(stored_cv()))
            .await
            .unwrap();

        let update = CvUpdate {
            headline: Some("X".into()),
            ..Default::default()
        };
        let key = update_latest_cv(&store, user, &update).await.unwrap();
        assert_eq!(key, newest);

        let saved: Value = serde_json::from_slice(&store.get(&newest).await.unwrap().unwrap()).unwrap();
        assert_eq!(saved["identity"]["headline"], "X");
        assert_eq!(saved["identity"]["phone"], "123");

        let old_key = key.replace("20240201_000000_new", "20240101_000000_old");
        let old: Value = serde_json::from_slice(&store.get(&old_key).await.unwrap().unwrap()).unwrap();
        assert_eq!(old["identity"]["headline"], "Engineer");
    }

    #[tokio::test]
    async fn test_update_without_parsed_cv_is_not_found() {
        let store = MemoryCvStore::new();
        let user = Uuid::new_v4();
        let update = CvUpdate {
            phone: Some("555".into()),
            ..Default::default()
        };
        let err = update_latest_cv(&store, user, &update).await.unwrap_err();
        assert!(matches!(err, UpdateError::NotFound(id) if id == user));
    }

    #[tokio::test]
    async fn test_empty_update_is_rejected_before_storage() {
        let store = MemoryCvStore::new();
        let err = update_latest_cv(&store, Uuid::new_v4(), &CvUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, UpdateError::Empty));
    }

    #[tokio::test]
    async fn test_non_object_document_is_rejected() {
        let store = MemoryCvStore::new();
        let user = Uuid::new_v4();
        store
            .put_raw_pdf(user, "cv", "20240101_000000", Bytes::from_static(b"%PDF"))
            .await
            .unwrap();
        store
            .put_parsed(user, "cv", "20240101_000000", &json!([1, 2]))
            .await
            .unwrap();
        let update = CvUpdate {
            phone: Some("555".into()),
            ..Default::default()
        };
        let err = update_latest_cv(&store, user, &update).await.unwrap_err();
        assert!(matches!(err, UpdateError::InvalidDocument { .. }));
    }
}
