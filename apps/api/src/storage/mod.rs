//! CV storage: raw uploads and parsed JSON, keyed per user.
//!
//! Layout:
//!   {user_id}/raw/{YYYYMMDD_HHMMSS}_{cv_name}.pdf
//!   {user_id}/parsed/{YYYYMMDD_HHMMSS}_{cv_name}.json
//!
//! "Latest" is decided by the timestamp prefix of the file name, not by object
//! metadata, so an overwritten parsed CV keeps its place.

use std::collections::BTreeMap;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use chrono::{DateTime, Local};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

const PDF_CONTENT_TYPE: &str = "application/pdf";
const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Raw,
    Parsed,
}

impl ObjectKind {
    fn folder(&self) -> &'static str {
        match self {
            ObjectKind::Raw => "raw",
            ObjectKind::Parsed => "parsed",
        }
    }

    fn extension(&self) -> &'static str {
        match self {
            ObjectKind::Raw => "pdf",
            ObjectKind::Parsed => "json",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key: String,
    pub bytes: Bytes,
}

/// Key timestamp, `YYYYMMDD_HHMMSS`.
pub fn timestamp(at: DateTime<Local>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}

/// File stem of an uploaded file name, safe to embed in a key.
pub fn cv_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(file_name);
    let stem = match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => base,
    };
    let cleaned: String = stem
        .trim()
        .chars()
        .map(|c| if c.is_control() { '_' } else { c })
        .collect();
    if cleaned.is_empty() {
        "cv".to_string()
    } else {
        cleaned
    }
}

pub fn object_key(user_id: Uuid, kind: ObjectKind, timestamp: &str, cv_name: &str) -> String {
    format!(
        "{}/{}/{}_{}.{}",
        user_id,
        kind.folder(),
        timestamp,
        cv_name,
        kind.extension()
    )
}

fn prefix(user_id: Uuid, kind: ObjectKind) -> String {
    format!("{}/{}/", user_id, kind.folder())
}

/// Picks the newest key: greatest `YYYYMMDD_HHMMSS` file-name prefix, ties broken by key.
fn newest_key<I: IntoIterator<Item = String>>(keys: I) -> Option<String> {
    keys.into_iter().max_by(|a, b| {
        sort_stamp(a)
            .cmp(sort_stamp(b))
            .then_with(|| a.cmp(b))
    })
}

fn sort_stamp(key: &str) -> &str {
    let name = key.rsplit('/').next().unwrap_or(key);
    let mut parts = name.splitn(3, '_');
    match (parts.next(), parts.next()) {
        (Some(date), Some(time)) => &name[..date.len() + 1 + time.len()],
        _ => name,
    }
}

fn to_pretty_json(cv_data: &Value) -> Result<Bytes> {
    let json = serde_json::to_vec_pretty(cv_data).context("Failed to serialize CV JSON")?;
    Ok(Bytes::from(json))
}

/// Persistence for uploaded CVs and their parsed records.
#[async_trait]
pub trait CvStore: Send + Sync {
    async fn put_raw_pdf(
        &self,
        user_id: Uuid,
        cv_name: &str,
        timestamp: &str,
        pdf: Bytes,
    ) -> Result<String>;

    async fn put_parsed(
        &self,
        user_id: Uuid,
        cv_name: &str,
        timestamp: &str,
        cv_data: &Value,
    ) -> Result<String>;

    async fn latest_key(&self, user_id: Uuid, kind: ObjectKind) -> Result<Option<String>>;

    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Replaces the JSON stored at an existing key.
    async fn overwrite(&self, key: &str, cv_data: &Value) -> Result<()>;

    async fn latest(&self, user_id: Uuid, kind: ObjectKind) -> Result<Option<StoredObject>> {
        let Some(key) = self.latest_key(user_id, kind).await? else {
            return Ok(None);
        };
        let bytes = self
            .get(&key)
            .await?
            .ok_or_else(|| anyhow!("Object {key} disappeared after listing"))?;
        Ok(Some(StoredObject { key, bytes }))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// S3 / MinIO
// ────────────────────────────────────────────────────────────────────────────

pub struct S3CvStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3CvStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| anyhow!("S3 upload failed: {e}"))?;

        info!("Uploaded s3://{}/{}", self.bucket, key);
        Ok(())
    }
}

#[async_trait]
impl CvStore for S3CvStore {
    async fn put_raw_pdf(
        &self,
        user_id: Uuid,
        cv_name: &str,
        timestamp: &str,
        pdf: Bytes,
    ) -> Result<String> {
        let key = object_key(user_id, ObjectKind::Raw, timestamp, cv_name);
        self.put(&key, pdf, PDF_CONTENT_TYPE).await?;
        Ok(key)
    }

    async fn put_parsed(
        &self,
        user_id: Uuid,
        cv_name: &str,
        timestamp: &str,
        cv_data: &Value,
    ) -> Result<String> {
        let key = object_key(user_id, ObjectKind::Parsed, timestamp, cv_name);
        self.put(&key, to_pretty_json(cv_data)?, JSON_CONTENT_TYPE)
            .await?;
        Ok(key)
    }

    async fn latest_key(&self, user_id: Uuid, kind: ObjectKind) -> Result<Option<String>> {
        let prefix = prefix(user_id, kind);
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&prefix);
            if let Some(token) = continuation.take() {
                request = request.continuation_token(token);
            }
            let page = request
                .send()
                .await
                .map_err(|e| anyhow!("S3 list failed: {e}"))?;

            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key())
                    .map(String::from),
            );

            match page.next_continuation_token() {
                Some(token) if page.is_truncated() == Some(true) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(newest_key(keys))
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    return Ok(None);
                }
                return Err(anyhow!("S3 download failed: {e}"));
            }
        };

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| anyhow!("S3 download of {key} failed: {e}"))?;
        Ok(Some(data.into_bytes()))
    }

    async fn overwrite(&self, key: &str, cv_data: &Value) -> Result<()> {
        self.put(key, to_pretty_json(cv_data)?, JSON_CONTENT_TYPE)
            .await
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory
// ────────────────────────────────────────────────────────────────────────────

/// Process-local store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryCvStore {
    objects: RwLock<BTreeMap<String, Bytes>>,
}

impl MemoryCvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CvStore for MemoryCvStore {
    async fn put_raw_pdf(
        &self,
        user_id: Uuid,
        cv_name: &str,
        timestamp: &str,
        pdf: Bytes,
    ) -> Result<String> {
        let key = object_key(user_id, ObjectKind::Raw, timestamp, cv_name);
        self.objects.write().await.insert(key.clone(), pdf);
        Ok(key)
    }

    async fn put_parsed(
        &self,
        user_id: Uuid,
        cv_name: &str,
        timestamp: &str,
        cv_data: &Value,
    ) -> Result<String> {
        let key = object_key(user_id, ObjectKind::Parsed, timestamp, cv_name);
        let body = to_pretty_json(cv_data)?;
        self.objects.write().await.insert(key.clone(), body);
        Ok(key)
    }

    async fn latest_key(&self, user_id: Uuid, kind: ObjectKind) -> Result<Option<String>> {
        let prefix = prefix(user_id, kind);
        let objects = self.objects.read().await;
        Ok(newest_key(
            objects
                .range(prefix.clone()..)
                .take_while(|(key, _)| key.starts_with(&prefix))
                .map(|(key, _)| key.clone()),
        ))
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        Ok(self.objects.read().await.get(key).cloned())
    }

    async fn overwrite(&self, key: &str, cv_data: &Value) -> Result<()> {
        let body = to_pretty_json(cv_data)?;
        let mut objects = self.objects.write().await;
        match objects.get_mut(key) {
            Some(slot) => {
                *slot = body;
                Ok(())
            }
            None => Err(anyhow!("No stored object at {key}")),
        }
    }
}
