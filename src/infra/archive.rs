//! File-backed content repository.
//!
//! The whole site lives in one TOML document:
//!
//! ```toml
//! [profile]
//! blog_name = "Field Notes"
//!
//! [[series]]
//! id = 1
//! name = "Getting started"
//!
//! [[content]]
//! id = 1
//! slug = "hello-world"
//! title = "Hello, world"
//! created_at = "2024-01-02T10:00:00Z"
//!
//! [[trash]]
//! deleted_at = "2024-02-01T00:00:00Z"
//! [trash.record]
//! id = 2
//! # ...
//! ```
//!
//! Timestamps are RFC 3339 strings. A missing file reads as an empty site.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::info;

use crate::application::repos::{ContentRepo, RepoError};
use crate::domain::entities::{ContentRecord, SeriesRecord, SiteProfile};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<SiteProfile>,
    pub series: Vec<SeriesRecord>,
    pub content: Vec<ContentRecord>,
    pub trash: Vec<TrashedContent>,
}

/// Content removed by an editor, kept until the retention window passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrashedContent {
    #[serde(with = "time::serde::rfc3339")]
    pub deleted_at: OffsetDateTime,
    pub record: ContentRecord,
}

/// [`ContentRepo`] over a TOML archive on disk.
pub struct TomlArchiveRepo {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl TomlArchiveRepo {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read_document(&self) -> Result<ArchiveDocument, RepoError> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(ArchiveDocument::default()),
            Err(err) => {
                return Err(RepoError::from_persistence(format!(
                    "failed to read `{}`: {err}",
                    self.path.display()
                )));
            }
        };

        toml::from_str(&data).map_err(|err| {
            RepoError::malformed(format!("invalid archive `{}`: {err}", self.path.display()))
        })
    }

    /// Write through a sibling temporary file so readers never see a partial
    /// document.
    pub async fn write_document(&self, document: &ArchiveDocument) -> Result<(), RepoError> {
        let encoded = toml::to_string_pretty(document)
            .map_err(|err| RepoError::malformed(format!("failed to encode archive: {err}")))?;

        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(RepoError::from_persistence)?;
        }
        tokio::fs::write(&staging, encoded)
            .await
            .map_err(RepoError::from_persistence)?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(RepoError::from_persistence)
    }
}

#[async_trait]
impl ContentRepo for TomlArchiveRepo {
    async fn load_all_content(&self) -> Result<Vec<ContentRecord>, RepoError> {
        Ok(self.read_document().await?.content)
    }

    async fn load_all_series(&self) -> Result<Vec<SeriesRecord>, RepoError> {
        Ok(self.read_document().await?.series)
    }

    async fn load_or_create_profile(
        &self,
        defaults: SiteProfile,
    ) -> Result<SiteProfile, RepoError> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.read_document().await?;
        if let Some(profile) = document.profile {
            return Ok(profile);
        }

        document.profile = Some(defaults.clone());
        self.write_document(&document).await?;
        info!(
            target = "quire::infra::archive",
            path = %self.path.display(),
            blog_name = %defaults.blog_name,
            "Stored default site profile"
        );
        Ok(defaults)
    }

    async fn purge_trashed(&self, before: OffsetDateTime) -> Result<usize, RepoError> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.read_document().await?;

        let total = document.trash.len();
        document.trash.retain(|entry| entry.deleted_at >= before);
        let removed = total - document.trash.len();

        if removed > 0 {
            self.write_document(&document).await?;
        }
        Ok(removed)
    }
}
