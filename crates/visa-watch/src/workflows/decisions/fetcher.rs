use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("download returned HTTP {status}")]
    Status { status: u16 },
    #[error("download failed: {0}")]
    Transport(String),
    #[error("could not stage download at {}: {source}", .path.display())]
    Staging {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Source of the published spreadsheet bytes.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch_document(&self, url: &Url) -> Result<Vec<u8>, FetchError>;
}

/// Downloaded spreadsheet, owned by the run that fetched it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    bytes: Vec<u8>,
}

impl RawDocument {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Single local file that holds the latest download. Each run overwrites it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingSlot {
    path: Option<PathBuf>,
}

impl StagingSlot {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Keeps downloads in memory only.
    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn store(&self, bytes: &[u8]) -> Result<(), FetchError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        tokio::fs::write(path, bytes)
            .await
            .map_err(|source| FetchError::Staging {
                path: path.clone(),
                source,
            })
    }
}

pub struct RecordFetcher<D> {
    source: Arc<D>,
    staging: StagingSlot,
}

impl<D> RecordFetcher<D>
where
    D: DocumentSource + 'static,
{
    pub fn new(source: Arc<D>, staging: StagingSlot) -> Self {
        Self { source, staging }
    }

    /// Downloads the document fully and stages a copy before handing the
    /// bytes on.
    pub async fn fetch(&self, url: &Url) -> Result<RawDocument, FetchError> {
        let bytes = self.source.fetch_document(url).await?;
        self.staging.store(&bytes).await?;

        info!(
            %url,
            bytes = bytes.len(),
            staged = ?self.staging.path(),
            "visa decision file downloaded"
        );

        Ok(RawDocument::new(bytes))
    }
}
