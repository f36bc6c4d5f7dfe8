//! Metadata write-back collaborator.
//!
//! The default implementation hands the patch to exiftool as a JSON tag file
//! and lets it rewrite the document in place.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use uuid::Uuid;

use crate::error::{EmbedRefError, Result};
use crate::record::Patch;

#[async_trait]
pub trait MetadataWriter: Send + Sync {
    /// Apply the patch to the document at `path`, additively.
    async fn apply(&self, path: &Path, patch: &Patch) -> Result<()>;
}

pub struct ExiftoolWriter {
    command: String,
}

impl ExiftoolWriter {
    pub fn new() -> Self {
        Self {
            command: "exiftool".to_string(),
        }
    }

    pub fn with_command(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    fn error(path: &Path, message: impl Into<String>) -> EmbedRefError {
        EmbedRefError::WriteBack {
            path: path.display().to_string(),
            message: message.into(),
        }
    }

    fn temp_tag_file() -> PathBuf {
        std::env::temp_dir().join(format!("embedref-{}.json", Uuid::new_v4()))
    }
}

impl Default for ExiftoolWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataWriter for ExiftoolWriter {
    async fn apply(&self, path: &Path, patch: &Patch) -> Result<()> {
        let tag_file = Self::temp_tag_file();
        let json =
            serde_json::to_vec(patch).map_err(|e| Self::error(path, e.to_string()))?;
        tokio::fs::write(&tag_file, json)
            .await
            .map_err(|e| Self::error(path, e.to_string()))?;

        let status = Command::new(&self.command)
            .arg(format!("-j={}", tag_file.display()))
            .arg("-overwrite_original_in_place")
            .arg(path)
            .status()
            .await;

        let _ = tokio::fs::remove_file(&tag_file).await;

        let status = status.map_err(|e| Self::error(path, e.to_string()))?;
        if !status.success() {
            return Err(Self::error(
                path,
                format!("{} exited with {status}", self.command),
            ));
        }
        Ok(())
    }
}
