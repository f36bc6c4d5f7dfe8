//! Local page-text extraction collaborator.
//!
//! Text extraction is not implemented here; the default collaborator shells
//! out to `pdftotext` for the first page under a fixed budget. Exceeding the
//! budget means the strategy is skipped for that document.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;

use crate::error::{EmbedRefError, Result};

#[async_trait]
pub trait PageTextExtractor: Send + Sync {
    async fn first_page_text(&self, path: &Path) -> Result<String>;
}

pub struct PdftotextExtractor {
    command: String,
    budget: Duration,
}

impl PdftotextExtractor {
    pub fn new(budget: Duration) -> Self {
        Self {
            command: "pdftotext".to_string(),
            budget,
        }
    }

    pub fn with_command(command: impl Into<String>, budget: Duration) -> Self {
        Self {
            command: command.into(),
            budget,
        }
    }

    fn error(path: &Path, message: impl Into<String>) -> EmbedRefError {
        EmbedRefError::PageText {
            path: path.display().to_string(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl PageTextExtractor for PdftotextExtractor {
    async fn first_page_text(&self, path: &Path) -> Result<String> {
        let child = Command::new(&self.command)
            .arg("-l")
            .arg("1")
            .arg(path)
            .arg("-")
            .output();

        let output = timeout(self.budget, child)
            .await
            .map_err(|_| {
                Self::error(path, format!("timed out after {}ms", self.budget.as_millis()))
            })?
            .map_err(|e| Self::error(path, e.to_string()))?;

        if !output.status.success() {
            return Err(Self::error(
                path,
                format!("{} exited with {}", self.command, output.status),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
