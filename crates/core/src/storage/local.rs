use crate::config::Settings;
use crate::error::{MacroError, Result};
use crate::storage::ReportStorage;
use crate::time::kst::{parse_report_key, report_key};
use chrono::NaiveDate;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// One markdown file per day under `root`: `<root>/<yyyymmdd>.md`. Saving
/// twice on the same day overwrites.
#[derive(Debug, Clone)]
pub struct LocalReportStorage {
    root: PathBuf,
}

impl LocalReportStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.report_storage_root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.root.join(format!("{}.md", report_key(date)))
    }

    async fn read_optional(path: &Path) -> Result<Option<String>> {
        match tokio::fs::read_to_string(path).await {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(MacroError::Storage {
                op: "read",
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Newest report file name. Only `yyyymmdd.md` names count, so stray
    /// files in the directory are ignored.
    async fn latest_date(&self) -> Result<Option<NaiveDate>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(MacroError::Storage {
                    op: "list",
                    path: self.root.clone(),
                    source,
                })
            }
        };

        let mut latest: Option<NaiveDate> = None;
        loop {
            let entry = entries.next_entry().await.map_err(|source| MacroError::Storage {
                op: "list",
                path: self.root.clone(),
                source,
            })?;
            let Some(entry) = entry else { break };

            let name = entry.file_name();
            let Some(date) = name
                .to_str()
                .and_then(|n| n.strip_suffix(".md"))
                .and_then(parse_report_key)
            else {
                continue;
            };
            if latest.map_or(true, |l| date > l) {
                latest = Some(date);
            }
        }
        Ok(latest)
    }
}

#[async_trait::async_trait]
impl ReportStorage for LocalReportStorage {
    async fn save_for_date(&self, date: NaiveDate, markdown: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| MacroError::Storage {
                op: "create_dir",
                path: self.root.clone(),
                source,
            })?;

        let path = self.path_for(date);
        tokio::fs::write(&path, markdown)
            .await
            .map_err(|source| MacroError::Storage {
                op: "write",
                path: path.clone(),
                source,
            })?;

        tracing::info!(path = %path.display(), bytes = markdown.len(), "report saved");
        Ok(path)
    }

    async fn load_latest(&self) -> Result<Option<String>> {
        match self.latest_date().await? {
            Some(date) => Self::read_optional(&self.path_for(date)).await,
            None => Ok(None),
        }
    }

    async fn load_for_date(&self, date: NaiveDate) -> Result<Option<String>> {
        Self::read_optional(&self.path_for(date)).await
    }
}
