use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{Datelike, Local};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::BotError;
use crate::schedule::extractor::ScheduleExtractor;
use crate::schedule::model::GroupSchedule;
use crate::schedule::sheet::read_workbook;
use crate::services::transfer::HttpTransfer;
use crate::utils::lazy_regex;

/// Where group schedules come from.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn fetch_schedules(&self) -> Result<Vec<GroupSchedule>, BotError>;
}

/// Workbooks already present on disk.
pub struct FileScheduleSource {
    paths: Vec<PathBuf>,
}

impl FileScheduleSource {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }
}

#[async_trait]
impl ScheduleSource for FileScheduleSource {
    async fn fetch_schedules(&self) -> Result<Vec<GroupSchedule>, BotError> {
        extract_in_background(self.paths.clone()).await
    }
}

/// The university timetable page: every linked workbook served by the
/// `webservice` endpoint is downloaded and parsed.
pub struct WebScheduleSource {
    index_url: String,
    transfer: HttpTransfer,
    download_dir: PathBuf,
}

impl WebScheduleSource {
    pub fn new(index_url: impl Into<String>, transfer: HttpTransfer, download_dir: PathBuf) -> Self {
        Self {
            index_url: index_url.into(),
            transfer,
            download_dir,
        }
    }

    /// Downloads go to a per-index directory under the system temp dir.
    pub fn in_temp_dir(index_url: impl Into<String>, transfer: HttpTransfer) -> Self {
        let index_url = index_url.into();
        let download_dir = std::env::temp_dir().join(url_digest(&index_url));
        Self::new(index_url, transfer, download_dir)
    }
}

#[async_trait]
impl ScheduleSource for WebScheduleSource {
    async fn fetch_schedules(&self) -> Result<Vec<GroupSchedule>, BotError> {
        let page = self
            .transfer
            .get_string(&self.index_url)
            .await?
            .ok_or_else(|| BotError::Schedule(format!("{} is unavailable", self.index_url)))?;

        tokio::fs::create_dir_all(&self.download_dir).await?;

        let mut paths = Vec::new();
        for url in workbook_links(&page) {
            let Some(bytes) = self.transfer.get_bytes(&url).await? else {
                warn!("Skipping workbook {}: download failed", url);
                continue;
            };
            let path = self.download_dir.join(format!("{}.xlsx", url_digest(&url)));
            tokio::fs::write(&path, bytes).await?;
            paths.push(path);
        }

        info!("Downloaded {} timetable workbooks from {}", paths.len(), self.index_url);
        extract_in_background(paths).await
    }
}

/// `href` targets on the timetable page that point at workbook downloads.
pub fn workbook_links(html: &str) -> Vec<String> {
    lazy_regex!(r#"href="(?P<raw>[^"]*)""#)
        .captures_iter(html)
        .filter_map(|caps| caps.name("raw"))
        .map(|m| m.as_str().to_string())
        .filter(|href| href.contains("webservice"))
        .collect()
}

fn url_digest(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url);
    format!("{:x}", hasher.finalize())
}

/// Parses every sheet of every workbook; unreadable files are logged and skipped.
pub fn extract_workbooks(paths: &[PathBuf], extractor: ScheduleExtractor) -> Vec<GroupSchedule> {
    paths
        .iter()
        .flat_map(|path| match extract_workbook(path, extractor) {
            Ok(schedules) => schedules,
            Err(e) => {
                warn!("{}", e);
                Vec::new()
            }
        })
        .collect()
}

fn extract_workbook(path: &Path, extractor: ScheduleExtractor) -> Result<Vec<GroupSchedule>, BotError> {
    let book = read_workbook(path)?;
    Ok(book
        .get_sheet_collection()
        .iter()
        .flat_map(|sheet| extractor.extract_sheet(sheet))
        .collect())
}

async fn extract_in_background(paths: Vec<PathBuf>) -> Result<Vec<GroupSchedule>, BotError> {
    let extractor = ScheduleExtractor::new(Local::now().year());
    tokio::task::spawn_blocking(move || extract_workbooks(&paths, extractor))
        .await
        .map_err(|e| BotError::Schedule(format!("Extraction task failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workbook_links_filters_webservice() {
        let html = r#"
            <a href="https://example.org/about">About</a>
            <a href="https://webservice.example.org/files/1.xlsx">IIT</a> <a href="https://webservice.example.org/files/2.xlsx">IRI</a>
        "#;
        let links = workbook_links(html);
        assert_eq!(
            links,
            vec![
                "https://webservice.example.org/files/1.xlsx".to_string(),
                "https://webservice.example.org/files/2.xlsx".to_string(),
            ]
        );
    }

    #[test]
    fn test_url_digest_is_stable_hex() {
        let digest = url_digest("https://webservice.example.org/files/1.xlsx");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, url_digest("https://webservice.example.org/files/1.xlsx"));
        assert_ne!(digest, url_digest("https://webservice.example.org/files/2.xlsx"));
    }

    #[tokio::test]
    async fn test_file_source_skips_unreadable_workbooks() {
        let source = FileScheduleSource::new(vec![PathBuf::from("/nonexistent/a.xlsx")]);
        let schedules = source.fetch_schedules().await.unwrap();
        assert!(schedules.is_empty());
    }
}
