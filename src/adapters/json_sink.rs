//! JSON report sink (stdout or file).

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::domain::ports::ReportSink;
use crate::error::Result;
use crate::report::Report;

#[derive(Debug, Clone, Default)]
pub struct JsonReportSink {
    /// `None` writes to stdout
    path: Option<PathBuf>,
}

impl JsonReportSink {
    pub fn stdout() -> Self {
        Self { path: None }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn render(report: &Report) -> Result<String> {
        Ok(serde_json::to_string_pretty(report)?)
    }
}

#[async_trait]
impl ReportSink for JsonReportSink {
    async fn emit(&self, report: &Report) -> Result<()> {
        let mut body = Self::render(report)?;
        body.push('\n');

        match &self.path {
            Some(path) => {
                tokio::fs::write(path, body.as_bytes()).await?;
                info!(path = %path.display(), buckets = report.totals.buckets, "Report written");
            }
            None => {
                let mut stdout = tokio::io::stdout();
                stdout.write_all(body.as_bytes()).await?;
                stdout.flush().await?;
            }
        }
        Ok(())
    }
}
