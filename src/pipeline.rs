use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    ai::{ModelClient, ScoreError, Scorer},
    db::reports::ReportRepository,
    domain::AnalysisResult,
    extractor::PageExtractor,
    infrastructure::shutdown::ShutdownListener,
};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to extract useful data from the site. It may be blocking our scraper or is empty.")]
    NoUsableData,
    #[error(transparent)]
    Scoring(#[from] ScoreError),
    #[error("audit was cancelled")]
    Cancelled,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResponse {
    pub success: bool,
    pub data: AnalysisResult,
    pub metadata: ResponseMetadata,
    pub report_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ResponseMetadata {
    pub title: String,
    pub description: String,
}

pub struct AuditPipeline<C> {
    extractor: PageExtractor,
    scorer: Scorer<C>,
    reports: ReportRepository,
}

impl<C: ModelClient> AuditPipeline<C> {
    pub fn new(extractor: PageExtractor, scorer: Scorer<C>, reports: ReportRepository) -> Self {
        Self {
            extractor,
            scorer,
            reports,
        }
    }

    /// Extract, score, persist. Storage failures are logged and do not fail the audit.
    pub async fn analyze(
        &self,
        url: &str,
        shutdown: &mut ShutdownListener,
    ) -> Result<AuditResponse, PipelineError> {
        let summary = tokio::select! {
            biased;
            _ = shutdown.notified() => return Err(PipelineError::Cancelled),
            summary = self.extractor.extract(url) => summary,
        };
        info!(
            target: "pipeline",
            url,
            simulated = summary.is_simulated,
            "extraction finished"
        );

        if !summary.has_usable_data() {
            return Err(PipelineError::NoUsableData);
        }

        let analysis = match self.scorer.score(&summary, shutdown).await {
            Ok(analysis) => analysis,
            Err(ScoreError::Cancelled) => return Err(PipelineError::Cancelled),
            Err(err) => return Err(err.into()),
        };

        let report_id = match self.reports.insert(&summary, &analysis).await {
            Ok(id) => {
                info!(target: "pipeline", report_id = id, url, "report stored");
                Some(id)
            }
            Err(err) => {
                warn!(target: "db", error = %err, url, "failed to store report; returning analysis anyway");
                None
            }
        };

        Ok(AuditResponse {
            success: true,
            data: analysis,
            metadata: ResponseMetadata {
                title: summary.title,
                description: summary.description,
            },
            report_id,
        })
    }
}
