use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde_json::json;
use tokio::time::timeout;

use crate::{
    ai::{GeminiClient, RetryPolicy, Scorer},
    cli::Command,
    config::AppConfig,
    db::{self, reports::ReportRepository},
    domain::{ScoreBand, VerdictTier},
    extractor::PageExtractor,
    infrastructure::{directories::ResolvedPaths, shutdown::Shutdown},
    pipeline::AuditPipeline,
};

const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct AuditApp {
    pipeline: AuditPipeline<GeminiClient>,
    reports: ReportRepository,
    shutdown: Shutdown,
}

impl AuditApp {
    /// Builds every long-lived handle once; requests share them afterwards.
    pub async fn initialize(
        config: AppConfig,
        paths: ResolvedPaths,
        shutdown: Shutdown,
    ) -> Result<Self> {
        let pool = db::init_pool(&paths.db_path).await?;
        let reports = ReportRepository::new(pool);

        let http_client = Client::builder()
            .user_agent(format!("seo-audit-rust/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;

        let extractor = PageExtractor::new(http_client.clone(), config.extractor.clone());
        let gemini = GeminiClient::new(http_client, config.gemini.clone());
        let scorer = Scorer::new(
            gemini,
            config.gemini.models.clone(),
            RetryPolicy::from(&config.retry),
        );
        tracing::info!(
            target: "app",
            db = %paths.db_path.display(),
            logs = %paths.logs_dir.display(),
            models = ?config.gemini.models,
            max_attempts = config.retry.max_attempts,
            "scorer configured"
        );

        Ok(Self {
            pipeline: AuditPipeline::new(extractor, scorer, reports.clone()),
            reports,
            shutdown,
        })
    }

    pub async fn run(self, command: Command) -> Result<()> {
        let result = match command {
            Command::Analyze { url, deadline } => self.analyze(&url, deadline).await,
            Command::Show { id } => self.show(id).await,
            Command::List { limit } => self.list(limit).await,
        };

        if timeout(CLOSE_TIMEOUT, self.reports.close()).await.is_err() {
            tracing::warn!(
                target: "db",
                "report database did not close within {:?}",
                CLOSE_TIMEOUT
            );
        }
        result
    }

    async fn analyze(&self, url: &str, deadline: Option<u64>) -> Result<()> {
        if let Some(secs) = deadline {
            self.shutdown.trigger_after(Duration::from_secs(secs));
        }
        let mut listener = self.shutdown.subscribe();

        let response = self.pipeline.analyze(url, &mut listener).await?;
        println!("{}", serde_json::to_string_pretty(&response)?);
        Ok(())
    }

    async fn show(&self, id: i64) -> Result<()> {
        let Some(report) = self.reports.find(id).await? else {
            bail!("report {id} not found");
        };
        let analysis = report.analysis()?;
        let view = json!({
            "id": report.id,
            "url": report.url,
            "title": report.title,
            "description": report.description,
            "authorityScore": report.authority_score,
            "verdict": report.verdict,
            "executiveSummary": report.executive_summary,
            "createdAt": report.created_at,
            "data": analysis,
        });
        println!("{}", serde_json::to_string_pretty(&view)?);
        Ok(())
    }

    async fn list(&self, limit: u32) -> Result<()> {
        let rows = self.reports.recent(limit).await?;
        if rows.is_empty() {
            println!("no reports stored yet");
            return Ok(());
        }
        for row in rows {
            let score = u32::try_from(row.authority_score).unwrap_or(0);
            let tier = VerdictTier::detect(&row.verdict)
                .map(|tier| tier.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "#{:<5} {:>3} {:<8} {:<10} {}  {}  {}",
                row.id,
                row.authority_score,
                ScoreBand::from_score(score),
                tier,
                row.created_at.format("%Y-%m-%d %H:%M"),
                row.url,
                row.title
            );
        }
        Ok(())
    }
}
