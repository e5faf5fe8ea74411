use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{
    query, query_as,
    sqlite::{SqlitePool, SqliteRow},
    FromRow, Row,
};

use crate::domain::{AnalysisResult, PageSummary};

#[derive(Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Stores the scalar projections used for listing plus the full analysis blob.
    pub async fn insert(&self, summary: &PageSummary, analysis: &AnalysisResult) -> Result<i64> {
        let full_analysis =
            serde_json::to_string(analysis).context("failed to serialize analysis")?;

        let id = query(
            r#"INSERT INTO audit_reports
                (url, title, description, authority_score, verdict, executive_summary, full_analysis, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
        )
        .bind(summary.url.as_str())
        .bind(summary.title.as_str())
        .bind(summary.description.as_str())
        .bind(i64::from(analysis.authority_score))
        .bind(analysis.niche_verdict.as_str())
        .bind(analysis.executive_summary.as_str())
        .bind(full_analysis)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();
        Ok(id)
    }

    pub async fn find(&self, id: i64) -> Result<Option<StoredReport>> {
        let report = query_as::<_, StoredReport>(
            r#"SELECT id, url, title, description, authority_score, verdict, executive_summary,
                      full_analysis, created_at
               FROM audit_reports WHERE id = ?1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(report)
    }

    pub async fn recent(&self, limit: u32) -> Result<Vec<ReportListing>> {
        let rows = query_as::<_, ReportListing>(
            r#"SELECT id, url, title, authority_score, verdict, created_at
               FROM audit_reports ORDER BY created_at DESC, id DESC LIMIT ?1"#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[derive(Debug, Clone)]
pub struct StoredReport {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub description: String,
    pub authority_score: i64,
    pub verdict: String,
    pub executive_summary: String,
    pub full_analysis: String,
    pub created_at: DateTime<Utc>,
}

impl StoredReport {
    pub fn analysis(&self) -> Result<AnalysisResult> {
        serde_json::from_str(&self.full_analysis)
            .with_context(|| format!("stored analysis for report {} is corrupt", self.id))
    }
}

impl<'r> FromRow<'r, SqliteRow> for StoredReport {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            url: row.try_get("url")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            authority_score: row.try_get("authority_score")?,
            verdict: row.try_get("verdict")?,
            executive_summary: row.try_get("executive_summary")?,
            full_analysis: row.try_get("full_analysis")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReportListing {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub authority_score: i64,
    pub verdict: String,
    pub created_at: DateTime<Utc>,
}
