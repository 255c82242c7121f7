// src/store.rs
//! SQLite persistence gateway. The uniqueness invariant over
//! (title, company, location) lives in the schema, so repeated or
//! concurrent harvest passes are safe to re-run.

use crate::job::JobPosting;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StoredJob {
    pub id: i64,
    pub title: String,
    pub company: String,
    pub company_type: String,
    pub location: String,
    pub experience_required: String,
    pub skills_required: String,
    pub salary: String,
    pub job_description: String,
    pub application_link: String,
    pub source_platform: String,
    pub posting_date: NaiveDate,
    pub scraped_date: DateTime<Utc>,
    pub relevance_score: f64,
    pub applied: bool,
}

#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub min_score: Option<f64>,
    pub location: Option<String>,
    pub not_applied: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub total: i64,
    pub not_applied: i64,
    pub high_priority: i64,
    pub applied: i64,
}

#[derive(Clone)]
pub struct JobStore {
    pool: SqlitePool,
}

impl JobStore {
    /// Open (creating if needed) the database file and run migrations.
    pub async fn connect(database_path: &Path) -> Result<Self> {
        if let Some(parent) = database_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create database directory")?;
        }

        let database_url = format!("sqlite:{}?mode=rwc", database_path.display());
        let pool = SqlitePool::connect(&database_url)
            .await
            .context("Failed to connect to SQLite database")?;

        let store = Self { pool };
        store.migrate().await?;
        info!("Database ready: {}", database_path.display());
        Ok(store)
    }

    /// An isolated throwaway database, used by tests. A single pooled
    /// connection, because every `:memory:` connection is its own db.
    pub async fn connect_in_memory() -> Result<Self> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory SQLite database")?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                company TEXT NOT NULL,
                company_type TEXT NOT NULL DEFAULT 'Unknown',
                location TEXT NOT NULL,
                experience_required TEXT NOT NULL DEFAULT 'Not specified',
                skills_required TEXT NOT NULL DEFAULT '',
                salary TEXT NOT NULL DEFAULT 'Not disclosed',
                job_description TEXT NOT NULL DEFAULT '',
                application_link TEXT NOT NULL DEFAULT '',
                source_platform TEXT NOT NULL DEFAULT '',
                posting_date TEXT NOT NULL,
                scraped_date TEXT NOT NULL,
                relevance_score REAL NOT NULL DEFAULT 0,
                applied BOOLEAN NOT NULL DEFAULT 0,
                UNIQUE(title, company, location)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS applications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                job_id INTEGER NOT NULL,
                company TEXT NOT NULL,
                role TEXT NOT NULL,
                applied_date TEXT NOT NULL,
                resume_version TEXT NOT NULL DEFAULT '',
                application_link TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'Applied',
                notes TEXT NOT NULL DEFAULT '',
                FOREIGN KEY (job_id) REFERENCES jobs(id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_jobs_score ON jobs(relevance_score DESC);",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Idempotent insert: `None` means the (title, company, location)
    /// tuple is already stored. That is an expected outcome of every
    /// re-run, not an error.
    pub async fn insert(&self, job: &JobPosting) -> Result<Option<i64>> {
        let result = sqlx::query(
            r#"
            INSERT INTO jobs (
                title, company, company_type, location, experience_required,
                skills_required, salary, job_description, application_link,
                source_platform, posting_date, scraped_date, relevance_score
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.title)
        .bind(&job.company)
        .bind(&job.company_type)
        .bind(&job.location)
        .bind(&job.experience_required)
        .bind(&job.skills_required)
        .bind(&job.salary)
        .bind(&job.job_description)
        .bind(&job.application_link)
        .bind(&job.source_platform)
        .bind(job.posting_date)
        .bind(Utc::now())
        .bind(job.relevance_score.unwrap_or(0.0))
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(Some(done.last_insert_rowid())),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                debug!(title = %job.title, company = %job.company, "duplicate skipped");
                Ok(None)
            }
            Err(e) => Err(e).context("Failed to insert job"),
        }
    }

    pub async fn get(&self, id: i64) -> Result<Option<StoredJob>> {
        let job = sqlx::query_as::<_, StoredJob>("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(job)
    }

    /// Filtered query, best matches first, most recently seen breaking
    /// ties.
    pub async fn query(&self, filter: &JobFilter, limit: u32) -> Result<Vec<StoredJob>> {
        let mut sql = String::from("SELECT * FROM jobs WHERE 1=1");
        if filter.min_score.is_some() {
            sql.push_str(" AND relevance_score >= ?");
        }
        if filter.location.is_some() {
            sql.push_str(" AND location LIKE ?");
        }
        if filter.not_applied {
            sql.push_str(" AND applied = 0");
        }
        sql.push_str(" ORDER BY relevance_score DESC, scraped_date DESC LIMIT ?");

        let mut query = sqlx::query_as::<_, StoredJob>(&sql);
        if let Some(min_score) = filter.min_score {
            query = query.bind(min_score);
        }
        if let Some(location) = &filter.location {
            query = query.bind(format!("%{}%", location));
        }
        query = query.bind(limit as i64);

        let jobs = query.fetch_all(&self.pool).await?;
        Ok(jobs)
    }

    pub async fn stats(&self, high_priority_score: f64) -> Result<StoreStats> {
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM jobs")
            .fetch_one(&self.pool)
            .await?;
        let not_applied: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM jobs WHERE applied = 0")
            .fetch_one(&self.pool)
            .await?;
        let high_priority: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM jobs WHERE relevance_score >= ? AND applied = 0",
        )
        .bind(high_priority_score)
        .fetch_one(&self.pool)
        .await?;
        let applied: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM applications")
            .fetch_one(&self.pool)
            .await?;

        Ok(StoreStats {
            total: total.0,
            not_applied: not_applied.0,
            high_priority: high_priority.0,
            applied: applied.0,
        })
    }

    /// Human-facing application tracking: flips the flag and records the
    /// application. Only this method ever writes the applications table.
    pub async fn mark_applied(&self, id: i64, resume_version: &str) -> Result<bool> {
        let Some(job) = self.get(id).await? else {
            return Ok(false);
        };
        if job.applied {
            return Ok(false);
        }

        sqlx::query("UPDATE jobs SET applied = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO applications (
                job_id, company, role, applied_date, resume_version, application_link
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(&job.company)
        .bind(&job.title)
        .bind(Utc::now().date_naive())
        .bind(resume_version)
        .bind(&job.application_link)
        .execute(&self.pool)
        .await?;

        info!(job = %job.title, company = %job.company, "marked applied");
        Ok(true)
    }

    /// Retention sweep: drop old, low-score, unapplied rows. A separate
    /// maintenance operation, never part of the harvest pass.
    pub async fn prune(&self, max_score: f64, older_than_days: u32) -> Result<u64> {
        let cutoff = Utc::now() - chrono::Duration::days(older_than_days as i64);
        let result = sqlx::query(
            "DELETE FROM jobs WHERE applied = 0 AND relevance_score < ? AND scraped_date < ?",
        )
        .bind(max_score)
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        let removed = result.rows_affected();
        if removed > 0 {
            info!(removed, "pruned stale low-score jobs");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::RawPosting;

    fn posting(title: &str, company: &str, location: &str, score: f64) -> JobPosting {
        let mut job = JobPosting::normalized(
            RawPosting {
                title,
                company,
                location: Some(location),
                link: "https://example.com/j",
                source: "Test",
                ..Default::default()
            },
            "Hyderabad",
        );
        job.relevance_score = Some(score);
        job
    }

    #[tokio::test]
    async fn insert_is_idempotent_on_natural_key() {
        let store = JobStore::connect_in_memory().await.unwrap();
        let job = posting("Data Analyst", "Acme", "Hyderabad", 80.0);

        let first = store.insert(&job).await.unwrap();
        assert!(first.is_some());

        // Same tuple from a second harvest: one row, duplicate signal.
        let second = store.insert(&job).await.unwrap();
        assert!(second.is_none());

        let stats = store.stats(65.0).await.unwrap();
        assert_eq!(stats.total, 1);
    }

    #[tokio::test]
    async fn same_title_different_location_is_a_new_row() {
        let store = JobStore::connect_in_memory().await.unwrap();
        store
            .insert(&posting("Data Analyst", "Acme", "Hyderabad", 80.0))
            .await
            .unwrap();
        let other = store
            .insert(&posting("Data Analyst", "Acme", "Chennai", 60.0))
            .await
            .unwrap();
        assert!(other.is_some());
    }

    #[tokio::test]
    async fn query_orders_by_score_and_filters() {
        let store = JobStore::connect_in_memory().await.unwrap();
        store
            .insert(&posting("SQL Developer", "Acme", "Hyderabad", 45.0))
            .await
            .unwrap();
        store
            .insert(&posting("Data Analyst", "Beta", "Hyderabad", 91.0))
            .await
            .unwrap();
        store
            .insert(&posting("MIS Executive", "Gamma", "Chennai", 70.0))
            .await
            .unwrap();

        let all = store.query(&JobFilter::default(), 10).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].title, "Data Analyst");

        let filter = JobFilter {
            min_score: Some(60.0),
            location: Some("Hyderabad".to_string()),
            not_applied: true,
        };
        let filtered = store.query(&filter, 10).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].title, "Data Analyst");
    }

    #[tokio::test]
    async fn mark_applied_records_application_once() {
        let store = JobStore::connect_in_memory().await.unwrap();
        let id = store
            .insert(&posting("Data Analyst", "Acme", "Hyderabad", 80.0))
            .await
            .unwrap()
            .unwrap();

        assert!(store.mark_applied(id, "v3").await.unwrap());
        // Applied jobs are not overwritten by a second call.
        assert!(!store.mark_applied(id, "v4").await.unwrap());
        assert!(!store.mark_applied(9999, "v1").await.unwrap());

        let stats = store.stats(65.0).await.unwrap();
        assert_eq!(stats.applied, 1);
        assert_eq!(stats.not_applied, 0);
        assert_eq!(stats.high_priority, 0);
    }

    #[tokio::test]
    async fn prune_only_touches_old_low_score_unapplied_rows() {
        let store = JobStore::connect_in_memory().await.unwrap();
        store
            .insert(&posting("SQL Developer", "Acme", "Hyderabad", 20.0))
            .await
            .unwrap();

        // Recent rows survive regardless of score.
        let removed = store.prune(40.0, 30).await.unwrap();
        assert_eq!(removed, 0);

        // Backdate the row, then it is eligible.
        sqlx::query("UPDATE jobs SET scraped_date = ?")
            .bind(Utc::now() - chrono::Duration::days(45))
            .execute(&store.pool)
            .await
            .unwrap();
        let removed = store.prune(40.0, 30).await.unwrap();
        assert_eq!(removed, 1);
    }
}
