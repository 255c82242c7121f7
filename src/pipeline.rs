// src/pipeline.rs
//! Run orchestrator: harvest -> score -> gate -> persist -> notify, one
//! pass per trigger, with a summary report the caller can print or
//! serve. Adapter failures are soft; a missing notifier only skips the
//! notification step.

use crate::aggregate::{Aggregator, SourceReport};
use crate::config::AppConfig;
use crate::job::JobPosting;
use crate::notify::{DigestJobs, Notifier, WebhookNotifier};
use crate::score::Scorer;
use crate::scrape::ats::{known_ats_companies, AtsSource};
use crate::scrape::career_page::{load_companies, CareerPageSource};
use crate::scrape::{http_client, SourceAdapter};
use crate::store::{JobFilter, JobStore};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// True when the trigger was a no-op because a run was in flight.
    pub skipped: bool,
    pub scraped: usize,
    pub unique: usize,
    pub relevant: usize,
    pub saved: usize,
    pub high_priority: usize,
    pub sources: Vec<SourceReport>,
}

impl RunSummary {
    fn skipped_run(now: DateTime<Utc>) -> Self {
        Self {
            started_at: now,
            finished_at: now,
            skipped: true,
            scraped: 0,
            unique: 0,
            relevant: 0,
            saved: 0,
            high_priority: 0,
            sources: Vec::new(),
        }
    }
}

pub struct Pipeline {
    config: AppConfig,
    store: JobStore,
    scorer: Scorer,
    in_flight: AtomicBool,
}

impl Pipeline {
    pub fn new(config: AppConfig, store: JobStore) -> Self {
        let scorer = Scorer::new(config.profile.clone(), config.matching.clone());
        Self {
            config,
            store,
            scorer,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Build the adapter set from configuration. Sources the config
    /// disables (or the build omits, for portals) simply do not appear.
    fn build_sources(&self) -> Result<Vec<Box<dyn SourceAdapter>>> {
        let client = http_client(&self.config.scraping)?;
        let mut sources: Vec<Box<dyn SourceAdapter>> = Vec::new();

        if self.config.sources.ats_apis {
            for company in known_ats_companies() {
                sources.push(Box::new(AtsSource::new(company, client.clone())));
            }
        }

        if self.config.sources.career_pages {
            let companies = load_companies(self.config.sources.companies_path.as_deref())?;
            for company in companies {
                sources.push(Box::new(CareerPageSource::new(
                    company,
                    client.clone(),
                    &self.config.scraping,
                )));
            }
        }

        #[cfg(feature = "portal")]
        if self.config.sources.portals {
            for portal in crate::scrape::portal::PortalSource::for_profile(
                &self.config.profile,
                &self.config.scraping,
            ) {
                sources.push(Box::new(portal));
            }
        }
        #[cfg(not(feature = "portal"))]
        if self.config.sources.portals {
            warn!("Portal sources enabled in config but this build has no portal support");
        }

        Ok(sources)
    }

    /// One full pass. Safe to trigger while another run may be in
    /// flight: the second trigger becomes a no-op summary.
    pub async fn run(&self) -> Result<RunSummary> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Pipeline run already in flight, trigger ignored");
            return Ok(RunSummary::skipped_run(Utc::now()));
        }

        let result = self.run_inner().await;
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn run_inner(&self) -> Result<RunSummary> {
        let started_at = Utc::now();
        let sources = self.build_sources()?;

        if sources.is_empty() {
            // An empty-run report, distinguishable from a healthy run.
            warn!("No sources enabled; producing an empty run report");
            return Ok(RunSummary {
                started_at,
                finished_at: Utc::now(),
                skipped: false,
                scraped: 0,
                unique: 0,
                relevant: 0,
                saved: 0,
                high_priority: 0,
                sources: Vec::new(),
            });
        }

        info!(sources = sources.len(), "starting harvest");
        let aggregator = Aggregator::new(self.config.scraping.clone());
        let harvest = aggregator
            .harvest(&sources, &self.config.profile, &self.scorer)
            .await;

        // Score fresh every pass and gate on the relevance floor.
        let unique = harvest.jobs.len();
        let mut relevant: Vec<JobPosting> = harvest
            .jobs
            .into_iter()
            .map(|mut job| {
                job.relevance_score = Some(self.scorer.score(&job));
                job
            })
            .filter(|job| job.relevance_score.unwrap_or(0.0) >= self.scorer.min_relevance_score())
            .collect();
        relevant.sort_by(|a, b| {
            b.relevance_score
                .unwrap_or(0.0)
                .total_cmp(&a.relevance_score.unwrap_or(0.0))
        });
        info!(relevant = relevant.len(), "scoring complete");

        let mut saved = 0usize;
        let mut high_priority: Vec<JobPosting> = Vec::new();
        for job in &relevant {
            if self.store.insert(job).await?.is_some() {
                saved += 1;
                if job.relevance_score.unwrap_or(0.0) >= self.scorer.high_priority_score() {
                    high_priority.push(job.clone());
                }
            }
        }
        info!(saved, high_priority = high_priority.len(), "persistence complete");

        self.notify(&relevant, &high_priority).await;

        let summary = RunSummary {
            started_at,
            finished_at: Utc::now(),
            skipped: false,
            scraped: harvest.scraped,
            unique,
            relevant: relevant.len(),
            saved,
            high_priority: high_priority.len(),
            sources: harvest.reports,
        };

        info!(
            scraped = summary.scraped,
            unique = summary.unique,
            relevant = summary.relevant,
            saved = summary.saved,
            high_priority = summary.high_priority,
            "run complete"
        );
        Ok(summary)
    }

    async fn notify(&self, relevant: &[JobPosting], high_priority: &[JobPosting]) {
        let notify_config = &self.config.notify;
        let client = match http_client(&self.config.scraping) {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "notification client unavailable, skipping");
                return;
            }
        };
        let Some(notifier) = WebhookNotifier::from_config(notify_config, client) else {
            return;
        };

        if notify_config.send_alerts {
            for job in high_priority.iter().take(notify_config.max_alerts) {
                notifier.send_alert(job).await;
            }
        }

        if notify_config.send_digest {
            let filter = JobFilter {
                min_score: Some(self.scorer.high_priority_score()),
                location: None,
                not_applied: true,
            };
            let top_jobs = match self.store.query(&filter, 20).await {
                Ok(jobs) => jobs,
                Err(e) => {
                    warn!(error = %e, "digest query failed, sending without top jobs");
                    Vec::new()
                }
            };
            let stats = match self.store.stats(self.scorer.high_priority_score()).await {
                Ok(stats) => stats,
                Err(e) => {
                    warn!(error = %e, "stats query failed, digest skipped");
                    return;
                }
            };
            notifier
                .send_digest(
                    &DigestJobs {
                        new_jobs: relevant,
                        top_jobs: &top_jobs,
                        high_priority,
                    },
                    &stats,
                )
                .await;
        }
    }
}
