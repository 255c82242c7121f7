// src/aggregate.rs
//! Fans out to all enabled source adapters on a bounded worker pool,
//! then reconciles the combined harvest: invalid-drop, relevance
//! pre-filter, global first-seen-wins deduplication.

use crate::config::{CandidateProfile, ScrapingConfig};
use crate::job::JobPosting;
use crate::score::Scorer;
use crate::scrape::SourceAdapter;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum SourceOutcome {
    Fetched(usize),
    Empty,
    Failed(String),
    TimedOut,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub source: String,
    pub outcome: SourceOutcome,
}

#[derive(Debug, Default)]
pub struct Harvest {
    /// Deduplicated, pre-filtered postings in harvest order.
    pub jobs: Vec<JobPosting>,
    /// Raw count across all adapters before any filtering.
    pub scraped: usize,
    pub reports: Vec<SourceReport>,
}

pub struct Aggregator {
    scraping: ScrapingConfig,
}

/// Fetch one adapter under the wall-clock ceiling and classify the outcome.
/// Extracted to a named future so the borrow is higher-ranked over the
/// adapter reference when fanned out through the stream combinator.
async fn fetch_one(
    adapter: &dyn SourceAdapter,
    profile: &CandidateProfile,
    ceiling: Duration,
) -> (String, SourceOutcome, Vec<JobPosting>) {
    let name = adapter.name();
    match tokio::time::timeout(ceiling, adapter.fetch(profile)).await {
        Ok(Ok(jobs)) if jobs.is_empty() => (name, SourceOutcome::Empty, jobs),
        Ok(Ok(jobs)) => {
            info!(source = %name, count = jobs.len(), "source fetched");
            let outcome = SourceOutcome::Fetched(jobs.len());
            (name, outcome, jobs)
        }
        Ok(Err(e)) => {
            warn!(source = %name, error = %e, "source failed");
            (name, SourceOutcome::Failed(e.to_string()), Vec::new())
        }
        Err(_) => {
            warn!(source = %name, "source timed out");
            (name, SourceOutcome::TimedOut, Vec::new())
        }
    }
}

impl Aggregator {
    pub fn new(scraping: ScrapingConfig) -> Self {
        Self { scraping }
    }

    /// Run every adapter, at most `max_concurrent_sources` at a time and
    /// each under a wall-clock ceiling. A hung or failing adapter costs
    /// the harvest nothing but its own results.
    pub async fn harvest(
        &self,
        adapters: &[Box<dyn SourceAdapter>],
        profile: &CandidateProfile,
        scorer: &Scorer,
    ) -> Harvest {
        let ceiling = Duration::from_secs(self.scraping.per_source_timeout_secs);

        let mut fetches = Vec::with_capacity(adapters.len());
        for adapter in adapters {
            fetches.push(fetch_one(adapter.as_ref(), profile, ceiling));
        }

        let results: Vec<_> = stream::iter(fetches)
            .buffer_unordered(self.scraping.max_concurrent_sources.max(1))
            .collect()
            .await;

        let mut harvest = Harvest::default();
        let mut seen_keys = HashSet::new();

        for (source, outcome, jobs) in results {
            harvest.scraped += jobs.len();
            harvest.reports.push(SourceReport { source, outcome });

            for job in jobs {
                // Empty title/company would collide on the dedup key.
                if !job.is_valid() {
                    continue;
                }
                if !scorer.is_relevant(&job) {
                    continue;
                }
                if seen_keys.insert(job.dedup_key()) {
                    harvest.jobs.push(job);
                }
            }
        }

        info!(
            scraped = harvest.scraped,
            unique = harvest.jobs.len(),
            sources = harvest.reports.len(),
            "harvest complete"
        );
        harvest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CandidateProfile, MatchingConfig, ScrapingConfig};
    use crate::job::{JobPosting, RawPosting};
    use crate::scrape::{SourceAdapter, SourceError};
    use async_trait::async_trait;

    struct FixedSource {
        name: &'static str,
        jobs: Vec<JobPosting>,
    }

    #[async_trait]
    impl SourceAdapter for FixedSource {
        fn name(&self) -> String {
            self.name.to_string()
        }
        async fn fetch(
            &self,
            _profile: &CandidateProfile,
        ) -> Result<Vec<JobPosting>, SourceError> {
            Ok(self.jobs.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl SourceAdapter for FailingSource {
        fn name(&self) -> String {
            "failing".to_string()
        }
        async fn fetch(
            &self,
            _profile: &CandidateProfile,
        ) -> Result<Vec<JobPosting>, SourceError> {
            Err(SourceError::Payload("boom".into()))
        }
    }

    struct HangingSource;

    #[async_trait]
    impl SourceAdapter for HangingSource {
        fn name(&self) -> String {
            "hanging".to_string()
        }
        async fn fetch(
            &self,
            _profile: &CandidateProfile,
        ) -> Result<Vec<JobPosting>, SourceError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }
    }

    fn posting(title: &str, company: &str, source: &str) -> JobPosting {
        JobPosting::normalized(
            RawPosting {
                title,
                company,
                link: "https://example.com/j",
                source,
                ..Default::default()
            },
            "Hyderabad",
        )
    }

    fn scorer() -> Scorer {
        Scorer::new(CandidateProfile::default(), MatchingConfig::default())
    }

    fn fast_config() -> ScrapingConfig {
        ScrapingConfig {
            per_source_timeout_secs: 1,
            ..ScrapingConfig::default()
        }
    }

    #[tokio::test]
    async fn cross_adapter_duplicates_collapse_to_one() {
        let duplicate = posting("Software Engineer", "Acme", "A");
        let adapters: Vec<Box<dyn SourceAdapter>> = vec![
            Box::new(FixedSource {
                name: "a",
                jobs: vec![duplicate.clone()],
            }),
            Box::new(FixedSource {
                name: "b",
                jobs: vec![posting("Software Engineer", "Acme", "B")],
            }),
        ];

        let harvest = Aggregator::new(fast_config())
            .harvest(&adapters, &CandidateProfile::default(), &scorer())
            .await;

        assert_eq!(harvest.scraped, 2);
        assert_eq!(harvest.jobs.len(), 1);
        assert_eq!(harvest.jobs[0].title, "Software Engineer");
    }

    #[tokio::test]
    async fn first_seen_wins_within_one_source() {
        let adapters: Vec<Box<dyn SourceAdapter>> = vec![Box::new(FixedSource {
            name: "a",
            jobs: vec![
                posting("Data Analyst", "Acme", "first"),
                posting("Business Analyst", "Other", "unrelated"),
                posting("Data Analyst", "ACME", "second"),
            ],
        })];

        let harvest = Aggregator::new(fast_config())
            .harvest(&adapters, &CandidateProfile::default(), &scorer())
            .await;

        assert_eq!(harvest.jobs.len(), 2);
        assert_eq!(harvest.jobs[0].source_platform, "first");
    }

    #[tokio::test]
    async fn invalid_and_irrelevant_postings_drop_before_dedup() {
        let mut no_company = posting("Data Analyst", "x", "a");
        no_company.company = String::new();
        let adapters: Vec<Box<dyn SourceAdapter>> = vec![Box::new(FixedSource {
            name: "a",
            jobs: vec![no_company, posting("Head Chef", "Bistro", "a")],
        })];

        let harvest = Aggregator::new(fast_config())
            .harvest(&adapters, &CandidateProfile::default(), &scorer())
            .await;

        assert_eq!(harvest.scraped, 2);
        assert!(harvest.jobs.is_empty());
    }

    #[tokio::test]
    async fn failing_and_hanging_sources_do_not_suppress_others() {
        let adapters: Vec<Box<dyn SourceAdapter>> = vec![
            Box::new(FailingSource),
            Box::new(HangingSource),
            Box::new(FixedSource {
                name: "healthy",
                jobs: vec![posting("Data Analyst", "Acme", "healthy")],
            }),
        ];

        let harvest = Aggregator::new(fast_config())
            .harvest(&adapters, &CandidateProfile::default(), &scorer())
            .await;

        assert_eq!(harvest.jobs.len(), 1);
        assert!(harvest
            .reports
            .iter()
            .any(|r| matches!(r.outcome, SourceOutcome::Failed(_))));
        assert!(harvest
            .reports
            .iter()
            .any(|r| matches!(r.outcome, SourceOutcome::TimedOut)));
    }
}
