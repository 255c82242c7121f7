//! End-to-end pipeline behavior with stub sources and an in-memory
//! store: harvest reconciliation, scoring gates, idempotent re-runs.

use async_trait::async_trait;
use jobscout::aggregate::Aggregator;
use jobscout::config::{AppConfig, CandidateProfile, MatchingConfig, ScrapingConfig};
use jobscout::job::{JobPosting, RawPosting};
use jobscout::scrape::{SourceAdapter, SourceError};
use jobscout::store::{JobFilter, JobStore};
use jobscout::{Pipeline, Scorer};

struct StubBoard {
    name: &'static str,
    postings: Vec<JobPosting>,
}

#[async_trait]
impl SourceAdapter for StubBoard {
    fn name(&self) -> String {
        self.name.to_string()
    }

    async fn fetch(&self, _profile: &CandidateProfile) -> Result<Vec<JobPosting>, SourceError> {
        Ok(self.postings.clone())
    }
}

fn posting(title: &str, company: &str, location: &str, source: &str) -> JobPosting {
    JobPosting::normalized(
        RawPosting {
            title,
            company,
            location: Some(location),
            link: "https://example.com/apply",
            source,
            ..Default::default()
        },
        "Hyderabad",
    )
}

fn scorer() -> Scorer {
    Scorer::new(CandidateProfile::default(), MatchingConfig::default())
}

/// Harvest from two overlapping stub sources, score, persist, then run
/// the whole pass again: the second pass must not create new rows.
#[tokio::test]
async fn repeated_harvest_passes_are_idempotent() {
    let store = JobStore::connect_in_memory().await.unwrap();
    let scorer = scorer();
    let profile = CandidateProfile::default();
    let aggregator = Aggregator::new(ScrapingConfig::default());

    let build_adapters = || -> Vec<Box<dyn SourceAdapter>> {
        vec![
            Box::new(StubBoard {
                name: "board-a",
                postings: vec![
                    posting("Junior Data Analyst", "Acme", "Hyderabad", "A"),
                    posting("Software Engineer", "Acme", "Hyderabad", "A"),
                ],
            }),
            Box::new(StubBoard {
                name: "board-b",
                // Same tuple harvested from a different source.
                postings: vec![posting("Software Engineer", "Acme", "Hyderabad", "B")],
            }),
        ]
    };

    for pass in 0..2 {
        let harvest = aggregator
            .harvest(&build_adapters(), &profile, &scorer)
            .await;
        assert_eq!(harvest.scraped, 3);
        assert_eq!(harvest.jobs.len(), 2, "cross-source duplicate must collapse");

        let mut saved = 0;
        for mut job in harvest.jobs {
            job.relevance_score = Some(scorer.score(&job));
            if store.insert(&job).await.unwrap().is_some() {
                saved += 1;
            }
        }
        if pass == 0 {
            assert_eq!(saved, 2);
        } else {
            assert_eq!(saved, 0, "second pass must only hit duplicates");
        }
    }

    let stored = store.query(&JobFilter::default(), 10).await.unwrap();
    assert_eq!(stored.len(), 2);
    // Ordering contract: best score first.
    assert!(stored[0].relevance_score >= stored[1].relevance_score);
}

/// Scored postings below the relevance floor never reach the store.
#[tokio::test]
async fn min_score_gate_filters_before_persistence() {
    let store = JobStore::connect_in_memory().await.unwrap();
    let scorer = scorer();

    let strong = posting("Junior Data Analyst (Fresher)", "Acme", "Hyderabad", "A");
    let mut weak = posting("Data Processing Operator", "Paperworks", "Guwahati", "A");
    weak.experience_required = "5-8 years".to_string();
    weak.company_type = "Unknown".to_string();

    for job in [strong, weak] {
        let score = scorer.score(&job);
        if score >= scorer.min_relevance_score() {
            let mut scored = job;
            scored.relevance_score = Some(score);
            store.insert(&scored).await.unwrap();
        }
    }

    let stored = store.query(&JobFilter::default(), 10).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].title, "Junior Data Analyst (Fresher)");
}

/// With every source family disabled the pipeline still completes and
/// reports an explicit empty run, and a second trigger works the same.
#[tokio::test]
async fn disabled_sources_yield_explicit_empty_run() {
    let mut config = AppConfig::default();
    config.sources.ats_apis = false;
    config.sources.career_pages = false;
    config.sources.portals = false;
    config.notify.send_digest = false;
    config.notify.send_alerts = false;

    let store = JobStore::connect_in_memory().await.unwrap();
    let pipeline = Pipeline::new(config, store);

    for _ in 0..2 {
        let summary = pipeline.run().await.unwrap();
        assert!(!summary.skipped);
        assert_eq!(summary.scraped, 0);
        assert_eq!(summary.saved, 0);
        assert!(summary.sources.is_empty());
    }
}
