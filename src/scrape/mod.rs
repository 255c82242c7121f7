// src/scrape/mod.rs
//! Source adapters. Each adapter turns one external source into normalized
//! job postings; the aggregator only ever sees the `SourceAdapter` trait.

pub mod ats;
pub mod career_page;
#[cfg(feature = "portal")]
pub mod portal;

use crate::config::{CandidateProfile, ScrapingConfig};
use crate::job::JobPosting;
use anyhow::{Context, Result};
use async_trait::async_trait;

/// Failure reasons an adapter can report. One source failing is an
/// expected outcome, not a pipeline error: the aggregator counts these
/// and moves on.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP status {0}")]
    Status(reqwest::StatusCode),
    #[error("unexpected payload: {0}")]
    Payload(String),
    #[error("browser session failed: {0}")]
    Browser(String),
}

/// Capability interface for all adapter families. Implementations must be
/// side-effect free with respect to each other so the aggregator can run
/// many concurrently.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> String;

    async fn fetch(&self, profile: &CandidateProfile) -> Result<Vec<JobPosting>, SourceError>;
}

/// Shared HTTP client builder: one user agent and request timeout for
/// every adapter in the pass.
pub fn http_client(config: &ScrapingConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(std::time::Duration::from_secs(config.timeout_secs))
        .build()
        .context("Failed to create HTTP client")
}

/// Broad role vocabulary shared by every adapter's relevance pre-check.
/// Deliberately wider than the profile's target roles so borderline
/// fresher-friendly titles survive until scoring.
const TARGET_ROLE_KEYWORDS: &[&str] = &[
    "data analyst",
    "data analysis",
    "data engineer",
    "data engineering",
    "data scientist",
    "data science",
    "analytics engineer",
    "sql developer",
    "sql",
    "business analyst",
    "business analysis",
    "system engineer",
    "systems engineer",
    "junior analyst",
    "associate analyst",
    "mis executive",
    "mis analyst",
    "reporting analyst",
    "bi analyst",
    "bi developer",
    "power bi",
    "tableau",
    "business intelligence",
    "etl developer",
    "etl engineer",
    "fresher",
    "entry level",
    "graduate",
    "trainee",
    "associate",
    "junior",
    "intern",
    "internship",
];

/// Relevance pre-check applied before normalization: the title or
/// description must mention one of the profile's target roles or the
/// broad role vocabulary.
pub fn matches_target_role(profile: &CandidateProfile, title: &str, description: &str) -> bool {
    let combined = format!("{} {}", title, description).to_lowercase();
    profile
        .target_roles
        .iter()
        .any(|role| combined.contains(&role.to_lowercase()))
        || TARGET_ROLE_KEYWORDS.iter().any(|kw| combined.contains(kw))
}

/// Location admissibility: explicit non-home-region names reject;
/// home-region names, remote markers, or unparseable/empty text admit.
pub fn location_admits(profile: &CandidateProfile, location: &str) -> bool {
    if location.trim().is_empty() {
        return true;
    }
    let loc = location.to_lowercase();

    const FOREIGN: &[&str] = &[
        "united states",
        "usa",
        "us ",
        "uk ",
        "london",
        "singapore",
        "australia",
        "canada",
        "germany",
        "france",
        "netherlands",
        "new york",
        "san francisco",
        "chicago",
        "toronto",
    ];
    if FOREIGN.iter().any(|f| loc.contains(f)) {
        return false;
    }

    const ADMITTED: &[&str] = &["india", "bengaluru", "remote", "work from home", "wfh"];
    if ADMITTED.iter().any(|a| loc.contains(a)) {
        return true;
    }
    if profile
        .preferred_locations
        .iter()
        .chain(std::iter::once(&profile.home_location))
        .any(|p| loc.contains(&p.to_lowercase()))
    {
        return true;
    }
    // Location text with no letters up front is noise, not a rejection.
    !loc.chars().take(5).any(|c| c.is_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CandidateProfile;

    #[test]
    fn role_matching_uses_profile_and_broad_vocabulary() {
        let profile = CandidateProfile::default();
        assert!(matches_target_role(&profile, "Junior Data Analyst", ""));
        assert!(matches_target_role(&profile, "Graduate Trainee Program", ""));
        assert!(!matches_target_role(&profile, "Head Chef", "kitchen role"));
    }

    #[test]
    fn location_admissibility_rules() {
        let profile = CandidateProfile::default();
        assert!(location_admits(&profile, "Hyderabad, Telangana"));
        assert!(location_admits(&profile, "Remote - Anywhere"));
        assert!(location_admits(&profile, ""));
        assert!(location_admits(&profile, "—"));
        assert!(!location_admits(&profile, "New York, USA"));
        assert!(!location_admits(&profile, "London"));
    }
}
