// src/scrape/career_page.rs
//! Generic adapter for company career pages without a known API.
//!
//! Candidate titles come from anchor and heading elements, then pass a
//! two-stage admission filter: a validity filter (length bounds, nav-link
//! blacklist, real-job indicator word) and the shared role relevance
//! filter. Relative hrefs are resolved against the page origin.

use super::{matches_target_role, SourceAdapter, SourceError};
use crate::config::{CandidateProfile, ScrapingConfig};
use crate::job::{resolve_link, JobPosting, RawPosting};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

pub const SOURCE_LABEL: &str = "Company Career Page";

/// A real job title stays inside these bounds; shorter strings are nav
/// links, longer ones are paragraphs.
const TITLE_MIN: usize = 10;
const TITLE_MAX: usize = 200;

/// Nav links and page sections that are never job titles.
const NAV_BLACKLIST: &[&str] = &[
    "accessibility",
    "privacy",
    "cookie",
    "cookies",
    "terms",
    "login",
    "sign in",
    "register",
    "about us",
    "contact us",
    "home",
    "careers",
    "jobs",
    "search",
    "apply now",
    "submit",
    "back",
    "next",
    "previous",
    "more",
    "view all",
    "see all",
    "blog",
    "news",
    "press",
    "media",
    "investors",
    "sitemap",
    "faq",
    "faqs",
    "help",
    "support",
    "feedback",
    "linkedin",
    "twitter",
    "facebook",
    "instagram",
    "youtube",
    "our culture",
    "our values",
    "diversity",
    "inclusion",
    "benefits",
    "perks",
    "learn more",
    "read more",
    "explore",
    "locations",
];

/// A real job title contains at least one of these.
const REAL_JOB_INDICATORS: &[&str] = &[
    "analyst",
    "engineer",
    "developer",
    "manager",
    "architect",
    "scientist",
    "intern",
    "associate",
    "consultant",
    "specialist",
    "coordinator",
    "officer",
    "executive",
    "lead",
    "senior",
    "junior",
    "trainee",
    "fresher",
    "director",
    "head",
    "data",
    "sql",
    "python",
    "software",
    "business",
    "system",
    "cloud",
    "devops",
    "qa",
    "testing",
    "backend",
    "frontend",
    "full stack",
    "product",
    "operations",
    "mis",
    "reporting",
    "bi",
    "etl",
];

#[derive(Debug, Clone, Deserialize)]
pub struct CompanyPage {
    pub name: String,
    pub career_url: String,
    #[serde(alias = "type", default = "default_company_type")]
    pub company_type: String,
}

fn default_company_type() -> String {
    "Unknown".to_string()
}

pub struct CareerPageSource {
    company: CompanyPage,
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
}

impl CareerPageSource {
    pub fn new(company: CompanyPage, client: Client, scraping: &ScrapingConfig) -> Self {
        Self {
            company,
            client,
            max_retries: scraping.max_retries,
            retry_delay: Duration::from_millis(scraping.retry_delay_ms),
        }
    }

    async fn fetch_page(&self) -> Result<String, SourceError> {
        let response = self.client.get(&self.company.career_url).send().await?;
        if !response.status().is_success() {
            return Err(SourceError::Status(response.status()));
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl SourceAdapter for CareerPageSource {
    fn name(&self) -> String {
        format!("{} [{}]", self.company.name, SOURCE_LABEL)
    }

    async fn fetch(&self, profile: &CandidateProfile) -> Result<Vec<JobPosting>, SourceError> {
        // Transient blocks are common on career pages; retry with a short
        // fixed backoff before reporting the failure.
        let mut attempt = 0;
        let html = loop {
            match self.fetch_page().await {
                Ok(html) => break html,
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    debug!(source = %self.name(), %attempt, error = %e, "retrying fetch");
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        };

        let jobs = extract_postings(
            &html,
            &self.company,
            &self.company.career_url,
            profile,
        );
        if !jobs.is_empty() {
            info!(source = %self.name(), count = jobs.len(), "career page yielded jobs");
        }
        Ok(jobs)
    }
}

/// Validity filter for a candidate title string.
pub fn is_valid_job_title(title: &str) -> bool {
    let lower = title.trim().to_lowercase();
    if lower.len() < TITLE_MIN || lower.len() > TITLE_MAX {
        return false;
    }
    if title.starts_with("http") || title.starts_with('/') || title.starts_with("www") {
        return false;
    }
    for word in NAV_BLACKLIST {
        if lower == *word
            || lower.starts_with(&format!("{} ", word))
            || lower.ends_with(&format!(" {}", word))
        {
            return false;
        }
    }
    REAL_JOB_INDICATORS.iter().any(|ind| lower.contains(ind))
}

/// Parse a rendered or fetched page into admissible postings. Sync on
/// purpose: `Html` must never live across an await point.
pub fn extract_postings(
    html: &str,
    company: &CompanyPage,
    base_url: &str,
    profile: &CandidateProfile,
) -> Vec<JobPosting> {
    let document = Html::parse_document(html);
    let mut jobs = Vec::new();
    // Per-page dedup so one noisy page cannot dominate the key space.
    let mut seen_titles = HashSet::new();

    let mut admit = |title: &str, link: String, jobs: &mut Vec<JobPosting>| {
        if !is_valid_job_title(title) || !matches_target_role(profile, title, "") {
            return;
        }
        if !seen_titles.insert(title.to_lowercase()) {
            return;
        }
        jobs.push(JobPosting::normalized(
            RawPosting {
                title,
                company: &company.name,
                company_type: Some(&company.company_type),
                link: &link,
                source: SOURCE_LABEL,
                ..Default::default()
            },
            &profile.home_location,
        ));
    };

    // Strategy 1: anchors whose text looks like a job title.
    if let Ok(anchors) = Selector::parse("a[href]") {
        for element in document.select(&anchors) {
            let title = element.text().collect::<Vec<_>>().join(" ");
            let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
            let href = element.value().attr("href").unwrap_or("");
            admit(&title, resolve_link(href, base_url), &mut jobs);
        }
    }

    // Strategy 2: heading elements, linking to the nearest anchor below
    // the same parent when one exists.
    if let (Ok(headings), Ok(anchor)) = (Selector::parse("h2, h3, h4"), Selector::parse("a[href]"))
    {
        for element in document.select(&headings) {
            let title = element.text().collect::<Vec<_>>().join(" ");
            let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
            let href = element
                .parent()
                .and_then(scraper::ElementRef::wrap)
                .and_then(|parent| parent.select(&anchor).next())
                .and_then(|a| a.value().attr("href"))
                .unwrap_or("");
            admit(&title, resolve_link(href, base_url), &mut jobs);
        }
    }

    jobs
}

/// Load the company roster from a JSON file, or fall back to the
/// built-in list when no file is configured.
pub fn load_companies(path: Option<&Path>) -> Result<Vec<CompanyPage>> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read company roster: {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse company roster: {}", path.display()))
        }
        None => Ok(fallback_companies()),
    }
}

fn fallback_companies() -> Vec<CompanyPage> {
    const ROSTER: &[(&str, &str, &str)] = &[
        ("TCS", "https://www.tcs.com/careers", "MNC"),
        ("Infosys", "https://www.infosys.com/careers/", "MNC"),
        ("Wipro", "https://careers.wipro.com/", "MNC"),
        ("PhonePe", "https://www.phonepe.com/careers/", "Startup"),
        ("Flipkart", "https://www.flipkartcareers.com/", "Startup"),
        ("Accenture", "https://www.accenture.com/in-en/careers/jobsearch", "MNC"),
    ];
    ROSTER
        .iter()
        .map(|(name, url, company_type)| CompanyPage {
            name: name.to_string(),
            career_url: url.to_string(),
            company_type: company_type.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CandidateProfile;

    #[test]
    fn validity_filter_rejects_nav_noise() {
        assert!(is_valid_job_title("Junior Data Analyst"));
        assert!(is_valid_job_title("Senior Software Engineer - Platform"));
        assert!(!is_valid_job_title("Careers"));
        assert!(!is_valid_job_title("Privacy policy details"));
        assert!(!is_valid_job_title("Shop"));
        assert!(!is_valid_job_title("/jobs/data-analyst"));
        // No job-indicator word at all.
        assert!(!is_valid_job_title("Our wonderful offices"));
    }

    #[test]
    fn extracts_anchor_titles_and_resolves_links() {
        let html = r#"
            <html><body>
              <a href="/jobs/1">Junior Data Analyst</a>
              <a href="/about">About us</a>
              <a href="https://ext.example.com/2">Business Analyst - Reporting</a>
            </body></html>
        "#;
        let company = CompanyPage {
            name: "Acme".to_string(),
            career_url: "https://careers.acme.com/openings".to_string(),
            company_type: "Startup".to_string(),
        };
        let profile = CandidateProfile::default();
        let jobs = extract_postings(html, &company, &company.career_url, &profile);

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].title, "Junior Data Analyst");
        assert_eq!(jobs[0].application_link, "https://careers.acme.com/jobs/1");
        assert_eq!(jobs[1].application_link, "https://ext.example.com/2");
        assert_eq!(jobs[0].location, "Hyderabad");
    }

    #[test]
    fn heading_titles_deduplicate_within_page() {
        let html = r#"
            <html><body>
              <div><h3>Data Engineer - Pipelines</h3><a href="/jobs/7">Apply</a></div>
              <a href="/jobs/7">Data Engineer - Pipelines</a>
            </body></html>
        "#;
        let company = CompanyPage {
            name: "Acme".to_string(),
            career_url: "https://careers.acme.com".to_string(),
            company_type: "Startup".to_string(),
        };
        let profile = CandidateProfile::default();
        let jobs = extract_postings(html, &company, &company.career_url, &profile);

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].application_link, "https://careers.acme.com/jobs/7");
    }

    #[test]
    fn roster_parses_from_json() {
        let json = r#"[{"name": "Acme", "career_url": "https://a.example", "type": "MNC"}]"#;
        let companies: Vec<CompanyPage> = serde_json::from_str(json).expect("must parse");
        assert_eq!(companies[0].company_type, "MNC");
    }
}
