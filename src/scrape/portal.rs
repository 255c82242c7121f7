// src/scrape/portal.rs
//! Browser-automation adapter for portals that only render job listings
//! in a real browser session. Compiled behind the `portal` feature; the
//! pipeline must produce correct (if smaller) results without it.

use super::{SourceAdapter, SourceError};
use crate::config::{CandidateProfile, ScrapingConfig};
use crate::job::JobPosting;
use crate::scrape::career_page::{extract_postings, CompanyPage};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions};
use std::time::Duration;
use tracing::{debug, info};

pub const SOURCE_LABEL: &str = "Job Portal";

pub struct PortalSource {
    portal_name: String,
    search_url: String,
    scroll_passes: u32,
}

impl PortalSource {
    pub fn new(portal_name: &str, search_url: String, scraping: &ScrapingConfig) -> Self {
        Self {
            portal_name: portal_name.to_string(),
            search_url,
            scroll_passes: scraping.scroll_passes,
        }
    }

    /// Portal search pages for the profile's first target role in its
    /// home region, matching the portals' URL scheme for zero-experience
    /// searches.
    pub fn for_profile(profile: &CandidateProfile, scraping: &ScrapingConfig) -> Vec<Self> {
        let Some(role) = profile.target_roles.first() else {
            return Vec::new();
        };
        let role_slug = role.to_lowercase().replace(' ', "-");
        let location_slug = profile.home_location.to_lowercase().replace(' ', "-");
        vec![Self::new(
            "Naukri",
            format!(
                "https://www.naukri.com/{}-jobs-in-{}?experience=0",
                role_slug, location_slug
            ),
            scraping,
        )]
    }

    /// Drive the session on a blocking thread; `headless_chrome` is a
    /// synchronous API. The browser process is released when `browser`
    /// drops, on every exit path including errors.
    fn render_page(url: String, scroll_passes: u32) -> Result<String, SourceError> {
        let options = LaunchOptions {
            headless: true,
            sandbox: false,
            idle_browser_timeout: Duration::from_secs(45),
            ..Default::default()
        };
        let browser = Browser::new(options).map_err(|e| SourceError::Browser(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| SourceError::Browser(e.to_string()))?;

        tab.navigate_to(&url)
            .and_then(|t| t.wait_until_navigated())
            .map_err(|e| SourceError::Browser(e.to_string()))?;

        // Bounded scroll passes to trigger lazy-loaded listings.
        for pass in 0..scroll_passes {
            debug!(%url, pass, "scrolling for lazy content");
            tab.evaluate("window.scrollTo(0, document.body.scrollHeight)", false)
                .map_err(|e| SourceError::Browser(e.to_string()))?;
            std::thread::sleep(Duration::from_millis(1500));
        }

        tab.get_content()
            .map_err(|e| SourceError::Browser(e.to_string()))
    }
}

#[async_trait]
impl SourceAdapter for PortalSource {
    fn name(&self) -> String {
        format!("{} [{}]", self.portal_name, SOURCE_LABEL)
    }

    async fn fetch(&self, profile: &CandidateProfile) -> Result<Vec<JobPosting>, SourceError> {
        let url = self.search_url.clone();
        let scroll_passes = self.scroll_passes;
        let html = tokio::task::spawn_blocking(move || Self::render_page(url, scroll_passes))
            .await
            .map_err(|e| SourceError::Browser(format!("render task aborted: {}", e)))??;

        // The rendered markup goes through exactly the career-page
        // admission filters.
        let page = CompanyPage {
            name: self.portal_name.clone(),
            career_url: self.search_url.clone(),
            company_type: "Unknown".to_string(),
        };
        let mut jobs = extract_postings(&html, &page, &self.search_url, profile);
        for job in &mut jobs {
            job.source_platform = self.portal_name.clone();
        }
        info!(source = %self.name(), count = jobs.len(), "portal session complete");
        Ok(jobs)
    }
}
