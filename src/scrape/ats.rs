// src/scrape/ats.rs
//! Adapters for applicant-tracking systems with public JSON APIs.
//!
//! Greenhouse : https://boards-api.greenhouse.io/v1/boards/{slug}/jobs
//! Lever      : https://api.lever.co/v0/postings/{slug}?mode=json
//! Workday    : POST https://{co}.wd5.myworkdayjobs.com/wday/cxs/{co}/{site}/jobs
//! SmartRec   : https://careers.smartrecruiters.com/{slug}/api/more?start=0
//!
//! Each platform has its own field mapping; all share the same
//! post-processing: role pre-check, location admissibility, normalization.

use super::{location_admits, matches_target_role, SourceAdapter, SourceError};
use crate::config::CandidateProfile;
use crate::job::{truncate_chars, JobPosting, RawPosting};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static WORKDAY_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https://([^.]+)\.wd\d+\.myworkdayjobs\.com/(?:en-US/)?([^?]+)").unwrap()
});

/// How many target roles the Workday keyword search fans out over;
/// keeps request counts per host single-digit.
const WORKDAY_KEYWORD_LIMIT: usize = 5;
const DESCRIPTION_SLICE: usize = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtsPlatform {
    Greenhouse,
    Lever,
    Workday,
    SmartRecruiters,
}

impl AtsPlatform {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Greenhouse => "Greenhouse (Direct API)",
            Self::Lever => "Lever (Direct API)",
            Self::Workday => "Workday (Direct API)",
            Self::SmartRecruiters => "SmartRecruiters (Direct API)",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AtsCompany {
    pub name: String,
    pub platform: AtsPlatform,
    /// Board slug for Greenhouse/Lever/SmartRecruiters; the full career
    /// site URL for Workday.
    pub slug: String,
    pub company_type: String,
}

pub struct AtsSource {
    company: AtsCompany,
    client: Client,
}

impl AtsSource {
    pub fn new(company: AtsCompany, client: Client) -> Self {
        Self { company, client }
    }

    async fn get_json(&self, url: &str) -> Result<Value, SourceError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(SourceError::Status(response.status()));
        }
        Ok(response.json().await?)
    }

    fn admit(&self, profile: &CandidateProfile, title: &str, location: &str) -> bool {
        !title.is_empty()
            && matches_target_role(profile, title, "")
            && location_admits(profile, location)
    }

    fn normalize(
        &self,
        profile: &CandidateProfile,
        title: &str,
        location: &str,
        description: &str,
        link: &str,
    ) -> JobPosting {
        JobPosting::normalized(
            RawPosting {
                title,
                company: &self.company.name,
                company_type: Some(&self.company.company_type),
                location: (!location.is_empty()).then_some(location),
                description: (!description.is_empty()).then_some(description),
                link,
                source: self.company.platform.label(),
                ..Default::default()
            },
            &profile.home_location,
        )
    }

    async fn fetch_greenhouse(
        &self,
        profile: &CandidateProfile,
    ) -> Result<Vec<JobPosting>, SourceError> {
        let url = format!(
            "https://boards-api.greenhouse.io/v1/boards/{}/jobs?content=true",
            self.company.slug
        );
        let body = self.get_json(&url).await?;
        let jobs = body["jobs"]
            .as_array()
            .ok_or_else(|| SourceError::Payload("missing jobs array".into()))?;

        let mut postings = Vec::new();
        for job in jobs {
            let title = job["title"].as_str().unwrap_or("").trim();
            let location = job["offices"][0]["name"].as_str().unwrap_or("").trim();
            if !self.admit(profile, title, location) {
                continue;
            }
            let link = job["absolute_url"].as_str().unwrap_or("");
            let content = job["content"].as_str().unwrap_or("");
            let description = truncate_chars(&HTML_TAG.replace_all(content, " "), DESCRIPTION_SLICE);
            postings.push(self.normalize(profile, title, location, &description, link));
        }
        Ok(postings)
    }

    async fn fetch_lever(
        &self,
        profile: &CandidateProfile,
    ) -> Result<Vec<JobPosting>, SourceError> {
        let url = format!(
            "https://api.lever.co/v0/postings/{}?mode=json",
            self.company.slug
        );
        let body = self.get_json(&url).await?;
        let jobs = body
            .as_array()
            .ok_or_else(|| SourceError::Payload("expected a postings array".into()))?;

        let mut postings = Vec::new();
        for job in jobs {
            let title = job["text"].as_str().unwrap_or("").trim();
            let location = job["categories"]["location"].as_str().unwrap_or("").trim();
            if !self.admit(profile, title, location) {
                continue;
            }
            let raw_description = job["descriptionPlain"]
                .as_str()
                .or_else(|| job["description"].as_str())
                .unwrap_or("");
            let description =
                truncate_chars(&HTML_TAG.replace_all(raw_description, " "), DESCRIPTION_SLICE);
            let link = job["hostedUrl"].as_str().unwrap_or("");
            postings.push(self.normalize(profile, title, location, &description, link));
        }
        Ok(postings)
    }

    async fn fetch_workday(
        &self,
        profile: &CandidateProfile,
    ) -> Result<Vec<JobPosting>, SourceError> {
        let caps = WORKDAY_URL.captures(&self.company.slug).ok_or_else(|| {
            SourceError::Payload(format!("unrecognized Workday URL: {}", self.company.slug))
        })?;
        let company_slug = &caps[1];
        let site = caps[2].trim_end_matches('/');
        let api_url = format!(
            "https://{co}.wd5.myworkdayjobs.com/wday/cxs/{co}/{site}/jobs",
            co = company_slug,
            site = site
        );

        let mut postings = Vec::new();
        let mut seen_titles = HashSet::new();

        for keyword in profile.target_roles.iter().take(WORKDAY_KEYWORD_LIMIT) {
            let payload = serde_json::json!({
                "appliedFacets": {},
                "limit": 20,
                "offset": 0,
                "searchText": keyword,
            });
            let response = match self.client.post(&api_url).json(&payload).send().await {
                Ok(r) if r.status().is_success() => r,
                Ok(r) => {
                    debug!(status = %r.status(), %keyword, "Workday search rejected");
                    continue;
                }
                Err(e) => {
                    debug!(error = %e, %keyword, "Workday search failed");
                    continue;
                }
            };
            let body: Value = match response.json().await {
                Ok(b) => b,
                Err(_) => continue,
            };

            for job in body["jobPostings"].as_array().into_iter().flatten() {
                let title = job["title"].as_str().unwrap_or("").trim();
                let location = job["locationsText"].as_str().unwrap_or("").trim();
                if !self.admit(profile, title, location) {
                    continue;
                }
                // One posting often matches several keyword searches.
                if !seen_titles.insert(title.to_lowercase()) {
                    continue;
                }
                let link = match job["externalPath"].as_str() {
                    Some(path) if !path.is_empty() => format!(
                        "https://{}.wd5.myworkdayjobs.com{}",
                        company_slug, path
                    ),
                    _ => self.company.slug.clone(),
                };
                postings.push(self.normalize(profile, title, location, title, &link));
            }

            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        Ok(postings)
    }

    async fn fetch_smartrecruiters(
        &self,
        profile: &CandidateProfile,
    ) -> Result<Vec<JobPosting>, SourceError> {
        let primary = format!(
            "https://careers.smartrecruiters.com/{}/api/more?start=0",
            self.company.slug
        );
        let body = match self.get_json(&primary).await {
            Ok(body) => body,
            Err(_) => {
                let fallback =
                    format!("https://jobs.smartrecruiters.com/v4/{}/all", self.company.slug);
                self.get_json(&fallback).await?
            }
        };
        let jobs = body["postings"]
            .as_array()
            .or_else(|| body["content"].as_array())
            .ok_or_else(|| SourceError::Payload("missing postings array".into()))?;

        let mut postings = Vec::new();
        for job in jobs {
            let title = job["name"]
                .as_str()
                .or_else(|| job["title"].as_str())
                .unwrap_or("")
                .trim();
            let location = match &job["location"] {
                Value::String(s) => s.clone(),
                obj @ Value::Object(_) => obj["city"]
                    .as_str()
                    .or_else(|| obj["country"].as_str())
                    .unwrap_or("")
                    .to_string(),
                _ => String::new(),
            };
            if !self.admit(profile, title, &location) {
                continue;
            }
            let link = job["ref"]
                .as_str()
                .or_else(|| job["url"].as_str())
                .or_else(|| job["jobUrl"].as_str())
                .unwrap_or("");
            postings.push(self.normalize(profile, title, &location, title, link));
        }
        Ok(postings)
    }
}

#[async_trait]
impl SourceAdapter for AtsSource {
    fn name(&self) -> String {
        format!("{} [{}]", self.company.name, self.company.platform.label())
    }

    async fn fetch(&self, profile: &CandidateProfile) -> Result<Vec<JobPosting>, SourceError> {
        match self.company.platform {
            AtsPlatform::Greenhouse => self.fetch_greenhouse(profile).await,
            AtsPlatform::Lever => self.fetch_lever(profile).await,
            AtsPlatform::Workday => self.fetch_workday(profile).await,
            AtsPlatform::SmartRecruiters => self.fetch_smartrecruiters(profile).await,
        }
    }
}

/// Companies with verified public ATS endpoints.
pub fn known_ats_companies() -> Vec<AtsCompany> {
    const ROSTER: &[(&str, AtsPlatform, &str, &str)] = &[
        ("Genpact", AtsPlatform::Greenhouse, "genpact", "BPO"),
        ("Swiggy", AtsPlatform::Greenhouse, "swiggy", "Startup"),
        ("Zomato", AtsPlatform::Greenhouse, "zomato", "Startup"),
        ("PhonePe", AtsPlatform::Greenhouse, "phonepe", "Startup"),
        ("Razorpay", AtsPlatform::Greenhouse, "razorpay", "Startup"),
        ("Meesho", AtsPlatform::Greenhouse, "meesho", "Startup"),
        ("Postman", AtsPlatform::Greenhouse, "postman", "Startup"),
        ("BrowserStack", AtsPlatform::Greenhouse, "browserstack", "Startup"),
        ("Groww", AtsPlatform::Greenhouse, "groww", "Startup"),
        ("Darwinbox", AtsPlatform::Lever, "darwinbox", "Startup"),
        ("Keka HR", AtsPlatform::Lever, "keka", "Startup"),
        ("Exotel", AtsPlatform::Lever, "exotel", "Startup"),
        ("Urban Company", AtsPlatform::Lever, "urbancompany", "Startup"),
        ("MoEngage", AtsPlatform::Lever, "moengage", "Startup"),
        ("PubMatic", AtsPlatform::Lever, "pubmatic", "MNC"),
        (
            "Deloitte",
            AtsPlatform::Workday,
            "https://deloitte.wd1.myworkdayjobs.com/en-US/Deloitte_Careers",
            "MNC",
        ),
        (
            "Cognizant",
            AtsPlatform::Workday,
            "https://cognizant.wd1.myworkdayjobs.com/en-US/Cognizant_Careers",
            "MNC",
        ),
        (
            "Wipro",
            AtsPlatform::Workday,
            "https://wipro.wd3.myworkdayjobs.com/Wipro_Careers",
            "MNC",
        ),
        (
            "Qualcomm",
            AtsPlatform::Workday,
            "https://qualcomm.wd5.myworkdayjobs.com/en-US/External",
            "MNC",
        ),
        ("Concentrix", AtsPlatform::SmartRecruiters, "Concentrix", "BPO"),
        ("Mphasis", AtsPlatform::SmartRecruiters, "Mphasis", "MNC"),
    ];

    ROSTER
        .iter()
        .map(|(name, platform, slug, company_type)| AtsCompany {
            name: name.to_string(),
            platform: *platform,
            slug: slug.to_string(),
            company_type: company_type.to_string(),
        })
        .collect()
}
