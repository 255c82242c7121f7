// src/job.rs
//! The normalized job record every source adapter must produce.

use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

const TITLE_MAX: usize = 200;
const DESCRIPTION_MAX: usize = 600;
const DEDUP_TITLE_MAX: usize = 50;

pub const SALARY_NOT_DISCLOSED: &str = "Not disclosed";
pub const EXPERIENCE_NOT_SPECIFIED: &str = "Not specified";

static RANGE_EXPERIENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*(?:to|-|–)\s*(\d+)\s*years?").unwrap());
static SINGLE_EXPERIENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\+?\s*years?").unwrap());

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobPosting {
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
    /// Set by the scorer; absent until the scoring step runs.
    pub relevance_score: Option<f64>,
}

/// Source-supplied fields before normalization. Optional fields get
/// defaults here so downstream code never checks for presence.
#[derive(Debug, Default)]
pub struct RawPosting<'a> {
    pub title: &'a str,
    pub company: &'a str,
    pub company_type: Option<&'a str>,
    pub location: Option<&'a str>,
    pub description: Option<&'a str>,
    pub skills: Option<&'a str>,
    pub experience: Option<&'a str>,
    pub salary: Option<&'a str>,
    pub link: &'a str,
    pub source: &'a str,
}

impl JobPosting {
    /// Normalization boundary: every adapter funnels raw fields through here.
    pub fn normalized(raw: RawPosting<'_>, home_location: &str) -> Self {
        let title = clean_text(raw.title);
        let description = raw
            .description
            .map(clean_text)
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| title.clone());
        let location = raw
            .location
            .map(clean_text)
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| home_location.to_string());
        let experience = match raw.experience.map(clean_text).filter(|e| !e.is_empty()) {
            Some(explicit) => canonicalize_experience(&explicit),
            None => extract_experience(&title, &description),
        };
        let company_type = match raw.company_type.map(str::trim).filter(|t| !t.is_empty()) {
            Some(declared) => declared.to_string(),
            None => guess_company_type(raw.company),
        };

        Self {
            title: truncate_chars(&title, TITLE_MAX),
            company: clean_text(raw.company),
            company_type,
            location,
            experience_required: experience,
            skills_required: raw.skills.map(clean_text).unwrap_or_default(),
            salary: raw
                .salary
                .map(clean_text)
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| SALARY_NOT_DISCLOSED.to_string()),
            job_description: truncate_chars(&description, DESCRIPTION_MAX),
            application_link: raw.link.trim().to_string(),
            source_platform: raw.source.to_string(),
            posting_date: Utc::now().date_naive(),
            relevance_score: None,
        }
    }

    /// A posting without a title or company cannot be stored or deduplicated.
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty() && !self.company.trim().is_empty()
    }

    /// Global dedup key: bounded lowercase title + lowercase company.
    pub fn dedup_key(&self) -> String {
        format!(
            "{}|{}",
            truncate_chars(&self.title.to_lowercase(), DEDUP_TITLE_MAX),
            self.company.to_lowercase()
        )
    }
}

/// Collapse runs of whitespace and strip control characters.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Canonicalize a source-supplied experience string where possible,
/// keeping the source text when no pattern matches.
pub fn canonicalize_experience(text: &str) -> String {
    let lower = text.to_lowercase();
    if is_fresher_text(&lower) {
        return "0-1 years (Fresher)".to_string();
    }
    // Text quoting several ranges stays as-is; the scorer judges it by
    // the largest upper bound it can find.
    let mut ranges = RANGE_EXPERIENCE.captures_iter(&lower);
    if let (Some(caps), None) = (ranges.next(), ranges.next()) {
        return format!("{}-{} years", &caps[1], &caps[2]);
    }
    if RANGE_EXPERIENCE.is_match(&lower) {
        return text.to_string();
    }
    if let Some(caps) = SINGLE_EXPERIENCE.captures(&lower) {
        // "N+ years" and a bare "N years" are different requirements;
        // keep the distinction the source made.
        if lower.contains('+') {
            return format!("{}+ years", &caps[1]);
        }
        return format!("{} years", &caps[1]);
    }
    text.to_string()
}

/// Derive an experience requirement from title and description when the
/// source has no explicit field.
pub fn extract_experience(title: &str, description: &str) -> String {
    let text = format!("{} {}", title, description).to_lowercase();
    if is_fresher_text(&text) {
        return "0-1 years (Fresher)".to_string();
    }
    if let Some(caps) = RANGE_EXPERIENCE.captures(&text) {
        return format!("{}-{} years", &caps[1], &caps[2]);
    }
    if let Some(caps) = SINGLE_EXPERIENCE.captures(&text) {
        return format!("{}+ years", &caps[1]);
    }
    EXPERIENCE_NOT_SPECIFIED.to_string()
}

fn is_fresher_text(lower: &str) -> bool {
    const FRESHER_MARKERS: &[&str] = &[
        "fresher",
        "entry level",
        "graduate",
        "trainee",
        "intern",
        "campus",
        "0 year",
        "0-1",
        "0 to 1",
        "no experience",
    ];
    FRESHER_MARKERS.iter().any(|m| lower.contains(m))
}

/// Best-effort classification; not authoritative.
pub fn guess_company_type(company: &str) -> String {
    const MNCS: &[&str] = &[
        "microsoft",
        "google",
        "amazon",
        "meta",
        "apple",
        "deloitte",
        "accenture",
        "pwc",
        "kpmg",
        "tcs",
        "infosys",
        "wipro",
        "cognizant",
        "hcl",
        "tech mahindra",
        "ibm",
        "oracle",
        "sap",
        "cisco",
    ];
    let lower = company.to_lowercase();
    if MNCS.iter().any(|m| lower.contains(m)) {
        return "MNC".to_string();
    }
    if ["labs", "technologies", "solutions", ".io", ".ai"]
        .iter()
        .any(|m| lower.contains(m))
    {
        return "Startup".to_string();
    }
    "Unknown".to_string()
}

/// Resolve a possibly-relative href against the page it was scraped from.
pub fn resolve_link(href: &str, base_url: &str) -> String {
    if href.is_empty() {
        return base_url.to_string();
    }
    if href.starts_with("http") {
        return href.to_string();
    }
    if let Some(rest) = href.strip_prefix("//") {
        return format!("https://{}", rest);
    }
    match reqwest::Url::parse(base_url).and_then(|base| base.join(href)) {
        Ok(url) => url.to_string(),
        Err(_) => base_url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw<'a>(title: &'a str, company: &'a str) -> RawPosting<'a> {
        RawPosting {
            title,
            company,
            link: "https://example.com/jobs/1",
            source: "Test",
            ..Default::default()
        }
    }

    #[test]
    fn normalization_defaults_missing_fields() {
        let job = JobPosting::normalized(raw("Data Analyst", "Acme"), "Hyderabad");
        assert_eq!(job.location, "Hyderabad");
        assert_eq!(job.salary, SALARY_NOT_DISCLOSED);
        assert_eq!(job.job_description, "Data Analyst");
        assert_eq!(job.experience_required, EXPERIENCE_NOT_SPECIFIED);
        assert!(job.relevance_score.is_none());
    }

    #[test]
    fn empty_location_falls_back_to_home_region() {
        let mut posting = raw("Data Analyst", "Acme");
        posting.location = Some("   ");
        let job = JobPosting::normalized(posting, "Hyderabad");
        assert_eq!(job.location, "Hyderabad");
    }

    #[test]
    fn long_title_is_truncated() {
        let long = "x".repeat(500);
        let mut posting = raw("", "Acme");
        posting.title = &long;
        let job = JobPosting::normalized(posting, "Hyderabad");
        assert_eq!(job.title.chars().count(), 200);
    }

    #[test]
    fn experience_extraction_prefers_fresher_markers() {
        assert_eq!(
            extract_experience("Graduate Trainee", "2-4 years preferred"),
            "0-1 years (Fresher)"
        );
        assert_eq!(extract_experience("Analyst", "needs 2 to 5 years"), "2-5 years");
        assert_eq!(extract_experience("Analyst", "3+ years in SQL"), "3+ years");
        assert_eq!(extract_experience("Analyst", "great team"), EXPERIENCE_NOT_SPECIFIED);
    }

    #[test]
    fn canonicalize_keeps_unmatched_text() {
        assert_eq!(canonicalize_experience("Mid-senior"), "Mid-senior");
        assert_eq!(canonicalize_experience("1 to 3 Years"), "1-3 years");
        assert_eq!(canonicalize_experience("2 years"), "2 years");
        assert_eq!(canonicalize_experience("minimum 3+ years"), "3+ years");
    }

    #[test]
    fn dedup_key_bounds_title_and_lowercases() {
        let mut a = JobPosting::normalized(raw("Software Engineer", "Acme"), "Hyderabad");
        let b = JobPosting::normalized(raw("SOFTWARE ENGINEER", "acme"), "Hyderabad");
        a.location = "Chennai".to_string();
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn relative_links_resolve_against_origin() {
        assert_eq!(
            resolve_link("/jobs/42", "https://careers.acme.com/openings"),
            "https://careers.acme.com/jobs/42"
        );
        assert_eq!(
            resolve_link("//cdn.acme.com/j/1", "https://acme.com"),
            "https://cdn.acme.com/j/1"
        );
        assert_eq!(
            resolve_link("https://other.com/x", "https://acme.com"),
            "https://other.com/x"
        );
    }
}
