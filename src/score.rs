// src/score.rs
//! Deterministic relevance scoring against the candidate profile.
//!
//! The total score is a weighted sum of five factor scores (each 0-100)
//! plus a flat bonus for explicitly fresher-friendly postings, clamped
//! to 100. Experience carries the largest weight: the profile is a
//! fresher, and a missed fresher-suitable job costs more than a false
//! positive someone reviews by hand.

use crate::config::{CandidateProfile, MatchingConfig};
use crate::job::{JobPosting, EXPERIENCE_NOT_SPECIFIED};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static YEAR_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*(?:to|-|–)\s*(\d+)\s*(?:year|yr)").unwrap());
static YEAR_SINGLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*(?:year|yr)").unwrap());

const FRESHER_BONUS: f64 = 15.0;
const SALARY_NEUTRAL: f64 = 50.0;

/// Expanded fresher vocabulary for the experience cascade. Checked
/// before any numeric parsing: "Fresher, 0-2 years" is a fresher job.
const FRESHER_KEYWORDS: &[&str] = &[
    "fresher",
    "freshers",
    "entry level",
    "entry-level",
    "0 year",
    "0 years",
    "0-1",
    "0 to 1",
    "0-2",
    "0 to 2",
    "1 year",
    "0 month",
    "graduate",
    "trainee",
    "intern",
    "internship",
    "junior",
    "associate",
    "beginner",
    "campus",
    "no experience",
    "recent graduate",
];

/// Smaller set of strong indicators for the separate fresher-friendly
/// bonus. Overlaps the cascade set but is not identical; the two are
/// independent signals and are kept divergent on purpose.
const STRONG_FRESHER_INDICATORS: &[&str] = &[
    "fresher",
    "freshers only",
    "entry level",
    "graduate trainee",
    "0 year",
    "0 years",
    "campus",
    "internship",
    "trainee program",
];

/// Skills whose exact match earns the keyword bonus.
const KEY_SKILLS: &[&str] = &["sql", "python", "excel", "power bi", "tableau"];

const REMOTE_MARKERS: &[&str] = &["remote", "work from home", "wfh", "anywhere", "pan india"];
const METRO_CITIES: &[&str] = &["pune", "mumbai", "delhi", "chennai", "kolkata"];

const MNC_NAMES: &[&str] = &[
    "microsoft",
    "google",
    "amazon",
    "deloitte",
    "accenture",
    "tcs",
    "infosys",
    "wipro",
    "cognizant",
];

/// Broad domain vocabulary for the cheap relevance pre-filter.
const RELEVANT_KEYWORDS: &[&str] = &[
    "data",
    "analyst",
    "analytics",
    "analysis",
    "engineer",
    "engineering",
    "sql",
    "python",
    "excel",
    "power bi",
    "tableau",
    "database",
    "etl",
    "reporting",
    "dashboard",
    "bi",
    "business intelligence",
    "mis",
    "report",
    "statistics",
    "statistical",
    "visualization",
    "junior",
    "associate",
    "trainee",
    "intern",
    "mysql",
    "postgresql",
    "pandas",
    "numpy",
];

const TECH_INDICATORS: &[&str] = &["it", "software", "technology", "computer", "tech"];

#[derive(Debug, Clone, Serialize)]
pub struct ScoreBreakdown {
    pub total: f64,
    pub keyword: f64,
    pub experience: f64,
    pub location: f64,
    pub company: f64,
    pub salary: f64,
    pub fresher_friendly: bool,
}

#[derive(Debug, Clone)]
pub struct Scorer {
    profile: CandidateProfile,
    matching: MatchingConfig,
}

impl Scorer {
    pub fn new(profile: CandidateProfile, matching: MatchingConfig) -> Self {
        Self { profile, matching }
    }

    /// Weighted total in [0, 100], rounded to two decimals.
    pub fn score(&self, job: &JobPosting) -> f64 {
        let weights = &self.matching.weights;
        let mut total = self.keyword_score(job) * weights.keyword
            + self.experience_score(job) * weights.experience
            + self.location_score(job) * weights.location
            + self.company_score(job) * weights.company_type
            + SALARY_NEUTRAL * weights.salary;

        if self.is_explicitly_fresher_friendly(job) {
            total += FRESHER_BONUS;
        }

        (total.min(100.0) * 100.0).round() / 100.0
    }

    pub fn explain(&self, job: &JobPosting) -> ScoreBreakdown {
        ScoreBreakdown {
            total: self.score(job),
            keyword: self.keyword_score(job),
            experience: self.experience_score(job),
            location: self.location_score(job),
            company: self.company_score(job),
            salary: SALARY_NEUTRAL,
            fresher_friendly: self.is_explicitly_fresher_friendly(job),
        }
    }

    /// Fraction of profile skills found verbatim, plus half credit for
    /// skills found only inside a longer token ("python" in "python3").
    fn keyword_score(&self, job: &JobPosting) -> f64 {
        if self.profile.skills.is_empty() {
            return 50.0;
        }
        let job_text = format!(
            "{} {} {}",
            job.title, job.skills_required, job.job_description
        )
        .to_lowercase();
        let tokens: Vec<&str> = job_text.split_whitespace().collect();

        let mut exact = Vec::new();
        let mut partial = 0usize;
        for skill in &self.profile.skills {
            let skill_lower = skill.to_lowercase();
            if job_text.contains(&skill_lower) {
                exact.push(skill_lower);
            } else if tokens.iter().any(|t| t.contains(&skill_lower)) {
                partial += 1;
            }
        }

        let total_skills = self.profile.skills.len() as f64;
        let mut score = (exact.len() as f64 / total_skills) * 100.0
            + (partial as f64 / total_skills) * 50.0;
        score = score.min(100.0);

        let key_matches = exact
            .iter()
            .filter(|s| KEY_SKILLS.contains(&s.as_str()))
            .count();
        if key_matches >= 2 {
            score += 10.0;
        }
        score.min(100.0)
    }

    /// Prioritized cascade; order matters. Fresher keywords win over any
    /// numeric range also present in the text.
    fn experience_score(&self, job: &JobPosting) -> f64 {
        let exp_text = job.experience_required.to_lowercase();
        let title = job.title.to_lowercase();
        let all_text = format!(
            "{} {} {}",
            exp_text,
            title,
            job.job_description.to_lowercase()
        );

        // 1. Explicit fresher keywords anywhere.
        if FRESHER_KEYWORDS.iter().any(|kw| all_text.contains(kw)) {
            return 100.0;
        }

        // 2. "N to M years" ranges in the experience text; judge by the
        //    largest upper bound mentioned.
        let upper_bounds: Vec<u32> = YEAR_RANGE
            .captures_iter(&exp_text)
            .filter_map(|caps| caps[2].parse().ok())
            .collect();
        if let Some(max_years) = upper_bounds.into_iter().max() {
            return match max_years {
                0 => 100.0,
                1 => 95.0,
                2 => 90.0,
                n if n <= self.profile.max_experience_years => 75.0,
                _ => 40.0,
            };
        }

        // 3. A bare "N years" mention.
        if let Some(caps) = YEAR_SINGLE.captures(&exp_text) {
            if let Ok(years) = caps[1].parse::<u32>() {
                return match years {
                    0 => 100.0,
                    1 => 90.0,
                    2 => 80.0,
                    3 => 60.0,
                    _ => 30.0,
                };
            }
        }

        // 4. Nothing stated: probably open, more so for junior titles.
        if exp_text.is_empty() || exp_text == EXPERIENCE_NOT_SPECIFIED.to_lowercase() {
            let junior_title = ["junior", "associate", "trainee", "intern"]
                .iter()
                .any(|w| title.contains(w));
            return if junior_title { 85.0 } else { 70.0 };
        }

        // 5. Unparseable requirement text.
        60.0
    }

    fn location_score(&self, job: &JobPosting) -> f64 {
        let location = job.location.to_lowercase();
        if self
            .profile
            .preferred_locations
            .iter()
            .any(|p| location.contains(&p.to_lowercase()))
        {
            return 100.0;
        }
        if REMOTE_MARKERS.iter().any(|m| location.contains(m)) {
            return 95.0;
        }
        if location.contains("hybrid") {
            return 85.0;
        }
        if METRO_CITIES.iter().any(|c| location.contains(c)) {
            return 50.0;
        }
        30.0
    }

    fn company_score(&self, job: &JobPosting) -> f64 {
        let company_type = job.company_type.to_lowercase();
        let company_name = job.company.to_lowercase();
        if company_type == "mnc" || MNC_NAMES.iter().any(|m| company_name.contains(m)) {
            return 100.0;
        }
        if company_type == "startup" {
            return 90.0;
        }
        70.0
    }

    /// Strong-indicator test over title + full experience text + the
    /// first 500 characters of the description only.
    pub fn is_explicitly_fresher_friendly(&self, job: &JobPosting) -> bool {
        let description_head: String = job.job_description.chars().take(500).collect();
        let all_text = format!(
            "{} {} {}",
            job.title, job.experience_required, description_head
        )
        .to_lowercase();
        STRONG_FRESHER_INDICATORS
            .iter()
            .any(|ind| all_text.contains(ind))
    }

    /// Cheap boolean pre-filter used by the aggregator before scoring.
    pub fn is_relevant(&self, job: &JobPosting) -> bool {
        let description_head: String = job.job_description.chars().take(300).collect();
        let all_text = format!(
            "{} {} {}",
            job.title, description_head, job.skills_required
        )
        .to_lowercase();

        if RELEVANT_KEYWORDS.iter().any(|kw| all_text.contains(kw)) {
            return true;
        }
        // Fresher roles in the tech sector stay in even without a direct
        // domain keyword.
        self.is_explicitly_fresher_friendly(job)
            && TECH_INDICATORS.iter().any(|t| all_text.contains(t))
    }

    pub fn min_relevance_score(&self) -> f64 {
        self.matching.min_relevance_score
    }

    pub fn high_priority_score(&self) -> f64 {
        self.matching.high_priority_score
    }
}
