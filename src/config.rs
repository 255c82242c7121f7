// src/config.rs
//! Unified configuration management - one immutable AppConfig for the whole run

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub profile: CandidateProfile,
    pub matching: MatchingConfig,
    pub scraping: ScrapingConfig,
    pub sources: SourcesConfig,
    pub notify: NotifyConfig,
    pub database_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CandidateProfile {
    pub name: String,
    pub home_location: String,
    pub max_experience_years: u32,
    pub target_roles: Vec<String>,
    pub skills: Vec<String>,
    pub preferred_locations: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub min_relevance_score: f64,
    pub high_priority_score: f64,
    pub weights: ScoringWeights,
}

/// The five factor weights. Designed to sum to 1.0 but not enforced;
/// the total score is clamped to 100 either way.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub keyword: f64,
    pub experience: f64,
    pub location: f64,
    pub company_type: f64,
    pub salary: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub max_concurrent_sources: usize,
    pub per_source_timeout_secs: u64,
    pub scroll_passes: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub ats_apis: bool,
    pub career_pages: bool,
    pub portals: bool,
    /// Optional JSON roster of company career pages; the built-in
    /// fallback list is used when absent.
    pub companies_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub webhook_url: Option<String>,
    pub send_digest: bool,
    pub send_alerts: bool,
    pub max_alerts: usize,
}

impl AppConfig {
    /// Load configuration from a TOML file plus environment overrides.
    /// A missing file is not an error: defaults describe a working setup.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("jobscout.toml"));

        let mut config = if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            info!(
                "Config file {} not found, using built-in defaults",
                path.display()
            );
            Self::default()
        };

        // Secrets come from the environment, never from the config file.
        if let Ok(url) = std::env::var("JOBSCOUT_WEBHOOK_URL") {
            config.notify.webhook_url = Some(url);
        }
        if let Ok(db) = std::env::var("JOBSCOUT_DB_PATH") {
            config.database_path = PathBuf::from(db);
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.profile.skills.is_empty() && self.profile.target_roles.is_empty() {
            anyhow::bail!("Profile must define at least one skill or target role");
        }
        let w = &self.matching.weights;
        for (name, value) in [
            ("keyword", w.keyword),
            ("experience", w.experience),
            ("location", w.location),
            ("company_type", w.company_type),
            ("salary", w.salary),
        ] {
            if value < 0.0 {
                anyhow::bail!("Scoring weight '{}' must be non-negative", name);
            }
        }
        Ok(())
    }

    /// Write an annotated sample config so the defaults are inspectable.
    pub fn write_sample(path: &Path) -> Result<()> {
        std::fs::write(path, SAMPLE_CONFIG)
            .with_context(|| format!("Failed to write sample config: {}", path.display()))?;
        info!("Sample configuration written to {}", path.display());
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: CandidateProfile::default(),
            matching: MatchingConfig::default(),
            scraping: ScrapingConfig::default(),
            sources: SourcesConfig::default(),
            notify: NotifyConfig::default(),
            database_path: PathBuf::from("data/jobs.db"),
        }
    }
}

impl Default for CandidateProfile {
    fn default() -> Self {
        Self {
            name: String::new(),
            home_location: "Hyderabad".to_string(),
            max_experience_years: 2,
            target_roles: [
                "Data Analyst",
                "Associate Data Engineer",
                "Data Engineer",
                "SQL Developer",
                "Business Analyst",
                "System Engineer",
                "Junior Data Analyst",
                "MIS Executive",
                "Reporting Analyst",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            skills: [
                "SQL",
                "Python",
                "Power BI",
                "Tableau",
                "Excel",
                "pandas",
                "numpy",
                "Data Analysis",
                "ETL",
                "MySQL",
                "PostgreSQL",
                "Data Visualization",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            preferred_locations: ["Hyderabad", "Bangalore", "Remote", "Work from Home"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            min_relevance_score: 35.0,
            high_priority_score: 65.0,
            weights: ScoringWeights::default(),
        }
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        // Experience dominates: the profile is a fresher, and missing a
        // fresher-suitable posting costs more than a false positive.
        Self {
            keyword: 0.25,
            experience: 0.35,
            location: 0.20,
            company_type: 0.10,
            salary: 0.10,
        }
    }
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"
                .to_string(),
            timeout_secs: 20,
            max_retries: 2,
            retry_delay_ms: 1000,
            max_concurrent_sources: 8,
            per_source_timeout_secs: 60,
            scroll_passes: 3,
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            ats_apis: true,
            career_pages: true,
            portals: false,
            companies_path: None,
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            send_digest: true,
            send_alerts: true,
            max_alerts: 10,
        }
    }
}

const SAMPLE_CONFIG: &str = r#"# jobscout configuration

database_path = "data/jobs.db"

[profile]
name = ""
home_location = "Hyderabad"
max_experience_years = 2
target_roles = ["Data Analyst", "SQL Developer", "Business Analyst"]
skills = ["SQL", "Python", "Power BI", "Tableau", "Excel"]
preferred_locations = ["Hyderabad", "Bangalore", "Remote", "Work from Home"]

[matching]
min_relevance_score = 35.0
high_priority_score = 65.0

[matching.weights]
keyword = 0.25
experience = 0.35
location = 0.20
company_type = 0.10
salary = 0.10

[scraping]
timeout_secs = 20
max_retries = 2
retry_delay_ms = 1000
max_concurrent_sources = 8
per_source_timeout_secs = 60
scroll_passes = 3

[sources]
ats_apis = true
career_pages = true
portals = false
# companies_path = "data/companies.json"

[notify]
# Webhook URL is read from JOBSCOUT_WEBHOOK_URL, not from this file.
send_digest = true
send_alerts = true
max_alerts = 10
"#;
