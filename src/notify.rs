// src/notify.rs
//! Notification interface consumed by the pipeline. The pipeline hands
//! over already-scored, already-persisted data; formatting and transport
//! live here. The shipped transport posts formatted messages to a
//! configured webhook; without a webhook URL notification is disabled
//! and the run continues.

use crate::config::NotifyConfig;
use crate::job::JobPosting;
use crate::store::{StoreStats, StoredJob};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use tracing::{error, info, warn};

pub struct DigestJobs<'a> {
    pub new_jobs: &'a [JobPosting],
    pub top_jobs: &'a [StoredJob],
    pub high_priority: &'a [JobPosting],
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Returns whether the message went out; failures are logged, never
    /// propagated.
    async fn send_digest(&self, jobs: &DigestJobs<'_>, stats: &StoreStats) -> bool;
    async fn send_alert(&self, job: &JobPosting) -> bool;
}

pub struct WebhookNotifier {
    client: Client,
    webhook_url: String,
}

impl WebhookNotifier {
    /// `None` when no webhook is configured: the caller skips the
    /// notification step instead of aborting the run.
    pub fn from_config(config: &NotifyConfig, client: Client) -> Option<Self> {
        match &config.webhook_url {
            Some(url) if !url.is_empty() => Some(Self {
                client,
                webhook_url: url.clone(),
            }),
            _ => {
                warn!("No webhook URL configured, notifications disabled");
                None
            }
        }
    }

    async fn post(&self, subject: &str, html: &str) -> bool {
        let payload = serde_json::json!({
            "subject": subject,
            "html": html,
        });
        match self.client.post(&self.webhook_url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                info!(%subject, "notification sent");
                true
            }
            Ok(response) => {
                error!(status = %response.status(), "notification rejected");
                false
            }
            Err(e) => {
                error!(error = %e, "notification failed");
                false
            }
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send_digest(&self, jobs: &DigestJobs<'_>, stats: &StoreStats) -> bool {
        let subject = format!(
            "Daily Job Intel - {} New Matches - {}",
            jobs.new_jobs.len(),
            Utc::now().format("%b %d")
        );
        self.post(&subject, &digest_html(jobs, stats)).await
    }

    async fn send_alert(&self, job: &JobPosting) -> bool {
        let score = job.relevance_score.unwrap_or(0.0);
        let subject = format!(
            "HIGH MATCH ({:.0}%) - {} at {}",
            score, job.title, job.company
        );
        self.post(&subject, &alert_html(job)).await
    }
}

fn job_card(job: &JobPosting) -> String {
    format!(
        "<div class=\"job-card\"><h3>{}</h3>\
         <p><strong>Company:</strong> {} ({})</p>\
         <p><strong>Location:</strong> {}</p>\
         <p><strong>Experience:</strong> {}</p>\
         <p><strong>Score:</strong> {:.1}%</p>\
         <a href=\"{}\">Apply</a></div>",
        job.title,
        job.company,
        job.company_type,
        job.location,
        job.experience_required,
        job.relevance_score.unwrap_or(0.0),
        job.application_link,
    )
}

pub fn alert_html(job: &JobPosting) -> String {
    format!(
        "<html><body><h2>High Priority Job Match</h2>{}\
         <p><em>Apply within 24 hours for the best odds.</em></p></body></html>",
        job_card(job)
    )
}

pub fn digest_html(jobs: &DigestJobs<'_>, stats: &StoreStats) -> String {
    let mut body = String::from("<html><body>");
    body.push_str(&format!(
        "<h1>Daily Job Intelligence Report</h1><p>{}</p>",
        Utc::now().format("%A, %B %d, %Y")
    ));
    body.push_str(&format!(
        "<p>Tracked: {} | Pending: {} | High priority: {} | Applied: {}</p>",
        stats.total, stats.not_applied, stats.high_priority, stats.applied
    ));

    if !jobs.high_priority.is_empty() {
        body.push_str("<h2>High Priority</h2>");
        for job in jobs.high_priority {
            body.push_str(&job_card(job));
        }
    }

    if !jobs.top_jobs.is_empty() {
        body.push_str("<h2>Best Open Matches</h2><ul>");
        for job in jobs.top_jobs {
            body.push_str(&format!(
                "<li>{} at {} - {:.1}% (<a href=\"{}\">apply</a>)</li>",
                job.title, job.company, job.relevance_score, job.application_link
            ));
        }
        body.push_str("</ul>");
    }

    body.push_str(&format!(
        "<p>{} new postings matched this run.</p></body></html>",
        jobs.new_jobs.len()
    ));
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::RawPosting;

    fn scored_job() -> JobPosting {
        let mut job = JobPosting::normalized(
            RawPosting {
                title: "Junior Data Analyst",
                company: "Acme",
                link: "https://example.com/apply/1",
                source: "Test",
                ..Default::default()
            },
            "Hyderabad",
        );
        job.relevance_score = Some(82.5);
        job
    }

    #[test]
    fn alert_includes_score_and_link() {
        let html = alert_html(&scored_job());
        assert!(html.contains("82.5%"));
        assert!(html.contains("https://example.com/apply/1"));
        assert!(html.contains("Junior Data Analyst"));
    }

    #[test]
    fn digest_lists_sections_and_stats() {
        let new_jobs = vec![scored_job()];
        let stats = StoreStats {
            total: 12,
            not_applied: 9,
            high_priority: 3,
            applied: 3,
        };
        let html = digest_html(
            &DigestJobs {
                new_jobs: &new_jobs,
                top_jobs: &[],
                high_priority: &new_jobs,
            },
            &stats,
        );
        assert!(html.contains("High Priority"));
        assert!(html.contains("Tracked: 12"));
        assert!(html.contains("1 new postings matched"));
    }

    #[test]
    fn missing_webhook_disables_notifier() {
        let config = NotifyConfig::default();
        let client = Client::new();
        assert!(WebhookNotifier::from_config(&config, client).is_none());
    }
}
