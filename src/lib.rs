pub mod aggregate;
pub mod config;
pub mod job;
pub mod notify;
pub mod pipeline;
pub mod score;
pub mod scrape;
pub mod store;
pub mod web;

pub use config::AppConfig;
pub use job::JobPosting;
pub use pipeline::{Pipeline, RunSummary};
pub use score::Scorer;
pub use store::JobStore;
