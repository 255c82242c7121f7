// src/web.rs
//! Read/query surface for the dashboard plus the run-now trigger. The
//! dashboard itself lives elsewhere; this is the JSON contract it
//! consumes.

use crate::pipeline::{Pipeline, RunSummary};
use crate::score::ScoreBreakdown;
use crate::store::{JobFilter, StoreStats, StoredJob};
use anyhow::Result;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::{Header, Status};
use rocket::serde::json::Json;
use rocket::{get, post, routes, Request, Response, State};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "POST, GET, OPTIONS",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: false,
            error: error.into(),
        })
    }
}

#[get("/jobs?<min_score>&<location>&<not_applied>&<limit>")]
pub async fn list_jobs(
    min_score: Option<f64>,
    location: Option<String>,
    not_applied: Option<bool>,
    limit: Option<u32>,
    pipeline: &State<Arc<Pipeline>>,
) -> Result<Json<Vec<StoredJob>>, Json<ErrorResponse>> {
    let filter = JobFilter {
        min_score,
        location,
        not_applied: not_applied.unwrap_or(false),
    };
    pipeline
        .store()
        .query(&filter, limit.unwrap_or(50))
        .await
        .map(Json)
        .map_err(|e| {
            error!(error = %e, "job query failed");
            ErrorResponse::new(e.to_string())
        })
}

#[get("/stats")]
pub async fn stats(
    pipeline: &State<Arc<Pipeline>>,
) -> Result<Json<StoreStats>, Json<ErrorResponse>> {
    pipeline
        .store()
        .stats(pipeline.scorer().high_priority_score())
        .await
        .map(Json)
        .map_err(|e| ErrorResponse::new(e.to_string()))
}

#[get("/jobs/<id>/score")]
pub async fn score_breakdown(
    id: i64,
    pipeline: &State<Arc<Pipeline>>,
) -> Result<Json<ScoreBreakdown>, Status> {
    let stored = pipeline
        .store()
        .get(id)
        .await
        .map_err(|_| Status::InternalServerError)?
        .ok_or(Status::NotFound)?;

    let job = crate::job::JobPosting {
        title: stored.title,
        company: stored.company,
        company_type: stored.company_type,
        location: stored.location,
        experience_required: stored.experience_required,
        skills_required: stored.skills_required,
        salary: stored.salary,
        job_description: stored.job_description,
        application_link: stored.application_link,
        source_platform: stored.source_platform,
        posting_date: stored.posting_date,
        relevance_score: Some(stored.relevance_score),
    };
    Ok(Json(pipeline.scorer().explain(&job)))
}

/// Trigger a pipeline pass. Safe while another run is in flight; the
/// summary's `skipped` flag reports the no-op case.
#[post("/run")]
pub async fn trigger_run(
    pipeline: &State<Arc<Pipeline>>,
) -> Result<Json<RunSummary>, Json<ErrorResponse>> {
    pipeline.run().await.map(Json).map_err(|e| {
        error!(error = %e, "triggered run failed");
        ErrorResponse::new(e.to_string())
    })
}

#[post("/jobs/<id>/applied?<resume_version>")]
pub async fn mark_applied(
    id: i64,
    resume_version: Option<String>,
    pipeline: &State<Arc<Pipeline>>,
) -> Result<Status, Json<ErrorResponse>> {
    let updated = pipeline
        .store()
        .mark_applied(id, resume_version.as_deref().unwrap_or("default"))
        .await
        .map_err(|e| ErrorResponse::new(e.to_string()))?;
    Ok(if updated { Status::Ok } else { Status::NotFound })
}

#[get("/health")]
pub async fn health() -> &'static str {
    "ok"
}

pub async fn serve(pipeline: Arc<Pipeline>, port: u16) -> Result<()> {
    info!("Starting dashboard API on port {}", port);
    let figment = rocket::Config::figment().merge(("port", port));

    rocket::custom(figment)
        .attach(Cors)
        .manage(pipeline)
        .mount(
            "/api",
            routes![
                list_jobs,
                stats,
                score_breakdown,
                trigger_run,
                mark_applied,
                health,
            ],
        )
        .launch()
        .await?;

    Ok(())
}
