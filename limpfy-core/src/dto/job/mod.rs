//! Job DTOs for the marketplace API

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::job::{Job, JobStatus, Location};

/// Request to publish a new cleaning job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJob {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: Location,
    pub price_cents: i64,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Edits allowed while a job is still pending; absent fields are unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateJob {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<Location>,
    pub price_cents: Option<i64>,
    pub image_url: Option<String>,
}

/// Worker hand-in with the uploaded proof reference
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompleteJob {
    pub proof_of_completion: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenDispute {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateJob {
    pub score: u8,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestHelp {
    pub message: Option<String>,
}

/// Ordering of job listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobSort {
    #[default]
    CreatedDesc,
    CreatedAsc,
    PriceAsc,
    PriceDesc,
}

/// Filters applied to a user's job listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobQuery {
    pub status: Option<JobStatus>,
    /// Case-insensitive substring of the title
    pub search: Option<String>,
    #[serde(default)]
    pub sort: JobSort,
}

impl JobQuery {
    /// Filters and orders `jobs` into a listing with per-status counts.
    ///
    /// Counts cover every job passed in, before the status and search filters.
    pub fn apply(&self, jobs: Vec<Job>) -> JobListing {
        let total = jobs.len();
        let mut counts = BTreeMap::new();
        for job in &jobs {
            *counts.entry(job.status).or_insert(0) += 1;
        }

        let needle = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut jobs: Vec<Job> = jobs
            .into_iter()
            .filter(|job| self.status.is_none_or(|status| job.status == status))
            .filter(|job| {
                needle
                    .as_ref()
                    .is_none_or(|needle| job.title.to_lowercase().contains(needle))
            })
            .collect();

        match self.sort {
            JobSort::CreatedDesc => jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            JobSort::CreatedAsc => jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            JobSort::PriceAsc => jobs.sort_by_key(|job| job.price_cents),
            JobSort::PriceDesc => jobs.sort_by(|a, b| b.price_cents.cmp(&a.price_cents)),
        }

        JobListing {
            jobs,
            counts,
            total,
        }
    }
}

/// A filtered job listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobListing {
    pub jobs: Vec<Job>,
    pub counts: BTreeMap<JobStatus, usize>,
    pub total: usize,
}
