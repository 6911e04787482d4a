//! Job records and the job store abstraction.
//!
//! Each submission creates one [`Job`] that a single background task drives
//! from `processing` to `completed` or `error`. The store is an injected
//! abstraction rather than a global map so callers control its lifetime and
//! tests can observe it; the bundled [`MemoryJobStore`] keeps records in a
//! concurrent map for the life of the process. There is no eviction: jobs
//! persist until shutdown, an accepted scope limitation of the service.
//!
//! Concurrency discipline: any thread may read any job, but only the task
//! that owns a job id writes to it, so per-key updates never race.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a terrain job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// The background task is running; `progress` advances monotonically.
    Processing,
    /// Terminal: all artifacts were written and `files` is populated.
    Completed,
    /// Terminal: the task failed and `error` holds the diagnostic.
    Error,
}

/// URIs of the artifacts a completed job produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobFiles {
    /// Aerial imagery snapshot.
    pub png: Option<String>,
    /// Binary glTF scene.
    pub glb: Option<String>,
    /// ASCII STL solid.
    pub stl: Option<String>,
}

/// One terrain-generation job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    /// Percentage in 0..=100.
    pub progress: u8,
    /// Human-readable step description for polling UIs.
    pub message: String,
    pub files: Option<JobFiles>,
    pub error: Option<String>,
}

impl Job {
    /// Creates a fresh job in the initial processing state.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Processing,
            progress: 0,
            message: "Starting terrain generation...".to_string(),
            files: None,
            error: None,
        }
    }

    /// Returns true once the job is completed or failed.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Completed | JobStatus::Error)
    }
}

/// Concurrent job-record store keyed by job id.
///
/// Implementations must support concurrent insert/read/update; writes to a
/// given key come from a single task in practice.
pub trait JobStore: Send + Sync {
    /// Inserts a new job record.
    fn insert(&self, job: Job);

    /// Returns a snapshot of the job, if known.
    fn get(&self, id: &str) -> Option<Job>;

    /// Updates progress and message on a processing job.
    fn set_progress(&self, id: &str, progress: u8, message: &str);

    /// Marks the job completed with its artifact URIs.
    fn complete(&self, id: &str, files: JobFiles);

    /// Marks the job failed with a diagnostic message.
    fn fail(&self, id: &str, error: &str);

    /// Lists known job ids, in no particular order.
    fn ids(&self) -> Vec<String>;
}

/// In-process job store backed by a concurrent map.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: DashMap<String, Job>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for MemoryJobStore {
    fn insert(&self, job: Job) {
        self.jobs.insert(job.id.clone(), job);
    }

    fn get(&self, id: &str) -> Option<Job> {
        self.jobs.get(id).map(|entry| entry.clone())
    }

    fn set_progress(&self, id: &str, progress: u8, message: &str) {
        if let Some(mut entry) = self.jobs.get_mut(id) {
            entry.progress = progress;
            entry.message = message.to_string();
        }
    }

    fn complete(&self, id: &str, files: JobFiles) {
        if let Some(mut entry) = self.jobs.get_mut(id) {
            entry.status = JobStatus::Completed;
            entry.progress = 100;
            entry.message = "Complete!".to_string();
            entry.files = Some(files);
        }
    }

    fn fail(&self, id: &str, error: &str) {
        if let Some(mut entry) = self.jobs.get_mut(id) {
            entry.status = JobStatus::Error;
            entry.error = Some(error.to_string());
        }
    }

    fn ids(&self) -> Vec<String> {
        self.jobs.iter().map(|entry| entry.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_is_processing_at_zero() {
        let job = Job::new("abc");
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.progress, 0);
        assert!(!job.is_terminal());
        assert!(job.files.is_none());
    }

    #[test]
    fn test_store_roundtrip_and_progress() {
        let store = MemoryJobStore::new();
        store.insert(Job::new("abc"));

        store.set_progress("abc", 40, "Downloading DEM tiles...");
        let job = store.get("abc").unwrap();
        assert_eq!(job.progress, 40);
        assert_eq!(job.message, "Downloading DEM tiles...");
        assert_eq!(job.status, JobStatus::Processing);
    }

    #[test]
    fn test_store_complete_populates_files() {
        let store = MemoryJobStore::new();
        store.insert(Job::new("abc"));

        store.complete(
            "abc",
            JobFiles {
                png: Some("/terrain/abc/snapshot.png".to_string()),
                glb: Some("/terrain/abc/terrain.glb".to_string()),
                stl: Some("/terrain/abc/terrain.stl".to_string()),
            },
        );

        let job = store.get("abc").unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert!(job.is_terminal());
        assert!(job.files.unwrap().glb.is_some());
    }

    #[test]
    fn test_store_fail_records_error() {
        let store = MemoryJobStore::new();
        store.insert(Job::new("abc"));

        store.fail("abc", "no DEM tiles found for this area");
        let job = store.get("abc").unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.error.as_deref(), Some("no DEM tiles found for this area"));
    }

    #[test]
    fn test_store_unknown_id() {
        let store = MemoryJobStore::new();
        assert!(store.get("missing").is_none());
        // Updates to unknown ids are ignored rather than panicking.
        store.set_progress("missing", 50, "noop");
        assert!(store.ids().is_empty());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&JobStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
    }
}
