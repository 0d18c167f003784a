//! Per-job runtime context and the shared router state.

use reporthive_core::{encode_branch, Error, JobFlavor, Result, ServiceConfig};
use reporthive_db::{general, Database};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Everything the handlers need for one configured job.
pub struct JobContext {
    pub name: String,
    pub flavor: JobFlavor,
    pub data_dir: PathBuf,
    pub db: Database,
}

impl JobContext {
    /// Directory holding one branch's unpacked report trees.
    pub fn branch_dir(&self, branch: &str) -> PathBuf {
        self.data_dir.join(encode_branch(branch))
    }

    /// Directory of one build's unpacked report tree.
    pub fn build_dir(&self, branch: &str, id: i64) -> PathBuf {
        self.branch_dir(branch).join(id.to_string())
    }
}

/// Shared application state: the static job registry.
///
/// Jobs come from the config file and never change at runtime.
#[derive(Clone)]
pub struct AppState {
    jobs: Arc<HashMap<String, Arc<JobContext>>>,
}

impl AppState {
    /// Open every configured job's database, apply the schema, seed
    /// `general_info` where empty, and create the data directories.
    pub async fn from_config(config: &ServiceConfig) -> Result<Self> {
        let mut jobs = HashMap::new();

        for job in &config.jobs {
            let data_dir = config.data_dir(&job.name);
            std::fs::create_dir_all(&data_dir)?;

            let db = Database::open(&config.db_path(&job.name), job.flavor).await?;

            let mut conn = db.acquire().await?;
            if general::seed_if_empty(&mut conn, &job.job_url, &job.git_url).await? {
                info!("Seeded general info for job {}", job.name);
            }
            drop(conn);

            info!("Registered job {} ({:?})", job.name, job.flavor);
            jobs.insert(
                job.name.clone(),
                Arc::new(JobContext {
                    name: job.name.clone(),
                    flavor: job.flavor,
                    data_dir,
                    db,
                }),
            );
        }

        Ok(Self {
            jobs: Arc::new(jobs),
        })
    }

    /// Look up a job by name; unknown jobs are a NotFound.
    pub fn job(&self, name: &str) -> Result<Arc<JobContext>> {
        self.jobs
            .get(name)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("unknown job: {name}")))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use tempfile::TempDir;

    /// A job context backed by a throwaway directory tree.
    pub(crate) async fn job_context(flavor: JobFlavor) -> (TempDir, JobContext) {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data/testjob");
        std::fs::create_dir_all(&data_dir).unwrap();

        let db = Database::open(&dir.path().join("db/testjob.sqlite"), flavor)
            .await
            .unwrap();

        let ctx = JobContext {
            name: "testjob".to_string(),
            flavor,
            data_dir,
            db,
        };
        (dir, ctx)
    }
}
