//! Reporthive sweep - periodic retention and orphan cleanup
//!
//! Meant to run from cron: trims every branch of every configured job to the
//! newest N builds through the REST API, then removes on-disk build folders
//! that fell out of the retained window. Every failure is logged and skipped;
//! a partial sweep now is better than no sweep at all.

use anyhow::Result;
use clap::Parser;
use reporthive_core::{encode_branch, JobConfig, ServiceConfig};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "reporthive-sweep", about = "Retention and orphan cleanup for Reporthive", version)]
struct Cli {
    /// Path of the configuration file (shared with reporthived)
    #[arg(short, long, default_value = "reporthive.toml", env = "REPORTHIVE_CONFIG")]
    config: PathBuf,

    /// Base URL of the running service
    #[arg(long, default_value = "http://127.0.0.1:12346")]
    base_url: String,

    /// Number of newest builds to retain per branch
    #[arg(long, default_value_t = 12)]
    keep: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reporthive_sweep=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = ServiceConfig::load(&cli.config)?;
    let client = reqwest::Client::new();

    for job in &config.jobs {
        if let Err(e) = sweep_job(&client, &cli.base_url, &config, job, cli.keep).await {
            error!("Sweep of job {} failed: {}", job.name, e);
        }
    }

    Ok(())
}

/// Branch names with their first retained build id, from a job view.
fn retained_windows(view: &Value) -> HashMap<String, i64> {
    let mut firsts = HashMap::new();
    if let Some(branches) = view.get("branches").and_then(Value::as_array) {
        for branch in branches {
            if let (Some(name), Some(first)) = (
                branch.get("name").and_then(Value::as_str),
                branch.get("first").and_then(Value::as_i64),
            ) {
                firsts.insert(encode_branch(name), first);
            }
        }
    }
    firsts
}

async fn sweep_job(
    client: &reqwest::Client,
    base_url: &str,
    config: &ServiceConfig,
    job: &JobConfig,
    keep: u32,
) -> Result<()> {
    let job_url = format!("{}/{}", base_url, job.name);

    let view: Value = client
        .get(&job_url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    for branch_dir in retained_windows(&view).keys() {
        let response = client
            .delete(format!("{job_url}/{branch_dir}/{keep}"))
            .send()
            .await?;
        if response.status().as_u16() != 202 {
            warn!(
                "Trim of {}/{} answered {}",
                job.name,
                branch_dir,
                response.status()
            );
        }
    }

    // Re-fetch: the retained windows just moved.
    let view: Value = client
        .get(&job_url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let removed = sweep_branch_dirs(&config.data_dir(&job.name), &retained_windows(&view));
    info!(
        "Swept job {}: removed {} orphan build folders",
        job.name,
        removed.len()
    );
    Ok(())
}

/// Remove build folders older than each branch's first retained build.
///
/// Branch directories that do not appear in `firsts` (unknown to the
/// service) are left alone, as are non-numeric entries. Returns the removed
/// paths.
fn sweep_branch_dirs(job_data_dir: &Path, firsts: &HashMap<String, i64>) -> Vec<PathBuf> {
    let mut removed = Vec::new();

    let Ok(branch_entries) = std::fs::read_dir(job_data_dir) else {
        return removed;
    };
    for branch_entry in branch_entries.flatten() {
        let branch_path = branch_entry.path();
        let Some(first) = branch_entry
            .file_name()
            .to_str()
            .and_then(|name| firsts.get(name))
        else {
            continue;
        };

        let Ok(build_entries) = std::fs::read_dir(&branch_path) else {
            continue;
        };
        for build_entry in build_entries.flatten() {
            let Some(id) = build_entry
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<i64>().ok())
            else {
                continue;
            };
            if id < *first {
                let path = build_entry.path();
                match std::fs::remove_dir_all(&path) {
                    Ok(()) => removed.push(path),
                    Err(e) => warn!("Could not remove {}: {}", path.display(), e),
                }
            }
        }
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_retained_windows() {
        let view = json!({
            "general": {"job": "j", "git": "g"},
            "branches": [
                {"name": "main", "first": 5, "last": 9},
                {"name": "feature/login", "first": 2, "last": 2}
            ]
        });
        let firsts = retained_windows(&view);
        assert_eq!(firsts.get("main"), Some(&5));
        assert_eq!(firsts.get("feature--login"), Some(&2));

        assert!(retained_windows(&json!({"general": {}})).is_empty());
    }

    #[test]
    fn test_sweep_removes_only_stale_known_dirs() {
        let dir = tempfile::tempdir().unwrap();
        for path in [
            "main/3", "main/4", "main/5", "main/7", "main/not-a-build",
            "unknown/1",
        ] {
            std::fs::create_dir_all(dir.path().join(path)).unwrap();
        }

        let firsts = HashMap::from([("main".to_string(), 5)]);
        let mut removed = sweep_branch_dirs(dir.path(), &firsts);
        removed.sort();

        assert_eq!(
            removed,
            vec![dir.path().join("main/3"), dir.path().join("main/4")]
        );
        assert!(dir.path().join("main/5").is_dir());
        assert!(dir.path().join("main/7").is_dir());
        assert!(dir.path().join("main/not-a-build").is_dir());
        assert!(dir.path().join("unknown/1").is_dir());
    }

    #[test]
    fn test_sweep_missing_job_dir_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let firsts = HashMap::from([("main".to_string(), 1)]);
        assert!(sweep_branch_dirs(&dir.path().join("nope"), &firsts).is_empty());
    }
}
