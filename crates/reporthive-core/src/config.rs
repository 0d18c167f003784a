//! Service configuration loaded at startup.
//!
//! Jobs are static: they are declared in the config file, registered once at
//! boot, and never created or deleted at runtime.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Job names become path segments and database file names; restrict them to
/// characters that cannot escape a directory.
static JOB_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("Invalid job name regex"));

/// Validate a job name before it is used in filesystem paths.
pub fn validate_job_name(name: &str) -> bool {
    !name.is_empty() && JOB_NAME_REGEX.is_match(name)
}

/// Whether a job carries per-subproject results alongside the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobFlavor {
    Single,
    Multi,
}

impl JobFlavor {
    pub fn is_multi(&self) -> bool {
        matches!(self, JobFlavor::Multi)
    }
}

/// One configured CI job.
#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    pub name: String,
    pub flavor: JobFlavor,
    /// Seed value for the job URL in general info (used when the table is empty).
    #[serde(default)]
    pub job_url: String,
    /// Seed value for the Git URL in general info (used when the table is empty).
    #[serde(default)]
    pub git_url: String,
}

fn default_bind() -> String {
    "0.0.0.0:12346".to_string()
}

/// Top-level configuration file (`reporthive.toml`).
#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Root of all on-disk state: `{root}/data/{job}/...` and `{root}/db/{job}.sqlite`.
    pub root: PathBuf,
    #[serde(default)]
    pub jobs: Vec<JobConfig>,
}

impl ServiceConfig {
    /// Load and validate the config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read {}: {}", path.display(), e)))?;
        let config: ServiceConfig =
            toml::from_str(&text).map_err(|e| Error::config(e.to_string()))?;

        let mut seen = Vec::new();
        for job in &config.jobs {
            if !validate_job_name(&job.name) {
                return Err(Error::config(format!("invalid job name: {:?}", job.name)));
            }
            if seen.contains(&job.name.as_str()) {
                return Err(Error::config(format!("duplicate job name: {}", job.name)));
            }
            seen.push(job.name.as_str());
        }

        Ok(config)
    }

    /// Directory holding all unpacked report trees for a job.
    pub fn data_dir(&self, job: &str) -> PathBuf {
        self.root.join("data").join(job)
    }

    /// Path of a job's SQLite database file.
    pub fn db_path(&self, job: &str) -> PathBuf {
        self.root.join("db").join(format!("{job}.sqlite"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(text: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reporthive.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(text.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_full_config() {
        let (_dir, path) = write_config(
            r#"
            bind = "127.0.0.1:8080"
            root = "/var/lib/reporthive"

            [[jobs]]
            name = "frontend"
            flavor = "single"
            job_url = "https://ci.example.com/job/frontend"
            git_url = "https://git.example.com/frontend.git"

            [[jobs]]
            name = "platform"
            flavor = "multi"
            "#,
        );

        let config = ServiceConfig::load(&path).unwrap();
        assert_eq!(config.bind, "127.0.0.1:8080");
        assert_eq!(config.jobs.len(), 2);
        assert_eq!(config.jobs[0].flavor, JobFlavor::Single);
        assert!(config.jobs[1].flavor.is_multi());
        assert_eq!(
            config.db_path("frontend"),
            PathBuf::from("/var/lib/reporthive/db/frontend.sqlite")
        );
        assert_eq!(
            config.data_dir("platform"),
            PathBuf::from("/var/lib/reporthive/data/platform")
        );
    }

    #[test]
    fn test_default_bind() {
        let (_dir, path) = write_config(r#"root = "/tmp/rh""#);
        let config = ServiceConfig::load(&path).unwrap();
        assert_eq!(config.bind, "0.0.0.0:12346");
        assert!(config.jobs.is_empty());
    }

    #[test]
    fn test_rejects_bad_job_name() {
        let (_dir, path) = write_config(
            r#"
            root = "/tmp/rh"
            [[jobs]]
            name = "../escape"
            flavor = "single"
            "#,
        );
        assert!(matches!(
            ServiceConfig::load(&path),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_rejects_duplicate_job_name() {
        let (_dir, path) = write_config(
            r#"
            root = "/tmp/rh"
            [[jobs]]
            name = "a"
            flavor = "single"
            [[jobs]]
            name = "a"
            flavor = "multi"
            "#,
        );
        assert!(ServiceConfig::load(&path).is_err());
    }

    #[test]
    fn test_validate_job_name() {
        assert!(validate_job_name("my-job_2"));
        assert!(!validate_job_name(""));
        assert!(!validate_job_name("a/b"));
        assert!(!validate_job_name("a b"));
    }
}
