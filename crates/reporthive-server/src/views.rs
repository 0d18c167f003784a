//! Read-side aggregation: the JSON views served over HTTP.

use reporthive_core::{Error, Result};
use reporthive_db::{branches, builds, general, subproject_builds, BuildRecord, GeneralInfo};
use serde::Serialize;

use crate::state::JobContext;

/// One branch line in the job view. Branches without builds never appear.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct BranchSummary {
    pub name: String,
    pub first: i64,
    pub last: i64,
}

/// `GET /{job}` response.
#[derive(Debug, Serialize)]
pub struct JobView {
    pub general: GeneralInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branches: Option<Vec<BranchSummary>>,
}

/// `GET /{job}/{branch}` response.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct BranchView {
    pub first: i64,
    pub last: i64,
    pub builds: Vec<i64>,
}

/// One subproject line in a build view.
#[derive(Debug, Serialize)]
pub struct SubprojectView {
    pub subproject: String,
    pub tests_success: i64,
    pub tests_skipped: i64,
    pub tests_flaky: i64,
    pub tests_failed: i64,
    pub result_url: String,
    pub duration: f64,
}

/// `GET /{job}/{branch}/{id}` response.
#[derive(Debug, Serialize)]
pub struct BuildView {
    pub id: i64,
    pub commit: String,
    pub version: Option<String>,
    pub rc: Option<String>,
    pub tests_success: i64,
    pub tests_skipped: i64,
    pub tests_flaky: i64,
    pub tests_failed: i64,
    #[serde(rename = "type")]
    pub build_type: Option<String>,
    pub result_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subprojects: Option<Vec<SubprojectView>>,
}

fn build_view_record(record: BuildRecord, subprojects: Option<Vec<SubprojectView>>) -> BuildView {
    BuildView {
        id: record.id,
        commit: record.commit,
        version: record.version,
        rc: record.rc,
        tests_success: record.tests.success,
        tests_skipped: record.tests.skipped,
        tests_flaky: record.tests.flaky,
        tests_failed: record.tests.failed,
        build_type: record.build_type,
        result_path: record.result_path,
        subprojects,
    }
}

/// Assemble the job overview. Branch rows with zero builds are skipped, and
/// the `branches` key is dropped entirely when none qualify.
pub async fn job_view(ctx: &JobContext) -> Result<JobView> {
    let mut conn = ctx.db.acquire().await?;

    let general = general::get(&mut conn).await?;
    let mut summaries = Vec::new();

    for name in branches::all(&mut conn).await? {
        let ids: Vec<i64> = builds::all(&mut conn, &name)
            .await?
            .iter()
            .map(|b| b.id)
            .collect();
        if let (Some(&first), Some(&last)) = (ids.first(), ids.last()) {
            summaries.push(BranchSummary { name, first, last });
        }
    }

    Ok(JobView {
        general,
        branches: (!summaries.is_empty()).then_some(summaries),
    })
}

/// Assemble one branch's build list. A branch without builds is
/// indistinguishable from a branch that does not exist.
pub async fn branch_view(ctx: &JobContext, branch: &str) -> Result<BranchView> {
    let mut conn = ctx.db.acquire().await?;

    let ids: Vec<i64> = builds::all(&mut conn, branch)
        .await?
        .iter()
        .map(|b| b.id)
        .collect();

    match (ids.first(), ids.last()) {
        (Some(&first), Some(&last)) => Ok(BranchView {
            first,
            last,
            builds: ids,
        }),
        _ => Err(Error::not_found(format!("no builds for branch {branch}"))),
    }
}

/// Assemble one build's detail view. For a multi-project job the subproject
/// links are part of the contract: a build row without any link rows is
/// treated as missing.
pub async fn build_view(ctx: &JobContext, branch: &str, id: i64) -> Result<BuildView> {
    let mut conn = ctx.db.acquire().await?;

    let record = builds::get(&mut conn, branch, id)
        .await?
        .ok_or_else(|| Error::not_found(format!("no build {id} on branch {branch}")))?;

    if !ctx.flavor.is_multi() {
        return Ok(build_view_record(record, None));
    }

    let runs = subproject_builds::all(&mut conn, branch, id).await?;
    if runs.is_empty() {
        return Err(Error::not_found(format!(
            "no subproject results for build {id} on branch {branch}"
        )));
    }

    let subprojects = runs
        .into_iter()
        .map(|run| SubprojectView {
            subproject: run.subproject,
            tests_success: run.tests.success,
            tests_skipped: run.tests.skipped,
            tests_flaky: run.tests.flaky,
            tests_failed: run.tests.failed,
            result_url: run.result_url,
            duration: run.duration,
        })
        .collect();

    Ok(build_view_record(record, Some(subprojects)))
}

/// Resolve `latest` to the highest build id of a branch.
pub async fn latest_build_id(ctx: &JobContext, branch: &str) -> Result<i64> {
    Ok(branch_view(ctx, branch).await?.last)
}
