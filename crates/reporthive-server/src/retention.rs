//! Retention: whole-branch deletion and keep-last-N trimming.
//!
//! Store mutations run in one transaction; directory removal happens after
//! the commit and is best-effort, so a filesystem hiccup can only ever leave
//! orphan directories (picked up by the sweep), never dangling rows.

use reporthive_core::{Error, Result};
use reporthive_db::{branches, builds, subproject_builds};
use tracing::{info, warn};

use crate::state::JobContext;

fn remove_dir_best_effort(path: &std::path::Path) {
    if let Err(e) = std::fs::remove_dir_all(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Could not remove {}: {}", path.display(), e);
        }
    }
}

/// Delete a branch: all its builds, link rows, the branch row itself, and
/// finally the branch directory tree. A branch without builds is NotFound,
/// same as one that never existed.
pub async fn delete_branch(ctx: &JobContext, branch: &str) -> Result<()> {
    {
        let mut conn = ctx.db.acquire().await?;
        if builds::count(&mut conn, branch).await? == 0 {
            return Err(Error::not_found(format!("no builds for branch {branch}")));
        }
    }

    let mut tx = ctx.db.begin().await?;
    if ctx.flavor.is_multi() {
        subproject_builds::remove(&mut *tx, branch, None).await?;
    }
    builds::remove(&mut *tx, branch, None).await?;
    branches::remove(&mut *tx, branch).await?;
    tx.commit().await.map_err(Error::store)?;

    remove_dir_best_effort(&ctx.branch_dir(branch));

    info!("Deleted branch {} of job {}", branch, ctx.name);
    Ok(())
}

/// Trim a branch down to its newest `keep` builds. Returns the removed ids;
/// a branch already at or below the limit is left untouched. A branch
/// without builds is NotFound, exactly like whole-branch deletion.
pub async fn keep_latest(ctx: &JobContext, branch: &str, keep: usize) -> Result<Vec<i64>> {
    let ids: Vec<i64> = {
        let mut conn = ctx.db.acquire().await?;
        builds::all(&mut conn, branch)
            .await?
            .iter()
            .map(|b| b.id)
            .collect()
    };

    if ids.is_empty() {
        return Err(Error::not_found(format!("no builds for branch {branch}")));
    }
    if ids.len() <= keep {
        return Ok(Vec::new());
    }
    let doomed: Vec<i64> = ids[..ids.len() - keep].to_vec();

    let mut tx = ctx.db.begin().await?;
    for &id in &doomed {
        if ctx.flavor.is_multi() {
            subproject_builds::remove(&mut *tx, branch, Some(id)).await?;
        }
        builds::remove(&mut *tx, branch, Some(id)).await?;
    }
    tx.commit().await.map_err(Error::store)?;

    for &id in &doomed {
        remove_dir_best_effort(&ctx.build_dir(branch, id));
    }

    info!(
        "Trimmed branch {} of job {} to {} builds ({} removed)",
        branch,
        ctx.name,
        keep,
        doomed.len()
    );
    Ok(doomed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::job_context;
    use reporthive_core::{JobFlavor, TestTally};
    use reporthive_db::{subprojects, NewBuild, SubprojectRun};

    async fn seed_build(ctx: &JobContext, branch: &str, id: i64) {
        let mut conn = ctx.db.acquire().await.unwrap();
        branches::insert(&mut conn, branch).await.unwrap();
        builds::insert(
            &mut conn,
            &NewBuild {
                id,
                branch: branch.to_string(),
                commit: "abc".to_string(),
                version: None,
                rc: None,
                tests: TestTally::default(),
                build_type: None,
                result_path: format!("testjob/{branch}/{id}"),
            },
        )
        .await
        .unwrap();
        std::fs::create_dir_all(ctx.build_dir(branch, id)).unwrap();
    }

    #[tokio::test]
    async fn test_delete_branch_removes_rows_and_dirs() {
        let (_dir, ctx) = job_context(JobFlavor::Single).await;
        seed_build(&ctx, "main", 1).await;
        seed_build(&ctx, "main", 2).await;
        seed_build(&ctx, "other", 1).await;

        delete_branch(&ctx, "main").await.unwrap();

        let mut conn = ctx.db.acquire().await.unwrap();
        assert_eq!(builds::count(&mut conn, "main").await.unwrap(), 0);
        assert_eq!(branches::all(&mut conn).await.unwrap(), vec!["other"]);
        assert!(!ctx.branch_dir("main").exists());
        assert!(ctx.build_dir("other", 1).exists());
    }

    #[tokio::test]
    async fn test_delete_missing_branch_is_not_found() {
        let (_dir, ctx) = job_context(JobFlavor::Single).await;
        assert!(matches!(
            delete_branch(&ctx, "ghost").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_keep_latest_boundary() {
        let (_dir, ctx) = job_context(JobFlavor::Single).await;
        for id in 1..=3 {
            seed_build(&ctx, "main", id).await;
        }

        // At the limit nothing happens.
        assert!(keep_latest(&ctx, "main", 3).await.unwrap().is_empty());

        // One over removes exactly the oldest.
        seed_build(&ctx, "main", 4).await;
        assert_eq!(keep_latest(&ctx, "main", 3).await.unwrap(), vec![1]);

        let mut conn = ctx.db.acquire().await.unwrap();
        let remaining: Vec<i64> = builds::all(&mut conn, "main")
            .await
            .unwrap()
            .iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(remaining, vec![2, 3, 4]);
        assert!(!ctx.build_dir("main", 1).exists());
        assert!(ctx.build_dir("main", 2).exists());
    }

    #[tokio::test]
    async fn test_keep_latest_on_missing_branch_is_not_found() {
        let (_dir, ctx) = job_context(JobFlavor::Single).await;
        assert!(matches!(
            keep_latest(&ctx, "ghost", 5).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_branch_removes_links_on_multi() {
        let (_dir, ctx) = job_context(JobFlavor::Multi).await;
        seed_build(&ctx, "main", 1).await;
        {
            let mut conn = ctx.db.acquire().await.unwrap();
            subprojects::insert(&mut conn, "api").await.unwrap();
            subproject_builds::insert(
                &mut conn,
                "main",
                1,
                &SubprojectRun {
                    subproject: "api".to_string(),
                    tests: TestTally::default(),
                    result_url: "testjob/main/1/projects/api/index.html".to_string(),
                    duration: 0.0,
                },
            )
            .await
            .unwrap();
        }

        delete_branch(&ctx, "main").await.unwrap();

        let mut conn = ctx.db.acquire().await.unwrap();
        assert_eq!(
            subproject_builds::count(&mut conn, "main", 1).await.unwrap(),
            0
        );
        // The subproject catalog row survives branch deletion.
        assert_eq!(subprojects::count(&mut conn).await.unwrap(), 1);
    }
}
