//! Subproject-in-build link table - one subproject's contribution to one
//! build's report.

use reporthive_core::{Error, Result, TestTally};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

/// One subproject's results within one build.
#[derive(Debug, Clone, PartialEq)]
pub struct SubprojectRun {
    pub subproject: String,
    pub tests: TestTally,
    pub result_url: String,
    pub duration: f64,
}

fn row_to_run(row: &SqliteRow) -> SubprojectRun {
    SubprojectRun {
        subproject: row.get("subproject"),
        tests: TestTally {
            success: row.get("tests_success"),
            skipped: row.get("tests_skipped"),
            flaky: row.get("tests_flaky"),
            failed: row.get("tests_failed"),
        },
        result_url: row.get("result_url"),
        duration: row.get("duration"),
    }
}

/// Insert a link row. Returns true when newly created, false when the
/// `(branch, id, subproject)` combination already existed.
pub async fn insert(
    conn: &mut SqliteConnection,
    branch: &str,
    id: i64,
    run: &SubprojectRun,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO subproject_builds (
            branch, id, subproject,
            tests_success, tests_skipped, tests_flaky, tests_failed,
            result_url, duration
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(branch)
    .bind(id)
    .bind(&run.subproject)
    .bind(run.tests.success)
    .bind(run.tests.skipped)
    .bind(run.tests.flaky)
    .bind(run.tests.failed)
    .bind(&run.result_url)
    .bind(run.duration)
    .execute(&mut *conn)
    .await
    .map_err(Error::store)?;

    Ok(result.rows_affected() > 0)
}

/// One link row.
pub async fn get(
    conn: &mut SqliteConnection,
    branch: &str,
    id: i64,
    subproject: &str,
) -> Result<Option<SubprojectRun>> {
    let row = sqlx::query(
        r#"
        SELECT subproject, tests_success, tests_skipped, tests_flaky, tests_failed,
               result_url, duration
        FROM subproject_builds
        WHERE branch = ? AND id = ? AND subproject = ?
        "#,
    )
    .bind(branch)
    .bind(id)
    .bind(subproject)
    .fetch_optional(&mut *conn)
    .await
    .map_err(Error::store)?;

    Ok(row.as_ref().map(row_to_run))
}

/// All link rows of one build.
pub async fn all(
    conn: &mut SqliteConnection,
    branch: &str,
    id: i64,
) -> Result<Vec<SubprojectRun>> {
    let rows = sqlx::query(
        r#"
        SELECT subproject, tests_success, tests_skipped, tests_flaky, tests_failed,
               result_url, duration
        FROM subproject_builds
        WHERE branch = ? AND id = ?
        ORDER BY subproject
        "#,
    )
    .bind(branch)
    .bind(id)
    .fetch_all(&mut *conn)
    .await
    .map_err(Error::store)?;

    Ok(rows.iter().map(row_to_run).collect())
}

/// Number of link rows of one build.
pub async fn count(conn: &mut SqliteConnection, branch: &str, id: i64) -> Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM subproject_builds WHERE branch = ? AND id = ?")
        .bind(branch)
        .bind(id)
        .fetch_one(&mut *conn)
        .await
        .map_err(Error::store)
}

/// Remove the links of one build (`Some(id)`) or of the whole branch (`None`).
pub async fn remove(conn: &mut SqliteConnection, branch: &str, id: Option<i64>) -> Result<()> {
    match id {
        Some(id) => {
            sqlx::query("DELETE FROM subproject_builds WHERE branch = ? AND id = ?")
                .bind(branch)
                .bind(id)
                .execute(&mut *conn)
                .await
                .map_err(Error::store)?;
        }
        None => {
            sqlx::query("DELETE FROM subproject_builds WHERE branch = ?")
                .bind(branch)
                .execute(&mut *conn)
                .await
                .map_err(Error::store)?;
        }
    }

    Ok(())
}

/// Drop the link table.
pub async fn drop_table(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query("DROP TABLE IF EXISTS subproject_builds")
        .execute(&mut *conn)
        .await
        .map_err(Error::store)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{branches, builds, subprojects, Database, NewBuild};
    use reporthive_core::JobFlavor;
    use tempfile::{tempdir, TempDir};

    async fn setup_db_with_build(branch: &str, id: i64) -> (Database, TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("job.sqlite"), JobFlavor::Multi)
            .await
            .unwrap();

        let mut conn = db.acquire().await.unwrap();
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
                result_path: format!("/data/job/{branch}/{id}"),
            },
        )
        .await
        .unwrap();
        drop(conn);

        (db, dir)
    }

    fn run(name: &str) -> SubprojectRun {
        SubprojectRun {
            subproject: name.to_string(),
            tests: TestTally {
                success: 4,
                skipped: 0,
                flaky: 1,
                failed: 0,
            },
            result_url: format!("job/main/1/projects/{name}/index.html"),
            duration: 12.5,
        }
    }

    #[tokio::test]
    async fn test_insert_get_all() {
        let (db, _dir) = setup_db_with_build("main", 1).await;
        let mut conn = db.acquire().await.unwrap();

        subprojects::insert(&mut conn, "api").await.unwrap();
        subprojects::insert(&mut conn, "ui").await.unwrap();
        assert!(insert(&mut conn, "main", 1, &run("ui")).await.unwrap());
        assert!(insert(&mut conn, "main", 1, &run("api")).await.unwrap());
        assert!(!insert(&mut conn, "main", 1, &run("api")).await.unwrap());

        let found = get(&mut conn, "main", 1, "api").await.unwrap().unwrap();
        assert_eq!(found.duration, 12.5);
        assert_eq!(found.tests.success, 4);

        // Ordered by subproject name.
        let names: Vec<String> = all(&mut conn, "main", 1)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.subproject)
            .collect();
        assert_eq!(names, vec!["api", "ui"]);
        assert_eq!(count(&mut conn, "main", 1).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_build_delete_cascades_to_links_but_not_subprojects() {
        let (db, _dir) = setup_db_with_build("main", 1).await;
        let mut conn = db.acquire().await.unwrap();

        subprojects::insert(&mut conn, "api").await.unwrap();
        insert(&mut conn, "main", 1, &run("api")).await.unwrap();

        builds::remove(&mut conn, "main", Some(1)).await.unwrap();
        assert_eq!(count(&mut conn, "main", 1).await.unwrap(), 0);
        // The subproject row itself survives.
        assert_eq!(subprojects::count(&mut conn).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_remove_by_branch() {
        let (db, _dir) = setup_db_with_build("main", 1).await;
        let mut conn = db.acquire().await.unwrap();

        subprojects::insert(&mut conn, "api").await.unwrap();
        insert(&mut conn, "main", 1, &run("api")).await.unwrap();

        remove(&mut conn, "main", None).await.unwrap();
        assert_eq!(count(&mut conn, "main", 1).await.unwrap(), 0);
    }
}
