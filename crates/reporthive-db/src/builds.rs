//! Builds table - one row per uploaded test-result snapshot.
//!
//! Rows are immutable once written: there is no update operation, only
//! insert, read, and remove. The insert is the authoritative uniqueness gate
//! for `(id, branch)`; a pre-existence check alone is not enough under
//! concurrent uploads.

use reporthive_core::{Error, Result, TestTally};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

/// A build as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildRecord {
    pub id: i64,
    pub commit: String,
    pub version: Option<String>,
    pub rc: Option<String>,
    pub tests: TestTally,
    pub build_type: Option<String>,
    pub result_path: String,
}

/// Insert payload for a new build.
#[derive(Debug, Clone)]
pub struct NewBuild {
    pub id: i64,
    pub branch: String,
    pub commit: String,
    pub version: Option<String>,
    pub rc: Option<String>,
    pub tests: TestTally,
    pub build_type: Option<String>,
    pub result_path: String,
}

fn row_to_build(row: &SqliteRow) -> BuildRecord {
    BuildRecord {
        id: row.get("id"),
        commit: row.get("commit_hash"),
        version: row.get("version"),
        rc: row.get("rc"),
        tests: TestTally {
            success: row.get("tests_success"),
            skipped: row.get("tests_skipped"),
            flaky: row.get("tests_flaky"),
            failed: row.get("tests_failed"),
        },
        build_type: row.get("build_type"),
        result_path: row.get("result_path"),
    }
}

/// Insert a build. Returns true when the build was newly created, false when
/// `(id, branch)` already existed (the existing row is never overwritten).
pub async fn insert(conn: &mut SqliteConnection, build: &NewBuild) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO builds (
            id, branch, commit_hash, version, rc,
            tests_success, tests_skipped, tests_flaky, tests_failed,
            build_type, result_path
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(build.id)
    .bind(&build.branch)
    .bind(&build.commit)
    .bind(&build.version)
    .bind(&build.rc)
    .bind(build.tests.success)
    .bind(build.tests.skipped)
    .bind(build.tests.flaky)
    .bind(build.tests.failed)
    .bind(&build.build_type)
    .bind(&build.result_path)
    .execute(&mut *conn)
    .await
    .map_err(Error::store)?;

    Ok(result.rows_affected() > 0)
}

/// Get one build of a branch.
pub async fn get(
    conn: &mut SqliteConnection,
    branch: &str,
    id: i64,
) -> Result<Option<BuildRecord>> {
    let row = sqlx::query(
        r#"
        SELECT id, commit_hash, version, rc,
               tests_success, tests_skipped, tests_flaky, tests_failed,
               build_type, result_path
        FROM builds
        WHERE id = ? AND branch = ?
        "#,
    )
    .bind(id)
    .bind(branch)
    .fetch_optional(&mut *conn)
    .await
    .map_err(Error::store)?;

    Ok(row.as_ref().map(row_to_build))
}

/// All builds of a branch, ordered by id ascending. The latest build is the
/// last element.
pub async fn all(conn: &mut SqliteConnection, branch: &str) -> Result<Vec<BuildRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT id, commit_hash, version, rc,
               tests_success, tests_skipped, tests_flaky, tests_failed,
               build_type, result_path
        FROM builds
        WHERE branch = ?
        ORDER BY id ASC
        "#,
    )
    .bind(branch)
    .fetch_all(&mut *conn)
    .await
    .map_err(Error::store)?;

    Ok(rows.iter().map(row_to_build).collect())
}

/// Number of builds of a branch.
pub async fn count(conn: &mut SqliteConnection, branch: &str) -> Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM builds WHERE branch = ?")
        .bind(branch)
        .fetch_one(&mut *conn)
        .await
        .map_err(Error::store)
}

/// Remove one build (`Some(id)`) or every build of the branch (`None`).
pub async fn remove(conn: &mut SqliteConnection, branch: &str, id: Option<i64>) -> Result<()> {
    match id {
        Some(id) => {
            sqlx::query("DELETE FROM builds WHERE id = ? AND branch = ?")
                .bind(id)
                .bind(branch)
                .execute(&mut *conn)
                .await
                .map_err(Error::store)?;
        }
        None => {
            sqlx::query("DELETE FROM builds WHERE branch = ?")
                .bind(branch)
                .execute(&mut *conn)
                .await
                .map_err(Error::store)?;
        }
    }

    Ok(())
}

/// Drop the builds table.
pub async fn drop_table(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query("DROP TABLE IF EXISTS builds")
        .execute(&mut *conn)
        .await
        .map_err(Error::store)?;

    Ok(())
}
