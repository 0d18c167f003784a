//! General info table - one row of job/git URLs per job store.

use reporthive_core::{Error, Result};
use serde::Serialize;
use sqlx::{Row, SqliteConnection};

/// The single general-information record of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneralInfo {
    pub job: String,
    pub git: String,
}

/// Read the general info row.
///
/// The row is seeded at startup; an empty table is a store failure, not an
/// expected state.
pub async fn get(conn: &mut SqliteConnection) -> Result<GeneralInfo> {
    let row = sqlx::query("SELECT job, git FROM general_info LIMIT 1")
        .fetch_optional(&mut *conn)
        .await
        .map_err(Error::store)?
        .ok_or_else(|| Error::store("general_info table is empty"))?;

    Ok(GeneralInfo {
        job: row.get("job"),
        git: row.get("git"),
    })
}

/// Replace the general info wholesale. Repairs a missing or duplicated row
/// by rewriting the table.
pub async fn update(conn: &mut SqliteConnection, job: &str, git: &str) -> Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM general_info")
        .fetch_one(&mut *conn)
        .await
        .map_err(Error::store)?;

    if count != 1 {
        sqlx::query("DELETE FROM general_info")
            .execute(&mut *conn)
            .await
            .map_err(Error::store)?;
        sqlx::query("INSERT INTO general_info (job, git) VALUES (?, ?)")
            .bind(job)
            .bind(git)
            .execute(&mut *conn)
            .await
            .map_err(Error::store)?;
    } else {
        sqlx::query("UPDATE general_info SET job = ?, git = ?")
            .bind(job)
            .bind(git)
            .execute(&mut *conn)
            .await
            .map_err(Error::store)?;
    }

    Ok(())
}

/// Insert the configured URLs when the table is empty. Returns true when a
/// row was written.
pub async fn seed_if_empty(conn: &mut SqliteConnection, job: &str, git: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM general_info")
        .fetch_one(&mut *conn)
        .await
        .map_err(Error::store)?;

    if count > 0 {
        return Ok(false);
    }

    sqlx::query("INSERT INTO general_info (job, git) VALUES (?, ?)")
        .bind(job)
        .bind(git)
        .execute(&mut *conn)
        .await
        .map_err(Error::store)?;
    Ok(true)
}

/// Drop the general info table.
pub async fn drop_table(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query("DROP TABLE IF EXISTS general_info")
        .execute(&mut *conn)
        .await
        .map_err(Error::store)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use reporthive_core::JobFlavor;
    use tempfile::{tempdir, TempDir};

    async fn setup_db() -> (Database, TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("job.sqlite"), JobFlavor::Single)
            .await
            .unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn test_seed_then_get() {
        let (db, _dir) = setup_db().await;
        let mut conn = db.acquire().await.unwrap();

        assert!(seed_if_empty(&mut conn, "http://ci/job/a", "ssh://git/a")
            .await
            .unwrap());
        // Second seed is a no-op.
        assert!(!seed_if_empty(&mut conn, "other", "other").await.unwrap());

        let info = get(&mut conn).await.unwrap();
        assert_eq!(info.job, "http://ci/job/a");
        assert_eq!(info.git, "ssh://git/a");
    }

    #[tokio::test]
    async fn test_update_replaces_wholesale() {
        let (db, _dir) = setup_db().await;
        let mut conn = db.acquire().await.unwrap();

        // Update on an empty table inserts.
        update(&mut conn, "http://ci/job/b", "ssh://git/b")
            .await
            .unwrap();
        let info = get(&mut conn).await.unwrap();
        assert_eq!(info.job, "http://ci/job/b");

        update(&mut conn, "http://ci/job/c", "ssh://git/c")
            .await
            .unwrap();
        let info = get(&mut conn).await.unwrap();
        assert_eq!(info.job, "http://ci/job/c");
        assert_eq!(info.git, "ssh://git/c");
    }

    #[tokio::test]
    async fn test_get_on_empty_table_is_store_error() {
        let (db, _dir) = setup_db().await;
        let mut conn = db.acquire().await.unwrap();
        assert!(matches!(get(&mut conn).await, Err(Error::Store(_))));
    }
}
