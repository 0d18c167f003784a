//! Branches table - branch rows are created implicitly on first upload.

use reporthive_core::{Error, Result};
use sqlx::{Row, SqliteConnection};

/// Insert a branch. Returns true when the branch was newly created, false
/// when it already existed; never fails on a duplicate.
pub async fn insert(conn: &mut SqliteConnection, name: &str) -> Result<bool> {
    let result = sqlx::query("INSERT OR IGNORE INTO branches (name) VALUES (?)")
        .bind(name)
        .execute(&mut *conn)
        .await
        .map_err(Error::store)?;

    Ok(result.rows_affected() > 0)
}

/// All branch names.
pub async fn all(conn: &mut SqliteConnection) -> Result<Vec<String>> {
    let rows = sqlx::query("SELECT name FROM branches ORDER BY name")
        .fetch_all(&mut *conn)
        .await
        .map_err(Error::store)?;

    Ok(rows.iter().map(|row| row.get("name")).collect())
}

/// Number of branches.
pub async fn count(conn: &mut SqliteConnection) -> Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM branches")
        .fetch_one(&mut *conn)
        .await
        .map_err(Error::store)
}

/// Delete a branch row; cascades to its builds (and their subproject links).
pub async fn remove(conn: &mut SqliteConnection, name: &str) -> Result<()> {
    sqlx::query("DELETE FROM branches WHERE name = ?")
        .bind(name)
        .execute(&mut *conn)
        .await
        .map_err(Error::store)?;

    Ok(())
}

/// Drop the branches table.
pub async fn drop_table(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query("DROP TABLE IF EXISTS branches")
        .execute(&mut *conn)
        .await
        .map_err(Error::store)?;

    Ok(())
}
