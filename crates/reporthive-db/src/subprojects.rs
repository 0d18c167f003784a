//! Subprojects table - names are global across a multi-project job, not
//! scoped per build.

use reporthive_core::{Error, Result};
use sqlx::{Row, SqliteConnection};

/// Insert a subproject name. Returns true when newly created.
pub async fn insert(conn: &mut SqliteConnection, name: &str) -> Result<bool> {
    let result = sqlx::query("INSERT OR IGNORE INTO subprojects (name) VALUES (?)")
        .bind(name)
        .execute(&mut *conn)
        .await
        .map_err(Error::store)?;

    Ok(result.rows_affected() > 0)
}

/// All subproject names.
pub async fn all(conn: &mut SqliteConnection) -> Result<Vec<String>> {
    let rows = sqlx::query("SELECT name FROM subprojects ORDER BY name")
        .fetch_all(&mut *conn)
        .await
        .map_err(Error::store)?;

    Ok(rows.iter().map(|row| row.get("name")).collect())
}

/// Number of subprojects.
pub async fn count(conn: &mut SqliteConnection) -> Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM subprojects")
        .fetch_one(&mut *conn)
        .await
        .map_err(Error::store)
}

/// Delete a subproject row; cascades to its build links.
pub async fn remove(conn: &mut SqliteConnection, name: &str) -> Result<()> {
    sqlx::query("DELETE FROM subprojects WHERE name = ?")
        .bind(name)
        .execute(&mut *conn)
        .await
        .map_err(Error::store)?;

    Ok(())
}

/// Drop the subprojects table.
pub async fn drop_table(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query("DROP TABLE IF EXISTS subprojects")
        .execute(&mut *conn)
        .await
        .map_err(Error::store)?;

    Ok(())
}
