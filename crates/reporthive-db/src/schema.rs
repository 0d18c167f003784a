//! Database schema for Reporthive job stores.
//!
//! One SQLite database per job. Build ids are chosen by the uploader and are
//! only unique per branch, hence the composite primary keys. Deleting a
//! branch cascades to its builds and, transitively, to the subproject links.

/// Tables every job has.
pub const SCHEMA_BASE: &str = r#"
CREATE TABLE IF NOT EXISTS general_info (
    job TEXT NOT NULL,
    git TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS branches (
    name TEXT NOT NULL,
    PRIMARY KEY (name)
);

CREATE TABLE IF NOT EXISTS builds (
    id INTEGER NOT NULL,
    branch TEXT NOT NULL,
    commit_hash TEXT NOT NULL,
    version TEXT,
    rc TEXT,
    tests_success INTEGER NOT NULL,
    tests_skipped INTEGER NOT NULL,
    tests_flaky INTEGER NOT NULL,
    tests_failed INTEGER NOT NULL,
    build_type TEXT,
    result_path TEXT NOT NULL,
    PRIMARY KEY (id, branch),
    FOREIGN KEY (branch) REFERENCES branches (name) ON DELETE CASCADE
);
"#;

/// Additional tables for multi-project jobs.
pub const SCHEMA_MULTI: &str = r#"
CREATE TABLE IF NOT EXISTS subprojects (
    name TEXT NOT NULL,
    PRIMARY KEY (name)
);

CREATE TABLE IF NOT EXISTS subproject_builds (
    branch TEXT NOT NULL,
    id INTEGER NOT NULL,
    subproject TEXT NOT NULL,
    tests_success INTEGER NOT NULL,
    tests_skipped INTEGER NOT NULL,
    tests_flaky INTEGER NOT NULL,
    tests_failed INTEGER NOT NULL,
    result_url TEXT NOT NULL,
    duration REAL NOT NULL,
    PRIMARY KEY (branch, id, subproject),
    FOREIGN KEY (id, branch) REFERENCES builds (id, branch) ON DELETE CASCADE,
    FOREIGN KEY (subproject) REFERENCES subprojects (name) ON DELETE CASCADE
);
"#;
