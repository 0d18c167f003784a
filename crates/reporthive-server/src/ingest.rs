//! Upload ingestion: one multipart POST becomes one build row plus its
//! unpacked report tree, or nothing at all.

use reporthive_archive::{extract_zip, parse_html_duration, scan_junit_xml};
use reporthive_core::{encode_branch, parse_upload_meta, Error, Result};
use reporthive_db::{branches, builds, subproject_builds, subprojects, NewBuild, SubprojectRun};
use tracing::{info, warn};

use crate::state::JobContext;

/// The decoded parts of one upload request.
pub struct Upload {
    pub metadata: Vec<u8>,
    pub archive: Vec<u8>,
    pub failed_tests: Option<String>,
}

/// Ingest one upload. Returns the location path of the new build.
///
/// The build row and the extracted directory are created together: any
/// failure before the commit rolls the row back, and an extraction failure
/// removes the partial directory. The one asymmetry is a duplicate detected
/// at insert time (a concurrent upload won the race): the directory is left
/// in place because it belongs to the winner.
pub async fn process_upload(ctx: &JobContext, upload: Upload) -> Result<String> {
    let value: serde_json::Value = serde_json::from_slice(&upload.metadata)
        .map_err(|e| Error::validation(format!("metadata is not valid JSON: {e}")))?;
    let meta = parse_upload_meta(&value, ctx.flavor)?;
    let encoded = encode_branch(&meta.branch);

    {
        let mut conn = ctx.db.acquire().await?;
        if builds::get(&mut conn, &meta.branch, meta.id).await?.is_some() {
            return Err(Error::conflict(format!(
                "build {} already exists on branch {}",
                meta.id, meta.branch
            )));
        }
    }

    let build_dir = ctx.build_dir(&meta.branch, meta.id);
    extract_zip(&upload.archive, &build_dir)?;

    let tests = scan_junit_xml(&build_dir).unwrap_or_default();
    let result_path = format!("{}/{}/{}", ctx.name, encoded, meta.id);

    let mut tx = ctx.db.begin().await?;

    branches::insert(&mut *tx, &meta.branch).await?;

    let created = builds::insert(
        &mut *tx,
        &NewBuild {
            id: meta.id,
            branch: meta.branch.clone(),
            commit: meta.commit.clone(),
            version: meta.version.clone(),
            rc: meta.rc.clone(),
            tests,
            build_type: meta.build_type.clone(),
            result_path,
        },
    )
    .await?;
    if !created {
        // Race loser: the winner's row owns the directory now.
        return Err(Error::conflict(format!(
            "build {} already exists on branch {}",
            meta.id, meta.branch
        )));
    }

    if ctx.flavor.is_multi() {
        for subproject in meta.subprojects.as_deref().unwrap_or_default() {
            subprojects::insert(&mut *tx, subproject).await?;

            let subproject_dir = build_dir.join("projects").join(subproject);
            let tests = scan_junit_xml(&subproject_dir).unwrap_or_default();
            let duration =
                parse_html_duration(&subproject_dir.join("index.html")).unwrap_or(0.0);

            subproject_builds::insert(
                &mut *tx,
                &meta.branch,
                meta.id,
                &SubprojectRun {
                    subproject: subproject.clone(),
                    tests,
                    result_url: format!(
                        "{}/{}/{}/projects/{}/index.html",
                        ctx.name, encoded, meta.id, subproject
                    ),
                    duration,
                },
            )
            .await?;
        }
    }

    tx.commit().await.map_err(Error::store)?;

    // Best effort: losing this file never invalidates the accepted upload.
    if let Some(text) = &upload.failed_tests {
        if let Err(e) = std::fs::write(build_dir.join("failed_junit_tests.txt"), text) {
            warn!(
                "Could not persist failed test list for {}/{}/{}: {}",
                ctx.name, meta.branch, meta.id, e
            );
        }
    }

    info!(
        "Accepted build {} on branch {} of job {}",
        meta.id, meta.branch, ctx.name
    );
    Ok(format!("/{}/{}/{}", ctx.name, encoded, meta.id))
}
