//! Upload metadata normalization.
//!
//! The metadata JSON accompanying an uploaded archive has grown legacy key
//! aliases over time; this module maps the accepted spellings onto one
//! normalized record.

use serde_json::Value;

use crate::config::JobFlavor;
use crate::error::{Error, Result};

/// Normalized upload metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadMeta {
    pub branch: String,
    pub id: i64,
    pub commit: String,
    pub version: Option<String>,
    pub rc: Option<String>,
    pub build_type: Option<String>,
    /// Declared subprojects. Required (possibly empty) for multi-project
    /// jobs, `None` for single-project jobs.
    pub subprojects: Option<Vec<String>>,
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Build ids arrive either as a JSON number or as a numeric string.
fn id_field(value: &Value) -> Option<i64> {
    match value.get("id")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Normalize upload metadata, resolving legacy key aliases.
///
/// `branch`, `id`, and the commit hash (`commit` or `git_commit`) are
/// mandatory. The build type is accepted as `type` or `build_version`, the
/// subproject list as `subprojects` or `projects`. For a multi-project job a
/// missing subproject list is an error: such uploads must declare one, even
/// if it is empty.
pub fn parse_upload_meta(value: &Value, flavor: JobFlavor) -> Result<UploadMeta> {
    let branch = string_field(value, "branch")
        .ok_or_else(|| Error::validation("metadata is missing 'branch'"))?;
    let id = id_field(value)
        .ok_or_else(|| Error::validation("metadata is missing an integer 'id'"))?;
    let commit = string_field(value, "commit")
        .or_else(|| string_field(value, "git_commit"))
        .ok_or_else(|| Error::validation("metadata is missing 'commit' / 'git_commit'"))?;

    let build_type = string_field(value, "type").or_else(|| string_field(value, "build_version"));

    let subprojects = value
        .get("subprojects")
        .or_else(|| value.get("projects"))
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect::<Vec<_>>()
        });

    if flavor.is_multi() && subprojects.is_none() {
        return Err(Error::validation(
            "multi-project upload must declare a subproject list",
        ));
    }

    Ok(UploadMeta {
        branch,
        id,
        commit,
        version: string_field(value, "version"),
        rc: string_field(value, "rc"),
        build_type,
        subprojects,
    })
}
