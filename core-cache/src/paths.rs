//! Deterministic local locations for remote media.
//!
//! Blob-store objects land under `storage/<sanitized object path>`, external
//! URLs under `external/<sha256(url)>[.<ext>]`. The same remote reference
//! always maps to the same relative path, so a file written by an earlier
//! pass is found again instead of downloaded twice.

use crate::error::{FileStoreError, Result};
use core_runtime::logging::redact_url;
use sha2::{Digest, Sha256};
use std::path::{Component, Path, PathBuf};

pub const STORAGE_DIR: &str = "storage";
pub const EXTERNAL_DIR: &str = "external";

/// Suffix of in-flight downloads. A file only appears under its final path
/// once fully written.
pub const PARTIAL_SUFFIX: &str = ".part";

const STORAGE_OBJECT_MARKER: &str = "/storage/v1/object/";
const ACCESS_PREFIXES: [&str; 3] = ["public/", "sign/", "authenticated/"];

/// Relative path for a blob-store object path.
pub fn storage_local_path(storage_path: &str) -> Result<String> {
    let segments: Vec<String> = storage_path
        .split('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .map(sanitize_segment)
        .collect();

    if segments.is_empty() {
        return Err(FileStoreError::InvalidPath(storage_path.to_string()));
    }

    Ok(format!("{}/{}", STORAGE_DIR, segments.join("/")))
}

/// Relative path for an arbitrary external URL.
pub fn external_local_path(url: &str) -> String {
    let url = url.trim();
    let digest = Sha256::digest(url.as_bytes());
    let hash = format!("{:x}", digest);

    match extension_of(url) {
        Some(ext) => format!("{}/{}.{}", EXTERNAL_DIR, hash, ext),
        None => format!("{}/{}", EXTERNAL_DIR, hash),
    }
}

/// Sibling path a download is staged at before being renamed into place.
pub fn partial_path(relative: &str) -> String {
    format!("{}{}", relative, PARTIAL_SUFFIX)
}

pub fn is_partial(relative: &str) -> bool {
    relative.ends_with(PARTIAL_SUFFIX)
}

/// Recognize a blob-store reference and extract its object path.
///
/// Accepts bare relative object paths and `/storage/v1/object/...` URLs for
/// `bucket` (public, signed or authenticated). When `base_url` is given the
/// URL must live on that origin. Anything else is an external URL.
pub fn storage_path_from_url(url: &str, bucket: &str, base_url: Option<&str>) -> Option<String> {
    let trimmed = redact_url(url.trim());
    if trimmed.is_empty() {
        return None;
    }

    let rest = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"));

    let Some(rest) = rest else {
        if trimmed.contains("://") || trimmed.starts_with("data:") {
            return None;
        }
        let path = trimmed.trim_start_matches('/');
        return (!path.is_empty()).then(|| path.to_string());
    };

    if let Some(base) = base_url {
        let on_origin = trimmed
            .strip_prefix(base)
            .is_some_and(|after| after.starts_with('/'));
        if !on_origin {
            return None;
        }
    }

    let (_, object) = rest.split_once(STORAGE_OBJECT_MARKER)?;
    let object = ACCESS_PREFIXES
        .iter()
        .find_map(|prefix| object.strip_prefix(prefix))
        .unwrap_or(object);

    let path = object.strip_prefix(bucket)?.strip_prefix('/')?;
    let decoded = urlencoding::decode(path).ok()?;
    let decoded = decoded.trim_matches('/');

    (!decoded.is_empty()).then(|| decoded.to_string())
}

/// Join a `/`-separated relative path onto `root`, dropping any component
/// that could escape it.
pub fn resolve(root: &Path, relative: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for component in Path::new(relative).components() {
        if let Component::Normal(part) = component {
            path.push(part);
        }
    }
    path
}

fn sanitize_segment(segment: &str) -> String {
    segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn extension_of(url: &str) -> Option<String> {
    let without_query = redact_url(url);
    let after_scheme = without_query
        .split_once("://")
        .map_or(without_query, |(_, rest)| rest);
    let (_, path) = after_scheme.split_once('/')?;
    let file_name = path.rsplit('/').next()?;
    let (_, ext) = file_name.rsplit_once('.')?;

    let valid = (1..=5).contains(&ext.len()) && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| ext.to_ascii_lowercase())
}
