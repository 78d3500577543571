//! # Media Field Policy
//!
//! Decides which media fields of a mix still need a local file and brings a
//! [`LocalMix`] in line with its remote URLs.
//!
//! A field is *satisfied* when its remote URL is absent or empty, or when the
//! recorded local path is the deterministic path for the current URL and that
//! file exists. Download failures are per field: the field stays unsatisfied
//! and is retried on the next pass.
//!
//! Local paths depend only on the URL, so mixes sharing a URL share a file.
//! Reconciling a mix never deletes anything itself: it reports the paths it
//! released and the engine removes those no other mix still references.

use bridge_traits::remote::Mix;
use core_cache::MediaFileStore;
use core_library::{LocalMix, MediaField};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Outcome of reconciling one mix's media with the file store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaReport {
    pub downloaded: u64,
    pub failed: u64,
    /// Paths the mix stopped referencing because a URL changed or was cleared
    pub released: Vec<String>,
}

impl MediaReport {
    /// Every applicable field ended up satisfied
    pub fn all_satisfied(&self) -> bool {
        self.failed == 0
    }
}

/// Count the fields of `remote` that would need a download.
///
/// `local` is the cached mirror, if any. A mirror already flagged synced
/// whose paths match the current URLs is trusted without touching disk.
pub async fn pending_downloads(
    remote: &Mix,
    local: Option<&LocalMix>,
    file_store: &MediaFileStore,
) -> u64 {
    let mut pending = 0;

    for &field in MediaField::for_type(remote.mix_type) {
        let Some(url) = field.remote_url(remote) else {
            continue;
        };

        let Ok(expected) = file_store.local_path_for(url) else {
            pending += 1;
            continue;
        };

        let recorded = local.and_then(|l| l.local_path(field));
        let trusted = local.is_some_and(|l| l.is_synced) && recorded == Some(expected.as_str());
        if trusted || file_store.file_exists(&expected).await {
            continue;
        }

        pending += 1;
    }

    pending
}

/// Bring every media field of `local` in line with its remote URL.
///
/// Missing files are downloaded and fields whose URL became empty are
/// cleared. Paths replaced or cleared are listed in
/// [`MediaReport::released`]. Never fails: problems are counted in the report
/// and logged.
pub async fn reconcile_media(local: &mut LocalMix, file_store: &MediaFileStore) -> MediaReport {
    let mut report = MediaReport::default();

    for &field in local.media_fields() {
        let current = local.local_path(field).map(str::to_string);

        let Some(url) = local.remote_url(field).map(str::to_string) else {
            if let Some(stale) = current {
                report.released.push(stale);
                local.set_local_path(field, None);
            }
            continue;
        };

        let outcome = ensure_field(local, field, &url, current.as_deref(), file_store).await;
        match outcome {
            Ok(path) => {
                if let Some(old) = current.filter(|old| *old != path) {
                    report.released.push(old);
                }
                if local.local_path(field) != Some(path.as_str()) {
                    report.downloaded += 1;
                }
                local.set_local_path(field, Some(path));
            }
            Err(e) => {
                warn!(
                    mix_id = %local.id(),
                    field = %field,
                    error = %e,
                    "Media download failed; will retry next pass"
                );
                report.failed += 1;
                // A recorded path must always point at an existing file.
                if let Some(old) = current {
                    if !file_store.file_exists(&old).await {
                        local.set_local_path(field, None);
                    }
                }
            }
        }
    }

    report
}

/// Resolve one field to an existing local file, downloading when needed.
async fn ensure_field(
    local: &LocalMix,
    field: MediaField,
    url: &str,
    current: Option<&str>,
    file_store: &MediaFileStore,
) -> core_cache::Result<String> {
    let expected = file_store.local_path_for(url)?;

    if current == Some(expected.as_str()) && file_store.file_exists(&expected).await {
        return Ok(expected);
    }

    let path = file_store.download(url).await?;
    debug!(mix_id = %local.id(), field = %field, path = %path, "Media materialized");
    Ok(path)
}

/// Every local path recorded on `mixes`.
pub fn referenced_paths<'a>(mixes: impl IntoIterator<Item = &'a LocalMix>) -> HashSet<String> {
    mixes
        .into_iter()
        .flat_map(|mix| mix.paths.all())
        .map(str::to_string)
        .collect()
}

/// Local paths the applicable media URLs of `remote` map to.
pub fn expected_paths(remote: &Mix, file_store: &MediaFileStore) -> Vec<String> {
    MediaField::for_type(remote.mix_type)
        .iter()
        .filter_map(|field| field.remote_url(remote))
        .filter_map(|url| file_store.local_path_for(url).ok())
        .collect()
}

/// Delete each of `paths` not listed in `in_use`. Returns how many files were
/// removed.
pub async fn remove_unreferenced<I>(paths: I, in_use: &HashSet<String>, file_store: &MediaFileStore) -> u64
where
    I: IntoIterator<Item = String>,
{
    let mut removed = 0;
    for path in paths {
        if in_use.contains(&path) {
            debug!(path = %path, "Media file still referenced; kept");
            continue;
        }
        match file_store.delete_file(&path).await {
            Ok(true) => removed += 1,
            Ok(false) => {}
            Err(e) => warn!(path = %path, error = %e, "Failed to remove released media file"),
        }
    }
    removed
}
