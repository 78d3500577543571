//! # Tag and Saved-View Reconciliation
//!
//! Mirrors remote tags, mix/tag associations and saved views into the local
//! store. Tags and saved views are diffed by id; associations have no state
//! of their own and are replaced wholesale.

use bridge_traits::remote::{MixTag, SavedView, Tag};
use core_library::{LocalMixTag, LocalSavedView, LocalTag};
use std::collections::{BTreeSet, HashMap};

/// Local changes needed to mirror a remote collection keyed by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorPlan<T> {
    /// Local ids missing from the remote set
    pub deletions: Vec<String>,
    /// New rows and rows whose fields changed
    pub upserts: Vec<T>,
}

impl<T> MirrorPlan<T> {
    pub fn is_empty(&self) -> bool {
        self.deletions.is_empty() && self.upserts.is_empty()
    }
}

impl<T> Default for MirrorPlan<T> {
    fn default() -> Self {
        Self {
            deletions: Vec::new(),
            upserts: Vec::new(),
        }
    }
}

/// Diff `remote` against `local` by id. Deletions keep local order, upserts
/// keep remote order.
pub fn plan_mirror<T, F>(remote: Vec<T>, local: &[T], id_of: F) -> MirrorPlan<T>
where
    T: PartialEq,
    F: Fn(&T) -> &str,
{
    let local_by_id: HashMap<&str, &T> = local.iter().map(|row| (id_of(row), row)).collect();
    let remote_ids: BTreeSet<String> = remote.iter().map(|row| id_of(row).to_string()).collect();

    let deletions = local
        .iter()
        .map(|row| id_of(row))
        .filter(|id| !remote_ids.contains(*id))
        .map(str::to_string)
        .collect();

    let upserts = remote
        .into_iter()
        .filter(|row| local_by_id.get(id_of(row)) != Some(&row))
        .collect();

    MirrorPlan { deletions, upserts }
}

/// Tag reconciliation.
pub struct TagReconciler;

impl TagReconciler {
    /// Plan tag deletions and upserts. Duplicate remote ids keep the last row.
    pub fn plan(remote: &[Tag], local: &[LocalTag]) -> MirrorPlan<LocalTag> {
        let mut seen: HashMap<&str, LocalTag> = HashMap::new();
        let mut order = Vec::new();
        for tag in remote {
            if seen.insert(tag.id.as_str(), LocalTag::from(tag)).is_none() {
                order.push(tag.id.as_str());
            }
        }
        let remote: Vec<LocalTag> = order
            .into_iter()
            .filter_map(|id| seen.remove(id))
            .collect();

        plan_mirror(remote, local, |tag| tag.id.as_str())
    }

    /// The complete association set, deduplicated and sorted.
    pub fn associations(remote: &[MixTag]) -> Vec<LocalMixTag> {
        remote
            .iter()
            .map(LocalMixTag::from)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Plan saved-view deletions and upserts.
pub fn plan_saved_views(
    remote: &[SavedView],
    local: &[LocalSavedView],
) -> MirrorPlan<LocalSavedView> {
    let remote = remote.iter().map(LocalSavedView::from).collect();
    plan_mirror(remote, local, |view| view.id.as_str())
}
